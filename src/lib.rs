pub mod apple_music;
pub mod cli;
pub mod error;
pub mod library;
pub mod logging;
pub mod metadata;
pub mod models;
pub mod playlist;
pub mod rating;
pub mod reconcile;

#[cfg(test)]
mod test_utils;

use anyhow::Result;
use log::warn;

use apple_music::AppleMusic;
use cli::Args;
use metadata::LoftyTagStore;
use reconcile::{Reconciler, SyncSummary};

/// Connects to Music and runs one reconciliation pass, reporting to stdout.
pub fn run(args: &Args) -> Result<SyncSummary> {
    let options = args.sync_options();
    if !options.sync_ratings && !options.sync_tags && !options.dump {
        warn!("Nothing to compare: pass --rating, --tags or --dump");
    }

    let music = AppleMusic::connect()?;
    log::debug!("Using Music {}", music.version());

    let stdout = std::io::stdout();
    Reconciler::new(&music, &LoftyTagStore, &options, stdout.lock()).run()
}
