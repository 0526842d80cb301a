use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

use crate::reconcile::SyncOptions;

#[derive(Parser, Debug)]
#[command(author, version, about = "Apple Music rating and tag helper", long_about = None)]
pub struct Args {
    /// Process only selected tracks (by default process all)
    #[arg(short, long)]
    pub selected: bool,

    /// Do not do any actual changes, just print actions
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Force update Music ratings from file tags when both are set
    #[arg(short, long)]
    pub update: bool,

    /// Dump tag info
    #[arg(short, long)]
    pub dump: bool,

    /// Sync song rating with Music
    #[arg(long)]
    pub rating: bool,

    /// Compare song title and artist with Music
    #[arg(long)]
    pub tags: bool,

    /// Add changed songs to playlist
    #[arg(short, long, value_name = "NAME")]
    pub playlist: Option<String>,

    /// Create and fill the playlist even during a dry run
    #[arg(long)]
    pub playlist_in_dry_run: bool,

    /// Skip files whose format cannot hold a rating instead of stopping
    #[arg(long)]
    pub skip_unsupported: bool,

    /// Console log level
    #[arg(long, default_value = "warn", env = "RATESYNC_LOG_LEVEL")]
    pub log_level: LevelFilter,

    /// File log level ("off" disables the log file)
    #[arg(long, default_value = "debug")]
    pub log_file_level: LevelFilter,

    /// Path to log file (default: ~/Library/Logs/RateSync/ratesync.log)
    #[arg(long, env = "RATESYNC_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            scope_selected: self.selected,
            dry_run: self.dry_run,
            force_update: self.update,
            dump: self.dump,
            sync_ratings: self.rating,
            sync_tags: self.tags,
            playlist: self.playlist.clone(),
            playlist_in_dry_run: self.playlist_in_dry_run,
            skip_unsupported: self.skip_unsupported,
        }
    }
}
