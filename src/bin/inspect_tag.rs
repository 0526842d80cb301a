use anyhow::Result;
use ratesync_lib::metadata::{LoftyTagStore, TagStore};
use ratesync_lib::rating::{percentage_from_fraction, stars_for, RatingCodec};
use ratesync_lib::reconcile::dump_tag;
use std::env;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let paths: Vec<String> = env::args().skip(1).collect();
    if paths.is_empty() {
        println!("Usage: inspect_tag <file_path>...");
        return ExitCode::FAILURE;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut failed = false;

    for path in &paths {
        if let Err(e) = inspect(&mut out, Path::new(path)) {
            eprintln!("{}: {:#}", path, e);
            failed = true;
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn inspect<W: Write>(out: &mut W, path: &Path) -> Result<()> {
    let tag = LoftyTagStore.open(path)?;

    let codec = RatingCodec::for_format(&tag.audio_format().short_name);
    let stars = if codec.is_supported() {
        let fraction = codec.read(&*tag)?;
        Some(stars_for(percentage_from_fraction(Some(fraction)))?)
    } else {
        None
    };

    dump_tag(out, &*tag, stars)?;
    writeln!(out)?;
    Ok(())
}
