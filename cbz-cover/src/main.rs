#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::fs;

use anyhow::{Context, Result};
use cbz::{extract_cover, webp, CbzRead, CbzReader};
use clap::Parser;
use cli_table::{print_stdout, WithTitle};
use tracing::debug;

use crate::args::{Args, Cover, List, Subcommands, Webp};
use crate::types::Entry;

mod args;
mod types;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    debug!("{args:?}");

    match args.command {
        Subcommands::Cover(Cover { archive, outdir }) => {
            fs::create_dir_all(&outdir)
                .with_context(|| format!("couldn't create output directory {outdir}"))?;

            let cover = extract_cover(&archive, &outdir)
                .with_context(|| format!("couldn't extract the cover of {archive}"))?;

            println!("{cover}");
        }
        Subcommands::Webp(Webp {
            src,
            dst,
            quality,
            scale,
        }) => {
            webp::transcode(&src, &dst, webp::WebpOptions { quality, scale })
                .with_context(|| format!("couldn't convert {src} to {dst}"))?;
        }
        Subcommands::List(List { archive }) => {
            let mut cbz = CbzReader::from_path(&archive)
                .with_context(|| format!("couldn't open {archive}"))?;
            let cover_name = cbz.cover_name()?;

            let mut entries = cbz.entries()?;
            entries.sort_by(|a, b| a.name.cmp(&b.name));

            let rows = entries
                .into_iter()
                .map(|entry| Entry::new(entry, cover_name.as_deref()))
                .collect::<Vec<_>>();

            print_stdout(rows.with_title())?;
        }
    }

    Ok(())
}
