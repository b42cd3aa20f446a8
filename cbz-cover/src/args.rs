use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
pub struct Cover {
    /// The archive to take the cover from
    pub archive: Utf8PathBuf,
    /// Destination directory, created if missing
    #[clap(short, long, default_value = "./")]
    pub outdir: Utf8PathBuf,
}

#[derive(Parser, Debug)]
pub struct Webp {
    /// The image to convert (jpeg, png, or webp)
    pub src: Utf8PathBuf,
    /// Path of the WebP file to write
    pub dst: Utf8PathBuf,
    /// Lossy quality from 0 to 99, 100 and above is lossless
    #[clap(short, long, default_value = "90")]
    pub quality: u32,
    /// Resize factor, 1 or less than or equal to 0 keeps the original size
    #[clap(short, long, default_value = "1.0", allow_negative_numbers = true)]
    pub scale: f32,
}

#[derive(Parser, Debug)]
pub struct List {
    /// The archive to list the entries of
    pub archive: Utf8PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Subcommands {
    /// Extract the first image of an archive
    #[clap(alias = "c")]
    Cover(Cover),
    /// Convert an image to WebP
    #[clap(alias = "w")]
    Webp(Webp),
    /// List the entries of an archive
    #[clap(alias = "l")]
    List(List),
}

#[derive(Parser, Debug)]
#[clap(about, author, version)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Subcommands,
}
