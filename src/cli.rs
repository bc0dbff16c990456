//! Command-line interface for docpeek

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docpeek")]
#[command(about = "docpeek - Preview and extract files embedded in documents and archives", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the entries of a container
    List {
        /// Document or archive (.docx, .xlsx, .zip, .7z, .tar, .tar.gz, ...)
        file: PathBuf,

        /// Only list image entries
        #[arg(long)]
        images_only: bool,

        /// Print entry descriptors as JSON
        #[arg(long)]
        json: bool,

        /// JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Render the preview of one entry
    Preview {
        /// Document or archive
        file: PathBuf,

        /// Entry path inside the container, e.g. word/media/image1.png
        entry: String,

        /// Save an image preview (PNG)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Fail on malformed XML instead of showing the raw text
        #[arg(long)]
        strict_xml: bool,

        /// JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Write entries to a directory
    Extract {
        /// Document or archive
        file: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Only extract image entries
        #[arg(long)]
        images_only: bool,

        /// Recreate the directory layout of the container
        #[arg(long)]
        keep_structure: bool,

        /// Replace existing files instead of renaming
        #[arg(long)]
        overwrite: bool,

        /// JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}
