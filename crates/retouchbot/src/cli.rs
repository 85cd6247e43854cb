use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "retouch")]
#[command(author, version, about = "Telegram bot that enhances photos: upscale, face restore, illustration, poster", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot together with the HTTP API
    Run {
        /// Use webhook mode instead of long polling
        #[arg(long)]
        webhook: bool,
    },

    /// Run only the HTTP processing API
    Serve {
        /// Port to listen on (defaults to API_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Process a single image through the worker pool and exit
    Process {
        /// Mode: upscale, face_restore, illustration, poster
        #[arg(short, long, default_value = "upscale")]
        mode: String,

        /// Input image path
        #[arg(short, long)]
        input: PathBuf,

        /// Output path (JPEG)
        #[arg(short, long)]
        output: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
