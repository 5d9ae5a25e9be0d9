use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::platform::{AudioFormat, Region};

#[derive(Parser)]
#[command(
    name = "recdl",
    about = "Recording Downloader - Bulk-export call recordings from the contact-center platform",
    version,
    long_about = "Finds the voice conversations of a queue over a date range, exports their recordings through the batch download API, saves them locally and optionally converts them to WAV or MP3 with an external script."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// OAuth client id
    #[arg(long, global = true, env = "GENESYS_CLIENT_ID")]
    pub client_id: Option<String>,

    /// OAuth client secret
    #[arg(long, global = true, env = "GENESYS_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export and download recordings (prompts for anything not given)
    Download {
        /// Platform region
        #[arg(short, long, value_enum)]
        region: Option<Region>,

        /// First day of the range (YYYY-MM-DD)
        #[arg(long, value_name = "DATE", requires = "end")]
        start: Option<String>,

        /// Last day of the range, inclusive (YYYY-MM-DD)
        #[arg(long, value_name = "DATE", requires = "start")]
        end: Option<String>,

        /// Queue id
        #[arg(short, long, value_name = "QUEUE_ID")]
        queue: Option<String>,

        /// Final audio format
        #[arg(short, long, value_enum)]
        format: Option<AudioFormat>,

        /// Download directory
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// List routing queues
    Queues {
        /// Platform region
        #[arg(short, long, value_enum)]
        region: Option<Region>,
    },

    /// List supported regions
    Regions,

    /// Show or locate the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}
