use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a channel: fetch recent uploads, index them and
    /// generate a report
    Analyze {
        /// Channel handle, id, URL or name (free text is fine)
        query: String,

        /// Number of neighbors to retrieve for the channel title
        #[clap(short = 'k', long)]
        top_k: Option<usize>,

        /// Number of recent videos to embed
        #[clap(short, long)]
        max_items: Option<usize>,

        /// Skip report generation
        #[clap(long, default_value = "false")]
        no_summary: bool,
    },

    /// Resolve a channel and print its metadata
    Resolve {
        /// Channel handle, id, URL or name
        query: String,
    },

    /// Check that the LLM backend answers
    CheckLlm {},
}
