use std::path::PathBuf;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Build, embed and store one document per catalog record
    Populate {
        #[arg(short, long, default_value = "data/products.json")]
        catalog: PathBuf,

        /// Remove every stored document first
        #[arg(long)]
        fresh: bool,
    },

    /// Remove every stored document
    Clear,

    Search {
        query: String,

        #[arg(short, long)]
        num: Option<usize>,

        #[arg(short, long)]
        threshold: Option<f32>,
    },

    /// Answer one typed question (no speech)
    Ask {
        question: String,
    },

    Stats,

    /// Interactive voice session: Enter toggles listening, s stops speaking,
    /// c clears the conversation, q quits
    Converse {
        /// Audio file standing in for the microphone
        #[arg(long)]
        audio_in: PathBuf,

        /// Directory receiving synthesized responses
        #[arg(long, default_value = "responses")]
        audio_out: PathBuf,
    },

    /// Serve the chat, speech and match-documents endpoints over HTTP
    Serve {
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Bind to 0.0.0.0 instead of 127.0.0.1
        #[arg(long)]
        public: bool,
    },
}
