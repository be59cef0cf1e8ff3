use clap::{Parser, Subcommand};

use crate::download::request::{QualityMode, SubtitleLanguage, TaskInput};

#[derive(Parser)]
#[command(name = "tubeforge")]
#[command(author, version, about = "Serialized video download engine with subtitle burn-in", long_about = None)]
pub struct Cli {
    /// Log debug output as well
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the worker and the HTTP trigger endpoint
    Serve {
        /// Listen address (overrides TUBEFORGE_TRIGGER_ADDR)
        #[arg(long)]
        addr: Option<std::net::SocketAddr>,
    },

    /// Download URLs through the worker and exit when done
    Download {
        /// Video URLs, processed in order
        #[arg(required = true)]
        urls: Vec<String>,

        /// Quality mode
        #[arg(short, long, value_enum, default_value_t = QualityMode::SmartMux)]
        mode: QualityMode,

        /// Do not save the cover image
        #[arg(long)]
        no_cover: bool,

        /// Do not burn subtitles into the video
        #[arg(long)]
        no_embed_subs: bool,

        /// Keep the subtitle file next to the video
        #[arg(long)]
        keep_subs: bool,

        /// Preferred subtitle language
        #[arg(short, long, value_enum, default_value_t = SubtitleLanguage::Auto)]
        lang: SubtitleLanguage,
    },

    /// Inspect the download archive
    Archive {
        /// Check whether a media id is recorded
        #[arg(long)]
        check: Option<String>,
    },
}

impl Commands {
    /// Task inputs for a `download` invocation; empty for other commands.
    pub fn task_inputs(&self) -> Vec<TaskInput> {
        match self {
            Commands::Download {
                urls,
                mode,
                no_cover,
                no_embed_subs,
                keep_subs,
                lang,
            } => urls
                .iter()
                .map(|url| {
                    TaskInput::new(url.clone())
                        .quality_mode(*mode)
                        .save_cover(!no_cover)
                        .embed_subtitles(!no_embed_subs)
                        .save_subtitle_file(*keep_subs)
                        .subtitle_language(*lang)
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
