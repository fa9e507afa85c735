mod audio;
mod cache;
mod chunker;
mod config;
mod conversation;
mod emotion;
mod episode;
mod pause;
mod pdf;
mod pipeline;
mod podcast;
mod server;
mod synth;
mod tempfiles;
mod transcript;

use std::path::PathBuf;
use std::sync::Arc;
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

use config::{Config, Environment};
use conversation::LlmBackend;
use pipeline::{Pipeline, RunPaths};
use synth::TtsBackend;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "pdf-to-podcast",
    about = "Turn a PDF into a two-voice podcast"
)]
enum Command {
    /// Generate podcast episodes from a PDF file
    Generate {
        /// PDF document to discuss
        #[structopt(long)]
        pdf: PathBuf,

        /// Path to the TOML configuration file
        #[structopt(short = "c", long)]
        config: PathBuf,

        /// Transcript file; reused instead of calling the LLM when it exists
        #[structopt(long, default_value = "output.txt")]
        transcript: PathBuf,

        #[structopt(long, default_value = "podcast_episodes")]
        episodes_dir: PathBuf,

        #[structopt(long, default_value = "temp_audio")]
        temp_dir: PathBuf,

        /// Conversation backend (groq or anthropic)
        #[structopt(long, default_value = "groq")]
        llm: LlmBackend,

        /// Speech backend (elevenlabs or openai)
        #[structopt(long, default_value = "elevenlabs")]
        tts: TtsBackend,
    },
    /// Serve podcast generation over HTTP
    Serve {
        #[structopt(short = "c", long)]
        config: PathBuf,

        #[structopt(short, long, default_value = "8000")]
        port: u16,

        #[structopt(long, default_value = "groq")]
        llm: LlmBackend,

        #[structopt(long, default_value = "elevenlabs")]
        tts: TtsBackend,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let command = Command::from_args();
    let environment = Environment::load()?;

    match command {
        Command::Generate {
            pdf,
            config,
            transcript,
            episodes_dir,
            temp_dir,
            llm,
            tts,
        } => {
            let config = Config::load(&config).await?;
            let pipeline = Pipeline::new(config, llm, tts, environment).await?;
            let paths = RunPaths {
                transcript,
                episodes_dir,
                temp_dir,
            };

            let episodes = pipeline.run(&pdf, &paths).await?;
            for episode in &episodes {
                println!("{}", episode.display());
            }
        }
        Command::Serve {
            config,
            port,
            llm,
            tts,
        } => {
            let config = Config::load(&config).await?;
            let pipeline = Pipeline::new(config, llm, tts, environment).await?;
            let work_root = std::env::temp_dir().join(env!("CARGO_CRATE_NAME"));
            let state = Arc::new(server::AppState::new(pipeline, &work_root));

            server::serve(state, port).await?;
        }
    }

    Ok(())
}
