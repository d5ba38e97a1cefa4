//! SocialSnap studio command line.
//!
//! Run with: GEMINI_API_KEY=xxx socialsnap generate "Opening week at the roastery"

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use socialsnap_lib::commands::{self, platforms, settings, studio};
use socialsnap_lib::config::Config;
use socialsnap_lib::db::models::{DesignStyle, TargetSize};
use socialsnap_lib::pipeline::{PipelineState, StageEvent, StageStatus};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "socialsnap", version, about = "Turn a topic into a ready-to-post social asset")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the full pipeline and print the new post as JSON.
    Generate(GenerateArgs),
    /// Print every saved post, newest first.
    List,
    /// Print one saved post.
    Show {
        id: String,
    },
    Delete {
        id: String,
    },
    /// Show the platform catalog and connection state.
    Platforms,
    Toggle {
        platform: String,
    },
    /// Print what to do to post a result on a connected platform.
    Share {
        id: String,
        platform: String,
    },
    /// Save a result's image as a PNG file.
    Export {
        id: String,
        #[arg(long)]
        out: PathBuf,
    },
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    topic: String,
    #[arg(long)]
    instructions: Option<String>,
    /// Image used as the visual guide.
    #[arg(long)]
    reference: Option<PathBuf>,
    /// Extra source files for research; may be repeated.
    #[arg(long = "context")]
    context: Vec<PathBuf>,
    /// square, portrait-tall, portrait-a4 or landscape-a4
    #[arg(long, default_value = "square")]
    size: TargetSize,
    /// minimalist, vibrant, corporate, artistic, retro or realistic; may be repeated.
    #[arg(long = "style")]
    styles: Vec<DesignStyle>,
}

#[derive(Debug, Subcommand)]
enum SettingsCommand {
    List,
    Set { key: String, value: String },
    Delete { key: String },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report_stage(state: PipelineState, event: &StageEvent) {
    let mark = match event.status {
        StageStatus::Pending => "..",
        StageStatus::Success => "ok",
        StageStatus::Error => "!!",
    };
    eprintln!("[{mark}] {:<11} {}", state.to_string(), event.message);
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("socialsnap=info,socialsnap_lib=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("invalid configuration")?;
    let mut store = socialsnap_lib::open_store(&config)
        .with_context(|| format!("failed to open data directory {}", config.data_dir.display()))?;

    match cli.command {
        Command::Generate(args) => {
            let mut pipeline = commands::open_pipeline(&config, store.database())?;
            let mut request = studio::prepare_request(studio::StudioInput {
                topic: args.topic,
                instructions: args.instructions,
                reference: args.reference,
                context: args.context,
                target_size: args.size,
                styles: args.styles,
            })
            .await?;
            let result =
                studio::generate(&mut pipeline, &mut store, &mut request, report_stage).await?;
            print_json(&result)?;
        }
        Command::List => print_json(&studio::list_results(&store))?,
        Command::Show { id } => print_json(&studio::get_result(&store, &id)?)?,
        Command::Delete { id } => {
            let removed = studio::delete_result(&mut store, &id)?;
            eprintln!("deleted {}", removed.id);
        }
        Command::Platforms => print_json(&platforms::list_platforms(&store))?,
        Command::Toggle { platform } => {
            print_json(&platforms::toggle_platform(&mut store, &platform)?)?
        }
        Command::Share { id, platform } => {
            print_json(&platforms::share_result(&store, &id, &platform)?)?
        }
        Command::Export { id, out } => {
            let bytes = platforms::export_result(&store, &id, &out).await?;
            eprintln!("wrote {bytes} bytes to {}", out.display());
        }
        Command::Settings(SettingsCommand::List) => {
            print_json(&settings::get_settings(store.database())?)?
        }
        Command::Settings(SettingsCommand::Set { key, value }) => {
            settings::set_setting(store.database(), &key, &value)?
        }
        Command::Settings(SettingsCommand::Delete { key }) => {
            settings::delete_setting(store.database(), &key)?
        }
    }
    Ok(())
}
