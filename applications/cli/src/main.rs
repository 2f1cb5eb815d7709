/// Cadence - stream tracks from links or searches as raw PCM
use cadence_cli::{sink, CadenceConfig, Player};
use cadence_core::Messages;
use cadence_metadata::{MetadataResolver, YtDlpResolver};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Stream tracks from links or searches as raw PCM", long_about = None, version)]
struct Cli {
    /// Configuration file path (defaults to ./cadence.toml when present)
    #[arg(short, long, global = true, env = "CADENCE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve and stream queries in order as s16le 48 kHz stereo PCM
    Play {
        /// Links or search terms, one per argument
        #[arg(required = true)]
        queries: Vec<String>,

        /// Write PCM to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Resolve a query and print its metadata as JSON
    Resolve {
        /// Link or search terms
        query: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing; stdout may carry PCM, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "cadence=info,cadence_cli=info,cadence_pipeline=info,cadence_metadata=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = CadenceConfig::load(cli.config.as_deref())?;
    config.validate()?;

    match cli.command {
        Commands::Play { queries, output } => {
            play(&config, &queries, output).await?;
        }
        Commands::Resolve { query } => {
            resolve(&config, &query).await?;
        }
    }

    Ok(())
}

fn resolver(config: &CadenceConfig) -> YtDlpResolver {
    YtDlpResolver::new(config.tools.fetcher.clone()).with_policy(config.resolver.unresolved_link)
}

async fn play(config: &CadenceConfig, queries: &[String], output: Option<PathBuf>) -> anyhow::Result<()> {
    let player = Player::new(
        Arc::new(resolver(config)),
        Arc::new(config.tools.clone()),
        Messages::for_locale(&config.locale),
        config.max_playlist_size,
    );

    let shutdown = CancellationToken::new();
    let interrupt = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl-C");
            interrupt.cancel();
        }
    });

    let mut sink = sink::open(output.as_deref()).await?;
    let summary = player.play_all(queries, &mut sink, &shutdown).await;

    if summary.played == 0 && !summary.interrupted {
        anyhow::bail!("None of the {} queries could be played", summary.skipped);
    }
    Ok(())
}

async fn resolve(config: &CadenceConfig, query: &str) -> anyhow::Result<()> {
    let metadata = resolver(config).resolve(query).await?;
    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(())
}
