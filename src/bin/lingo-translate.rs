// lingo-translate - CLI for the translation routing engine

use anyhow::Context;
use clap::{Parser, Subcommand};
use lingo::{
    BlockingTranslationService, CandidateSet, RankOptions, TranslationOrchestrator,
    TranslationRequest, TranslationResponse, TranslationService, TranslatorConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Translate text with pretrained Marian models",
    long_about = None
)]
struct Args {
    /// TOML configuration file (default: <config dir>/lingo/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Force CPU usage (default: use GPU if available)
    #[arg(long, global = true)]
    cpu: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate texts into French (or French into English)
    Translate {
        /// Source language code: en, fr, ta; anything else is treated as English
        #[arg(short, long, default_value = "en")]
        source: String,

        /// Texts to translate
        #[arg(required = true)]
        texts: Vec<String>,
    },

    /// Produce several candidate translations per text
    Rank {
        #[arg(short, long, default_value = "en")]
        source: String,

        /// Candidates per text
        #[arg(short = 'n', long, default_value = "3")]
        candidates: usize,

        /// Beam width; 1 switches to sampling
        #[arg(short, long, default_value = "5")]
        beams: usize,

        /// Sampling temperature
        #[arg(short, long, default_value = "1.0")]
        temperature: f64,

        /// Random seed for reproducible sampling
        #[arg(long)]
        seed: Option<u64>,

        #[arg(required = true)]
        texts: Vec<String>,
    },

    /// Show which models loaded and how each language is routed
    Coverage,

    /// Translate "hello" from English to check the install
    Smoke,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Optional .env with HF_TOKEN and model overrides
    let dotenv = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("lingo={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Ok(path) = dotenv {
        tracing::debug!("Loaded .env from {}", path.display());
    }

    let mut config = TranslatorConfig::load(args.config.as_deref())
        .context("failed to load configuration")?;
    if args.cpu {
        config.device.force_cpu = true;
    }

    tracing::info!("Starting lingo-translate");
    let engine = tokio::task::spawn_blocking(move || TranslationOrchestrator::load(&config))
        .await
        .context("model loading task failed")?
        .context("failed to load translation models")?;
    let service = BlockingTranslationService::new(Arc::new(engine));

    match args.command {
        Command::Translate { source, texts } => {
            let response = service
                .translate(TranslationRequest::new(texts, source))
                .await?;
            print_translations(&response, args.json)?;
        }
        Command::Rank {
            source,
            candidates,
            beams,
            temperature,
            seed,
            texts,
        } => {
            let mut options = RankOptions::default()
                .with_candidates(candidates, beams)
                .with_temperature(temperature);
            if let Some(seed) = seed {
                options = options.with_seed(seed);
            }
            let sets = service
                .rank(TranslationRequest::new(texts, source), options)
                .await?;
            print_candidates(&sets, args.json)?;
        }
        Command::Coverage => {
            let coverage = service.engine().coverage();
            if args.json {
                println!("{}", serde_json::to_string_pretty(&coverage)?);
            } else {
                println!("device: {:?}", coverage.device);
                println!("forward: {}", coverage.forward);
                println!("reverse: {}", coverage.reverse);
                println!(
                    "low-resource direct: {}",
                    coverage.low_resource_direct.as_deref().unwrap_or("absent")
                );
                println!(
                    "low-resource intermediate: {}",
                    coverage.low_resource_intermediate.as_deref().unwrap_or("absent")
                );
                for route in &coverage.routes {
                    if route.hops.is_empty() {
                        println!("  {} -> placeholder", route.source);
                    } else {
                        println!("  {} -> {}", route.source, route.hops.join(" -> "));
                    }
                }
            }
        }
        Command::Smoke => {
            let response = service
                .translate(TranslationRequest::single("hello", "en"))
                .await?;
            print_translations(&response, args.json)?;
        }
    }

    Ok(())
}

fn print_translations(response: &TranslationResponse, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
    } else {
        for (original, translation) in response.original.iter().zip(&response.translations) {
            println!("{} => {}", original, translation);
        }
    }
    Ok(())
}

fn print_candidates(sets: &[CandidateSet], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(sets)?);
    } else {
        for set in sets {
            println!("{}", set.source);
            for (rank, candidate) in set.candidates.iter().enumerate() {
                println!("  {}. {}", rank + 1, candidate);
            }
        }
    }
    Ok(())
}
