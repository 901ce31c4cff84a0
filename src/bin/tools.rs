//! Offline maintenance commands: ingredient import, training-data export
//! and index rebuilds.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use food_rec_api::{
    config::Config,
    db::{open_cache, open_repository},
    services::{
        export::export_training_data, ingredients::IngredientLoader, RecommendationService,
        RecommenderSettings,
    },
};

#[derive(Parser)]
#[command(name = "food-rec-tools", version, about = "Food recommendation maintenance tools")]
struct Cli {
    /// Use an empty in-memory store (dry runs)
    #[arg(long, global = true)]
    in_memory: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import ingredients from Open Food Facts, Edamam and USDA
    LoadIngredients,
    /// Write recipes.json and interactions.json for offline training
    ExportData {
        #[arg(long, default_value = "data/raw")]
        output: PathBuf,
    },
    /// Build and persist the recommendation index
    Train,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let repo = open_repository(&config, cli.in_memory).await?;

    match cli.command {
        Command::LoadIngredients => {
            let (cache, handle) = match open_cache(&config)? {
                Some((cache, handle)) => (Some(cache), Some(handle)),
                None => (None, None),
            };

            let loader = IngredientLoader::from_config(repo, cache, &config);
            let report = loader.load_all().await;

            if let Some(handle) = handle {
                handle.shutdown().await;
            }
            let report = report?;
            println!(
                "Loaded {} new ingredients ({} unique of {} fetched, {} failed requests)",
                report.inserted, report.unique, report.fetched, report.failed_requests
            );
        }
        Command::ExportData { output } => {
            let summary = export_training_data(repo.as_ref(), &output).await?;
            println!(
                "Exported {} recipes to {} and {} interactions to {}",
                summary.recipes,
                summary.recipes_path.display(),
                summary.interactions,
                summary.interactions_path.display()
            );
        }
        Command::Train => {
            let service = RecommendationService::new(repo, None, RecommenderSettings::from(&config));
            let summary = service.train().await?;
            println!(
                "Trained index {} on {} recipes, {} users, {} interactions -> {}",
                summary.version, summary.recipes, summary.users, summary.interactions, config.model_path
            );
        }
    }

    Ok(())
}
