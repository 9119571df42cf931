use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use confluence::app::AppContext;
use confluence::cli::{commands, Cli, Commands};
use confluence::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { max_items, workers } => {
            if let Some(workers) = workers {
                config.fetch.workers = workers;
            }
            let ctx = AppContext::new(config)?;
            commands::run(&ctx, max_items).await?;
        }
        Commands::Sources => {
            let ctx = AppContext::new(config)?;
            commands::sources(&ctx)?;
        }
        Commands::ClearCache => {
            let ctx = AppContext::new(config)?;
            commands::clear_cache(&ctx)?;
        }
    }

    Ok(())
}
