mod ingest;
mod scrape;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "bizscrape-cli")]
#[command(about = "Business listing scraper command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape the given URLs once and print the result as JSON
    Scrape {
        /// Page to scrape; repeat for several
        #[arg(long = "url", required = true)]
        urls: Vec<String>,
        /// Lower the in-flight request bound for this session
        #[arg(long)]
        max_concurrency: Option<usize>,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Run the configured seed list once, persisting businesses and the audit
    Ingest {
        /// Run and print without touching the database
        #[arg(long)]
        dry_run: bool,
    },
    /// List recent scrape runs
    Runs {
        #[arg(long, default_value = "20")]
        limit: i64,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check the database connection
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = bizscrape_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    // Logs go to stderr so stdout stays clean JSON.
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Scrape {
            urls,
            max_concurrency,
            pretty,
        }) => scrape::run_scrape(&config, &urls, max_concurrency, pretty).await,
        Some(Commands::Ingest { dry_run }) => ingest::run_ingest(&config, dry_run).await,
        Some(Commands::Runs { limit }) => ingest::run_list_runs(&config, limit).await,
        Some(Commands::Db { command }) => run_db(&config, command).await,
        None => {
            println!("bizscrape-cli: no command given; see --help");
            Ok(())
        }
    }
}

async fn run_db(config: &bizscrape_core::AppConfig, command: DbCommands) -> anyhow::Result<()> {
    let pool = bizscrape_db::connect_pool_from_config(config).await?;
    match command {
        DbCommands::Ping => {
            bizscrape_db::health_check(&pool).await?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = bizscrape_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
