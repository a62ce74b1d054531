use clap::{Parser, Subcommand};
use memo_screen::{
    report_json, MemoryStore, MockOracle, OpenAiOracle, Oracle, PgSubmissionStore, ScreenConfig,
    ScreeningPipeline, SubmissionStore,
};
use std::io::Read;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "memo-screen", version, about = "Screen memo submissions for prompt injection before judging them")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Screen one memo and print the report as JSON
    Screen {
        /// Memo text; read from stdin when omitted
        #[arg(long)]
        memo: Option<String>,

        /// Use the offline mock oracle instead of the chat completions API
        #[arg(long)]
        mock: bool,

        /// Postgres URL; defaults to DATABASE_URL, falls back to an in-memory store
        #[arg(long)]
        database_url: Option<String>,

        /// Override the model name
        #[arg(long)]
        model: Option<String>,
    },
    /// Create the submissions table
    InitDb {
        #[arg(long)]
        database_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ScreenConfig::from_env();

    match cli.command {
        Command::Screen { memo, mock, database_url, model } => {
            if let Some(model) = model {
                config.model = model;
            }
            if database_url.is_some() {
                config.database_url = database_url;
            }
            config.validate()?;

            let memo = match memo {
                Some(memo) => memo,
                None => {
                    let mut buffer = String::new();
                    std::io::stdin().read_to_string(&mut buffer)?;
                    buffer
                }
            };

            let oracle: Arc<dyn Oracle> = if mock {
                Arc::new(MockOracle::new("cli".to_string()))
            } else {
                Arc::new(OpenAiOracle::new(&config)?)
            };

            let store: Arc<dyn SubmissionStore> = match &config.database_url {
                Some(url) => {
                    info!("Connecting to database: {}", redact(url));
                    let store = PgSubmissionStore::new(url).await.map_err(|e| {
                        error!("Failed to connect to database {}", redact(url));
                        e
                    })?;
                    Arc::new(store)
                }
                None => {
                    info!("No DATABASE_URL set, keeping submissions in memory");
                    Arc::new(MemoryStore::new())
                }
            };

            let pipeline = ScreeningPipeline::new(oracle, store, config);
            let report = pipeline.screen(&memo).await;
            println!("{}", report_json(&report)?);
        }
        Command::InitDb { database_url } => {
            let url = database_url
                .or(config.database_url)
                .ok_or_else(|| anyhow::anyhow!("no database URL given and DATABASE_URL is not set"))?;
            info!("Connecting to database: {}", redact(&url));
            let store = PgSubmissionStore::new(&url).await?;
            store.setup_schema().await?;
        }
    }

    Ok(())
}

/// Hide the password part of a connection string in logs.
fn redact(database_url: &str) -> String {
    match url::Url::parse(database_url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        }
        _ => database_url.to_string(),
    }
}
