use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use agentboard::agent::AgentWorker;
use agentboard::ai::AnthropicClient;
use agentboard::api::{self, AppState};
use agentboard::config::Config;
use agentboard::db::Database;
use agentboard::events::EventBus;
use agentboard::notify::TelegramNotifier;
use agentboard::workflow::Workflow;

#[derive(Parser)]
#[command(name = "agentboard")]
#[command(about = "Work item board with an autonomous implementer")]
struct Cli {
    /// SQLite database file (overrides AGENTBOARD_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API and the agent worker
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Do not start the agent worker
        #[arg(long)]
        no_worker: bool,
    },
    /// Run a single agent worker tick and exit
    Tick,
    /// Print the next unblocked item of a project
    Next {
        project_id: Uuid,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "agentboard=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

struct Services {
    db: Database,
    workflow: Workflow,
    worker: AgentWorker,
}

fn build(config: &Config) -> anyhow::Result<Services> {
    let db = match &config.db_path {
        Some(path) => Database::open(path.clone())?,
        None => Database::open_default()?,
    };
    db.migrate()?;

    let events = EventBus::new();
    let notifier = Arc::new(TelegramNotifier::new(
        db.clone(),
        config.telegram_api_url.clone(),
    ));
    let workflow = Workflow::new(db.clone(), events, notifier);

    let generator = Arc::new(AnthropicClient::new(
        config.anthropic.base_url.clone(),
        config.anthropic.model.clone(),
        config.anthropic.max_tokens,
    ));
    let worker = AgentWorker::new(db.clone(), workflow.executor().clone(), generator);

    Ok(Services {
        db,
        workflow,
        worker,
    })
}

async fn serve(services: Services, config: &Config, port: u16, no_worker: bool) -> anyhow::Result<()> {
    let worker = if no_worker {
        tracing::info!("Agent worker disabled");
        None
    } else {
        Some(services.worker.clone().spawn(config.schedule))
    };

    let app = api::create_router(AppState::new(
        services.db,
        services.workflow,
        services.worker,
    ));

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("agentboard listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    if let Some(worker) = worker {
        worker.stop().await;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = Config::from_env();
    if let Some(db) = cli.db {
        config.db_path = Some(db);
    }
    let services = build(&config)?;

    match cli.command {
        Some(Commands::Serve { port, no_worker }) => {
            serve(services, &config, port, no_worker).await?;
        }
        Some(Commands::Tick) => {
            let report = services.worker.tick().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Some(Commands::Next { project_id }) => match services.workflow.next_unblocked(project_id)? {
            Some(item) => println!("{}", serde_json::to_string_pretty(&item)?),
            None => println!("No approved unblocked items available"),
        },
        None => {
            serve(services, &config, config.port, false).await?;
        }
    }

    Ok(())
}
