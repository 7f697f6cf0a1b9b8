use clap::Parser;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transaction_management::adapters::{InMemoryTransactionRepository, PostgresTransactionRepository};
use transaction_management::cli::{Cli, Commands, DbCommands};
use transaction_management::config::{Config, LogFormat, StorageBackend};
use transaction_management::ports::TransactionRepository;
use transaction_management::{cli, create_app, db, middleware, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    init_tracing(config.log_format);

    match cli.command {
        None | Some(Commands::Serve) => serve(config).await,
        Some(Commands::Db(DbCommands::Migrate)) => cli::handle_db_migrate(&config).await,
        Some(Commands::Config) => cli::handle_config_validate(&config),
    }
}

fn init_tracing(format: LogFormat) {
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let repository: Arc<dyn TransactionRepository> = match config.storage {
        StorageBackend::Postgres => {
            let pool = db::create_pool(&config).await?;
            db::run_migrations(&pool, Path::new(db::MIGRATIONS_DIR)).await?;
            Arc::new(PostgresTransactionRepository::new(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, data will not survive a restart");
            Arc::new(InMemoryTransactionRepository::new())
        }
    };

    let state = AppState::new(repository, config.system_error_policy);
    let mut app = create_app(state);
    if let Some(origins) = &config.cors_allowed_origins {
        app = app.layer(middleware::cors_layer(origins));
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
