use clap::{Parser, Subcommand};
use std::path::Path;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "transaction-management")]
#[command(about = "Transaction Management - CRUD service for financial transaction records", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Configuration validation
    Config,
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

pub async fn handle_db_migrate(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;

    tracing::info!("Running database migrations...");
    crate::db::run_migrations(&pool, Path::new(crate::db::MIGRATIONS_DIR)).await?;
    println!("✓ Database migrations completed");

    Ok(())
}

pub fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    println!("Configuration:");
    println!("  Server Port: {}", config.server_port);
    println!(
        "  Database URL: {}",
        config
            .database_url
            .as_deref()
            .map(mask_password)
            .unwrap_or_else(|| "(not set)".to_string())
    );
    println!("  Max Connections: {}", config.database_max_connections);
    println!("  Storage: {:?}", config.storage);
    println!("  System Error Policy: {:?}", config.system_error_policy);
    println!("  Log Format: {:?}", config.log_format);
    if let Some(origins) = &config.cors_allowed_origins {
        println!("  CORS Origins: {}", origins.join(", "));
    }

    tracing::info!("Configuration is valid");
    println!("✓ Configuration is valid");

    Ok(())
}

fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            if let Some(slash_pos) = url[..colon_pos].rfind("//") {
                let prefix = &url[..slash_pos + 2];
                let user = &url[slash_pos + 2..colon_pos];
                let suffix = &url[at_pos..];
                return format!("{}{}:****{}", prefix, user, suffix);
            }
        }
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_password() {
        assert_eq!(
            mask_password("postgres://app:secret@db:5432/transactions"),
            "postgres://app:****@db:5432/transactions"
        );
    }

    #[test]
    fn test_mask_password_without_credentials() {
        assert_eq!(
            mask_password("postgres://db:5432/transactions"),
            "postgres://db:5432/transactions"
        );
    }

    #[test]
    fn test_serve_is_default() {
        let cli = Cli::parse_from(["transaction-management"]);
        assert!(cli.command.is_none());

        let cli = Cli::parse_from(["transaction-management", "db", "migrate"]);
        assert!(matches!(cli.command, Some(Commands::Db(DbCommands::Migrate))));
    }
}
