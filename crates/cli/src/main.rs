//! Libris command line.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use libris_app::modules::{self, books::MemoryBookStore};
use libris_app::Application;
use libris_kernel::settings::StorageBackend;
use libris_kernel::{ModuleRegistry, Settings};

/// Libris book inventory service
#[derive(Parser, Debug)]
#[command(name = "libris-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server
    Serve,

    /// Apply pending migrations to the configured SQLite database
    Migrate,

    /// Print the merged OpenAPI document
    Openapi,

    /// Print the resolved settings as JSON
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load().context("failed to load Libris settings")?;

    match cli.command {
        Command::Serve => {
            libris_telemetry::init(&settings.telemetry)?;
            Application::build(settings).await?.run().await
        }
        Command::Migrate => {
            libris_telemetry::init(&settings.telemetry)?;
            let mut settings = settings;
            settings.database.backend = StorageBackend::Sqlite;

            let app = Application::build(settings).await?;
            let applied = app.migrate().await?;
            app.registry().stop_all().await?;
            tracing::info!(applied, "migrate finished");
            println!("applied {applied} migration(s)");
            Ok(())
        }
        Command::Openapi => {
            // Paths and schemas do not depend on the backend.
            let mut registry = ModuleRegistry::new();
            modules::register_all(&mut registry, Arc::new(MemoryBookStore::new()));
            let document =
                libris_http::router::openapi_document(&registry, &settings.server.api_prefix);
            println!("{}", serde_json::to_string_pretty(&document)?);
            Ok(())
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}
