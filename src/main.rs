use anyhow::Context;
use libris_app::Application;
use libris_kernel::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load Libris settings")?;
    libris_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        backend = ?settings.database.backend,
        "libris bootstrap starting"
    );

    Application::build(settings).await?.run().await
}
