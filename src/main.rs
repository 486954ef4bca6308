use anyhow::Context;
use taskboard::config::Settings;
use taskboard::{server, telemetry};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env().context("Failed to load configuration.")?;
    telemetry::init_subscriber(env!("CARGO_PKG_NAME"), "info")?;

    let store = server::build_store(&settings).context("Failed to open the task store.")?;
    let (server, addrs) = server::serve(&settings, store)
        .with_context(|| format!("Failed to bind {}:{}", settings.host, settings.port))?;
    for addr in &addrs {
        tracing::info!(%addr, environment = settings.environment.as_str(), "server listening");
    }

    server.await?;
    tracing::info!("server shut down gracefully");
    Ok(())
}
