//! Headless host bridge binary for stdin/stdout JSON communication.
//!
//! Serves the command contract with no agent attached: readiness is answered
//! with an empty `ui.initialize` snapshot and chat messages get a system
//! notice. Useful for exercising the shell and as a protocol reference.
//!
//! All tracing/diagnostic output goes to stderr so that stdout remains a
//! clean JSON protocol channel.

use singularity::config::ShellConfig;
use singularity::host::channel::{NoopHostHandler, PushSender};
use singularity::host::stdio::run_stdio_bridge;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Stdout is reserved for the JSON protocol.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("singularity=info")),
        )
        .init();

    let config = ShellConfig::load_or_default(&ShellConfig::resolve_config_path())?;
    tracing::info!("singularity-host starting");

    let pushes = PushSender::new(config.bridge.event_capacity);
    run_stdio_bridge(
        NoopHostHandler::new(pushes.clone()),
        pushes,
        config.bridge.request_capacity,
    )
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "singularity-host exited with error");
        anyhow::anyhow!("singularity-host failed: {e}")
    })?;

    tracing::info!("singularity-host shut down cleanly");
    Ok(())
}
