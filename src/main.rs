//! Binary entry point: delegates straight to the orchestrator.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rate_fanout_server::orchestrator::run().await
}
