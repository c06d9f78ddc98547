use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use relay::config::Config;
use relay::proxy::ProxyRegistry;
use relay::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let config_path = env::var_os("RELAY_CONFIG").map(PathBuf::from);
    let cfg = Config::load(config_path.as_deref())?;

    let registry = Arc::new(ProxyRegistry::new());

    let result = tokio::select! {
        res = server::run(&cfg, Arc::clone(&registry)) => res,

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
            Ok(())
        }
    };

    registry.shutdown().await;
    result
}
