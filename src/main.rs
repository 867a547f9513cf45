use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};

use gdlsp::server::{self, ServerConfig};

/// Install the stderr subscriber.
///
/// The filter comes from `GDLSP_LOG`, then `RUST_LOG`, then `info`.
/// `GDLSP_LOG_FORMAT=json` switches to one JSON object per event.
fn init_tracing() {
    let filter = std::env::var("GDLSP_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .map(|value| EnvFilter::builder().parse_lossy(value))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let json = std::env::var("GDLSP_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json {
        let layer = fmt::layer().json().with_writer(std::io::stderr);
        Registry::default().with(filter).with(layer).init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_tracing();

    let runtime = if config.use_thread {
        tokio::runtime::Builder::new_multi_thread()
    } else {
        tokio::runtime::Builder::new_current_thread()
    }
    .enable_all()
    .build()
    .context("failed to start the async runtime")?;

    let result = runtime.block_on(async {
        tokio::select! {
            result = server::serve(config) => result.context("server stopped"),
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                tracing::info!("interrupted, shutting down");
                Ok(())
            }
        }
    });

    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}
