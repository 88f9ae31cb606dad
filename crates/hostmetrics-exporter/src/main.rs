//! hostmetrics-exporter
//!
//! Samples host CPU and memory on a timer and serves them at `GET /metrics`.
//! Usage: `hostmetrics-exporter [config.yaml]`

use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use hostmetrics_core::error::Result;
use hostmetrics_exporter::sampler::{Sampler, SystemCounters};
use hostmetrics_exporter::{app_state, collector, config, router, server};

#[tokio::main]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.code(), error = %e, "hostmetrics-exporter failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let path = std::env::args().nth(1);
    let cfg = config::load(path.as_deref())?;
    let listen = cfg.listen_addr()?;

    let state = app_state::AppState::new(cfg)?;

    // bind before arming the collector so a taken port fails fast
    let listener = server::bind(listen).await?;

    let sampler = Sampler::new(SystemCounters::new(), state.cfg().exporter.cpu_mode);
    let collector = collector::spawn_with_sources(
        sampler,
        state.gauges().clone(),
        state.registry(),
        state.cfg().scrape_interval(),
    );

    let app = router::build_router(state);
    let served = server::serve(listener, app, server::shutdown_signal()).await;

    collector.shutdown();
    served
}
