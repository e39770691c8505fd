use std::sync::Arc;

use devhost::config::{AppState, Config, ServeOptions};
use devhost::{logger, server};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional positional argument: the directory to serve
    let cfg = Config::load(std::env::args().nth(1))?;
    logger::init(&cfg.logging)?;

    // Create the Tokio runtime, sizing the worker pool from the configuration
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let options = ServeOptions::from_config(&cfg.serve)?;
    let addr = cfg.get_socket_addr()?;
    let listener = server::bind_with_retry(addr, cfg.server.strict_port)?;

    logger::log_server_start(&listener.local_addr()?, options.root(), cfg.server.workers);
    logger::log_debug(&format!(
        "Effective configuration: {}",
        serde_json::to_string(&cfg)?
    ));

    let state = Arc::new(
        AppState::new(options, &cfg.logging).with_keep_alive(cfg.server.keep_alive),
    );
    server::run(listener, state).await?;
    Ok(())
}
