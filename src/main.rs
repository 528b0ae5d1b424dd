//! Process bootstrap for the BFF dispatcher.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bff_dispatcher::config::{ArtifactWatcher, ConfigStore, Loader};
use bff_dispatcher::observability::{access_log::AccessLogSink, metrics};
use bff_dispatcher::render::FileRenderer;
use bff_dispatcher::{HttpServer, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "bff-dispatcher", about = "Backend-for-frontend request dispatcher")]
struct Args {
    /// Work directory containing the configuration artifacts.
    #[arg(default_value = ".")]
    workdir: PathBuf,

    /// Run mode: which section of launchpack.json to load.
    #[arg(default_value = "local")]
    run_mode: String,

    /// Override the configured bind address.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bff_dispatcher=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    tracing::info!(
        workdir = ?args.workdir,
        run_mode = %args.run_mode,
        "bff-dispatcher starting"
    );

    // Configuration correctness is a precondition for serving traffic:
    // outside watch mode a broken required artifact terminates here.
    let store = Arc::new(ConfigStore::new(Loader::new(
        &args.workdir,
        args.run_mode.as_str(),
    )));
    store.bootstrap()?;
    let settings = store.settings();

    tracing::info!(
        bind_address = %settings.bind_address,
        watch = settings.watch,
        upstream_timeout_secs = settings.upstream_timeout_secs,
        "Configuration loaded"
    );

    if settings.metrics_enabled {
        match settings.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %settings.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();

    if settings.watch {
        let _ = ArtifactWatcher::new(store.clone()).spawn(shutdown.subscribe())?;
    }

    let renderer = Arc::new(FileRenderer::new(args.workdir.join("views")));
    let access_log = AccessLogSink::new();
    let server = HttpServer::new(store.clone(), renderer, access_log);

    let bind_address = args.bind.unwrap_or_else(|| settings.bind_address.clone());
    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
