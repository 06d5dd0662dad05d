use clap::Parser;
use filmgate::cli::{Args, build_config, init_logging};
use filmgate::{create_app, create_identity_app, run_server, spawn_probes};
use tokio::net::TcpListener;
use tracing::{error, info};

async fn bind(port: u16) -> TcpListener {
    let addr = format!("0.0.0.0:{}", port);
    TcpListener::bind(&addr).await.unwrap_or_else(|e| {
        error!(address = %addr, error = %e, "Failed to bind");
        std::process::exit(1);
    })
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let config = match build_config(&args).await {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Startup failed");
            std::process::exit(1);
        }
    };

    spawn_probes(&config, args.probe_interval());

    let http_listener = bind(args.port).await;
    let rpc_listener = bind(args.rpc_port).await;

    if let Ok(addr) = http_listener.local_addr() {
        info!(address = %addr, "HTTP API listening");
    }
    if let Ok(addr) = rpc_listener.local_addr() {
        info!(address = %addr, "Identity service listening");
    }

    let http = run_server(create_app(&config), http_listener);
    let rpc = run_server(create_identity_app(&config), rpc_listener);

    let result = tokio::select! {
        r = http => r,
        r = rpc => r,
    };
    if let Err(e) = result {
        error!(error = %e, "Server error");
    }
    std::process::exit(1);
}
