use std::process::ExitCode;

use brokerscope::brokers::topology::demo;
use brokerscope::config::Config;
use brokerscope::dashboard::server::start_dashboard_server;
use brokerscope::BrokerScope;
use tracing_subscriber::EnvFilter;

// ========================================
// MAIN ENTRY POINT
// ========================================

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.server.log_level))
        .init();

    let engine = BrokerScope::new(&config);

    if config.server.seed_demo {
        match demo::seed(&engine.topology) {
            Ok(()) => tracing::info!("📦 Demo topology seeded"),
            Err(e) => tracing::warn!(error = %e, code = e.reply_code(), "Failed to seed demo topology"),
        }
    }

    tracing::info!("🚀 BrokerScope v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(e) = start_dashboard_server(engine, &config.server.host, config.server.dashboard_port).await {
        tracing::error!(error = %e, "Dashboard server stopped");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
