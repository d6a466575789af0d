//! Edge server entry-point: session guard, page shells, `/api` passthrough
//! and health probes.

use actix_web::web;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use dashboard::inbound::http::health::HealthState;
use dashboard::server::{ServerConfig, create_server};
use dashboard::settings::DashboardSettings;

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = DashboardSettings::load_from_args().map_err(std::io::Error::other)?;
    let config = ServerConfig::from_settings(&settings).map_err(std::io::Error::other)?;
    info!(
        bind_addr = %config.bind_addr(),
        api_base = %config.api_base(),
        "starting edge server"
    );

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), config)?;
    let outcome = server.await;
    health_state.mark_unhealthy();
    outcome
}
