pub mod api;
pub mod commands;
pub mod error;
pub mod session;
pub mod state;
pub mod store;
pub mod stream;
pub mod upload;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Load `.env` and install the tracing subscriber. Call once at start-up.
pub fn init() {
    // Load environment variables from .env file (for development)
    let _ = dotenvy::dotenv();

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "casedesk=info,casedesk_lib=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();

    tracing::debug!("Starting CaseDesk");
}
