// Finance Manager - Web Server
// Opens the store once, serves the REST API until Ctrl+C

use anyhow::{Context, Result};
use finance_manager::server::{router, AppState};
use finance_manager::{init_tracing, ExpenseStore, Settings};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::new().context("Failed to load settings")?;
    init_tracing(&settings.log_level);

    let store = ExpenseStore::open(&settings.database_path)?;
    let state = AppState::new(store, settings.monthly_income, settings.recent_limit);

    let listener = tokio::net::TcpListener::bind(&settings.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", settings.bind))?;

    info!("server running on http://{}", settings.bind);
    info!("API: http://{}/api/expenses", settings.bind);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
        .context("Server failed")?;

    Ok(())
}
