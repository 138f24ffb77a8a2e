use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use barbershop::app_router;
use barbershop::auth;
use barbershop::config::AppConfig;
use barbershop::db;
use barbershop::services::notifications::SmtpMailer;
use barbershop::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;
    auth::bootstrap_admin(
        &conn,
        &config.admin_username,
        &config.admin_email,
        &config.admin_password,
    )?;

    let mailer = SmtpMailer::new(&config)?;

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        mailer: Box::new(mailer),
    });

    let app = app_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
