use std::{net::SocketAddr, sync::Arc, time::Duration};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_api::{
    auth::TokenIssuer,
    config::AppConfig,
    db::{create_orm_conn_with, run_migrations},
    routes::create_app,
    services::user_service,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,storefront_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let orm = create_orm_conn_with(&config).await?;
    run_migrations(&orm).await?;

    let tokens = TokenIssuer::new(
        config.jwt_secret.as_bytes(),
        chrono::Duration::hours(config.token_ttl_hours),
    );
    let state = AppState {
        orm,
        tokens: Arc::new(tokens),
    };

    let repaired = user_service::repair_plaintext_passwords(&state).await?;
    if repaired > 0 {
        tracing::warn!(repaired, "re-hashed plaintext passwords");
    }

    let app = create_app(state, Duration::from_secs(config.request_timeout_secs));

    let addr = SocketAddr::from((config.host.parse::<std::net::IpAddr>()?, config.port));
    tracing::info!("listening on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}
