use std::net::SocketAddr;
use std::sync::Arc;

use farewatch_amadeus::{AmadeusClient, OAuthTokenProvider};
use farewatch_api::{app, state::AppState};
use farewatch_store::{DbClient, PostgresWatchlistRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "farewatch_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = farewatch_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting farewatch API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let http = reqwest::Client::new();
    let tokens = Arc::new(OAuthTokenProvider::new(
        http.clone(),
        &config.amadeus.base_url,
        config.amadeus.api_key.clone(),
        config.amadeus.api_secret.clone(),
    ));
    let amadeus = Arc::new(AmadeusClient::new(
        http,
        config.amadeus.base_url.clone(),
        config.amadeus.currency.clone(),
        config.amadeus.max_results,
        tokens,
    ));

    let app_state = AppState {
        amadeus,
        watchlist: Arc::new(PostgresWatchlistRepository {
            pool: db.pool.clone(),
        }),
        search: config.search.clone(),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
