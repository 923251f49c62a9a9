use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use axum::{error_handling::HandleErrorLayer, BoxError};
use sqlx::postgres::PgPoolOptions;
use tower::{buffer::BufferLayer, limit::RateLimitLayer, ServiceBuilder};
use tracing_subscriber::EnvFilter;

use inkstudio_api::{
    app::{
        envy::Envy,
        errors::DefaultApiError,
        util::events::{EventSink, TracingSink},
    },
    provider::{replicate::service::ReplicateClient, service::Gateway},
    quota::{
        service::QuotaGuard,
        store::{MemoryUsageStore, PgUsageStore, UsageStore},
        subscriptions::{NoSubscriptions, RevenueCatClient, SubscriptionProvider},
    },
    AppState,
};

#[tokio::main]
async fn main() {
    // tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // environment
    let app_env = env::var("APP_ENV").unwrap_or("development".to_string());
    let _ = dotenvy::from_filename(format!(".env.{}", app_env));
    let envy = match envy::from_env::<Envy>() {
        Ok(config) => config,
        Err(e) => panic!("{:#?}", e),
    };

    // properties
    let port = envy.port.unwrap_or(3000);
    let events: Arc<dyn EventSink> = Arc::new(TracingSink);

    let replicate = ReplicateClient::new(&envy.replicate_api_key, envy.provider_timeout());
    let gateway = Gateway::new(Arc::new(replicate), events.clone())
        .with_retries(envy.provider_max_retries.unwrap_or(0), Duration::from_secs(2));

    let subscriptions: Arc<dyn SubscriptionProvider> = match &envy.revenuecat_api_key {
        Some(api_key) => Arc::new(RevenueCatClient::new(
            api_key,
            envy.revenuecat_entitlement.clone(),
        )),
        None => {
            tracing::warn!("REVENUECAT_API_KEY not set, every user is treated as unsubscribed");
            Arc::new(NoSubscriptions)
        }
    };

    let store: Arc<dyn UsageStore> = match &envy.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(50)
                .idle_timeout(Some(Duration::from_secs(60)))
                .connect(database_url)
                .await
                .expect("failed to connect to database");

            let store = PgUsageStore::new(pool);
            store
                .ensure_table()
                .await
                .expect("failed to prepare usage_records table");

            tracing::info!("connected to db");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, usage records are kept in memory");
            Arc::new(MemoryUsageStore::default())
        }
    };

    let quota = QuotaGuard::new(subscriptions, store, events.clone())
        .with_daily_limit(envy.daily_limit());

    let state = AppState {
        gateway: Arc::new(gateway),
        quota: Arc::new(quota),
        events,
    };

    // app
    let app = inkstudio_api::router(state, envy.max_upload_bytes()).layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(|err: BoxError| async move {
                tracing::error!(%err, "request rejected by service layer");
                DefaultApiError::InternalServerError.value()
            }))
            .layer(BufferLayer::new(1024))
            .layer(RateLimitLayer::new(20, Duration::from_secs(1))),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {} ({})", addr, envy.app_env);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .expect("server error");
}
