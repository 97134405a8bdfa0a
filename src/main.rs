use std::sync::Arc;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::EnvFilter;

use marketnest::{
    config::Config,
    db::db::DBClient,
    routes::create_router,
    service::{
        background_jobs,
        payment_provider::PaymentProcessorFactory,
        side_effects::{side_effect_channel, RetryPolicy, SideEffectHandler},
    },
    AppState,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    dotenv().ok();

    let config = Config::init();

    let pool = match PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!(
                "Connected to the database (max connections: {})",
                config.db_max_connections
            );
            pool
        }
        Err(err) => {
            tracing::error!("Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = sqlx::migrate!("./migrations").run(&pool).await {
        tracing::error!("Failed to run migrations: {}", err);
        std::process::exit(1);
    }

    // Anonymous browsing goes through the read tier when one is configured
    let db_client = match config.database_read_url.as_deref() {
        Some(read_url) => match PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect(read_url)
            .await
        {
            Ok(read_pool) => DBClient::with_read_pool(pool, read_pool),
            Err(err) => {
                tracing::warn!("Read tier unavailable ({}), using the primary pool", err);
                DBClient::new(pool)
            }
        },
        None => DBClient::new(pool),
    };
    let db_client = Arc::new(db_client);
    tracing::info!("Database read tier: {}", db_client.read_tier_status());

    let payment_gateway = PaymentProcessorFactory::from_config(&config);
    tracing::info!("Payment provider: {}", payment_gateway.provider_name());

    let handler: Arc<dyn SideEffectHandler> = db_client.clone();
    let (side_effects, worker) = side_effect_channel(handler, RetryPolicy::default());
    tokio::spawn(worker.run());

    let app_state = Arc::new(AppState::new(
        config.clone(),
        db_client,
        payment_gateway,
        side_effects,
    ));

    let allowed_origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::PATCH]);

    let app = create_router(app_state.clone()).layer(cors);

    // Start background jobs
    tokio::spawn(background_jobs::start_promotion_expiry_job(app_state.clone()));
    tokio::spawn(background_jobs::start_campaign_completion_job(app_state.clone()));
    tokio::spawn(background_jobs::start_payment_expiry_job(app_state.clone()));

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("Failed to bind port {}: {}", config.port, err);
            std::process::exit(1);
        }
    };

    tracing::info!("Server is running on http://localhost:{}", config.port);

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", err);
    }
}
