// config.rs
#[derive(Debug, Clone)]
pub struct Config {
    // Privileged tier: used for every mutation
    pub database_url: String,
    // Public tier: read-only role used for anonymous browsing
    pub database_read_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_maxage: i64,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub default_currency: String,
    // Payment provider configurations
    pub active_payment_provider: String,
    pub paystack_secret_key: String,
    pub flutterwave_secret_key: String,
    pub payment_redirect_url: String,
    // Object storage for listing media
    pub media_storage_url: String,
    pub media_bucket: String,
    pub media_access_key: String,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        let jwt_maxage = std::env::var("JWT_MAXAGE").expect("JWT_MAXAGE must be set");

        let database_read_url = std::env::var("DATABASE_READ_URL")
            .ok()
            .filter(|url| !url.is_empty());
        let db_max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(20);
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(8000);

        let cors_origins = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let default_currency = std::env::var("DEFAULT_CURRENCY")
            .unwrap_or_else(|_| "XAF".to_string());

        // Payment provider configurations (with defaults)
        let active_payment_provider = std::env::var("ACTIVE_PAYMENT_PROVIDER")
            .unwrap_or_else(|_| "manual".to_string());
        let paystack_secret_key = std::env::var("PAYSTACK_SECRET_KEY")
            .unwrap_or_else(|_| "test_secret_key".to_string());
        let flutterwave_secret_key = std::env::var("FLUTTERWAVE_SECRET_KEY")
            .unwrap_or_else(|_| "test_secret_key".to_string());
        let payment_redirect_url = std::env::var("PAYMENT_REDIRECT_URL")
            .unwrap_or_default();

        let media_storage_url = std::env::var("MEDIA_STORAGE_URL")
            .unwrap_or_else(|_| "http://localhost:9000".to_string());
        let media_bucket = std::env::var("MEDIA_BUCKET")
            .unwrap_or_else(|_| "listing-media".to_string());
        let media_access_key = std::env::var("MEDIA_ACCESS_KEY")
            .unwrap_or_default();

        Config {
            database_url,
            database_read_url,
            db_max_connections,
            jwt_secret,
            jwt_maxage: jwt_maxage.parse::<i64>().expect("JWT_MAXAGE must be a number of minutes"),
            port,
            cors_origins,
            default_currency,
            active_payment_provider,
            paystack_secret_key,
            flutterwave_secret_key,
            payment_redirect_url,
            media_storage_url,
            media_bucket,
            media_access_key,
        }
    }
}
