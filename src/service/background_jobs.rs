// service/background_jobs.rs
use std::sync::Arc;

use chrono::Utc;
use tokio::time::{interval, Duration};

use crate::{db::paymentdb::PaymentExt, AppState};

/// Flip active promotions past their expiry and recompute listing flags
pub async fn start_promotion_expiry_job(app_state: Arc<AppState>) {
    let mut interval = interval(Duration::from_secs(3600)); // Run every hour

    loop {
        interval.tick().await;

        tracing::info!("Running promotion expiry job at {}", Utc::now());

        match app_state.promotion_service.expire_due().await {
            Ok(count) => tracing::info!("Promotion expiry job completed: {} promotions expired", count),
            Err(e) => tracing::error!("Promotion expiry job failed: {}", e),
        }
    }
}

/// Mark active campaigns whose end date has passed as completed
pub async fn start_campaign_completion_job(app_state: Arc<AppState>) {
    let mut interval = interval(Duration::from_secs(3600));

    loop {
        interval.tick().await;

        tracing::info!("Running campaign completion job at {}", Utc::now());

        match app_state.ad_service.complete_ended().await {
            Ok(count) => tracing::info!("Campaign completion job completed: {} campaigns ended", count),
            Err(e) => tracing::error!("Campaign completion job failed: {}", e),
        }
    }
}

/// Close pending payments left open past the payment window
pub async fn start_payment_expiry_job(app_state: Arc<AppState>) {
    let mut interval = interval(Duration::from_secs(1800)); // Run every 30 minutes

    loop {
        interval.tick().await;

        match app_state.db_client.expire_stale_payments().await {
            Ok(0) => {}
            Ok(count) => tracing::info!("Payment expiry job: {} pending payments expired", count),
            Err(e) => tracing::error!("Payment expiry job failed: {}", e),
        }
    }
}
