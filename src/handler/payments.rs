use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::Path,
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};

use crate::{
    db::paymentdb::PaymentExt,
    error::HttpError,
    models::paymentmodel::{PaymentPurpose, PaymentStatus},
    service::payment_provider::{GatewayStatus, PaymentError},
    AppState,
};

pub fn payments_handler() -> Router {
    Router::new()
        .route("/methods", get(get_payment_methods))
        .route("/webhook/:provider", post(handle_payment_webhook))
}

pub async fn get_payment_methods(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let gateway = &app_state.payment_gateway;
    let methods: Vec<serde_json::Value> = gateway
        .supported_methods()
        .into_iter()
        .map(|method| {
            serde_json::json!({
                "method": method,
                "requires_admin_confirmation": gateway.is_out_of_band(method)
            })
        })
        .collect();

    Ok(Json(serde_json::json!({
        "status": "success",
        "provider": gateway.provider_name(),
        "methods": methods
    })))
}

fn webhook_signature<'a>(provider: &str, headers: &'a HeaderMap) -> Option<&'a str> {
    let header = match provider {
        "paystack" => "x-paystack-signature",
        "flutterwave" => "verif-hash",
        _ => return None,
    };
    headers.get(header).and_then(|value| value.to_str().ok())
}

impl From<PaymentError> for HttpError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::InvalidSignature => HttpError::unauthorized(err.to_string()),
            PaymentError::Http(_) => HttpError::server_error(err.to_string()),
            _ => HttpError::bad_request(err.to_string()),
        }
    }
}

pub async fn handle_payment_webhook(
    Path(provider): Path<String>,
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpError> {
    let signature = webhook_signature(&provider, &headers);

    let event = app_state
        .payment_gateway
        .process_webhook(&provider, signature, &body)
        .await
        .map_err(|e| {
            tracing::warn!("Rejected {} webhook: {}", provider, e);
            HttpError::from(e)
        })?;

    let payment = app_state
        .db_client
        .get_payment_by_reference(&event.reference)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let Some(payment) = payment else {
        tracing::warn!(
            "Webhook {} for unknown reference {}",
            event.event_type,
            event.reference
        );
        return Ok(Json(serde_json::json!({ "status": "ignored" })));
    };

    match event.status {
        GatewayStatus::Completed => {
            if payment.transaction_type == PaymentPurpose::VisitFee {
                app_state
                    .visit_service
                    .settle_from_gateway(&payment.our_reference, event.gateway_reference)
                    .await?;
            } else {
                app_state
                    .db_client
                    .update_payment_status(
                        &payment.our_reference,
                        &[PaymentStatus::Pending, PaymentStatus::Expired],
                        PaymentStatus::Completed,
                        event.gateway_reference,
                    )
                    .await
                    .map_err(|e| HttpError::server_error(e.to_string()))?;
            }
        }
        GatewayStatus::Failed => {
            app_state
                .db_client
                .update_payment_status(
                    &payment.our_reference,
                    &[PaymentStatus::Pending],
                    PaymentStatus::Failed,
                    event.gateway_reference,
                )
                .await
                .map_err(|e| HttpError::server_error(e.to_string()))?;
        }
        GatewayStatus::Pending => {}
    }

    tracing::info!(
        "Processed {} webhook {} for {}",
        provider,
        event.event_type,
        payment.our_reference
    );

    Ok(Json(serde_json::json!({ "status": "success" })))
}
