use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use meditin_core::{
    domain::repositories::sessions::SessionRepository,
    notifications::NotificationSink,
    payments::paystack_client::PAYSTACK_SIGNATURE_HEADER,
};
use serde_json::{Value, json};
use tracing::warn;

use crate::{
    axum_http::error_responses::AppError,
    usecases::bookings::{BookingUseCase, PaymentGateway},
};

pub fn routes<R, G, N>(usecase: Arc<BookingUseCase<R, G, N>>) -> Router
where
    R: SessionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    Router::new()
        .route("/", post(paystack))
        .with_state(usecase)
}

pub async fn paystack<R, G, N>(
    State(usecase): State<Arc<BookingUseCase<R, G, N>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError>
where
    R: SessionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    let Some(signature) = headers
        .get(PAYSTACK_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
    else {
        warn!("paystack webhook: missing signature header");
        return Err(AppError::Unauthorized(format!(
            "missing {PAYSTACK_SIGNATURE_HEADER} header"
        )));
    };

    let receipt = usecase.handle_paystack_webhook(&body, signature).await?;
    Ok(Json(json!({ "received": true, "settlement": receipt })))
}
