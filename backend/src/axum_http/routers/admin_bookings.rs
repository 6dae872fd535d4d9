use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use meditin_core::{
    domain::{
        repositories::sessions::SessionRepository,
        value_objects::sessions::{BookingStats, SessionDto, SessionSearchFilter},
    },
    notifications::NotificationSink,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::AdminUser,
    axum_http::error_responses::AppError,
    usecases::bookings::{BookingUseCase, CheckoutOutcome, PaymentGateway},
};

pub fn routes<R, G, N>(usecase: Arc<BookingUseCase<R, G, N>>) -> Router
where
    R: SessionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    Router::new()
        .route("/search", get(search))
        .route("/stats", get(stats))
        .route("/export", get(export))
        .route("/:session_id/promote", post(promote))
        .route("/:session_id/complete", post(complete))
        .with_state(usecase)
}

pub async fn search<R, G, N>(
    State(usecase): State<Arc<BookingUseCase<R, G, N>>>,
    AdminUser(admin): AdminUser,
    Query(filter): Query<SessionSearchFilter>,
) -> Result<Json<Vec<SessionDto>>, AppError>
where
    R: SessionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    info!(admin_id = %admin.user_id, term = ?filter.term, status = ?filter.status, "admin bookings: search");
    Ok(Json(usecase.search_sessions(filter).await?))
}

pub async fn stats<R, G, N>(
    State(usecase): State<Arc<BookingUseCase<R, G, N>>>,
    AdminUser(admin): AdminUser,
) -> Result<Json<BookingStats>, AppError>
where
    R: SessionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    info!(admin_id = %admin.user_id, "admin bookings: stats");
    Ok(Json(usecase.booking_stats().await?))
}

/// Same filter as `/search`, returned as a CSV attachment.
pub async fn export<R, G, N>(
    State(usecase): State<Arc<BookingUseCase<R, G, N>>>,
    AdminUser(admin): AdminUser,
    Query(filter): Query<SessionSearchFilter>,
) -> Result<Response, AppError>
where
    R: SessionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    info!(admin_id = %admin.user_id, term = ?filter.term, status = ?filter.status, "admin bookings: export");
    let export = usecase.export_sessions(filter).await?;

    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export.filename),
            ),
        ],
        export.body,
    )
        .into_response())
}

pub async fn promote<R, G, N>(
    State(usecase): State<Arc<BookingUseCase<R, G, N>>>,
    AdminUser(admin): AdminUser,
    Path(session_id): Path<Uuid>,
) -> Result<Json<CheckoutOutcome>, AppError>
where
    R: SessionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    info!(admin_id = %admin.user_id, %session_id, "admin bookings: promote requested");
    Ok(Json(usecase.promote_from_waitlist(session_id).await?))
}

pub async fn complete<R, G, N>(
    State(usecase): State<Arc<BookingUseCase<R, G, N>>>,
    AdminUser(admin): AdminUser,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionDto>, AppError>
where
    R: SessionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    info!(admin_id = %admin.user_id, %session_id, "admin bookings: complete requested");
    Ok(Json(usecase.complete(session_id).await?))
}
