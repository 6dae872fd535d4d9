use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use meditin_core::{
    domain::{
        repositories::sessions::SessionRepository,
        value_objects::{
            plans::{ListPlansQuery, Plan, SelectPlanRequest},
            sessions::{CreateSessionModel, SessionDetailDto, SessionDto, SessionProfile},
        },
    },
    notifications::NotificationSink,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
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
        .route("/plans", get(list_plans))
        .route("/", post(create).get(list))
        .route("/:session_id", get(get_session))
        .route("/:session_id/profile", put(update_profile))
        .route("/:session_id/plan", post(select_plan))
        .route("/:session_id/checkout", post(checkout))
        .route("/:session_id/cancel-payment", post(cancel_payment))
        .route("/:session_id/cancel", post(cancel))
        .with_state(usecase)
}

pub async fn list_plans<R, G, N>(
    State(usecase): State<Arc<BookingUseCase<R, G, N>>>,
    _auth: AuthUser,
    Query(query): Query<ListPlansQuery>,
) -> Result<Json<Vec<Plan>>, AppError>
where
    R: SessionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    Ok(Json(usecase.list_plans(&query.purpose)?))
}

pub async fn create<R, G, N>(
    State(usecase): State<Arc<BookingUseCase<R, G, N>>>,
    auth: AuthUser,
    Json(model): Json<CreateSessionModel>,
) -> Result<(StatusCode, Json<SessionDto>), AppError>
where
    R: SessionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    let session = usecase.create(auth.user_id, model).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn list<R, G, N>(
    State(usecase): State<Arc<BookingUseCase<R, G, N>>>,
    auth: AuthUser,
) -> Result<Json<Vec<SessionDto>>, AppError>
where
    R: SessionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    Ok(Json(usecase.sessions_for_owner(auth.user_id).await?))
}

pub async fn get_session<R, G, N>(
    State(usecase): State<Arc<BookingUseCase<R, G, N>>>,
    auth: AuthUser,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionDetailDto>, AppError>
where
    R: SessionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    Ok(Json(usecase.session_for_owner(auth.user_id, session_id).await?))
}

pub async fn update_profile<R, G, N>(
    State(usecase): State<Arc<BookingUseCase<R, G, N>>>,
    auth: AuthUser,
    Path(session_id): Path<Uuid>,
    Json(profile): Json<SessionProfile>,
) -> Result<Json<SessionDto>, AppError>
where
    R: SessionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    Ok(Json(
        usecase
            .update_profile(auth.user_id, session_id, profile)
            .await?,
    ))
}

pub async fn select_plan<R, G, N>(
    State(usecase): State<Arc<BookingUseCase<R, G, N>>>,
    auth: AuthUser,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SelectPlanRequest>,
) -> Result<Json<SessionDto>, AppError>
where
    R: SessionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    Ok(Json(
        usecase
            .select_plan(auth.user_id, session_id, &request.plan_id)
            .await?,
    ))
}

pub async fn checkout<R, G, N>(
    State(usecase): State<Arc<BookingUseCase<R, G, N>>>,
    auth: AuthUser,
    Path(session_id): Path<Uuid>,
) -> Result<Json<CheckoutOutcome>, AppError>
where
    R: SessionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    Ok(Json(usecase.checkout(auth.user_id, session_id).await?))
}

pub async fn cancel_payment<R, G, N>(
    State(usecase): State<Arc<BookingUseCase<R, G, N>>>,
    auth: AuthUser,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionDto>, AppError>
where
    R: SessionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    Ok(Json(usecase.on_gateway_cancel(auth.user_id, session_id).await?))
}

pub async fn cancel<R, G, N>(
    State(usecase): State<Arc<BookingUseCase<R, G, N>>>,
    auth: AuthUser,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionDto>, AppError>
where
    R: SessionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    Ok(Json(usecase.cancel(auth.user_id, session_id).await?))
}
