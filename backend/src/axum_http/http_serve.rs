use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use meditin_core::{
    domain::{clock::SystemClock, repositories::sessions::SessionRepository},
    infra::db::{postgres::postgres_connection::PgPoolSquad, repositories::sessions::SessionPostgres},
    notifications::{self, NotificationSink, Notifier},
    payments::paystack_client::PaystackClient,
    pricing::{capacity::ConfiguredCapacity, catalog::PricingCatalog, discount::DiscountPolicy},
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

use crate::{
    axum_http::{default_routers, routers},
    config::config_model::DotEnvyConfig,
    usecases::bookings::{BookingPolicy, BookingRules, BookingUseCase, PaymentGateway},
};

pub type ProductionBookingUseCase = BookingUseCase<SessionPostgres, PaystackClient, Notifier>;

pub fn build_booking_usecase(
    config: &DotEnvyConfig,
    db_pool: Arc<PgPoolSquad>,
) -> ProductionBookingUseCase {
    let booking = &config.booking;

    let policy = BookingPolicy {
        discount: DiscountPolicy::new(booking.early_bird_days, booking.discount_percent),
        capacity: Arc::new(ConfiguredCapacity::new(
            booking.waitlisted_categories.iter().copied(),
        )),
        rules: BookingRules {
            min_lead_days: booking.min_lead_days,
            window_start: booking.window_start,
            window_end: booking.window_end,
            time_zone: booking.time_zone,
        },
    };

    BookingUseCase::new(
        Arc::new(SessionPostgres::new(db_pool)),
        Arc::new(PaystackClient::new(
            config.paystack.secret_key.clone(),
            config.paystack.callback_url.clone(),
        )),
        Arc::new(notifications::notifier_from_env()),
        Arc::new(PricingCatalog::standard()),
        policy,
        Arc::new(SystemClock),
    )
}

/// Every `/api/v1` route without the transport layers.
pub fn api_router<R, G, N>(usecase: Arc<BookingUseCase<R, G, N>>) -> Router
where
    R: SessionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    Router::new()
        .fallback(default_routers::not_found)
        .nest(
            "/api/v1/bookings",
            routers::bookings::routes(Arc::clone(&usecase)),
        )
        .nest(
            "/api/v1/admin/bookings",
            routers::admin_bookings::routes(Arc::clone(&usecase)),
        )
        .nest(
            "/api/v1/webhooks/paystack",
            routers::paystack_webhook::routes(usecase),
        )
        .route("/api/v1/health-check", get(default_routers::health_check))
}

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    let usecase = Arc::new(build_booking_usecase(&config, db_pool));

    let app = api_router(usecase)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::PUT])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
