use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use chrono::{TimeZone, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use meditin_core::{
    domain::clock::FixedClock,
    infra::memory::sessions::SessionMemory,
    notifications::MockNotificationSink,
    payments::paystack_client::TransactionInitialization,
    pricing::{capacity::ConfiguredCapacity, catalog::PricingCatalog, discount::DiscountPolicy},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    auth::{ADMIN_ROLE, SupabaseClaims},
    axum_http::http_serve,
    usecases::bookings::{BookingPolicy, BookingRules, BookingUseCase, MockPaymentGateway},
};

const SECRET: &str = "router-test-jwt-secret-0123456789";

fn set_jwt_secret() {
    unsafe {
        std::env::set_var("SUPABASE_JWT_SECRET", SECRET);
    }
}

fn bearer(user_id: Uuid, role: &str) -> String {
    let claims = SupabaseClaims {
        sub: user_id.to_string(),
        role: role.to_string(),
        email: Some("kemi@example.com".to_string()),
        exp: 9999999999,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {token}")
}

fn quiet_notifier() -> MockNotificationSink {
    let mut notifier = MockNotificationSink::new();
    notifier.expect_notify().return_const(());
    notifier
}

fn app(gateway: MockPaymentGateway) -> Router {
    set_jwt_secret();
    let usecase = Arc::new(BookingUseCase::new(
        Arc::new(SessionMemory::new()),
        Arc::new(gateway),
        Arc::new(quiet_notifier()),
        Arc::new(PricingCatalog::standard()),
        BookingPolicy {
            discount: DiscountPolicy::default(),
            capacity: Arc::new(ConfiguredCapacity::open()),
            rules: BookingRules::default(),
        },
        Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap(),
        )),
    ));

    http_serve::api_router(usecase)
}

fn json_request(method: &str, uri: &str, auth: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn booking_body(purpose: &str) -> Value {
    json!({
        "full_name": "Kemi Ade",
        "contact_email": "kemi@example.com",
        "field": "Healthcare & Nursing",
        "purpose": purpose,
        "scheduled_date": "2026-05-09",
        "scheduled_time": "10:00"
    })
}

#[tokio::test]
async fn booking_routes_require_a_bearer_token() {
    let app = app(MockPaymentGateway::new());

    let (status, _) = send(
        &app,
        json_request("POST", "/api/v1/bookings", None, booking_body("Exam")),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_select_and_checkout_over_http() {
    let mut gateway = MockPaymentGateway::new();
    gateway.expect_initialize_payment().times(1).returning(|request| {
        Ok(TransactionInitialization {
            authorization_url: "https://checkout.paystack.test/abc".to_string(),
            access_code: "ac_test".to_string(),
            reference: request.reference,
        })
    });
    let app = app(gateway);
    let auth = bearer(Uuid::new_v4(), "authenticated");

    let (status, created) = send(
        &app,
        json_request("POST", "/api/v1/bookings", Some(&auth), booking_body("Exam")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "PENDING_PAYMENT");
    let session_id = created["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/v1/bookings/{session_id}/plan"),
            Some(&auth),
            json!({ "plan_id": "exam_one_off" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, outcome) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/v1/bookings/{session_id}/checkout"),
            Some(&auth),
            Value::Null,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], "awaiting_payment");
    assert_eq!(outcome["payment"]["amount"], 2550);
}

#[tokio::test]
async fn category_mismatch_is_a_bad_request() {
    let app = app(MockPaymentGateway::new());
    let auth = bearer(Uuid::new_v4(), "authenticated");

    let (_, created) = send(
        &app,
        json_request("POST", "/api/v1/bookings", Some(&auth), booking_body("Exam")),
    )
    .await;
    let session_id = created["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/v1/bookings/{session_id}/plan"),
            Some(&auth),
            json!({ "plan_id": "int_gold_once" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn admin_routes_require_the_service_role() {
    let app = app(MockPaymentGateway::new());

    let request = |auth: String| {
        Request::builder()
            .uri("/api/v1/admin/bookings/search?q=kemi")
            .header("authorization", auth)
            .body(Body::empty())
            .unwrap()
    };

    let (status, _) = send(&app, request(bearer(Uuid::new_v4(), "authenticated"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, request(bearer(Uuid::new_v4(), ADMIN_ROLE))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn webhook_without_signature_is_unauthorized() {
    let app = app(MockPaymentGateway::new());

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/webhooks/paystack",
            None,
            json!({ "event": "charge.success" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 401);
}

#[tokio::test]
async fn webhook_with_forged_signature_is_unauthorized() {
    let mut gateway = MockPaymentGateway::new();
    gateway
        .expect_verify_webhook_signature()
        .times(1)
        .returning(|_, _| Err(anyhow::anyhow!("invalid webhook signature")));
    let app = app(gateway);

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/webhooks/paystack")
        .header("content-type", "application/json")
        .header("x-paystack-signature", "forged")
        .body(Body::from(json!({ "event": "charge.success" }).to_string()))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 401);
}

/// One pending exam session and one settled free trial, both owned by the same user.
async fn seed_two_sessions(app: &Router) {
    let auth = bearer(Uuid::new_v4(), "authenticated");

    for plan_id in ["exam_one_off", "exam_free_trial"] {
        let (status, created) = send(
            app,
            json_request("POST", "/api/v1/bookings", Some(&auth), booking_body("Exam")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let session_id = created["id"].as_str().unwrap().to_string();

        let (status, _) = send(
            app,
            json_request(
                "POST",
                &format!("/api/v1/bookings/{session_id}/plan"),
                Some(&auth),
                json!({ "plan_id": plan_id }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, sessions) = send(
        app,
        Request::builder()
            .uri("/api/v1/bookings")
            .header("authorization", &auth)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    let free_trial = sessions
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["selected_plan_id"] == "exam_free_trial")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, outcome) = send(
        app,
        json_request(
            "POST",
            &format!("/api/v1/bookings/{free_trial}/checkout"),
            Some(&auth),
            Value::Null,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], "settled");
}

#[tokio::test]
async fn admin_stats_count_paid_and_pending_sessions() {
    let app = app(MockPaymentGateway::new());
    seed_two_sessions(&app).await;

    let (status, stats) = send(
        &app,
        Request::builder()
            .uri("/api/v1/admin/bookings/stats")
            .header("authorization", bearer(Uuid::new_v4(), ADMIN_ROLE))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        stats,
        json!({ "total": 2, "paid": 1, "pending": 1, "paid_conversion_percent": 50 })
    );
}

#[tokio::test]
async fn admin_export_downloads_filtered_sessions_as_csv() {
    let app = app(MockPaymentGateway::new());
    seed_two_sessions(&app).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/admin/bookings/export?q=kemi&status=SCHEDULED")
                .header("authorization", bearer(Uuid::new_v4(), ADMIN_ROLE))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/csv; charset=utf-8"
    );
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"meditin_bookings_2026-05-04.csv\""
    );

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = String::from_utf8(bytes.to_vec()).unwrap();
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(
        lines,
        vec![
            "FullName,Email,Institution,Sector,Field,Nature,Date,Time,Paid",
            "Kemi Ade,kemi@example.com,,Healthcare & Nursing,,Exam,2026-05-09,10:00,YES",
        ]
    );
}

#[tokio::test]
async fn admin_export_requires_the_service_role() {
    let app = app(MockPaymentGateway::new());

    let (status, _) = send(
        &app,
        Request::builder()
            .uri("/api/v1/admin/bookings/export")
            .header("authorization", bearer(Uuid::new_v4(), "authenticated"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_paths_fall_back_to_not_found() {
    let app = app(MockPaymentGateway::new());

    let (status, _) = send(
        &app,
        Request::builder()
            .uri("/api/v1/health-check")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Request::builder()
            .uri("/api/v1/nowhere")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
