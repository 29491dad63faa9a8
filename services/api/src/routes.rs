use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use grantlink::workflows::funding::applications::{
    application_router, IntegratedApplicationService, NotificationDispatcher, NotificationInbox,
    OpportunityDirectory, ProfileDirectory, SubmissionRepository,
};

pub(crate) fn with_application_routes<O, P, S, N, I>(
    service: Arc<IntegratedApplicationService<O, P, S, N>>,
    inbox: Arc<I>,
) -> axum::Router
where
    O: OpportunityDirectory + 'static,
    P: ProfileDirectory + 'static,
    S: SubmissionRepository + 'static,
    N: NotificationDispatcher + 'static,
    I: NotificationInbox + 'static,
{
    application_router(service, inbox)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{
        seed_dev_fixtures, InMemoryNotificationHub, InMemoryOpportunityDirectory,
        InMemoryProfileDirectory, InMemorySubmissionRepository,
    };
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn build_router() -> axum::Router {
        let opportunities = Arc::new(InMemoryOpportunityDirectory::default());
        let profiles = Arc::new(InMemoryProfileDirectory::default());
        let submissions = Arc::new(InMemorySubmissionRepository::default());
        let hub = Arc::new(InMemoryNotificationHub::default());
        seed_dev_fixtures(&opportunities, &profiles);

        let service = Arc::new(IntegratedApplicationService::new(
            opportunities,
            profiles,
            submissions,
            hub.clone(),
            "http://localhost:3000",
        ));
        application_router(service, hub)
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body.get("status").and_then(Value::as_str), Some("ok"));
    }

    #[tokio::test]
    async fn seeded_opportunity_accepts_an_application() {
        let router = build_router();

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/funding/opp-0001/applications")
            .header("content-type", "application/json")
            .header("x-user-id", "ngo-0001")
            .header("x-user-role", "ngo")
            .body(Body::from(
                serde_json::to_vec(&json!({
                    "answers": {
                        "Budget": "12000",
                        "Project summary": "Flood response kits for riverside communities",
                    }
                }))
                .expect("serialize"),
            ))
            .expect("request");

        let response = router.oneshot(request).await.expect("router dispatch");
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        let payload: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(
            payload.get("status").and_then(Value::as_str),
            Some("submitted")
        );
        assert_eq!(
            payload.get("funding_opportunity_id").and_then(Value::as_str),
            Some("opp-0001")
        );
    }

    #[tokio::test]
    async fn non_integrated_opportunity_rejects_applications() {
        let router = build_router();

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/funding/opp-0002/applications")
            .header("content-type", "application/json")
            .header("x-user-id", "ngo-0001")
            .header("x-user-role", "ngo")
            .body(Body::from(
                serde_json::to_vec(&json!({ "answers": { "Budget": "12000" } }))
                    .expect("serialize"),
            ))
            .expect("request");

        let response = router.oneshot(request).await.expect("router dispatch");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
