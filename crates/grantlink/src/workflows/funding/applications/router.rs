use std::sync::Arc;

use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post, put};
use axum::{async_trait, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use super::domain::{AnswerSet, ApplicationStatus, SubmissionId};
use super::repository::{
    NotificationDispatcher, NotificationId, NotificationInbox, OpportunityDirectory,
    ProfileDirectory, SubmissionRepository,
};
use super::service::{ApplicationError, IntegratedApplicationService};
use crate::workflows::funding::domain::{Identity, OpportunityId, Role, UserId};

const UNREAD_NOTIFICATION_LIMIT: usize = 10;

/// Shared state behind the application routes: the workflow service plus the
/// inbox read side.
pub struct ApplicationState<O, P, S, N, I> {
    pub service: Arc<IntegratedApplicationService<O, P, S, N>>,
    pub inbox: Arc<I>,
}

impl<O, P, S, N, I> Clone for ApplicationState<O, P, S, N, I> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            inbox: self.inbox.clone(),
        }
    }
}

/// Router builder exposing the integrated application workflow over HTTP.
pub fn application_router<O, P, S, N, I>(
    service: Arc<IntegratedApplicationService<O, P, S, N>>,
    inbox: Arc<I>,
) -> Router
where
    O: OpportunityDirectory + 'static,
    P: ProfileDirectory + 'static,
    S: SubmissionRepository + 'static,
    N: NotificationDispatcher + 'static,
    I: NotificationInbox + 'static,
{
    Router::new()
        .route(
            "/api/v1/funding/:opportunity_id/applications",
            post(submit_handler::<O, P, S, N, I>).get(review_queue_handler::<O, P, S, N, I>),
        )
        .route(
            "/api/v1/funding/:opportunity_id/applications/export",
            get(export_handler::<O, P, S, N, I>),
        )
        .route(
            "/api/v1/funding/:opportunity_id/application-form",
            put(configure_form_handler::<O, P, S, N, I>),
        )
        .route(
            "/api/v1/applications/mine",
            get(my_applications_handler::<O, P, S, N, I>),
        )
        .route(
            "/api/v1/applications/:submission_id/status",
            patch(update_status_handler::<O, P, S, N, I>),
        )
        .route(
            "/api/v1/notifications",
            get(unread_notifications_handler::<O, P, S, N, I>),
        )
        .route(
            "/api/v1/notifications/mark-read",
            post(mark_read_handler::<O, P, S, N, I>),
        )
        .route(
            "/api/v1/notifications/mark-all-read",
            post(mark_all_read_handler::<O, P, S, N, I>),
        )
        .with_state(ApplicationState { service, inbox })
}

/// The upstream gateway authenticates callers and forwards the verified
/// identity as plain headers; this extractor only refuses requests that
/// arrive without them.
#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        let role = parts
            .headers
            .get("x-user-role")
            .and_then(|value| value.to_str().ok())
            .and_then(Role::parse);

        match (user_id, role) {
            (Some(user_id), Some(role)) => Ok(Identity {
                user_id: UserId(user_id.to_string()),
                role,
            }),
            _ => {
                let payload = json!({ "error": "authentication required" });
                Err((StatusCode::UNAUTHORIZED, Json(payload)).into_response())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    answers: AnswerSet,
}

#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    status: String,
}

#[derive(Debug, Deserialize)]
struct ConfigureFormRequest {
    accepts_integrated_app: bool,
    #[serde(default)]
    integrated_app_fields: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct MarkReadRequest {
    ids: Vec<String>,
}

async fn submit_handler<O, P, S, N, I>(
    State(state): State<ApplicationState<O, P, S, N, I>>,
    identity: Identity,
    Path(opportunity_id): Path<String>,
    Json(payload): Json<SubmitRequest>,
) -> Response
where
    O: OpportunityDirectory + 'static,
    P: ProfileDirectory + 'static,
    S: SubmissionRepository + 'static,
    N: NotificationDispatcher + 'static,
    I: NotificationInbox + 'static,
{
    let opportunity_id = OpportunityId(opportunity_id);
    match state
        .service
        .submit(&identity, &opportunity_id, payload.answers)
    {
        Ok(submission) => (StatusCode::CREATED, Json(submission)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn my_applications_handler<O, P, S, N, I>(
    State(state): State<ApplicationState<O, P, S, N, I>>,
    identity: Identity,
) -> Response
where
    O: OpportunityDirectory + 'static,
    P: ProfileDirectory + 'static,
    S: SubmissionRepository + 'static,
    N: NotificationDispatcher + 'static,
    I: NotificationInbox + 'static,
{
    match state.service.my_submissions(&identity) {
        Ok(views) => (StatusCode::OK, Json(views)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn review_queue_handler<O, P, S, N, I>(
    State(state): State<ApplicationState<O, P, S, N, I>>,
    identity: Identity,
    Path(opportunity_id): Path<String>,
) -> Response
where
    O: OpportunityDirectory + 'static,
    P: ProfileDirectory + 'static,
    S: SubmissionRepository + 'static,
    N: NotificationDispatcher + 'static,
    I: NotificationInbox + 'static,
{
    let opportunity_id = OpportunityId(opportunity_id);
    match state
        .service
        .opportunity_submissions(&identity, &opportunity_id)
    {
        Ok(views) => (StatusCode::OK, Json(views)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn export_handler<O, P, S, N, I>(
    State(state): State<ApplicationState<O, P, S, N, I>>,
    identity: Identity,
    Path(opportunity_id): Path<String>,
) -> Response
where
    O: OpportunityDirectory + 'static,
    P: ProfileDirectory + 'static,
    S: SubmissionRepository + 'static,
    N: NotificationDispatcher + 'static,
    I: NotificationInbox + 'static,
{
    let opportunity_id = OpportunityId(opportunity_id);
    match state
        .service
        .export_submissions_csv(&identity, &opportunity_id)
    {
        Ok(csv) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv")],
            csv,
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

async fn update_status_handler<O, P, S, N, I>(
    State(state): State<ApplicationState<O, P, S, N, I>>,
    identity: Identity,
    Path(submission_id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Response
where
    O: OpportunityDirectory + 'static,
    P: ProfileDirectory + 'static,
    S: SubmissionRepository + 'static,
    N: NotificationDispatcher + 'static,
    I: NotificationInbox + 'static,
{
    let Some(status) = ApplicationStatus::parse(&payload.status) else {
        let payload = json!({
            "error": "invalid status, must be one of: submitted, under_review, approved, rejected",
        });
        return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
    };

    let submission_id = SubmissionId(submission_id);
    match state
        .service
        .update_status(&identity, &submission_id, status)
    {
        Ok(submission) => (StatusCode::OK, Json(submission)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn configure_form_handler<O, P, S, N, I>(
    State(state): State<ApplicationState<O, P, S, N, I>>,
    identity: Identity,
    Path(opportunity_id): Path<String>,
    Json(payload): Json<ConfigureFormRequest>,
) -> Response
where
    O: OpportunityDirectory + 'static,
    P: ProfileDirectory + 'static,
    S: SubmissionRepository + 'static,
    N: NotificationDispatcher + 'static,
    I: NotificationInbox + 'static,
{
    let opportunity_id = OpportunityId(opportunity_id);
    match state.service.configure_application_form(
        &identity,
        &opportunity_id,
        payload.accepts_integrated_app,
        payload.integrated_app_fields.as_ref(),
    ) {
        Ok(opportunity) => (StatusCode::OK, Json(opportunity)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn unread_notifications_handler<O, P, S, N, I>(
    State(state): State<ApplicationState<O, P, S, N, I>>,
    identity: Identity,
) -> Response
where
    O: OpportunityDirectory + 'static,
    P: ProfileDirectory + 'static,
    S: SubmissionRepository + 'static,
    N: NotificationDispatcher + 'static,
    I: NotificationInbox + 'static,
{
    match state
        .inbox
        .unread_for(&identity.user_id, UNREAD_NOTIFICATION_LIMIT)
    {
        Ok(notifications) => (StatusCode::OK, Json(notifications)).into_response(),
        Err(err) => repository_error_response(err),
    }
}

async fn mark_read_handler<O, P, S, N, I>(
    State(state): State<ApplicationState<O, P, S, N, I>>,
    identity: Identity,
    Json(payload): Json<MarkReadRequest>,
) -> Response
where
    O: OpportunityDirectory + 'static,
    P: ProfileDirectory + 'static,
    S: SubmissionRepository + 'static,
    N: NotificationDispatcher + 'static,
    I: NotificationInbox + 'static,
{
    if payload.ids.is_empty() {
        let payload = json!({ "error": "'ids' must be a non-empty array" });
        return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
    }

    let ids: Vec<NotificationId> = payload.ids.into_iter().map(NotificationId).collect();
    match state.inbox.mark_read(&identity.user_id, &ids) {
        Ok(updated) => (
            StatusCode::OK,
            Json(json!({ "updated": updated })),
        )
            .into_response(),
        Err(err) => repository_error_response(err),
    }
}

async fn mark_all_read_handler<O, P, S, N, I>(
    State(state): State<ApplicationState<O, P, S, N, I>>,
    identity: Identity,
) -> Response
where
    O: OpportunityDirectory + 'static,
    P: ProfileDirectory + 'static,
    S: SubmissionRepository + 'static,
    N: NotificationDispatcher + 'static,
    I: NotificationInbox + 'static,
{
    match state.inbox.mark_all_read(&identity.user_id) {
        Ok(updated) => (
            StatusCode::OK,
            Json(json!({ "updated": updated })),
        )
            .into_response(),
        Err(err) => repository_error_response(err),
    }
}

fn error_response(err: ApplicationError) -> Response {
    let status = match &err {
        ApplicationError::Validation(_)
        | ApplicationError::Schema(_)
        | ApplicationError::ProfileRequired
        | ApplicationError::TransitionNotAllowed { .. } => StatusCode::BAD_REQUEST,
        ApplicationError::DuplicateApplication => StatusCode::CONFLICT,
        ApplicationError::NotOwner | ApplicationError::RoleDenied => StatusCode::FORBIDDEN,
        ApplicationError::OpportunityNotFound | ApplicationError::SubmissionNotFound => {
            StatusCode::NOT_FOUND
        }
        ApplicationError::Export(_) | ApplicationError::Repository(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({ "error": err.to_string() });
    (status, Json(payload)).into_response()
}

fn repository_error_response(err: super::repository::RepositoryError) -> Response {
    let payload = json!({ "error": err.to_string() });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
}
