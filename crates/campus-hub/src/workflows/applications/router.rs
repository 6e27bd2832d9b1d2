use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;

use super::directory::StudentDirectory;
use super::domain::{ApplicationId, Caller, CreateApplicationRequest, StatusUpdateRequest};
use super::envelope::{ApiError, ApiSuccess};
use super::notifications::NotificationPublisher;
use super::repository::{ApplicationRecord, ApplicationRepository, ApplicationView};
use super::service::ApplicationWorkflowService;
use super::state::ApplicationStatus;

/// Query string accepted by `GET /api/applications`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
}

/// Router builder exposing the application workflow over HTTP.
pub fn application_router<R, D, N>(service: Arc<ApplicationWorkflowService<R, D, N>>) -> Router
where
    R: ApplicationRepository + 'static,
    D: StudentDirectory + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route(
            "/api/applications",
            get(list_handler::<R, D, N>).post(create_handler::<R, D, N>),
        )
        .route(
            "/api/applications/:application_id",
            get(get_handler::<R, D, N>).delete(cancel_handler::<R, D, N>),
        )
        .route(
            "/api/applications/:application_id/status",
            patch(update_status_handler::<R, D, N>),
        )
        .with_state(service)
}

pub(crate) async fn list_handler<R, D, N>(
    State(service): State<Arc<ApplicationWorkflowService<R, D, N>>>,
    caller: Caller,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: StudentDirectory + 'static,
    N: NotificationPublisher + 'static,
{
    let result = params
        .map_err(|err| ApiError::validation(err.body_text()))
        .and_then(|Query(params)| status_filter(params.status.as_deref()))
        .and_then(|status| service.list(&caller, status).map_err(ApiError::from))
        .map(|records| {
            let views: Vec<ApplicationView> = records.iter().map(ApplicationRecord::view).collect();
            ApiSuccess::ok(views)
        });
    respond(result)
}

pub(crate) async fn get_handler<R, D, N>(
    State(service): State<Arc<ApplicationWorkflowService<R, D, N>>>,
    caller: Caller,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: StudentDirectory + 'static,
    N: NotificationPublisher + 'static,
{
    let id = ApplicationId(application_id);
    respond(
        service
            .get(&caller, &id)
            .map(|record| ApiSuccess::ok(record.view()))
            .map_err(ApiError::from),
    )
}

pub(crate) async fn create_handler<R, D, N>(
    State(service): State<Arc<ApplicationWorkflowService<R, D, N>>>,
    caller: Caller,
    body: Result<Json<CreateApplicationRequest>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: StudentDirectory + 'static,
    N: NotificationPublisher + 'static,
{
    let result = body
        .map_err(|err| ApiError::validation(err.body_text()))
        .and_then(|Json(request)| service.create(&caller, request).map_err(ApiError::from))
        .map(|record| ApiSuccess::created(record.view()).with_message("application submitted"));
    respond(result)
}

pub(crate) async fn update_status_handler<R, D, N>(
    State(service): State<Arc<ApplicationWorkflowService<R, D, N>>>,
    caller: Caller,
    Path(application_id): Path<String>,
    body: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: StudentDirectory + 'static,
    N: NotificationPublisher + 'static,
{
    let id = ApplicationId(application_id);
    let result = body
        .map_err(|err| ApiError::validation(err.body_text()))
        .and_then(|Json(request)| {
            service
                .update_status(&caller, &id, request)
                .map_err(ApiError::from)
        })
        .map(|record| ApiSuccess::ok(record.view()));
    respond(result)
}

pub(crate) async fn cancel_handler<R, D, N>(
    State(service): State<Arc<ApplicationWorkflowService<R, D, N>>>,
    caller: Caller,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: StudentDirectory + 'static,
    N: NotificationPublisher + 'static,
{
    let id = ApplicationId(application_id);
    let result = service
        .cancel(&caller, &id)
        .map(|record| ApiSuccess::ok(record.view()).with_message("application withdrawn"))
        .map_err(ApiError::from);
    respond(result)
}

fn status_filter(raw: Option<&str>) -> Result<Option<ApplicationStatus>, ApiError> {
    raw.map(|raw| {
        ApplicationStatus::parse(raw)
            .ok_or_else(|| ApiError::validation(format!("unknown status '{raw}'")))
    })
    .transpose()
}

fn respond<T: serde::Serialize>(result: Result<ApiSuccess<T>, ApiError>) -> Response {
    match result {
        Ok(success) => success.into_response(),
        Err(err) => err.into_response(),
    }
}
