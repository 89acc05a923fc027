use crate::infra::AppState;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shift_gate::workflows::shiftcheck::{
    LeadDocumentId, PortalGateway, ShiftCheckOutcome, ShiftCheckParams, ShiftCheckRequest,
    ShiftCheckService, WorkflowId, Ymd,
};
use std::sync::Arc;
use tracing::{error, info};

const NON_WORKING_MESSAGE: &str = "non-working day on both schedules (6 and 4)";

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ShiftCheckQuery {
    #[serde(rename = "b24WebhookUrl")]
    webhook_url: Option<String>,
    #[serde(rename = "leadId")]
    lead_id: Option<String>,
    date: Option<String>,
    #[serde(rename = "bpTemplateId")]
    template_id: Option<String>,
    debug: Option<String>,
}

impl From<ShiftCheckQuery> for ShiftCheckParams {
    fn from(query: ShiftCheckQuery) -> Self {
        Self {
            webhook_url: query.webhook_url,
            lead_id: query.lead_id,
            date: query.date,
            template_id: query.template_id,
            debug: query.debug,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ShiftCheckResponse {
    ok: bool,
    #[serde(rename = "workingScheduleId")]
    working_schedule_id: Option<u32>,
    #[serde(rename = "workflowId", skip_serializing_if = "Option::is_none")]
    workflow_id: Option<WorkflowId>,
    #[serde(rename = "documentId")]
    document_id: LeadDocumentId,
    date: Ymd,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl From<ShiftCheckOutcome> for ShiftCheckResponse {
    fn from(outcome: ShiftCheckOutcome) -> Self {
        match outcome {
            ShiftCheckOutcome::Dispatched {
                schedule_id,
                workflow_id,
                document_id,
                date,
            } => Self {
                ok: true,
                working_schedule_id: Some(schedule_id),
                workflow_id: Some(workflow_id),
                document_id,
                date,
                message: None,
            },
            ShiftCheckOutcome::NoWorkingSchedule { document_id, date } => Self {
                ok: true,
                working_schedule_id: None,
                workflow_id: None,
                document_id,
                date,
                message: Some(NON_WORKING_MESSAGE.to_string()),
            },
        }
    }
}

pub(crate) fn with_shift_routes<G>(service: Arc<ShiftCheckService<G>>) -> Router
where
    G: PortalGateway + 'static,
{
    Router::new()
        .route(
            "/qg_shifts_webhook/shift-check",
            any(shift_check_endpoint::<G>),
        )
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(service)
}

pub(crate) async fn healthcheck() -> &'static str {
    "OK"
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

pub(crate) async fn shift_check_endpoint<G>(
    State(service): State<Arc<ShiftCheckService<G>>>,
    Query(query): Query<ShiftCheckQuery>,
) -> Response
where
    G: PortalGateway + 'static,
{
    let request = match ShiftCheckRequest::from_params(query.into(), service.defaults()) {
        Ok(request) => request,
        Err(err) => {
            info!(error = %err, "shift check rejected");
            let payload = json!({ "error": err.to_string() });
            return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
        }
    };

    info!(
        host = request.webhook.host(),
        lead_id = request.lead_id,
        date = %request.date,
        "shift check received"
    );

    match service.run(&request).await {
        Ok(outcome) => (StatusCode::OK, Json(ShiftCheckResponse::from(outcome))).into_response(),
        Err(err) => {
            error!(
                host = request.webhook.host(),
                lead_id = request.lead_id,
                error = %err,
                "shift check failed"
            );
            let payload = json!({ "error": err.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}
