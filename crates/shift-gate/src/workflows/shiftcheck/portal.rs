use super::request::WebhookBase;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

pub const METHOD_SCHEDULE_GET: &str = "timeman.schedule.get.json";
pub const METHOD_WORKFLOW_START: &str = "bizproc.workflow.start.json";

/// Upper bound for a single portal call; a timeout fails the request exactly
/// like any other upstream error, with no retry.
pub const PORTAL_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("portal request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("portal error for {method}: {description}")]
    Api {
        method: &'static str,
        description: String,
    },
}

/// Schedule entity as returned by `timeman.schedule.get`; only the calendar
/// identifier and exclusion payload are consumed.
#[derive(Debug, Clone, Deserialize)]
pub struct Schedule {
    #[serde(rename = "CALENDAR", default)]
    pub calendar: Option<ScheduleCalendar>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleCalendar {
    #[serde(rename = "ID", default)]
    pub id: Option<Value>,
    #[serde(rename = "EXCLUSIONS", default)]
    pub exclusions: Value,
}

impl Schedule {
    /// The raw exclusion payload, in whatever shape the portal chose today.
    pub fn into_exclusion_payload(self) -> Value {
        self.calendar
            .map(|calendar| calendar.exclusions)
            .unwrap_or(Value::Null)
    }

    pub fn calendar_id(&self) -> Option<&Value> {
        self.calendar
            .as_ref()
            .and_then(|calendar| calendar.id.as_ref())
    }
}

/// Identifies the CRM entity a workflow operates on; serializes as the
/// `["crm", "CCrmDocumentLead", "LEAD_<id>"]` triple the portal expects.
/// Derived deterministically from the lead id, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadDocumentId {
    lead_id: u64,
}

impl LeadDocumentId {
    pub fn new(lead_id: u64) -> Self {
        Self { lead_id }
    }

    pub fn entity(&self) -> String {
        format!("LEAD_{}", self.lead_id)
    }
}

impl Serialize for LeadDocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ("crm", "CCrmDocumentLead", self.entity()).serialize(serializer)
    }
}

/// Opaque workflow instance identifier returned by `bizproc.workflow.start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowId(pub Value);

/// Parameters for one workflow start.
#[derive(Debug, Clone)]
pub struct WorkflowStart {
    pub template_id: u32,
    pub document_id: LeadDocumentId,
    pub shift_flag: u8,
}

/// Capability seam over the external scheduling/workflow platform.
pub trait PortalGateway: Send + Sync {
    fn fetch_schedule(
        &self,
        base: &WebhookBase,
        schedule_id: u32,
    ) -> impl Future<Output = Result<Schedule, PortalError>> + Send;

    fn start_workflow(
        &self,
        base: &WebhookBase,
        start: &WorkflowStart,
    ) -> impl Future<Output = Result<WorkflowId, PortalError>> + Send;
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct PortalEnvelope<T> {
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Production gateway speaking the Bitrix24 webhook REST dialect over a
/// shared connection pool.
#[derive(Debug, Clone)]
pub struct BitrixPortal {
    http: reqwest::Client,
}

impl BitrixPortal {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(PORTAL_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        base: &WebhookBase,
        method: &'static str,
        payload: Value,
    ) -> Result<T, PortalError> {
        let url = format!("{}{}", base.as_str(), method);
        let envelope: PortalEnvelope<T> = self
            .http
            .post(url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = envelope.error {
            let description = envelope.error_description.unwrap_or(error);
            return Err(PortalError::Api {
                method,
                description,
            });
        }
        envelope.result.ok_or(PortalError::Api {
            method,
            description: "unknown".to_string(),
        })
    }
}

impl Default for BitrixPortal {
    fn default() -> Self {
        Self::new()
    }
}

impl PortalGateway for BitrixPortal {
    async fn fetch_schedule(
        &self,
        base: &WebhookBase,
        schedule_id: u32,
    ) -> Result<Schedule, PortalError> {
        self.call(base, METHOD_SCHEDULE_GET, json!({ "id": schedule_id }))
            .await
    }

    async fn start_workflow(
        &self,
        base: &WebhookBase,
        start: &WorkflowStart,
    ) -> Result<WorkflowId, PortalError> {
        let payload = json!({
            "TEMPLATE_ID": start.template_id,
            "DOCUMENT_ID": start.document_id,
            "PARAMETERS": { "smena": start.shift_flag },
        });
        self.call(base, METHOD_WORKFLOW_START, payload).await
    }
}
