use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use super::dates::Ymd;
use super::exclusions::{is_working_day, normalize_exclusions};
use super::portal::{LeadDocumentId, PortalError, PortalGateway, WorkflowId, WorkflowStart};
use super::request::ShiftCheckRequest;
use crate::config::WorkflowConfig;

/// One slot in the fixed schedule walk: which schedule to consult and which
/// shift flag the started workflow receives. The flag is a lookup, not a
/// formula; the portal only defines these two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSlot {
    pub schedule_id: u32,
    pub shift_flag: u8,
}

/// Schedules consulted per request, strictly in this order. The first one
/// found working wins and the rest are never fetched.
pub const SCHEDULE_PRIORITY: [ScheduleSlot; 2] = [
    ScheduleSlot {
        schedule_id: 6,
        shift_flag: 1,
    },
    ScheduleSlot {
        schedule_id: 4,
        shift_flag: 2,
    },
];

#[derive(Debug, Error)]
pub enum ShiftCheckError {
    #[error("schedule {schedule_id} lookup failed: {source}")]
    Schedule {
        schedule_id: u32,
        #[source]
        source: PortalError,
    },
    #[error("workflow start on schedule {schedule_id} failed: {source}")]
    Workflow {
        schedule_id: u32,
        #[source]
        source: PortalError,
    },
}

/// Result of one shift check; both variants are success responses.
#[derive(Debug, Clone)]
pub enum ShiftCheckOutcome {
    /// A working schedule was found and its workflow started.
    Dispatched {
        schedule_id: u32,
        workflow_id: WorkflowId,
        document_id: LeadDocumentId,
        date: Ymd,
    },
    /// The date is excluded on every schedule in the priority list.
    NoWorkingSchedule {
        document_id: LeadDocumentId,
        date: Ymd,
    },
}

/// Orchestrates one request: walk the schedule priority list, normalize each
/// exclusion calendar, and dispatch the workflow on the first working day.
pub struct ShiftCheckService<G> {
    portal: Arc<G>,
    defaults: WorkflowConfig,
}

impl<G> ShiftCheckService<G>
where
    G: PortalGateway,
{
    pub fn new(portal: Arc<G>, defaults: WorkflowConfig) -> Self {
        Self { portal, defaults }
    }

    pub fn defaults(&self) -> &WorkflowConfig {
        &self.defaults
    }

    pub async fn run(
        &self,
        request: &ShiftCheckRequest,
    ) -> Result<ShiftCheckOutcome, ShiftCheckError> {
        let document_id = LeadDocumentId::new(request.lead_id);

        // The fetches stay sequential: the early exit on the first working
        // schedule is the contract, not an optimization target.
        for slot in SCHEDULE_PRIORITY {
            let schedule = self
                .portal
                .fetch_schedule(&request.webhook, slot.schedule_id)
                .await
                .map_err(|source| ShiftCheckError::Schedule {
                    schedule_id: slot.schedule_id,
                    source,
                })?;

            if let Some(calendar_id) = schedule.calendar_id() {
                debug!(
                    schedule_id = slot.schedule_id,
                    ?calendar_id,
                    "calendar resolved"
                );
            }

            let exclusions = normalize_exclusions(schedule.into_exclusion_payload());

            if request.debug {
                let sample: Vec<_> = exclusions.entries().iter().take(5).collect();
                info!(
                    schedule_id = slot.schedule_id,
                    total = exclusions.len(),
                    ?sample,
                    "normalized exclusions"
                );
            }

            let working = is_working_day(&exclusions, &request.date);
            info!(
                schedule_id = slot.schedule_id,
                date = %request.date,
                working,
                "schedule checked"
            );

            if working {
                let start = WorkflowStart {
                    template_id: request.template_id,
                    document_id: document_id.clone(),
                    shift_flag: slot.shift_flag,
                };
                let workflow_id = self
                    .portal
                    .start_workflow(&request.webhook, &start)
                    .await
                    .map_err(|source| ShiftCheckError::Workflow {
                        schedule_id: slot.schedule_id,
                        source,
                    })?;

                info!(
                    schedule_id = slot.schedule_id,
                    lead_id = request.lead_id,
                    date = %request.date,
                    workflow_id = ?workflow_id,
                    "workflow started"
                );

                return Ok(ShiftCheckOutcome::Dispatched {
                    schedule_id: slot.schedule_id,
                    workflow_id,
                    document_id,
                    date: request.date.clone(),
                });
            }
        }

        info!(
            lead_id = request.lead_id,
            date = %request.date,
            "no working schedule"
        );
        Ok(ShiftCheckOutcome::NoWorkingSchedule {
            document_id,
            date: request.date.clone(),
        })
    }
}
