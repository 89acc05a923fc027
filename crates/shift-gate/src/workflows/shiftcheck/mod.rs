//! Shift-check webhook domain: decide whether a target date is a working day
//! on one of two fixed Bitrix24 work schedules and start the lead's
//! business-process workflow on the first schedule that matches.

pub mod dates;
pub mod exclusions;
pub mod portal;
pub mod request;
pub mod service;

pub use dates::{parse_request_date, ymd_token, Ymd};
pub use exclusions::{is_working_day, normalize_exclusions, ExclusionEntry, ExclusionSet};
pub use portal::{
    BitrixPortal, LeadDocumentId, PortalError, PortalGateway, Schedule, WorkflowId, WorkflowStart,
};
pub use request::{RequestError, ShiftCheckParams, ShiftCheckRequest, WebhookBase};
pub use service::{
    ScheduleSlot, ShiftCheckError, ShiftCheckOutcome, ShiftCheckService, SCHEDULE_PRIORITY,
};
