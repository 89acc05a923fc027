//! Core library for the shift-gate webhook service: request validation,
//! exclusion-calendar normalization, the working-day decision, and the
//! Bitrix24 portal client used to fetch schedules and start workflows.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
