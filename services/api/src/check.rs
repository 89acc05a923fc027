use clap::Args;
use shift_gate::config::AppConfig;
use shift_gate::error::AppError;
use shift_gate::telemetry;
use shift_gate::workflows::shiftcheck::{
    BitrixPortal, ShiftCheckOutcome, ShiftCheckParams, ShiftCheckRequest, ShiftCheckService,
};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct CheckArgs {
    /// Bitrix24 webhook base URL (https://portal.bitrix24.xx/rest/USER/TOKEN/)
    #[arg(long)]
    webhook_url: String,
    /// CRM lead identifier
    #[arg(long)]
    lead_id: u64,
    /// Target date (YYYY-MM-DD or DD.MM.YYYY[ HH:mm:ss])
    #[arg(long)]
    date: String,
    /// Override the configured workflow template
    #[arg(long)]
    template_id: Option<u32>,
    /// Log a sample of each schedule's normalized exclusions
    #[arg(long)]
    debug: bool,
}

pub(crate) async fn run_check(args: CheckArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let params = ShiftCheckParams {
        webhook_url: Some(args.webhook_url),
        lead_id: Some(args.lead_id.to_string()),
        date: Some(args.date),
        template_id: args.template_id.map(|id| id.to_string()),
        debug: args.debug.then(|| "1".to_string()),
    };
    let request = ShiftCheckRequest::from_params(params, &config.workflow)?;

    let portal = Arc::new(BitrixPortal::new());
    let service = ShiftCheckService::new(portal, config.workflow.clone());

    match service.run(&request).await? {
        ShiftCheckOutcome::Dispatched {
            schedule_id,
            workflow_id,
            document_id,
            date,
        } => {
            let rendered =
                serde_json::to_string(&workflow_id).unwrap_or_else(|_| "unknown".to_string());
            println!("Working day on schedule {schedule_id} ({date})");
            println!("Started workflow {rendered} on {}", document_id.entity());
        }
        ShiftCheckOutcome::NoWorkingSchedule { date, .. } => {
            println!("Non-working day on both schedules ({date})");
        }
    }
    Ok(())
}
