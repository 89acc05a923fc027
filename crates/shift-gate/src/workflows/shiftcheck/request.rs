use super::dates::{parse_request_date, Ymd};
use crate::config::WorkflowConfig;
use thiserror::Error;
use tracing::warn;
use url::Url;

/// Host marker every webhook URL must carry.
const PLATFORM_DOMAIN_TOKEN: &str = "bitrix24.";

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("missing required query parameter: {0}")]
    MissingParameter(&'static str),
    #[error("invalid webhook URL: {0}")]
    InvalidWebhook(String),
    #[error("leadId must be a positive integer, got '{0}'")]
    InvalidLeadId(String),
    #[error("invalid date '{0}': use YYYY-MM-DD or DD.MM.YYYY[ HH:mm:ss]")]
    InvalidDate(String),
}

/// Validated webhook base: a Bitrix24 host with a trailing-slash path, so
/// REST method names can be appended directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookBase(Url);

impl WebhookBase {
    pub fn parse(raw: &str) -> Result<Self, RequestError> {
        let mut url =
            Url::parse(raw.trim()).map_err(|err| RequestError::InvalidWebhook(err.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| RequestError::InvalidWebhook("URL has no host".to_string()))?;
        if !host.to_ascii_lowercase().contains(PLATFORM_DOMAIN_TOKEN) {
            return Err(RequestError::InvalidWebhook(format!(
                "host '{host}' is not a {PLATFORM_DOMAIN_TOKEN} domain"
            )));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(Self(url))
    }

    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or("unknown-host")
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Raw query parameters as received, before validation.
#[derive(Debug, Default, Clone)]
pub struct ShiftCheckParams {
    pub webhook_url: Option<String>,
    pub lead_id: Option<String>,
    pub date: Option<String>,
    pub template_id: Option<String>,
    pub debug: Option<String>,
}

/// Validated input for one shift check. Constructed once per HTTP request,
/// discarded after the response.
#[derive(Debug, Clone)]
pub struct ShiftCheckRequest {
    pub webhook: WebhookBase,
    pub lead_id: u64,
    pub date: Ymd,
    pub template_id: u32,
    pub debug: bool,
}

impl ShiftCheckRequest {
    pub fn from_params(
        params: ShiftCheckParams,
        defaults: &WorkflowConfig,
    ) -> Result<Self, RequestError> {
        let webhook_url = required(params.webhook_url, "b24WebhookUrl")?;
        let lead_raw = required(params.lead_id, "leadId")?;
        let date_raw = required(params.date, "date")?;

        let webhook = WebhookBase::parse(&webhook_url)?;

        let lead_id = lead_raw
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| RequestError::InvalidLeadId(lead_raw.clone()))?;

        let date = parse_request_date(&date_raw)
            .ok_or_else(|| RequestError::InvalidDate(date_raw.clone()))?;

        let template_id = match params.template_id.as_deref().map(str::trim) {
            None | Some("") => defaults.default_template_id,
            Some(raw) => match raw.parse::<u32>() {
                Ok(id) => id,
                Err(_) => {
                    warn!(template_id = raw, "ignoring unparsable bpTemplateId override");
                    defaults.default_template_id
                }
            },
        };

        let debug = params.debug.as_deref() == Some("1");

        Ok(Self {
            webhook,
            lead_id,
            date,
            template_id,
            debug,
        })
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, RequestError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(RequestError::MissingParameter(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> WorkflowConfig {
        WorkflowConfig {
            default_template_id: 45,
        }
    }

    fn params() -> ShiftCheckParams {
        ShiftCheckParams {
            webhook_url: Some("https://acme.bitrix24.kz/rest/17/secrettoken".to_string()),
            lead_id: Some("398494".to_string()),
            date: Some("2025-10-03".to_string()),
            template_id: None,
            debug: None,
        }
    }

    #[test]
    fn valid_params_produce_a_request_with_defaults() {
        let request = ShiftCheckRequest::from_params(params(), &defaults()).expect("validates");
        assert_eq!(request.lead_id, 398_494);
        assert_eq!(request.date.as_str(), "2025-10-03");
        assert_eq!(request.template_id, 45);
        assert!(!request.debug);
    }

    #[test]
    fn webhook_path_gains_a_trailing_slash() {
        let request = ShiftCheckRequest::from_params(params(), &defaults()).expect("validates");
        assert!(request.webhook.as_str().ends_with("/rest/17/secrettoken/"));
        assert_eq!(request.webhook.host(), "acme.bitrix24.kz");
    }

    #[test]
    fn missing_parameters_are_named() {
        for (field, expected) in [
            ("webhook", "b24WebhookUrl"),
            ("lead", "leadId"),
            ("date", "date"),
        ] {
            let mut incomplete = params();
            match field {
                "webhook" => incomplete.webhook_url = None,
                "lead" => incomplete.lead_id = Some("  ".to_string()),
                _ => incomplete.date = None,
            }
            let error = ShiftCheckRequest::from_params(incomplete, &defaults())
                .expect_err("missing field rejected");
            match error {
                RequestError::MissingParameter(name) => assert_eq!(name, expected),
                other => panic!("expected MissingParameter, got {other:?}"),
            }
        }
    }

    #[test]
    fn non_platform_hosts_are_rejected() {
        let mut bad = params();
        bad.webhook_url = Some("https://example.com/rest/17/token/".to_string());
        let error =
            ShiftCheckRequest::from_params(bad, &defaults()).expect_err("wrong domain rejected");
        assert!(matches!(error, RequestError::InvalidWebhook(_)));
    }

    #[test]
    fn unparsable_urls_are_rejected() {
        let mut bad = params();
        bad.webhook_url = Some("not a url".to_string());
        let error =
            ShiftCheckRequest::from_params(bad, &defaults()).expect_err("bad url rejected");
        assert!(matches!(error, RequestError::InvalidWebhook(_)));
    }

    #[test]
    fn lead_id_must_be_a_positive_integer() {
        for bad_lead in ["0", "-3", "abc", "12.5"] {
            let mut bad = params();
            bad.lead_id = Some(bad_lead.to_string());
            let error =
                ShiftCheckRequest::from_params(bad, &defaults()).expect_err("lead id rejected");
            assert!(matches!(error, RequestError::InvalidLeadId(_)), "{bad_lead}");
        }
    }

    #[test]
    fn dotted_datetime_is_accepted_as_date() {
        let mut dotted = params();
        dotted.date = Some("03.10.2025 00:00:00".to_string());
        let request = ShiftCheckRequest::from_params(dotted, &defaults()).expect("validates");
        assert_eq!(request.date.as_str(), "2025-10-03");
    }

    #[test]
    fn unparsable_dates_are_rejected() {
        let mut bad = params();
        bad.date = Some("next tuesday".to_string());
        let error = ShiftCheckRequest::from_params(bad, &defaults()).expect_err("date rejected");
        assert!(matches!(error, RequestError::InvalidDate(_)));
    }

    #[test]
    fn template_override_wins_when_it_parses() {
        let mut overridden = params();
        overridden.template_id = Some("99".to_string());
        let request = ShiftCheckRequest::from_params(overridden, &defaults()).expect("validates");
        assert_eq!(request.template_id, 99);
    }

    #[test]
    fn unparsable_template_override_falls_back_to_default() {
        let mut overridden = params();
        overridden.template_id = Some("whatever".to_string());
        let request = ShiftCheckRequest::from_params(overridden, &defaults()).expect("validates");
        assert_eq!(request.template_id, 45);
    }

    #[test]
    fn debug_flag_requires_exactly_one() {
        let mut on = params();
        on.debug = Some("1".to_string());
        assert!(ShiftCheckRequest::from_params(on, &defaults())
            .expect("validates")
            .debug);

        let mut off = params();
        off.debug = Some("yes".to_string());
        assert!(!ShiftCheckRequest::from_params(off, &defaults())
            .expect("validates")
            .debug);
    }
}
