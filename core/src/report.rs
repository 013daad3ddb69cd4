//! Advertiser reports: submit a job, poll its status, download the result.

use serde_json::Value;
use tracing::{debug, info};

use crate::envelope::{check_status, parse_envelope, str_field};
use crate::error::Result;
use crate::http::HttpRequest;
use crate::session::Session;
use crate::types::ReportDownload;

const READY: &str = "ready";
const ERROR: &str = "error";

#[derive(Debug, Clone, Copy)]
pub struct ReportApi<'a> {
    session: &'a Session,
}

impl<'a> ReportApi<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    pub fn build_submit(&self, definition: &Value, advertiser_id: u64) -> Result<HttpRequest> {
        let url = self
            .session
            .url("report", &[("advertiser_id", advertiser_id.to_string())])?;
        HttpRequest::post_json(url, definition)
    }

    /// Queue a report for one advertiser. Returns the `response` object,
    /// which carries the new `report_id`.
    pub fn submit(&self, definition: &Value, advertiser_id: u64) -> Result<Value> {
        let response = self.session.execute(self.build_submit(definition, advertiser_id)?)?;
        let inner = parse_envelope(&response)?;
        if let Ok(report_id) = submitted_report_id(&inner) {
            info!(report_id, advertiser_id, "Report submitted");
        }
        Ok(inner)
    }

    pub fn build_check_status(&self, report_id: &str) -> Result<HttpRequest> {
        Ok(HttpRequest::get(
            self.session.url("report", &[("id", report_id.to_string())])?,
        ))
    }

    /// Report metadata; `execution_status` sits at the top level.
    pub fn check_status(&self, report_id: &str) -> Result<Value> {
        let response = self.session.execute(self.build_check_status(report_id)?)?;
        parse_envelope(&response)
    }

    pub fn build_download(&self, report_id: &str) -> Result<HttpRequest> {
        Ok(HttpRequest::get(
            self.session.url("report-download", &[("id", report_id.to_string())])?,
        ))
    }

    /// Check the report once and download it if it is ready.
    ///
    /// Issues the download request only when `execution_status` is
    /// `"ready"`. Does not wait or poll again.
    pub fn download(&self, report_id: &str) -> Result<ReportDownload> {
        let status = self.check_status(report_id)?;
        let execution_status = str_field(&status, "execution_status", "response.execution_status")?;

        match execution_status {
            READY => {
                let response = self.session.execute(self.build_download(report_id)?)?;
                check_status(&response)?;
                info!(report_id, bytes = response.body.len(), "Report downloaded");
                Ok(ReportDownload::Ready(response.body))
            }
            ERROR => {
                let reason = status
                    .get("error")
                    .or_else(|| status.pointer("/report/error"))
                    .and_then(Value::as_str)
                    .unwrap_or("report execution failed")
                    .to_string();
                Ok(ReportDownload::Failed { reason })
            }
            other => {
                debug!(report_id, execution_status = other, "Report not ready");
                Ok(ReportDownload::NotReady {
                    execution_status: other.to_string(),
                })
            }
        }
    }
}

/// `report_id` from the object returned by [`ReportApi::submit`].
pub fn submitted_report_id(submitted: &Value) -> Result<&str> {
    str_field(submitted, "report_id", "response.report_id")
}
