use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to serialize {report} report as JSON")]
    JsonSerialize {
        report: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
