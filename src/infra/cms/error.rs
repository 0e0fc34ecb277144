use thiserror::Error;

/// Service name used in fallback upstream error messages.
pub(crate) const SERVICE_NAME: &str = "CMS";

#[derive(Debug, Error)]
pub enum CmsError {
    #[error("CMS configuration error: {message}")]
    Configuration { message: String },
    #[error("CMS unreachable: {0}")]
    UpstreamUnavailable(#[source] reqwest::Error),
    #[error("CMS responded with status {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("failed to decode CMS response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid CMS URL: {0}")]
    Url(#[from] url::ParseError),
}

impl CmsError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn upstream(status: u16, message: Option<String>) -> Self {
        Self::Upstream {
            status,
            message: message.unwrap_or_else(|| format!("{SERVICE_NAME} API error: {status}")),
        }
    }

    /// Upstream status code, when the CMS answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}
