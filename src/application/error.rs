use std::error::Error as StdError;

use thiserror::Error;

use crate::{cache::StoreError, config::LoadError, infra::cms::CmsError, infra::error::InfraError};

/// Flattened view of an error and its source chain, for structured logging.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }

    /// Messages joined outermost first.
    pub fn chain(&self) -> String {
        self.messages.join(": ")
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Cms(#[from] CmsError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Infra(#[from] InfraError),
}

impl AppError {
    pub fn report(&self) -> ErrorReport {
        ErrorReport::from_error("application::error::AppError", self)
    }
}
