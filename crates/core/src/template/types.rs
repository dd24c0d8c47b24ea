use serde::Serialize;
use thiserror::Error;

/// A rendered instruction document ready to be stored remotely.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedTemplate {
    pub title: String,
    pub body: String,
}

/// Errors from template rendering.
#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    /// A required field was empty. Named after the content field, not the
    /// placeholder, so the message is actionable for the operator.
    #[error("Missing required field: {0}")]
    MissingRequiredField(&'static str),
}
