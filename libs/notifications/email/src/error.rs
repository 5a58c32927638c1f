use thiserror::Error;

pub type EmailResult<T> = Result<T, EmailError>;

/// Errors raised while preparing an email.
#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Unknown template '{0}'")]
    TemplateNotFound(String),

    #[error("Template render failed: {0}")]
    Template(String),

    #[error("Invalid SMTP configuration: {0}")]
    Config(String),
}
