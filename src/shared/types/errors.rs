use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Error taxonomy shared by all services and handlers.
///
/// Each variant has a fixed HTTP mapping (see
/// `interfaces::http::common::status_for`): `Validation`, `Conflict` and
/// `Inactive` become 400, `Unauthorized` 401, `Forbidden` 403, `NotFound`
/// 404 and `Internal` 500.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{entity} with {field}={value} not found")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Inactive(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
