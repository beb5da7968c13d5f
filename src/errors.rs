use thiserror::Error;

/// Errors raised by the entity layer. Handlers catch these per action and
/// reply with an apology instead of letting the session die.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("telegram user {0} is not registered")]
    UserNotFound(i64),

    #[error("operator {0} does not exist")]
    OperatorNotFound(i64),

    #[error("telegram user {0} already has an operator role")]
    OperatorAlreadySet(i64),

    #[error("service {0} does not exist")]
    ServiceNotFound(i64),

    /// A form field was routed to a service of the wrong product, or carried
    /// a value of the wrong shape. This is a catalog/config error, not user
    /// input.
    #[error("form field `{0}` is not recognized by this service")]
    FieldNotFound(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;
