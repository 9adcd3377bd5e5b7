use thiserror::Error;

use crate::data_objects::StripeErrorDetail;

#[derive(Debug, Error)]
pub enum StripeApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {error}")]
    QueryError { status: u16, error: StripeErrorDetail },
}

impl StripeApiError {
    /// The structured Stripe error behind a failed query, if there is one.
    pub fn detail(&self) -> Option<&StripeErrorDetail> {
        match self {
            StripeApiError::QueryError { error, .. } => Some(error),
            _ => None,
        }
    }
}
