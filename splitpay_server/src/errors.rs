use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use splitpay_engine::{CheckoutError, ReconcilerError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Payload deserialization error")]
    CouldNotDeserializePayload,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The order already exists. {0}")]
    DuplicateOrder(String),
    #[error("A precondition for this call has not been met. {0}")]
    PreconditionFailed(String),
    #[error("Additional customer authentication is required. {0}")]
    PaymentRequired(String),
    #[error("Not enough available balance. {0}")]
    InsufficientBalance(String),
    #[error("The card was declined. {0}")]
    CardDeclined(String),
    #[error("The payment processor returned an error. {0}")]
    ProcessorError(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::CouldNotDeserializePayload => StatusCode::BAD_REQUEST,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::DuplicateOrder(_) => StatusCode::CONFLICT,
            Self::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            Self::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            Self::InsufficientBalance(_) => StatusCode::BAD_REQUEST,
            Self::CardDeclined(_) => StatusCode::PAYMENT_REQUIRED,
            Self::ProcessorError(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<CheckoutError> for ServerError {
    fn from(e: CheckoutError) -> Self {
        use splitpay_engine::traits::ProcessorError;
        match e {
            CheckoutError::OrderAlreadyExists(id) => Self::DuplicateOrder(id.to_string()),
            CheckoutError::OrderNotFound(id) => Self::NoRecordFound(id.to_string()),
            CheckoutError::CardNotSaved(id) => {
                Self::PreconditionFailed(format!("The card for order {id} has not been saved yet"))
            },
            CheckoutError::InsufficientBalance { available, requested } => {
                Self::InsufficientBalance(format!("available={available}, requested={requested}"))
            },
            CheckoutError::AuthenticationRequired { order_id, message } => {
                Self::PaymentRequired(format!("Order {order_id}: {message}"))
            },
            CheckoutError::Processor(ProcessorError::CardDeclined(m)) => Self::CardDeclined(m),
            CheckoutError::Processor(e) => Self::ProcessorError(e.to_string()),
            CheckoutError::Store(e) => Self::BackendError(e.to_string()),
        }
    }
}

// Reconciler failures always surface as 5xx: the processor must treat the delivery as failed and
// redeliver.
impl From<ReconcilerError> for ServerError {
    fn from(e: ReconcilerError) -> Self {
        Self::BackendError(e.to_string())
    }
}
