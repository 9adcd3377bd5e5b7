use spg_common::Cents;
use thiserror::Error;

use crate::{
    db_types::OrderId,
    helpers::SplitError,
    traits::{OrderStoreError, ProcessorError},
};

#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("Order {0} already exists")]
    OrderAlreadyExists(OrderId),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The card for order {0} has not been saved yet (setup not completed)")]
    CardNotSaved(OrderId),
    #[error("Not enough available balance. available={available}, requested={requested}")]
    InsufficientBalance { available: Cents, requested: Cents },
    #[error("Order {order_id} requires additional customer authentication before it can be charged. {message}")]
    AuthenticationRequired { order_id: OrderId, message: String },
    #[error("{0}")]
    Processor(#[from] ProcessorError),
    #[error("{0}")]
    Store(OrderStoreError),
}

impl From<OrderStoreError> for CheckoutError {
    fn from(e: OrderStoreError) -> Self {
        match e {
            OrderStoreError::DuplicateOrder(id) => CheckoutError::OrderAlreadyExists(id),
            OrderStoreError::OrderNotFound(id) => CheckoutError::OrderNotFound(id),
            other => CheckoutError::Store(other),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ReconcilerError {
    #[error("{0}")]
    Store(#[from] OrderStoreError),
    #[error("{0}")]
    Processor(#[from] ProcessorError),
    #[error("{0}")]
    Split(#[from] SplitError),
}
