//! Contracts of the splitpay engine.
//!
//! This module defines the interfaces that concrete backends must implement for the engine to
//! run on top of them.
//!
//! * [`OrderStore`] is the durable source of truth for order lifecycle state, and doubles as the
//!   processed-event idempotency guard. Backends must make every status transition an atomic
//!   compare-and-swap so that concurrent mutations on the same order serialize.
//! * [`PaymentProcessor`] is the boundary to the remote payment processor. The engine only ever
//!   talks to the processor through this trait, which keeps the core logic provider-agnostic and
//!   lets tests substitute a mock.
mod order_store;
mod processor;

pub use order_store::{OrderStore, OrderStoreError};
pub use processor::{
    ChargeSubmission,
    OffSessionChargeRequest,
    PaymentProcessor,
    PayoutReceipt,
    ProcessorError,
    SetupConfirmation,
    SetupSession,
    SetupSessionRequest,
    TransferReceipt,
    TransferRequest,
};
