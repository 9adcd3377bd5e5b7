//! Splitpay Engine
//!
//! The Splitpay Engine is the core of a payment gateway that saves a customer's card up front,
//! charges it off-session at a later date, and splits the settled funds between a service
//! provider, a referrer and the platform. It is processor-agnostic.
//!
//! The library is divided into three main sections:
//! 1. Contracts ([`mod@traits`]). The [`traits::OrderStore`] trait is the durable source of truth
//!    for order lifecycle state and the processed-event idempotency guard. The
//!    [`traits::PaymentProcessor`] trait is the boundary to the remote payment processor (card
//!    setup sessions, off-session charges, transfers, balances and payouts). Concrete backends
//!    implement these traits; the engine logic depends only on the contracts.
//! 2. The engine public API ([`mod@spe_api`]). [`CheckoutApi`] is the request-driven half of the
//!    order state machine (create setup session, charge now, release payout).
//!    [`ReconcilerApi`] is the event-driven half, consuming webhook notifications from the
//!    processor and advancing orders through card-saved, charged and settled states.
//! 3. The SQLite backend ([`mod@sqlite`], behind the default `sqlite` feature), which implements
//!    [`traits::OrderStore`] with guarded compare-and-swap status updates so that concurrent
//!    mutations on the same order always serialize.
pub mod db_types;
pub mod events;
pub mod helpers;
mod spe_api;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use spe_api::{
    checkout_api::{CheckoutApi, CheckoutConfig, NewSetupSession},
    errors::{CheckoutError, ReconcilerError},
    reconciler_api::{EventOutcome, IgnoreReason, ReconcilerApi},
};
