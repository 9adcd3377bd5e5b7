use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use spg_common::Cents;
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------        OrderId        -------------------------------------------------------
/// The caller-supplied order identifier. Unique across the store, used as the correlation key in
/// all processor metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   OrderStatusType     -------------------------------------------------------
/// The lifecycle status of an order.
///
/// Orders only ever move forward through the machine. The full transition table lives in
/// [`OrderStatusType::can_transition_to`]; everything not listed there is rejected by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order exists and a card-setup session has been requested. No card data yet.
    Created,
    /// The customer's card has been saved off-session. The order can now be charged.
    CardSaved,
    /// An off-session charge has been submitted to the processor.
    ChargeAttempted,
    /// The processor demanded additional customer authentication for the off-session charge.
    /// The charge can be retried manually once the customer has authenticated.
    ChargeRequiresAction,
    /// The charge settled and both fund transfers have been issued. Terminal.
    PaidAndTransferred,
    /// The charge failed in a way that cannot self-resolve (e.g. card declined). Terminal.
    Failed,
}

impl OrderStatusType {
    /// The allowed forward transitions of the order state machine.
    ///
    /// | From                 | To                                                        |
    /// |----------------------|-----------------------------------------------------------|
    /// | Created              | CardSaved                                                         |
    /// | CardSaved            | ChargeAttempted, ChargeRequiresAction, PaidAndTransferred, Failed |
    /// | ChargeAttempted      | PaidAndTransferred, ChargeRequiresAction, Failed                  |
    /// | ChargeRequiresAction | ChargeAttempted, PaidAndTransferred, Failed               |
    ///
    /// `CardSaved -> PaidAndTransferred` is allowed because the processor's charge-succeeded
    /// notification can race the synchronous charge call, and
    /// `ChargeRequiresAction -> PaidAndTransferred` because a parked charge succeeds once the
    /// customer authenticates the pending payment intent. Regressions are never allowed.
    pub fn can_transition_to(&self, new_status: &OrderStatusType) -> bool {
        use OrderStatusType::*;
        matches!(
            (self, new_status),
            (Created, CardSaved) |
                (CardSaved, ChargeAttempted | ChargeRequiresAction | PaidAndTransferred | Failed) |
                (ChargeAttempted, PaidAndTransferred | ChargeRequiresAction | Failed) |
                (ChargeRequiresAction, ChargeAttempted | PaidAndTransferred | Failed)
        )
    }

    /// True for statuses from which no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::PaidAndTransferred | OrderStatusType::Failed)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Created => write!(f, "Created"),
            OrderStatusType::CardSaved => write!(f, "CardSaved"),
            OrderStatusType::ChargeAttempted => write!(f, "ChargeAttempted"),
            OrderStatusType::ChargeRequiresAction => write!(f, "ChargeRequiresAction"),
            OrderStatusType::PaidAndTransferred => write!(f, "PaidAndTransferred"),
            OrderStatusType::Failed => write!(f, "Failed"),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Created");
            OrderStatusType::Created
        })
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(Self::Created),
            "CardSaved" => Ok(Self::CardSaved),
            "ChargeAttempted" => Ok(Self::ChargeAttempted),
            "ChargeRequiresAction" => Ok(Self::ChargeRequiresAction),
            "PaidAndTransferred" => Ok(Self::PaidAndTransferred),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------     SplitAmounts      -------------------------------------------------------
/// The computed three-way split of a settled charge. Recorded on the order, write-once, for
/// auditability. `provider + referrer + platform` always equals the charged total exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitAmounts {
    pub provider: Cents,
    pub referrer: Cents,
    pub platform: Cents,
}

impl SplitAmounts {
    pub fn total(&self) -> Cents {
        self.provider + self.referrer + self.platform
    }
}

impl Display for SplitAmounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "provider: {}, referrer: {}, platform: {}", self.provider, self.referrer, self.platform)
    }
}

//--------------------------------------     TransferPair      -------------------------------------------------------
/// The processor-side identifiers of the two fund transfers issued for a settled order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferPair {
    pub provider_transfer_id: String,
    pub referrer_transfer_id: String,
}

//--------------------------------------        Order          -------------------------------------------------------
/// A unit of deferred payment tied to one customer card, one provider and one referrer.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    /// The total due, in minor currency units. Fixed at creation.
    pub amount: Cents,
    pub currency: String,
    /// Destination sub-account for the provider's share of the funds.
    pub provider_account_id: String,
    /// Destination sub-account for the referrer's share of the funds.
    pub referrer_account_id: String,
    pub status: OrderStatusType,
    /// Processor customer reference. Set together with `payment_method_id` on card-save
    /// confirmation; both or neither are present.
    pub customer_id: Option<String>,
    pub payment_method_id: Option<String>,
    /// Set once a charge attempt has been submitted.
    pub payment_intent_id: Option<String>,
    pub provider_transfer_id: Option<String>,
    pub referrer_transfer_id: Option<String>,
    pub provider_amount: Option<Cents>,
    pub referrer_amount: Option<Cents>,
    pub platform_amount: Option<Cents>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// True once both card references from the setup confirmation have been recorded.
    pub fn card_saved(&self) -> bool {
        self.customer_id.is_some() && self.payment_method_id.is_some()
    }

    /// The recorded split, if the order has settled.
    pub fn split(&self) -> Option<SplitAmounts> {
        match (self.provider_amount, self.referrer_amount, self.platform_amount) {
            (Some(provider), Some(referrer), Some(platform)) => Some(SplitAmounts { provider, referrer, platform }),
            _ => None,
        }
    }

    /// The recorded transfer ids, if the order has settled.
    pub fn transfers(&self) -> Option<TransferPair> {
        match (&self.provider_transfer_id, &self.referrer_transfer_id) {
            (Some(p), Some(r)) => {
                Some(TransferPair { provider_transfer_id: p.clone(), referrer_transfer_id: r.clone() })
            },
            _ => None,
        }
    }
}

//--------------------------------------       NewOrder        -------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    /// The order id as assigned by the merchant frontend
    pub order_id: OrderId,
    /// The total to charge later, in minor currency units
    pub amount: Cents,
    /// The currency of the order
    pub currency: String,
    /// Destination sub-account for the provider's share
    pub provider_account_id: String,
    /// Destination sub-account for the referrer's share
    pub referrer_account_id: String,
    /// The time the order was created
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new<S1, S2>(order_id: OrderId, amount: Cents, provider_account_id: S1, referrer_account_id: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            order_id,
            amount,
            currency: "usd".to_string(),
            provider_account_id: provider_account_id.into(),
            referrer_account_id: referrer_account_id.into(),
            created_at: Utc::now(),
        }
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }
}

#[cfg(test)]
mod test {
    use super::OrderStatusType::*;

    #[test]
    fn transitions_only_move_forward() {
        assert!(Created.can_transition_to(&CardSaved));
        assert!(CardSaved.can_transition_to(&ChargeAttempted));
        assert!(CardSaved.can_transition_to(&PaidAndTransferred));
        // A synchronous decline fails the order before any attempt is recorded
        assert!(CardSaved.can_transition_to(&Failed));
        assert!(ChargeAttempted.can_transition_to(&PaidAndTransferred));
        assert!(ChargeAttempted.can_transition_to(&ChargeRequiresAction));
        assert!(ChargeRequiresAction.can_transition_to(&ChargeAttempted));
        // A parked charge settles directly once the customer authenticates it
        assert!(ChargeRequiresAction.can_transition_to(&PaidAndTransferred));
        // No regressions
        assert!(!CardSaved.can_transition_to(&Created));
        assert!(!ChargeAttempted.can_transition_to(&CardSaved));
        assert!(!PaidAndTransferred.can_transition_to(&ChargeAttempted));
        assert!(!Failed.can_transition_to(&Created));
        // No skipping card setup
        assert!(!Created.can_transition_to(&ChargeAttempted));
        assert!(!Created.can_transition_to(&PaidAndTransferred));
    }

    #[test]
    fn terminal_statuses() {
        assert!(PaidAndTransferred.is_terminal());
        assert!(Failed.is_terminal());
        assert!(!ChargeRequiresAction.is_terminal());
    }
}
