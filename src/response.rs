//! Outbound transaction responses and the message-key catalogue
//! (spec.md §6 "Responses", §11.1 supplement).
//!
//! Grounded on the teacher's `result.rs` typed result-with-reason-code
//! pattern, widened into the `messageKey` + two numeric argument slots the
//! spec documents so a localized client can render any response without
//! the core ever formatting user-facing strings itself.

use crate::ids::{FarmId, ListingId, Money};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Every distinct outcome a request handler can report back to the host,
/// as a stable key rather than a formatted string (spec.md §11.1
/// "messageKey catalogue"). Display/EnumString let the host log these
/// compactly while still localizing client-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum MessageKey {
    Ok,
    Unauthorized,
    InvalidParameter,
    ResourceCapExceeded,
    InsufficientFunds,
    IneligibleCredit,
    NotFound,
    InvalidState,
    Conflict,
    DealOpened,
    DealCompleted,
    DealDefaulted,
    DealRepossessed,
    PaymentApplied,
    PaymentMissed,
    LeaseReturned,
    LeaseBoughtOut,
    LeaseRenewed,
    SearchStarted,
    SearchCancelled,
    SearchCompleted,
    ListingFound,
    ListingDeclined,
    ListingLocked,
    ListingInspected,
    NegotiationAccepted,
    NegotiationCountered,
    NegotiationRejected,
    NegotiationWalkedAway,
    SaleListingCreated,
    SaleListingSold,
    SaleListingExpired,
    SaleListingCancelled,
    SaleOfferAccepted,
    SaleOfferDeclined,
    SaleListingPriceUpdated,
    TradeInApplied,
    VehicleRepaired,
    FieldRepairApplied,
    FieldRepairAlreadyUsed,
    FluidsRefilled,
    TiresReplaced,
    RestorationStarted,
    RestorationInProgress,
    RestorationPaused,
    RestorationCompleted,
    RestorationAborted,
    ServiceTruckOffered,
    ServiceTruckPurchased,
    ServiceTruckNotEligible,
}

/// A single outbound response to a request, mirroring spec.md §6's
/// `{farmId, success, messageKey, arg1, arg2}` shape. `arg1`/`arg2` carry
/// whatever numeric context the message key implies (amounts, ids,
/// percentages); handlers document which applies per key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub farm_id: FarmId,
    pub success: bool,
    pub message_key: MessageKey,
    pub arg1: Option<i64>,
    pub arg2: Option<i64>,
}

impl TransactionResponse {
    pub fn ok(farm_id: FarmId, message_key: MessageKey) -> Self {
        TransactionResponse { farm_id, success: true, message_key, arg1: None, arg2: None }
    }

    pub fn ok_with_args(farm_id: FarmId, message_key: MessageKey, arg1: i64, arg2: i64) -> Self {
        TransactionResponse { farm_id, success: true, message_key, arg1: Some(arg1), arg2: Some(arg2) }
    }

    pub fn fail(farm_id: FarmId, message_key: MessageKey) -> Self {
        TransactionResponse { farm_id, success: false, message_key, arg1: None, arg2: None }
    }

    pub fn from_core_error(farm_id: FarmId, err: &crate::error::CoreError) -> Self {
        use crate::error::CoreError;
        let key = match err {
            CoreError::Unauthorized { .. } => MessageKey::Unauthorized,
            CoreError::InvalidParameter(_) => MessageKey::InvalidParameter,
            CoreError::ResourceCap(_) => MessageKey::ResourceCapExceeded,
            CoreError::InsufficientFunds { .. } => MessageKey::InsufficientFunds,
            CoreError::IneligibleCredit { .. } => MessageKey::IneligibleCredit,
            CoreError::NotFound(_) => MessageKey::NotFound,
            CoreError::InvalidState(_) => MessageKey::InvalidState,
            CoreError::Conflict(_) => MessageKey::Conflict,
            CoreError::Io(_) | CoreError::Serialize(_) => MessageKey::InvalidState,
        };
        TransactionResponse::fail(farm_id, key)
    }
}

/// Broadcast notification sent to every farm with a matching active
/// search when a new listing is generated for it (spec.md §6
/// "UsedItemFound"), distinct from the request/response pair above since
/// no request triggers it directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsedItemFound {
    pub farm_id: FarmId,
    pub listing_id: ListingId,
    pub store_item_ref: String,
    pub ask_price: Money,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn core_error_maps_to_stable_message_key() {
        let resp = TransactionResponse::from_core_error(1, &CoreError::InsufficientFunds {
            required: 100,
            available: 50,
        });
        assert!(!resp.success);
        assert_eq!(resp.message_key, MessageKey::InsufficientFunds);
    }

    #[test]
    fn message_key_round_trips_through_display_and_parse() {
        use std::str::FromStr;
        let key = MessageKey::DealRepossessed;
        let s = key.to_string();
        let back = MessageKey::from_str(&s).unwrap();
        assert_eq!(back, key);
    }
}
