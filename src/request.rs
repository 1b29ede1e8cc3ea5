//! The authoritative request vocabulary (spec.md §6 "Requests", C7 Event/
//! Transaction Layer): every action a connected farm can ask the core to
//! perform, as one typed enum dispatched by [`crate::core::Core::handle_request`].
//!
//! Grounded on the teacher's `event.rs` typed-event-enum pattern, widened
//! from a read-only notification enum to a full inbound command set the
//! way the teacher's `wizard.rs` step commands are modeled.

use crate::deal::{CollateralItem, DealKind, PaymentMode};
use crate::ids::{DealId, FarmId, LandId, ListingId, Money, SearchId, VehicleId};
use crate::listing::QualityTier;
use crate::negotiation::Negotiation;
use crate::reliability::Component;
use crate::sale_listing::{PriceTier, SaleAgentTier};
use crate::search::AgentTier;
use serde::{Deserialize, Serialize};

/// The maximum number of collateral items accepted on a single finance
/// request (spec.md §4.7 "Resource caps: ... collateral ≤50").
pub const MAX_COLLATERAL_ITEMS: usize = 50;

/// The three actions a seller can take against their own sale listing
/// (spec.md §4.7 "SaleListingAction{Accept|Decline|Cancel}").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleListingActionKind {
    /// Accepts the listing's currently pending buyer offer.
    Accept,
    /// Declines the pending offer; the listing stays active and keeps
    /// trying.
    Decline,
    /// Withdraws the listing entirely.
    Cancel,
}

/// Every inbound action the core accepts (spec.md §6). Each variant names
/// the fields that request carries; validation and execution live in
/// [`crate::core::Core::handle_request`], not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RequestKind {
    FinanceVehicle {
        vehicle_id: VehicleId,
        price: Money,
        term_months: u32,
        down_payment: Money,
        collateral: Vec<CollateralItem>,
    },
    FinancePayment {
        deal_id: DealId,
        amount: Money,
    },
    TakeLoan {
        amount: Money,
        term_months: u32,
        kind: DealKind,
    },
    VanillaLoanPayment {
        deal_id: DealId,
        amount: Money,
    },
    LeaseVehicle {
        vehicle_id: VehicleId,
        price: Money,
        term_months: u32,
        security_deposit: Money,
    },
    LeaseEnd {
        deal_id: DealId,
    },
    TerminateLease {
        deal_id: DealId,
    },
    LeaseRenewal {
        deal_id: DealId,
        disposition_buyout: bool,
    },
    PurchaseLandCash {
        land_id: LandId,
        price: Money,
    },
    LandLease {
        land_id: LandId,
        price: Money,
        term_months: u32,
    },
    LandLeaseBuyout {
        deal_id: DealId,
    },
    RequestUsedItem {
        store_item_ref: String,
        agent_tier: AgentTier,
        quality_tier: QualityTier,
        base_price: Money,
    },
    CancelSearch {
        search_id: SearchId,
    },
    DeclineListing {
        listing_id: ListingId,
    },
    /// Pays to inspect a found listing, caching a fresh
    /// [`crate::listing::InspectionReport`] on it (spec.md §4.4
    /// "Inspection").
    InspectListing {
        listing_id: ListingId,
    },
    /// A buyer's initial offer against a found listing (spec.md §4.4
    /// "Negotiation mechanics"). Banded into Accepted/Countered/Rejected/
    /// WalkedAway by [`crate::negotiation::evaluate_offer`].
    NegotiateOffer {
        listing_id: ListingId,
        offer: Money,
    },
    /// Accepts the seller's counter-offer on a `Countered` negotiation.
    NegotiationAcceptCounter {
        listing_id: ListingId,
    },
    /// Refuses to move off the buyer's last offer on a `Countered`
    /// negotiation, triggering the seller's stand-firm dice (spec.md §4.4
    /// "StandFirm dice").
    NegotiationStandFirm {
        listing_id: ListingId,
    },
    /// Buyer-initiated, permanent withdrawal from a `Countered`
    /// negotiation.
    NegotiationWalkAway {
        listing_id: ListingId,
    },
    CreateSaleListing {
        vehicle_id: VehicleId,
        agent_tier: SaleAgentTier,
        price_tier: PriceTier,
        fair_market_value: Money,
    },
    /// A seller's Accept/Decline/Cancel against their own sale listing
    /// (spec.md §4.7 "SaleListingAction{Accept|Decline|Cancel}").
    SaleListingAction {
        listing_id: ListingId,
        action: SaleListingActionKind,
    },
    ModifyListingPrice {
        listing_id: ListingId,
        new_ask_price: Money,
    },
    TradeInVehicle {
        vehicle_id: VehicleId,
        target_listing_id: ListingId,
    },
    RepairVehicle {
        vehicle_id: VehicleId,
    },
    SetPaymentConfig {
        deal_id: DealId,
        mode: PaymentMode,
        custom_amount: Option<Money>,
        multiplier: f64,
    },
    FieldRepair {
        vehicle_id: VehicleId,
        component: Component,
    },
    RefillFluids {
        vehicle_id: VehicleId,
    },
    ReplaceTires {
        vehicle_id: VehicleId,
    },
    StartRestoration {
        vehicle_id: VehicleId,
        component: Component,
    },
    StopRestoration,
    RestorationProgress,
    SetRestorationCooldown {
        until: crate::ids::GameTime,
    },
    ServiceTruckDiscovery,
    ServiceTruckPurchase {
        price: Money,
    },
    ServiceTruckDiscoverySync,
}

/// A request envelope, carrying the issuing farm alongside the action
/// (spec.md §6 "every request is stamped with the issuing farm for the
/// Unauthorized check").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub farm_id: FarmId,
    pub kind: RequestKind,
}

/// Negotiation offers are modeled as a distinct, stateful exchange rather
/// than a single request/response pair (spec.md §3 "Negotiation"); this
/// type is what [`crate::core::Core`] stores per listing, not something a
/// client sends directly.
pub type NegotiationState = Negotiation;
