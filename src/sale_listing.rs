//! Seller-side vehicle sale listings (spec.md §3 "SaleListing",
//! §4.4 "Sale (seller side)"): agent-tier fee/duration/success tables,
//! price-tier modifiers, the Premium agent eligibility gate, and
//! extension-on-failure handling.
//!
//! Grounded on the teacher's `lending_marketplace.rs` offer-listing
//! lifecycle (post → wait → match-or-expire), generalized with the spec's
//! price-tier and agent-tier modifier tables and a Premium eligibility
//! gate that the teacher has no analogue for.

use crate::ids::{FarmId, GameTime, ListingId, Money, VehicleId};
use crate::reliability::VehicleReliabilityRecord;
use crate::rng::roll;
use serde::{Deserialize, Serialize};

/// Agent tier used to sell an owned vehicle (spec.md §4.4 "Sale"). Distinct
/// from the buyer-side [`crate::search::AgentTier`] — selling has its own
/// fee/duration/success table, with no Premium notion at this layer (that
/// lives in [`PriceTier`] instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleAgentTier {
    Private,
    Local,
    Regional,
    National,
}

impl SaleAgentTier {
    /// Listing fee as a percent of asking price (spec.md §4.4).
    pub fn fee_pct(self) -> f64 {
        match self {
            SaleAgentTier::Private => 0.0,
            SaleAgentTier::Local => 2.0,
            SaleAgentTier::Regional => 4.0,
            SaleAgentTier::National => 6.0,
        }
    }

    /// Listing duration range, in months, before expiry (spec.md §4.4).
    pub fn duration_months_range(self) -> (f64, f64) {
        match self {
            SaleAgentTier::Private => (3.0, 6.0),
            SaleAgentTier::Local => (1.0, 2.0),
            SaleAgentTier::Regional => (2.0, 4.0),
            SaleAgentTier::National => (4.0, 6.0),
        }
    }

    /// Base probability the listing finds a buyer before it expires
    /// (spec.md §4.4).
    pub fn base_success_chance(self) -> f64 {
        match self {
            SaleAgentTier::Private => 0.50,
            SaleAgentTier::Local => 0.70,
            SaleAgentTier::Regional => 0.85,
            SaleAgentTier::National => 0.95,
        }
    }
}

/// Minimum average component reliability and physical condition a vehicle
/// must show to qualify for the [`PriceTier::Premium`] listing band
/// (spec.md §4.4 "Premium requires repair ≥95% AND paint ≥80%").
pub const PREMIUM_MIN_REPAIR: f32 = 0.95;
pub const PREMIUM_MIN_PAINT: f32 = 0.80;

/// Checks whether a vehicle currently qualifies for the Premium price tier
/// (spec.md §4.4). `paint_condition` is `1 - damage` as reported by the
/// host, since the reliability engine itself tracks mechanical condition
/// (`repair`) but not cosmetic condition.
pub fn is_premium_eligible(record: &VehicleReliabilityRecord, paint_condition: f32) -> bool {
    use crate::reliability::ALL_COMPONENTS;
    let avg_r: f32 =
        ALL_COMPONENTS.iter().map(|c| record.component_r(*c)).sum::<f32>() / ALL_COMPONENTS.len() as f32;
    avg_r >= PREMIUM_MIN_REPAIR && paint_condition >= PREMIUM_MIN_PAINT
}

/// Price tier a seller chooses to position the asking price
/// (spec.md §4.4 "Price tier {Quick/Market/Premium}").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceTier {
    Quick,
    Market,
    Premium,
}

impl PriceTier {
    /// Asking-price range, as a percent of fair market value
    /// (spec.md §4.4).
    pub fn ask_pct_range(self) -> (f64, f64) {
        match self {
            PriceTier::Quick => (75.0, 85.0),
            PriceTier::Market => (95.0, 105.0),
            PriceTier::Premium => (115.0, 130.0),
        }
    }

    /// Success-chance modifier, in percentage points, added to the agent
    /// tier's base success chance (spec.md §4.4 "modifies success
    /// {+15, 0, −20}").
    pub fn success_modifier_pct(self) -> f64 {
        match self {
            PriceTier::Quick => 15.0,
            PriceTier::Market => 0.0,
            PriceTier::Premium => -20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleListingStatus {
    Active,
    Sold,
    Expired,
    Cancelled,
}

/// A farm's listing of one of its own vehicles for sale
/// (spec.md §3 "SaleListing"). `pending_offer`, when present, is an offer
/// the agent has surfaced that the seller must Accept or Decline via
/// `SaleListingAction` before the listing can sell (spec.md §4.7
/// "SaleListingAction{Accept|Decline|Cancel}").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleListing {
    pub id: ListingId,
    pub farm_id: FarmId,
    pub vehicle_id: VehicleId,
    pub agent_tier: SaleAgentTier,
    pub price_tier: PriceTier,
    pub ask_price: Money,
    pub fee_paid: Money,
    pub created_at: GameTime,
    pub expires_at: GameTime,
    pub status: SaleListingStatus,
    pub extensions_used: u32,
    pub pending_offer: Option<Money>,
}

impl SaleListing {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ListingId,
        farm_id: FarmId,
        vehicle_id: VehicleId,
        agent_tier: SaleAgentTier,
        price_tier: PriceTier,
        fair_market_value: Money,
        created_at: GameTime,
        seed: u64,
        nonce: u64,
        month_ms: i64,
    ) -> Self {
        let (lo, hi) = price_tier.ask_pct_range();
        let ask_pct = crate::rng::roll_range(seed, "sale_listing.ask_pct", nonce, lo, hi);
        let ask_price = fair_market_value.checked_mul_pct(ask_pct / 100.0);
        let fee_paid = ask_price.checked_mul_pct(agent_tier.fee_pct());
        let (dur_lo, dur_hi) = agent_tier.duration_months_range();
        let duration_months = crate::rng::roll_range(seed, "sale_listing.duration", nonce, dur_lo, dur_hi);
        let expires_at = created_at + (duration_months * month_ms as f64) as GameTime;
        SaleListing {
            id,
            farm_id,
            vehicle_id,
            agent_tier,
            price_tier,
            ask_price,
            fee_paid,
            created_at,
            expires_at,
            status: SaleListingStatus::Active,
            extensions_used: 0,
            pending_offer: None,
        }
    }

    pub fn is_expired(&self, now: GameTime) -> bool {
        self.status == SaleListingStatus::Active && now >= self.expires_at
    }

    /// Effective per-tick (daily) sale probability (spec.md §4.4): the
    /// agent tier's base success chance plus the price tier's percentage
    /// point modifier.
    pub fn daily_success_chance(&self) -> f64 {
        ((self.agent_tier.base_success_chance() * 100.0) + self.price_tier.success_modifier_pct())
            .clamp(0.0, 100.0)
            / 100.0
    }

    /// Rolls whether the listing surfaces a buyer offer today. Callers
    /// invoke this once per elapsed in-game day while the listing is
    /// active and has no pending offer.
    pub fn roll_daily_sale(&self, seed: u64, nonce: u64) -> bool {
        roll(seed, "sale_listing.daily", nonce) < self.daily_success_chance()
    }

    /// On expiry without a sale, the seller may extend once at the same
    /// tier's parameters rather than relisting from scratch (spec.md §4.4
    /// "failure extends window once, then returns").
    pub fn extend(&mut self, now: GameTime, month_ms: i64) {
        self.extensions_used += 1;
        let (dur_lo, dur_hi) = self.agent_tier.duration_months_range();
        let months = (dur_lo + dur_hi) / 2.0;
        self.expires_at = now + (months * month_ms as f64) as GameTime;
        self.status = SaleListingStatus::Active;
    }

    pub fn mark_sold(&mut self) {
        self.status = SaleListingStatus::Sold;
        self.pending_offer = None;
    }

    pub fn mark_expired(&mut self) {
        self.status = SaleListingStatus::Expired;
    }

    pub fn mark_cancelled(&mut self) {
        self.status = SaleListingStatus::Cancelled;
        self.pending_offer = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReliabilityConfig;
    use crate::reliability::VehicleReliabilityRecord;

    #[test]
    fn premium_requires_high_repair_and_paint() {
        let record = VehicleReliabilityRecord::first_observed(1, 7);
        assert!(is_premium_eligible(&record, 0.9));
        assert!(!is_premium_eligible(&record, 0.5));
    }

    #[test]
    fn premium_ineligible_after_breakdown_collapse() {
        let config = ReliabilityConfig::default();
        let mut record = VehicleReliabilityRecord::first_observed(1, 7);
        for i in 0..50u64 {
            record.apply_breakdown(&config, 7, i);
        }
        assert!(!is_premium_eligible(&record, 0.9) || record.dna_tier() == crate::reliability::DnaTier::Legendary);
    }

    #[test]
    fn ask_price_falls_within_price_tier_band() {
        let listing = SaleListing::new(
            "sl1".into(),
            1,
            1,
            SaleAgentTier::Regional,
            PriceTier::Premium,
            Money::from_major(50_000),
            0,
            42,
            1,
            30 * 86_400_000,
        );
        let pct = listing.ask_price.as_f64_major() / 50_000.0 * 100.0;
        assert!((115.0..=130.0).contains(&pct), "pct = {pct}");
    }

    #[test]
    fn fee_is_percent_of_ask_price_for_paid_tiers() {
        let listing = SaleListing::new(
            "sl2".into(),
            1,
            1,
            SaleAgentTier::National,
            PriceTier::Market,
            Money::from_major(10_000),
            0,
            42,
            1,
            30 * 86_400_000,
        );
        let expected = listing.ask_price.checked_mul_pct(6.0);
        assert_eq!(listing.fee_paid, expected);
    }

    #[test]
    fn private_tier_has_no_listing_fee() {
        let listing = SaleListing::new(
            "sl2b".into(),
            1,
            1,
            SaleAgentTier::Private,
            PriceTier::Market,
            Money::from_major(10_000),
            0,
            42,
            1,
            30 * 86_400_000,
        );
        assert_eq!(listing.fee_paid, Money::ZERO);
    }

    #[test]
    fn expiry_triggers_after_duration_elapses() {
        let listing = SaleListing::new(
            "sl3".into(),
            1,
            1,
            SaleAgentTier::Local,
            PriceTier::Market,
            Money::from_major(10_000),
            0,
            42,
            1,
            30 * 86_400_000,
        );
        assert!(!listing.is_expired(listing.expires_at - 1));
        assert!(listing.is_expired(listing.expires_at));
    }

    #[test]
    fn extend_resets_expiry_and_counts_extension() {
        let mut listing = SaleListing::new(
            "sl4".into(),
            1,
            1,
            SaleAgentTier::Local,
            PriceTier::Market,
            Money::from_major(10_000),
            0,
            42,
            1,
            30 * 86_400_000,
        );
        listing.status = SaleListingStatus::Expired;
        listing.extend(listing.expires_at, 30 * 86_400_000);
        assert_eq!(listing.extensions_used, 1);
        assert_eq!(listing.status, SaleListingStatus::Active);
    }

    #[test]
    fn quick_tier_sells_faster_than_premium() {
        let quick = SaleListing::new(
            "sl5".into(), 1, 1, SaleAgentTier::National, PriceTier::Quick,
            Money::from_major(10_000), 0, 42, 1, 30 * 86_400_000,
        );
        let premium = SaleListing::new(
            "sl6".into(), 1, 1, SaleAgentTier::National, PriceTier::Premium,
            Money::from_major(10_000), 0, 42, 2, 30 * 86_400_000,
        );
        assert!(quick.daily_success_chance() > premium.daily_success_chance());
    }
}
