//! Listing and inspection types for the Used Marketplace (spec.md §3
//! "Listing", §4.4 "Inspection").

use crate::ids::{GameTime, ListingId, Money, SearchId};
use crate::reliability::dna_tier;
use serde::{Deserialize, Serialize};

/// Listing age bucket, sampled by agent tier (spec.md §3 / §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Generation {
    Recent,
    Mid,
    Old,
}

/// Buyer-selected condition class (spec.md §3 / §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityTier {
    Any,
    Poor,
    Fair,
    Good,
    Excellent,
}

/// Negotiation archetype (spec.md §3 / §4.4; five-personality variant is
/// normative per spec.md §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SellerPersonality {
    Desperate,
    Motivated,
    Reasonable,
    Firm,
    Immovable,
}

impl SellerPersonality {
    /// Base acceptance threshold as % of ask (spec.md §4.4).
    pub fn acceptance_threshold_pct(self) -> f64 {
        match self {
            SellerPersonality::Desperate => 65.0,
            SellerPersonality::Motivated => 75.0,
            SellerPersonality::Reasonable => 85.0,
            SellerPersonality::Firm => 92.0,
            SellerPersonality::Immovable => 98.0,
        }
    }

    /// DNA-tier mix a listing with this personality draws from
    /// (spec.md §4.4 "DNA seeding for listings"): [Lemon, Average, Workhorse]
    /// percentages; Legendary is folded into the Workhorse draw at a fixed
    /// small share handled by the caller.
    pub fn dna_tier_weights(self) -> [f64; 3] {
        match self {
            SellerPersonality::Desperate => [60.0, 30.0, 10.0],
            SellerPersonality::Motivated => [30.0, 50.0, 20.0],
            SellerPersonality::Reasonable => [15.0, 60.0, 25.0],
            SellerPersonality::Firm => [5.0, 45.0, 45.0],
            SellerPersonality::Immovable => [0.0, 10.0, 90.0],
        }
    }
}

/// Snapshot of the three reliability components, used both as a listing's
/// public inspection output and as the hidden ground truth.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReliabilitySnapshot {
    pub engine_r: f32,
    pub hydraulic_r: f32,
    pub electrical_r: f32,
}

impl ReliabilitySnapshot {
    pub fn avg(&self) -> f32 {
        (self.engine_r + self.hydraulic_r + self.electrical_r) / 3.0
    }
}

/// A cached inspection result, invalidated by sufficiently large condition
/// drift (spec.md §4.4 "Inspection").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionReport {
    pub reliability: ReliabilitySnapshot,
    pub estimated_repair_cost: Money,
    pub mechanic_assessment: String,
    pub cached_hours: f64,
    pub cached_damage: f64,
    pub cached_wear: f64,
}

impl InspectionReport {
    pub fn is_stale(&self, hours: f64, damage: f64, wear: f64) -> bool {
        (hours - self.cached_hours).abs() > 10.0
            || (damage - self.cached_damage).abs() > 0.05
            || (wear - self.cached_wear).abs() > 0.05
    }
}

/// Cost to inspect a listing (spec.md §4.4): `min(2000, 200 + 0.01*askPrice)`.
pub fn inspection_cost(ask_price: Money) -> Money {
    let computed = Money::from_major(200) + ask_price.checked_mul_pct(0.01);
    computed.min(Money::from_major(2000))
}

/// Estimated repair cost shown on inspection (spec.md §4.4):
/// `basePrice*(1-avgR)*0.15`.
pub fn estimated_repair_cost(base_price: Money, reliability: &ReliabilitySnapshot) -> Money {
    base_price.checked_mul_pct((1.0 - reliability.avg() as f64) * 0.15)
}

/// One of the 50-entry mechanic's-assessment strings, keyed by DNA tier
/// (spec.md §4.4: "a 50-entry table keyed by DNA tier (5 per sub-tier)").
/// Sub-tiers split each DNA tier into 5 bands by reliability average so the
/// same DNA tier still yields varied flavor text as condition changes.
pub fn mechanic_assessment(dna: f32, reliability: &ReliabilitySnapshot) -> String {
    let tier = dna_tier(dna);
    let sub = ((reliability.avg() * 5.0) as usize).min(4);
    let bank: [&str; 5] = match tier {
        crate::reliability::DnaTier::Lemon => [
            "Runs, but I wouldn't trust it past the fence line.",
            "Something in here has given up on life.",
            "Patched together more than once, by the look of it.",
            "It'll start most mornings. Most.",
            "Barely holding together, but it is holding.",
        ],
        crate::reliability::DnaTier::Average => [
            "Nothing remarkable, nothing alarming either.",
            "Shows its age but nothing's hiding underneath.",
            "A straightforward, honest machine.",
            "Wear is where you'd expect it to be.",
            "Solid enough for day-to-day work.",
        ],
        crate::reliability::DnaTier::Workhorse => [
            "Built to take a beating and keep going.",
            "Tight tolerances everywhere I checked.",
            "This one's earned its keep and then some.",
            "Runs smoother than its age would suggest.",
            "I'd buy this one myself if I had the acres for it.",
        ],
        crate::reliability::DnaTier::Legendary => [
            "One of the good ones. Rare to see this clean.",
            "Whoever built this one was having a very good day.",
            "I could count on one hand the issues I'd expect from this.",
            "This is the kind of machine you pass down.",
            "Near-flawless. You don't see this often.",
        ],
    };
    bank[sub].to_string()
}

/// A discoverable used-vehicle sale candidate (spec.md §3 "Listing").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub store_item_ref: String,
    pub base_price: Money,
    pub generation: Generation,
    pub damage: f32,
    pub wear: f32,
    pub reliability_snapshot: ReliabilitySnapshot,
    pub dna: f32,
    pub seller_personality: SellerPersonality,
    pub ask_price: Money,
    pub created_at: GameTime,
    pub locked_until: Option<GameTime>,
    pub found_by: SearchId,
    pub inspection: Option<InspectionReport>,
}

impl Listing {
    pub fn is_locked(&self, now: GameTime) -> bool {
        matches!(self.locked_until, Some(until) if now < until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inspection_cost_is_capped() {
        let cost = inspection_cost(Money::from_major(1_000_000));
        assert_eq!(cost, Money::from_major(2000));
    }

    #[test]
    fn inspection_cost_uses_formula_below_cap() {
        let cost = inspection_cost(Money::from_major(10_000));
        // 200 + 0.01 * 10000 = 300
        assert_eq!(cost, Money::from_major(300));
    }

    #[test]
    fn inspection_staleness_triggers_on_drift() {
        let report = InspectionReport {
            reliability: ReliabilitySnapshot { engine_r: 0.8, hydraulic_r: 0.8, electrical_r: 0.8 },
            estimated_repair_cost: Money::ZERO,
            mechanic_assessment: "fine".into(),
            cached_hours: 100.0,
            cached_damage: 0.1,
            cached_wear: 0.1,
        };
        assert!(!report.is_stale(105.0, 0.1, 0.1));
        assert!(report.is_stale(120.0, 0.1, 0.1));
        assert!(report.is_stale(100.0, 0.2, 0.1));
        assert!(report.is_stale(100.0, 0.1, 0.2));
    }

    #[test]
    fn personality_weights_sum_to_100() {
        for p in [
            SellerPersonality::Desperate,
            SellerPersonality::Motivated,
            SellerPersonality::Reasonable,
            SellerPersonality::Firm,
            SellerPersonality::Immovable,
        ] {
            let w = p.dna_tier_weights();
            assert!((w.iter().sum::<f64>() - 100.0).abs() < 1e-9);
        }
    }
}
