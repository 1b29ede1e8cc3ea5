//! Credit Bureau (spec.md §4.2, C2): numeric score, rating tier, interest
//! adjustment, and event-sourced history driving eligibility gates.
//!
//! Grounded on the teacher's `credit_rating.rs` `CreditScore`: a per-farm
//! score record recomputed from accumulated history rather than mutated
//! directly, kept in the same 300-850 FICO-like range. Unlike the teacher's
//! weighted multi-factor recompute, spec.md §4.2 specifies a pure
//! event-sourced log (`score = clamp(650 + Σ event.delta, 300, 850)`), so the
//! event log here is authoritative and the score is a derived view, never
//! stored independently — this keeps replay (spec.md §8) trivial: replaying
//! the same event log always yields the same score.

use crate::error::{CoreError, CoreResult};
use crate::ids::{ExternalId, FarmId, GameTime, Money};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MIN_SCORE: i32 = 300;
pub const MAX_SCORE: i32 = 850;
pub const BASELINE_SCORE: i32 = 650;

/// The kind of credit event recorded, with its fixed score delta
/// (spec.md §4.2 "Kinds and deltas").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreditEventKind {
    PaymentOnTime,
    PaymentEarlyPayoff,
    PaymentMissed,
    AssetSeized,
    LandSeized,
    LoanTaken,
    DealPaidOff,
    ExternalPaymentOnTime,
    ExternalPaymentLate,
    ExternalPaymentMissed,
    ExternalPayoff,
}

impl CreditEventKind {
    pub fn delta(self) -> i32 {
        match self {
            CreditEventKind::PaymentOnTime => 5,
            CreditEventKind::PaymentEarlyPayoff => 50,
            CreditEventKind::PaymentMissed => -25,
            CreditEventKind::AssetSeized => -100,
            CreditEventKind::LandSeized => -75,
            CreditEventKind::LoanTaken => 0,
            CreditEventKind::DealPaidOff => 10,
            CreditEventKind::ExternalPaymentOnTime => 5,
            CreditEventKind::ExternalPaymentLate => -10,
            CreditEventKind::ExternalPaymentMissed => -25,
            CreditEventKind::ExternalPayoff => 10,
        }
    }
}

/// A single append-only entry in a farm's credit history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditEvent {
    pub when: GameTime,
    pub kind: CreditEventKind,
    pub magnitude: i32,
    pub note: String,
}

/// Rolling payment statistics, maintained alongside the event log for
/// quick inspection without replaying the whole history.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentStats {
    pub total_payments: u32,
    pub on_time: u32,
    pub late: u32,
    pub missed: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
}

/// The FICO-like rating tier derived from [`CreditAccount::score`]
/// (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rating {
    VeryPoor,
    Poor,
    Fair,
    Good,
    Excellent,
}

pub fn rating_for_score(score: i32) -> Rating {
    if score >= 750 {
        Rating::Excellent
    } else if score >= 700 {
        Rating::Good
    } else if score >= 650 {
        Rating::Fair
    } else if score >= 600 {
        Rating::Poor
    } else {
        Rating::VeryPoor
    }
}

/// Per-farm credit account: an append-only event log plus derived score and
/// rolling stats (spec.md §3 "CreditAccount").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditAccount {
    pub farm_id: FarmId,
    pub events: Vec<CreditEvent>,
    pub stats: PaymentStats,
}

impl CreditAccount {
    pub fn new(farm_id: FarmId) -> Self {
        CreditAccount { farm_id, events: Vec::new(), stats: PaymentStats::default() }
    }

    /// `score(farm) -> int`: recomputed purely from the event log plus the
    /// starting baseline (spec.md §4.2, invariant in §3).
    pub fn score(&self) -> i32 {
        let total: i32 = self.events.iter().map(|e| e.magnitude).sum();
        (BASELINE_SCORE + total).clamp(MIN_SCORE, MAX_SCORE)
    }

    pub fn rating(&self) -> Rating {
        rating_for_score(self.score())
    }

    /// `interestAdjustmentPct(farm) -> f32 in [-1.5, +3.0]`, piecewise on
    /// rating (spec.md §4.2). Breakpoints are an Open Question resolution —
    /// see DESIGN.md §11.5.
    pub fn interest_adjustment_pct(&self) -> f32 {
        match self.rating() {
            Rating::Excellent => -1.5,
            Rating::Good => -0.5,
            Rating::Fair => 0.0,
            Rating::Poor => 1.5,
            Rating::VeryPoor => 3.0,
        }
    }

    fn push_event(&mut self, when: GameTime, kind: CreditEventKind, note: impl Into<String>) {
        self.events.push(CreditEvent { when, kind, magnitude: kind.delta(), note: note.into() });
        match kind {
            CreditEventKind::PaymentOnTime | CreditEventKind::ExternalPaymentOnTime => {
                self.stats.total_payments += 1;
                self.stats.on_time += 1;
                self.stats.current_streak += 1;
                self.stats.longest_streak = self.stats.longest_streak.max(self.stats.current_streak);
            }
            CreditEventKind::PaymentMissed | CreditEventKind::ExternalPaymentMissed => {
                self.stats.total_payments += 1;
                self.stats.missed += 1;
                self.stats.current_streak = 0;
            }
            CreditEventKind::ExternalPaymentLate => {
                self.stats.total_payments += 1;
                self.stats.late += 1;
                self.stats.current_streak = 0;
            }
            _ => {}
        }
    }

    /// `recordEvent(farm, kind, when)` (spec.md §4.2).
    pub fn record_event(&mut self, when: GameTime, kind: CreditEventKind, note: impl Into<String>) {
        self.push_event(when, kind, note);
    }
}

/// Financing kind used by [`CreditBureau::can_finance`] to pick the
/// eligibility gate table (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinanceKind {
    Vehicle,
    Land,
    CashLoan,
    RepairFinance,
}

/// Result of an eligibility check (spec.md §4.2 "Emits `{allowed,
/// minScoreRequired}`").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub allowed: bool,
    pub min_score_required: u16,
}

fn min_score_for(rating: Rating) -> u16 {
    match rating {
        Rating::Excellent => 750,
        Rating::Good => 700,
        Rating::Fair => 650,
        Rating::Poor => 600,
        Rating::VeryPoor => MIN_SCORE as u16,
    }
}

/// Tracking state for a deal registered by an external (third-party mod)
/// integration via [`CreditBureau::register_external`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalDealRecord {
    pub mod_name: String,
    pub deal_id: String,
    pub farm_id: FarmId,
    pub principal: Money,
    pub closed: bool,
}

/// The Credit Bureau component: owns every farm's [`CreditAccount`] plus the
/// external-deal registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreditBureau {
    accounts: BTreeMap<FarmId, CreditAccount>,
    externals: BTreeMap<ExternalId, ExternalDealRecord>,
    next_external_id: u64,
}

impl CreditBureau {
    pub fn new() -> Self {
        CreditBureau::default()
    }

    fn account_mut(&mut self, farm_id: FarmId) -> &mut CreditAccount {
        self.accounts.entry(farm_id).or_insert_with(|| CreditAccount::new(farm_id))
    }

    pub fn account(&self, farm_id: FarmId) -> Option<&CreditAccount> {
        self.accounts.get(&farm_id)
    }

    /// `score(farm) -> int`. Unknown farms read as the default 650 baseline
    /// without needing to be pre-registered.
    pub fn score(&self, farm_id: FarmId) -> i32 {
        self.accounts.get(&farm_id).map(|a| a.score()).unwrap_or(BASELINE_SCORE)
    }

    pub fn rating(&self, farm_id: FarmId) -> Rating {
        rating_for_score(self.score(farm_id))
    }

    pub fn interest_adjustment_pct(&self, farm_id: FarmId) -> f32 {
        self.accounts.get(&farm_id).map(|a| a.interest_adjustment_pct()).unwrap_or(0.0)
    }

    /// `recordEvent(farm, kind, when)` (spec.md §4.2).
    pub fn record_event(
        &mut self,
        farm_id: FarmId,
        when: GameTime,
        kind: CreditEventKind,
        note: impl Into<String>,
    ) {
        self.account_mut(farm_id).record_event(when, kind, note);
    }

    /// `canFinance(farm, kind, requestedTermMonths) -> Result` (spec.md
    /// §4.2). Gates by term length and rating per the documented table.
    pub fn can_finance(
        &self,
        farm_id: FarmId,
        kind: FinanceKind,
        requested_term_months: u32,
    ) -> EligibilityResult {
        let rating = self.rating(farm_id);
        let required = match kind {
            FinanceKind::Vehicle => {
                if requested_term_months <= 60 {
                    Rating::VeryPoor
                } else if requested_term_months <= 120 {
                    Rating::Fair
                } else {
                    Rating::Good
                }
            }
            FinanceKind::Land => {
                if requested_term_months <= 120 {
                    Rating::VeryPoor
                } else if requested_term_months <= 240 {
                    Rating::Good
                } else {
                    Rating::Excellent
                }
            }
            FinanceKind::CashLoan | FinanceKind::RepairFinance => Rating::Poor,
        };
        EligibilityResult { allowed: rating >= required, min_score_required: min_score_for(required) }
    }

    /// `registerExternal(modName, dealId, farm, dealData) -> ExtId`
    /// (spec.md §4.2).
    pub fn register_external(
        &mut self,
        mod_name: impl Into<String>,
        deal_id: impl Into<String>,
        farm_id: FarmId,
        principal: Money,
    ) -> CoreResult<ExternalId> {
        if !self.accounts.contains_key(&farm_id) {
            self.account_mut(farm_id);
        }
        let ext_id = format!("ext-{}", self.next_external_id);
        if self.externals.contains_key(&ext_id) {
            return Err(CoreError::Conflict(format!("duplicate external id {ext_id}")));
        }
        self.next_external_id += 1;
        self.externals.insert(
            ext_id.clone(),
            ExternalDealRecord {
                mod_name: mod_name.into(),
                deal_id: deal_id.into(),
                farm_id,
                principal,
                closed: false,
            },
        );
        self.record_event(farm_id, 0, CreditEventKind::LoanTaken, "external deal registered");
        Ok(ext_id)
    }

    /// `reportExternalPayment(ExtId, amount)` (spec.md §4.2).
    pub fn report_external_payment(&mut self, ext_id: &ExternalId, when: GameTime) -> CoreResult<()> {
        let farm_id = self.external_farm(ext_id)?;
        self.record_event(farm_id, when, CreditEventKind::ExternalPaymentOnTime, "external payment");
        Ok(())
    }

    /// `reportExternalDefault(ExtId, isLate)` (spec.md §4.2: late -10,
    /// missed -25).
    pub fn report_external_default(
        &mut self,
        ext_id: &ExternalId,
        when: GameTime,
        is_late: bool,
    ) -> CoreResult<()> {
        let farm_id = self.external_farm(ext_id)?;
        let kind = if is_late {
            CreditEventKind::ExternalPaymentLate
        } else {
            CreditEventKind::ExternalPaymentMissed
        };
        self.record_event(farm_id, when, kind, "external default");
        Ok(())
    }

    /// `closeExternal(ExtId, reason)` (spec.md §4.2).
    pub fn close_external(&mut self, ext_id: &ExternalId, when: GameTime, paid_off: bool) -> CoreResult<()> {
        let farm_id = self.external_farm(ext_id)?;
        let record = self.externals.get_mut(ext_id).ok_or_else(|| CoreError::NotFound(ext_id.clone()))?;
        record.closed = true;
        if paid_off {
            self.record_event(farm_id, when, CreditEventKind::ExternalPayoff, "external payoff");
        }
        Ok(())
    }

    fn external_farm(&self, ext_id: &ExternalId) -> CoreResult<FarmId> {
        self.externals.get(ext_id).map(|r| r.farm_id).ok_or_else(|| CoreError::NotFound(ext_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_score_is_baseline() {
        let bureau = CreditBureau::new();
        assert_eq!(bureau.score(1), 650);
        assert_eq!(bureau.rating(1), Rating::Fair);
    }

    #[test]
    fn score_clamps_to_bounds() {
        let mut bureau = CreditBureau::new();
        for _ in 0..50 {
            bureau.record_event(1, 0, CreditEventKind::AssetSeized, "seized");
        }
        assert_eq!(bureau.score(1), MIN_SCORE);

        let mut bureau2 = CreditBureau::new();
        for _ in 0..50 {
            bureau2.record_event(2, 0, CreditEventKind::PaymentEarlyPayoff, "payoff");
        }
        assert_eq!(bureau2.score(2), MAX_SCORE);
    }

    #[test]
    fn rating_monotonic_with_score() {
        let scores = [300, 599, 600, 649, 650, 699, 700, 749, 750, 850];
        let mut last = Rating::VeryPoor;
        for s in scores {
            let r = rating_for_score(s);
            assert!(r >= last, "rating regressed at score {s}");
            last = r;
        }
    }

    #[test]
    fn can_finance_gates_vehicle_terms() {
        let bureau = CreditBureau::new(); // Fair rating (650 default)
        assert!(bureau.can_finance(1, FinanceKind::Vehicle, 60).allowed);
        assert!(bureau.can_finance(1, FinanceKind::Vehicle, 120).allowed); // Fair qualifies for 6-10y
        assert!(!bureau.can_finance(1, FinanceKind::Vehicle, 180).allowed); // needs Good for 11-15y
    }

    #[test]
    fn can_finance_gates_land_terms() {
        let mut bureau = CreditBureau::new();
        for _ in 0..20 {
            bureau.record_event(1, 0, CreditEventKind::PaymentOnTime, "ontime");
        }
        assert_eq!(bureau.rating(1), Rating::Excellent);
        assert!(bureau.can_finance(1, FinanceKind::Land, 360).allowed);
    }

    #[test]
    fn external_deal_lifecycle() {
        let mut bureau = CreditBureau::new();
        let ext_id = bureau.register_external("OtherMod", "deal-1", 1, Money::from_major(1000)).unwrap();
        bureau.report_external_payment(&ext_id, 100).unwrap();
        assert_eq!(bureau.score(1), 650 + 5);

        bureau.report_external_default(&ext_id, 200, true).unwrap();
        assert_eq!(bureau.score(1), 650 + 5 - 10);

        bureau.close_external(&ext_id, 300, true).unwrap();
        assert_eq!(bureau.score(1), 650 + 5 - 10 + 10);
    }

    #[test]
    fn duplicate_external_registration_is_allowed_distinct_ids() {
        let mut bureau = CreditBureau::new();
        let a = bureau.register_external("ModA", "d1", 1, Money::ZERO).unwrap();
        let b = bureau.register_external("ModA", "d1", 1, Money::ZERO).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn unknown_external_id_not_found() {
        let mut bureau = CreditBureau::new();
        let err = bureau.report_external_payment(&"ext-999".to_string(), 0).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}
