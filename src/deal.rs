//! The polymorphic `Deal` type (spec.md §3 "Deal", §9 "Polymorphic deals").
//!
//! Grounded on the teacher's `Loan`/`LendingOffer` structs (`loan.rs`,
//! `lending_marketplace.rs`): a flat struct holding shared fields plus an
//! enum discriminant, rather than a class hierarchy. Per spec.md §9
//! ("model as a tagged sum type with a common header and variant-specific
//! payload"), `Deal` carries one shared header and a `DealKind` enum for the
//! fields that only some variants need (lease residual/deposit/equity,
//! collateral).

use crate::credit::FinanceKind;
use crate::ids::{DealId, FarmId, GameTime, Money, VehicleId};
use serde::{Deserialize, Serialize};

/// Which of the seven deal kinds this is (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DealKind {
    VehicleFinance,
    VehicleLease,
    LandFinance,
    LandLease,
    CashLoan,
    RepairFinance,
    ExternalDeal,
}

impl DealKind {
    pub fn id_prefix(self) -> &'static str {
        match self {
            DealKind::VehicleFinance => "vf",
            DealKind::VehicleLease => "vl",
            DealKind::LandFinance => "lf",
            DealKind::LandLease => "ll",
            DealKind::CashLoan => "cl",
            DealKind::RepairFinance => "rf",
            DealKind::ExternalDeal => "ed",
        }
    }

    pub fn is_lease(self) -> bool {
        matches!(self, DealKind::VehicleLease | DealKind::LandLease)
    }

    pub fn credit_finance_kind(self) -> FinanceKind {
        match self {
            DealKind::VehicleFinance | DealKind::VehicleLease => FinanceKind::Vehicle,
            DealKind::LandFinance | DealKind::LandLease => FinanceKind::Land,
            DealKind::CashLoan => FinanceKind::CashLoan,
            DealKind::RepairFinance => FinanceKind::RepairFinance,
            DealKind::ExternalDeal => FinanceKind::CashLoan,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DealStatus {
    Active,
    Completed,
    Terminated,
    Defaulted,
}

/// Monthly payment mode (spec.md §3 / §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMode {
    Skip,
    Minimum,
    Standard,
    Extra,
    Custom,
}

/// An item pledged as collateral (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollateralItem {
    pub vehicle_id: Option<VehicleId>,
    pub description: String,
    pub value: Money,
}

/// Fields that exist only for lease-kind deals (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseTerms {
    pub residual_value: Money,
    pub security_deposit: Money,
    pub accumulated_equity: Money,
}

/// A single financial obligation tracked by the ledger (spec.md §3 "Deal").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    pub kind: DealKind,
    pub farm_id: FarmId,
    pub created_at: GameTime,
    pub status: DealStatus,
    pub original_amount: Money,
    pub current_balance: Money,
    pub interest_rate_pct: f64,
    pub term_months: u32,
    pub months_paid: u32,
    pub monthly_payment: Money,
    pub payment_mode: PaymentMode,
    pub custom_payment_amount: Option<Money>,
    pub payment_multiplier: f64,
    pub missed_payments: u32,
    pub consecutive_missed_payments: u32,
    pub total_interest_paid: Money,
    pub collateral: Vec<CollateralItem>,
    pub item_name: String,
    pub lease: Option<LeaseTerms>,
}

impl Deal {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: DealId,
        kind: DealKind,
        farm_id: FarmId,
        created_at: GameTime,
        original_amount: Money,
        interest_rate_pct: f64,
        term_months: u32,
        monthly_payment: Money,
        item_name: impl Into<String>,
        lease: Option<LeaseTerms>,
    ) -> Self {
        Deal {
            id,
            kind,
            farm_id,
            created_at,
            status: DealStatus::Active,
            original_amount,
            current_balance: original_amount,
            interest_rate_pct,
            term_months: term_months.clamp(1, 360),
            months_paid: 0,
            monthly_payment,
            payment_mode: PaymentMode::Standard,
            custom_payment_amount: None,
            payment_multiplier: 1.0,
            missed_payments: 0,
            consecutive_missed_payments: 0,
            total_interest_paid: Money::ZERO,
            collateral: Vec::new(),
            item_name: item_name.into(),
            lease,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == DealStatus::Active
    }

    /// Negative-amortization bound (spec.md §3 invariant / §8 testable
    /// property): `currentBalance <= max(2*originalAmount, 1.5*collateralValue)`.
    pub fn negative_amortization_cap(&self) -> Money {
        let collateral_value: Money =
            self.collateral.iter().fold(Money::ZERO, |acc, c| acc + c.value);
        let from_collateral = collateral_value.checked_mul_pct(1.5);
        let from_original = self.original_amount + self.original_amount;
        from_original.max(from_collateral)
    }
}

/// Allocates the next stable deal id, `{prefix}-{farmId}-{counter:04}`
/// (spec.md §11.4 supplement — deterministic id generation so replay stays
/// byte-identical).
pub fn next_deal_id(kind: DealKind, farm_id: FarmId, counter: u64) -> DealId {
    format!("{}-{}-{:04}", kind.id_prefix(), farm_id, counter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_generation_is_deterministic_and_prefixed() {
        let id = next_deal_id(DealKind::VehicleFinance, 7, 42);
        assert_eq!(id, "vf-7-0042");
    }

    #[test]
    fn term_months_clamped_to_bounds() {
        let deal = Deal::new(
            "x".into(),
            DealKind::CashLoan,
            1,
            0,
            Money::from_major(1000),
            5.0,
            0,
            Money::from_major(100),
            "loan",
            None,
        );
        assert_eq!(deal.term_months, 1);

        let deal2 = Deal::new(
            "y".into(),
            DealKind::CashLoan,
            1,
            0,
            Money::from_major(1000),
            5.0,
            1000,
            Money::from_major(100),
            "loan",
            None,
        );
        assert_eq!(deal2.term_months, 360);
    }

    #[test]
    fn negative_amortization_cap_uses_collateral_when_larger() {
        let mut deal = Deal::new(
            "z".into(),
            DealKind::RepairFinance,
            1,
            0,
            Money::from_major(1000),
            5.0,
            12,
            Money::from_major(100),
            "repair",
            None,
        );
        deal.collateral.push(CollateralItem {
            vehicle_id: Some(1),
            description: "tractor".into(),
            value: Money::from_major(10_000),
        });
        // 1.5 * 10000 = 15000 > 2 * 1000 = 2000
        assert_eq!(deal.negative_amortization_cap(), Money::from_major(15_000));
    }
}
