//! Finance Ledger (spec.md §4.5, C5): deal lifecycle, monthly amortization,
//! configurable payment modes, prepayment, early termination, lease equity
//! rollover, and repossession.
//!
//! Grounded on the teacher's `loan.rs` `Loan::make_payment` (fixed
//! payment-per-step against a shrinking balance) generalized to spec.md's
//! richer per-mode amortization, and `contract.rs`'s lifecycle-by-id-map
//! structure for holding many concurrent obligations.

use crate::credit::{CreditBureau, CreditEventKind};
use crate::deal::{next_deal_id, CollateralItem, Deal, DealKind, DealStatus, LeaseTerms, PaymentMode};
use crate::error::{CoreError, CoreResult};
use crate::ids::{DealId, FarmId, GameTime, Money};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of a lease reaching term end (spec.md §4.5 "Lease renewal").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseDisposition {
    Return,
    Buyout,
    Renew,
}

/// The Finance Ledger component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinanceLedger {
    deals: BTreeMap<DealId, Deal>,
    next_counter: BTreeMap<FarmId, u64>,
}

impl FinanceLedger {
    pub fn new() -> Self {
        FinanceLedger::default()
    }

    fn allocate_id(&mut self, kind: DealKind, farm_id: FarmId) -> DealId {
        let counter = self.next_counter.entry(farm_id).or_insert(0);
        let id = next_deal_id(kind, farm_id, *counter);
        *counter += 1;
        id
    }

    pub fn deal(&self, id: &str) -> CoreResult<&Deal> {
        self.deals.get(id).ok_or_else(|| CoreError::NotFound(format!("deal {id}")))
    }

    pub fn deals_for_farm(&self, farm_id: FarmId) -> Vec<&Deal> {
        self.deals.values().filter(|d| d.farm_id == farm_id).collect()
    }

    /// All deals across every farm, in id-sorted order. Used by reporting
    /// and persistence sinks that need the full ledger rather than one
    /// farm's slice.
    pub fn all_deals(&self) -> impl Iterator<Item = &Deal> {
        self.deals.values()
    }

    /// Opens a new deal, returning its allocated id.
    #[allow(clippy::too_many_arguments)]
    pub fn open_deal(
        &mut self,
        kind: DealKind,
        farm_id: FarmId,
        created_at: GameTime,
        principal: Money,
        interest_rate_pct: f64,
        term_months: u32,
        monthly_payment: Money,
        item_name: impl Into<String>,
        lease: Option<LeaseTerms>,
        collateral: Vec<CollateralItem>,
    ) -> DealId {
        let id = self.allocate_id(kind, farm_id);
        let mut deal = Deal::new(
            id.clone(),
            kind,
            farm_id,
            created_at,
            principal,
            interest_rate_pct,
            term_months,
            monthly_payment,
            item_name,
            lease,
        );
        deal.collateral = collateral;
        self.deals.insert(id.clone(), deal);
        info!("opened deal {id} for farm {farm_id}");
        id
    }

    pub fn set_payment_config(
        &mut self,
        id: &str,
        mode: PaymentMode,
        custom_amount: Option<Money>,
        multiplier: f64,
    ) -> CoreResult<()> {
        let multiplier = multiplier.clamp(1.0, 3.0);
        let deal = self.deals.get_mut(id).ok_or_else(|| CoreError::NotFound(format!("deal {id}")))?;
        if !deal.is_active() {
            return Err(CoreError::InvalidState(format!("deal {id} is not active")));
        }
        deal.payment_mode = mode;
        deal.custom_payment_amount = custom_amount;
        deal.payment_multiplier = multiplier;
        Ok(())
    }

    /// Processes one month of amortization for every active deal, in
    /// stable deal-id-sorted order (spec.md §5 "ordering guarantees";
    /// `BTreeMap` iteration is already id-sorted). Never raises — any
    /// precondition violation aborts that deal's month unchanged and logs a
    /// warning (spec.md §7).
    pub fn month_tick(&mut self, now: GameTime, credit: &mut CreditBureau) {
        let ids: Vec<DealId> = self.deals.keys().cloned().collect();
        for id in ids {
            self.amortize_one(&id, now, credit);
        }
    }

    fn amortize_one(&mut self, id: &str, now: GameTime, credit: &mut CreditBureau) {
        let deal = match self.deals.get_mut(id) {
            Some(d) => d,
            None => {
                warn!("month_tick: deal {id} vanished mid-tick");
                return;
            }
        };
        if !deal.is_active() {
            return;
        }

        let interest = Money::from_f64_major(
            deal.current_balance.as_f64_major() * deal.interest_rate_pct / 12.0 / 100.0,
        );

        match deal.payment_mode {
            PaymentMode::Skip => {
                deal.current_balance += interest;
                deal.missed_payments += 1;
                deal.consecutive_missed_payments += 1;
                let cap = deal.negative_amortization_cap();
                if deal.current_balance > cap {
                    deal.current_balance = cap;
                }
                credit.record_event(deal.farm_id, now, CreditEventKind::PaymentMissed, id);
                debug!("deal {id} skipped payment, balance now {}", deal.current_balance);
            }
            PaymentMode::Minimum => {
                deal.current_balance = deal.current_balance.saturating_sub(Money::ZERO); // no principal reduction
                deal.total_interest_paid += interest;
                deal.consecutive_missed_payments = 0;
                credit.record_event(deal.farm_id, now, CreditEventKind::PaymentOnTime, id);
            }
            PaymentMode::Standard | PaymentMode::Extra | PaymentMode::Custom => {
                let payment = match deal.payment_mode {
                    PaymentMode::Custom => deal.custom_payment_amount.unwrap_or(deal.monthly_payment),
                    _ => deal.monthly_payment.checked_mul_pct(deal.payment_multiplier),
                };
                let principal_paid = payment.saturating_sub(interest);
                if payment.0 >= interest.0 {
                    deal.current_balance = deal.current_balance.saturating_sub(principal_paid);
                } else {
                    let shortfall = interest.saturating_sub(payment);
                    deal.current_balance += shortfall;
                }
                deal.total_interest_paid += interest;
                deal.months_paid += 1;
                deal.consecutive_missed_payments = 0;
                credit.record_event(deal.farm_id, now, CreditEventKind::PaymentOnTime, id);
            }
        }

        if deal.current_balance <= Money::ZERO && !matches!(deal.payment_mode, PaymentMode::Skip) {
            deal.status = DealStatus::Completed;
            deal.current_balance = Money::ZERO;
            credit.record_event(deal.farm_id, now, CreditEventKind::DealPaidOff, id);
            info!("deal {id} paid off");
            return;
        }

        // Repossession: 3 consecutive missed payments (spec.md §4.5).
        if deal.consecutive_missed_payments >= 3 {
            self.repossess(id, now, credit);
        }
    }

    /// Applies a manual, player-initiated payment of exactly `amount`
    /// against the deal's outstanding balance (spec.md §6 "FinancePayment"
    /// / "VanillaLoanPayment"), independent of the deal's configured
    /// `paymentMode`/`monthlyPayment`. Splits off this month's interest the
    /// same way `amortize_one` does; a payment smaller than the accrued
    /// interest still grows the balance by the shortfall rather than
    /// silently doing nothing.
    pub fn apply_payment(&mut self, id: &str, amount: Money, now: GameTime, credit: &mut CreditBureau) -> CoreResult<()> {
        let deal = self.deals.get_mut(id).ok_or_else(|| CoreError::NotFound(format!("deal {id}")))?;
        if !deal.is_active() {
            return Err(CoreError::InvalidState(format!("deal {id} is not active")));
        }
        let interest = Money::from_f64_major(
            deal.current_balance.as_f64_major() * deal.interest_rate_pct / 12.0 / 100.0,
        );
        if amount >= interest {
            let principal_paid = amount.saturating_sub(interest);
            deal.current_balance = deal.current_balance.saturating_sub(principal_paid);
        } else {
            let shortfall = interest.saturating_sub(amount);
            deal.current_balance += shortfall;
        }
        deal.total_interest_paid += interest;
        deal.months_paid += 1;
        deal.consecutive_missed_payments = 0;

        if deal.current_balance <= Money::ZERO {
            deal.status = DealStatus::Completed;
            deal.current_balance = Money::ZERO;
            credit.record_event(deal.farm_id, now, CreditEventKind::DealPaidOff, id);
            info!("deal {id} paid off via manual payment");
        } else {
            credit.record_event(deal.farm_id, now, CreditEventKind::PaymentOnTime, id);
        }
        Ok(())
    }

    fn repossess(&mut self, id: &str, now: GameTime, credit: &mut CreditBureau) {
        let deal = match self.deals.get_mut(id) {
            Some(d) => d,
            None => return,
        };
        deal.status = DealStatus::Defaulted;
        let farm_id = deal.farm_id;
        let is_land = matches!(deal.kind, DealKind::LandLease | DealKind::LandFinance);
        warn!("deal {id} defaulted after 3 consecutive missed payments");
        if is_land {
            credit.record_event(farm_id, now, CreditEventKind::LandSeized, id);
        } else if !deal.collateral.is_empty() {
            credit.record_event(farm_id, now, CreditEventKind::AssetSeized, id);
        }
    }

    /// Prepayment penalty for vehicle/land finance (spec.md §4.5):
    /// `penalty = remainingBalance * 0.02 * max(0, remainingMonths/termMonths - 0.5)`.
    /// Leases have no prepayment penalty.
    pub fn prepayment_penalty(&self, id: &str) -> CoreResult<Money> {
        let deal = self.deal(id)?;
        if deal.kind.is_lease() {
            return Ok(Money::ZERO);
        }
        let remaining_months = deal.term_months.saturating_sub(deal.months_paid) as f64;
        let fraction = (remaining_months / deal.term_months.max(1) as f64 - 0.5).max(0.0);
        Ok(deal.current_balance.checked_mul_pct(0.02 * fraction))
    }

    /// Pays off the remaining balance plus any prepayment penalty
    /// (spec.md §4.5 "Prepayment penalty").
    pub fn prepay(&mut self, id: &str, now: GameTime, credit: &mut CreditBureau) -> CoreResult<Money> {
        let penalty = self.prepayment_penalty(id)?;
        let deal = self.deals.get_mut(id).ok_or_else(|| CoreError::NotFound(format!("deal {id}")))?;
        if !deal.is_active() {
            return Err(CoreError::InvalidState(format!("deal {id} is not active")));
        }
        let total_due = deal.current_balance + penalty;
        deal.status = DealStatus::Completed;
        deal.current_balance = Money::ZERO;
        credit.record_event(deal.farm_id, now, CreditEventKind::PaymentEarlyPayoff, id);
        Ok(total_due)
    }

    /// Early lease termination: damage penalty `basePrice*damage*0.5` plus
    /// `residualValue*0.05` fee (spec.md §4.5).
    pub fn terminate_lease(
        &mut self,
        id: &str,
        now: GameTime,
        base_price: Money,
        damage: f64,
        credit: &mut CreditBureau,
    ) -> CoreResult<Money> {
        let deal = self.deals.get_mut(id).ok_or_else(|| CoreError::NotFound(format!("deal {id}")))?;
        if !deal.is_active() || !deal.kind.is_lease() {
            return Err(CoreError::InvalidState(format!("deal {id} is not an active lease")));
        }
        let lease = deal.lease.as_ref().ok_or_else(|| CoreError::InvalidState("missing lease terms".into()))?;
        let damage_penalty = base_price.checked_mul_pct(damage * 0.5);
        let fee = lease.residual_value.checked_mul_pct(0.05);
        deal.status = DealStatus::Terminated;
        credit.record_event(deal.farm_id, now, CreditEventKind::DealPaidOff, id);
        Ok(damage_penalty + fee)
    }

    /// Lease end-of-term disposition (spec.md §4.5 "Lease renewal").
    /// Returns the net cash flow: positive means the farm owes money,
    /// negative means the farm receives a refund.
    pub fn resolve_lease(
        &mut self,
        id: &str,
        disposition: LeaseDisposition,
        damage: f64,
        base_price: Money,
    ) -> CoreResult<Money> {
        let deal = self.deals.get_mut(id).ok_or_else(|| CoreError::NotFound(format!("deal {id}")))?;
        if !deal.kind.is_lease() {
            return Err(CoreError::InvalidState(format!("deal {id} is not a lease")));
        }
        let lease = deal.lease.clone().ok_or_else(|| CoreError::InvalidState("missing lease terms".into()))?;

        match disposition {
            LeaseDisposition::Return => {
                deal.status = DealStatus::Completed;
                let damage_penalty = base_price.checked_mul_pct(damage * 0.5);
                Ok(damage_penalty.saturating_sub(lease.security_deposit))
            }
            LeaseDisposition::Buyout => {
                deal.status = DealStatus::Completed;
                let buyout_price = lease.residual_value.saturating_sub(lease.accumulated_equity);
                Ok(buyout_price.saturating_sub(lease.security_deposit))
            }
            LeaseDisposition::Renew => {
                deal.months_paid = 0;
                let equity_rollover = deal.monthly_payment.checked_mul_pct(0.10 * deal.term_months as f64);
                let new_lease = LeaseTerms {
                    residual_value: lease.residual_value.checked_mul_pct(0.85),
                    security_deposit: lease.security_deposit,
                    accumulated_equity: lease.accumulated_equity + equity_rollover,
                };
                deal.lease = Some(new_lease);
                Ok(Money::ZERO)
            }
        }
    }

    pub fn terminate(&mut self, id: &str) -> CoreResult<()> {
        let deal = self.deals.get_mut(id).ok_or_else(|| CoreError::NotFound(format!("deal {id}")))?;
        deal.status = DealStatus::Terminated;
        Ok(())
    }
}
