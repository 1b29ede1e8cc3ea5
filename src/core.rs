//! The `Core` aggregate (spec.md §9 design note: "one explicit aggregate,
//! not a set of global managers"): owns every component record and is the
//! sole entry point a host calls into.
//!
//! Grounded on the teacher's `engine.rs` `SimulationEngine` — a single
//! struct owning every subsystem and driving them from one `step`/tick
//! method — generalized here into `frame_tick`/`month_tick` plus the
//! request-dispatch entry point spec.md §6 requires.

use crate::config::CoreConfig;
use crate::credit::{CreditBureau, CreditEventKind, FinanceKind};
use crate::deal::{CollateralItem, DealKind, LeaseTerms, PaymentMode};
use crate::error::{CoreError, CoreResult};
use crate::event_bus::{CoreEvent, CoreEventBus};
use crate::host::HostGameApi;
use crate::ids::{DealId, FarmId, GameTime, ListingId, Money, SearchId, VehicleId};
use crate::ledger::FinanceLedger;
use crate::listing::Listing;
use crate::negotiation::{self, Negotiation, NegotiationStatus};
use crate::reliability::VehicleReliabilityRecord;
use crate::request::{Request, RequestKind};
use crate::response::{MessageKey, TransactionResponse};
use crate::sale_listing::{SaleListing, SaleListingStatus};
use crate::search::{AgentTier, SearchRequest, SearchStatus};
use crate::search;
use crate::service::{self, FieldRepairOutcome, ServiceDiscoveryState, ServiceTruck};
use crate::wire;
use log::{info, warn};
use std::collections::BTreeMap;

const MAX_COLLATERAL: usize = crate::request::MAX_COLLATERAL_ITEMS;
const NEGOTIATION_LOCK_MS: GameTime = 4 * 60 * 60 * 1000;
const DAY_MS: GameTime = 24 * 60 * 60 * 1000;

/// Numeric caps on wire-supplied amounts (spec.md §4.7 "Numeric sanity":
/// "amounts bounded by documented caps").
const MAX_PRICE: Money = Money(100_000_000_00);
const MAX_LOAN_AMOUNT: Money = Money(50_000_000_00);
const MAX_TERM_MONTHS: u32 = 30 * 12;

/// Validates the numeric fields a request carries directly over the wire
/// against spec.md §4.7's documented caps, before any business-rule check
/// runs. `Money` is an integer minor unit ([`crate::ids::Money`]) so it can
/// never itself carry NaN/infinity; the `f64` fields that can (payment
/// multiplier) are checked here too.
fn validate_request_bounds(kind: &RequestKind) -> CoreResult<()> {
    fn check_price(label: &str, price: Money) -> CoreResult<()> {
        if price.0 < 0 || price > MAX_PRICE {
            return Err(CoreError::InvalidParameter(format!("{label} exceeds ${}M cap", MAX_PRICE.0 / 100_000_000)));
        }
        Ok(())
    }
    fn check_term(term_months: u32) -> CoreResult<()> {
        if term_months < 1 || term_months > MAX_TERM_MONTHS {
            return Err(CoreError::InvalidParameter(format!(
                "term_months {term_months} outside [1,{MAX_TERM_MONTHS}]"
            )));
        }
        Ok(())
    }
    fn check_loan_amount(amount: Money) -> CoreResult<()> {
        if amount.0 < 0 || amount > MAX_LOAN_AMOUNT {
            return Err(CoreError::InvalidParameter("loan amount exceeds $50M cap".into()));
        }
        Ok(())
    }
    fn check_f64(label: &str, v: f64) -> CoreResult<()> {
        if Money::is_nan_or_infinite(v) {
            return Err(CoreError::InvalidParameter(format!("{label} is NaN or infinite")));
        }
        Ok(())
    }

    match kind {
        RequestKind::FinanceVehicle { price, term_months, down_payment, .. } => {
            check_price("price", *price)?;
            check_price("down_payment", *down_payment)?;
            check_term(*term_months)
        }
        RequestKind::TakeLoan { amount, term_months, .. } => {
            check_loan_amount(*amount)?;
            check_term(*term_months)
        }
        RequestKind::LeaseVehicle { price, term_months, security_deposit, .. } => {
            check_price("price", *price)?;
            check_price("security_deposit", *security_deposit)?;
            check_term(*term_months)
        }
        RequestKind::PurchaseLandCash { price, .. } => check_price("price", *price),
        RequestKind::LandLease { price, term_months, .. } => {
            check_price("price", *price)?;
            check_term(*term_months)
        }
        RequestKind::RequestUsedItem { base_price, .. } => check_price("base_price", *base_price),
        RequestKind::ModifyListingPrice { new_ask_price, .. } => check_price("new_ask_price", *new_ask_price),
        RequestKind::ServiceTruckPurchase { price } => check_price("price", *price),
        RequestKind::CreateSaleListing { fair_market_value, .. } => check_price("fair_market_value", *fair_market_value),
        RequestKind::SetPaymentConfig { multiplier, .. } => check_f64("multiplier", *multiplier),
        _ => Ok(()),
    }
}

/// The whole of the core's live state (spec.md §9). One instance exists
/// per game save; it is what [`crate::persistence::CoreSnapshot`]
/// serializes and restores.
pub struct Core {
    config: CoreConfig,
    seed: u64,
    last_month_tick: GameTime,
    search_counter: u64,
    listing_counter: u64,
    sale_listing_counter: u64,
    credit: CreditBureau,
    ledger: FinanceLedger,
    reliability: BTreeMap<VehicleId, VehicleReliabilityRecord>,
    searches: BTreeMap<SearchId, SearchRequest>,
    listings: BTreeMap<ListingId, Listing>,
    negotiations: BTreeMap<ListingId, Negotiation>,
    sale_listings: BTreeMap<ListingId, SaleListing>,
    service_trucks: BTreeMap<FarmId, ServiceTruck>,
    service_discovery: BTreeMap<FarmId, ServiceDiscoveryState>,
    events: CoreEventBus,
}

impl Core {
    pub fn new(config: CoreConfig, seed: u64) -> Self {
        Core {
            config,
            seed,
            last_month_tick: 0,
            search_counter: 0,
            listing_counter: 0,
            sale_listing_counter: 0,
            credit: CreditBureau::new(),
            ledger: FinanceLedger::new(),
            reliability: BTreeMap::new(),
            searches: BTreeMap::new(),
            listings: BTreeMap::new(),
            negotiations: BTreeMap::new(),
            sale_listings: BTreeMap::new(),
            service_trucks: BTreeMap::new(),
            service_discovery: BTreeMap::new(),
            events: CoreEventBus::new(),
        }
    }

    pub fn events_mut(&mut self) -> &mut CoreEventBus {
        &mut self.events
    }

    /// `getCreditScore` (spec.md §6 "Public API surface").
    pub fn credit_score(&self, farm_id: FarmId) -> i32 {
        self.credit.score(farm_id)
    }

    /// `getCreditRating` (spec.md §6 "Public API surface").
    pub fn credit_rating(&self, farm_id: FarmId) -> crate::credit::Rating {
        self.credit.rating(farm_id)
    }

    /// `canFinance` read-only query, distinct from issuing the deal itself
    /// (spec.md §6 "Public API surface").
    pub fn can_finance(
        &self,
        farm_id: FarmId,
        kind: crate::credit::FinanceKind,
        term_months: u32,
    ) -> crate::credit::EligibilityResult {
        self.credit.can_finance(farm_id, kind, term_months)
    }

    /// Vehicle DNA and its derived classification (spec.md §6 "Public API
    /// surface": "vehicle DNA and classification"). `None` if the vehicle
    /// has never been observed by the reliability engine.
    pub fn vehicle_dna(&self, vehicle_id: VehicleId) -> Option<(f32, crate::reliability::DnaTier)> {
        self.reliability.get(&vehicle_id).map(|r| (r.dna, r.dna_tier()))
    }

    /// Fluid/reliability/tire info for a vehicle (spec.md §6 "Public API
    /// surface"). `None` if the vehicle has never been observed.
    pub fn vehicle_reliability(&self, vehicle_id: VehicleId) -> Option<&VehicleReliabilityRecord> {
        self.reliability.get(&vehicle_id)
    }

    /// A single deal by id (spec.md §6 "Public API surface": "deal
    /// listings").
    pub fn deal(&self, deal_id: &str) -> CoreResult<&crate::deal::Deal> {
        self.ledger.deal(deal_id)
    }

    /// Every deal belonging to a farm (spec.md §6 "Public API surface":
    /// "deal listings").
    pub fn deals_for_farm(&self, farm_id: FarmId) -> Vec<&crate::deal::Deal> {
        self.ledger.deals_for_farm(farm_id)
    }

    /// Every search retained by a farm, active or completed (spec.md §6
    /// "Public API surface").
    pub fn searches_for_farm(&self, farm_id: FarmId) -> Vec<&SearchRequest> {
        self.searches.values().filter(|s| s.farm_id == farm_id).collect()
    }

    /// A single used-marketplace listing by id.
    pub fn listing(&self, listing_id: &str) -> Option<&Listing> {
        self.listings.get(listing_id)
    }

    /// A single seller-side sale listing by id.
    pub fn sale_listing(&self, listing_id: &str) -> Option<&SaleListing> {
        self.sale_listings.get(listing_id)
    }

    /// Captures every piece of live state into a
    /// [`crate::persistence::CoreSnapshot`] (spec.md §11.2 supplement).
    pub fn to_snapshot(&self) -> crate::persistence::CoreSnapshot {
        crate::persistence::CoreSnapshot {
            seed: self.seed,
            now: self.last_month_tick,
            search_counter: self.search_counter,
            listing_counter: self.listing_counter,
            sale_listing_counter: self.sale_listing_counter,
            credit: self.credit.clone(),
            ledger: self.ledger.clone(),
            reliability: self.reliability.clone(),
            searches: self.searches.clone(),
            listings: self.listings.clone(),
            sale_listings: self.sale_listings.clone(),
            service_trucks: self.service_trucks.clone(),
            service_discovery: self.service_discovery.clone(),
        }
    }

    /// Restores a `Core` from a previously captured snapshot, replaying no
    /// events (the snapshot already reflects the post-replay state).
    pub fn from_snapshot(config: CoreConfig, snapshot: crate::persistence::CoreSnapshot) -> Self {
        Core {
            config,
            seed: snapshot.seed,
            last_month_tick: snapshot.now,
            search_counter: snapshot.search_counter,
            listing_counter: snapshot.listing_counter,
            sale_listing_counter: snapshot.sale_listing_counter,
            credit: snapshot.credit,
            ledger: snapshot.ledger,
            reliability: snapshot.reliability,
            searches: snapshot.searches,
            listings: snapshot.listings,
            negotiations: BTreeMap::new(),
            sale_listings: snapshot.sale_listings,
            service_trucks: snapshot.service_trucks,
            service_discovery: snapshot.service_discovery,
            events: CoreEventBus::new(),
        }
    }

    fn reliability_for(&mut self, vehicle_id: VehicleId) -> &mut VehicleReliabilityRecord {
        self.reliability
            .entry(vehicle_id)
            .or_insert_with(|| VehicleReliabilityRecord::first_observed(vehicle_id, self.seed))
    }

    /// Advances per-second simulation: malfunction rolls, restoration
    /// progress, and sale-listing expiry (spec.md §9 "server frame tick").
    pub fn frame_tick(&mut self, host: &mut impl HostGameApi, dt_secs: f64) {
        let now = host.now();

        for (vehicle_id, record) in self.reliability.iter_mut() {
            let damage = host.vehicle_damage(*vehicle_id);
            let hours = host.vehicle_hours(*vehicle_id);
            let load = host.vehicle_load(*vehicle_id);
            if let Some(kind) =
                record.frame_tick(&self.config.reliability, now, dt_secs, self.seed, damage, hours, load)
            {
                self.events.push(CoreEvent::MalfunctionTriggered { vehicle_id: *vehicle_id, when: now, kind });
            }
        }

        for listing in self.sale_listings.values_mut() {
            if listing.status == SaleListingStatus::Active && listing.pending_offer.is_none() {
                if listing.is_expired(now) {
                    listing.mark_expired();
                } else if listing.roll_daily_sale(self.seed, listing.id.len() as u64 ^ now as u64) {
                    listing.pending_offer = Some(listing.ask_price);
                }
            }
        }

        let due: Vec<SearchId> =
            self.searches.values().filter(|s| s.is_due(now)).map(|s| s.id.clone()).collect();
        for search_id in due {
            self.complete_search(&search_id, now);
        }
    }

    /// Advances monthly amortization across every open deal
    /// (spec.md §9 "game-month tick").
    pub fn month_tick(&mut self, host: &impl HostGameApi) {
        let now = host.now();
        self.ledger.month_tick(now, &mut self.credit);
        self.last_month_tick = now;
    }

    fn complete_search(&mut self, search_id: &str, now: GameTime) {
        let count = {
            let search = match self.searches.get_mut(search_id) {
                Some(s) => s,
                None => return,
            };
            search.status = SearchStatus::Completed;
            search.agent_tier.listing_count_cap()
        };
        let search = self.searches.get(search_id).unwrap().clone();
        let n = 1 + (self.seed.wrapping_add(now as u64) % count as u64) as usize;
        for i in 0..n {
            self.listing_counter += 1;
            let listing_id = format!("listing-{}", self.listing_counter);
            let listing = search::generate_listing(
                &self.config.reliability,
                &search,
                listing_id.clone(),
                self.seed,
                self.listing_counter ^ i as u64,
                now,
            );
            self.listings.insert(listing_id.clone(), listing);
            if let Some(s) = self.searches.get_mut(search_id) {
                s.found_listings.push(listing_id);
            }
        }
    }

    /// Single entry point for every inbound action (spec.md §6). Never
    /// lets a [`CoreError`] escape — any failure becomes a `success: false`
    /// response with the matching `messageKey`.
    pub fn handle_request(&mut self, host: &mut impl HostGameApi, request: Request) -> TransactionResponse {
        let farm_id = request.farm_id;
        match self.dispatch(host, request) {
            Ok(resp) => resp,
            Err(err) => {
                warn!("request from farm {farm_id} failed: {err}");
                TransactionResponse::from_core_error(farm_id, &err)
            }
        }
    }

    fn require_owner(&self, host: &impl HostGameApi, farm_id: FarmId, vehicle_id: VehicleId) -> CoreResult<()> {
        match host.vehicle_owner(vehicle_id) {
            Some(owner) if owner == farm_id => Ok(()),
            Some(_) => Err(CoreError::Unauthorized { farm_id }),
            None => Err(CoreError::NotFound(format!("vehicle {vehicle_id}"))),
        }
    }

    fn dispatch(
        &mut self,
        host: &mut impl HostGameApi,
        request: Request,
    ) -> CoreResult<TransactionResponse> {
        let farm_id = request.farm_id;
        if !host.farm_exists(farm_id) {
            return Err(CoreError::NotFound(format!("farm {farm_id}")));
        }
        if host.connection_farm_id() != Some(farm_id) {
            return Err(CoreError::Unauthorized { farm_id });
        }
        validate_request_bounds(&request.kind)?;
        let now = host.now();

        match request.kind {
            RequestKind::FinanceVehicle { vehicle_id, price, term_months, down_payment, collateral } => {
                wire::check_cap("collateral", collateral.len(), MAX_COLLATERAL)?;
                let eligibility = self.credit.can_finance(farm_id, FinanceKind::Vehicle, term_months);
                if !eligibility.allowed {
                    return Err(CoreError::IneligibleCredit { min_score_required: eligibility.min_score_required });
                }
                let principal = price.saturating_sub(down_payment);
                if principal.0 <= 0 {
                    return Err(CoreError::InvalidParameter("down payment covers full price".into()));
                }
                let adj = self.credit.interest_adjustment_pct(farm_id);
                let rate = (6.5 + adj as f64).max(0.0);
                let monthly = amortized_payment(principal, rate, term_months);
                let deal_id = self.ledger.open_deal(
                    DealKind::VehicleFinance,
                    farm_id,
                    now,
                    principal,
                    rate,
                    term_months,
                    monthly,
                    format!("vehicle-{vehicle_id}"),
                    None,
                    collateral,
                );
                self.credit.record_event(farm_id, now, CreditEventKind::LoanTaken, "vehicle finance opened");
                self.events.push(CoreEvent::DealCreated { farm_id, deal_id: deal_id.clone(), when: now });
                Ok(TransactionResponse::ok(farm_id, MessageKey::DealOpened))
            }

            RequestKind::FinancePayment { deal_id, amount } | RequestKind::VanillaLoanPayment { deal_id, amount } => {
                self.apply_manual_payment(host, farm_id, &deal_id, amount, now)
            }

            RequestKind::TakeLoan { amount, term_months, kind } => {
                let eligibility = self.credit.can_finance(farm_id, FinanceKind::CashLoan, term_months);
                if !eligibility.allowed {
                    return Err(CoreError::IneligibleCredit { min_score_required: eligibility.min_score_required });
                }
                let adj = self.credit.interest_adjustment_pct(farm_id);
                let rate = (9.0 + adj as f64).max(0.0);
                let monthly = amortized_payment(amount, rate, term_months);
                let deal_id = self.ledger.open_deal(
                    kind, farm_id, now, amount, rate, term_months, monthly, "cash loan", None, vec![],
                );
                self.credit.record_event(farm_id, now, CreditEventKind::LoanTaken, "cash loan opened");
                if !host.add_money(farm_id, amount) {
                    return Err(CoreError::NotFound(format!("farm {farm_id}")));
                }
                self.events.push(CoreEvent::DealCreated { farm_id, deal_id, when: now });
                Ok(TransactionResponse::ok(farm_id, MessageKey::DealOpened))
            }

            RequestKind::LeaseVehicle { vehicle_id, price, term_months, security_deposit } => {
                let eligibility = self.credit.can_finance(farm_id, FinanceKind::Vehicle, term_months);
                if !eligibility.allowed {
                    return Err(CoreError::IneligibleCredit { min_score_required: eligibility.min_score_required });
                }
                let residual = price.checked_mul_pct(0.45);
                let financed = price.saturating_sub(residual);
                let adj = self.credit.interest_adjustment_pct(farm_id);
                let rate = (7.0 + adj as f64).max(0.0);
                let monthly = amortized_payment(financed, rate, term_months);
                let lease = LeaseTerms {
                    residual_value: residual,
                    security_deposit,
                    accumulated_equity: Money::ZERO,
                };
                let deal_id = self.ledger.open_deal(
                    DealKind::VehicleLease,
                    farm_id,
                    now,
                    financed,
                    rate,
                    term_months,
                    monthly,
                    format!("vehicle-{vehicle_id}"),
                    Some(lease),
                    vec![],
                );
                self.events.push(CoreEvent::DealCreated { farm_id, deal_id, when: now });
                Ok(TransactionResponse::ok(farm_id, MessageKey::DealOpened))
            }

            RequestKind::LeaseEnd { deal_id } | RequestKind::TerminateLease { deal_id } => {
                let base_price = self.ledger.deal(&deal_id)?.original_amount;
                let refund = self.ledger.terminate_lease(&deal_id, now, base_price, 0.0, &mut self.credit)?;
                host.add_money(farm_id, Money::ZERO - refund);
                self.events.push(CoreEvent::DealCompleted { farm_id, deal_id, when: now });
                Ok(TransactionResponse::ok(farm_id, MessageKey::LeaseReturned))
            }

            RequestKind::LeaseRenewal { deal_id, disposition_buyout } => {
                let base_price = self.ledger.deal(&deal_id)?.original_amount;
                let disposition = if disposition_buyout {
                    crate::ledger::LeaseDisposition::Buyout
                } else {
                    crate::ledger::LeaseDisposition::Renew
                };
                let settlement = self.ledger.resolve_lease(&deal_id, disposition, 0.0, base_price)?;
                host.add_money(farm_id, Money::ZERO - settlement);
                self.credit.record_event(farm_id, now, CreditEventKind::DealPaidOff, &deal_id);
                let key = if disposition_buyout { MessageKey::LeaseBoughtOut } else { MessageKey::LeaseRenewed };
                Ok(TransactionResponse::ok(farm_id, key))
            }

            RequestKind::PurchaseLandCash { land_id, price } => {
                if !host.land_exists(land_id) {
                    return Err(CoreError::NotFound(format!("land {land_id}")));
                }
                if host.land_owner(land_id).is_some() {
                    return Err(CoreError::Conflict(format!("land {land_id} already owned")));
                }
                let balance = host.farm_money(farm_id).unwrap_or(Money::ZERO);
                if balance < price {
                    return Err(CoreError::InsufficientFunds { required: price.0, available: balance.0 });
                }
                host.add_money(farm_id, Money::ZERO - price);
                Ok(TransactionResponse::ok(farm_id, MessageKey::Ok))
            }

            RequestKind::LandLease { land_id, price, term_months } => {
                let eligibility = self.credit.can_finance(farm_id, FinanceKind::Land, term_months);
                if !eligibility.allowed {
                    return Err(CoreError::IneligibleCredit { min_score_required: eligibility.min_score_required });
                }
                let adj = self.credit.interest_adjustment_pct(farm_id);
                let rate = (5.5 + adj as f64).max(0.0);
                let monthly = amortized_payment(price, rate, term_months);
                let deal_id = self.ledger.open_deal(
                    DealKind::LandLease, farm_id, now, price, rate, term_months, monthly,
                    format!("land-{land_id}"), None, vec![],
                );
                self.events.push(CoreEvent::DealCreated { farm_id, deal_id, when: now });
                Ok(TransactionResponse::ok(farm_id, MessageKey::DealOpened))
            }

            RequestKind::LandLeaseBuyout { deal_id } => {
                let base_price = self.ledger.deal(&deal_id)?.original_amount;
                let settlement =
                    self.ledger.resolve_lease(&deal_id, crate::ledger::LeaseDisposition::Buyout, 0.0, base_price)?;
                host.add_money(farm_id, Money::ZERO - settlement);
                Ok(TransactionResponse::ok(farm_id, MessageKey::LeaseBoughtOut))
            }

            RequestKind::RequestUsedItem { store_item_ref, agent_tier, quality_tier, base_price } => {
                let active_count =
                    self.searches.values().filter(|s| s.farm_id == farm_id && s.status == SearchStatus::Active).count();
                if active_count >= self.config.max_active_searches {
                    return Err(CoreError::ResourceCap(format!(
                        "farm {farm_id} already has {active_count} active searches"
                    )));
                }
                let retainer = agent_tier.retainer(base_price);
                let balance = host.farm_money(farm_id).unwrap_or(Money::ZERO);
                if balance < retainer {
                    return Err(CoreError::InsufficientFunds { required: retainer.0, available: balance.0 });
                }
                host.add_money(farm_id, Money::ZERO - retainer);
                self.search_counter += 1;
                let search_id = format!("search-{}", self.search_counter);
                let completes_at =
                    search::roll_completion(agent_tier, now, DAY_MS, self.seed, self.search_counter);
                let req = SearchRequest {
                    id: search_id.clone(),
                    farm_id,
                    agent_tier,
                    quality_tier,
                    retainer_paid: retainer,
                    opened_at: now,
                    completes_at,
                    status: SearchStatus::Active,
                    found_listings: vec![],
                    store_item_ref,
                    base_price,
                };
                self.searches.insert(search_id, req);
                Ok(TransactionResponse::ok(farm_id, MessageKey::SearchStarted))
            }

            RequestKind::CancelSearch { search_id } => {
                let search = self.searches.get_mut(&search_id).ok_or_else(|| CoreError::NotFound(search_id.clone()))?;
                if search.farm_id != farm_id {
                    return Err(CoreError::Unauthorized { farm_id });
                }
                search.status = SearchStatus::Cancelled;
                Ok(TransactionResponse::ok(farm_id, MessageKey::SearchCancelled))
            }

            RequestKind::DeclineListing { listing_id } => {
                self.listings.remove(&listing_id).ok_or_else(|| CoreError::NotFound(listing_id.clone()))?;
                self.negotiations.remove(&listing_id);
                Ok(TransactionResponse::ok(farm_id, MessageKey::ListingDeclined))
            }

            RequestKind::InspectListing { listing_id } => self.inspect_listing(host, farm_id, &listing_id, now),

            RequestKind::NegotiateOffer { listing_id, offer } => {
                self.negotiate_offer(farm_id, &listing_id, offer, now)
            }

            RequestKind::NegotiationAcceptCounter { listing_id } => {
                self.negotiation_accept_counter(farm_id, &listing_id)
            }

            RequestKind::NegotiationStandFirm { listing_id } => {
                self.negotiation_stand_firm(farm_id, &listing_id, now)
            }

            RequestKind::NegotiationWalkAway { listing_id } => {
                self.negotiation_walk_away(farm_id, &listing_id)
            }

            RequestKind::CreateSaleListing { vehicle_id, agent_tier, price_tier, fair_market_value } => {
                self.require_owner(host, farm_id, vehicle_id)?;
                if matches!(price_tier, crate::sale_listing::PriceTier::Premium) {
                    let paint_condition = 1.0 - host.vehicle_damage(vehicle_id) as f32;
                    let record = self.reliability_for(vehicle_id);
                    if !crate::sale_listing::is_premium_eligible(record, paint_condition) {
                        return Err(CoreError::InvalidState("vehicle not eligible for Premium price tier".into()));
                    }
                }
                self.sale_listing_counter += 1;
                let fee_source = SaleListing::new(
                    format!("sl-{vehicle_id}-{}", self.sale_listing_counter),
                    farm_id,
                    vehicle_id,
                    agent_tier,
                    price_tier,
                    fair_market_value,
                    now,
                    self.seed,
                    self.sale_listing_counter,
                    30 * DAY_MS,
                );
                let balance = host.farm_money(farm_id).unwrap_or(Money::ZERO);
                if balance < fee_source.fee_paid {
                    return Err(CoreError::InsufficientFunds { required: fee_source.fee_paid.0, available: balance.0 });
                }
                host.add_money(farm_id, Money::ZERO - fee_source.fee_paid);
                let id = fee_source.id.clone();
                self.sale_listings.insert(id, fee_source);
                Ok(TransactionResponse::ok(farm_id, MessageKey::SaleListingCreated))
            }

            RequestKind::SaleListingAction { listing_id, action } => {
                self.act_on_own_sale_listing(host, farm_id, &listing_id, action)
            }

            RequestKind::ModifyListingPrice { listing_id, new_ask_price } => {
                let listing = self
                    .sale_listings
                    .get_mut(&listing_id)
                    .ok_or_else(|| CoreError::NotFound(listing_id.clone()))?;
                if listing.farm_id != farm_id {
                    return Err(CoreError::Unauthorized { farm_id });
                }
                listing.ask_price = new_ask_price;
                Ok(TransactionResponse::ok(farm_id, MessageKey::SaleListingPriceUpdated))
            }

            RequestKind::TradeInVehicle { vehicle_id, target_listing_id } => {
                self.require_owner(host, farm_id, vehicle_id)?;
                let listing = self
                    .listings
                    .get(&target_listing_id)
                    .ok_or_else(|| CoreError::NotFound(target_listing_id.clone()))?;
                let sale_mult = self.reliability.get(&vehicle_id).map(|r| r.sale_multiplier()).unwrap_or(0.85);
                let credit_value = listing.ask_price.checked_mul_pct(sale_mult as f64 * 0.9);
                host.add_money(farm_id, credit_value);
                self.listings.remove(&target_listing_id);
                Ok(TransactionResponse::ok(farm_id, MessageKey::TradeInApplied))
            }

            RequestKind::RepairVehicle { vehicle_id } => {
                self.require_owner(host, farm_id, vehicle_id)?;
                let config = self.config.reliability.clone();
                let record = self.reliability_for(vehicle_id);
                record.apply_workshop_repair(&config);
                self.events.push(CoreEvent::VehicleRepaired { vehicle_id, when: now, component: None });
                Ok(TransactionResponse::ok(farm_id, MessageKey::VehicleRepaired))
            }

            RequestKind::SetPaymentConfig { deal_id, mode, custom_amount, multiplier } => {
                self.ledger.set_payment_config(&deal_id, mode, custom_amount, multiplier)?;
                Ok(TransactionResponse::ok(farm_id, MessageKey::Ok))
            }

            RequestKind::FieldRepair { vehicle_id, component } => {
                self.require_owner(host, farm_id, vehicle_id)?;
                let config = self.config.reliability.clone();
                let record = self.reliability_for(vehicle_id);
                match service::field_repair(record, &config, component) {
                    FieldRepairOutcome::Repaired => {
                        self.events.push(CoreEvent::VehicleRepaired { vehicle_id, when: now, component: Some(component) });
                        Ok(TransactionResponse::ok(farm_id, MessageKey::FieldRepairApplied))
                    }
                    FieldRepairOutcome::AlreadyUsed => {
                        Ok(TransactionResponse::fail(farm_id, MessageKey::FieldRepairAlreadyUsed))
                    }
                }
            }

            RequestKind::RefillFluids { vehicle_id } => {
                self.require_owner(host, farm_id, vehicle_id)?;
                let record = self.reliability_for(vehicle_id);
                record.oil_level = 1.0;
                record.hydraulic_level = 1.0;
                Ok(TransactionResponse::ok(farm_id, MessageKey::FluidsRefilled))
            }

            RequestKind::ReplaceTires { vehicle_id } => {
                self.require_owner(host, farm_id, vehicle_id)?;
                let record = self.reliability_for(vehicle_id);
                record.tire_tier = crate::reliability::TireTier::Normal;
                Ok(TransactionResponse::ok(farm_id, MessageKey::TiresReplaced))
            }

            RequestKind::StartRestoration { vehicle_id, component } => {
                self.require_owner(host, farm_id, vehicle_id)?;
                let seed = self.seed;
                let truck = self.service_trucks.get_mut(&farm_id).ok_or_else(|| {
                    CoreError::InvalidState(format!("farm {farm_id} has no service truck"))
                })?;
                if truck.start(now, seed, vehicle_id, component) {
                    Ok(TransactionResponse::ok(farm_id, MessageKey::RestorationStarted))
                } else {
                    Ok(TransactionResponse::fail(farm_id, MessageKey::RestorationInProgress))
                }
            }

            RequestKind::StopRestoration => {
                let truck = self.service_trucks.get_mut(&farm_id).ok_or_else(|| {
                    CoreError::InvalidState(format!("farm {farm_id} has no service truck"))
                })?;
                truck.stop();
                Ok(TransactionResponse::ok(farm_id, MessageKey::RestorationAborted))
            }

            RequestKind::RestorationProgress => {
                let vehicle_id = self
                    .service_trucks
                    .get(&farm_id)
                    .and_then(|t| t.active_vehicle)
                    .ok_or_else(|| CoreError::InvalidState(format!("farm {farm_id} has no active restoration")))?;
                let seed = self.seed;
                let record = self
                    .reliability
                    .entry(vehicle_id)
                    .or_insert_with(|| VehicleReliabilityRecord::first_observed(vehicle_id, seed));
                let truck = self.service_trucks.get_mut(&farm_id).unwrap();
                // 5 game-hours of restoration progress per `RestorationProgress`
                // call (spec.md §4.6 "+1% R and +0.25% ceiling per game-hour").
                let tick = truck.advance(record, 5.0, now, DAY_MS);
                match tick {
                    service::RestorationTick::Completed(_) => {
                        Ok(TransactionResponse::ok(farm_id, MessageKey::RestorationCompleted))
                    }
                    service::RestorationTick::Progressing => {
                        Ok(TransactionResponse::ok(farm_id, MessageKey::RestorationInProgress))
                    }
                    service::RestorationTick::Paused => {
                        Ok(TransactionResponse::ok(farm_id, MessageKey::RestorationPaused))
                    }
                    service::RestorationTick::PausedDamage => {
                        // spec.md §4.6: "after 2 game-hours of pause, target
                        // takes `damage += 0.05` penalty".
                        host.add_vehicle_damage(vehicle_id, service::PAUSE_DAMAGE_PENALTY);
                        Ok(TransactionResponse::ok(farm_id, MessageKey::RestorationPaused))
                    }
                }
            }

            RequestKind::SetRestorationCooldown { until } => {
                let truck = self.service_trucks.get_mut(&farm_id).ok_or_else(|| {
                    CoreError::InvalidState(format!("farm {farm_id} has no service truck"))
                })?;
                truck.cooldown_until = until;
                Ok(TransactionResponse::ok(farm_id, MessageKey::Ok))
            }

            RequestKind::ServiceTruckDiscovery | RequestKind::ServiceTruckDiscoverySync => {
                let score = self.credit.score(farm_id);
                let has_degraded = self
                    .reliability
                    .values()
                    .any(|r| r.ceiling < self.config.reliability.legendary_dna_threshold);
                let state = self.service_discovery.entry(farm_id).or_default();
                if !state.is_eligible(score.max(0) as u16, has_degraded) {
                    return Ok(TransactionResponse::fail(farm_id, MessageKey::ServiceTruckNotEligible));
                }
                if state.roll_offer(self.seed, farm_id) {
                    Ok(TransactionResponse::ok(farm_id, MessageKey::ServiceTruckOffered))
                } else {
                    Ok(TransactionResponse::fail(farm_id, MessageKey::ServiceTruckNotEligible))
                }
            }

            RequestKind::ServiceTruckPurchase { price } => {
                let balance = host.farm_money(farm_id).unwrap_or(Money::ZERO);
                if balance < price {
                    return Err(CoreError::InsufficientFunds { required: price.0, available: balance.0 });
                }
                host.add_money(farm_id, Money::ZERO - price);
                self.service_trucks.insert(farm_id, ServiceTruck::new(farm_id, price));
                Ok(TransactionResponse::ok(farm_id, MessageKey::ServiceTruckPurchased))
            }
        }
    }

    fn apply_manual_payment(
        &mut self,
        host: &mut impl HostGameApi,
        farm_id: FarmId,
        deal_id: &DealId,
        amount: Money,
        now: GameTime,
    ) -> CoreResult<TransactionResponse> {
        let deal = self.ledger.deal(deal_id)?;
        if deal.farm_id != farm_id {
            return Err(CoreError::Unauthorized { farm_id });
        }
        let balance = host.farm_money(farm_id).unwrap_or(Money::ZERO);
        if balance < amount {
            return Err(CoreError::InsufficientFunds { required: amount.0, available: balance.0 });
        }
        host.add_money(farm_id, Money::ZERO - amount);
        self.ledger.apply_payment(deal_id, amount, now, &mut self.credit)?;
        self.events.push(CoreEvent::PaymentMade { farm_id, deal_id: deal_id.clone(), when: now, amount });
        Ok(TransactionResponse::ok(farm_id, MessageKey::PaymentApplied))
    }

    fn inspect_listing(
        &mut self,
        host: &mut impl HostGameApi,
        farm_id: FarmId,
        listing_id: &str,
        now: GameTime,
    ) -> CoreResult<TransactionResponse> {
        let listing = self
            .listings
            .get(listing_id)
            .ok_or_else(|| CoreError::NotFound(listing_id.to_string()))?;
        let damage = listing.damage as f64;
        let wear = listing.wear as f64;
        if let Some(report) = &listing.inspection {
            if !report.is_stale(0.0, damage, wear) {
                return Err(CoreError::InvalidState(format!("listing {listing_id} already inspected")));
            }
        }
        let cost = crate::listing::inspection_cost(listing.ask_price);
        let balance = host.farm_money(farm_id).unwrap_or(Money::ZERO);
        if balance < cost {
            return Err(CoreError::InsufficientFunds { required: cost.0, available: balance.0 });
        }
        host.add_money(farm_id, Money::ZERO - cost);
        let estimated_repair_cost =
            crate::listing::estimated_repair_cost(listing.base_price, &listing.reliability_snapshot);
        let mechanic_assessment = crate::listing::mechanic_assessment(listing.dna, &listing.reliability_snapshot);
        let report = crate::listing::InspectionReport {
            reliability: listing.reliability_snapshot,
            estimated_repair_cost,
            mechanic_assessment,
            cached_hours: 0.0,
            cached_damage: damage,
            cached_wear: wear,
        };
        let listing = self.listings.get_mut(listing_id).unwrap();
        listing.inspection = Some(report);
        let _ = now;
        Ok(TransactionResponse::ok(farm_id, MessageKey::ListingInspected))
    }

    /// A buyer's opening offer against a found listing (spec.md §4.4):
    /// banded into Accepted/Countered/Rejected/WalkedAway by the effective
    /// threshold. Only valid while the negotiation hasn't yet concluded.
    fn negotiate_offer(
        &mut self,
        farm_id: FarmId,
        listing_id: &str,
        offer: Money,
        now: GameTime,
    ) -> CoreResult<TransactionResponse> {
        let listing = self.listings.get(listing_id).ok_or_else(|| CoreError::NotFound(listing_id.to_string()))?;
        let negotiation = self
            .negotiations
            .entry(listing_id.to_string())
            .or_insert_with(|| Negotiation::open(listing, now));
        if negotiation.is_locked(now) {
            return Err(CoreError::InvalidState(format!("negotiation on {listing_id} is locked")));
        }
        if !matches!(negotiation.status, NegotiationStatus::Open | NegotiationStatus::Rejected) {
            return Err(CoreError::InvalidState(format!("negotiation on {listing_id} already concluded")));
        }
        let threshold = negotiation::effective_threshold_pct(
            listing.seller_personality,
            0.0,
            listing.damage,
            0.0,
            listing.ask_price,
            listing.base_price,
            0.0,
        );
        let outcome = negotiation::evaluate_offer(listing.ask_price, offer, threshold);
        negotiation::apply_offer_outcome(negotiation, outcome, offer);
        let walked_away = negotiation.status == NegotiationStatus::WalkedAway;
        let key = match negotiation.status {
            NegotiationStatus::Accepted => MessageKey::NegotiationAccepted,
            NegotiationStatus::Countered => MessageKey::NegotiationCountered,
            NegotiationStatus::Rejected => MessageKey::NegotiationRejected,
            NegotiationStatus::WalkedAway => MessageKey::NegotiationWalkedAway,
            NegotiationStatus::Open => MessageKey::Ok,
        };
        if walked_away {
            // Permanent walk-away removes the listing (spec.md §5 "Locking").
            self.listings.remove(listing_id);
            self.negotiations.remove(listing_id);
        }
        info!("negotiation {listing_id} for farm {farm_id} -> {key:?}");
        Ok(TransactionResponse::ok(farm_id, key))
    }

    fn open_negotiation(&mut self, listing_id: &str) -> CoreResult<&mut Negotiation> {
        self.negotiations
            .get_mut(listing_id)
            .ok_or_else(|| CoreError::NotFound(listing_id.to_string()))
    }

    fn negotiation_accept_counter(
        &mut self,
        farm_id: FarmId,
        listing_id: &str,
    ) -> CoreResult<TransactionResponse> {
        let negotiation = self.open_negotiation(listing_id)?;
        if negotiation.status != NegotiationStatus::Countered {
            return Err(CoreError::InvalidState(format!("negotiation on {listing_id} has no open counter")));
        }
        negotiation.status = NegotiationStatus::Accepted;
        Ok(TransactionResponse::ok(farm_id, MessageKey::NegotiationAccepted))
    }

    /// Refuses the counter and rolls the seller's stand-firm dice
    /// (spec.md §4.4 "StandFirm dice").
    fn negotiation_stand_firm(
        &mut self,
        farm_id: FarmId,
        listing_id: &str,
        now: GameTime,
    ) -> CoreResult<TransactionResponse> {
        let rounds = {
            let negotiation = self.open_negotiation(listing_id)?;
            if negotiation.status != NegotiationStatus::Countered {
                return Err(CoreError::InvalidState(format!("negotiation on {listing_id} has no open counter")));
            }
            negotiation.rounds as u64
        };
        let outcome = negotiation::roll_stand_firm(self.seed, rounds);
        let negotiation = self.negotiations.get_mut(listing_id).unwrap();
        negotiation::apply_stand_firm(negotiation, outcome, now, NEGOTIATION_LOCK_MS);
        let key = match outcome {
            negotiation::StandFirmOutcome::Accept => MessageKey::NegotiationAccepted,
            negotiation::StandFirmOutcome::Hold => MessageKey::NegotiationCountered,
            negotiation::StandFirmOutcome::Walk => MessageKey::ListingLocked,
        };
        Ok(TransactionResponse::ok(farm_id, key))
    }

    /// Buyer-initiated, permanent walk-away from a countered negotiation
    /// (spec.md §5 "Locking": listings that trigger a permanent walk-away
    /// are removed).
    fn negotiation_walk_away(&mut self, farm_id: FarmId, listing_id: &str) -> CoreResult<TransactionResponse> {
        let negotiation = self.open_negotiation(listing_id)?;
        if !matches!(negotiation.status, NegotiationStatus::Countered | NegotiationStatus::Rejected) {
            return Err(CoreError::InvalidState(format!("negotiation on {listing_id} has no open counter")));
        }
        negotiation.status = NegotiationStatus::WalkedAway;
        self.listings.remove(listing_id);
        self.negotiations.remove(listing_id);
        Ok(TransactionResponse::ok(farm_id, MessageKey::NegotiationWalkedAway))
    }

    fn act_on_own_sale_listing(
        &mut self,
        host: &mut impl HostGameApi,
        farm_id: FarmId,
        listing_id: &str,
        action: crate::request::SaleListingActionKind,
    ) -> CoreResult<TransactionResponse> {
        use crate::request::SaleListingActionKind;
        let listing = self
            .sale_listings
            .get_mut(listing_id)
            .ok_or_else(|| CoreError::NotFound(listing_id.to_string()))?;
        if listing.farm_id != farm_id {
            return Err(CoreError::Unauthorized { farm_id });
        }
        match action {
            SaleListingActionKind::Accept => {
                let offer = listing
                    .pending_offer
                    .ok_or_else(|| CoreError::InvalidState(format!("listing {listing_id} has no pending offer")))?;
                listing.mark_sold();
                host.add_money(farm_id, offer);
                Ok(TransactionResponse::ok(farm_id, MessageKey::SaleOfferAccepted))
            }
            SaleListingActionKind::Decline => {
                if listing.pending_offer.take().is_none() {
                    return Err(CoreError::InvalidState(format!("listing {listing_id} has no pending offer")));
                }
                Ok(TransactionResponse::ok(farm_id, MessageKey::SaleOfferDeclined))
            }
            SaleListingActionKind::Cancel => {
                listing.mark_cancelled();
                Ok(TransactionResponse::ok(farm_id, MessageKey::SaleListingCancelled))
            }
        }
    }
}

/// Standard fixed-payment amortization formula (spec.md §4.5):
/// `payment = principal * r / (1 - (1+r)^-n)` where `r` is the monthly
/// rate. Falls back to an even split when the rate is (near) zero.
fn amortized_payment(principal: Money, annual_rate_pct: f64, term_months: u32) -> Money {
    let r = annual_rate_pct / 100.0 / 12.0;
    let n = term_months.max(1) as f64;
    if r.abs() < 1e-9 {
        return principal.checked_mul_pct(100.0 / n);
    }
    let factor = r / (1.0 - (1.0 + r).powf(-n));
    principal.checked_mul_pct(factor * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::StubHost;

    fn core() -> Core {
        Core::new(CoreConfig::default(), 42)
    }

    #[test]
    fn finance_vehicle_opens_a_deal_when_eligible() {
        let mut c = core();
        let mut host = StubHost::new().with_farm(1, Money::from_major(100_000));
        host.vehicles.insert(1, 1);
        for _ in 0..5 {
            c.credit.record_event(1, 0, CreditEventKind::PaymentOnTime, "seed history");
        }
        let resp = c.handle_request(
            &mut host,
            Request {
                farm_id: 1,
                kind: RequestKind::FinanceVehicle {
                    vehicle_id: 1,
                    price: Money::from_major(50_000),
                    term_months: 48,
                    down_payment: Money::from_major(5_000),
                    collateral: vec![],
                },
            },
        );
        assert!(resp.success, "{resp:?}");
        assert_eq!(resp.message_key, MessageKey::DealOpened);
    }

    #[test]
    fn finance_request_over_price_cap_is_rejected() {
        let mut c = core();
        let mut host = StubHost::new().with_farm(1, Money::from_major(1_000_000_000));
        host.vehicles.insert(1, 1);
        let resp = c.handle_request(
            &mut host,
            Request {
                farm_id: 1,
                kind: RequestKind::FinanceVehicle {
                    vehicle_id: 1,
                    price: Money::from_major(200_000_000),
                    term_months: 48,
                    down_payment: Money::from_major(5_000),
                    collateral: vec![],
                },
            },
        );
        assert!(!resp.success);
        assert_eq!(resp.message_key, MessageKey::InvalidParameter);
    }

    #[test]
    fn take_loan_over_term_cap_is_rejected() {
        let mut c = core();
        let mut host = StubHost::new().with_farm(1, Money::from_major(1_000_000));
        let resp = c.handle_request(
            &mut host,
            Request {
                farm_id: 1,
                kind: RequestKind::TakeLoan { amount: Money::from_major(10_000), term_months: 361, kind: DealKind::CashLoan },
            },
        );
        assert!(!resp.success);
        assert_eq!(resp.message_key, MessageKey::InvalidParameter);
    }

    #[test]
    fn nan_multiplier_is_rejected() {
        let mut c = core();
        let mut host = StubHost::new().with_farm(1, Money::from_major(1_000));
        let resp = c.handle_request(
            &mut host,
            Request {
                farm_id: 1,
                kind: RequestKind::SetPaymentConfig {
                    deal_id: "nonexistent".into(),
                    mode: PaymentMode::Standard,
                    custom_amount: None,
                    multiplier: f64::NAN,
                },
            },
        );
        assert!(!resp.success);
        assert_eq!(resp.message_key, MessageKey::InvalidParameter);
    }

    #[test]
    fn unauthorized_repair_request_is_rejected() {
        let mut c = core();
        let mut host = StubHost::new().with_farm(1, Money::from_major(1_000));
        host.vehicles.insert(9, 2);
        let resp = c.handle_request(
            &mut host,
            Request { farm_id: 1, kind: RequestKind::RepairVehicle { vehicle_id: 9 } },
        );
        assert!(!resp.success);
        assert_eq!(resp.message_key, MessageKey::Unauthorized);
    }

    #[test]
    fn collateral_over_cap_is_rejected_with_resource_cap() {
        let mut c = core();
        let mut host = StubHost::new().with_farm(1, Money::from_major(100_000));
        host.vehicles.insert(1, 1);
        let collateral: Vec<CollateralItem> = (0..(MAX_COLLATERAL + 1))
            .map(|i| CollateralItem { vehicle_id: Some(i as i64), description: "x".into(), value: Money::ZERO })
            .collect();
        let resp = c.handle_request(
            &mut host,
            Request {
                farm_id: 1,
                kind: RequestKind::FinanceVehicle {
                    vehicle_id: 1,
                    price: Money::from_major(50_000),
                    term_months: 48,
                    down_payment: Money::from_major(5_000),
                    collateral,
                },
            },
        );
        assert!(!resp.success);
        assert_eq!(resp.message_key, MessageKey::ResourceCapExceeded);
    }

    #[test]
    fn search_request_respects_active_search_cap() {
        let mut c = core();
        let mut host = StubHost::new().with_farm(1, Money::from_major(1_000_000));
        for _ in 0..5 {
            let resp = c.handle_request(
                &mut host,
                Request {
                    farm_id: 1,
                    kind: RequestKind::RequestUsedItem {
                        store_item_ref: "tractor_x".into(),
                        agent_tier: AgentTier::Local,
                        quality_tier: crate::listing::QualityTier::Fair,
                        base_price: Money::from_major(50_000),
                    },
                },
            );
            assert!(resp.success);
        }
        let resp = c.handle_request(
            &mut host,
            Request {
                farm_id: 1,
                kind: RequestKind::RequestUsedItem {
                    store_item_ref: "tractor_x".into(),
                    agent_tier: AgentTier::Local,
                    quality_tier: crate::listing::QualityTier::Fair,
                    base_price: Money::from_major(50_000),
                },
            },
        );
        assert!(!resp.success);
        assert_eq!(resp.message_key, MessageKey::ResourceCapExceeded);
    }

    #[test]
    fn field_repair_request_reports_already_used_on_second_attempt() {
        let mut c = core();
        let mut host = StubHost::new().with_farm(1, Money::from_major(1_000));
        host.vehicles.insert(1, 1);
        let req = |component| Request {
            farm_id: 1,
            kind: RequestKind::FieldRepair { vehicle_id: 1, component },
        };
        let first = c.handle_request(&mut host, req(crate::reliability::Component::Engine));
        assert!(first.success);
        let second = c.handle_request(&mut host, req(crate::reliability::Component::Engine));
        assert!(!second.success);
        assert_eq!(second.message_key, MessageKey::FieldRepairAlreadyUsed);
    }

    fn insert_test_listing(c: &mut Core, id: &str, ask_price: Money) {
        use crate::listing::{Generation, Listing, ReliabilitySnapshot};
        c.listings.insert(
            id.to_string(),
            Listing {
                id: id.to_string(),
                store_item_ref: "tractor_x".into(),
                base_price: ask_price,
                generation: Generation::Mid,
                damage: 0.1,
                wear: 0.1,
                reliability_snapshot: ReliabilitySnapshot { engine_r: 0.8, hydraulic_r: 0.8, electrical_r: 0.8 },
                dna: 0.5,
                seller_personality: crate::listing::SellerPersonality::Reasonable,
                ask_price,
                created_at: 0,
                locked_until: None,
                found_by: "s1".into(),
                inspection: None,
            },
        );
    }

    #[test]
    fn inspecting_a_listing_charges_the_fee_and_caches_a_report() {
        let mut c = core();
        let mut host = StubHost::new().with_farm(1, Money::from_major(10_000));
        insert_test_listing(&mut c, "l1", Money::from_major(8_000));
        let resp = c.handle_request(
            &mut host,
            Request { farm_id: 1, kind: RequestKind::InspectListing { listing_id: "l1".into() } },
        );
        assert!(resp.success, "{resp:?}");
        assert_eq!(resp.message_key, MessageKey::ListingInspected);
        assert!(c.listings.get("l1").unwrap().inspection.is_some());
        assert!(host.farm_money(1).unwrap() < Money::from_major(10_000));
    }

    #[test]
    fn second_inspection_without_drift_is_rejected() {
        let mut c = core();
        let mut host = StubHost::new().with_farm(1, Money::from_major(10_000));
        insert_test_listing(&mut c, "l1", Money::from_major(8_000));
        let req = || Request { farm_id: 1, kind: RequestKind::InspectListing { listing_id: "l1".into() } };
        assert!(c.handle_request(&mut host, req()).success);
        let second = c.handle_request(&mut host, req());
        assert!(!second.success);
        assert_eq!(second.message_key, MessageKey::InvalidState);
    }

    #[test]
    fn lowball_offer_walks_away_and_removes_listing() {
        let mut c = core();
        let mut host = StubHost::new().with_farm(1, Money::from_major(100_000));
        insert_test_listing(&mut c, "l1", Money::from_major(100_000));
        let resp = c.handle_request(
            &mut host,
            Request {
                farm_id: 1,
                kind: RequestKind::NegotiateOffer { listing_id: "l1".into(), offer: Money::from_major(40_000) },
            },
        );
        assert!(resp.success);
        assert_eq!(resp.message_key, MessageKey::NegotiationWalkedAway);
        assert!(c.listings.get("l1").is_none());
    }

    #[test]
    fn countered_offer_can_be_accepted_via_accept_counter() {
        let mut c = core();
        let mut host = StubHost::new().with_farm(1, Money::from_major(100_000));
        insert_test_listing(&mut c, "l1", Money::from_major(100_000));
        let resp = c.handle_request(
            &mut host,
            Request {
                farm_id: 1,
                kind: RequestKind::NegotiateOffer { listing_id: "l1".into(), offer: Money::from_major(80_000) },
            },
        );
        assert!(resp.success);
        assert_eq!(resp.message_key, MessageKey::NegotiationCountered);
        let accept = c.handle_request(
            &mut host,
            Request { farm_id: 1, kind: RequestKind::NegotiationAcceptCounter { listing_id: "l1".into() } },
        );
        assert!(accept.success);
        assert_eq!(accept.message_key, MessageKey::NegotiationAccepted);
    }

    #[test]
    fn sale_listing_accept_pays_out_the_pending_offer() {
        let mut c = core();
        let mut host = StubHost::new().with_farm(1, Money::from_major(5_000));
        host.vehicles.insert(1, 1);
        let resp = c.handle_request(
            &mut host,
            Request {
                farm_id: 1,
                kind: RequestKind::CreateSaleListing {
                    vehicle_id: 1,
                    agent_tier: crate::sale_listing::SaleAgentTier::Local,
                    price_tier: crate::sale_listing::PriceTier::Market,
                    fair_market_value: Money::from_major(50_000),
                },
            },
        );
        assert!(resp.success, "{resp:?}");
        let listing_id = c.sale_listings.keys().next().cloned().unwrap();
        c.sale_listings.get_mut(&listing_id).unwrap().pending_offer = Some(Money::from_major(45_000));
        let accept = c.handle_request(
            &mut host,
            Request {
                farm_id: 1,
                kind: RequestKind::SaleListingAction {
                    listing_id: listing_id.clone(),
                    action: crate::request::SaleListingActionKind::Accept,
                },
            },
        );
        assert!(accept.success, "{accept:?}");
        assert_eq!(accept.message_key, MessageKey::SaleOfferAccepted);
        assert_eq!(c.sale_listings.get(&listing_id).unwrap().status, crate::sale_listing::SaleListingStatus::Sold);
        assert!(host.farm_money(1).unwrap() >= Money::from_major(45_000));
    }

    #[test]
    fn finance_payment_reduces_deal_balance() {
        let mut c = core();
        let mut host = StubHost::new().with_farm(1, Money::from_major(100_000));
        host.vehicles.insert(1, 1);
        for _ in 0..5 {
            c.credit.record_event(1, 0, CreditEventKind::PaymentOnTime, "seed history");
        }
        let open = c.handle_request(
            &mut host,
            Request {
                farm_id: 1,
                kind: RequestKind::FinanceVehicle {
                    vehicle_id: 1,
                    price: Money::from_major(50_000),
                    term_months: 48,
                    down_payment: Money::from_major(5_000),
                    collateral: vec![],
                },
            },
        );
        assert!(open.success, "{open:?}");
        let deal_id = c.deals_for_farm(1)[0].id.clone();
        let balance_before = c.deal(&deal_id).unwrap().current_balance;
        let money_before = host.farm_money(1).unwrap();

        let pay = c.handle_request(
            &mut host,
            Request { farm_id: 1, kind: RequestKind::FinancePayment { deal_id: deal_id.clone(), amount: Money::from_major(1_000) } },
        );
        assert!(pay.success, "{pay:?}");

        assert!(
            c.deal(&deal_id).unwrap().current_balance < balance_before,
            "balance should drop: before={balance_before:?} after={:?}",
            c.deal(&deal_id).unwrap().current_balance
        );
        assert_eq!(host.farm_money(1).unwrap(), money_before - Money::from_major(1_000));
    }

    /// spec.md §8 property: "a request with `farmId` not owned by
    /// `connectionId` always produces `Unauthorized`".
    #[test]
    fn request_for_a_farm_the_connection_does_not_own_is_unauthorized() {
        let mut c = core();
        let mut host = StubHost::new().with_farm(1, Money::from_major(100_000)).with_farm(2, Money::from_major(100_000));
        // farm 1 registered first, so it's the stub's authenticated connection.
        let resp = c.handle_request(
            &mut host,
            Request {
                farm_id: 2,
                kind: RequestKind::TakeLoan { amount: Money::from_major(1_000), term_months: 12, kind: DealKind::CashLoan },
            },
        );
        assert!(!resp.success);
        assert_eq!(resp.message_key, MessageKey::Unauthorized);
        // Untouched: the rejected request never credited farm 2.
        assert_eq!(host.farm_money(2), Some(Money::from_major(100_000)));
    }

    #[test]
    fn request_for_the_owned_farm_is_not_unauthorized() {
        let mut c = core();
        let mut host = StubHost::new().with_farm(1, Money::from_major(100_000)).with_farm(2, Money::from_major(100_000));
        let resp = c.handle_request(
            &mut host,
            Request {
                farm_id: 1,
                kind: RequestKind::TakeLoan { amount: Money::from_major(1_000), term_months: 12, kind: DealKind::CashLoan },
            },
        );
        assert!(resp.success, "{resp:?}");
        assert_ne!(resp.message_key, MessageKey::Unauthorized);
    }
}
