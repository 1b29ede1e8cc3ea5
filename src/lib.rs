//! # Used Equipment Economy Core
//!
//! A deterministic, server-authoritative simulation core modeling a
//! used-equipment economy: credit history, vehicle reliability decay, a
//! buyer/seller used-vehicle marketplace, and financed/leased deal
//! lifecycles.
//!
//! This crate owns no clock, no network socket, and no save file. Every
//! external fact it needs — the current time, a farm's balance, vehicle
//! ownership, weather — is asked of the embedding game through
//! [`host::HostGameApi`]. The single aggregate [`core::Core`] is the only
//! entry point: construct it with a [`config::CoreConfig`], drive it with
//! `frame_tick`/`month_tick`, and route every inbound action through
//! `handle_request`.
//!
//! ## Components
//!
//! - [`credit`] — Credit Bureau: event-sourced farm credit score, rating,
//!   and financing eligibility.
//! - [`reliability`] — Vehicle Reliability Engine: hidden DNA, three
//!   degrading components, malfunctions, and seizure escalation.
//! - [`deal`] / [`ledger`] — Finance Ledger: the `Deal` tagged-sum type and
//!   monthly amortization, prepayment, and repossession.
//! - [`listing`] / [`search`] / [`negotiation`] / [`sale_listing`] — Used
//!   Marketplace: buyer search agents, listing generation, negotiation,
//!   and seller-side sale listings.
//! - [`service`] — OBD field repairs and service-truck restoration.
//! - [`request`] / [`response`] / [`event_bus`] / [`wire`] — the
//!   request/response/event vocabulary and bounded-array framing
//!   discipline.
//! - [`host`] — the trait seam into the embedding game, plus a test-only
//!   in-memory stub.
//! - [`persistence`] — snapshot save/load and reporting export.
//! - [`core`] — the `Core` aggregate tying every component together.

pub mod config;
pub mod core;
pub mod credit;
pub mod deal;
pub mod error;
pub mod event_bus;
pub mod host;
pub mod ids;
pub mod ledger;
pub mod listing;
pub mod negotiation;
pub mod persistence;
pub mod reliability;
pub mod request;
pub mod response;
pub mod rng;
pub mod sale_listing;
pub mod search;
pub mod service;
pub mod wire;

pub use config::CoreConfig;
pub use core::Core;
pub use credit::{CreditAccount, CreditBureau, EligibilityResult, FinanceKind, Rating};
pub use deal::{Deal, DealKind, DealStatus};
pub use error::{CoreError, CoreResult};
pub use event_bus::{CoreEvent, CoreEventBus};
pub use host::{HostGameApi, Weather};
pub use ids::{DealId, FarmId, GameTime, LandId, ListingId, Money, SearchId, VehicleId};
pub use ledger::FinanceLedger;
pub use listing::{Listing, QualityTier, SellerPersonality};
pub use negotiation::{Negotiation, NegotiationStatus};
pub use persistence::CoreSnapshot;
pub use reliability::{Component, DnaTier, MalfunctionKind, VehicleReliabilityRecord};
pub use request::{Request, RequestKind};
pub use response::{MessageKey, TransactionResponse};
pub use sale_listing::{PriceTier, SaleAgentTier, SaleListing};
pub use search::{AgentTier, SearchRequest};
pub use service::{ServiceTruck, ServiceDiscoveryState};

#[cfg(any(test, feature = "test-support"))]
pub use host::StubHost;

#[cfg(test)]
mod tests;
