//! Vehicle Reliability Engine (spec.md §4.3, C3): hidden per-vehicle DNA,
//! three-component reliability with a monotonically degrading ceiling,
//! progressive malfunction frequency, malfunction state machines, seizure
//! escalation, fluid levels, and tire tiers.
//!
//! There is no direct teacher analogue for a physical-degradation model; this
//! module is grounded on the teacher's state-machine and event idioms
//! (`crisis.rs`'s event-triggered stat degradation, `event.rs`'s typed
//! event enum) generalized to the component/threshold math spec.md §4.3
//! specifies exactly.

use crate::config::ReliabilityConfig;
use crate::ids::{GameTime, VehicleId};
use crate::rng::roll;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The three independently-tracked reliability components (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub enum Component {
    Engine,
    Hydraulic,
    Electrical,
}

pub const ALL_COMPONENTS: [Component; 3] = [Component::Engine, Component::Hydraulic, Component::Electrical];

/// DNA-tier classification, derived from the hidden `dna` scalar
/// (spec.md §3 "Derived: `dnaTier(dna)`").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DnaTier {
    Lemon,
    Average,
    Workhorse,
    Legendary,
}

pub fn dna_tier(dna: f32) -> DnaTier {
    if dna < 0.30 {
        DnaTier::Lemon
    } else if dna < 0.70 {
        DnaTier::Average
    } else if dna < 0.90 {
        DnaTier::Workhorse
    } else {
        DnaTier::Legendary
    }
}

/// Tire wear tier (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TireTier {
    Retread,
    Normal,
    Quality,
}

/// The malfunction kinds a vehicle can enter (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MalfunctionKind {
    Stall,
    Misfire,
    Overheat,
    Runaway,
    HydraulicSurge,
    ImplementStuckDown,
    ImplementStuckUp,
    ImplementPull,
    ImplementDrag,
    ElectricalCutout,
    FlatTire,
    SlowLeak,
    Blowout,
    FuelLeak,
}

impl MalfunctionKind {
    /// Default active duration before transitioning to `Cooldown`
    /// (spec.md §4.3: "default 30 s for stall, 5 s for electrical cutout").
    pub fn default_duration_secs(self) -> f64 {
        match self {
            MalfunctionKind::Stall => 30.0,
            MalfunctionKind::ElectricalCutout => 5.0,
            _ => 30.0,
        }
    }

    /// Runaway applies a fixed `speedMult`/`brakeMult` effect while active
    /// (spec.md §4.3).
    pub fn runaway_effect() -> (f64, f64) {
        (1.5, 0.4)
    }
}

/// Per-vehicle malfunction state machine: `Idle -> Active -> Cooldown`
/// (spec.md §4.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MalfunctionState {
    Idle,
    Active { kind: MalfunctionKind, ends_at: GameTime, severity: f32 },
    Cooldown { until: GameTime },
}

/// The hidden + observable reliability record for one vehicle
/// (spec.md §3 "VehicleReliabilityRecord").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleReliabilityRecord {
    pub vehicle_id: VehicleId,
    pub dna: f32,
    pub engine_r: f32,
    pub hydraulic_r: f32,
    pub electrical_r: f32,
    pub ceiling: f32,
    pub repair_count: u32,
    pub breakdown_count: u32,
    pub oil_level: f32,
    pub hydraulic_level: f32,
    pub tire_tier: TireTier,
    pub seizures: BTreeSet<Component>,
    pub malfunction: MalfunctionState,
    pub malfunction_cooldown_until: GameTime,
    pub field_repair_history: BTreeSet<Component>,
}

impl VehicleReliabilityRecord {
    /// First-observation constructor. `dna` is rolled once and is
    /// immutable thereafter (spec.md §4.3 "DNA assignment").
    pub fn first_observed(vehicle_id: VehicleId, seed: u64) -> Self {
        let dna = roll(seed, "dna", vehicle_id as u64) as f32;
        VehicleReliabilityRecord {
            vehicle_id,
            dna,
            engine_r: 1.0,
            hydraulic_r: 1.0,
            electrical_r: 1.0,
            ceiling: 1.0,
            repair_count: 0,
            breakdown_count: 0,
            oil_level: 1.0,
            hydraulic_level: 1.0,
            tire_tier: TireTier::Normal,
            seizures: BTreeSet::new(),
            malfunction: MalfunctionState::Idle,
            malfunction_cooldown_until: 0,
            field_repair_history: BTreeSet::new(),
        }
    }

    pub fn dna_tier(&self) -> DnaTier {
        dna_tier(self.dna)
    }

    pub fn is_legendary(&self, config: &ReliabilityConfig) -> bool {
        self.dna >= config.legendary_dna_threshold
    }

    pub fn component_r(&self, component: Component) -> f32 {
        match component {
            Component::Engine => self.engine_r,
            Component::Hydraulic => self.hydraulic_r,
            Component::Electrical => self.electrical_r,
        }
    }

    fn component_r_mut(&mut self, component: Component) -> &mut f32 {
        match component {
            Component::Engine => &mut self.engine_r,
            Component::Hydraulic => &mut self.hydraulic_r,
            Component::Electrical => &mut self.electrical_r,
        }
    }

    /// `seizureThreshold(dna) = 0.40 - dna*0.30` (spec.md §4.3).
    pub fn seizure_threshold(&self, config: &ReliabilityConfig) -> f32 {
        (config.seizure_base_threshold - self.dna as f64 * config.seizure_dna_reduction) as f32
    }

    /// `ceilingLoss = (1 - dna) * 0.01` per workshop repair, with legendaries
    /// (DNA >= 0.90) strictly immune (spec.md §9 Open Question resolution:
    /// legendary immortality takes precedence over the raw formula, which
    /// would otherwise still decrement them by 0.001).
    fn ceiling_loss_on_repair(&self, config: &ReliabilityConfig) -> f32 {
        if self.is_legendary(config) {
            0.0
        } else {
            (1.0 - self.dna) * 0.01
        }
    }

    /// Applies a workshop repair: clears all seizures, clears fuel leak and
    /// flat tire malfunctions, degrades the ceiling, and raises every
    /// component by +0.15 capped by the (already-degraded) ceiling
    /// (spec.md §4.3 "Repair effects" / "Workshop repair").
    pub fn apply_workshop_repair(&mut self, config: &ReliabilityConfig) {
        let loss = self.ceiling_loss_on_repair(config);
        self.ceiling = (self.ceiling - loss).max(config.ceiling_floor);
        self.repair_count += 1;
        self.seizures.clear();
        if matches!(self.malfunction, MalfunctionState::Active { kind: MalfunctionKind::FuelLeak, .. })
            || matches!(self.malfunction, MalfunctionState::Active { kind: MalfunctionKind::FlatTire, .. })
        {
            self.malfunction = MalfunctionState::Idle;
        }
        for c in ALL_COMPONENTS {
            let ceiling = self.ceiling;
            let r = self.component_r_mut(c);
            *r = (*r + 0.15).min(ceiling);
        }
    }

    /// `breakdown` event: degrades the ceiling by `(1-dna)*random(0.03,0.08)`,
    /// legendaries take 30% of that (spec.md §4.3 "Breakdown degradation").
    pub fn apply_breakdown(&mut self, config: &ReliabilityConfig, seed: u64, nonce: u64) {
        let severity = roll(seed, "breakdown.severity", nonce) as f32 * 0.05 + 0.03; // [0.03, 0.08)
        let mut loss = (1.0 - self.dna) * severity;
        if self.is_legendary(config) {
            loss *= 0.30;
        }
        self.ceiling = (self.ceiling - loss).max(config.ceiling_floor);
        self.breakdown_count += 1;
    }

    /// `saleMultiplier = 0.7 + avg(R) * 0.3` (spec.md §4.3 "Resale modifier").
    pub fn sale_multiplier(&self) -> f32 {
        let avg = (self.engine_r + self.hydraulic_r + self.electrical_r) / 3.0;
        0.7 + avg * 0.3
    }

    /// OBD field repair on one component: clears its seizure, raises its R
    /// to `max(R, min(0.30, ceiling))`, and consumes the one-shot allowance
    /// (spec.md §4.3 / §4.6). Returns `false` if that component has already
    /// received a field repair.
    pub fn apply_field_repair(&mut self, config: &ReliabilityConfig, component: Component) -> bool {
        if self.field_repair_history.contains(&component) {
            return false;
        }
        self.field_repair_history.insert(component);
        self.seizures.remove(&component);
        let ceiling = self.ceiling;
        let floor = config.seizure_repair_min_reliability.min(ceiling);
        let r = self.component_r_mut(component);
        *r = r.max(floor);
        true
    }

    /// Per-second malfunction + seizure roll, advancing the state machine by
    /// `dt_secs` (spec.md §4.3 "Malfunction probability" / server frame tick).
    /// `damage`, `hours`, and `load` are host-observed vehicle state.
    pub fn frame_tick(
        &mut self,
        config: &ReliabilityConfig,
        now: GameTime,
        dt_secs: f64,
        seed: u64,
        damage: f64,
        hours: f64,
        load: f64,
    ) -> Option<MalfunctionKind> {
        match self.malfunction.clone() {
            MalfunctionState::Active { kind, ends_at, .. } => {
                if now >= ends_at {
                    self.malfunction = MalfunctionState::Cooldown {
                        until: now + (kind.default_duration_secs() * 1000.0) as GameTime,
                    };
                }
                return None;
            }
            MalfunctionState::Cooldown { until } => {
                if now >= until {
                    self.malfunction = MalfunctionState::Idle;
                } else {
                    return None;
                }
            }
            MalfunctionState::Idle => {}
        }

        let r_engine = self.engine_r as f64;
        let base = 0.00001 + (1.0 - r_engine).powi(2) * 0.0002;
        let dmg_mult = 1.0 + damage * 4.0;
        let hrs_mult = 1.0 + (hours / 20000.0).min(0.5);
        let load_mult = 1.0 + load * damage * 2.0;
        let p_stall = (base * dmg_mult * hrs_mult * load_mult).min(0.02);

        let avg_r = ((self.engine_r + self.hydraulic_r + self.electrical_r) / 3.0) as f64;
        let p_progressive =
            config.progressive_failure_multiplier * (1.0 - avg_r).powf(config.progressive_failure_exponent);

        // Independent-event union over the dt_secs window.
        let p_stall_window = 1.0 - (1.0 - p_stall).powf(dt_secs);
        let p_progressive_window = 1.0 - (1.0 - p_progressive).powf(dt_secs);
        let p_combined = 1.0 - (1.0 - p_stall_window) * (1.0 - p_progressive_window);
        let p_combined = p_combined * config.malfunction_frequency;

        let nonce = self.vehicle_id as u64 ^ (now as u64).wrapping_mul(2654435761);
        let roll_val = roll(seed, "malfunction.trigger", nonce);
        if roll_val >= p_combined {
            return None;
        }

        let kind = self.pick_malfunction_kind(seed, nonce);
        let ends_at = now + (kind.default_duration_secs() * 1000.0) as GameTime;
        self.malfunction = MalfunctionState::Active { kind, ends_at, severity: 1.0 };

        if config.enable_seizure_escalation {
            self.maybe_escalate_seizure(config, kind, seed, nonce);
        }

        Some(kind)
    }

    fn pick_malfunction_kind(&self, seed: u64, nonce: u64) -> MalfunctionKind {
        if self.oil_level < 0.10 && self.hydraulic_level < 0.10 {
            return MalfunctionKind::Runaway;
        }
        let kinds = [
            MalfunctionKind::Stall,
            MalfunctionKind::Misfire,
            MalfunctionKind::Overheat,
            MalfunctionKind::HydraulicSurge,
            MalfunctionKind::ImplementStuckDown,
            MalfunctionKind::ImplementStuckUp,
            MalfunctionKind::ImplementPull,
            MalfunctionKind::ImplementDrag,
            MalfunctionKind::ElectricalCutout,
            MalfunctionKind::FlatTire,
            MalfunctionKind::SlowLeak,
            MalfunctionKind::Blowout,
            MalfunctionKind::FuelLeak,
        ];
        let idx = (roll(seed, "malfunction.kind", nonce) * kinds.len() as f64) as usize;
        kinds[idx.min(kinds.len() - 1)]
    }

    fn component_for_malfunction(kind: MalfunctionKind) -> Component {
        match kind {
            MalfunctionKind::Stall | MalfunctionKind::Misfire | MalfunctionKind::Overheat => {
                Component::Engine
            }
            MalfunctionKind::Runaway
            | MalfunctionKind::HydraulicSurge
            | MalfunctionKind::ImplementStuckDown
            | MalfunctionKind::ImplementStuckUp
            | MalfunctionKind::ImplementPull
            | MalfunctionKind::ImplementDrag => Component::Hydraulic,
            MalfunctionKind::ElectricalCutout => Component::Electrical,
            MalfunctionKind::FlatTire
            | MalfunctionKind::SlowLeak
            | MalfunctionKind::Blowout
            | MalfunctionKind::FuelLeak => Component::Engine,
        }
    }

    /// Seizure escalation: when `R < seizureThreshold(dna)`, roll a second
    /// die with chance `lerp(min at threshold, max at R=0)` plus a lemon
    /// penalty (spec.md §4.3 "Seizure escalation").
    fn maybe_escalate_seizure(
        &mut self,
        config: &ReliabilityConfig,
        kind: MalfunctionKind,
        seed: u64,
        nonce: u64,
    ) {
        let component = Self::component_for_malfunction(kind);
        let r = self.component_r(component);
        let threshold = self.seizure_threshold(config);
        if r >= threshold {
            return;
        }
        let t = (threshold - r).max(0.0) / threshold.max(1e-6);
        let mut chance = config.seizure_min_chance + t as f64 * (config.seizure_max_chance - config.seizure_min_chance);
        if self.dna_tier() == DnaTier::Lemon {
            chance += config.seizure_lemon_penalty;
        }
        let chance = chance.min(1.0);
        if roll(seed, "seizure", nonce.wrapping_add(1)) < chance {
            self.seizures.insert(component);
        }
    }

    pub fn is_seized(&self, component: Component) -> bool {
        self.seizures.contains(&component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ReliabilityConfig {
        ReliabilityConfig::default()
    }

    #[test]
    fn dna_is_assigned_once_and_immutable() {
        let rec = VehicleReliabilityRecord::first_observed(7, 42);
        let dna1 = rec.dna;
        let rec2 = VehicleReliabilityRecord::first_observed(7, 42);
        assert_eq!(dna1, rec2.dna);
    }

    #[test]
    fn dna_tier_boundaries() {
        assert_eq!(dna_tier(0.0), DnaTier::Lemon);
        assert_eq!(dna_tier(0.29), DnaTier::Lemon);
        assert_eq!(dna_tier(0.30), DnaTier::Average);
        assert_eq!(dna_tier(0.69), DnaTier::Average);
        assert_eq!(dna_tier(0.70), DnaTier::Workhorse);
        assert_eq!(dna_tier(0.89), DnaTier::Workhorse);
        assert_eq!(dna_tier(0.90), DnaTier::Legendary);
    }

    #[test]
    fn ceiling_monotonically_decreases_on_repair() {
        let cfg = config();
        let mut rec = VehicleReliabilityRecord::first_observed(1, 42);
        rec.dna = 0.15; // lemon
        let before = rec.ceiling;
        rec.apply_workshop_repair(&cfg);
        assert!(rec.ceiling <= before);
        let expected_loss = (1.0 - 0.15f32) * 0.01;
        assert!((before - rec.ceiling - expected_loss).abs() < 1e-5);
    }

    #[test]
    fn legendary_is_immune_to_ceiling_loss() {
        let cfg = config();
        let mut rec = VehicleReliabilityRecord::first_observed(1, 42);
        rec.dna = 0.95;
        let before = rec.ceiling;
        rec.apply_workshop_repair(&cfg);
        assert_eq!(rec.ceiling, before);
    }

    #[test]
    fn lemon_spiral_ceiling_bound() {
        let cfg = config();
        let mut rec = VehicleReliabilityRecord::first_observed(1, 42);
        rec.dna = 0.15;
        for _ in 0..20 {
            rec.apply_workshop_repair(&cfg);
        }
        assert!(rec.ceiling <= 0.83, "ceiling = {}", rec.ceiling);
        assert!(rec.engine_r <= rec.ceiling + 1e-6);
        assert!(rec.hydraulic_r <= rec.ceiling + 1e-6);
        assert!(rec.electrical_r <= rec.ceiling + 1e-6);
    }

    #[test]
    fn reliability_never_exceeds_ceiling() {
        let cfg = config();
        let mut rec = VehicleReliabilityRecord::first_observed(3, 1);
        rec.ceiling = 0.5;
        rec.engine_r = 0.5;
        rec.apply_workshop_repair(&cfg);
        assert!(rec.engine_r <= rec.ceiling + 1e-6);
    }

    #[test]
    fn no_seizure_above_threshold() {
        let cfg = config();
        let mut rec = VehicleReliabilityRecord::first_observed(1, 1);
        rec.dna = 0.5;
        rec.engine_r = 0.9;
        let threshold = rec.seizure_threshold(&cfg);
        assert!(rec.engine_r as f64 > threshold as f64);
        rec.maybe_escalate_seizure(&cfg, MalfunctionKind::Stall, 1, 0);
        assert!(!rec.is_seized(Component::Engine));
    }

    #[test]
    fn field_repair_is_one_shot_per_component() {
        let cfg = config();
        let mut rec = VehicleReliabilityRecord::first_observed(1, 1);
        rec.seizures.insert(Component::Engine);
        assert!(rec.apply_field_repair(&cfg, Component::Engine));
        assert!(!rec.is_seized(Component::Engine));
        assert!(!rec.apply_field_repair(&cfg, Component::Engine));
    }

    #[test]
    fn runaway_requires_low_oil_and_hydraulic() {
        let mut rec = VehicleReliabilityRecord::first_observed(1, 1);
        rec.oil_level = 0.05;
        rec.hydraulic_level = 0.05;
        let kind = rec.pick_malfunction_kind(1, 1);
        assert_eq!(kind, MalfunctionKind::Runaway);
    }

    #[test]
    fn sale_multiplier_in_bounds() {
        let rec = VehicleReliabilityRecord::first_observed(1, 1);
        let m = rec.sale_multiplier();
        assert!((0.7..=1.0).contains(&m));
    }

    #[test]
    fn breakdown_respects_legendary_discount() {
        let cfg = config();
        let mut lemon = VehicleReliabilityRecord::first_observed(1, 1);
        lemon.dna = 0.1;
        let mut legend = VehicleReliabilityRecord::first_observed(2, 1);
        legend.dna = 0.95;
        lemon.apply_breakdown(&cfg, 1, 1);
        legend.apply_breakdown(&cfg, 1, 1);
        assert!((1.0 - legend.ceiling) < (1.0 - lemon.ceiling));
    }
}
