//! The host-game integration seam (spec.md §6, C8): everything the core
//! needs to ask of, or report to, the game it's embedded in, behind one
//! trait so the core itself never touches a save file, a network socket,
//! or a clock.
//!
//! Grounded on the teacher's `plugin.rs` trait-seam pattern (the engine
//! talks to plugins through a trait object rather than a concrete type),
//! generalized to the host-query surface spec.md §6 names. `StubHost`
//! mirrors the teacher's own in-memory test doubles used across its
//! `tests/` directory.

use crate::ids::{FarmId, GameTime, LandId, Money, VehicleId};

/// In-game weather, consulted by the marketplace and negotiation modules
/// for their weather-sensitive modifiers (spec.md §6 "currentWeather").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weather {
    Clear,
    Sun,
    Cloudy,
    Rain,
    Snow,
    Storm,
    Hail,
    Fog,
}

impl Weather {
    /// Whether this weather should soften seller resolve in negotiation
    /// (spec.md §4.4 "weather modifiers" — rain-or-worse).
    pub fn is_rain_or_worse(self) -> bool {
        matches!(self, Weather::Rain | Weather::Snow | Weather::Storm | Weather::Hail)
    }
}

/// Everything the core asks of the embedding game (spec.md §6
/// "HostGameApi"). The core never reaches outside this trait for time,
/// money, or world state.
pub trait HostGameApi {
    /// Current wall-clock-independent in-game time, in milliseconds.
    fn now(&self) -> GameTime;

    /// Milliseconds per in-game month tick, used to schedule
    /// `FinanceLedger::month_tick`.
    fn game_month_ticks(&self) -> GameTime;

    /// Milliseconds per server frame tick, used to schedule
    /// `VehicleReliabilityRecord::frame_tick`.
    fn game_frame_ticks(&self) -> GameTime;

    fn farm_exists(&self, farm_id: FarmId) -> bool;

    fn farm_money(&self, farm_id: FarmId) -> Option<Money>;

    /// Credits or debits a farm's treasury; returns `false` if the farm
    /// doesn't exist or the debit would go negative without the host's
    /// own overdraft policy allowing it.
    fn add_money(&mut self, farm_id: FarmId, delta: Money) -> bool;

    /// The farm id owning the connection that issued the in-flight
    /// request, used to stamp `Unauthorized` checks.
    fn connection_farm_id(&self) -> Option<FarmId>;

    fn vehicle_owner(&self, vehicle_id: VehicleId) -> Option<FarmId>;

    fn vehicle_exists(&self, vehicle_id: VehicleId) -> bool;

    /// Current sale/resale price the host quotes for this vehicle
    /// (spec.md §6 "vehicleSalePrice"), used to cost the OBD field repair.
    fn vehicle_sale_price(&self, vehicle_id: VehicleId) -> Money;

    /// Accumulated physical damage, `0.0..=1.0` (spec.md §6
    /// "vehicleDamage").
    fn vehicle_damage(&self, vehicle_id: VehicleId) -> f64;

    /// Accumulated cosmetic/mechanical wear, `0.0..=1.0` (spec.md §6
    /// "vehicleWear").
    fn vehicle_wear(&self, vehicle_id: VehicleId) -> f64;

    /// Lifetime operating hours (spec.md §6 "vehicleHours"), feeding the
    /// malfunction frequency multiplier.
    fn vehicle_hours(&self, vehicle_id: VehicleId) -> f64;

    /// Current implement/hitch load as a fraction of rated capacity
    /// (spec.md §6 "vehicleLoad").
    fn vehicle_load(&self, vehicle_id: VehicleId) -> f64;

    /// Adds to a vehicle's accumulated damage (spec.md §6
    /// "addVehicleDamage"), used by the restoration pause penalty.
    fn add_vehicle_damage(&mut self, vehicle_id: VehicleId, delta: f64);

    fn land_owner(&self, land_id: LandId) -> Option<FarmId>;

    fn land_exists(&self, land_id: LandId) -> bool;

    /// Acreage of the parcel (spec.md §6 "landAcres").
    fn land_acres(&self, land_id: LandId) -> f64;

    /// Soil quality score, `0.0..=1.0` (spec.md §6 "landSoilQuality").
    fn land_soil_quality(&self, land_id: LandId) -> f64;

    fn current_weather(&self) -> Weather;
}

/// An in-memory [`HostGameApi`] used by the core's own test suite
/// (spec.md §10.4 "test tooling"). Never compiled into a release build.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct VehicleTelemetry {
    pub sale_price: Money,
    pub damage: f64,
    pub wear: f64,
    pub hours: f64,
    pub load: f64,
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct LandTelemetry {
    pub acres: f64,
    pub soil_quality: f64,
}

#[cfg(any(test, feature = "test-support"))]
pub struct StubHost {
    pub now: GameTime,
    pub month_ticks: GameTime,
    pub frame_ticks: GameTime,
    pub farms: std::collections::BTreeMap<FarmId, Money>,
    pub vehicles: std::collections::BTreeMap<VehicleId, FarmId>,
    pub vehicle_telemetry: std::collections::BTreeMap<VehicleId, VehicleTelemetry>,
    pub lands: std::collections::BTreeMap<LandId, FarmId>,
    pub land_telemetry: std::collections::BTreeMap<LandId, LandTelemetry>,
    pub connection_farm: Option<FarmId>,
    pub weather: Weather,
}

#[cfg(any(test, feature = "test-support"))]
impl StubHost {
    pub fn new() -> Self {
        StubHost {
            now: 0,
            month_ticks: 30 * 24 * 60 * 60 * 1000,
            frame_ticks: 1000,
            farms: std::collections::BTreeMap::new(),
            vehicles: std::collections::BTreeMap::new(),
            vehicle_telemetry: std::collections::BTreeMap::new(),
            lands: std::collections::BTreeMap::new(),
            land_telemetry: std::collections::BTreeMap::new(),
            connection_farm: None,
            weather: Weather::Clear,
        }
    }

    /// Registers a farm's starting balance. The first farm registered
    /// becomes the stub's authenticated connection identity (matching
    /// every single-farm test in this suite); call
    /// [`StubHost::with_connection_farm`] explicitly to model a
    /// connection acting on a farm it does not own.
    pub fn with_farm(mut self, farm_id: FarmId, money: Money) -> Self {
        self.farms.insert(farm_id, money);
        if self.connection_farm.is_none() {
            self.connection_farm = Some(farm_id);
        }
        self
    }

    /// Overrides which farm the stub's connection is authenticated as
    /// (spec.md §4.7 #1 "the connection's identity must own the farmId").
    pub fn with_connection_farm(mut self, farm_id: Option<FarmId>) -> Self {
        self.connection_farm = farm_id;
        self
    }

    pub fn with_vehicle_telemetry(mut self, vehicle_id: VehicleId, telemetry: VehicleTelemetry) -> Self {
        self.vehicle_telemetry.insert(vehicle_id, telemetry);
        self
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for StubHost {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl HostGameApi for StubHost {
    fn now(&self) -> GameTime {
        self.now
    }

    fn game_month_ticks(&self) -> GameTime {
        self.month_ticks
    }

    fn game_frame_ticks(&self) -> GameTime {
        self.frame_ticks
    }

    fn farm_exists(&self, farm_id: FarmId) -> bool {
        self.farms.contains_key(&farm_id)
    }

    fn farm_money(&self, farm_id: FarmId) -> Option<Money> {
        self.farms.get(&farm_id).copied()
    }

    fn add_money(&mut self, farm_id: FarmId, delta: Money) -> bool {
        match self.farms.get_mut(&farm_id) {
            Some(balance) => {
                *balance = *balance + delta;
                true
            }
            None => false,
        }
    }

    fn connection_farm_id(&self) -> Option<FarmId> {
        self.connection_farm
    }

    fn vehicle_owner(&self, vehicle_id: VehicleId) -> Option<FarmId> {
        self.vehicles.get(&vehicle_id).copied()
    }

    fn vehicle_exists(&self, vehicle_id: VehicleId) -> bool {
        self.vehicles.contains_key(&vehicle_id)
    }

    fn vehicle_sale_price(&self, vehicle_id: VehicleId) -> Money {
        self.vehicle_telemetry.get(&vehicle_id).map(|t| t.sale_price).unwrap_or(Money::ZERO)
    }

    fn vehicle_damage(&self, vehicle_id: VehicleId) -> f64 {
        self.vehicle_telemetry.get(&vehicle_id).map(|t| t.damage).unwrap_or(0.0)
    }

    fn vehicle_wear(&self, vehicle_id: VehicleId) -> f64 {
        self.vehicle_telemetry.get(&vehicle_id).map(|t| t.wear).unwrap_or(0.0)
    }

    fn vehicle_hours(&self, vehicle_id: VehicleId) -> f64 {
        self.vehicle_telemetry.get(&vehicle_id).map(|t| t.hours).unwrap_or(0.0)
    }

    fn vehicle_load(&self, vehicle_id: VehicleId) -> f64 {
        self.vehicle_telemetry.get(&vehicle_id).map(|t| t.load).unwrap_or(0.0)
    }

    fn add_vehicle_damage(&mut self, vehicle_id: VehicleId, delta: f64) {
        let entry = self.vehicle_telemetry.entry(vehicle_id).or_default();
        entry.damage = (entry.damage + delta).clamp(0.0, 1.0);
    }

    fn land_owner(&self, land_id: LandId) -> Option<FarmId> {
        self.lands.get(&land_id).copied()
    }

    fn land_exists(&self, land_id: LandId) -> bool {
        self.lands.contains_key(&land_id)
    }

    fn land_acres(&self, land_id: LandId) -> f64 {
        self.land_telemetry.get(&land_id).map(|t| t.acres).unwrap_or(0.0)
    }

    fn land_soil_quality(&self, land_id: LandId) -> f64 {
        self.land_telemetry.get(&land_id).map(|t| t.soil_quality).unwrap_or(0.0)
    }

    fn current_weather(&self) -> Weather {
        self.weather
    }
}
