//! Fixed interoperability constants (§6) plus the handful of values the spec
//! leaves as "implementation choice". The former are not meant to be tuned —
//! they exist here as named constants rather than magic numbers scattered
//! through the managers. The latter are grouped into [`SimConfig`], mirroring
//! the teacher's `WorldOptions` (`bootstrap.rs`).

/// Maximum absolute neighbor-height difference tolerated across a building
/// footprint before placement is rejected outright (§3).
pub const MAX_SLOPE: u8 = 8;

/// Hex-distance radius a building's territory claim paints (§4.6).
pub const BUILDING_TERRITORY_RADIUS: i32 = 6;

/// Default circular service radius assigned to a newly registered hub (§4.11).
pub const DEFAULT_SERVICE_RADIUS: f64 = 10.0;

/// Fatigue band upper bounds, inclusive: Fresh/Tired/Exhausted/Collapsed (§4.16).
pub const FATIGUE_FRESH_MAX: u8 = 25;
pub const FATIGUE_TIRED_MAX: u8 = 50;
pub const FATIGUE_EXHAUSTED_MAX: u8 = 75;
pub const FATIGUE_COLLAPSED_MAX: u8 = 100;

/// Request stall timeout, in seconds (§4.17 step 1).
pub const REQUEST_STALL_TIMEOUT_SECS: f64 = 30.0;

/// Interval, in seconds, at which the dispatcher scans for stalled requests.
pub const STALL_CHECK_INTERVAL_SECS: f64 = 5.0;

/// Maximum number of pending requests assigned per dispatcher tick.
pub const MAX_ASSIGNMENTS_PER_TICK: usize = 5;

/// Default factor applied to the nearest candidate's distance when preferring
/// a full-supply source over a strictly-nearest partial one (§4.15 step 5).
pub const DEFAULT_FULL_SUPPLY_DISTANCE_FACTOR: f64 = 1.5;

/// Ring search radii scanned, in order, when placing spawned units around a
/// newly completed building (§4.9 step 7).
pub const UNIT_SPAWN_RING_RADII: std::ops::RangeInclusive<i32> = 1..=4;

/// Ground type assigned to footprint tiles once terrain leveling has begun.
pub const CONSTRUCTION_SITE_GROUND_TYPE: u8 = 250;

/// Construction phase duration fractions, in phase order (Poles excluded —
/// it has zero duration): TerrainLeveling, ConstructionRising, CompletedRising.
pub const PHASE_DURATION_FRACTIONS: [f32; 3] = [0.20, 0.35, 0.45];

/// Bounded re-path attempts a stuck mover makes before giving up and emitting
/// `unit:movementStopped` with its `blocked` flag set (§4.10).
pub const MAX_REPATH_ATTEMPTS: u32 = 3;

/// Ticks a mover will wait for an occupied next-tile to clear before
/// requesting a re-path.
pub const BLOCKED_WAIT_TICKS: u32 = 2;

/// Tunable knobs the spec leaves as implementation choice. Defaults follow
/// the spec's own recommendations (§4.8, §10.4).
#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    /// Maximum `dt` consumed by a single fixed sub-step, in seconds.
    pub max_step_secs: f32,
    /// Sub-steps are accumulated and drained at `max_step_secs` each, rather
    /// than clamping a single oversized `dt` (recommended by §4.8).
    pub fixed_step: bool,
    /// Capacity of the per-tick A* path cache (§10.5).
    pub path_cache_capacity: usize,
    /// Distance factor used by the fulfillment matcher when no override is
    /// supplied (§4.15 step 5).
    pub full_supply_distance_factor: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_step_secs: 0.1,
            fixed_step: true,
            path_cache_capacity: 256,
            full_supply_distance_factor: DEFAULT_FULL_SUPPLY_DISTANCE_FACTOR,
        }
    }
}
