// Telemetry retrieval for historical race sessions

pub mod cache;
pub mod openf1;

use crate::errors::OvercutError;

/// One race weekend in a season schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitEvent {
    /// Upstream key identifying the race weekend
    pub meeting_key: u32,
    /// Display name of the event, e.g. "Bahrain Grand Prix"
    pub name: String,
    /// Short circuit name, e.g. "Sakhir"
    pub circuit: String,
    /// Country the event is held in
    pub country: String,
}

/// One telemetry record of a lap. Samples are ordered by time and immutable
/// once the lap has been assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySample {
    /// Elapsed time since the first sample of the lap, in seconds
    pub time_s: f64,
    /// Distance covered since the first sample of the lap, in meters
    pub distance_m: f64,
    /// Car speed in km/h
    pub speed_kmh: f64,
    /// Selected gear, 0 for neutral
    pub gear: u8,
    /// Throttle pedal input, 0 to 100
    pub throttle_pct: f64,
    /// Brake pedal input, 0 to 100
    pub brake_pct: f64,
    /// Whether the DRS flap was open
    pub drs_open: bool,
}

/// The fastest lap a driver set in a race, with the telemetry recorded
/// during it.
#[derive(Debug, Clone, PartialEq)]
pub struct LapTelemetry {
    /// Driver acronym, upper case, e.g. "VER"
    pub driver: String,
    /// Lap number within the race, starting at 1
    pub lap_number: u32,
    /// Lap time in seconds
    pub lap_time_s: f64,
    /// Telemetry samples covering the lap, ordered by time
    pub samples: Vec<TelemetrySample>,
}

impl LapTelemetry {
    /// Distance covered by the lap according to its last sample.
    pub fn lap_distance_m(&self) -> f64 {
        self.samples.last().map(|s| s.distance_m).unwrap_or(0.0)
    }

    /// Lap time formatted for display, e.g. "1:32.608".
    pub fn lap_time_label(&self) -> String {
        let minutes = (self.lap_time_s / 60.0).floor() as u64;
        let seconds = self.lap_time_s - (minutes as f64) * 60.0;
        format!("{}:{:06.3}", minutes, seconds)
    }
}

/// A source of historical race telemetry.
///
/// This trait abstracts the timing data backend so the UI and the fetch
/// workers never deal with HTTP directly. The shipped implementation talks
/// to the OpenF1 REST API; tests substitute scripted implementations.
///
/// Implementations are shared across fetch worker threads behind an `Arc`,
/// so every method takes `&self` and must be safe to call concurrently.
///
/// # Lifecycle
///
/// 1. Call `event_schedule()` once at startup to populate the circuit list
/// 2. Call `race_drivers()` once at startup to populate the driver lists
/// 3. Call `fastest_lap_telemetry()` from a worker thread per comparison slot
pub trait TelemetryProvider: Send + Sync {
    /// List the race weekends of a season, in calendar order.
    ///
    /// # Errors
    ///
    /// Returns an error if the schedule cannot be retrieved or decoded.
    fn event_schedule(&self, season: u16) -> Result<Vec<CircuitEvent>, OvercutError>;

    /// List the driver acronyms that took part in a race, sorted and
    /// deduplicated. The circuit query is matched against the schedule the
    /// same way `fastest_lap_telemetry` matches it.
    ///
    /// # Errors
    ///
    /// Returns an error if the circuit does not resolve to a race session
    /// or the roster cannot be retrieved.
    fn race_drivers(&self, season: u16, circuit: &str) -> Result<Vec<String>, OvercutError>;

    /// Fetch the telemetry of the fastest timed lap a driver set in a race.
    ///
    /// The driver acronym is matched case-insensitively. Laps without a
    /// recorded duration (in-laps, out-laps, red flags) are never selected.
    ///
    /// # Errors
    ///
    /// Returns an error if the circuit or driver cannot be resolved, if the
    /// driver set no timed lap, or if retrieval fails. Callers on the fetch
    /// path are expected to collapse all of these into a missing trace
    /// rather than surface them.
    fn fastest_lap_telemetry(
        &self,
        season: u16,
        circuit: &str,
        driver: &str,
    ) -> Result<LapTelemetry, OvercutError>;
}
