// Retained chart state and the stacked metric plots

use egui::{Color32, RichText, Ui, Vec2b};
use egui_plot::{Legend, Line};
use log::debug;

use crate::comparison::{DriverSlot, FetchOutcome, SlotOutcome};
use crate::provider::{LapTelemetry, TelemetrySample};

const ROW_HEADER_SPACE: f32 = 22.;
const MIN_ROW_HEIGHT: f32 = 70.;

pub const DEFAULT_DRIVER_COLOR: Color32 = Color32::GRAY;

// Team colors for the 2023 grid, keyed by driver acronym. Teammates share
// a color, unknown acronyms fall back to DEFAULT_DRIVER_COLOR.
const DRIVER_COLORS: &[(&str, Color32)] = &[
    ("VER", Color32::from_rgb(0, 0, 139)),
    ("PER", Color32::from_rgb(0, 0, 139)),
    ("HAM", Color32::from_rgb(135, 206, 235)),
    ("RUS", Color32::from_rgb(135, 206, 235)),
    ("LEC", Color32::from_rgb(220, 0, 0)),
    ("SAI", Color32::from_rgb(220, 0, 0)),
    ("NOR", Color32::from_rgb(255, 135, 0)),
    ("PIA", Color32::from_rgb(255, 135, 0)),
    ("ALO", Color32::from_rgb(53, 140, 117)),
    ("STR", Color32::from_rgb(53, 140, 117)),
    ("GAS", Color32::from_rgb(34, 147, 209)),
    ("OCO", Color32::from_rgb(34, 147, 209)),
    ("ALB", Color32::from_rgb(55, 190, 221)),
    ("SAR", Color32::from_rgb(55, 190, 221)),
    ("TSU", Color32::from_rgb(94, 143, 170)),
    ("DEV", Color32::from_rgb(94, 143, 170)),
    ("RIC", Color32::from_rgb(94, 143, 170)),
    ("LAW", Color32::from_rgb(94, 143, 170)),
    ("BOT", Color32::from_rgb(201, 45, 75)),
    ("ZHO", Color32::from_rgb(201, 45, 75)),
    ("MAG", Color32::from_rgb(182, 186, 189)),
    ("HUL", Color32::from_rgb(182, 186, 189)),
];

/// Trace color for a driver acronym. Deterministic and case-insensitive.
pub fn driver_color(acronym: &str) -> Color32 {
    let upper = acronym.trim().to_uppercase();
    DRIVER_COLORS
        .iter()
        .find(|(name, _)| *name == upper)
        .map(|(_, color)| *color)
        .unwrap_or(DEFAULT_DRIVER_COLOR)
}

/// The chart rows, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Speed,
    Gear,
    Throttle,
    Brake,
    Drs,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Speed,
        Metric::Gear,
        Metric::Throttle,
        Metric::Brake,
        Metric::Drs,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Speed => "Speed [km/h]",
            Metric::Gear => "Gear",
            Metric::Throttle => "Throttle [%]",
            Metric::Brake => "Brake [%]",
            Metric::Drs => "DRS",
        }
    }

    fn plot_id(&self) -> &'static str {
        match self {
            Metric::Speed => "speed_plot",
            Metric::Gear => "gear_plot",
            Metric::Throttle => "throttle_plot",
            Metric::Brake => "brake_plot",
            Metric::Drs => "drs_plot",
        }
    }

    pub fn sample_value(&self, sample: &TelemetrySample) -> f64 {
        match self {
            Metric::Speed => sample.speed_kmh,
            Metric::Gear => sample.gear as f64,
            Metric::Throttle => sample.throttle_pct,
            Metric::Brake => sample.brake_pct,
            Metric::Drs => {
                if sample.drs_open {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Fixed vertical range of the row, so rows keep their shape when
    /// traces come and go.
    fn y_bounds(&self) -> (f64, f64) {
        match self {
            Metric::Speed => (0.0, 370.0),
            Metric::Gear => (0.0, 9.0),
            Metric::Throttle | Metric::Brake => (0.0, 105.0),
            Metric::Drs => (-0.05, 1.25),
        }
    }
}

/// Plot points of one metric over lap distance.
pub fn metric_points(lap: &LapTelemetry, metric: Metric) -> Vec<[f64; 2]> {
    lap.samples
        .iter()
        .map(|s| [s.distance_m, metric.sample_value(s)])
        .collect()
}

/// The retained state behind the comparison charts: at most one trace per
/// driver slot, plus the notices shown when a fetch came back empty.
///
/// Outcomes carry the generation of the request that started them; anything
/// tagged with an older generation is ignored, so a late worker from a
/// superseded comparison can never overwrite fresher traces.
pub struct ChartState {
    generation: u64,
    traces: [Option<LapTelemetry>; 2],
    notices: Vec<String>,
}

impl Default for ChartState {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartState {
    pub fn new() -> Self {
        Self {
            generation: 0,
            traces: [None, None],
            notices: Vec::new(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Clear all traces and notices and advance to the given request
    /// generation. Called before the fetch workers of a new comparison are
    /// spawned, so no trace of an earlier request survives into the new one.
    pub fn begin_request(&mut self, generation: u64) {
        self.generation = generation;
        self.traces = [None, None];
        self.notices.clear();
    }

    /// Apply a fetch outcome. Returns false when the outcome belongs to a
    /// superseded request and was discarded.
    pub fn apply(&mut self, outcome: SlotOutcome) -> bool {
        if outcome.generation != self.generation {
            debug!(
                "Ignoring fetch outcome for {} from superseded request {} (current {})",
                outcome.slot.label(),
                outcome.generation,
                self.generation
            );
            return false;
        }

        match outcome.outcome {
            FetchOutcome::Telemetry(lap) => {
                self.traces[Self::slot_index(outcome.slot)] = Some(*lap);
            }
            FetchOutcome::NoData { driver } => {
                self.traces[Self::slot_index(outcome.slot)] = None;
                self.notices
                    .push(format!("No fastest-lap telemetry available for {}", driver));
            }
        }
        true
    }

    pub fn trace(&self, slot: DriverSlot) -> Option<&LapTelemetry> {
        self.traces[Self::slot_index(slot)].as_ref()
    }

    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    pub fn has_traces(&self) -> bool {
        self.traces.iter().any(|t| t.is_some())
    }

    /// Shared horizontal extent of all rows: the longest lap distance of
    /// the present traces.
    pub fn lap_distance_bound(&self) -> f64 {
        self.traces
            .iter()
            .flatten()
            .map(|lap| lap.lap_distance_m())
            .fold(0.0, f64::max)
    }

    /// Draw the five stacked metric rows. Every row is pinned to the same
    /// distance range and has interactions disabled, which keeps the
    /// horizontal axes aligned across rows.
    pub fn show(&self, ui: &mut Ui) {
        let rows = Metric::ALL.len() as f32;
        let row_height =
            ((ui.available_height() - ROW_HEADER_SPACE * rows) / rows).max(MIN_ROW_HEIGHT);
        let x_max = self.lap_distance_bound().max(1.0);

        for metric in Metric::ALL {
            let (y_min, y_max) = metric.y_bounds();
            ui.label(RichText::new(metric.label()).strong());
            egui_plot::Plot::new((metric.plot_id(), self.generation))
                .height(row_height)
                .show_background(false)
                .legend(Legend::default())
                .allow_drag(false)
                .allow_scroll(false)
                .allow_zoom(false)
                .include_x(0.)
                .include_x(x_max)
                .include_y(y_min)
                .include_y(y_max)
                .auto_bounds(Vec2b::new(false, false))
                .show(ui, |plot_ui| {
                    for slot in DriverSlot::ALL {
                        if let Some(lap) = self.trace(slot) {
                            let label = format!(
                                "{} lap {} ({})",
                                lap.driver,
                                lap.lap_number,
                                lap.lap_time_label()
                            );
                            plot_ui.line(
                                Line::new(label, metric_points(lap, metric))
                                    .color(driver_color(&lap.driver)),
                            );
                        }
                    }
                });
        }
    }

    fn slot_index(slot: DriverSlot) -> usize {
        match slot {
            DriverSlot::A => 0,
            DriverSlot::B => 1,
        }
    }
}
