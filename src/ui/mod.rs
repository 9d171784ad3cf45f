// Application window: selectors on top, stacked comparison charts below

pub mod charts;
pub mod config;

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use egui::{Align, Color32, Layout, RichText, Visuals};
use log::{error, info};

use crate::comparison::{self, ComparisonRequest, SlotOutcome};
use crate::provider::{CircuitEvent, TelemetryProvider};
use charts::ChartState;
use config::AppConfig;

const REPAINT_WHILE_FETCHING_MS: u64 = 100;
const NO_DRIVER_LABEL: &str = "(none)";
const NOTICE_COLOR: Color32 = Color32::from_rgb(230, 180, 60);

/// `LapComparisonApp` lets the user pick a circuit and up to two drivers,
/// fetches each driver's fastest race lap on background threads, and renders
/// the traces as five stacked charts.
///
/// The UI thread never blocks on retrieval: fetch workers post tagged
/// outcomes over a channel and `update` drains it with `try_recv` before
/// drawing. Pressing the compare button again while fetches are running
/// starts a new request generation; whatever the superseded workers still
/// deliver is discarded.
pub struct LapComparisonApp {
    provider: Arc<dyn TelemetryProvider>,
    season: u16,
    schedule: Vec<CircuitEvent>,
    drivers: Vec<String>,
    selected_circuit: Option<String>,
    selected_driver_a: Option<String>,
    selected_driver_b: Option<String>,
    chart: ChartState,
    outcome_sender: Sender<SlotOutcome>,
    outcome_receiver: Receiver<SlotOutcome>,
    in_flight: usize,
    app_config: AppConfig,
}

impl LapComparisonApp {
    pub fn new(
        provider: Arc<dyn TelemetryProvider>,
        season: u16,
        schedule: Vec<CircuitEvent>,
        drivers: Vec<String>,
        app_config: AppConfig,
        cc: &eframe::CreationContext<'_>,
    ) -> Self {
        cc.egui_ctx.set_visuals(Visuals::dark());

        let selected_circuit = remembered_circuit(app_config.last_circuit.clone(), &schedule);
        let selected_driver_a = remembered_driver(app_config.last_driver_a.clone(), &drivers);
        let selected_driver_b = remembered_driver(app_config.last_driver_b.clone(), &drivers);

        let (outcome_sender, outcome_receiver) = mpsc::channel();

        Self {
            provider,
            season,
            schedule,
            drivers,
            selected_circuit,
            selected_driver_a,
            selected_driver_b,
            chart: ChartState::new(),
            outcome_sender,
            outcome_receiver,
            in_flight: 0,
            app_config,
        }
    }

    /// Capture the current selections, clear the charts, and spawn one
    /// fetch worker per selected driver.
    fn start_comparison(&mut self) {
        let Some(circuit) = self.selected_circuit.clone() else {
            return;
        };

        let request = ComparisonRequest {
            circuit,
            driver_a: self.selected_driver_a.clone(),
            driver_b: self.selected_driver_b.clone(),
        };

        let generation = self.chart.generation() + 1;
        self.chart.begin_request(generation);

        let handles = comparison::start_comparison(
            self.provider.clone(),
            self.season,
            &request,
            generation,
            &self.outcome_sender,
        );
        self.in_flight = handles.len();
        info!(
            "Fetching fastest laps for {} driver(s) at {}",
            self.in_flight, request.circuit
        );
    }

    fn selector_row(&mut self, ui: &mut egui::Ui) {
        ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
            ui.label(RichText::new("Circuit: ").color(Color32::WHITE));
            egui::ComboBox::from_id_salt("circuit_select")
                .selected_text(
                    self.selected_circuit
                        .as_deref()
                        .unwrap_or("Pick a circuit")
                        .to_string(),
                )
                .width(220.)
                .show_ui(ui, |ui| {
                    for event in &self.schedule {
                        ui.selectable_value(
                            &mut self.selected_circuit,
                            Some(event.name.clone()),
                            event.name.as_str(),
                        );
                    }
                });

            ui.separator();
            ui.label(RichText::new("Driver A: ").color(Color32::WHITE));
            Self::driver_combo(
                ui,
                "driver_a_select",
                &self.drivers,
                &mut self.selected_driver_a,
            );

            ui.separator();
            ui.label(RichText::new("Driver B: ").color(Color32::WHITE));
            Self::driver_combo(
                ui,
                "driver_b_select",
                &self.drivers,
                &mut self.selected_driver_b,
            );

            ui.separator();
            let can_compare = self.selected_circuit.is_some();
            if ui
                .add_enabled(can_compare, egui::Button::new("Compare telemetry"))
                .clicked()
            {
                self.start_comparison();
            }

            if self.in_flight > 0 {
                ui.spinner();
                ui.label("Fetching telemetry...");
            }
        });
    }

    fn driver_combo(
        ui: &mut egui::Ui,
        id: &'static str,
        drivers: &[String],
        selection: &mut Option<String>,
    ) {
        egui::ComboBox::from_id_salt(id)
            .selected_text(selection.as_deref().unwrap_or(NO_DRIVER_LABEL).to_string())
            .width(90.)
            .show_ui(ui, |ui| {
                ui.selectable_value(selection, None, NO_DRIVER_LABEL);
                for driver in drivers {
                    ui.selectable_value(selection, Some(driver.clone()), driver.as_str());
                }
            });
    }
}

impl eframe::App for LapComparisonApp {
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.app_config.last_circuit = self.selected_circuit.clone();
        self.app_config.last_driver_a = self.selected_driver_a.clone();
        self.app_config.last_driver_b = self.selected_driver_b.clone();

        if let Err(e) = self.app_config.save() {
            error!("Error while saving config file: {}", e);
        }
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // drain completed fetches without blocking the frame
        while let Ok(outcome) = self.outcome_receiver.try_recv() {
            if self.chart.apply(outcome) {
                self.in_flight = self.in_flight.saturating_sub(1);
            }
        }

        egui::TopBottomPanel::top("selectors")
            .min_height(30.)
            .show(ctx, |ui| {
                self.selector_row(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            for notice in self.chart.notices() {
                ui.colored_label(NOTICE_COLOR, notice);
            }
            if !self.chart.has_traces() && self.chart.notices().is_empty() && self.in_flight == 0 {
                ui.label("Pick a circuit and up to two drivers, then press Compare telemetry.");
            }
            self.chart.show(ui);
        });

        // keep draining while workers are still out
        if self.in_flight > 0 {
            ctx.request_repaint_after(Duration::from_millis(REPAINT_WHILE_FETCHING_MS));
        }
    }
}

fn remembered_circuit(saved: Option<String>, schedule: &[CircuitEvent]) -> Option<String> {
    saved.filter(|name| schedule.iter().any(|event| event.name == *name))
}

fn remembered_driver(saved: Option<String>, roster: &[String]) -> Option<String> {
    saved.filter(|driver| roster.contains(driver))
}
