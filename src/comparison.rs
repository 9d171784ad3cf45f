// Background fetch orchestration for lap comparisons

use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use log::{debug, error};

use crate::provider::{LapTelemetry, TelemetryProvider};

/// Identifies which of the two driver selectors an outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverSlot {
    A,
    B,
}

impl DriverSlot {
    pub const ALL: [DriverSlot; 2] = [DriverSlot::A, DriverSlot::B];

    pub fn label(&self) -> &'static str {
        match self {
            DriverSlot::A => "Driver A",
            DriverSlot::B => "Driver B",
        }
    }
}

/// The selections captured when the user asks for a comparison. Built from
/// the UI state at the moment the button is pressed and dropped once the
/// fetch workers are running.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRequest {
    pub circuit: String,
    pub driver_a: Option<String>,
    pub driver_b: Option<String>,
}

impl ComparisonRequest {
    /// The driver slots this request actually fills.
    pub fn slots(&self) -> Vec<(DriverSlot, String)> {
        let mut slots = Vec::with_capacity(2);
        if let Some(driver) = &self.driver_a {
            slots.push((DriverSlot::A, driver.clone()));
        }
        if let Some(driver) = &self.driver_b {
            slots.push((DriverSlot::B, driver.clone()));
        }
        slots
    }
}

/// What a fetch worker produced for one driver slot. Every retrieval
/// failure collapses into `NoData`; the worker has already logged the cause.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Telemetry(Box<LapTelemetry>),
    NoData { driver: String },
}

/// A fetch outcome tagged with the slot it fills and the generation of the
/// request that started it, so outcomes of superseded requests can be told
/// apart from current ones.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotOutcome {
    pub generation: u64,
    pub slot: DriverSlot,
    pub outcome: FetchOutcome,
}

/// Spawn one fetch worker per filled driver slot of the request. Each worker
/// retrieves the driver's fastest lap through the shared provider and posts
/// a single tagged outcome back on the channel. Workers of a superseded
/// request keep running; their outcomes are discarded by the generation tag
/// on the receiving side.
pub fn start_comparison(
    provider: Arc<dyn TelemetryProvider>,
    season: u16,
    request: &ComparisonRequest,
    generation: u64,
    sender: &Sender<SlotOutcome>,
) -> Vec<JoinHandle<()>> {
    request
        .slots()
        .into_iter()
        .map(|(slot, driver)| {
            spawn_fetch(
                provider.clone(),
                season,
                request.circuit.clone(),
                slot,
                driver,
                generation,
                sender.clone(),
            )
        })
        .collect()
}

fn spawn_fetch(
    provider: Arc<dyn TelemetryProvider>,
    season: u16,
    circuit: String,
    slot: DriverSlot,
    driver: String,
    generation: u64,
    sender: Sender<SlotOutcome>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let outcome = match provider.fastest_lap_telemetry(season, &circuit, &driver) {
            Ok(lap) => FetchOutcome::Telemetry(Box::new(lap)),
            Err(e) => {
                error!("Telemetry unavailable for {} at {}: {}", driver, circuit, e);
                FetchOutcome::NoData { driver }
            }
        };

        let tagged = SlotOutcome {
            generation,
            slot,
            outcome,
        };
        if let Err(e) = sender.send(tagged) {
            debug!("Dropping fetch outcome, UI channel closed: {}", e);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::OvercutError;
    use crate::provider::CircuitEvent;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    struct SingleLapProvider {
        driver: String,
        fetches: AtomicUsize,
    }

    impl SingleLapProvider {
        fn new(driver: &str) -> Self {
            Self {
                driver: driver.to_string(),
                fetches: AtomicUsize::new(0),
            }
        }
    }

    impl TelemetryProvider for SingleLapProvider {
        fn event_schedule(&self, _season: u16) -> Result<Vec<CircuitEvent>, OvercutError> {
            Ok(Vec::new())
        }

        fn race_drivers(&self, _season: u16, _circuit: &str) -> Result<Vec<String>, OvercutError> {
            Ok(vec![self.driver.clone()])
        }

        fn fastest_lap_telemetry(
            &self,
            _season: u16,
            _circuit: &str,
            driver: &str,
        ) -> Result<LapTelemetry, OvercutError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if driver.eq_ignore_ascii_case(&self.driver) {
                Ok(LapTelemetry {
                    driver: driver.to_uppercase(),
                    lap_number: 1,
                    lap_time_s: 90.0,
                    samples: Vec::new(),
                })
            } else {
                Err(OvercutError::UnknownDriver {
                    driver: driver.to_string(),
                })
            }
        }
    }

    #[test]
    fn test_request_slots_skip_absent_drivers() {
        let request = ComparisonRequest {
            circuit: "Bahrain Grand Prix".to_string(),
            driver_a: None,
            driver_b: Some("LEC".to_string()),
        };
        assert_eq!(request.slots(), vec![(DriverSlot::B, "LEC".to_string())]);

        let empty = ComparisonRequest {
            circuit: "Bahrain Grand Prix".to_string(),
            driver_a: None,
            driver_b: None,
        };
        assert!(empty.slots().is_empty());
    }

    #[test]
    fn test_one_worker_per_filled_slot() {
        let provider = Arc::new(SingleLapProvider::new("LEC"));
        let (tx, rx) = mpsc::channel();

        let request = ComparisonRequest {
            circuit: "Bahrain Grand Prix".to_string(),
            driver_a: None,
            driver_b: Some("LEC".to_string()),
        };
        let handles = start_comparison(provider.clone(), 2023, &request, 1, &tx);
        assert_eq!(handles.len(), 1);
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(provider.fetches.load(Ordering::SeqCst), 1);
        let outcome = rx.try_recv().unwrap();
        assert_eq!(outcome.generation, 1);
        assert_eq!(outcome.slot, DriverSlot::B);
        assert!(matches!(outcome.outcome, FetchOutcome::Telemetry(_)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_provider_failure_becomes_no_data() {
        let provider = Arc::new(SingleLapProvider::new("LEC"));
        let (tx, rx) = mpsc::channel();

        let request = ComparisonRequest {
            circuit: "Bahrain Grand Prix".to_string(),
            driver_a: Some("XXX".to_string()),
            driver_b: None,
        };
        for handle in start_comparison(provider, 2023, &request, 7, &tx) {
            handle.join().unwrap();
        }

        let outcome = rx.recv().unwrap();
        assert_eq!(outcome.slot, DriverSlot::A);
        assert_eq!(
            outcome.outcome,
            FetchOutcome::NoData {
                driver: "XXX".to_string()
            }
        );
    }

    #[test]
    fn test_worker_survives_closed_channel() {
        let provider = Arc::new(SingleLapProvider::new("LEC"));
        let (tx, rx) = mpsc::channel();
        drop(rx);

        let request = ComparisonRequest {
            circuit: "Bahrain Grand Prix".to_string(),
            driver_a: Some("LEC".to_string()),
            driver_b: None,
        };
        for handle in start_comparison(provider, 2023, &request, 1, &tx) {
            // a panic in the worker would surface here
            handle.join().unwrap();
        }
    }
}
