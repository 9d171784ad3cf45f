// Library interface for overcut
// This allows integration tests to access internal modules

pub mod comparison;
pub mod errors;
pub mod provider;
pub mod ui;

// Re-export commonly used types
pub use comparison::{ComparisonRequest, DriverSlot, FetchOutcome, SlotOutcome};
pub use errors::OvercutError;
pub use provider::{CircuitEvent, LapTelemetry, TelemetryProvider, TelemetrySample};
