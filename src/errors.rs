// Error types for overcut

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum OvercutError {
    // Errors for the timing API client
    #[snafu(display("Could not initialize HTTP client for the timing API"))]
    ApiClient { source: reqwest::Error },
    #[snafu(display("Could not initialize async runtime for the timing API client"))]
    ApiRuntime { source: io::Error },
    #[snafu(display("Request to timing API failed: {url}"))]
    ApiRequest {
        url: String,
        source: reqwest::Error,
    },
    #[snafu(display("Could not decode timing API payload from {url}"))]
    ApiPayload {
        url: String,
        source: serde_json::Error,
    },

    // Errors while resolving sessions and laps
    #[snafu(display("No event matches circuit '{circuit}' in the {season} schedule"))]
    UnknownCircuit { season: u16, circuit: String },
    #[snafu(display("No race session found for '{circuit}' in {season}"))]
    RaceSessionNotFound { season: u16, circuit: String },
    #[snafu(display("Driver '{driver}' did not take part in this session"))]
    UnknownDriver { driver: String },
    #[snafu(display("No timed laps recorded for driver '{driver}'"))]
    NoTimedLaps { driver: String },
    #[snafu(display("No telemetry samples recorded for driver '{driver}'"))]
    EmptyTelemetry { driver: String },

    // Response cache errors
    #[snafu(display("Could not find a cache directory for timing API responses"))]
    NoCacheDir,
    #[snafu(display("Could not create cache directory {path}"))]
    CacheDir { path: String, source: io::Error },
    #[snafu(display("Error writing cached response {path}"))]
    CacheWrite { path: String, source: io::Error },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },
}
