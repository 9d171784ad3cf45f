// TelemetryProvider implementation backed by the OpenF1 REST API

use std::cmp::Ordering;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use itertools::Itertools;
use log::warn;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::errors::OvercutError;
use crate::provider::cache::ResponseCache;
use crate::provider::{CircuitEvent, LapTelemetry, TelemetryProvider, TelemetrySample};

const OPENF1_BASE_URL: &str = "https://api.openf1.org/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const KMH_PER_MPS: f64 = 3.6;

/// A race weekend as returned by the `meetings` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct MeetingRow {
    pub meeting_key: u32,
    pub meeting_name: String,
    pub circuit_short_name: String,
    pub country_name: String,
}

/// A session as returned by the `sessions` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionRow {
    pub session_key: u32,
}

/// A participant as returned by the `drivers` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DriverRow {
    pub driver_number: u32,
    pub name_acronym: String,
}

/// A lap as returned by the `laps` endpoint. In-laps, out-laps and laps cut
/// short by a red flag carry no duration.
#[derive(Debug, Clone, Deserialize)]
pub struct LapRow {
    pub lap_number: u32,
    pub lap_duration: Option<f64>,
    pub date_start: Option<DateTime<Utc>>,
}

/// One record of the `car_data` stream, sampled at roughly 3.7Hz.
#[derive(Debug, Clone, Deserialize)]
pub struct CarDataRow {
    pub date: DateTime<Utc>,
    pub speed: f64,
    pub n_gear: Option<u32>,
    pub throttle: Option<f64>,
    pub brake: Option<f64>,
    pub drs: Option<u8>,
}

/// Whether a raw DRS code from the car data stream means the flap is open.
/// Codes 10, 12 and 14 are open; 8 is armed but still closed.
pub fn drs_is_open(code: u8) -> bool {
    matches!(code, 10 | 12 | 14)
}

/// Build a lap from car data rows already windowed to the lap and sorted by
/// time. Distance is integrated from speed, so the horizontal axis does not
/// depend on wall-clock timestamps.
pub fn assemble_lap(
    driver: &str,
    lap_number: u32,
    lap_time_s: f64,
    rows: &[CarDataRow],
) -> Result<LapTelemetry, OvercutError> {
    let first = rows.first().ok_or_else(|| OvercutError::EmptyTelemetry {
        driver: driver.to_string(),
    })?;

    let mut samples = Vec::with_capacity(rows.len());
    let mut distance_m = 0.0;
    let mut prev_time_s = 0.0;

    for row in rows {
        let time_s = (row.date - first.date).num_milliseconds() as f64 / 1000.0;
        let dt = (time_s - prev_time_s).max(0.0);
        distance_m += row.speed / KMH_PER_MPS * dt;
        prev_time_s = time_s;

        samples.push(TelemetrySample {
            time_s,
            distance_m,
            speed_kmh: row.speed,
            gear: row.n_gear.unwrap_or(0) as u8,
            throttle_pct: row.throttle.unwrap_or(0.0).clamp(0.0, 100.0),
            brake_pct: row.brake.unwrap_or(0.0).clamp(0.0, 100.0),
            drs_open: row.drs.map(drs_is_open).unwrap_or(false),
        });
    }

    Ok(LapTelemetry {
        driver: driver.to_uppercase(),
        lap_number,
        lap_time_s,
        samples,
    })
}

/// A lap that actually has a start date and a duration.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TimedLap {
    lap_number: u32,
    started_at: DateTime<Utc>,
    duration_s: f64,
}

fn fastest_lap(laps: &[LapRow]) -> Option<TimedLap> {
    laps.iter()
        .filter_map(|l| match (l.date_start, l.lap_duration) {
            (Some(started_at), Some(duration_s)) => Some(TimedLap {
                lap_number: l.lap_number,
                started_at,
                duration_s,
            }),
            _ => None,
        })
        .min_by(|a, b| {
            a.duration_s
                .partial_cmp(&b.duration_s)
                .unwrap_or(Ordering::Equal)
        })
}

/// Match a circuit query against the schedule the way users type it: an
/// exact (case-insensitive) hit on the event name, circuit short name or
/// country wins, otherwise the first event whose name contains the query.
fn find_meeting<'a>(meetings: &'a [MeetingRow], query: &str) -> Option<&'a MeetingRow> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return None;
    }

    meetings
        .iter()
        .find(|m| {
            m.meeting_name.to_lowercase() == query
                || m.circuit_short_name.to_lowercase() == query
                || m.country_name.to_lowercase() == query
        })
        .or_else(|| {
            meetings
                .iter()
                .find(|m| m.meeting_name.to_lowercase().contains(&query))
        })
}

/// Timing data client for the public OpenF1 API.
///
/// Every request is offered to an on-disk response cache first, so repeated
/// comparisons of the same race work offline and do not hammer the API. The
/// async HTTP client is driven by an owned single-threaded runtime; calls
/// from concurrent fetch workers are serialized by `block_on`, which is fine
/// because a comparison issues at most a handful of small requests.
pub struct OpenF1Provider {
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    cache: ResponseCache,
}

impl OpenF1Provider {
    /// Create a provider caching responses under the given directory.
    pub fn new(cache_dir: PathBuf) -> Result<Self, OvercutError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| OvercutError::ApiRuntime { source: e })?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| OvercutError::ApiClient { source: e })?;

        Ok(Self {
            client,
            runtime,
            cache: ResponseCache::new(cache_dir)?,
        })
    }

    /// GET a URL and decode its JSON body, going through the cache.
    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, OvercutError> {
        if let Some(body) = self.cache.lookup(url) {
            match serde_json::from_str(&body) {
                Ok(decoded) => return Ok(decoded),
                Err(e) => warn!("Discarding unreadable cached response for {}: {}", url, e),
            }
        }

        let body = self
            .runtime
            .block_on(async {
                self.client
                    .get(url)
                    .send()
                    .await?
                    .error_for_status()?
                    .text()
                    .await
            })
            .map_err(|e| OvercutError::ApiRequest {
                url: url.to_string(),
                source: e,
            })?;

        let decoded = serde_json::from_str(&body).map_err(|e| OvercutError::ApiPayload {
            url: url.to_string(),
            source: e,
        })?;

        // a failed cache write only costs a refetch next time
        if let Err(e) = self.cache.store(url, &body) {
            warn!("Could not cache response for {}: {}", url, e);
        }

        Ok(decoded)
    }

    fn meetings(&self, season: u16) -> Result<Vec<MeetingRow>, OvercutError> {
        let url = format!("{}/meetings?year={}", OPENF1_BASE_URL, season);
        self.get_json(&url)
    }

    fn session_drivers(&self, session_key: u32) -> Result<Vec<DriverRow>, OvercutError> {
        let url = format!("{}/drivers?session_key={}", OPENF1_BASE_URL, session_key);
        self.get_json(&url)
    }

    /// Resolve a circuit query to the session key of its race.
    fn resolve_race(&self, season: u16, circuit: &str) -> Result<u32, OvercutError> {
        let meetings = self.meetings(season)?;
        let meeting =
            find_meeting(&meetings, circuit).ok_or_else(|| OvercutError::UnknownCircuit {
                season,
                circuit: circuit.to_string(),
            })?;

        let url = format!(
            "{}/sessions?meeting_key={}&session_name=Race",
            OPENF1_BASE_URL, meeting.meeting_key
        );
        let sessions: Vec<SessionRow> = self.get_json(&url)?;

        sessions
            .first()
            .map(|s| s.session_key)
            .ok_or_else(|| OvercutError::RaceSessionNotFound {
                season,
                circuit: circuit.to_string(),
            })
    }

    fn resolve_driver(&self, session_key: u32, driver: &str) -> Result<u32, OvercutError> {
        let drivers = self.session_drivers(session_key)?;
        drivers
            .iter()
            .find(|d| d.name_acronym.eq_ignore_ascii_case(driver.trim()))
            .map(|d| d.driver_number)
            .ok_or_else(|| OvercutError::UnknownDriver {
                driver: driver.to_string(),
            })
    }
}

impl TelemetryProvider for OpenF1Provider {
    fn event_schedule(&self, season: u16) -> Result<Vec<CircuitEvent>, OvercutError> {
        let meetings = self.meetings(season)?;
        Ok(meetings
            .into_iter()
            .map(|m| CircuitEvent {
                meeting_key: m.meeting_key,
                name: m.meeting_name,
                circuit: m.circuit_short_name,
                country: m.country_name,
            })
            .collect())
    }

    fn race_drivers(&self, season: u16, circuit: &str) -> Result<Vec<String>, OvercutError> {
        let session_key = self.resolve_race(season, circuit)?;
        let drivers = self.session_drivers(session_key)?;
        Ok(drivers
            .into_iter()
            .map(|d| d.name_acronym.to_uppercase())
            .sorted()
            .dedup()
            .collect())
    }

    fn fastest_lap_telemetry(
        &self,
        season: u16,
        circuit: &str,
        driver: &str,
    ) -> Result<LapTelemetry, OvercutError> {
        let session_key = self.resolve_race(season, circuit)?;
        let driver_number = self.resolve_driver(session_key, driver)?;

        let url = format!(
            "{}/laps?session_key={}&driver_number={}",
            OPENF1_BASE_URL, session_key, driver_number
        );
        let laps: Vec<LapRow> = self.get_json(&url)?;
        let best = fastest_lap(&laps).ok_or_else(|| OvercutError::NoTimedLaps {
            driver: driver.to_string(),
        })?;

        let window_end =
            best.started_at + chrono::Duration::milliseconds((best.duration_s * 1000.0) as i64);
        let url = format!(
            "{}/car_data?session_key={}&driver_number={}&date>={}&date<{}",
            OPENF1_BASE_URL,
            session_key,
            driver_number,
            best.started_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            window_end.to_rfc3339_opts(SecondsFormat::Millis, true)
        );
        let mut rows: Vec<CarDataRow> = self.get_json(&url)?;
        rows.sort_by_key(|r| r.date);

        assemble_lap(driver, best.lap_number, best.duration_s, &rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn meeting(name: &str, circuit: &str, country: &str) -> MeetingRow {
        MeetingRow {
            meeting_key: 1141,
            meeting_name: name.to_string(),
            circuit_short_name: circuit.to_string(),
            country_name: country.to_string(),
        }
    }

    fn schedule_2023() -> Vec<MeetingRow> {
        vec![
            meeting("Bahrain Grand Prix", "Sakhir", "Bahrain"),
            meeting("Emilia Romagna Grand Prix", "Imola", "Italy"),
            meeting("Italian Grand Prix", "Monza", "Italy"),
            meeting("Abu Dhabi Grand Prix", "Yas Marina Circuit", "United Arab Emirates"),
        ]
    }

    fn row_at(offset_ms: i64, speed: f64) -> CarDataRow {
        let base = Utc.with_ymd_and_hms(2023, 4, 2, 15, 0, 0).unwrap();
        CarDataRow {
            date: base + chrono::Duration::milliseconds(offset_ms),
            speed,
            n_gear: Some(6),
            throttle: Some(100.0),
            brake: Some(0.0),
            drs: Some(0),
        }
    }

    #[test]
    fn test_find_meeting_by_country() {
        let schedule = schedule_2023();
        let found = find_meeting(&schedule, "Bahrain").unwrap();
        assert_eq!(found.meeting_name, "Bahrain Grand Prix");
    }

    #[test]
    fn test_find_meeting_is_case_insensitive() {
        let schedule = schedule_2023();
        let found = find_meeting(&schedule, "monza").unwrap();
        assert_eq!(found.meeting_name, "Italian Grand Prix");
    }

    #[test]
    fn test_find_meeting_falls_back_to_name_substring() {
        let schedule = schedule_2023();
        let found = find_meeting(&schedule, "abu dhabi").unwrap();
        assert_eq!(found.circuit_short_name, "Yas Marina Circuit");
    }

    #[test]
    fn test_find_meeting_prefers_exact_circuit_over_shared_country() {
        // Two events share "Italy", a circuit name must not be shadowed
        let schedule = schedule_2023();
        let found = find_meeting(&schedule, "Imola").unwrap();
        assert_eq!(found.meeting_name, "Emilia Romagna Grand Prix");
    }

    #[test]
    fn test_find_meeting_rejects_unknown_and_empty_queries() {
        let schedule = schedule_2023();
        assert!(find_meeting(&schedule, "Atlantis").is_none());
        assert!(find_meeting(&schedule, "").is_none());
        assert!(find_meeting(&schedule, "   ").is_none());
    }

    #[test]
    fn test_fastest_lap_picks_minimum_duration() {
        let base = Utc.with_ymd_and_hms(2023, 4, 2, 15, 0, 0).unwrap();
        let laps = vec![
            LapRow {
                lap_number: 1,
                lap_duration: None,
                date_start: Some(base),
            },
            LapRow {
                lap_number: 2,
                lap_duration: Some(93.411),
                date_start: Some(base),
            },
            LapRow {
                lap_number: 3,
                lap_duration: Some(92.608),
                date_start: Some(base),
            },
            LapRow {
                lap_number: 4,
                lap_duration: Some(95.002),
                date_start: None,
            },
        ];

        let best = fastest_lap(&laps).unwrap();
        assert_eq!(best.lap_number, 3);
        assert_eq!(best.duration_s, 92.608);
    }

    #[test]
    fn test_fastest_lap_needs_at_least_one_timed_lap() {
        let base = Utc.with_ymd_and_hms(2023, 4, 2, 15, 0, 0).unwrap();
        let laps = vec![
            LapRow {
                lap_number: 1,
                lap_duration: None,
                date_start: Some(base),
            },
            LapRow {
                lap_number: 2,
                lap_duration: Some(92.0),
                date_start: None,
            },
        ];
        assert!(fastest_lap(&laps).is_none());
        assert!(fastest_lap(&[]).is_none());
    }

    #[test]
    fn test_assemble_lap_integrates_distance_from_speed() {
        // 36 km/h over one second covers 10m, 72 km/h covers 20m
        let rows = vec![row_at(0, 0.0), row_at(1000, 36.0), row_at(2000, 72.0)];
        let lap = assemble_lap("ver", 3, 92.608, &rows).unwrap();

        assert_eq!(lap.driver, "VER");
        assert_eq!(lap.samples.len(), 3);
        assert_eq!(lap.samples[0].distance_m, 0.0);
        assert!((lap.samples[1].distance_m - 10.0).abs() < 1e-9);
        assert!((lap.samples[2].distance_m - 30.0).abs() < 1e-9);
        assert_eq!(lap.samples[2].time_s, 2.0);
    }

    #[test]
    fn test_assemble_lap_defaults_missing_channels() {
        let rows = vec![CarDataRow {
            date: Utc.with_ymd_and_hms(2023, 4, 2, 15, 0, 0).unwrap(),
            speed: 100.0,
            n_gear: None,
            throttle: None,
            brake: None,
            drs: None,
        }];
        let lap = assemble_lap("HAM", 1, 90.0, &rows).unwrap();

        assert_eq!(lap.samples[0].gear, 0);
        assert_eq!(lap.samples[0].throttle_pct, 0.0);
        assert_eq!(lap.samples[0].brake_pct, 0.0);
        assert!(!lap.samples[0].drs_open);
    }

    #[test]
    fn test_assemble_lap_rejects_empty_window() {
        let err = assemble_lap("HAM", 1, 90.0, &[]).unwrap_err();
        assert!(matches!(err, OvercutError::EmptyTelemetry { .. }));
    }

    #[test]
    fn test_drs_codes() {
        for open in [10, 12, 14] {
            assert!(drs_is_open(open));
        }
        for closed in [0, 1, 2, 3, 8, 9] {
            assert!(!drs_is_open(closed));
        }
    }

    #[test]
    fn test_car_data_rows_decode_from_api_payload() {
        // Shape taken from a live car_data response, extra fields included
        let body = r#"[
            {
                "brake": 0,
                "date": "2023-09-16T13:08:19.923000+00:00",
                "driver_number": 55,
                "drs": 12,
                "meeting_key": 1219,
                "n_gear": 8,
                "rpm": 11141,
                "session_key": 9161,
                "speed": 315,
                "throttle": 99
            },
            {
                "brake": 100,
                "date": "2023-09-16T13:08:20.203000+00:00",
                "driver_number": 55,
                "drs": 8,
                "meeting_key": 1219,
                "n_gear": null,
                "rpm": 10374,
                "session_key": 9161,
                "speed": 291,
                "throttle": 0
            }
        ]"#;

        let rows: Vec<CarDataRow> = serde_json::from_str(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].speed, 315.0);
        assert_eq!(rows[0].drs, Some(12));
        assert_eq!(rows[1].n_gear, None);
        assert_eq!(rows[1].brake, Some(100.0));
    }

    #[test]
    fn test_lap_rows_decode_null_durations() {
        let body = r#"[
            {
                "date_start": "2023-09-16T13:03:35.200000+00:00",
                "driver_number": 55,
                "lap_duration": null,
                "lap_number": 1,
                "session_key": 9161
            },
            {
                "date_start": "2023-09-16T13:05:21.201000+00:00",
                "driver_number": 55,
                "lap_duration": 105.724,
                "lap_number": 2,
                "session_key": 9161
            }
        ]"#;

        let laps: Vec<LapRow> = serde_json::from_str(body).unwrap();
        assert_eq!(laps[0].lap_duration, None);
        assert_eq!(laps[1].lap_duration, Some(105.724));
        assert!(laps[1].date_start.is_some());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn assembled_distance_and_time_never_decrease(
            steps in prop::collection::vec((1u64..2000u64, 0.0f64..370.0f64), 1..200)
        ) {
            let mut offset_ms: i64 = 0;
            let mut rows = Vec::with_capacity(steps.len());
            for (dt_ms, speed) in steps {
                offset_ms += dt_ms as i64;
                rows.push(row_at(offset_ms, speed));
            }

            let lap = assemble_lap("VER", 1, 90.0, &rows).unwrap();
            for pair in lap.samples.windows(2) {
                prop_assert!(pair[1].distance_m >= pair[0].distance_m);
                prop_assert!(pair[1].time_s >= pair[0].time_s);
            }
        }
    }
}
