use serde::{Deserialize, Serialize};

/// Telemetry fields reported for one printer, as extracted from an ingest
/// payload. Every optional field is `None` when the report omitted it —
/// "not reported" and "reported as zero" are distinct states and both
/// survive a round trip through the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub name: String,
    pub ip: String,

    // job
    pub job_id: Option<i64>,
    pub job_progress: Option<f64>,
    pub time_remaining: Option<i64>,
    pub time_printing: Option<i64>,

    // storage
    pub storage_path: Option<String>,
    pub storage_name: Option<String>,
    pub storage_read_only: Option<bool>,

    // machine
    pub state: String,
    pub temp_bed: Option<f64>,
    pub target_bed: Option<f64>,
    pub temp_nozzle: Option<f64>,
    pub target_nozzle: Option<f64>,
    pub axis_x: Option<f64>,
    pub axis_y: Option<f64>,
    pub axis_z: Option<f64>,
    pub flow: Option<i64>,
    pub speed: Option<i64>,
    pub fan_hotend: Option<i64>,
    pub fan_print: Option<i64>,
}

/// One stored row: the latest report for a printer plus the write timestamp
/// the store stamped on it. The timestamp is always the kernel's clock,
/// never anything client-supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrinterStatus {
    pub report: StatusReport,
    /// RFC3339 UTC, set by the store on every upsert.
    pub last_updated_utc: String,
}

/// Display-ready projection of one printer row, consumed by the dashboard
/// renderer. All derivation (percent, durations, staleness, ETA, timezone
/// conversion) happens before this struct is built; the renderer only does
/// markup.
#[derive(Debug, Clone, Serialize)]
pub struct CardView {
    pub name: String,
    pub state: String,
    pub percent: f64,
    pub printing_display: String,
    pub remaining_display: String,
    pub age_seconds: i64,
    pub stale: bool,
    /// Projected completion time in the display timezone ("HH:MM").
    /// Absent when nothing is remaining; the renderer must omit the
    /// segment entirely rather than show a placeholder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
    pub last_updated_display: String,
    // temperatures pre-formatted to one decimal, axis Z to two
    pub temp_bed: Option<String>,
    pub target_bed: Option<String>,
    pub temp_nozzle: Option<String>,
    pub target_nozzle: Option<String>,
    pub axis_z: Option<String>,
    // passed through as stored
    pub axis_x: Option<f64>,
    pub axis_y: Option<f64>,
    pub flow: Option<i64>,
    pub speed: Option<i64>,
    pub fan_hotend: Option<i64>,
    pub fan_print: Option<i64>,
}
