/**
 * STATUS PROJECTOR - Pure derivation of display-ready printer cards
 *
 * ROLE: Turn stored rows into everything the dashboard renderer needs:
 * completion percentage, compact durations, staleness flag, ETA and
 * timezone-converted timestamps. No I/O; called once per render/poll
 * cycle with the store snapshot and the current time.
 */

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::config::DisplayConf;
use crate::models::{CardView, PrinterStatus};

/// A row older than this is considered stale (strict: 600 itself is fresh).
const STALE_AFTER_SECS: i64 = 600;

/// Resolved display configuration: timezone identifier parsed once at
/// startup, datetime pattern passed through to chrono.
#[derive(Debug, Clone)]
pub struct DisplaySettings {
    pub tz: Tz,
    pub datetime_format: String,
}

impl DisplaySettings {
    pub fn from_conf(conf: &DisplayConf) -> Self {
        let tz = conf.timezone.parse::<Tz>().unwrap_or_else(|_| {
            warn!("unknown timezone '{}', falling back to UTC", conf.timezone);
            Tz::UTC
        });
        Self {
            tz,
            datetime_format: conf.datetime_format.clone(),
        }
    }
}

/// Formats whole seconds as a compact "h m s" string, omitting zero-valued
/// components: 0 -> "0s", 65 -> "1m 5s", 3600 -> "1h", 3661 -> "1h 1m 1s".
pub fn format_hms(total_secs: i64) -> String {
    let secs = total_secs.max(0);
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;

    let mut parts = Vec::new();
    if h > 0 {
        parts.push(format!("{h}h"));
    }
    if m > 0 {
        parts.push(format!("{m}m"));
    }
    if s > 0 || parts.is_empty() {
        parts.push(format!("{s}s"));
    }
    parts.join(" ")
}

/// Completion percentage rounded to one decimal. Zero when nothing has
/// been printed and nothing remains; never divides by zero.
pub fn percent_complete(printed: i64, remaining: i64) -> f64 {
    let total = printed + remaining;
    if total <= 0 {
        return 0.0;
    }
    let pct = printed as f64 / total as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

/// Derives one card per row, preserving the store's name-ascending order.
///
/// Rows whose `last_updated_utc` does not parse are kept, fail-open: their
/// age is treated as 0 (never stale) and the raw stored string is shown as
/// the last-updated display. Dropping such rows would hide a printer from
/// the dashboard exactly when its data needs a human look.
pub fn project(rows: &[PrinterStatus], now: DateTime<Utc>, display: &DisplaySettings) -> Vec<CardView> {
    rows.iter().map(|row| project_one(row, now, display)).collect()
}

fn project_one(row: &PrinterStatus, now: DateTime<Utc>, display: &DisplaySettings) -> CardView {
    let r = &row.report;
    let printed = r.time_printing.unwrap_or(0);
    let remaining = r.time_remaining.unwrap_or(0);

    let updated = DateTime::parse_from_rfc3339(&row.last_updated_utc)
        .map(|dt| dt.with_timezone(&Utc))
        .ok();

    let age_seconds = match updated {
        Some(ts) => (now - ts).num_seconds().max(0),
        None => 0,
    };

    let eta = match (updated, remaining > 0) {
        (Some(ts), true) => Some(
            (ts + Duration::seconds(remaining))
                .with_timezone(&display.tz)
                .format("%H:%M")
                .to_string(),
        ),
        _ => None,
    };

    let last_updated_display = match updated {
        Some(ts) => ts
            .with_timezone(&display.tz)
            .format(&display.datetime_format)
            .to_string(),
        None => row.last_updated_utc.clone(),
    };

    CardView {
        name: r.name.clone(),
        state: r.state.to_uppercase(),
        percent: percent_complete(printed, remaining),
        printing_display: format_hms(printed),
        remaining_display: format_hms(remaining),
        age_seconds,
        stale: age_seconds > STALE_AFTER_SECS,
        eta,
        last_updated_display,
        temp_bed: r.temp_bed.map(|v| format!("{v:.1}")),
        target_bed: r.target_bed.map(|v| format!("{v:.1}")),
        temp_nozzle: r.temp_nozzle.map(|v| format!("{v:.1}")),
        target_nozzle: r.target_nozzle.map(|v| format!("{v:.1}")),
        axis_z: r.axis_z.map(|v| format!("{v:.2}")),
        axis_x: r.axis_x,
        axis_y: r.axis_y,
        flow: r.flow,
        speed: r.speed,
        fan_hotend: r.fan_hotend,
        fan_print: r.fan_print,
    }
}
