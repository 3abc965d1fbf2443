/**
 * INGEST HANDLER - Validation and upsert of raw printer reports
 *
 * ROLE: Decode one telemetry payload, normalize every field with an
 * explicit default when absent, and write the row atomically. Only a body
 * that fails to parse as a JSON object is rejected; any shape mismatch
 * below the top level degrades to defaults instead of an error, so a
 * firmware that drops a sub-object still gets its row updated.
 */

use serde_json::{Map, Value};
use tracing::debug;

use crate::models::StatusReport;
use crate::store::{StatusStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("store failure: {0}")]
    StoreFailure(#[from] StoreError),
}

/// Decodes `payload` and upserts the resulting row. All-or-nothing: on any
/// error the store is left exactly as it was.
pub fn ingest(store: &StatusStore, payload: &[u8]) -> Result<(), IngestError> {
    let report = parse_report(payload)?;
    debug!(printer = %report.name, state = %report.state, "ingesting report");
    store.upsert(&report)?;
    Ok(())
}

/// Extracts a `StatusReport` from the nested payload shape
/// `{ printer: {ip, name}, status: { job, storage, printer } }`.
pub fn parse_report(payload: &[u8]) -> Result<StatusReport, IngestError> {
    let value: Value = serde_json::from_slice(payload)
        .map_err(|e| IngestError::MalformedPayload(e.to_string()))?;
    let root = value
        .as_object()
        .ok_or_else(|| IngestError::MalformedPayload("payload is not a JSON object".into()))?;

    let printer = child(root, "printer");
    let status = child(root, "status");
    let job = status.and_then(|s| child(s, "job"));
    let storage = status.and_then(|s| child(s, "storage"));
    // nested "printer" object under status holds the machine telemetry
    let machine = status.and_then(|s| child(s, "printer"));

    Ok(StatusReport {
        ip: str_field(printer, "ip").unwrap_or_default(),
        name: str_field(printer, "name").unwrap_or_default(),

        job_id: int_field(job, "id"),
        job_progress: float_field(job, "progress"),
        time_remaining: int_field(job, "time_remaining"),
        time_printing: int_field(job, "time_printing"),

        storage_path: str_field(storage, "path"),
        storage_name: str_field(storage, "name"),
        storage_read_only: bool_field(storage, "read_only"),

        state: str_field(machine, "state").unwrap_or_else(|| "UNKNOWN".to_string()),
        temp_bed: float_field(machine, "temp_bed"),
        target_bed: float_field(machine, "target_bed"),
        temp_nozzle: float_field(machine, "temp_nozzle"),
        target_nozzle: float_field(machine, "target_nozzle"),
        axis_x: float_field(machine, "axis_x"),
        axis_y: float_field(machine, "axis_y"),
        axis_z: float_field(machine, "axis_z"),
        flow: int_field(machine, "flow"),
        speed: int_field(machine, "speed"),
        fan_hotend: int_field(machine, "fan_hotend"),
        fan_print: int_field(machine, "fan_print"),
    })
}

fn child<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    obj.get(key).and_then(Value::as_object)
}

fn str_field(obj: Option<&Map<String, Value>>, key: &str) -> Option<String> {
    obj?.get(key)?.as_str().map(str::to_string)
}

fn int_field(obj: Option<&Map<String, Value>>, key: &str) -> Option<i64> {
    let v = obj?.get(key)?;
    // printers report some integer fields as floats (e.g. 97.0)
    v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
}

fn float_field(obj: Option<&Map<String, Value>>, key: &str) -> Option<f64> {
    obj?.get(key)?.as_f64()
}

fn bool_field(obj: Option<&Map<String, Value>>, key: &str) -> Option<bool> {
    obj?.get(key)?.as_bool()
}
