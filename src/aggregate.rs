//! Subtitle batch validation, canonical phase ordering, and manifest
//! persistence.

use anyhow::{anyhow, Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Provenance tag recorded in every manifest.
const MODEL_TAG: &str = "claude-opus-4.5";

/// Default manifest location, relative to the working directory.
pub const DEFAULT_OUTPUT_PATH: &str = "output/subtitles.json";

/// Canonical lifecycle phases in display order. Anything else sorts
/// after all of these and is absent from the phase summary.
const PHASE_ORDER: [&str; 4] = ["overview", "before", "process", "after"];

/// One subtitle entry. Only `id` and `phase` are interpreted; the
/// remaining fields (`file`, `subtitle`, `confidence`, ...) pass
/// through to the manifest untouched and unvalidated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub id: String,
    pub phase: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct AnnotationBatch {
    pub subtitles: Vec<AnnotationRecord>,
}

#[derive(Debug, Serialize)]
pub struct PhaseSummary {
    pub overview: usize,
    pub before: usize,
    pub process: usize,
    pub after: usize,
}

#[derive(Debug, Serialize)]
pub struct Manifest {
    pub generated_at: String,
    pub model: String,
    pub total_count: usize,
    pub phase_summary: PhaseSummary,
    pub recommended_order: Vec<String>,
    pub subtitles: Vec<AnnotationRecord>,
}

/// Decode a serialized batch, rejecting structural malformation
/// before any record-level decoding so the operator sees the shape
/// problem rather than a field-level decode message.
pub fn parse_batch(raw: &str) -> Result<AnnotationBatch> {
    let value: Value = serde_json::from_str(raw).context("parse input JSON")?;
    if !value.is_object() {
        return Err(anyhow!("input JSON is not an object"));
    }
    match value.get("subtitles") {
        Some(Value::Array(_)) => {}
        Some(_) => return Err(anyhow!("input field `subtitles` is not an array")),
        None => return Err(anyhow!("input JSON is missing a `subtitles` array")),
    }
    let batch = serde_json::from_value(value).context("decode subtitle records")?;
    Ok(batch)
}

fn phase_rank(phase: &str) -> usize {
    PHASE_ORDER
        .iter()
        .position(|known| *known == phase)
        .unwrap_or(PHASE_ORDER.len())
}

fn count_phase(records: &[AnnotationRecord], phase: &str) -> usize {
    records.iter().filter(|record| record.phase == phase).count()
}

/// Order a batch by canonical phase rank and summarize it.
///
/// The sort is stable: records sharing a rank keep their input order,
/// including all unrecognized-phase records, which share the last
/// rank.
pub fn build_manifest(batch: AnnotationBatch) -> Manifest {
    let total_count = batch.subtitles.len();
    let phase_summary = PhaseSummary {
        overview: count_phase(&batch.subtitles, "overview"),
        before: count_phase(&batch.subtitles, "before"),
        process: count_phase(&batch.subtitles, "process"),
        after: count_phase(&batch.subtitles, "after"),
    };

    let mut subtitles = batch.subtitles;
    subtitles.sort_by_key(|record| phase_rank(&record.phase));
    let recommended_order = subtitles.iter().map(|record| record.id.clone()).collect();

    Manifest {
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        model: MODEL_TAG.to_string(),
        total_count,
        phase_summary,
        recommended_order,
        subtitles,
    }
}

/// Build the manifest and persist it, fully overwriting any existing
/// file at `output_path`.
pub fn aggregate(batch: AnnotationBatch, output_path: &Path) -> Result<Manifest> {
    let manifest = build_manifest(batch);

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(&manifest).context("serialize manifest")?;
    fs::write(output_path, json)
        .with_context(|| format!("write {}", output_path.display()))?;

    Ok(manifest)
}
