//! Normalized row export.
//!
//! A mapping flattens to one row per source entity and one row per
//! candidate, keyed by `(plan_id, source_key)` and `(plan_id,
//! candidate_key)`. The plan id is the target version id.

use std::io;

use serde::{Deserialize, Serialize};

use dsv_model::{
    DataSetVersionMapping, GeographicLevel, MappingCategory, MappingPlan, MappingType,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRow {
    pub plan_id: String,
    pub category: MappingCategory,
    pub level: Option<GeographicLevel>,
    pub filter_key: Option<String>,
    pub source_key: String,
    pub label: String,
    pub public_id: Option<String>,
    pub mapping_type: MappingType,
    pub candidate_key: Option<String>,
    pub needs_review: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRow {
    pub plan_id: String,
    pub category: MappingCategory,
    pub level: Option<GeographicLevel>,
    pub filter_key: Option<String>,
    pub candidate_key: String,
    pub label: String,
}

pub fn mapping_rows(mapping: &DataSetVersionMapping) -> Vec<MappingRow> {
    let plan_id = mapping.target_version.to_string();
    mapping
        .entries()
        .into_iter()
        .map(|entry| MappingRow {
            plan_id: plan_id.clone(),
            category: entry.address.category(),
            level: entry.address.level(),
            filter_key: entry.address.filter_key().map(str::to_string),
            source_key: entry.address.source_key().to_string(),
            label: entry.label.to_string(),
            public_id: entry.public_id.map(ToString::to_string),
            mapping_type: entry.mapping_type,
            candidate_key: entry.candidate_key.map(str::to_string),
            needs_review: entry.needs_review,
        })
        .collect()
}

pub fn candidate_rows(mapping: &DataSetVersionMapping) -> Vec<CandidateRow> {
    let plan_id = mapping.target_version.to_string();
    mapping
        .candidate_refs()
        .into_iter()
        .map(|candidate| CandidateRow {
            plan_id: plan_id.clone(),
            category: candidate.category,
            level: candidate.level,
            filter_key: candidate.filter_key,
            candidate_key: candidate.candidate_key,
            label: candidate.label,
        })
        .collect()
}

fn write_rows<W: io::Write, R: Serialize>(writer: W, rows: &[R]) -> csv::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_mapping_rows_csv<W: io::Write>(writer: W, rows: &[MappingRow]) -> csv::Result<()> {
    write_rows(writer, rows)
}

pub fn write_candidate_rows_csv<W: io::Write>(
    writer: W,
    rows: &[CandidateRow],
) -> csv::Result<()> {
    write_rows(writer, rows)
}
