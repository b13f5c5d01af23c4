//! CLI presentation: text and json formatters per command.

use crate::error::CopickError;
use crate::overlay::{MalformedEntry, Provenance};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RunRow {
    pub name: String,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunTree {
    pub name: String,
    pub provenance: Provenance,
    pub voxel_spacings: Vec<SpacingTree>,
    pub picks: Vec<AnnotationRow>,
    pub meshes: Vec<AnnotationRow>,
    pub segmentations: Vec<SegmentationRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpacingTree {
    pub voxel_size: String,
    pub provenance: Provenance,
    pub tomograms: Vec<TomogramRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TomogramRow {
    pub tomo_type: String,
    pub provenance: Provenance,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnotationRow {
    pub run: String,
    pub object: String,
    pub user: String,
    pub session: String,
    pub provenance: Provenance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentationRow {
    pub name: String,
    pub user: String,
    pub session: String,
    pub voxel_size: String,
    pub multilabel: bool,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectRow {
    pub name: String,
    pub is_particle: bool,
    pub label: Option<i64>,
    pub radius: Option<f64>,
    pub identifier: Option<String>,
}

pub fn to_json<T: Serialize>(value: &T) -> Result<String, CopickError> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn provenance_cell(provenance: Provenance) -> String {
    match provenance {
        Provenance::StaticOnly => format!("{}", provenance.label().blue()),
        Provenance::OverlayOnly => format!("{}", provenance.label().green()),
        Provenance::Both => format!("{}", provenance.label().yellow()),
    }
}

fn session_cell(session: &str) -> String {
    if session.is_empty() {
        "-".to_string()
    } else {
        session.to_string()
    }
}

pub fn format_runs_text(rows: &[RunRow]) -> String {
    if rows.is_empty() {
        return "No runs.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Run", "Source"]);
    for row in rows {
        table.add_row(vec![row.name.clone(), provenance_cell(row.provenance)]);
    }
    table.to_string()
}

pub fn format_tree_text(trees: &[RunTree]) -> String {
    let mut out = String::new();
    for run in trees {
        out.push_str(&format!(
            "{} [{}]\n",
            run.name.bold(),
            provenance_cell(run.provenance)
        ));
        for spacing in &run.voxel_spacings {
            out.push_str(&format!(
                "  VoxelSpacing {} [{}]\n",
                spacing.voxel_size,
                provenance_cell(spacing.provenance)
            ));
            for tomogram in &spacing.tomograms {
                out.push_str(&format!(
                    "    {} [{}]\n",
                    tomogram.tomo_type,
                    provenance_cell(tomogram.provenance)
                ));
                for feature in &tomogram.features {
                    out.push_str(&format!("      features: {}\n", feature));
                }
            }
        }
        for (label, rows) in [("Picks", &run.picks), ("Meshes", &run.meshes)] {
            if rows.is_empty() {
                continue;
            }
            out.push_str(&format!("  {}\n", label));
            for row in rows {
                out.push_str(&format!(
                    "    {}:{}/{} [{}]\n",
                    row.object,
                    row.user,
                    row.session,
                    provenance_cell(row.provenance)
                ));
            }
        }
        if !run.segmentations.is_empty() {
            out.push_str("  Segmentations\n");
            for row in &run.segmentations {
                let multilabel = if row.multilabel { " (multilabel)" } else { "" };
                out.push_str(&format!(
                    "    {}:{}/{}@{}{} [{}]\n",
                    row.name,
                    row.user,
                    row.session,
                    row.voxel_size,
                    multilabel,
                    provenance_cell(row.provenance)
                ));
            }
        }
    }
    if out.is_empty() {
        "No runs.".to_string()
    } else {
        out.trim_end().to_string()
    }
}

pub fn format_picks_text(rows: &[AnnotationRow]) -> String {
    if rows.is_empty() {
        return "No matching picks.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Run", "Object", "User", "Session", "Points", "Source"]);
    for row in rows {
        table.add_row(vec![
            row.run.clone(),
            row.object.clone(),
            row.user.clone(),
            session_cell(&row.session),
            row.points
                .map(|n| n.to_string())
                .unwrap_or_else(|| "?".to_string()),
            provenance_cell(row.provenance),
        ]);
    }
    table.to_string()
}

pub fn format_objects_text(rows: &[ObjectRow]) -> String {
    if rows.is_empty() {
        return "No pickable objects configured.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Name", "Particle", "Label", "Radius", "Identifier"]);
    let dash = || "-".to_string();
    for row in rows {
        table.add_row(vec![
            row.name.clone(),
            row.is_particle.to_string(),
            row.label.map(|l| l.to_string()).unwrap_or_else(dash),
            row.radius.map(|r| r.to_string()).unwrap_or_else(dash),
            row.identifier.clone().unwrap_or_else(dash),
        ]);
    }
    table.to_string()
}

pub fn format_check_text(runs: usize, entries: &[MalformedEntry]) -> String {
    if entries.is_empty() {
        return format!("Checked {} runs: {}", runs, "no malformed entries".green());
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Side", "Path", "Kind", "Reason"]);
    for entry in entries {
        table.add_row(vec![
            format!("{:?}", entry.side).to_lowercase(),
            entry.path(),
            entry.kind.to_string(),
            entry.reason.clone(),
        ]);
    }
    format!(
        "Checked {} runs: {} malformed entries\n\n{}",
        runs,
        entries.len().to_string().red(),
        table
    )
}
