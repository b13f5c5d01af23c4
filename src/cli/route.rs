//! CLI route: single route table and run context. Dispatches to the entity tree and presentation.

use crate::address::EntityAddress;
use crate::cli::help::command_name;
use crate::cli::parse::{Commands, OutputFormat};
use crate::cli::presentation::{
    format_check_text, format_objects_text, format_picks_text, format_runs_text,
    format_tree_text, to_json, AnnotationRow, ObjectRow, RunRow, RunTree, SegmentationRow,
    SpacingTree, TomogramRow,
};
use crate::entity::{Root, Run};
use crate::error::CopickError;
use crate::overlay::Provenance;
use serde_json::json;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Runtime context for CLI execution: one opened project root.
pub struct RunContext {
    root: Root,
}

impl RunContext {
    /// Load, validate and open the project described by `config_path`.
    pub fn new(config_path: &Path) -> Result<Self, CopickError> {
        Ok(Self {
            root: Root::from_file(config_path)?,
        })
    }

    pub fn from_root(root: Root) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Root {
        &self.root
    }

    pub fn execute(&self, command: &Commands) -> Result<String, CopickError> {
        let started = Instant::now();
        let result = match command {
            Commands::Runs { format } => self.runs(*format),
            Commands::Tree { run, format } => self.tree(run.as_deref(), *format),
            Commands::Picks {
                address,
                run,
                format,
            } => self.picks(address, run.as_deref(), *format),
            Commands::Objects { format } => self.objects(*format),
            Commands::Check { format } => self.check(*format),
        };
        info!(
            command = command_name(command),
            ok = result.is_ok(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    fn selected_runs(&self, run: Option<&str>) -> Result<Vec<Run>, CopickError> {
        match run {
            Some(name) => Ok(vec![self.root.get_run(name)?]),
            None => self.root.runs(),
        }
    }

    fn runs(&self, format: OutputFormat) -> Result<String, CopickError> {
        let rows: Vec<RunRow> = self
            .root
            .runs()?
            .iter()
            .map(|run| RunRow {
                name: run.name().to_string(),
                provenance: run.provenance(),
            })
            .collect();
        match format {
            OutputFormat::Json => to_json(&rows),
            OutputFormat::Text => Ok(format_runs_text(&rows)),
        }
    }

    fn tree(&self, run: Option<&str>, format: OutputFormat) -> Result<String, CopickError> {
        let trees = self
            .selected_runs(run)?
            .iter()
            .map(run_tree)
            .collect::<Result<Vec<_>, _>>()?;
        match format {
            OutputFormat::Json => to_json(&trees),
            OutputFormat::Text => Ok(format_tree_text(&trees)),
        }
    }

    fn picks(&self, address: &str, run: Option<&str>, format: OutputFormat) -> Result<String, CopickError> {
        let address = EntityAddress::parse(address)?;
        let mut rows = Vec::new();
        for run in self.selected_runs(run)? {
            for picks in run.resolve_picks(&address)? {
                let points = match picks.points() {
                    Ok(points) => Some(points.len()),
                    Err(e) => {
                        debug!(run = run.name(), picks = %picks.key(), error = %e, "Could not load picks");
                        None
                    }
                };
                rows.push(AnnotationRow {
                    run: run.name().to_string(),
                    object: picks.object_name().to_string(),
                    user: picks.user_id().to_string(),
                    session: picks.session_id().to_string(),
                    provenance: picks.provenance(),
                    points,
                });
            }
        }
        match format {
            OutputFormat::Json => to_json(&rows),
            OutputFormat::Text => Ok(format_picks_text(&rows)),
        }
    }

    fn objects(&self, format: OutputFormat) -> Result<String, CopickError> {
        let rows: Vec<ObjectRow> = self
            .root
            .pickable_objects()
            .iter()
            .map(|object| ObjectRow {
                name: object.name().to_string(),
                is_particle: object.is_particle(),
                label: object.label(),
                radius: object.radius(),
                identifier: object.identifier().map(str::to_string),
            })
            .collect();
        match format {
            OutputFormat::Json => to_json(&rows),
            OutputFormat::Text => Ok(format_objects_text(&rows)),
        }
    }

    /// Touch every listing so the diagnostics channel sees the whole project
    fn check(&self, format: OutputFormat) -> Result<String, CopickError> {
        let runs = self.root.runs()?;
        for run in &runs {
            run_tree(run)?;
        }
        let entries = self.root.diagnostics();
        match format {
            OutputFormat::Json => to_json(&json!({ "runs": runs.len(), "malformed": entries })),
            OutputFormat::Text => Ok(format_check_text(runs.len(), &entries)),
        }
    }
}

fn run_tree(run: &Run) -> Result<RunTree, CopickError> {
    let mut voxel_spacings = Vec::new();
    for spacing in run.voxel_spacings()? {
        let mut tomograms = Vec::new();
        for tomogram in spacing.tomograms()? {
            let features = tomogram
                .features()?
                .iter()
                .map(|f| f.feature_type().to_string())
                .collect();
            tomograms.push(TomogramRow {
                tomo_type: tomogram.tomo_type().to_string(),
                provenance: tomogram.provenance(),
                features,
            });
        }
        voxel_spacings.push(SpacingTree {
            voxel_size: spacing.spacing().canonical(),
            provenance: spacing.provenance(),
            tomograms,
        });
    }

    let annotation = |object: &str, user: &str, session: &str, provenance: Provenance| AnnotationRow {
        run: run.name().to_string(),
        object: object.to_string(),
        user: user.to_string(),
        session: session.to_string(),
        provenance,
        points: None,
    };
    let picks = run
        .picks()?
        .iter()
        .map(|p| annotation(p.object_name(), p.user_id(), p.session_id(), p.provenance()))
        .collect();
    let meshes = run
        .meshes()?
        .iter()
        .map(|m| annotation(m.object_name(), m.user_id(), m.session_id(), m.provenance()))
        .collect();
    let segmentations = run
        .segmentations()?
        .iter()
        .map(|s| SegmentationRow {
            name: s.name().to_string(),
            user: s.user_id().to_string(),
            session: s.session_id().to_string(),
            voxel_size: s.voxel_spacing().canonical(),
            multilabel: s.is_multilabel(),
            provenance: s.provenance(),
        })
        .collect();

    Ok(RunTree {
        name: run.name().to_string(),
        provenance: run.provenance(),
        voxel_spacings,
        picks,
        meshes,
        segmentations,
    })
}
