// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ingest pipeline
//!
//! Runs the stages of one import in order:
//!
//! 1. Schema setup (a failure is logged and the run continues)
//! 2. Every image source in the layout
//! 3. Every trajectory source in the layout
//!
//! No stage error escapes [`Ingestor::run`]; each one is folded into the
//! stage's [`StageReport`].

use crate::builder::{BuildError, BuiltTrajectory, SequenceBuilder};
use crate::config::{Config, SinkKind};
use crate::images::scan_image_dir;
use crate::layout::{ImageSource, TrajectorySource};
use crate::literal::{point_text, Labels, TrajectoryRecord, ROW_MARKER, SEQUENCE_MARKER};
use crate::loader::Loader;
use crate::schema::ResolvedSchema;
use crate::table::Table;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// What a stage imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Images,
    Trajectory,
}

/// How a stage ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageOutcome {
    Completed,
    /// Input path missing or unreadable as a directory
    Skipped { reason: String },
    /// Every row was dropped; nothing was sent to the sink
    NoTrajectory,
    Failed { error: String },
}

/// Per-stage accounting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub kind: StageKind,
    /// Camera label or trajectory type
    pub label: String,
    pub path: PathBuf,
    pub outcome: StageOutcome,
    /// Files or rows that parsed
    pub accepted: usize,
    /// Files or rows dropped before reaching the sink
    pub skipped: usize,
    /// Units the sink refused
    pub failed: usize,
    pub rows_written: usize,
}

impl StageReport {
    fn new(kind: StageKind, label: &str, path: PathBuf) -> Self {
        Self {
            kind,
            label: label.to_string(),
            path,
            outcome: StageOutcome::Completed,
            accepted: 0,
            skipped: 0,
            failed: 0,
            rows_written: 0,
        }
    }

    fn with_outcome(mut self, outcome: StageOutcome) -> Self {
        self.outcome = outcome;
        self
    }
}

/// Aggregate counters over all stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunTotals {
    pub images_written: usize,
    pub images_skipped: usize,
    pub trajectories_written: usize,
    pub trajectory_rows: usize,
    pub rows_skipped: usize,
    pub stages_skipped: usize,
    pub stages_failed: usize,
}

impl RunTotals {
    fn from_stages(stages: &[StageReport]) -> Self {
        let mut totals = Self::default();
        for stage in stages {
            match stage.kind {
                StageKind::Images => {
                    totals.images_written += stage.rows_written;
                    totals.images_skipped += stage.skipped;
                }
                StageKind::Trajectory => {
                    if stage.outcome == StageOutcome::Completed {
                        totals.trajectories_written += 1;
                    }
                    totals.trajectory_rows += stage.rows_written;
                    totals.rows_skipped += stage.skipped;
                }
            }
            match stage.outcome {
                StageOutcome::Skipped { .. } => totals.stages_skipped += 1,
                StageOutcome::Failed { .. } => totals.stages_failed += 1,
                _ => {}
            }
        }
        totals
    }
}

/// Result of one ingest run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub sink: SinkKind,
    pub dry_run: bool,
    /// `None` when the schema was prepared
    pub schema_error: Option<String>,
    pub stages: Vec<StageReport>,
    pub totals: RunTotals,
}

impl RunSummary {
    /// Pretty-printed JSON form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// True when no stage failed and the schema was set up.
    pub fn is_clean(&self) -> bool {
        self.schema_error.is_none() && self.totals.stages_failed == 0
    }
}

/// Drives one import from a [`Config`] into a [`Loader`].
pub struct Ingestor<'a, L: Loader> {
    config: &'a Config,
    loader: &'a mut L,
}

impl<'a, L: Loader> Ingestor<'a, L> {
    pub fn new(config: &'a Config, loader: &'a mut L) -> Self {
        if config.sink != loader.sink() {
            warn!(
                "Config targets {} but loader writes {}; using the loader's encoding",
                config.sink,
                loader.sink()
            );
        }
        Self { config, loader }
    }

    /// Run every stage and return the summary.
    pub fn run(&mut self) -> RunSummary {
        info!(
            "Starting {} import from {}",
            self.loader.sink(),
            self.config.layout.root.display()
        );

        let schema_error = match self.loader.prepare_schema() {
            Ok(()) => {
                info!("Schema ready");
                None
            }
            Err(e) => {
                error!("Schema setup failed: {}", e);
                Some(e.to_string())
            }
        };

        let config = self.config;
        let layout = &config.layout;
        let mut stages = Vec::with_capacity(layout.images.len() + layout.trajectories.len());
        for source in &layout.images {
            stages.push(self.import_images(source));
        }
        for source in &layout.trajectories {
            stages.push(self.import_trajectory(source));
        }

        let totals = RunTotals::from_stages(&stages);
        info!(
            "Import finished: {} images, {} trajectories ({} rows), {} stages skipped, {} failed",
            totals.images_written,
            totals.trajectories_written,
            totals.trajectory_rows,
            totals.stages_skipped,
            totals.stages_failed
        );

        RunSummary {
            sink: self.loader.sink(),
            dry_run: self.config.dry_run,
            schema_error,
            stages,
            totals,
        }
    }

    fn import_images(&mut self, source: &ImageSource) -> StageReport {
        let dir = self.config.layout.resolve(&source.dir);
        let mut report = StageReport::new(StageKind::Images, &source.camera, dir.clone());

        if !dir.is_dir() {
            warn!("Image directory not found: {}", dir.display());
            return report.with_outcome(StageOutcome::Skipped {
                reason: "directory not found".to_string(),
            });
        }

        info!("Importing {} images from {}", source.camera, dir.display());
        let scan = match scan_image_dir(&dir, &source.camera, &source.bag_file) {
            Ok(scan) => scan,
            Err(e) => {
                error!("Cannot list {}: {}", dir.display(), e);
                return report.with_outcome(StageOutcome::Failed {
                    error: e.to_string(),
                });
            }
        };

        report.accepted = scan.records.len();
        report.skipped = scan.skipped.len();
        if report.skipped > 0 {
            warn!(
                "{}: skipped {} files without a frame timestamp",
                source.camera, report.skipped
            );
        }

        let mut last_error = None;
        for record in &scan.records {
            match self.loader.load_image(record) {
                Ok(()) => report.rows_written += 1,
                Err(e) => {
                    error!("Insert failed for {}: {}", record.path.display(), e);
                    report.failed += 1;
                    last_error = Some(e.to_string());
                }
            }
        }

        info!(
            "{}: {} of {} images written",
            source.camera, report.rows_written, report.accepted
        );

        match last_error {
            Some(last) => {
                let error = format!("{} inserts failed, last: {}", report.failed, last);
                report.with_outcome(StageOutcome::Failed { error })
            }
            None => report,
        }
    }

    fn import_trajectory(&mut self, source: &TrajectorySource) -> StageReport {
        let path = self.config.layout.resolve(&source.csv);
        let mut report =
            StageReport::new(StageKind::Trajectory, &source.trajectory_type, path.clone());

        if !path.is_file() {
            warn!("Trajectory file not found: {}", path.display());
            return report.with_outcome(StageOutcome::Skipped {
                reason: "file not found".to_string(),
            });
        }

        info!("Importing {} from {}", source.trajectory_type, path.display());
        let built = match Self::build(&path) {
            Ok(built) => built,
            Err(Outcome(outcome, skipped)) => {
                report.skipped = skipped;
                return report.with_outcome(outcome);
            }
        };

        report.accepted = built.report.accepted;
        report.skipped = built.report.skipped.len();
        if report.skipped > 0 {
            warn!(
                "{}: skipped {} of {} rows",
                source.trajectory_type, report.skipped, built.report.total
            );
        }

        let sink = self.loader.sink();
        log_bounds(sink, &built);

        let labels = Labels::new(source.bag_file.as_str(), source.trajectory_type.as_str());
        let record = TrajectoryRecord::encode(sink, &built, labels);

        match self.loader.load_trajectory(&record) {
            Ok(rows) => {
                info!(
                    "{}: {} samples written as {} rows",
                    source.trajectory_type, report.accepted, rows
                );
                report.rows_written = rows;
                report
            }
            Err(e) => {
                error!("Insert failed for {}: {}", source.trajectory_type, e);
                report.failed = 1;
                report.with_outcome(StageOutcome::Failed {
                    error: e.to_string(),
                })
            }
        }
    }

    fn build(path: &Path) -> Result<BuiltTrajectory, Outcome> {
        let table = Table::from_path(path).map_err(|e| {
            error!("Cannot read {}: {}", path.display(), e);
            Outcome::failed(e)
        })?;

        if table.headers.is_empty() {
            warn!("No trajectory in {} (empty file)", path.display());
            return Err(Outcome(StageOutcome::NoTrajectory, 0));
        }

        let schema = ResolvedSchema::from_headers(&table.headers).map_err(|e| {
            error!("Unusable columns in {}: {}", path.display(), e);
            Outcome::failed(e)
        })?;

        let channels = schema.channels();
        debug!(
            "{}: orientation={} linear_velocity={} angular_velocity={}",
            path.display(),
            channels.orientation,
            channels.linear_velocity,
            channels.angular_velocity
        );

        SequenceBuilder::new(&schema)
            .build(&table)
            .map_err(|BuildError::NoTrajectory { report }| {
                warn!(
                    "No trajectory in {} ({} of {} rows skipped)",
                    path.display(),
                    report.skipped.len(),
                    report.total
                );
                Outcome(StageOutcome::NoTrajectory, report.skipped.len())
            })
    }
}

/// Early stage exit with the number of rows dropped before it.
struct Outcome(StageOutcome, usize);

impl Outcome {
    fn failed(e: impl std::fmt::Display) -> Self {
        Self(
            StageOutcome::Failed {
                error: e.to_string(),
            },
            0,
        )
    }
}

/// First and last token of the trajectory, at debug level.
fn log_bounds(sink: SinkKind, built: &BuiltTrajectory) {
    let (Some(first), Some(last)) = (built.samples.first(), built.samples.last()) else {
        return;
    };
    match sink {
        SinkKind::Temporal => {
            debug!(
                "First token: {}@{}",
                point_text(&first.position),
                first.instant.to_text(SEQUENCE_MARKER)
            );
            debug!(
                "Last token: {}@{}",
                point_text(&last.position),
                last.instant.to_text(SEQUENCE_MARKER)
            );
        }
        SinkKind::Columnar => {
            debug!("First row: {}", first.instant.to_text(ROW_MARKER));
            debug!("Last row: {}", last.instant.to_text(ROW_MARKER));
        }
    }
}
