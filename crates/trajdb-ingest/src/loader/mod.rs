// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Loader abstraction
//!
//! Defines the write side of an ingest run. Every call is one independently
//! committed unit: a failed call leaves earlier units in place and writes
//! nothing of its own.
//!
//! # Implementations
//!
//! - `PgLoader` -- MobilityDB or QuestDB over the PostgreSQL wire protocol
//! - `MemoryLoader` -- In-process sink for dry runs and tests

pub mod postgres;

pub use postgres::PgLoader;

use crate::config::SinkKind;
use crate::images::ImageRecord;
use crate::literal::TrajectoryRecord;
use std::collections::HashSet;
use thiserror::Error;

/// Loader errors.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("connection failed: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("schema setup failed: {0}")]
    Schema(#[source] sqlx::Error),

    #[error("write failed: {0}")]
    Write(#[source] sqlx::Error),

    #[error("record encoding does not match the {0} sink")]
    WrongEncoding(SinkKind),

    #[error("write rejected: {0}")]
    Rejected(String),

    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Loader trait
///
/// Sink-agnostic interface used by the ingest pipeline.
pub trait Loader {
    /// Sink flavour this loader writes to (selects the record encoding)
    fn sink(&self) -> SinkKind;

    /// Drop and recreate the sink's tables
    fn prepare_schema(&mut self) -> Result<(), LoadError>;

    /// Insert one camera frame row
    fn load_image(&mut self, image: &ImageRecord) -> Result<(), LoadError>;

    /// Insert one encoded trajectory; returns the number of rows written
    fn load_trajectory(&mut self, record: &TrajectoryRecord) -> Result<usize, LoadError>;
}

/// Check that `record` uses the encoding `sink` expects.
pub(crate) fn check_encoding(sink: SinkKind, record: &TrajectoryRecord) -> Result<(), LoadError> {
    match (sink, record) {
        (SinkKind::Temporal, TrajectoryRecord::Sequences(_))
        | (SinkKind::Columnar, TrajectoryRecord::Rows(_)) => Ok(()),
        _ => Err(LoadError::WrongEncoding(sink)),
    }
}

// ============================================================================
// In-memory implementation
// ============================================================================

/// In-memory loader
///
/// Keeps everything it is given. Writes can be made to fail per camera label
/// or trajectory type to exercise the pipeline's failure handling.
#[derive(Debug)]
pub struct MemoryLoader {
    sink: SinkKind,
    schema_prepared: bool,
    fail_schema: bool,
    images: Vec<ImageRecord>,
    trajectories: Vec<TrajectoryRecord>,
    reject_cameras: HashSet<String>,
    reject_trajectory_types: HashSet<String>,
}

impl MemoryLoader {
    /// Create an empty loader for `sink`
    pub fn new(sink: SinkKind) -> Self {
        Self {
            sink,
            schema_prepared: false,
            fail_schema: false,
            images: Vec::new(),
            trajectories: Vec::new(),
            reject_cameras: HashSet::new(),
            reject_trajectory_types: HashSet::new(),
        }
    }

    /// Fail every image write for `camera`
    pub fn reject_camera(mut self, camera: impl Into<String>) -> Self {
        self.reject_cameras.insert(camera.into());
        self
    }

    /// Fail every trajectory write labelled `trajectory_type`
    pub fn reject_trajectory_type(mut self, trajectory_type: impl Into<String>) -> Self {
        self.reject_trajectory_types.insert(trajectory_type.into());
        self
    }

    /// Fail schema preparation
    pub fn fail_schema(mut self) -> Self {
        self.fail_schema = true;
        self
    }

    pub fn schema_prepared(&self) -> bool {
        self.schema_prepared
    }

    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    pub fn trajectories(&self) -> &[TrajectoryRecord] {
        &self.trajectories
    }

    /// Total rows held in the trajectories table
    pub fn trajectory_rows(&self) -> usize {
        self.trajectories.iter().map(TrajectoryRecord::row_count).sum()
    }
}

impl Loader for MemoryLoader {
    fn sink(&self) -> SinkKind {
        self.sink
    }

    fn prepare_schema(&mut self) -> Result<(), LoadError> {
        if self.fail_schema {
            return Err(LoadError::Rejected("schema setup disabled".to_string()));
        }
        self.images.clear();
        self.trajectories.clear();
        self.schema_prepared = true;
        Ok(())
    }

    fn load_image(&mut self, image: &ImageRecord) -> Result<(), LoadError> {
        if self.reject_cameras.contains(&image.camera) {
            return Err(LoadError::Rejected(format!(
                "camera '{}' rejected",
                image.camera
            )));
        }
        self.images.push(image.clone());
        Ok(())
    }

    fn load_trajectory(&mut self, record: &TrajectoryRecord) -> Result<usize, LoadError> {
        check_encoding(self.sink, record)?;
        let trajectory_type = &record.labels().trajectory_type;
        if self.reject_trajectory_types.contains(trajectory_type) {
            return Err(LoadError::Rejected(format!(
                "trajectory '{}' rejected",
                trajectory_type
            )));
        }
        self.trajectories.push(record.clone());
        Ok(record.row_count())
    }
}
