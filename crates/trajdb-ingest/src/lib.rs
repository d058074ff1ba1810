// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Trajectory Ingest
//!
//! Loads exported robotics logs (camera frame dumps and pose/twist CSV files)
//! into a temporal database.
//!
//! # Sinks
//!
//! - **MobilityDB** -- One row per CSV file holding `tgeompoint` / `tfloat`
//!   sequence literals
//! - **QuestDB** -- One row per accepted sample with fixed scalar columns
//!
//! # Architecture
//!
//! ```text
//! Ingestor
//! +-- Table            (CSV text rows)
//! +-- ColumnSchema     (dialect detection, optional channel groups)
//! +-- SequenceBuilder  (sort by instant, skip bad rows)
//! +-- TrajectoryRecord (sink literal encoding)
//! +-- Loader           (PgLoader or MemoryLoader)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use trajdb_ingest::{Config, DbConfig, Ingestor, PgLoader, SinkKind};
//!
//! let db = DbConfig::from_env(SinkKind::Temporal)?;
//! let config = Config::builder(SinkKind::Temporal).db(db).build();
//!
//! let mut loader = PgLoader::connect(config.sink, &config.db)?;
//! let summary = Ingestor::new(&config, &mut loader).run();
//! println!("{}", summary.to_json()?);
//! ```

pub mod builder;
pub mod config;
pub mod images;
pub mod ingest;
pub mod layout;
pub mod literal;
pub mod loader;
pub mod schema;
pub mod table;
pub mod timestamp;

pub use builder::{
    BuildError, BuildReport, BuiltTrajectory, Point3, Quaternion, RowSkip, Sample, Sequence,
    SequenceBuilder, SkipReason, TrajectorySequences,
};
pub use config::{Config, ConfigBuilder, ConfigError, DbConfig, SinkKind};
pub use images::{parse_image_timestamp, scan_image_dir, ImageNameError, ImageRecord, ImageScan};
pub use ingest::{Ingestor, RunSummary, RunTotals, StageKind, StageOutcome, StageReport};
pub use layout::{ImageSource, Layout, TrajectorySource};
pub use literal::{FlatRow, Labels, LiteralError, RowBatch, SequenceRow, TrajectoryRecord};
pub use loader::{LoadError, Loader, MemoryLoader, PgLoader};
pub use schema::{Channels, ColumnSchema, ResolvedSchema, SchemaError};
pub use table::Table;
pub use timestamp::{EpochInstant, TimestampError, UtcMarker};
