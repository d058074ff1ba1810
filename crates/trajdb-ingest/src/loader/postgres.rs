// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! PostgreSQL wire protocol backend
//!
//! Serves both MobilityDB (a PostgreSQL extension) and QuestDB (which speaks
//! the PostgreSQL wire protocol on port 8812). The connection is driven by a
//! private current-thread tokio runtime so callers see a blocking API and the
//! run stays strictly sequential.
//!
//! # Schema (temporal)
//!
//! ```sql
//! CREATE TABLE camera_images (
//!     id SERIAL PRIMARY KEY,
//!     timestamp NUMERIC(16, 6) NOT NULL,
//!     camera_type VARCHAR(50) NOT NULL,
//!     image_path TEXT NOT NULL,
//!     bag_file VARCHAR(255) NOT NULL
//! );
//! CREATE TABLE trajectories (
//!     id SERIAL PRIMARY KEY,
//!     trajectory tgeompoint,
//!     orientation_x tfloat, orientation_y tfloat, orientation_z tfloat, orientation_w tfloat,
//!     linear_velocity tgeompoint,
//!     angular_velocity tgeompoint,
//!     bag_file VARCHAR(255) NOT NULL,
//!     trajectory_type VARCHAR(100) NOT NULL
//! );
//! ```
//!
//! # Schema (columnar)
//!
//! ```sql
//! CREATE TABLE trajectories (
//!     ts TIMESTAMP,
//!     pos_x DOUBLE, ... angular_vel_z DOUBLE,
//!     bag_file SYMBOL, trajectory_type SYMBOL
//! );
//! CREATE TABLE camera_images (
//!     timestamp DOUBLE, camera_type SYMBOL, image_path STRING, bag_file SYMBOL
//! );
//! ```

use super::{check_encoding, LoadError, Loader};
use crate::config::{DbConfig, SinkKind};
use crate::images::ImageRecord;
use crate::literal::{RowBatch, SequenceRow, TrajectoryRecord};
use crate::timestamp::EpochInstant;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

const TEMPORAL_SCHEMA: &[&str] = &[
    "CREATE EXTENSION IF NOT EXISTS postgis",
    "CREATE EXTENSION IF NOT EXISTS mobilitydb",
    "DROP TABLE IF EXISTS camera_images CASCADE",
    "CREATE TABLE camera_images (
        id SERIAL PRIMARY KEY,
        timestamp NUMERIC(16, 6) NOT NULL,
        camera_type VARCHAR(50) NOT NULL,
        image_path TEXT NOT NULL,
        bag_file VARCHAR(255) NOT NULL
    )",
    "CREATE INDEX idx_camera_images_timestamp ON camera_images (timestamp)",
    "DROP TABLE IF EXISTS trajectories CASCADE",
    "CREATE TABLE trajectories (
        id SERIAL PRIMARY KEY,
        trajectory tgeompoint,
        orientation_x tfloat,
        orientation_y tfloat,
        orientation_z tfloat,
        orientation_w tfloat,
        linear_velocity tgeompoint,
        angular_velocity tgeompoint,
        bag_file VARCHAR(255) NOT NULL,
        trajectory_type VARCHAR(100) NOT NULL
    )",
];

const COLUMNAR_SCHEMA: &[&str] = &[
    "DROP TABLE IF EXISTS trajectories",
    "DROP TABLE IF EXISTS camera_images",
    "CREATE TABLE trajectories (
        ts TIMESTAMP,
        pos_x DOUBLE, pos_y DOUBLE, pos_z DOUBLE,
        orientation_x DOUBLE, orientation_y DOUBLE, orientation_z DOUBLE, orientation_w DOUBLE,
        linear_vel_x DOUBLE, linear_vel_y DOUBLE, linear_vel_z DOUBLE,
        angular_vel_x DOUBLE, angular_vel_y DOUBLE, angular_vel_z DOUBLE,
        bag_file SYMBOL, trajectory_type SYMBOL
    )",
    "CREATE TABLE camera_images (
        timestamp DOUBLE,
        camera_type SYMBOL,
        image_path STRING,
        bag_file SYMBOL
    )",
];

const INSERT_IMAGE_TEMPORAL: &str = "INSERT INTO camera_images (timestamp, camera_type, image_path, bag_file)
     VALUES ($1::numeric, $2, $3, $4)";

const INSERT_IMAGE_COLUMNAR: &str = "INSERT INTO camera_images (timestamp, camera_type, image_path, bag_file)
     VALUES ($1, $2, $3, $4)";

const INSERT_SEQUENCES: &str = "INSERT INTO trajectories (
        trajectory, orientation_x, orientation_y, orientation_z, orientation_w,
        linear_velocity, angular_velocity, bag_file, trajectory_type
    )
    VALUES ($1::tgeompoint, $2::tfloat, $3::tfloat, $4::tfloat, $5::tfloat,
            $6::tgeompoint, $7::tgeompoint, $8, $9)";

const INSERT_ROW: &str = "INSERT INTO trajectories (
        ts, pos_x, pos_y, pos_z,
        orientation_x, orientation_y, orientation_z, orientation_w,
        linear_vel_x, linear_vel_y, linear_vel_z,
        angular_vel_x, angular_vel_y, angular_vel_z,
        bag_file, trajectory_type
    )
    VALUES ($1::timestamp, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)";

/// Loader backed by a single PostgreSQL-protocol connection.
pub struct PgLoader {
    sink: SinkKind,
    runtime: Runtime,
    conn: PgConnection,
}

impl PgLoader {
    /// Open the connection described by `db`.
    ///
    /// This is the only fatal step of a run.
    pub fn connect(sink: SinkKind, db: &DbConfig) -> Result<Self, LoadError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;

        info!(
            "Connecting to {} at {}:{} (database '{}', user '{}')",
            sink, db.host, db.port, db.database, db.user
        );

        let options = PgConnectOptions::new()
            .host(&db.host)
            .port(db.port)
            .database(&db.database)
            .username(&db.user)
            .password(&db.password);

        let conn = runtime
            .block_on(PgConnection::connect_with(&options))
            .map_err(LoadError::Connect)?;

        info!("Connected to {}", sink);
        Ok(Self {
            sink,
            runtime,
            conn,
        })
    }

    /// Close the connection cleanly.
    pub fn close(self) -> Result<(), LoadError> {
        let Self { runtime, conn, .. } = self;
        runtime.block_on(conn.close()).map_err(LoadError::Write)
    }
}

impl Loader for PgLoader {
    fn sink(&self) -> SinkKind {
        self.sink
    }

    fn prepare_schema(&mut self) -> Result<(), LoadError> {
        let statements = match self.sink {
            SinkKind::Temporal => TEMPORAL_SCHEMA,
            SinkKind::Columnar => COLUMNAR_SCHEMA,
        };
        self.runtime
            .block_on(run_statements(&mut self.conn, statements))
            .map_err(LoadError::Schema)
    }

    fn load_image(&mut self, image: &ImageRecord) -> Result<(), LoadError> {
        self.runtime
            .block_on(insert_image(&mut self.conn, self.sink, image))
            .map_err(LoadError::Write)
    }

    fn load_trajectory(&mut self, record: &TrajectoryRecord) -> Result<usize, LoadError> {
        check_encoding(self.sink, record)?;
        let written = match record {
            TrajectoryRecord::Sequences(row) => self
                .runtime
                .block_on(insert_sequences(&mut self.conn, row))
                .map(|_| 1),
            TrajectoryRecord::Rows(batch) => self
                .runtime
                .block_on(insert_rows(&mut self.conn, batch)),
        };
        written.map_err(LoadError::Write)
    }
}

async fn run_statements(conn: &mut PgConnection, statements: &[&str]) -> Result<(), sqlx::Error> {
    for statement in statements {
        debug!("{}", statement);
        sqlx::query(statement)
            .persistent(false)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Exact `NUMERIC(16, 6)` text for an instant, e.g. `1699999999.123456`.
fn numeric_seconds(instant: EpochInstant) -> String {
    let micros = instant.as_micros();
    let sign = if micros < 0 { "-" } else { "" };
    let abs = micros.unsigned_abs();
    format!("{}{}.{:06}", sign, abs / 1_000_000, abs % 1_000_000)
}

async fn insert_image(
    conn: &mut PgConnection,
    sink: SinkKind,
    image: &ImageRecord,
) -> Result<(), sqlx::Error> {
    let path = image.path.to_string_lossy();
    // float8 -> numeric keeps only 15 significant digits
    let query = match sink {
        SinkKind::Temporal => {
            sqlx::query(INSERT_IMAGE_TEMPORAL).bind(numeric_seconds(image.instant))
        }
        SinkKind::Columnar => {
            sqlx::query(INSERT_IMAGE_COLUMNAR).bind(image.instant.as_secs_f64())
        }
    };
    query
        .bind(image.camera.as_str())
        .bind(path.as_ref())
        .bind(image.bag_file.as_str())
        .execute(conn)
        .await?;
    Ok(())
}

/// Single statement, so the row is atomic without an explicit transaction.
async fn insert_sequences(conn: &mut PgConnection, row: &SequenceRow) -> Result<(), sqlx::Error> {
    sqlx::query(INSERT_SEQUENCES)
        .bind(row.trajectory.as_str())
        .bind(row.orientation_component(0))
        .bind(row.orientation_component(1))
        .bind(row.orientation_component(2))
        .bind(row.orientation_component(3))
        .bind(row.linear_velocity.as_deref())
        .bind(row.angular_velocity.as_deref())
        .bind(row.labels.bag_file.as_str())
        .bind(row.labels.trajectory_type.as_str())
        .execute(conn)
        .await?;
    Ok(())
}

/// All rows of a batch commit together or not at all.
async fn insert_rows(conn: &mut PgConnection, batch: &RowBatch) -> Result<usize, sqlx::Error> {
    let mut tx = conn.begin().await?;
    for row in &batch.rows {
        let mut query = sqlx::query(INSERT_ROW).bind(row.ts.as_str());
        for value in row.values() {
            query = query.bind(value);
        }
        query
            .bind(batch.labels.bag_file.as_str())
            .bind(batch.labels.trajectory_type.as_str())
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(batch.rows.len())
}
