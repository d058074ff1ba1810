// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Row sequence builder
//!
//! Turns a raw [`Table`] into time-ordered samples and per-channel temporal
//! sequences.
//!
//! ```text
//! rows --(instant per row)--> stable sort --(position + available groups)--> samples
//!                                                                             |
//!                                   TrajectorySequences <--- sequences() ----+
//! ```
//!
//! Acceptance is per row and all-or-nothing: a row contributes to every
//! available channel or to none of them, so parallel sequences always share
//! the same instants.

use crate::schema::{Channels, Group, ResolvedSchema, TimeIndex};
use crate::table::Table;
use crate::timestamp::{EpochInstant, TimestampError};
use thiserror::Error;
use tracing::debug;

/// A 3D point or vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const ZERO: Point3 = Point3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
}

impl From<[f64; 3]> for Point3 {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

/// Orientation quaternion components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl From<[f64; 4]> for Quaternion {
    fn from([x, y, z, w]: [f64; 4]) -> Self {
        Self { x, y, z, w }
    }
}

/// One accepted input row.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub instant: EpochInstant,
    pub position: Point3,
    pub orientation: Option<Quaternion>,
    pub linear_velocity: Option<Point3>,
    pub angular_velocity: Option<Point3>,
}

/// Ordered `(value, instant)` pairs for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence<T> {
    entries: Vec<(T, EpochInstant)>,
}

impl<T> Sequence<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, value: T, instant: EpochInstant) {
        self.entries.push((value, instant));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (T, EpochInstant)> {
        self.entries.iter()
    }

    pub fn first(&self) -> Option<&(T, EpochInstant)> {
        self.entries.first()
    }

    pub fn last(&self) -> Option<&(T, EpochInstant)> {
        self.entries.last()
    }

    pub fn instants(&self) -> impl Iterator<Item = EpochInstant> + '_ {
        self.entries.iter().map(|(_, t)| *t)
    }
}

impl<T> Default for Sequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<(T, EpochInstant)> for Sequence<T> {
    fn from_iter<I: IntoIterator<Item = (T, EpochInstant)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Why a row was dropped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkipReason {
    #[error("bad timestamp: {0}")]
    Timestamp(#[from] TimestampError),

    #[error("missing value for column '{0}'")]
    MissingColumn(String),

    #[error("invalid value {value:?} in column '{column}'")]
    InvalidValue { column: String, value: String },
}

/// A dropped row: index into the table's data rows (0-based) and the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSkip {
    pub row: usize,
    pub reason: SkipReason,
}

/// Accepted/skipped accounting for one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub total: usize,
    pub accepted: usize,
    pub skipped: Vec<RowSkip>,
}

/// Builder failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error(
        "no trajectory produced ({} of {} rows skipped)",
        .report.skipped.len(),
        .report.total
    )]
    NoTrajectory { report: BuildReport },
}

/// Sorted, accepted samples of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltTrajectory {
    pub samples: Vec<Sample>,
    pub channels: Channels,
    pub report: BuildReport,
}

/// Parallel temporal sequences derived from a [`BuiltTrajectory`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectorySequences {
    pub position: Sequence<Point3>,
    /// x, y, z, w as independent scalar sequences.
    pub orientation: Option<[Sequence<f64>; 4]>,
    pub linear_velocity: Option<Sequence<Point3>>,
    pub angular_velocity: Option<Sequence<Point3>>,
}

impl BuiltTrajectory {
    pub fn sequences(&self) -> TrajectorySequences {
        let samples = &self.samples;
        let position = samples.iter().map(|s| (s.position, s.instant)).collect();

        let orientation = self.channels.orientation.then(|| {
            let component = |pick: fn(&Quaternion) -> f64| -> Sequence<f64> {
                samples
                    .iter()
                    .filter_map(|s| s.orientation.as_ref().map(|q| (pick(q), s.instant)))
                    .collect()
            };
            [
                component(|q| q.x),
                component(|q| q.y),
                component(|q| q.z),
                component(|q| q.w),
            ]
        });

        let linear_velocity = self.channels.linear_velocity.then(|| {
            samples
                .iter()
                .filter_map(|s| s.linear_velocity.map(|v| (v, s.instant)))
                .collect()
        });

        let angular_velocity = self.channels.angular_velocity.then(|| {
            samples
                .iter()
                .filter_map(|s| s.angular_velocity.map(|v| (v, s.instant)))
                .collect()
        });

        TrajectorySequences {
            position,
            orientation,
            linear_velocity,
            angular_velocity,
        }
    }
}

/// Builds samples from rows using a resolved schema.
pub struct SequenceBuilder<'a> {
    schema: &'a ResolvedSchema,
}

impl<'a> SequenceBuilder<'a> {
    pub fn new(schema: &'a ResolvedSchema) -> Self {
        Self { schema }
    }

    /// Sort `table` by instant and extract every acceptable row.
    pub fn build(&self, table: &Table) -> Result<BuiltTrajectory, BuildError> {
        let mut skipped = Vec::new();
        let mut timed = Vec::with_capacity(table.rows.len());

        for (row, cells) in table.rows.iter().enumerate() {
            match self.instant(cells) {
                Ok(instant) => timed.push((instant, row)),
                Err(reason) => skipped.push(RowSkip { row, reason }),
            }
        }

        // sort_by_key is stable: equal instants keep file order
        timed.sort_by_key(|(instant, _)| *instant);

        let mut samples = Vec::with_capacity(timed.len());
        for (instant, row) in timed {
            match self.sample(instant, &table.rows[row]) {
                Ok(sample) => samples.push(sample),
                Err(reason) => skipped.push(RowSkip { row, reason }),
            }
        }

        skipped.sort_by_key(|skip| skip.row);
        for skip in &skipped {
            debug!("Skipping row {}: {}", skip.row, skip.reason);
        }

        let report = BuildReport {
            total: table.rows.len(),
            accepted: samples.len(),
            skipped,
        };

        if samples.is_empty() {
            return Err(BuildError::NoTrajectory { report });
        }

        Ok(BuiltTrajectory {
            samples,
            channels: self.schema.channels(),
            report,
        })
    }

    fn instant(&self, cells: &[String]) -> Result<EpochInstant, SkipReason> {
        match &self.schema.time {
            TimeIndex::Split { secs, nsecs } => {
                let secs = cell(cells, secs.index, &secs.name)?;
                let nsecs = cell(cells, nsecs.index, &nsecs.name)?;
                Ok(EpochInstant::parse_secs_nanos(secs, nsecs)?)
            }
            TimeIndex::Seconds(col) => Ok(EpochInstant::parse_secs(cell(
                cells, col.index, &col.name,
            )?)?),
        }
    }

    fn sample(&self, instant: EpochInstant, cells: &[String]) -> Result<Sample, SkipReason> {
        let position = read_group(cells, &self.schema.position)?.into();

        let orientation = self
            .schema
            .orientation
            .as_ref()
            .map(|group| read_group(cells, group).map(Quaternion::from))
            .transpose()?;
        let linear_velocity = self
            .schema
            .linear_velocity
            .as_ref()
            .map(|group| read_group(cells, group).map(Point3::from))
            .transpose()?;
        let angular_velocity = self
            .schema
            .angular_velocity
            .as_ref()
            .map(|group| read_group(cells, group).map(Point3::from))
            .transpose()?;

        Ok(Sample {
            instant,
            position,
            orientation,
            linear_velocity,
            angular_velocity,
        })
    }
}

fn cell<'r>(cells: &'r [String], index: usize, name: &str) -> Result<&'r str, SkipReason> {
    match cells.get(index) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(SkipReason::MissingColumn(name.to_string())),
    }
}

fn read_group<const N: usize>(cells: &[String], group: &Group<N>) -> Result<[f64; N], SkipReason> {
    let mut values = [0.0; N];
    for ((slot, &index), name) in values.iter_mut().zip(&group.indices).zip(&group.names) {
        let text = cell(cells, index, name)?;
        *slot = match text.parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                return Err(SkipReason::InvalidValue {
                    column: name.clone(),
                    value: text.to_string(),
                })
            }
        };
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROS_HEADER: &str = "header.stamp.secs,header.stamp.nsecs,\
pose.pose.position.x,pose.pose.position.y,pose.pose.position.z";

    const ORIENTATION: &str = "pose.pose.orientation.x,pose.pose.orientation.y,\
pose.pose.orientation.z,pose.pose.orientation.w";

    fn table(header: &str, rows: &[&str]) -> Table {
        let mut csv = String::from(header);
        csv.push('\n');
        for row in rows {
            csv.push_str(row);
            csv.push('\n');
        }
        Table::from_reader(csv.as_bytes()).unwrap()
    }

    fn build(table: &Table) -> Result<BuiltTrajectory, BuildError> {
        let schema = ResolvedSchema::from_headers(&table.headers).unwrap();
        SequenceBuilder::new(&schema).build(table)
    }

    #[test]
    fn test_rows_sorted_by_instant() {
        let t = table(ROS_HEADER, &["10,0,1,2,3", "9,500000000,4,5,6"]);
        let built = build(&t).unwrap();

        assert_eq!(built.samples[0].position, Point3::new(4.0, 5.0, 6.0));
        assert_eq!(built.samples[1].position, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(
            built.samples[0].instant,
            EpochInstant::from_secs_nanos(9, 500_000_000).unwrap()
        );
        assert_eq!(built.report.accepted, 2);
        assert!(built.report.skipped.is_empty());
    }

    #[test]
    fn test_zero_rows_no_trajectory() {
        let t = table(ROS_HEADER, &[]);
        let err = build(&t).unwrap_err();
        let BuildError::NoTrajectory { report } = err;
        assert_eq!(report.total, 0);
        assert_eq!(report.accepted, 0);
    }

    #[test]
    fn test_all_rows_bad_no_trajectory() {
        let t = table(ROS_HEADER, &["x,0,1,2,3", "10,0,a,2,3"]);
        let err = build(&t).unwrap_err();
        assert_eq!(
            err.to_string(),
            "no trajectory produced (2 of 2 rows skipped)"
        );
    }

    #[test]
    fn test_orientation_all_columns_present() {
        let header = format!("{ROS_HEADER},{ORIENTATION}");
        let t = table(
            &header,
            &["1,0,1,1,1,0,0,0,1", "2,0,2,2,2,0,0,0.7,0.7", "3,0,3,3,3,0,0,1,0"],
        );
        let seqs = build(&t).unwrap().sequences();

        let orientation = seqs.orientation.expect("orientation available");
        for component in &orientation {
            assert_eq!(component.len(), seqs.position.len());
            assert!(component.instants().eq(seqs.position.instants()));
        }
        assert_eq!(orientation[2].iter().map(|(v, _)| *v).collect::<Vec<_>>(), vec![0.0, 0.7, 1.0]);
        assert!(seqs.linear_velocity.is_none());
        assert!(seqs.angular_velocity.is_none());
    }

    #[test]
    fn test_orientation_one_column_missing() {
        let header = format!(
            "{ROS_HEADER},pose.pose.orientation.x,pose.pose.orientation.y,pose.pose.orientation.z"
        );
        let t = table(&header, &["1,0,1,1,1,0,0,0"]);
        let built = build(&t).unwrap();

        assert!(!built.channels.orientation);
        assert!(built.samples[0].orientation.is_none());
        assert!(built.sequences().orientation.is_none());
    }

    #[test]
    fn test_bad_position_dropped_everywhere() {
        let header = format!("{ROS_HEADER},{ORIENTATION}");
        let t = table(
            &header,
            &["1,0,1,1,1,0,0,0,1", "2,0,oops,2,2,0,0,0,1", "3,0,3,3,3,0,0,0,1"],
        );
        let built = build(&t).unwrap();
        let seqs = built.sequences();

        assert_eq!(seqs.position.len(), 2);
        let orientation = seqs.orientation.unwrap();
        for component in &orientation {
            assert_eq!(component.len(), 2);
        }
        let two = EpochInstant::from_secs_nanos(2, 0).unwrap();
        assert!(seqs.position.instants().all(|t| t != two));

        assert_eq!(built.report.skipped.len(), 1);
        assert_eq!(built.report.skipped[0].row, 1);
        assert_eq!(
            built.report.skipped[0].reason,
            SkipReason::InvalidValue {
                column: "pose.pose.position.x".to_string(),
                value: "oops".to_string(),
            }
        );
    }

    #[test]
    fn test_bad_optional_value_skips_row() {
        let header = format!(
            "{ROS_HEADER},twist.twist.linear.x,twist.twist.linear.y,twist.twist.linear.z"
        );
        let t = table(&header, &["1,0,1,1,1,0.5,0,0", "2,0,2,2,2,nan,0,0", "3,0,3,3,3,,0,0"]);
        let built = build(&t).unwrap();
        let seqs = built.sequences();

        assert_eq!(seqs.position.len(), 1);
        assert_eq!(seqs.linear_velocity.unwrap().len(), 1);
        assert_eq!(built.report.skipped.len(), 2);
        assert_eq!(
            built.report.skipped[1].reason,
            SkipReason::MissingColumn("twist.twist.linear.x".to_string())
        );
    }

    #[test]
    fn test_zero_values_still_contribute() {
        let header = format!(
            "{ROS_HEADER},twist.twist.angular.x,twist.twist.angular.y,twist.twist.angular.z"
        );
        let t = table(&header, &["1,0,1,1,1,0,0,0"]);
        let seqs = build(&t).unwrap().sequences();

        let angular = seqs.angular_velocity.unwrap();
        assert_eq!(angular.len(), 1);
        assert_eq!(angular.first().unwrap().0, Point3::ZERO);
    }

    #[test]
    fn test_stable_sort_on_ties() {
        let header = format!("{ROS_HEADER},{ORIENTATION}");
        let t = table(
            &header,
            &[
                "5,0,1,0,0,0,0,0,1",
                "4,0,9,9,9,0,0,0,1",
                "5,0,2,0,0,0,0,0,2",
                "5,0,3,0,0,0,0,0,3",
            ],
        );
        let seqs = build(&t).unwrap().sequences();

        let xs: Vec<f64> = seqs.position.iter().map(|(p, _)| p.x).collect();
        assert_eq!(xs, vec![9.0, 1.0, 2.0, 3.0]);
        let ws: Vec<f64> = seqs.orientation.unwrap()[3].iter().map(|(v, _)| *v).collect();
        assert_eq!(ws, vec![1.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_bad_timestamp_skipped() {
        let t = table("ts,pos_x,pos_y,pos_z", &["abc,1,2,3", "1.25,4,5,6", ",7,8,9"]);
        let built = build(&t).unwrap();

        assert_eq!(built.samples.len(), 1);
        assert_eq!(built.report.total, 3);
        assert_eq!(built.report.skipped.len(), 2);
        assert_eq!(built.report.skipped[0].row, 0);
        assert!(matches!(
            built.report.skipped[0].reason,
            SkipReason::Timestamp(TimestampError::InvalidNumber(_))
        ));
        assert_eq!(
            built.report.skipped[1].reason,
            SkipReason::MissingColumn("ts".to_string())
        );
    }

    #[test]
    fn test_missing_time_cell_names_header() {
        let t = table(ROS_HEADER, &["10,,1,2,3", "11,0,4,5,6"]);
        let built = build(&t).unwrap();

        assert_eq!(built.report.accepted, 1);
        assert_eq!(
            built.report.skipped[0].reason,
            SkipReason::MissingColumn("header.stamp.nsecs".to_string())
        );
        assert_eq!(
            built.report.skipped[0].reason.to_string(),
            "missing value for column 'header.stamp.nsecs'"
        );
    }

    #[test]
    fn test_short_row_skipped() {
        let t = table("ts,pos_x,pos_y,pos_z", &["1,1,2", "2,1,2,3"]);
        let built = build(&t).unwrap();
        assert_eq!(built.report.accepted, 1);
        assert_eq!(
            built.report.skipped[0].reason,
            SkipReason::MissingColumn("pos_z".to_string())
        );
    }
}
