// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Literal encoding for the two sinks.
//!
//! Sequence-literal mode (MobilityDB `tgeompoint` / `tfloat` input syntax):
//! ```text
//! {POINT Z (4 5 6)@1970-01-01T00:00:09.500000+00, POINT Z (1 2 3)@1970-01-01T00:00:10.000000+00}
//! {0.5@1970-01-01T00:00:09.500000+00, 0.25@1970-01-01T00:00:10.000000+00}
//! ```
//!
//! Row-per-instant mode (QuestDB): one [`FlatRow`] per accepted sample, with
//! fixed columns. Channels missing from the file are written as `0.0`.
//!
//! Numbers use Rust's shortest round-trip decimal form, so `4.0` is written
//! as `4` and parses back to the same `f64`.
//!
//! Encoding is a pure format transform; samples are never reordered here.

use crate::builder::{BuiltTrajectory, Point3, Quaternion, Sample, Sequence, TrajectorySequences};
use crate::config::SinkKind;
use crate::timestamp::{EpochInstant, TimestampError, UtcMarker};
use thiserror::Error;

/// Marker used inside sequence literals.
pub const SEQUENCE_MARKER: UtcMarker = UtcMarker::Offset;

/// Marker used for row-per-instant timestamps.
pub const ROW_MARKER: UtcMarker = UtcMarker::Zulu;

/// Source labels attached to every trajectory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    pub bag_file: String,
    pub trajectory_type: String,
}

impl Labels {
    pub fn new(bag_file: impl Into<String>, trajectory_type: impl Into<String>) -> Self {
        Self {
            bag_file: bag_file.into(),
            trajectory_type: trajectory_type.into(),
        }
    }
}

/// One `trajectories` row for the temporal-geometry sink.
///
/// `None` columns are written as SQL NULL.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceRow {
    pub trajectory: String,
    /// x, y, z, w
    pub orientation: Option<[String; 4]>,
    pub linear_velocity: Option<String>,
    pub angular_velocity: Option<String>,
    pub labels: Labels,
    /// Number of instants in every sequence of this row.
    pub instants: usize,
}

impl SequenceRow {
    pub fn encode(sequences: &TrajectorySequences, labels: Labels) -> Self {
        Self {
            trajectory: encode_points(&sequences.position),
            orientation: sequences
                .orientation
                .as_ref()
                .map(|components| components.each_ref().map(encode_scalars)),
            linear_velocity: sequences.linear_velocity.as_ref().map(encode_points),
            angular_velocity: sequences.angular_velocity.as_ref().map(encode_points),
            labels,
            instants: sequences.position.len(),
        }
    }

    /// Orientation component literal (0 = x .. 3 = w).
    pub fn orientation_component(&self, index: usize) -> Option<&str> {
        self.orientation
            .as_ref()
            .and_then(|components| components.get(index))
            .map(String::as_str)
    }
}

/// One `trajectories` row for the columnar sink.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRow {
    pub ts: String,
    pub position: Point3,
    pub orientation: Quaternion,
    pub linear_velocity: Point3,
    pub angular_velocity: Point3,
}

const ZERO_QUATERNION: Quaternion = Quaternion {
    x: 0.0,
    y: 0.0,
    z: 0.0,
    w: 0.0,
};

impl FlatRow {
    pub fn from_sample(sample: &Sample) -> Self {
        Self {
            ts: sample.instant.to_text(ROW_MARKER),
            position: sample.position,
            orientation: sample.orientation.unwrap_or(ZERO_QUATERNION),
            linear_velocity: sample.linear_velocity.unwrap_or(Point3::ZERO),
            angular_velocity: sample.angular_velocity.unwrap_or(Point3::ZERO),
        }
    }

    /// The 13 scalar columns in table order (`pos_x` .. `angular_vel_z`).
    pub fn values(&self) -> [f64; 13] {
        let (p, q, l, a) = (
            &self.position,
            &self.orientation,
            &self.linear_velocity,
            &self.angular_velocity,
        );
        [
            p.x, p.y, p.z, q.x, q.y, q.z, q.w, l.x, l.y, l.z, a.x, a.y, a.z,
        ]
    }
}

/// All rows of one file for the columnar sink.
#[derive(Debug, Clone, PartialEq)]
pub struct RowBatch {
    pub labels: Labels,
    pub rows: Vec<FlatRow>,
}

/// Encoded trajectory, ready for a loader.
#[derive(Debug, Clone, PartialEq)]
pub enum TrajectoryRecord {
    Sequences(SequenceRow),
    Rows(RowBatch),
}

impl TrajectoryRecord {
    /// Encode `built` in the sink's native form.
    pub fn encode(sink: SinkKind, built: &BuiltTrajectory, labels: Labels) -> Self {
        match sink {
            SinkKind::Temporal => Self::Sequences(SequenceRow::encode(&built.sequences(), labels)),
            SinkKind::Columnar => Self::Rows(RowBatch {
                labels,
                rows: built.samples.iter().map(FlatRow::from_sample).collect(),
            }),
        }
    }

    pub fn labels(&self) -> &Labels {
        match self {
            Self::Sequences(row) => &row.labels,
            Self::Rows(batch) => &batch.labels,
        }
    }

    /// Rows this record occupies in the sink.
    pub fn row_count(&self) -> usize {
        match self {
            Self::Sequences(_) => 1,
            Self::Rows(batch) => batch.rows.len(),
        }
    }
}

/// `POINT Z (x y z)`
pub fn point_text(p: &Point3) -> String {
    format!("POINT Z ({} {} {})", p.x, p.y, p.z)
}

/// Encode a point-valued sequence as `{POINT Z (x y z)@t, ...}`.
pub fn encode_points(sequence: &Sequence<Point3>) -> String {
    encode_with(sequence, point_text)
}

/// Encode a scalar sequence as `{v@t, ...}`.
pub fn encode_scalars(sequence: &Sequence<f64>) -> String {
    encode_with(sequence, |v| v.to_string())
}

fn encode_with<T>(sequence: &Sequence<T>, value: impl Fn(&T) -> String) -> String {
    let mut out = String::from("{");
    for (i, (v, instant)) in sequence.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&value(v));
        out.push('@');
        out.push_str(&instant.to_text(SEQUENCE_MARKER));
    }
    out.push('}');
    out
}

/// Literal decoding errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LiteralError {
    #[error("literal is not brace-delimited")]
    MissingBraces,

    #[error("token without '@': {0:?}")]
    MissingInstant(String),

    #[error("bad value in token {0:?}")]
    BadValue(String),

    #[error(transparent)]
    Timestamp(#[from] TimestampError),
}

/// Decode a point sequence literal produced by [`encode_points`].
pub fn parse_points(literal: &str) -> Result<Vec<(Point3, EpochInstant)>, LiteralError> {
    parse_with(literal, |text| {
        let coords = text.strip_prefix("POINT Z (")?.strip_suffix(')')?;
        let mut parts = coords.split(' ').map(|c| c.parse::<f64>().ok());
        let point = Point3::new(parts.next()??, parts.next()??, parts.next()??);
        parts.next().is_none().then_some(point)
    })
}

/// Decode a scalar sequence literal produced by [`encode_scalars`].
pub fn parse_scalars(literal: &str) -> Result<Vec<(f64, EpochInstant)>, LiteralError> {
    parse_with(literal, |text| text.parse::<f64>().ok())
}

fn parse_with<T>(
    literal: &str,
    value: impl Fn(&str) -> Option<T>,
) -> Result<Vec<(T, EpochInstant)>, LiteralError> {
    let body = literal
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or(LiteralError::MissingBraces)?;
    if body.is_empty() {
        return Ok(Vec::new());
    }

    body.split(", ")
        .map(|token| {
            let (text, instant) = token
                .rsplit_once('@')
                .ok_or_else(|| LiteralError::MissingInstant(token.to_string()))?;
            let v = value(text).ok_or_else(|| LiteralError::BadValue(token.to_string()))?;
            Ok((v, EpochInstant::parse_text(instant)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SequenceBuilder;
    use crate::schema::ResolvedSchema;
    use crate::table::Table;

    fn built(csv: &str) -> BuiltTrajectory {
        let table = Table::from_reader(csv.as_bytes()).unwrap();
        let schema = ResolvedSchema::from_headers(&table.headers).unwrap();
        SequenceBuilder::new(&schema).build(&table).unwrap()
    }

    fn t(secs: i64, nanos: i64) -> EpochInstant {
        EpochInstant::from_secs_nanos(secs, nanos).unwrap()
    }

    #[test]
    fn test_point_literal_ordering() {
        let b = built(
            "header.stamp.secs,header.stamp.nsecs,pose.pose.position.x,pose.pose.position.y,pose.pose.position.z\n\
             10,0,1,2,3\n\
             9,500000000,4,5,6\n",
        );
        let literal = encode_points(&b.sequences().position);
        assert_eq!(
            literal,
            "{POINT Z (4 5 6)@1970-01-01T00:00:09.500000+00, \
             POINT Z (1 2 3)@1970-01-01T00:00:10.000000+00}"
        );
    }

    #[test]
    fn test_scalar_literal() {
        let seq: Sequence<f64> = vec![(0.5, t(1, 0)), (-0.25, t(2, 0))].into_iter().collect();
        assert_eq!(
            encode_scalars(&seq),
            "{0.5@1970-01-01T00:00:01.000000+00, -0.25@1970-01-01T00:00:02.000000+00}"
        );
    }

    #[test]
    fn test_unavailable_channels_are_null() {
        let b = built("ts,pos_x,pos_y,pos_z\n1,1,2,3\n");
        let row = SequenceRow::encode(&b.sequences(), Labels::new("F.bag", "slam"));

        assert!(row.orientation.is_none());
        assert!(row.linear_velocity.is_none());
        assert!(row.angular_velocity.is_none());
        assert_eq!(row.orientation_component(0), None);
        assert_eq!(row.instants, 1);
        assert!(!row.trajectory.is_empty());
    }

    #[test]
    fn test_sequence_row_all_channels() {
        let b = built(
            "ts,pos_x,pos_y,pos_z,orientation_x,orientation_y,orientation_z,orientation_w,\
             linear_vel_x,linear_vel_y,linear_vel_z,angular_vel_x,angular_vel_y,angular_vel_z\n\
             2,1,2,3,0,0,0,1,0.5,0,0,0,0,0.1\n",
        );
        let row = SequenceRow::encode(&b.sequences(), Labels::new("I.bag", "gps"));

        assert_eq!(
            row.orientation_component(3),
            Some("{1@1970-01-01T00:00:02.000000+00}")
        );
        assert_eq!(
            row.linear_velocity.as_deref(),
            Some("{POINT Z (0.5 0 0)@1970-01-01T00:00:02.000000+00}")
        );
        assert_eq!(
            row.angular_velocity.as_deref(),
            Some("{POINT Z (0 0 0.1)@1970-01-01T00:00:02.000000+00}")
        );
    }

    #[test]
    fn test_round_trip_recovers_pairs() {
        let b = built(
            "header.stamp.secs,header.stamp.nsecs,pose.pose.position.x,pose.pose.position.y,\
             pose.pose.position.z,pose.pose.orientation.x,pose.pose.orientation.y,\
             pose.pose.orientation.z,pose.pose.orientation.w\n\
             1700000000,123456000,0.1,-2.5,1e-3,0.1,0.2,0.3,0.9\n\
             1700000001,5000,12345.678,0,-0,0,0,0.70710678118,0.70710678118\n",
        );
        let seqs = b.sequences();

        let points = parse_points(&encode_points(&seqs.position)).unwrap();
        let expected: Vec<_> = seqs.position.iter().cloned().collect();
        assert_eq!(points, expected);

        let orientation = seqs.orientation.as_ref().unwrap();
        for component in orientation {
            let decoded = parse_scalars(&encode_scalars(component)).unwrap();
            let original: Vec<_> = component.iter().cloned().collect();
            assert_eq!(decoded, original);
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(parse_points("POINT Z (1 2 3)"), Err(LiteralError::MissingBraces));
        assert!(matches!(
            parse_scalars("{1.0}"),
            Err(LiteralError::MissingInstant(_))
        ));
        assert!(matches!(
            parse_points("{POINT Z (1 2)@1970-01-01T00:00:01.000000+00}"),
            Err(LiteralError::BadValue(_))
        ));
        assert!(matches!(
            parse_scalars("{1@yesterday}"),
            Err(LiteralError::Timestamp(_))
        ));
        assert_eq!(parse_scalars("{}"), Ok(Vec::new()));
    }

    #[test]
    fn test_flat_rows_fill_missing_channels() {
        let b = built("ts,pos_x,pos_y,pos_z\n2.5,4,5,6\n1.5,1,2,3\n");
        let record = TrajectoryRecord::encode(SinkKind::Columnar, &b, Labels::new("F.bag", "slam"));

        let TrajectoryRecord::Rows(batch) = record else {
            panic!("expected row batch");
        };
        assert_eq!(batch.rows.len(), 2);
        assert_eq!(batch.rows[0].ts, "1970-01-01T00:00:01.500000Z");
        assert_eq!(
            batch.rows[0].values(),
            [1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
        );
        assert_eq!(batch.rows[1].position, Point3::new(4.0, 5.0, 6.0));
        assert_eq!(batch.labels.trajectory_type, "slam");
    }

    #[test]
    fn test_record_modes() {
        let b = built("ts,pos_x,pos_y,pos_z\n1,1,2,3\n2,1,2,3\n3,1,2,3\n");
        let labels = Labels::new("F.bag", "slam");

        let temporal = TrajectoryRecord::encode(SinkKind::Temporal, &b, labels.clone());
        assert_eq!(temporal.row_count(), 1);
        assert_eq!(temporal.labels(), &labels);

        let columnar = TrajectoryRecord::encode(SinkKind::Columnar, &b, labels);
        assert_eq!(columnar.row_count(), 3);
    }
}
