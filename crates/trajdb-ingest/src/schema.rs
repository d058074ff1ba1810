// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Column schema descriptors for trajectory exports.
//!
//! Two header dialects are understood:
//!
//! | Group            | ROS export (`rostopic echo -p`)   | Flat export          |
//! |------------------|-----------------------------------|----------------------|
//! | time             | `header.stamp.secs` / `.nsecs`    | `ts`                 |
//! | position         | `pose.pose.position.{x,y,z}`      | `pos_{x,y,z}`        |
//! | orientation      | `pose.pose.orientation.{x,y,z,w}` | `orientation_{x..w}` |
//! | linear velocity  | `twist.twist.linear.{x,y,z}`      | `linear_vel_{x,y,z}` |
//! | angular velocity | `twist.twist.angular.{x,y,z}`     | `angular_vel_{x,y,z}`|
//!
//! A schema is resolved against a file's header row exactly once; the
//! resulting [`ResolvedSchema`] carries column indices and the channel
//! availability flags used for every row of that file.

use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// File-level schema errors (the whole file is skipped).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("no known timestamp columns in header")]
    UnknownDialect,

    #[error("missing required column '{0}'")]
    MissingColumn(String),
}

/// Where a row's instant comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeColumns {
    /// Integer seconds plus integer nanoseconds.
    Split { secs: String, nsecs: String },
    /// Floating-point epoch seconds.
    Seconds(String),
}

/// Declared column names for one export dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    pub time: TimeColumns,
    pub position: [String; 3],
    pub orientation: [String; 4],
    pub linear_velocity: [String; 3],
    pub angular_velocity: [String; 3],
}

fn names<const N: usize>(prefix: &str, axes: [&str; N]) -> [String; N] {
    axes.map(|axis| format!("{prefix}{axis}"))
}

impl ColumnSchema {
    /// ROS `nav_msgs/Odometry` CSV export.
    pub fn ros() -> Self {
        Self {
            time: TimeColumns::Split {
                secs: "header.stamp.secs".to_string(),
                nsecs: "header.stamp.nsecs".to_string(),
            },
            position: names("pose.pose.position.", ["x", "y", "z"]),
            orientation: names("pose.pose.orientation.", ["x", "y", "z", "w"]),
            linear_velocity: names("twist.twist.linear.", ["x", "y", "z"]),
            angular_velocity: names("twist.twist.angular.", ["x", "y", "z"]),
        }
    }

    /// Flattened export with a single `ts` column.
    pub fn flat() -> Self {
        Self {
            time: TimeColumns::Seconds("ts".to_string()),
            position: names("pos_", ["x", "y", "z"]),
            orientation: names("orientation_", ["x", "y", "z", "w"]),
            linear_velocity: names("linear_vel_", ["x", "y", "z"]),
            angular_velocity: names("angular_vel_", ["x", "y", "z"]),
        }
    }

    /// Pick the dialect whose time columns appear in `headers`.
    pub fn detect<S: AsRef<str>>(headers: &[S]) -> Result<Self, SchemaError> {
        let has = |name: &str| headers.iter().any(|h| h.as_ref() == name);
        if has("header.stamp.secs") {
            Ok(Self::ros())
        } else if has("ts") {
            Ok(Self::flat())
        } else {
            Err(SchemaError::UnknownDialect)
        }
    }

    /// Resolve every declared column to its index in `headers`.
    pub fn resolve<S: AsRef<str>>(&self, headers: &[S]) -> Result<ResolvedSchema, SchemaError> {
        let index: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.as_ref(), i))
            .collect();

        let required = |name: &String| {
            index
                .get(name.as_str())
                .copied()
                .ok_or_else(|| SchemaError::MissingColumn(name.clone()))
        };

        let column = |name: &String| {
            required(name).map(|index| Column {
                name: name.clone(),
                index,
            })
        };

        let time = match &self.time {
            TimeColumns::Split { secs, nsecs } => TimeIndex::Split {
                secs: column(secs)?,
                nsecs: column(nsecs)?,
            },
            TimeColumns::Seconds(col) => TimeIndex::Seconds(column(col)?),
        };

        let position = [
            required(&self.position[0])?,
            required(&self.position[1])?,
            required(&self.position[2])?,
        ];

        Ok(ResolvedSchema {
            time,
            position: Group::new(&self.position, position),
            orientation: optional_group(&index, &self.orientation),
            linear_velocity: optional_group(&index, &self.linear_velocity),
            angular_velocity: optional_group(&index, &self.angular_velocity),
        })
    }
}

/// A group is available only if all of its columns are present.
fn optional_group<const N: usize>(
    index: &HashMap<&str, usize>,
    columns: &[String; N],
) -> Option<Group<N>> {
    let mut indices = [0usize; N];
    for (slot, name) in indices.iter_mut().zip(columns) {
        *slot = *index.get(name.as_str())?;
    }
    Some(Group::new(columns, indices))
}

/// A header column: its name (for skip reasons) and index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub index: usize,
}

/// Resolved time columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeIndex {
    Split { secs: Column, nsecs: Column },
    Seconds(Column),
}

/// A resolved column group: names (for skip reasons) and header indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group<const N: usize> {
    pub names: [String; N],
    pub indices: [usize; N],
}

impl<const N: usize> Group<N> {
    fn new(names: &[String; N], indices: [usize; N]) -> Self {
        Self {
            names: names.clone(),
            indices,
        }
    }
}

/// Channel availability flags for one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Channels {
    pub orientation: bool,
    pub linear_velocity: bool,
    pub angular_velocity: bool,
}

/// Schema bound to one file's header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSchema {
    pub time: TimeIndex,
    pub position: Group<3>,
    pub orientation: Option<Group<4>>,
    pub linear_velocity: Option<Group<3>>,
    pub angular_velocity: Option<Group<3>>,
}

impl ResolvedSchema {
    /// Detect the dialect from `headers` and resolve against it.
    pub fn from_headers<S: AsRef<str>>(headers: &[S]) -> Result<Self, SchemaError> {
        ColumnSchema::detect(headers)?.resolve(headers)
    }

    pub fn channels(&self) -> Channels {
        Channels {
            orientation: self.orientation.is_some(),
            linear_velocity: self.linear_velocity.is_some(),
            angular_velocity: self.angular_velocity.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ros_headers() -> Vec<String> {
        let schema = ColumnSchema::ros();
        let mut headers = vec![
            "%time".to_string(),
            "header.stamp.secs".to_string(),
            "header.stamp.nsecs".to_string(),
        ];
        headers.extend(schema.position.iter().cloned());
        headers.extend(schema.orientation.iter().cloned());
        headers.extend(schema.linear_velocity.iter().cloned());
        headers
    }

    #[test]
    fn test_detect_dialects() {
        assert_eq!(ColumnSchema::detect(&ros_headers()), Ok(ColumnSchema::ros()));
        assert_eq!(
            ColumnSchema::detect(&["ts", "pos_x", "pos_y", "pos_z"]),
            Ok(ColumnSchema::flat())
        );
        assert_eq!(
            ColumnSchema::detect(&["time", "x"]),
            Err(SchemaError::UnknownDialect)
        );
    }

    #[test]
    fn test_resolve_indices_and_channels() {
        let headers = ros_headers();
        let resolved = ResolvedSchema::from_headers(&headers).unwrap();

        assert_eq!(
            resolved.time,
            TimeIndex::Split {
                secs: Column {
                    name: "header.stamp.secs".to_string(),
                    index: 1,
                },
                nsecs: Column {
                    name: "header.stamp.nsecs".to_string(),
                    index: 2,
                },
            }
        );
        assert_eq!(resolved.position.indices, [3, 4, 5]);
        assert_eq!(resolved.orientation.as_ref().unwrap().indices, [6, 7, 8, 9]);
        assert_eq!(
            resolved.channels(),
            Channels {
                orientation: true,
                linear_velocity: true,
                angular_velocity: false,
            }
        );
    }

    #[test]
    fn test_partial_group_unavailable() {
        let headers = [
            "ts",
            "pos_x",
            "pos_y",
            "pos_z",
            "orientation_x",
            "orientation_y",
            "orientation_z",
        ];
        let resolved = ResolvedSchema::from_headers(&headers).unwrap();
        assert!(resolved.orientation.is_none());
        assert_eq!(
            resolved.time,
            TimeIndex::Seconds(Column {
                name: "ts".to_string(),
                index: 0,
            })
        );
    }

    #[test]
    fn test_missing_position_is_error() {
        let err = ResolvedSchema::from_headers(&["ts", "pos_x", "pos_y"]).unwrap_err();
        assert_eq!(err, SchemaError::MissingColumn("pos_z".to_string()));
    }

    #[test]
    fn test_missing_nsecs_is_error() {
        let err = ResolvedSchema::from_headers(&["header.stamp.secs"]).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingColumn("header.stamp.nsecs".to_string())
        );
    }
}
