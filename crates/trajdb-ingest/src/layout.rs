// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Input directory layout.
//!
//! Each deployment mounts the exported bag data under a fixed root:
//!
//! ```text
//! <root>/
//! +-- F_trajectories/
//! |   +-- camera_images/*.png
//! |   +-- *.csv
//! +-- I_trajectories/
//!     +-- phone_camera_images/*.png
//!     +-- pointgrey_camera_images/*.png
//!     +-- *.csv
//! ```
//!
//! The same information can be given as YAML:
//!
//! ```yaml
//! root: /app
//! images:
//!   - dir: F_trajectories/camera_images
//!     camera: PointGrey_F_Bag
//!     bag_file: F_trajectories.bag
//! trajectories:
//!   - csv: F_trajectories/orb_slam3.csv
//!     bag_file: F_trajectories.bag
//!     trajectory_type: ORB-SLAM3_F_Bag
//! ```

use crate::config::{ConfigError, SinkKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const F_BAG: &str = "F_trajectories.bag";
const I_BAG: &str = "I_trajectories.bag";

/// A directory of camera frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSource {
    /// Directory, relative to the layout root unless absolute.
    pub dir: PathBuf,
    /// Camera label stored with every frame.
    pub camera: String,
    /// Originating bag file label.
    pub bag_file: String,
}

/// A trajectory CSV export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrajectorySource {
    /// CSV path, relative to the layout root unless absolute.
    pub csv: PathBuf,
    /// Originating bag file label.
    pub bag_file: String,
    /// Trajectory source method label (e.g. `ORB-SLAM3_F_Bag`).
    pub trajectory_type: String,
}

/// All inputs of one ingest run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub root: PathBuf,
    #[serde(default)]
    pub images: Vec<ImageSource>,
    #[serde(default)]
    pub trajectories: Vec<TrajectorySource>,
}

fn image(dir: &str, camera: &str, bag_file: &str) -> ImageSource {
    ImageSource {
        dir: PathBuf::from(dir),
        camera: camera.to_string(),
        bag_file: bag_file.to_string(),
    }
}

fn trajectory(csv: &str, bag_file: &str, trajectory_type: &str) -> TrajectorySource {
    TrajectorySource {
        csv: PathBuf::from(csv),
        bag_file: bag_file.to_string(),
        trajectory_type: trajectory_type.to_string(),
    }
}

impl Layout {
    /// Fixed deployment layout for each sink.
    pub fn default_for(sink: SinkKind) -> Self {
        match sink {
            SinkKind::Temporal => Self {
                root: PathBuf::from("/app"),
                images: vec![
                    image("F_trajectories/camera_images", "PointGrey_F_Bag", F_BAG),
                    image("I_trajectories/phone_camera_images", "Phone_I_Bag", I_BAG),
                    image("I_trajectories/pointgrey_camera_images", "PointGrey_I_Bag", I_BAG),
                ],
                trajectories: vec![
                    trajectory("F_trajectories/orb_slam3.csv", F_BAG, "ORB-SLAM3_F_Bag"),
                    trajectory("F_trajectories/gps_odom.csv", F_BAG, "GPS-Odom_F_Bag"),
                    trajectory("I_trajectories/orb_slam3_phone.csv", I_BAG, "ORB-SLAM3_Phone_I_Bag"),
                    trajectory("I_trajectories/orb_slam3.csv", I_BAG, "ORB-SLAM3_PointGrey_I_Bag"),
                    trajectory("I_trajectories/gps_odom.csv", I_BAG, "GPS-Odom_I_Bag"),
                ],
            },
            SinkKind::Columnar => Self {
                root: PathBuf::from("/data"),
                images: vec![
                    image("F_trajectories/camera_images", "PointGrey_F_Bag", F_BAG),
                    image("I_trajectories/pointgrey_camera_images", "PointGrey_I_Bag", I_BAG),
                    image("I_trajectories/phone_camera_images", "Phone_I_Bag", I_BAG),
                ],
                trajectories: vec![
                    trajectory("F_trajectories/trajectory.csv", F_BAG, "slam"),
                    trajectory("I_trajectories/trajectory.csv", I_BAG, "slam"),
                ],
            },
        }
    }

    /// Parse a layout from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse a layout from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Resolve a source path against the root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT_YAML: &str = r#"
root: /mnt/bags
images:
  - dir: F_trajectories/camera_images
    camera: PointGrey_F_Bag
    bag_file: F_trajectories.bag
trajectories:
  - csv: F_trajectories/orb_slam3.csv
    bag_file: F_trajectories.bag
    trajectory_type: ORB-SLAM3_F_Bag
  - csv: /elsewhere/gps.csv
    bag_file: F_trajectories.bag
    trajectory_type: GPS-Odom_F_Bag
"#;

    #[test]
    fn test_layout_parse_yaml() {
        let layout = Layout::from_yaml(LAYOUT_YAML).expect("parse layout yaml");

        assert_eq!(layout.root, PathBuf::from("/mnt/bags"));
        assert_eq!(layout.images.len(), 1);
        assert_eq!(layout.images[0].camera, "PointGrey_F_Bag");
        assert_eq!(layout.trajectories.len(), 2);
        assert_eq!(layout.trajectories[1].trajectory_type, "GPS-Odom_F_Bag");
    }

    #[test]
    fn test_layout_resolve_relative_and_absolute() {
        let layout = Layout::from_yaml(LAYOUT_YAML).unwrap();

        assert_eq!(
            layout.resolve(&layout.trajectories[0].csv),
            PathBuf::from("/mnt/bags/F_trajectories/orb_slam3.csv")
        );
        assert_eq!(
            layout.resolve(&layout.trajectories[1].csv),
            PathBuf::from("/elsewhere/gps.csv")
        );
    }

    #[test]
    fn test_layout_sections_optional() {
        let layout = Layout::from_yaml("root: /tmp\n").unwrap();
        assert!(layout.images.is_empty());
        assert!(layout.trajectories.is_empty());
    }

    #[test]
    fn test_layout_invalid_yaml() {
        assert!(matches!(
            Layout::from_yaml("images: 12"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_default_layouts() {
        let temporal = Layout::default_for(SinkKind::Temporal);
        assert_eq!(temporal.root, PathBuf::from("/app"));
        assert_eq!(temporal.images.len(), 3);
        assert_eq!(temporal.trajectories[0].trajectory_type, "ORB-SLAM3_F_Bag");

        let columnar = Layout::default_for(SinkKind::Columnar);
        assert_eq!(columnar.root, PathBuf::from("/data"));
        assert!(columnar
            .trajectories
            .iter()
            .all(|t| t.trajectory_type == "slam"));
    }
}
