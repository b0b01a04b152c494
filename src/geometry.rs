//! Stamped spatial primitives.
//!
//! Poses and points are always carried together with the id of the frame they are
//! expressed in. The math itself is plain [`nalgebra`].

use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// A rigid transform expressed relative to a named frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseStamped {
    pub frame_id: String,
    pub pose: Isometry3<f64>,
}

impl PoseStamped {
    pub fn new(frame_id: impl Into<String>, pose: Isometry3<f64>) -> Self {
        Self {
            frame_id: frame_id.into(),
            pose,
        }
    }

    /// Identity offset in `frame_id`.
    pub fn identity(frame_id: impl Into<String>) -> Self {
        Self::new(frame_id, Isometry3::identity())
    }
}

/// A 3D position expressed relative to a named frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointStamped {
    pub frame_id: String,
    pub point: Point3<f64>,
}

impl PointStamped {
    /// Convenience constructor.
    pub fn new(frame_id: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            frame_id: frame_id.into(),
            point: Point3::new(x, y, z),
        }
    }
}

/// Builds a pose from a translation and roll/pitch/yaw angles (radians).
pub fn pose_from_xyz_rpy(
    x: f64,
    y: f64,
    z: f64,
    roll: f64,
    pitch: f64,
    yaw: f64,
) -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::new(x, y, z),
        UnitQuaternion::from_euler_angles(roll, pitch, yaw),
    )
}

/// Pure translation.
pub fn translation(x: f64, y: f64, z: f64) -> Isometry3<f64> {
    Isometry3::translation(x, y, z)
}

/// Returns `pose` with its translation replaced by `position`, keeping the orientation.
pub fn with_translation(pose: &Isometry3<f64>, position: &Point3<f64>) -> Isometry3<f64> {
    let mut out = *pose;
    out.translation.vector = Vector3::new(position.x, position.y, position.z);
    out
}
