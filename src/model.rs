//! Robot model, joint groups and robot configurations.
//!
//! The model is owned by the host and only read here.

use std::collections::BTreeMap;

use nalgebra::Isometry3;
use serde::{Deserialize, Serialize};

/// Named set of joints, plus its end-effector tips and named default configurations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointGroup {
    pub name: String,
    pub joint_names: Vec<String>,
    #[serde(default)]
    pub end_effector_tips: Vec<String>,
    #[serde(default)]
    pub default_states: BTreeMap<String, BTreeMap<String, f64>>,
}

impl JointGroup {
    pub fn new<I, S>(name: impl Into<String>, joints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            joint_names: joints.into_iter().map(Into::into).collect(),
            end_effector_tips: Vec::new(),
            default_states: BTreeMap::new(),
        }
    }

    pub fn with_tip(mut self, tip: impl Into<String>) -> Self {
        self.end_effector_tips.push(tip.into());
        self
    }

    pub fn with_default_state<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let values = values.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.default_states.insert(name.into(), values);
        self
    }

    pub fn contains_joint(&self, joint: &str) -> bool {
        self.joint_names.iter().any(|j| j == joint)
    }

    pub fn end_effector_tips(&self) -> &[String] {
        &self.end_effector_tips
    }

    pub fn default_state(&self, name: &str) -> Option<&BTreeMap<String, f64>> {
        self.default_states.get(name)
    }
}

/// Read-only robot description: a name and its joint groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RobotModel {
    pub name: String,
    pub groups: BTreeMap<String, JointGroup>,
}

impl RobotModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: BTreeMap::new(),
        }
    }

    pub fn with_group(mut self, group: JointGroup) -> Self {
        self.groups.insert(group.name.clone(), group);
        self
    }

    pub fn joint_group(&self, name: &str) -> Option<&JointGroup> {
        self.groups.get(name)
    }
}

/// Wire-level robot state. Only diff states are accepted as goals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RobotStateMsg {
    #[serde(default)]
    pub joint_positions: BTreeMap<String, f64>,
    #[serde(default)]
    pub multi_dof_transforms: BTreeMap<String, Isometry3<f64>>,
    #[serde(default)]
    pub is_diff: bool,
}

impl RobotStateMsg {
    /// Diff state holding the given single-DOF joint values.
    pub fn diff_from_joints(joints: &BTreeMap<String, f64>) -> Self {
        Self {
            joint_positions: joints.clone(),
            multi_dof_transforms: BTreeMap::new(),
            is_diff: true,
        }
    }

    /// Every joint named by the message, single-DOF first.
    pub fn joint_names(&self) -> impl Iterator<Item = &str> {
        self.joint_positions
            .keys()
            .chain(self.multi_dof_transforms.keys())
            .map(String::as_str)
    }
}

/// A full robot configuration: single-DOF joint positions plus multi-DOF joint transforms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RobotState {
    positions: BTreeMap<String, f64>,
    joint_transforms: BTreeMap<String, Isometry3<f64>>,
}

impl RobotState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_positions<I, S>(positions: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            positions: positions.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            joint_transforms: BTreeMap::new(),
        }
    }

    pub fn position(&self, joint: &str) -> Option<f64> {
        self.positions.get(joint).copied()
    }

    pub fn set_position(&mut self, joint: impl Into<String>, value: f64) {
        self.positions.insert(joint.into(), value);
    }

    pub fn positions(&self) -> &BTreeMap<String, f64> {
        &self.positions
    }

    pub fn joint_transform(&self, joint: &str) -> Option<&Isometry3<f64>> {
        self.joint_transforms.get(joint)
    }

    pub fn set_joint_transform(&mut self, joint: impl Into<String>, transform: Isometry3<f64>) {
        self.joint_transforms.insert(joint.into(), transform);
    }

    pub fn joint_transforms(&self) -> &BTreeMap<String, Isometry3<f64>> {
        &self.joint_transforms
    }

    /// Writes the group's named default configuration. Returns `false` if the name is unknown.
    pub fn set_to_default_values(&mut self, group: &JointGroup, name: &str) -> bool {
        let Some(values) = group.default_state(name) else {
            return false;
        };
        for (joint, value) in values {
            self.positions.insert(joint.clone(), *value);
        }
        true
    }

    /// Overlays the joints named by a diff message; joints it does not name are kept.
    pub fn apply_diff(&mut self, msg: &RobotStateMsg) {
        for (joint, value) in &msg.joint_positions {
            self.positions.insert(joint.clone(), *value);
        }
        for (joint, transform) in &msg.multi_dof_transforms {
            self.joint_transforms.insert(joint.clone(), *transform);
        }
    }

    /// Joint-space distance to `other` over the joints both states define.
    ///
    /// Multi-DOF joints contribute their translation distance plus rotation angle.
    pub fn distance(&self, other: &RobotState) -> f64 {
        let single: f64 = self
            .positions
            .iter()
            .filter_map(|(joint, a)| other.positions.get(joint).map(|b| (a - b).powi(2)))
            .sum::<f64>()
            .sqrt();

        let multi: f64 = self
            .joint_transforms
            .iter()
            .filter_map(|(joint, a)| {
                let b = other.joint_transforms.get(joint)?;
                let linear = (a.translation.vector - b.translation.vector).norm();
                Some(linear + a.rotation.angle_to(&b.rotation))
            })
            .sum();

        single + multi
    }

    /// Linear interpolation towards `to` for the given joints (`t` in `[0, 1]`).
    ///
    /// Joints missing from either state keep this state's value.
    pub fn interpolate(&self, to: &RobotState, joints: &[String], t: f64) -> RobotState {
        let mut out = self.clone();
        for joint in joints {
            if let (Some(a), Some(b)) = (self.positions.get(joint), to.positions.get(joint)) {
                out.positions.insert(joint.clone(), a + (b - a) * t);
            }
            if let (Some(a), Some(b)) = (
                self.joint_transforms.get(joint),
                to.joint_transforms.get(joint),
            ) {
                if let Some(pose) = a.try_lerp_slerp(b, t, 1.0e-9) {
                    out.joint_transforms.insert(joint.clone(), pose);
                }
            }
        }
        out
    }
}
