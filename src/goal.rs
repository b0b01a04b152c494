//! Goal values and joint-space goal resolution.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::geometry::{PointStamped, PoseStamped};
use crate::model::{JointGroup, RobotState, RobotStateMsg};

/// A typed goal.
///
/// Serialized adjacently tagged: `{"type": "named_pose", "payload": "home"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum GoalSpec {
    /// One of the group's default configurations.
    NamedPose(String),
    /// Explicit values for joints of the group.
    JointValueMap(BTreeMap<String, f64>),
    /// A robot state message; must be flagged as a diff.
    RobotStateDiff(RobotStateMsg),
    /// Target pose for the ik frame, relative to a named frame.
    CartesianPose(PoseStamped),
    /// Target position for the ik frame, relative to a named frame.
    CartesianPoint(PointStamped),
}

/// A goal as configured: either a typed spec or a value nothing here understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GoalValue {
    Spec(GoalSpec),
    Untyped(serde_json::Value),
}

impl GoalValue {
    pub fn spec(&self) -> Option<&GoalSpec> {
        match self {
            GoalValue::Spec(spec) => Some(spec),
            GoalValue::Untyped(_) => None,
        }
    }

    /// Short name of the goal's kind, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            GoalValue::Spec(GoalSpec::NamedPose(_)) => "named_pose",
            GoalValue::Spec(GoalSpec::JointValueMap(_)) => "joint_value_map",
            GoalValue::Spec(GoalSpec::RobotStateDiff(_)) => "robot_state_diff",
            GoalValue::Spec(GoalSpec::CartesianPose(_)) => "cartesian_pose",
            GoalValue::Spec(GoalSpec::CartesianPoint(_)) => "cartesian_point",
            GoalValue::Untyped(value) => match value {
                serde_json::Value::Null => "null",
                serde_json::Value::Bool(_) => "bool",
                serde_json::Value::Number(_) => "number",
                serde_json::Value::String(_) => "string",
                serde_json::Value::Array(_) => "array",
                serde_json::Value::Object(_) => "object",
            },
        }
    }
}

impl From<GoalSpec> for GoalValue {
    fn from(spec: GoalSpec) -> Self {
        GoalValue::Spec(spec)
    }
}

/// Which kind of target a goal resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalResolution {
    /// The working state now holds the joint-space target.
    JointSpace,
    /// Not a joint-space goal; resolve it as a Cartesian target.
    Cartesian,
}

/// Interprets `goal` as a joint-space target for `group`, writing it into `state`.
///
/// Structural matches that turn out to be invalid fail here instead of falling through to
/// Cartesian resolution. `state` is only written once the goal validated.
pub fn resolve_joint_goal(
    goal: &GoalValue,
    group: &JointGroup,
    state: &mut RobotState,
) -> Result<GoalResolution, ConfigurationError> {
    let Some(spec) = goal.spec() else {
        return Ok(GoalResolution::Cartesian);
    };

    match spec {
        GoalSpec::NamedPose(name) => {
            if !state.set_to_default_values(group, name) {
                return Err(ConfigurationError::UnknownNamedPose(name.clone()));
            }
        }
        GoalSpec::RobotStateDiff(msg) => {
            if !msg.is_diff {
                return Err(ConfigurationError::ExpectingDiffState);
            }
            ensure_joints_in_group(msg.joint_names(), group)?;
            state.apply_diff(msg);
        }
        GoalSpec::JointValueMap(joints) => {
            ensure_joints_in_group(joints.keys().map(String::as_str), group)?;
            for (joint, value) in joints {
                state.set_position(joint.clone(), *value);
            }
        }
        GoalSpec::CartesianPose(_) | GoalSpec::CartesianPoint(_) => {
            return Ok(GoalResolution::Cartesian);
        }
    }

    Ok(GoalResolution::JointSpace)
}

fn ensure_joints_in_group<'a>(
    joints: impl IntoIterator<Item = &'a str>,
    group: &JointGroup,
) -> Result<(), ConfigurationError> {
    for joint in joints {
        if !group.contains_joint(joint) {
            return Err(ConfigurationError::JointNotInGroup {
                joint: joint.to_string(),
                group: group.name.clone(),
            });
        }
    }
    Ok(())
}
