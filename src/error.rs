//! Error channels of the move-to stage.
//!
//! Setup problems ([`InitStageError`]) abort pipeline construction. Problems that only show
//! up for a particular goal value ([`ConfigurationError`]) fail one invocation and are
//! reported on a [`SolutionRecord`](crate::trajectory::SolutionRecord).

use thiserror::Error;

use crate::trajectory::SolutionRecord;

/// Fatal errors raised while setting up a stage, before any invocation runs.
#[derive(Debug, Error)]
pub enum InitStageError {
    /// The configured group does not exist in the robot model.
    #[error("invalid joint model group: {0}")]
    UnknownGroup(String),

    /// No goal was configured.
    #[error("undefined goal")]
    UndefinedGoal,

    /// The timeout is negative, NaN or infinite.
    #[error("invalid timeout: {0}")]
    InvalidTimeout(f64),

    /// The property document could not be parsed.
    #[error("invalid stage properties: {0}")]
    InvalidProperties(#[from] serde_json::Error),

    /// The planner refused the robot model.
    #[error("planner initialization failed: {0}")]
    PlannerInit(String),
}

/// Per-invocation configuration errors, raised while interpreting a goal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// The group is not part of the robot model.
    #[error("invalid joint model group: {0}")]
    UnknownGroup(String),

    /// No goal is set for this invocation.
    #[error("undefined goal")]
    UndefinedGoal,

    /// The timeout is negative, NaN or infinite.
    #[error("invalid timeout: {0}")]
    InvalidTimeout(f64),

    /// The group has no default state with this name.
    #[error("unknown joint pose: {0}")]
    UnknownNamedPose(String),

    /// A robot state goal that is not flagged as a diff.
    #[error("expecting a diff state")]
    ExpectingDiffState,

    /// The goal names a joint outside the group.
    #[error("joint '{joint}' is not part of group '{group}'")]
    JointNotInGroup { joint: String, group: String },

    /// The group exposes no end-effector tip to fall back on.
    #[error("missing ik frame: group '{group}' has no end-effector tip")]
    MissingIkFrame { group: String },

    /// The group exposes several end-effector tips.
    #[error(
        "ambiguous ik frame: group '{}' has {} end-effector tips ({})",
        .group,
        .tips.len(),
        .tips.join(", ")
    )]
    AmbiguousIkFrame { group: String, tips: Vec<String> },

    /// The scene cannot resolve this frame.
    #[error("unknown frame '{0}'")]
    UnknownFrame(String),

    /// The goal is neither a joint-space nor a Cartesian target.
    #[error("invalid goal type: {0}")]
    InvalidGoalType(String),

    /// The ik frame is not rigidly attached to any robot link.
    #[error("no rigidly connected parent link for frame '{0}'")]
    NoRigidParentLink(String),
}

impl ConfigurationError {
    /// Failed record carrying this error's message and no trajectory.
    pub fn to_solution(&self) -> SolutionRecord {
        let mut solution = SolutionRecord::default();
        solution.mark_as_failure(self.to_string());
        solution
    }
}
