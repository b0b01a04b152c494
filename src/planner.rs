//! Planner seam and request dispatch.
//!
//! Finding no trajectory within the budget is a normal [`PlanOutcome`], not an error.

use std::fmt;
use std::time::Duration;

use nalgebra::Isometry3;
use serde::{Deserialize, Serialize};

use crate::error::InitStageError;
use crate::model::{JointGroup, RobotModel, RobotState};
use crate::scene::{Scene, SceneDiff};
use crate::trajectory::Trajectory;

/// Bounds on a single joint along the whole path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointConstraint {
    pub joint_name: String,
    pub position: f64,
    pub tolerance_above: f64,
    pub tolerance_below: f64,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

/// Orientation a link has to keep along the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrientationConstraint {
    pub link_name: String,
    pub frame_id: String,
    pub orientation: nalgebra::UnitQuaternion<f64>,
    pub absolute_axis_tolerances: [f64; 3],
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// Path constraints handed to the planner as-is; honoring them is the planner's job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub joint_constraints: Vec<JointConstraint>,
    #[serde(default)]
    pub orientation_constraints: Vec<OrientationConstraint>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        self.joint_constraints.is_empty() && self.orientation_constraints.is_empty()
    }
}

/// What the planner is asked to reach.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanTarget {
    /// A full robot configuration.
    JointState(RobotState),
    /// A world-frame pose for a robot link.
    LinkPose { link: String, pose: Isometry3<f64> },
}

/// One planning call.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanningRequest {
    pub group: JointGroup,
    pub start: RobotState,
    pub target: PlanTarget,
    pub timeout: Duration,
    pub path_constraints: Constraints,
}

/// Result of a planning call.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    /// The trajectory reaches the target.
    Solved(Trajectory),
    /// A trajectory that does not reach the target.
    Partial { trajectory: Trajectory, message: String },
    NoSolution { message: String },
}

impl PlanOutcome {
    pub fn no_solution(message: impl Into<String>) -> Self {
        PlanOutcome::NoSolution {
            message: message.into(),
        }
    }
}

/// External motion planner.
///
/// Must be reentrant, or serialized by the host, if several stages share it.
pub trait Planner: Send + Sync {
    /// Called once with the robot model before any request.
    fn init(&self, _model: &RobotModel) -> Result<(), InitStageError> {
        Ok(())
    }

    /// Plans within `request.timeout`.
    fn plan(&self, request: PlanningRequest) -> PlanOutcome;
}

/// Builds planning requests for one invocation and hands them to the planner.
pub struct PlannerDispatcher<'a> {
    planner: &'a dyn Planner,
    timeout: Duration,
    path_constraints: &'a Constraints,
}

impl<'a> PlannerDispatcher<'a> {
    pub fn new(
        planner: &'a dyn Planner,
        timeout: Duration,
        path_constraints: &'a Constraints,
    ) -> Self {
        Self {
            planner,
            timeout,
            path_constraints,
        }
    }

    /// Plans from the start scene's state to the end scene's state.
    pub fn plan_joint(
        &self,
        start: &dyn Scene,
        end: &SceneDiff,
        group: &JointGroup,
    ) -> PlanOutcome {
        self.dispatch(
            start,
            group,
            PlanTarget::JointState(end.current_state().clone()),
        )
    }

    /// Plans until `link` reaches the world pose `target`.
    pub fn plan_cartesian(
        &self,
        start: &dyn Scene,
        link: &str,
        target: Isometry3<f64>,
        group: &JointGroup,
    ) -> PlanOutcome {
        self.dispatch(
            start,
            group,
            PlanTarget::LinkPose {
                link: link.to_string(),
                pose: target,
            },
        )
    }

    fn dispatch(&self, start: &dyn Scene, group: &JointGroup, target: PlanTarget) -> PlanOutcome {
        let request = PlanningRequest {
            group: group.clone(),
            start: start.current_state().clone(),
            target,
            timeout: self.timeout,
            path_constraints: self.path_constraints.clone(),
        };
        tracing::debug!(
            group = %group.name,
            timeout_s = self.timeout.as_secs_f64(),
            "dispatching planning request"
        );
        self.planner.plan(request)
    }
}

impl fmt::Debug for PlannerDispatcher<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlannerDispatcher")
            .field("timeout", &self.timeout)
            .field("path_constraints", &self.path_constraints.name)
            .finish()
    }
}

/// Straight-line planner in joint space.
///
/// Cartesian targets need inverse kinematics, which this planner does not do.
#[derive(Debug, Clone)]
pub struct JointInterpolationPlanner {
    /// Largest change of any group joint between two waypoints (radians or meters).
    pub max_step: f64,
    /// Seconds between waypoints.
    pub time_step: f64,
    /// Most interpolation steps a single request may produce.
    pub max_waypoints: usize,
}

impl Default for JointInterpolationPlanner {
    fn default() -> Self {
        Self {
            max_step: 0.1,
            time_step: 0.1,
            max_waypoints: 10_000,
        }
    }
}

impl Planner for JointInterpolationPlanner {
    fn init(&self, _model: &RobotModel) -> Result<(), InitStageError> {
        if !(self.max_step > 0.0 && self.time_step > 0.0 && self.max_waypoints > 0) {
            return Err(InitStageError::PlannerInit(format!(
                "joint interpolation needs positive steps \
                 (max_step={}, time_step={}, max_waypoints={})",
                self.max_step, self.time_step, self.max_waypoints
            )));
        }
        Ok(())
    }

    fn plan(&self, request: PlanningRequest) -> PlanOutcome {
        let goal = match request.target {
            PlanTarget::JointState(goal) => goal,
            PlanTarget::LinkPose { link, .. } => {
                return PlanOutcome::no_solution(format!(
                    "joint interpolation cannot plan to a pose for link '{link}'"
                ));
            }
        };

        let joints = &request.group.joint_names;
        let deltas: Vec<f64> = joints
            .iter()
            .filter_map(|j| Some((goal.position(j)? - request.start.position(j)?).abs()))
            .collect();
        if deltas.iter().any(|d| !d.is_finite()) {
            return PlanOutcome::no_solution("joint goal has a non-finite value");
        }
        let largest_delta = deltas.into_iter().fold(0.0_f64, f64::max);

        let steps = (largest_delta / self.max_step).ceil().max(1.0);
        if steps > self.max_waypoints as f64 {
            return PlanOutcome::no_solution(format!(
                "joint interpolation needs {steps} steps, more than the limit of {}",
                self.max_waypoints
            ));
        }
        let steps = steps as usize;

        let mut trajectory = Trajectory::new(request.group.name.clone());
        trajectory.add_suffix_waypoint(request.start.clone(), 0.0);
        for step in 1..=steps {
            let t = step as f64 / steps as f64;
            let state = if step == steps {
                goal.clone()
            } else {
                request.start.interpolate(&goal, joints, t)
            };
            trajectory.add_suffix_waypoint(state, self.time_step);
        }
        PlanOutcome::Solved(trajectory)
    }
}
