//! The move-to stage: goal interpretation, planning and solution assembly.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use nalgebra::Isometry3;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, InitStageError};
use crate::frames::{
    ik_frame_world_pose, rebase_on_rigid_parent, resolve_cartesian_target, resolve_ik_frame,
};
use crate::geometry::PoseStamped;
use crate::goal::{resolve_joint_goal, GoalResolution, GoalSpec, GoalValue};
use crate::model::{JointGroup, RobotModel, RobotStateMsg};
use crate::planner::{Constraints, PlanOutcome, Planner, PlannerDispatcher};
use crate::scene::{diff, Scene, SceneDiff};
use crate::trajectory::{CostTerm, FrameMarker, PathLength, SolutionRecord, Trajectory};

/// Scale of the diagnostic frame markers.
const MARKER_SCALE: f64 = 0.1;

fn default_timeout() -> f64 {
    1.0
}

/// Configuration surface of a [`MoveTo`] stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageProperties {
    /// Joint group to move.
    pub group: String,
    /// Frame (plus offset) moved towards Cartesian goals. Defaults to the group's tip.
    #[serde(default)]
    pub ik_frame: Option<PoseStamped>,
    #[serde(default)]
    pub goal: Option<GoalValue>,
    #[serde(default)]
    pub path_constraints: Constraints,
    /// Planning budget in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: f64,
    /// Keep a diagnostic trajectory when planning fails.
    #[serde(default)]
    pub store_failures: bool,
}

impl Default for StageProperties {
    fn default() -> Self {
        Self {
            group: String::new(),
            ik_frame: None,
            goal: None,
            path_constraints: Constraints::default(),
            timeout: default_timeout(),
            store_failures: false,
        }
    }
}

impl StageProperties {
    /// `None` unless the timeout is finite and non-negative.
    pub fn timeout_duration(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.timeout).ok()
    }
}

/// Direction a state is propagated in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Forward,
    /// The trajectory is stored end-to-start.
    Backward,
}

/// Stored output of one invocation.
#[derive(Debug, Clone)]
pub struct StageSolution {
    /// Working scene, at the trajectory's final state.
    pub end_scene: SceneDiff,
    pub solution: SolutionRecord,
}

/// Moves a joint group to a joint-space or Cartesian goal.
pub struct MoveTo {
    name: String,
    planner: Arc<dyn Planner>,
    properties: StageProperties,
    cost_term: Box<dyn CostTerm>,
}

impl MoveTo {
    pub fn new(name: impl Into<String>, planner: Arc<dyn Planner>) -> Self {
        Self::with_properties(name, planner, StageProperties::default())
    }

    pub fn with_properties(
        name: impl Into<String>,
        planner: Arc<dyn Planner>,
        properties: StageProperties,
    ) -> Self {
        Self {
            name: name.into(),
            planner,
            properties,
            cost_term: Box::new(PathLength),
        }
    }

    /// Builds a stage from a JSON property document.
    pub fn from_json(
        name: impl Into<String>,
        planner: Arc<dyn Planner>,
        json: &str,
    ) -> Result<Self, InitStageError> {
        let properties: StageProperties = serde_json::from_str(json)?;
        Ok(Self::with_properties(name, planner, properties))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &StageProperties {
        &self.properties
    }

    pub fn set_group(&mut self, group: impl Into<String>) {
        self.properties.group = group.into();
    }

    pub fn set_timeout(&mut self, seconds: f64) {
        self.properties.timeout = seconds;
    }

    /// Moves `link`, offset by `pose`, towards Cartesian goals.
    pub fn set_ik_frame(&mut self, pose: Isometry3<f64>, link: impl Into<String>) {
        self.properties.ik_frame = Some(PoseStamped::new(link, pose));
    }

    pub fn set_ik_frame_link(&mut self, link: impl Into<String>) {
        self.set_ik_frame(Isometry3::identity(), link);
    }

    pub fn set_goal(&mut self, goal: impl Into<GoalValue>) {
        self.properties.goal = Some(goal.into());
    }

    pub fn set_goal_named(&mut self, name: impl Into<String>) {
        self.set_goal(GoalSpec::NamedPose(name.into()));
    }

    /// Goal given as joint values, stored as a diff state.
    pub fn set_goal_joints(&mut self, joints: &BTreeMap<String, f64>) {
        self.set_goal(GoalSpec::RobotStateDiff(RobotStateMsg::diff_from_joints(joints)));
    }

    pub fn set_path_constraints(&mut self, constraints: Constraints) {
        self.properties.path_constraints = constraints;
    }

    pub fn set_store_failures(&mut self, store: bool) {
        self.properties.store_failures = store;
    }

    pub fn set_cost_term(&mut self, cost_term: impl CostTerm + 'static) {
        self.cost_term = Box::new(cost_term);
    }

    /// Validates what can be checked without a goal instance, then initializes the planner.
    pub fn init(&self, model: &RobotModel) -> Result<(), InitStageError> {
        if model.joint_group(&self.properties.group).is_none() {
            return Err(InitStageError::UnknownGroup(self.properties.group.clone()));
        }
        if self.properties.goal.is_none() {
            return Err(InitStageError::UndefinedGoal);
        }
        if self.properties.timeout_duration().is_none() {
            return Err(InitStageError::InvalidTimeout(self.properties.timeout));
        }
        self.planner.init(model)?;
        tracing::info!(stage = %self.name, group = %self.properties.group, "stage initialized");
        Ok(())
    }

    /// Plans from `start` to the configured goal.
    ///
    /// `Ok(None)` means planning failed and failures are not stored. Configuration errors
    /// found while interpreting the goal are returned as `Err`; see
    /// [`ConfigurationError::to_solution`] for the matching failed record.
    #[tracing::instrument(skip(self, start), fields(stage = %self.name))]
    pub fn compute(
        &self,
        start: &Arc<dyn Scene>,
        dir: Direction,
    ) -> Result<Option<StageSolution>, ConfigurationError> {
        let result = self.plan_to_goal(start, dir);
        if let Err(err) = &result {
            tracing::warn!(error = %err, "goal rejected");
        }
        result
    }

    fn plan_to_goal(
        &self,
        start: &Arc<dyn Scene>,
        dir: Direction,
    ) -> Result<Option<StageSolution>, ConfigurationError> {
        let props = &self.properties;
        let mut scene = diff(start);
        let model = Arc::clone(scene.robot_model());

        let group = model
            .joint_group(&props.group)
            .ok_or_else(|| ConfigurationError::UnknownGroup(props.group.clone()))?;
        let goal = props.goal.as_ref().ok_or(ConfigurationError::UndefinedGoal)?;
        let timeout = props
            .timeout_duration()
            .ok_or(ConfigurationError::InvalidTimeout(props.timeout))?;

        let dispatcher =
            PlannerDispatcher::new(self.planner.as_ref(), timeout, &props.path_constraints);
        let mut solution = SolutionRecord::default();

        let outcome = match resolve_joint_goal(goal, group, scene.current_state_mut())? {
            GoalResolution::JointSpace => {
                tracing::debug!(goal = goal.type_name(), "planning to joint-space goal");
                dispatcher.plan_joint(start.as_ref(), &scene, group)
            }
            GoalResolution::Cartesian => {
                let ik_frame = resolve_ik_frame(props.ik_frame.as_ref(), group, &scene)?;
                let ik_pose_world = ik_frame_world_pose(&ik_frame, &scene)?;
                let target = resolve_cartesian_target(goal, &ik_pose_world, &scene)?;

                let planning_frame = scene.planning_frame();
                solution
                    .markers_mut()
                    .push(frame_marker("target frame", planning_frame, target));
                solution
                    .markers_mut()
                    .push(frame_marker("ik frame", planning_frame, ik_pose_world));

                let (link, link_target) =
                    rebase_on_rigid_parent(&target, &ik_pose_world, &ik_frame.frame_id, &scene)?;
                tracing::debug!(
                    ik_frame = %ik_frame.frame_id,
                    link = %link,
                    goal = goal.type_name(),
                    "planning to Cartesian goal"
                );
                dispatcher.plan_cartesian(start.as_ref(), &link, link_target, group)
            }
        };

        Ok(self.assemble(start.as_ref(), scene, group, solution, outcome, timeout, dir))
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &self,
        start: &dyn Scene,
        mut scene: SceneDiff,
        group: &JointGroup,
        mut solution: SolutionRecord,
        outcome: PlanOutcome,
        timeout: Duration,
        dir: Direction,
    ) -> Option<StageSolution> {
        let (trajectory, failure) = match outcome {
            PlanOutcome::Solved(trajectory) if !trajectory.is_empty() => (Some(trajectory), None),
            PlanOutcome::Solved(_) => {
                let message = "planner returned an empty trajectory".to_string();
                (None, Some(message))
            }
            PlanOutcome::Partial {
                trajectory,
                message,
            } => (Some(trajectory).filter(|t| !t.is_empty()), Some(message)),
            PlanOutcome::NoSolution { message } => (None, Some(message)),
        };
        let failure = failure.map(|message| {
            if message.is_empty() {
                format!("no trajectory found within {:.3}s", timeout.as_secs_f64())
            } else {
                message
            }
        });

        let mut trajectory = match trajectory {
            Some(trajectory) => trajectory,
            None if self.properties.store_failures => failure_trajectory(start, &scene, group),
            None => {
                tracing::info!(
                    reason = failure.as_deref().unwrap_or_default(),
                    "planning failed, nothing stored"
                );
                return None;
            }
        };

        if let Some(last) = trajectory.last_waypoint() {
            scene.set_current_state(last.clone());
        }
        if dir == Direction::Backward {
            trajectory.reverse();
        }
        let cost = self.cost_term.trajectory_cost(&trajectory);
        solution.set_trajectory(trajectory);

        match failure {
            Some(message) => {
                tracing::warn!(reason = %message, "storing failed trajectory");
                solution.mark_as_failure(message);
            }
            None => {
                tracing::info!(cost, "planning succeeded");
                solution.set_cost(cost);
            }
        }

        Some(StageSolution {
            end_scene: scene,
            solution,
        })
    }
}

impl fmt::Debug for MoveTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MoveTo")
            .field("name", &self.name)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

/// Start state at t=0 followed by the working state at t=1.
fn failure_trajectory(start: &dyn Scene, scene: &SceneDiff, group: &JointGroup) -> Trajectory {
    let mut trajectory = Trajectory::new(group.name.clone());
    trajectory.add_suffix_waypoint(start.current_state().clone(), 0.0);
    trajectory.add_suffix_waypoint(scene.current_state().clone(), 1.0);
    trajectory
}

fn frame_marker(ns: &str, planning_frame: &str, pose: Isometry3<f64>) -> FrameMarker {
    FrameMarker {
        ns: ns.to_string(),
        frame_id: planning_frame.to_string(),
        pose,
        scale: MARKER_SCALE,
    }
}
