//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::InitStageError;
use crate::geometry::{pose_from_xyz_rpy, translation};
use crate::model::{JointGroup, RobotModel, RobotState};
use crate::planner::{PlanOutcome, PlanTarget, Planner, PlanningRequest};
use crate::scene::{diff, Scene, SceneDiff, StaticScene};
use crate::trajectory::Trajectory;

/// Group "arm" with one tip (`tool0`) and group "dual" with two.
pub(crate) fn arm_model() -> RobotModel {
    RobotModel::new("test_bot")
        .with_group(
            JointGroup::new("arm", ["j1", "j2"])
                .with_tip("tool0")
                .with_default_state("home", [("j1", 0.0), ("j2", 0.0)]),
        )
        .with_group(two_tip_group())
}

pub(crate) fn two_tip_group() -> JointGroup {
    JointGroup::new("dual", ["j1", "j2"])
        .with_tip("left_tip")
        .with_tip("right_tip")
}

/// World-framed scene: `tool0` at (0.5, 0, 0.8) with identity orientation, `tcp` 0.15
/// above it, and a rotated `table` frame.
pub(crate) fn start_scene() -> Arc<dyn Scene> {
    Arc::new(
        StaticScene::new(Arc::new(arm_model()), "world")
            .with_state(RobotState::from_positions([("j1", 0.1), ("j2", 0.2)]))
            .with_link("base_link", translation(0.0, 0.0, 0.0))
            .with_link("tool0", translation(0.5, 0.0, 0.8))
            .with_attached_frame("tcp", "tool0", translation(0.0, 0.0, 0.15))
            .with_link("left_tip", translation(0.4, 0.2, 0.8))
            .with_link("right_tip", translation(0.4, -0.2, 0.8))
            .with_frame(
                "table",
                pose_from_xyz_rpy(1.0, 0.0, 0.4, 0.0, 0.0, std::f64::consts::FRAC_PI_2),
            ),
    )
}

pub(crate) fn single_tip_scene() -> SceneDiff {
    diff(&start_scene())
}

enum Reply {
    /// Straight from start to target.
    Straight,
    Fixed(PlanOutcome),
}

/// Planner double that records requests.
pub(crate) struct ScriptedPlanner {
    reply: Reply,
    requests: Mutex<Vec<PlanningRequest>>,
    inits: AtomicUsize,
}

impl ScriptedPlanner {
    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            requests: Mutex::new(Vec::new()),
            inits: AtomicUsize::new(0),
        }
    }

    /// Joint targets: start then goal. Pose targets: start then start with `j1` nudged.
    pub(crate) fn solving() -> Self {
        Self::with_reply(Reply::Straight)
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self::with_reply(Reply::Fixed(PlanOutcome::no_solution(message)))
    }

    pub(crate) fn returning(outcome: PlanOutcome) -> Self {
        Self::with_reply(Reply::Fixed(outcome))
    }

    pub(crate) fn requests(&self) -> Vec<PlanningRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub(crate) fn init_calls(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }
}

impl Planner for ScriptedPlanner {
    fn init(&self, _model: &RobotModel) -> Result<(), InitStageError> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn plan(&self, request: PlanningRequest) -> PlanOutcome {
        self.requests.lock().expect("requests lock").push(request.clone());

        match &self.reply {
            Reply::Fixed(outcome) => outcome.clone(),
            Reply::Straight => {
                let end = match &request.target {
                    PlanTarget::JointState(goal) => goal.clone(),
                    PlanTarget::LinkPose { .. } => {
                        let mut end = request.start.clone();
                        let j1 = end.position("j1").unwrap_or_default();
                        end.set_position("j1", j1 + 0.1);
                        end
                    }
                };
                let mut trajectory = Trajectory::new(request.group.name.clone());
                trajectory.add_suffix_waypoint(request.start, 0.0);
                trajectory.add_suffix_waypoint(end, 0.5);
                PlanOutcome::Solved(trajectory)
            }
        }
    }
}
