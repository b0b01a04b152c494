//! Planning scene seam.
//!
//! The host owns the scene and its transform tree. This crate reads it through the
//! [`Scene`] trait and commits every change to a private [`SceneDiff`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use nalgebra::Isometry3;

use crate::model::{RobotModel, RobotState};

/// Read-only view of a planning scene.
pub trait Scene: Send + Sync {
    fn robot_model(&self) -> &Arc<RobotModel>;

    /// Frame all world poses are expressed in.
    fn planning_frame(&self) -> &str;

    fn current_state(&self) -> &RobotState;

    /// Pose of `frame_id` in the planning frame with the robot at `state`.
    ///
    /// `None` if the frame is unknown to the scene.
    fn frame_transform_at(&self, state: &RobotState, frame_id: &str) -> Option<Isometry3<f64>>;

    /// Nearest robot link connected to `frame_id` through fixed (zero-DOF) joints only.
    fn rigidly_connected_parent_link(&self, frame_id: &str) -> Option<String>;
}

/// Child view of a scene with its own current state. The parent is never mutated.
#[derive(Clone)]
pub struct SceneDiff {
    parent: Arc<dyn Scene>,
    current_state: RobotState,
}

impl SceneDiff {
    /// Starts a diff at the parent's current state.
    pub fn new(parent: Arc<dyn Scene>) -> Self {
        let current_state = parent.current_state().clone();
        Self {
            parent,
            current_state,
        }
    }

    pub fn parent(&self) -> &Arc<dyn Scene> {
        &self.parent
    }

    pub fn robot_model(&self) -> &Arc<RobotModel> {
        self.parent.robot_model()
    }

    pub fn planning_frame(&self) -> &str {
        self.parent.planning_frame()
    }

    pub fn current_state(&self) -> &RobotState {
        &self.current_state
    }

    pub fn current_state_mut(&mut self) -> &mut RobotState {
        &mut self.current_state
    }

    pub fn set_current_state(&mut self, state: RobotState) {
        self.current_state = state;
    }

    pub fn knows_frame_transform(&self, frame_id: &str) -> bool {
        self.frame_transform(frame_id).is_some()
    }

    /// Pose of `frame_id` in the planning frame, evaluated at this diff's current state.
    pub fn frame_transform(&self, frame_id: &str) -> Option<Isometry3<f64>> {
        self.parent.frame_transform_at(&self.current_state, frame_id)
    }

    pub fn rigidly_connected_parent_link(&self, frame_id: &str) -> Option<String> {
        self.parent.rigidly_connected_parent_link(frame_id)
    }
}

impl fmt::Debug for SceneDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneDiff")
            .field("planning_frame", &self.planning_frame())
            .field("current_state", &self.current_state)
            .finish()
    }
}

/// Creates a diff of `scene`.
pub fn diff(scene: &Arc<dyn Scene>) -> SceneDiff {
    SceneDiff::new(Arc::clone(scene))
}

#[derive(Debug, Clone)]
struct FrameEntry {
    transform: Isometry3<f64>,
    rigid_parent_link: Option<String>,
}

/// In-memory scene with fixed frame poses.
///
/// Frames do not move with the robot state; hosts without a kinematic tree (and tests)
/// use it to describe a snapshot.
#[derive(Debug, Clone)]
pub struct StaticScene {
    model: Arc<RobotModel>,
    planning_frame: String,
    current_state: RobotState,
    frames: BTreeMap<String, FrameEntry>,
}

impl StaticScene {
    /// The planning frame is registered with an identity pose.
    pub fn new(model: Arc<RobotModel>, planning_frame: impl Into<String>) -> Self {
        let planning_frame = planning_frame.into();
        let mut frames = BTreeMap::new();
        frames.insert(
            planning_frame.clone(),
            FrameEntry {
                transform: Isometry3::identity(),
                rigid_parent_link: None,
            },
        );
        Self {
            model,
            planning_frame,
            current_state: RobotState::new(),
            frames,
        }
    }

    pub fn with_state(mut self, state: RobotState) -> Self {
        self.current_state = state;
        self
    }

    /// Adds a robot link. Its rigid parent is itself.
    pub fn with_link(mut self, link: impl Into<String>, pose: Isometry3<f64>) -> Self {
        let link = link.into();
        self.frames.insert(
            link.clone(),
            FrameEntry {
                transform: pose,
                rigid_parent_link: Some(link),
            },
        );
        self
    }

    /// Adds a frame rigidly attached to `parent_link`, placed at `offset` from it.
    ///
    /// The parent link must already be registered; otherwise the offset is taken as a
    /// world pose and the frame has no rigid parent.
    pub fn with_attached_frame(
        mut self,
        frame: impl Into<String>,
        parent_link: &str,
        offset: Isometry3<f64>,
    ) -> Self {
        let entry = match self.frames.get(parent_link) {
            Some(parent) => FrameEntry {
                transform: parent.transform * offset,
                rigid_parent_link: parent.rigid_parent_link.clone(),
            },
            None => FrameEntry {
                transform: offset,
                rigid_parent_link: None,
            },
        };
        self.frames.insert(frame.into(), entry);
        self
    }

    /// Adds a world-fixed frame that does not belong to the robot.
    pub fn with_frame(mut self, frame: impl Into<String>, pose: Isometry3<f64>) -> Self {
        self.frames.insert(
            frame.into(),
            FrameEntry {
                transform: pose,
                rigid_parent_link: None,
            },
        );
        self
    }
}

impl Scene for StaticScene {
    fn robot_model(&self) -> &Arc<RobotModel> {
        &self.model
    }

    fn planning_frame(&self) -> &str {
        &self.planning_frame
    }

    fn current_state(&self) -> &RobotState {
        &self.current_state
    }

    fn frame_transform_at(&self, _state: &RobotState, frame_id: &str) -> Option<Isometry3<f64>> {
        self.frames.get(frame_id).map(|f| f.transform)
    }

    fn rigidly_connected_parent_link(&self, frame_id: &str) -> Option<String> {
        self.frames.get(frame_id)?.rigid_parent_link.clone()
    }
}
