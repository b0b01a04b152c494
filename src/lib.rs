//! PAGI move-to stage.
//!
//! This crate turns a loosely typed goal into a motion target and drives an external
//! planner towards it:
//! - [`GoalValue`]: a named pose, joint values, a diff robot state, or a Cartesian pose/point.
//! - [`MoveTo`]: the stage. Joint-space goals are planned directly; Cartesian goals are
//!   resolved against the ik frame and re-based onto the link that rigidly carries it.
//! - [`Planner`] and [`Scene`]: host-owned collaborators, injected at construction.
//! - [`SolutionRecord`]: the single output of an invocation.
//!
//! Setup errors ([`InitStageError`]) and per-goal errors ([`ConfigurationError`]) are kept
//! apart so a scheduler can abort construction on the former and keep ranking sibling
//! attempts on the latter. A planner that finds nothing is not an error at all.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pagi_move_to::{Direction, JointInterpolationPlanner, MoveTo, Planner, Scene};
//!
//! fn run(scene: Arc<dyn Scene>) -> Result<(), Box<dyn std::error::Error>> {
//!     let planner: Arc<dyn Planner> = Arc::new(JointInterpolationPlanner::default());
//!     let mut stage = MoveTo::new("go home", planner);
//!     stage.set_group("arm");
//!     stage.set_goal_named("home");
//!     stage.init(scene.robot_model())?;
//!
//!     match stage.compute(&scene, Direction::Forward) {
//!         Ok(Some(out)) => println!("success: {}", out.solution.is_success()),
//!         Ok(None) => println!("no plan"),
//!         Err(err) => {
//!             let record = err.to_solution();
//!             println!("rejected: {}", record.failure_message().unwrap_or_default());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod frames;
pub mod geometry;
pub mod goal;
pub mod model;
pub mod planner;
pub mod scene;
pub mod stage;
pub mod trajectory;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{ConfigurationError, InitStageError};
pub use frames::IkFrame;
pub use geometry::{PointStamped, PoseStamped};
pub use goal::{resolve_joint_goal, GoalResolution, GoalSpec, GoalValue};
pub use model::{JointGroup, RobotModel, RobotState, RobotStateMsg};
pub use planner::{
    Constraints, JointInterpolationPlanner, PlanOutcome, PlanTarget, Planner, PlannerDispatcher,
    PlanningRequest,
};
pub use scene::{Scene, SceneDiff, StaticScene};
pub use stage::{Direction, MoveTo, StageProperties, StageSolution};
pub use trajectory::{CostTerm, FrameMarker, PathLength, SolutionRecord, Trajectory, Waypoint};

// Re-export for hosts so poses can be built without declaring `nalgebra` themselves.
pub use nalgebra;
