//! Trajectories, diagnostic markers and the per-invocation solution record.

use nalgebra::Isometry3;
use serde::{Deserialize, Serialize};

use crate::model::RobotState;

/// One trajectory sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub state: RobotState,
    /// Seconds since the previous waypoint; zero for the first one.
    pub duration_from_previous: f64,
}

/// Ordered robot states with relative timing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub group: String,
    waypoints: Vec<Waypoint>,
}

impl Trajectory {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            waypoints: Vec::new(),
        }
    }

    /// Appends a waypoint `duration_from_previous` seconds after the last one.
    pub fn add_suffix_waypoint(&mut self, state: RobotState, duration_from_previous: f64) {
        let duration_from_previous = if self.waypoints.is_empty() {
            0.0
        } else {
            duration_from_previous
        };
        self.waypoints.push(Waypoint {
            state,
            duration_from_previous,
        });
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn last_waypoint(&self) -> Option<&RobotState> {
        self.waypoints.last().map(|w| &w.state)
    }

    /// Absolute time of each waypoint.
    pub fn times_from_start(&self) -> Vec<f64> {
        self.waypoints
            .iter()
            .scan(0.0, |t, w| {
                *t += w.duration_from_previous;
                Some(*t)
            })
            .collect()
    }

    pub fn duration(&self) -> f64 {
        self.waypoints.iter().map(|w| w.duration_from_previous).sum()
    }

    /// Reverses the waypoint order. The gap between any two neighbours is unchanged.
    pub fn reverse(&mut self) {
        let gaps: Vec<f64> = self
            .waypoints
            .iter()
            .skip(1)
            .map(|w| w.duration_from_previous)
            .collect();
        self.waypoints.reverse();
        for (waypoint, gap) in self
            .waypoints
            .iter_mut()
            .skip(1)
            .zip(gaps.into_iter().rev())
        {
            waypoint.duration_from_previous = gap;
        }
        if let Some(first) = self.waypoints.first_mut() {
            first.duration_from_previous = 0.0;
        }
    }
}

/// Scores a trajectory; lower is better.
pub trait CostTerm: Send + Sync {
    fn trajectory_cost(&self, trajectory: &Trajectory) -> f64;
}

/// Joint-space length of the path.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathLength;

impl CostTerm for PathLength {
    fn trajectory_cost(&self, trajectory: &Trajectory) -> f64 {
        trajectory
            .waypoints()
            .windows(2)
            .map(|pair| pair[0].state.distance(&pair[1].state))
            .sum()
    }
}

/// Coordinate-axes marker for a frame, for visualization only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMarker {
    pub ns: String,
    pub frame_id: String,
    pub pose: Isometry3<f64>,
    pub scale: f64,
}

/// The single output of one stage invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionRecord {
    trajectory: Option<Trajectory>,
    success: bool,
    failure_message: Option<String>,
    markers: Vec<FrameMarker>,
    /// `None` for failed records and non-finite costs.
    cost: Option<f64>,
}

impl Default for SolutionRecord {
    fn default() -> Self {
        Self {
            trajectory: None,
            success: true,
            failure_message: None,
            markers: Vec::new(),
            cost: Some(0.0),
        }
    }
}

impl SolutionRecord {
    /// Marks the record failed. The cost becomes infinite.
    pub fn mark_as_failure(&mut self, message: impl Into<String>) {
        self.success = false;
        self.failure_message = Some(message.into());
        self.cost = None;
    }

    pub fn set_trajectory(&mut self, trajectory: Trajectory) {
        self.trajectory = Some(trajectory);
    }

    pub fn trajectory(&self) -> Option<&Trajectory> {
        self.trajectory.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn is_failure(&self) -> bool {
        !self.success
    }

    pub fn failure_message(&self) -> Option<&str> {
        self.failure_message.as_deref()
    }

    pub fn markers(&self) -> &[FrameMarker] {
        &self.markers
    }

    pub fn markers_mut(&mut self) -> &mut Vec<FrameMarker> {
        &mut self.markers
    }

    /// Infinite for failed records.
    pub fn cost(&self) -> f64 {
        self.cost.unwrap_or(f64::INFINITY)
    }

    /// Ignored once the record is marked failed. Non-finite costs read back as infinite.
    pub fn set_cost(&mut self, cost: f64) {
        if self.success {
            self.cost = Some(cost).filter(|c| c.is_finite());
        }
    }
}
