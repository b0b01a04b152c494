//! Ik frame and Cartesian target resolution.
//!
//! Everything here is a pure function of the goal, the group and a scene snapshot, so
//! resolving the same inputs twice yields identical transforms.

use nalgebra::Isometry3;

use crate::error::ConfigurationError;
use crate::geometry::{with_translation, PoseStamped};
use crate::goal::{GoalSpec, GoalValue};
use crate::model::JointGroup;
use crate::scene::SceneDiff;

/// The frame a Cartesian goal moves, with its offset from that frame.
#[derive(Debug, Clone, PartialEq)]
pub struct IkFrame {
    pub frame_id: String,
    pub offset: Isometry3<f64>,
}

/// The group's single end-effector tip.
pub fn unique_tip(group: &JointGroup) -> Result<&str, ConfigurationError> {
    match group.end_effector_tips() {
        [tip] => Ok(tip.as_str()),
        [] => Err(ConfigurationError::MissingIkFrame {
            group: group.name.clone(),
        }),
        tips => Err(ConfigurationError::AmbiguousIkFrame {
            group: group.name.clone(),
            tips: tips.to_vec(),
        }),
    }
}

/// Picks the ik frame from the declaration, falling back to the group's unique tip.
///
/// Without a declaration the offset is identity; a declaration with an empty frame id
/// keeps its offset but takes the tip as frame. The resulting frame must be known to
/// the scene.
pub fn resolve_ik_frame(
    declared: Option<&PoseStamped>,
    group: &JointGroup,
    scene: &SceneDiff,
) -> Result<IkFrame, ConfigurationError> {
    let frame = match declared {
        None => IkFrame {
            frame_id: unique_tip(group)?.to_string(),
            offset: Isometry3::identity(),
        },
        Some(declared) if declared.frame_id.is_empty() => IkFrame {
            frame_id: unique_tip(group)?.to_string(),
            offset: declared.pose,
        },
        Some(declared) => IkFrame {
            frame_id: declared.frame_id.clone(),
            offset: declared.pose,
        },
    };

    if !scene.knows_frame_transform(&frame.frame_id) {
        return Err(ConfigurationError::UnknownFrame(frame.frame_id));
    }
    Ok(frame)
}

/// World pose of the ik frame: frame transform composed with the local offset.
pub fn ik_frame_world_pose(
    frame: &IkFrame,
    scene: &SceneDiff,
) -> Result<Isometry3<f64>, ConfigurationError> {
    Ok(frame_transform(scene, &frame.frame_id)? * frame.offset)
}

/// World-frame target for a pose or point goal.
///
/// Point goals keep the orientation of `ik_pose_world`.
pub fn resolve_cartesian_target(
    goal: &GoalValue,
    ik_pose_world: &Isometry3<f64>,
    scene: &SceneDiff,
) -> Result<Isometry3<f64>, ConfigurationError> {
    match goal.spec() {
        Some(GoalSpec::CartesianPose(target)) => {
            Ok(frame_transform(scene, &target.frame_id)? * target.pose)
        }
        Some(GoalSpec::CartesianPoint(target)) => {
            let position = frame_transform(scene, &target.frame_id)? * target.point;
            Ok(with_translation(ik_pose_world, &position))
        }
        _ => Err(ConfigurationError::InvalidGoalType(
            goal.type_name().to_string(),
        )),
    }
}

/// Re-expresses `target` as a target for the link rigidly carrying the ik frame.
///
/// Returns the link name and the pose that link must reach for the ik frame to reach
/// `target`.
pub fn rebase_on_rigid_parent(
    target: &Isometry3<f64>,
    ik_pose_world: &Isometry3<f64>,
    ik_frame_id: &str,
    scene: &SceneDiff,
) -> Result<(String, Isometry3<f64>), ConfigurationError> {
    let link = scene
        .rigidly_connected_parent_link(ik_frame_id)
        .ok_or_else(|| ConfigurationError::NoRigidParentLink(ik_frame_id.to_string()))?;
    let link_pose = frame_transform(scene, &link)?;
    let rebased = target * ik_pose_world.inverse() * link_pose;
    Ok((link, rebased))
}

fn frame_transform(
    scene: &SceneDiff,
    frame_id: &str,
) -> Result<Isometry3<f64>, ConfigurationError> {
    scene
        .frame_transform(frame_id)
        .ok_or_else(|| ConfigurationError::UnknownFrame(frame_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{pose_from_xyz_rpy, translation, PointStamped};
    use crate::test_support::{single_tip_scene, two_tip_group};
    use nalgebra::{Point3, UnitQuaternion, Vector3};

    const EPS: f64 = 1e-9;

    fn close(a: &Isometry3<f64>, b: &Isometry3<f64>) -> bool {
        (a.translation.vector - b.translation.vector).norm() < EPS
            && a.rotation.angle_to(&b.rotation) < EPS
    }

    fn arm(scene: &SceneDiff) -> JointGroup {
        scene
            .robot_model()
            .joint_group("arm")
            .cloned()
            .expect("arm group")
    }

    #[test]
    fn undeclared_frame_uses_unique_tip() {
        let scene = single_tip_scene();
        let frame = resolve_ik_frame(None, &arm(&scene), &scene).expect("resolves");

        assert_eq!(frame.frame_id, "tool0");
        assert_eq!(frame.offset, Isometry3::identity());
    }

    #[test]
    fn two_tips_are_ambiguous() {
        let scene = single_tip_scene();
        let err = resolve_ik_frame(None, &two_tip_group(), &scene).unwrap_err();

        assert!(err.to_string().starts_with("ambiguous ik frame"));
    }

    #[test]
    fn no_tip_is_missing() {
        let scene = single_tip_scene();
        let group = JointGroup::new("bare", ["j1"]);
        let err = resolve_ik_frame(None, &group, &scene).unwrap_err();

        assert_eq!(
            err,
            ConfigurationError::MissingIkFrame {
                group: "bare".to_string()
            }
        );
    }

    #[test]
    fn empty_frame_id_keeps_declared_offset() {
        let scene = single_tip_scene();
        let declared = PoseStamped::new("", translation(0.0, 0.0, 0.1));
        let frame = resolve_ik_frame(Some(&declared), &arm(&scene), &scene).expect("resolves");

        assert_eq!(frame.frame_id, "tool0");
        assert_eq!(frame.offset, translation(0.0, 0.0, 0.1));
    }

    #[test]
    fn declared_unknown_frame_fails() {
        let scene = single_tip_scene();
        let declared = PoseStamped::identity("gripper_pad");
        let err = resolve_ik_frame(Some(&declared), &arm(&scene), &scene).unwrap_err();

        assert_eq!(err, ConfigurationError::UnknownFrame("gripper_pad".to_string()));
    }

    #[test]
    fn world_pose_composes_offset() {
        let scene = single_tip_scene();
        let frame = IkFrame {
            frame_id: "tool0".to_string(),
            offset: translation(0.0, 0.0, 0.1),
        };
        let pose = ik_frame_world_pose(&frame, &scene).expect("pose");
        let expected = scene.frame_transform("tool0").expect("tool0") * translation(0.0, 0.0, 0.1);

        assert!(close(&pose, &expected));
    }

    #[test]
    fn point_goal_keeps_ik_orientation() {
        let scene = single_tip_scene();
        let ik_pose = pose_from_xyz_rpy(0.3, 0.0, 0.8, 0.0, 1.0, 0.5);
        let point = PointStamped::new("table", 0.1, 0.2, 0.0);
        let goal = GoalValue::from(GoalSpec::CartesianPoint(point));

        let target = resolve_cartesian_target(&goal, &ik_pose, &scene).expect("target");
        let expected = scene.frame_transform("table").expect("table") * Point3::new(0.1, 0.2, 0.0);

        assert_eq!(target.rotation, ik_pose.rotation);
        assert!((target.translation.vector - expected.coords).norm() < EPS);
    }

    #[test]
    fn point_in_world_with_identity_orientation() {
        let scene = single_tip_scene();
        let point = PointStamped::new("world", 0.0, 0.0, 1.0);
        let goal = GoalValue::from(GoalSpec::CartesianPoint(point));

        let target =
            resolve_cartesian_target(&goal, &translation(0.5, 0.5, 0.5), &scene).expect("target");

        assert_eq!(target.translation.vector, Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(target.rotation, UnitQuaternion::identity());
    }

    #[test]
    fn pose_goal_is_expressed_in_world() {
        let scene = single_tip_scene();
        let local = pose_from_xyz_rpy(0.0, 0.1, 0.2, 0.3, 0.0, 0.0);
        let goal = GoalValue::from(GoalSpec::CartesianPose(PoseStamped::new("table", local)));

        let target =
            resolve_cartesian_target(&goal, &Isometry3::identity(), &scene).expect("target");
        let expected = scene.frame_transform("table").expect("table") * local;

        assert!(close(&target, &expected));
    }

    #[test]
    fn resolution_is_repeatable() {
        let scene = single_tip_scene();
        let ik_pose = pose_from_xyz_rpy(0.3, 0.0, 0.8, 0.2, 0.0, 0.0);
        let goal = GoalValue::from(GoalSpec::CartesianPose(PoseStamped::new(
            "table",
            pose_from_xyz_rpy(0.1, 0.0, 0.3, 0.0, 0.4, 0.0),
        )));

        let first = resolve_cartesian_target(&goal, &ik_pose, &scene).expect("first");
        let second = resolve_cartesian_target(&goal, &ik_pose, &scene).expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn joint_goal_is_an_invalid_cartesian_type() {
        let scene = single_tip_scene();
        let goal = GoalValue::from(GoalSpec::NamedPose("home".to_string()));
        let err = resolve_cartesian_target(&goal, &Isometry3::identity(), &scene).unwrap_err();

        assert_eq!(err, ConfigurationError::InvalidGoalType("named_pose".to_string()));
    }

    #[test]
    fn rebased_link_target_carries_the_offset() {
        let scene = single_tip_scene();
        let frame = IkFrame {
            frame_id: "tcp".to_string(),
            offset: Isometry3::identity(),
        };
        let ik_pose = ik_frame_world_pose(&frame, &scene).expect("tcp pose");
        let target = pose_from_xyz_rpy(0.4, -0.2, 0.5, 0.0, 0.0, 1.0);

        let (link, link_target) =
            rebase_on_rigid_parent(&target, &ik_pose, "tcp", &scene).expect("rebase");

        assert_eq!(link, "tool0");
        // Moving the link to `link_target` puts the tcp on `target`.
        let link_now = scene.frame_transform("tool0").expect("tool0");
        let tcp_from_link = link_now.inverse() * ik_pose;
        assert!(close(&(link_target * tcp_from_link), &target));
    }

    #[test]
    fn frame_without_rigid_parent_cannot_be_rebased() {
        let scene = single_tip_scene();
        let identity = Isometry3::identity();
        let err = rebase_on_rigid_parent(&identity, &identity, "table", &scene).unwrap_err();
        assert_eq!(err, ConfigurationError::NoRigidParentLink("table".to_string()));
    }
}
