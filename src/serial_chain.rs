//! Serial chain of named links, sufficient to bind and exercise the avoidance constraint
//! without an external kinematics library.

extern crate nalgebra as na;

use na::{Isometry3, Matrix6xX, Translation3, Unit, UnitQuaternion, Vector3};
use crate::avoidance_error::AvoidanceError;
use crate::jacobian::Jacobian;
use crate::kinematic_traits::{JacobianSolver, Joints, KinematicChain, Pose};

/// Motion a segment adds on top of its static origin.
#[derive(Debug, Clone)]
pub enum JointKind {
    /// Rotation about the axis, given in the joint frame.
    Revolute(Unit<Vector3<f64>>),
    /// Translation along the axis, given in the joint frame.
    Prismatic(Unit<Vector3<f64>>),
    /// Rigid attachment, consumes no joint value.
    Fixed,
}

impl JointKind {
    fn is_actuated(&self) -> bool {
        !matches!(self, JointKind::Fixed)
    }

    fn motion(&self, value: f64) -> Isometry3<f64> {
        match self {
            JointKind::Revolute(axis) =>
                Isometry3::from_parts(Translation3::identity(), UnitQuaternion::from_axis_angle(axis, value)),
            JointKind::Prismatic(axis) =>
                Isometry3::from_parts(Translation3::from(axis.into_inner() * value), UnitQuaternion::identity()),
            JointKind::Fixed => Isometry3::identity(),
        }
    }
}

/// One link of the chain together with the joint connecting it to its parent.
#[derive(Debug, Clone)]
pub struct Segment {
    /// Name of the child link this segment ends at.
    pub link: String,
    /// Static transform from the parent link frame to the joint frame.
    pub origin: Isometry3<f64>,
    pub joint: JointKind,
}

/// Ordered chain of segments from the base link to the tip link.
#[derive(Debug, Clone)]
pub struct SerialChain {
    base_link: String,
    segments: Vec<Segment>,
    base_in_world: Pose,
}

impl SerialChain {
    /// Creates an empty chain that starts at the given base link, placed at the world origin.
    pub fn new(base_link: &str) -> Self {
        SerialChain {
            base_link: base_link.to_string(),
            segments: Vec::new(),
            base_in_world: Pose::identity(),
        }
    }

    /// Places the chain base in the world.
    pub fn with_base_in_world(mut self, base_in_world: Pose) -> Self {
        self.base_in_world = base_in_world;
        self
    }

    /// Appends a link attached by a revolute joint rotating about `axis`.
    pub fn revolute(self, link: &str, origin: Isometry3<f64>, axis: Vector3<f64>) -> Self {
        self.push(link, origin, JointKind::Revolute(Unit::new_normalize(axis)))
    }

    /// Appends a link attached by a prismatic joint sliding along `axis`.
    pub fn prismatic(self, link: &str, origin: Isometry3<f64>, axis: Vector3<f64>) -> Self {
        self.push(link, origin, JointKind::Prismatic(Unit::new_normalize(axis)))
    }

    /// Appends a link rigidly attached to the previous one.
    pub fn fixed(self, link: &str, origin: Isometry3<f64>) -> Self {
        self.push(link, origin, JointKind::Fixed)
    }

    fn push(mut self, link: &str, origin: Isometry3<f64>, joint: JointKind) -> Self {
        self.segments.push(Segment { link: link.to_string(), origin, joint });
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Pose of the tip link in the chain base frame.
    pub fn forward(&self, joints: &Joints) -> Pose {
        link_frames(&self.segments, joints)
            .last()
            .copied()
            .unwrap_or_else(Pose::identity)
    }
}

/// Link frames in the chain base frame, one per segment. Missing joint values are taken as zero.
fn link_frames(segments: &[Segment], joints: &Joints) -> Vec<Pose> {
    let mut transform = Pose::identity();
    let mut values = joints.iter();
    segments.iter().map(|segment| {
        transform *= segment.origin;
        if segment.joint.is_actuated() {
            let value = values.next().copied().unwrap_or(0.0);
            transform *= segment.joint.motion(value);
        }
        transform
    }).collect()
}

fn actuated_count(segments: &[Segment]) -> usize {
    segments.iter().filter(|s| s.joint.is_actuated()).count()
}

impl KinematicChain for SerialChain {
    fn base_link_name(&self) -> &str {
        &self.base_link
    }

    fn link_names(&self) -> Vec<String> {
        self.segments.iter().map(|s| s.link.clone()).collect()
    }

    fn joint_count(&self) -> usize {
        actuated_count(&self.segments)
    }

    fn base_in_world(&self) -> Pose {
        self.base_in_world
    }

    fn link_poses(&self, joints: &Joints) -> Vec<(String, Pose)> {
        let mut poses = Vec::with_capacity(self.segments.len() + 1);
        poses.push((self.base_link.clone(), self.base_in_world));
        for (segment, frame) in self.segments.iter().zip(link_frames(&self.segments, joints)) {
            poses.push((segment.link.clone(), self.base_in_world * frame));
        }
        poses
    }

    fn sub_chain(&self, link: &str) -> Option<Box<dyn JacobianSolver>> {
        if link == self.base_link {
            return Some(Box::new(SubChain { segments: Vec::new(), joint_count: 0 }));
        }
        let end = self.segments.iter().position(|s| s.link == link)?;
        let segments = self.segments[..=end].to_vec();
        let joint_count = actuated_count(&segments);
        Some(Box::new(SubChain { segments, joint_count }))
    }
}

/// Owned copy of the segments between the chain base and one link.
pub struct SubChain {
    segments: Vec<Segment>,
    joint_count: usize,
}

impl JacobianSolver for SubChain {
    fn joint_count(&self) -> usize {
        self.joint_count
    }

    /// Geometric Jacobian: a revolute joint contributes `z x (p_tip - o)` linear and `z`
    /// angular velocity, a prismatic one `z` linear and nothing angular.
    fn jacobian_at(&self, joints: &Joints) -> Result<Jacobian, AvoidanceError> {
        if joints.len() < self.joint_count {
            return Err(AvoidanceError::JointCountMismatch {
                expected: self.joint_count,
                found: joints.len(),
            });
        }

        let mut transform = Pose::identity();
        let mut axes = Vec::with_capacity(self.joint_count);
        let mut values = joints.iter();
        for segment in &self.segments {
            transform *= segment.origin;
            match &segment.joint {
                JointKind::Revolute(axis) | JointKind::Prismatic(axis) => {
                    // Axis and origin are recorded before the joint moves
                    let world_axis = transform.rotation * axis.into_inner();
                    axes.push((transform.translation.vector, world_axis, &segment.joint));
                    let value = values.next().copied().unwrap_or(0.0);
                    transform *= segment.joint.motion(value);
                }
                JointKind::Fixed => {}
            }
        }

        let tip = transform.translation.vector;
        let mut matrix = Matrix6xX::zeros(self.joint_count);
        for (i, (origin, axis, joint)) in axes.into_iter().enumerate() {
            let (linear, angular) = match joint {
                JointKind::Prismatic(_) => (axis, Vector3::zeros()),
                _ => (axis.cross(&(tip - origin)), axis),
            };
            matrix.fixed_view_mut::<3, 1>(0, i).copy_from(&linear);
            matrix.fixed_view_mut::<3, 1>(3, i).copy_from(&angular);
        }
        Ok(Jacobian::new(matrix, tip))
    }
}
