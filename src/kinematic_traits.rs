//! Interfaces between the avoidance constraint and the kinematic model of the robot

extern crate nalgebra as na;

use na::Isometry3;
use crate::avoidance_error::AvoidanceError;
use crate::jacobian::Jacobian;

/// Pose of a link or of the robot base. It contains both Cartesian position and rotation quaternion
pub type Pose = Isometry3<f64>;

/// Joint values of the full chain, in chain order (radians for revolute joints,
/// meters for prismatic ones).
pub type Joints = [f64];

/// Handle to the part of the chain between its base and one link, able to compute
/// the Jacobian of that link. The handle is owned by whoever resolved it and
/// lives as long as its owner.
pub trait JacobianSolver {
    /// Number of actuated joints between the chain base and the link.
    fn joint_count(&self) -> usize;

    /// Computes the 6 x `joint_count()` Jacobian of the sub-chain tip, expressed in the
    /// chain base frame. Only the first `joint_count()` values are read, so the full
    /// chain joint state may be passed.
    fn jacobian_at(&self, joints: &Joints) -> Result<Jacobian, AvoidanceError>;
}

/// Kinematic model the avoidance constraint is bound to.
pub trait KinematicChain {
    /// Name of the link the chain starts from.
    fn base_link_name(&self) -> &str;

    /// Names of all links of the chain, ordered from the base to the tip.
    fn link_names(&self) -> Vec<String>;

    /// Number of actuated joints of the full chain.
    fn joint_count(&self) -> usize;

    /// Placement of the chain base in the world frame.
    fn base_in_world(&self) -> Pose;

    /// World poses of every link at the given joint state, in chain order.
    fn link_poses(&self, joints: &Joints) -> Vec<(String, Pose)>;

    /// Resolves the sub-chain from the chain base to the given link. Returns None if
    /// the link is not part of this chain.
    fn sub_chain(&self, link: &str) -> Option<Box<dyn JacobianSolver>>;
}
