//! Per-link terms of the obstacle avoidance constraint: the repulsion error, the
//! distance Jacobian row and the stop condition. All of them are pure functions of
//! the link parameters and the proximity seen in the current iteration.

use nalgebra::RowDVector;
use crate::avoidance_error::AvoidanceError;
use crate::collisions_traits::PerLinkProximity;
use crate::kinematic_traits::{JacobianSolver, Joints};

/// Default parameters and shape constants of the avoidance constraint.
#[derive(Debug, Clone, Copy)]
pub struct AvoidanceDefaults {
    pub weight: f64,
    /// Links closer than this to an obstacle do not allow the solver to stop.
    pub min_distance: f64,
    /// Width of the region where the repulsion ramps up.
    pub avoidance_distance: f64,
    /// Maximal repulsion.
    pub amplitude: f64,
    /// Horizontal shift of the sigmoid, in units of the scale.
    pub shift: f64,
    /// Together with `shift`, the number of scale units the avoidance distance spans.
    pub zero_point: f64,
}

pub const DEFAULTS: AvoidanceDefaults = AvoidanceDefaults {
    weight: 1.0,
    min_distance: 0.1,
    avoidance_distance: 0.3,
    amplitude: 0.3,
    shift: 5.0,
    zero_point: 10.0,
};

/// Repulsion magnitude for the given distance to the closest obstacle.
///
/// Logistic ramp `amplitude / (1 + exp(d / s - shift))` with
/// `s = avoidance_distance / (zero_point + shift)`. Close to `amplitude` when touching,
/// fading to nearly zero past `avoidance_distance`, smooth everywhere and never increasing
/// with distance. `avoidance_distance` must be positive.
///
/// In f64 the result stays strictly positive up to roughly 50 avoidance distances
/// and underflows to exactly 0 beyond that.
pub fn repulsion_error(distance: f64, amplitude: f64, avoidance_distance: f64) -> f64 {
    let scale_x = avoidance_distance / (DEFAULTS.zero_point + DEFAULTS.shift);
    let x = distance / scale_x - DEFAULTS.shift;
    if x > 0.0 {
        // exp(x) would overflow long before exp(-x) underflows
        let decay = (-x).exp();
        amplitude * decay / (1.0 + decay)
    } else {
        amplitude / (1.0 + x.exp())
    }
}

/// Error contribution of one link, zero if the link has no obstacle nearby.
pub fn link_error(proximity: Option<&PerLinkProximity>, amplitude: f64, avoidance_distance: f64) -> f64 {
    proximity.map_or(0.0, |p| repulsion_error(p.distance, amplitude, avoidance_distance))
}

/// Single Jacobian row telling how each joint changes the distance of the link to its
/// closest obstacle.
///
/// The link Jacobian is moved to the closest point on the link, then its linear block is
/// projected on the avoidance direction. Only the first `solver.joint_count()` columns can
/// be non zero: joints outboard of the link do not move it.
///
/// # Arguments
///
/// * `solver` - Jacobian of the sub-chain ending at the link
/// * `joints` - Full chain joint state, the leading values belong to the sub-chain
/// * `proximity` - Closest threat in the chain base frame, None if there is none
/// * `total_joints` - Number of joints of the full chain, the row length
pub fn distance_jacobian_row(
    solver: &dyn JacobianSolver,
    joints: &Joints,
    proximity: Option<&PerLinkProximity>,
    total_joints: usize,
) -> Result<RowDVector<f64>, AvoidanceError> {
    let mut row = RowDVector::zeros(total_joints);
    let Some(proximity) = proximity else {
        return Ok(row);
    };

    let inboard = solver.joint_count();
    if inboard > total_joints {
        return Err(AvoidanceError::JointCountMismatch { expected: total_joints, found: inboard });
    }

    let mut jacobian = solver.jacobian_at(&joints[..inboard.min(joints.len())])?;
    if jacobian.joint_count() != inboard {
        return Err(AvoidanceError::JointCountMismatch { expected: inboard, found: jacobian.joint_count() });
    }
    jacobian.change_reference_point(&proximity.closest_point.coords);
    let projected = jacobian.project_linear(&proximity.avoidance_direction);
    row.columns_mut(0, inboard).copy_from(&projected);
    Ok(row)
}

/// True if the solver may stop as far as this link is concerned: the link is not closer
/// to an obstacle than `min_distance`. A link without proximity data is satisfied.
pub fn stop_allowed(proximity: Option<&PerLinkProximity>, min_distance: f64) -> bool {
    match proximity {
        Some(p) => p.distance >= min_distance,
        None => true,
    }
}
