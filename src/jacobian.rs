extern crate nalgebra as na;
use na::{Isometry3, Matrix6xX, RowDVector, Unit, Vector3};

/// Jacobian of a point rigidly attached to a link
pub struct Jacobian {
    /// A 6xN matrix representing the Jacobian
    ///
    /// The Jacobian matrix maps the joint velocities to the velocity of the reference point.
    /// Each column corresponds to a joint. Rows 0..3 hold the linear velocity, rows 3..6
    /// the angular velocity, both expressed in the chain base frame.
    matrix: Matrix6xX<f64>,

    /// The point (chain base frame) whose linear velocity the top rows describe
    reference_point: Vector3<f64>,
}

impl Jacobian {
    /// Wraps the 6xN matrix computed for the given reference point.
    pub fn new(matrix: Matrix6xX<f64>, reference_point: Vector3<f64>) -> Self {
        Self { matrix, reference_point }
    }

    pub fn matrix(&self) -> &Matrix6xX<f64> {
        &self.matrix
    }

    pub fn reference_point(&self) -> &Vector3<f64> {
        &self.reference_point
    }

    /// Number of joint columns
    pub fn joint_count(&self) -> usize {
        self.matrix.ncols()
    }

    /// Moves the reference point to another point fixed on the same body.
    ///
    /// The body and its motion are unchanged, only the observed point moves. Angular
    /// columns stay as they are, linear columns gain `w x (new - old)`.
    ///
    /// # Arguments
    ///
    /// * `point` - The new reference point, expressed in the chain base frame
    pub fn change_reference_point(&mut self, point: &Vector3<f64>) {
        let offset = point - self.reference_point;
        for i in 0..self.matrix.ncols() {
            let angular: Vector3<f64> = self.matrix.fixed_view::<3, 1>(3, i).into_owned();
            let shifted = self.matrix.fixed_view::<3, 1>(0, i) + angular.cross(&offset);
            self.matrix.fixed_view_mut::<3, 1>(0, i).copy_from(&shifted);
        }
        self.reference_point = *point;
    }

    /// Projects the linear velocity block on the given direction, giving the rate
    /// of change of the reference point position along that direction per joint.
    ///
    /// # Returns
    ///
    /// A 1xN row, one entry per joint column
    pub fn project_linear(&self, direction: &Unit<Vector3<f64>>) -> RowDVector<f64> {
        direction.transpose() * self.matrix.fixed_rows::<3>(0)
    }
}

/// Computes the Jacobian by numerical differentiation of any forward kinematics
///
/// # Arguments
///
/// * `forward` - Pose of the tip for the given joint values
/// * `joints` - The joint configuration
/// * `epsilon` - A small value used for numerical differentiation
///
/// # Returns
///
/// The Jacobian of the tip, the reference point being the tip position at `joints`.
/// This is mostly useful to check analytic Jacobians.
pub fn compute_jacobian<F>(forward: F, joints: &[f64], epsilon: f64) -> Jacobian
where
    F: Fn(&[f64]) -> Isometry3<f64>,
{
    let mut matrix = Matrix6xX::zeros(joints.len());
    let current_pose = forward(joints);
    let current_position = current_pose.translation.vector;
    let current_orientation = current_pose.rotation;

    let mut perturbed_qs = joints.to_vec();
    for i in 0..joints.len() {
        perturbed_qs[i] += epsilon;
        let perturbed_pose = forward(perturbed_qs.as_slice());
        perturbed_qs[i] = joints[i];

        let delta_position = (perturbed_pose.translation.vector - current_position) / epsilon;
        let delta_orientation =
            (perturbed_pose.rotation * current_orientation.inverse()).scaled_axis() / epsilon;

        matrix.fixed_view_mut::<3, 1>(0, i).copy_from(&delta_position);
        matrix.fixed_view_mut::<3, 1>(3, i).copy_from(&delta_orientation);
    }

    Jacobian::new(matrix, current_position)
}
