//! Helper functions

use nalgebra::RowDVector;
use crate::avoid_obstacles::ConstraintContribution;
use crate::kinematic_traits::Joints;

/// Allows to specify joint values in degrees (converts to radians)
pub fn as_radians(degrees: &[f64]) -> Vec<f64> {
    degrees.iter().map(|d| d.to_radians()).collect()
}

/// Print joint values, converting radians to degrees.
pub fn dump_joints(joints: &Joints) {
    let row_str: Vec<String> = joints.iter().map(|q| format!("{:5.2}", q.to_degrees())).collect();
    println!("[{}]", row_str.join(" "));
}

/// Print a single Jacobian row
pub fn dump_row(row: &RowDVector<f64>) {
    let row_str: Vec<String> = row.iter().map(|v| format!("{:8.4}", v)).collect();
    println!("[{}]", row_str.join(" "));
}

/// Print the stacked rows of a constraint contribution, one line per monitored link.
pub fn dump_contribution(link_names: &[String], contribution: &ConstraintContribution) {
    if contribution.rows() == 0 {
        println!("No rows");
    }
    for (i, name) in link_names.iter().enumerate().take(contribution.rows()) {
        print!("{:>12}: error {:.5} J ", name, contribution.error[i]);
        dump_row(&contribution.jacobian.row(i).into_owned());
    }
    println!("Stop allowed: {}", contribution.ok);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_as_radians() {
        let joints = as_radians(&[0.0, 90.0, -180.0]);
        assert_eq!(joints.len(), 3);
        assert_eq!(joints[0], 0.0);
        assert!((joints[1] - PI / 2.0).abs() < 1e-12);
        assert!((joints[2] + PI).abs() < 1e-12);
    }
}
