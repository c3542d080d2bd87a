//! Proximity data and the collision service contract consumed by the avoidance constraint

use std::collections::{HashMap, HashSet};
use nalgebra::{Point3, Unit, Vector3};
use crate::kinematic_traits::{Joints, KinematicChain, Pose};

/// Closest threat to one link, as reported by collision detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerLinkProximity {
    /// Signed distance to the closest obstacle, negative when penetrating.
    pub distance: f64,
    /// Point on the link closest to the obstacle.
    pub closest_point: Point3<f64>,
    /// Direction that moves the link away from the obstacle.
    pub avoidance_direction: Unit<Vector3<f64>>,
}

impl PerLinkProximity {
    /// Expresses this proximity in another frame. Points are rotated and translated,
    /// directions are only rotated.
    pub fn transformed(&self, transform: &Pose) -> Self {
        PerLinkProximity {
            distance: self.distance,
            closest_point: transform * self.closest_point,
            avoidance_direction: transform.rotation * self.avoidance_direction,
        }
    }
}

/// Proximity per link name. A link without an entry has no active threat.
pub type ProximityMap = HashMap<String, PerLinkProximity>;

/// Pairs of bodies (links or environment objects) whose proximity must be ignored,
/// like adjacent links that always touch.
#[derive(Debug, Clone, Default)]
pub struct AllowedCollisions {
    pairs: HashSet<(String, String)>,
}

impl AllowedCollisions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows the two bodies to come close. Order of the names does not matter.
    pub fn allow(&mut self, a: &str, b: &str) {
        self.pairs.insert(Self::key(a, b));
    }

    /// Builder variant of [`AllowedCollisions::allow`].
    pub fn with(mut self, a: &str, b: &str) -> Self {
        self.allow(a, b);
        self
    }

    pub fn is_allowed(&self, a: &str, b: &str) -> bool {
        self.pairs.contains(&Self::key(a, b))
    }

    fn key(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }
}

/// A trait for querying how close the robot links are to obstacles.
///
/// One query serves all monitored links of a solver iteration, so implementations
/// should batch the whole link set instead of being called once per link.
pub trait CollisionService {
    /// Computes the closest threat for each of the given links.
    ///
    /// # Arguments
    /// * `chain` - The kinematic model used to place the links.
    /// * `joints` - The joint state of the full chain.
    /// * `links` - Names of the links to report proximity for.
    /// * `allowed` - Pairs that must not be reported.
    ///
    /// # Returns
    /// * Proximity in the world frame for every listed link that has an obstacle within the
    ///   service range. Links without entries are considered safe.
    fn query_proximity(
        &self,
        chain: &dyn KinematicChain,
        joints: &Joints,
        links: &[String],
        allowed: &AllowedCollisions,
    ) -> ProximityMap;
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Isometry3, UnitQuaternion};

    #[test]
    fn test_allowed_pairs_are_unordered() {
        let allowed = AllowedCollisions::new().with("forearm", "upper_arm");
        assert!(allowed.is_allowed("upper_arm", "forearm"));
        assert!(allowed.is_allowed("forearm", "upper_arm"));
        assert!(!allowed.is_allowed("forearm", "table"));
    }

    #[test]
    fn test_transform_rotates_direction_without_translation() {
        let proximity = PerLinkProximity {
            distance: 0.2,
            closest_point: Point3::new(1.0, 0.0, 0.0),
            avoidance_direction: Vector3::x_axis(),
        };
        let transform = Isometry3::from_parts(
            nalgebra::Translation3::new(0.0, 0.0, 5.0),
            UnitQuaternion::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_2),
        );
        let moved = proximity.transformed(&transform);
        assert_eq!(moved.distance, 0.2);
        assert!((moved.closest_point - Point3::new(0.0, 1.0, 5.0)).norm() < 1e-12);
        assert!((moved.avoidance_direction.into_inner() - Vector3::y()).norm() < 1e-12);
    }
}
