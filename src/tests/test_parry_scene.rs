use nalgebra::{Isometry3, Vector3};
use parry3d::shape::SharedShape;
use crate::avoid_obstacles::ObstacleAvoidance;
use crate::collisions::{CollisionBody, LinkShape, RobotBody};
use crate::collisions_traits::{AllowedCollisions, CollisionService};
use crate::serial_chain::SerialChain;
use crate::snapshot::SolverState;

/// Arm turning about Z with a ball at its tip, and a ball obstacle just left of the tip.
fn scene() -> (SerialChain, RobotBody) {
    let chain = SerialChain::new("base")
        .revolute("arm", Isometry3::identity(), Vector3::z());
    let body = RobotBody {
        link_shapes: vec![LinkShape {
            link: "arm".to_string(),
            shape: SharedShape::ball(0.05),
            local_transform: Isometry3::translation(0.5, 0.0, 0.0),
        }],
        collision_environment: vec![CollisionBody {
            name: "post".to_string(),
            shape: SharedShape::ball(0.05),
            pose: Isometry3::translation(0.5, 0.2, 0.0),
        }],
        margin: 0.5,
    };
    (chain, body)
}

fn distance(chain: &SerialChain, body: &RobotBody, q: f64) -> f64 {
    body.query_proximity(chain, &[q], &["arm".to_string()], &AllowedCollisions::new())
        .get("arm")
        .map_or(f64::INFINITY, |p| p.distance)
}

#[test]
fn test_row_points_away_from_obstacle() {
    let (chain, body) = scene();
    let mut avoidance = ObstacleAvoidance::new();
    avoidance.add_link("arm");
    avoidance.bind(&chain).unwrap();
    let allowed = AllowedCollisions::new();
    let joints = [0.0];
    let state = SolverState { joints: &joints, chain: &chain, collisions: &body, allowed: &allowed };

    let contribution = avoidance.evaluate(&state).unwrap();
    // Closest point (0.5, 0.05, 0) moves along +Y when q grows, toward the post
    assert!((contribution.jacobian[(0, 0)] + 0.5).abs() < 1e-4, "row {}", contribution.jacobian);
    // Gap is 0.1, the center of the default sigmoid
    assert!((contribution.error[0] - 0.15).abs() < 1e-4, "error {}", contribution.error[0]);
}

#[test]
fn test_stepping_along_row_increases_distance() {
    let (chain, body) = scene();
    let mut avoidance = ObstacleAvoidance::new();
    avoidance.add_link("arm");
    avoidance.set_min_distance("arm", 0.15).unwrap();
    avoidance.bind(&chain).unwrap();
    let allowed = AllowedCollisions::new();

    let mut q = 0.0;
    let mut last_distance = distance(&chain, &body, q);
    let mut released = false;
    for _ in 0..100 {
        let joints = [q];
        let state = SolverState { joints: &joints, chain: &chain, collisions: &body, allowed: &allowed };
        let contribution = avoidance.evaluate(&state).unwrap();
        if contribution.ok {
            released = true;
            break;
        }
        q += 2.0 * contribution.jacobian[(0, 0)] * contribution.error[0];
        let d = distance(&chain, &body, q);
        assert!(d > last_distance, "distance dropped from {} to {}", last_distance, d);
        last_distance = d;
    }
    assert!(released, "link never cleared its minimum distance");
    assert!(last_distance >= 0.15);
}
