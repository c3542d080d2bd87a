//! Implements proximity queries between robot links and their surroundings

use std::collections::{HashMap, HashSet};
use nalgebra::{Isometry3, Unit};
use parry3d::query::Contact;
use parry3d::shape::SharedShape;
use tracing::{trace, warn};
use crate::collisions_traits::{AllowedCollisions, CollisionService, PerLinkProximity, ProximityMap};
use crate::kinematic_traits::{Joints, KinematicChain};

/// Shape rigidly attached to a robot link. A link may carry several shapes.
pub struct LinkShape {
    /// Name of the link this shape moves with
    pub link: String,
    pub shape: SharedShape,
    /// Placement of the shape in the link frame
    pub local_transform: Isometry3<f32>,
}

/// Static object that the robot must keep away from.
/// Unlike robot link, it has the global transform allowing to place it
/// where desired.
pub struct CollisionBody {
    /// Name used in allowed collision pairs
    pub name: String,
    pub shape: SharedShape,
    /// Global transform of this collision object.
    pub pose: Isometry3<f32>,
}

/// Pair of shapes to run the contact query on. The first shape is always a link.
struct ProximityTask<'a> {
    link_i: &'a str,
    /// Name of the second body, Some if it is a link and must be reported too
    link_j: Option<&'a str>,
    transform_i: Isometry3<f32>,
    transform_j: Isometry3<f32>,
    shape_i: &'a SharedShape,
    shape_j: &'a SharedShape,
}

/// Geometry of the robot and of the static environment around it.
pub struct RobotBody {
    /// Shapes of the robot links
    pub link_shapes: Vec<LinkShape>,

    /// Environment objects around the robot.
    pub collision_environment: Vec<CollisionBody>,

    /// Obstacles farther than this from a link are not reported. Should be
    /// at least the largest avoidance distance in use.
    pub margin: f32,
}

impl RobotBody {
    fn build_tasks<'a>(
        &'a self,
        poses: &HashMap<String, Isometry3<f32>>,
        monitored: &HashSet<&str>,
        allowed: &AllowedCollisions,
    ) -> Vec<ProximityTask<'a>> {
        let placed: Vec<(&LinkShape, Isometry3<f32>)> = self.link_shapes.iter()
            .filter_map(|ls| match poses.get(&ls.link) {
                Some(pose) => Some((ls, pose * ls.local_transform)),
                None => {
                    warn!("Link '{}' carries a shape but is not part of the kinematic chain", ls.link);
                    None
                }
            })
            .collect();

        let mut tasks = Vec::new();
        for (i, &(ls_i, pose_i)) in placed.iter().enumerate() {
            let watched_i = monitored.contains(ls_i.link.as_str());

            // Link against environment is only relevant for monitored links
            if watched_i {
                for env_obj in &self.collision_environment {
                    if allowed.is_allowed(&ls_i.link, &env_obj.name) {
                        continue;
                    }
                    tasks.push(ProximityTask {
                        link_i: &ls_i.link,
                        link_j: None,
                        transform_i: pose_i,
                        transform_j: env_obj.pose,
                        shape_i: &ls_i.shape,
                        shape_j: &env_obj.shape,
                    });
                }
            }

            for &(ls_j, pose_j) in placed.iter().skip(i + 1) {
                if ls_i.link == ls_j.link || allowed.is_allowed(&ls_i.link, &ls_j.link) {
                    continue;
                }
                let watched_j = monitored.contains(ls_j.link.as_str());
                if !watched_i && !watched_j {
                    continue;
                }
                tasks.push(ProximityTask {
                    link_i: &ls_i.link,
                    link_j: Some(&ls_j.link),
                    transform_i: pose_i,
                    transform_j: pose_j,
                    shape_i: &ls_i.shape,
                    shape_j: &ls_j.shape,
                });
            }
        }
        tasks
    }

    fn contact(&self, task: &ProximityTask) -> Option<Contact> {
        match parry3d::query::contact(
            &task.transform_i, &**task.shape_i, &task.transform_j, &**task.shape_j, self.margin) {
            Ok(contact) => contact,
            Err(_) => {
                warn!("Proximity between '{}' and its neighbour is not supported by parry3d", task.link_i);
                None
            }
        }
    }
}

/// Keeps the entry with the smallest distance for the link.
fn keep_closest(map: &mut ProximityMap, link: &str, candidate: PerLinkProximity) {
    match map.get(link) {
        Some(existing) if existing.distance <= candidate.distance => {}
        _ => {
            map.insert(link.to_string(), candidate);
        }
    }
}

impl CollisionService for RobotBody {
    fn query_proximity(
        &self,
        chain: &dyn KinematicChain,
        joints: &Joints,
        links: &[String],
        allowed: &AllowedCollisions,
    ) -> ProximityMap {
        let poses: HashMap<String, Isometry3<f32>> = chain.link_poses(joints)
            .into_iter()
            .map(|(name, pose)| (name, pose.cast::<f32>()))
            .collect();
        let monitored: HashSet<&str> = links.iter().map(String::as_str).collect();

        let mut proximity = ProximityMap::with_capacity(links.len());
        for task in self.build_tasks(&poses, &monitored, allowed) {
            let Some(contact) = self.contact(&task) else { continue };
            let distance = contact.dist as f64;

            // The contact normals point from each shape toward the other one
            if monitored.contains(task.link_i) {
                keep_closest(&mut proximity, task.link_i, PerLinkProximity {
                    distance,
                    closest_point: contact.point1.cast::<f64>(),
                    avoidance_direction: Unit::new_normalize(-contact.normal1.into_inner().cast::<f64>()),
                });
            }
            if let Some(link_j) = task.link_j.filter(|l| monitored.contains(l)) {
                keep_closest(&mut proximity, link_j, PerLinkProximity {
                    distance,
                    closest_point: contact.point2.cast::<f64>(),
                    avoidance_direction: Unit::new_normalize(-contact.normal2.into_inner().cast::<f64>()),
                });
            }
        }
        trace!("Proximity query for {} links found {} threats", links.len(), proximity.len());
        proximity
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::{Point3, Vector3};
    use super::*;
    use crate::serial_chain::SerialChain;

    /// One revolute joint about Z, a ball of radius 0.05 half a meter along the arm.
    fn one_ball_arm() -> (SerialChain, RobotBody) {
        let chain = SerialChain::new("base")
            .revolute("arm", Isometry3::identity(), Vector3::z());
        let body = RobotBody {
            link_shapes: vec![LinkShape {
                link: "arm".to_string(),
                shape: SharedShape::ball(0.05),
                local_transform: Isometry3::translation(0.5, 0.0, 0.0),
            }],
            collision_environment: vec![CollisionBody {
                name: "lamp".to_string(),
                shape: SharedShape::ball(0.1),
                pose: Isometry3::translation(0.5, 0.0, 0.3),
            }],
            margin: 0.5,
        };
        (chain, body)
    }

    fn links(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_link_near_environment() {
        let (chain, body) = one_ball_arm();
        let proximity = body.query_proximity(&chain, &[0.0], &links(&["arm"]), &AllowedCollisions::new());
        let arm = proximity.get("arm").expect("arm must be reported");
        assert!((arm.distance - 0.15).abs() < 1e-5, "distance {}", arm.distance);
        assert!((arm.closest_point - Point3::new(0.5, 0.0, 0.05)).norm() < 1e-5);
        // Obstacle is above, escape is downwards
        assert!((arm.avoidance_direction.into_inner() - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-5);
    }

    #[test]
    fn test_obstacle_beyond_margin_not_reported() {
        let (chain, mut body) = one_ball_arm();
        body.margin = 0.1;
        let proximity = body.query_proximity(&chain, &[0.0], &links(&["arm"]), &AllowedCollisions::new());
        assert!(proximity.is_empty());
    }

    #[test]
    fn test_allowed_pair_ignored() {
        let (chain, body) = one_ball_arm();
        let allowed = AllowedCollisions::new().with("lamp", "arm");
        let proximity = body.query_proximity(&chain, &[0.0], &links(&["arm"]), &allowed);
        assert!(proximity.is_empty());
    }

    #[test]
    fn test_unmonitored_link_not_reported() {
        let (chain, body) = one_ball_arm();
        let proximity = body.query_proximity(&chain, &[0.0], &links(&[]), &AllowedCollisions::new());
        assert!(proximity.is_empty());
    }

    #[test]
    fn test_rotating_away_from_obstacle() {
        let (chain, body) = one_ball_arm();
        // Quarter turn moves the ball to (0, 0.5, 0), beyond the margin from the lamp
        let proximity = body.query_proximity(
            &chain, &[std::f64::consts::FRAC_PI_2], &links(&["arm"]), &AllowedCollisions::new());
        assert!(proximity.get("arm").is_none());
    }

    #[test]
    fn test_self_proximity_reports_both_links() {
        let chain = SerialChain::new("base")
            .revolute("upper_arm", Isometry3::identity(), Vector3::z())
            .revolute("forearm", Isometry3::translation(0.5, 0.0, 0.0), Vector3::z());
        let body = RobotBody {
            link_shapes: vec![
                LinkShape {
                    link: "upper_arm".to_string(),
                    shape: SharedShape::ball(0.05),
                    local_transform: Isometry3::translation(0.2, 0.0, 0.0),
                },
                LinkShape {
                    link: "forearm".to_string(),
                    shape: SharedShape::ball(0.05),
                    local_transform: Isometry3::translation(0.15, 0.0, 0.0),
                },
            ],
            collision_environment: vec![],
            margin: 1.0,
        };
        // Forearm folded back over the upper arm: balls at x = 0.2 and x = 0.35
        let proximity = body.query_proximity(
            &chain, &[0.0, std::f64::consts::PI], &links(&["upper_arm", "forearm"]), &AllowedCollisions::new());
        let upper = proximity.get("upper_arm").expect("upper_arm must be reported");
        let fore = proximity.get("forearm").expect("forearm must be reported");
        assert!((upper.distance - 0.05).abs() < 1e-5, "distance {}", upper.distance);
        assert!((fore.distance - 0.05).abs() < 1e-5, "distance {}", fore.distance);
        assert!(upper.avoidance_direction.x < -0.99);
        assert!(fore.avoidance_direction.x > 0.99);
    }
}
