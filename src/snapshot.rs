//! Everything one `evaluate` call needs to know about the current solver iteration

use crate::collisions_traits::{AllowedCollisions, CollisionService, PerLinkProximity, ProximityMap};
use crate::kinematic_traits::{Joints, KinematicChain};

/// Solver state handed to the constraint once per iteration.
#[derive(Clone, Copy)]
pub struct SolverState<'a> {
    /// Joint values of the full chain, in chain order.
    pub joints: &'a Joints,
    /// Kinematic model, used to place links and to express results in the chain base frame.
    pub chain: &'a dyn KinematicChain,
    /// Proximity oracle for the current planning scene.
    pub collisions: &'a dyn CollisionService,
    /// Pairs the proximity query must ignore.
    pub allowed: &'a AllowedCollisions,
}

/// Joint state and per-link proximity, captured once per `evaluate` call and shared by
/// all monitored links. Never kept across iterations.
#[derive(Debug, Clone)]
pub struct IterationSnapshot {
    joints: Vec<f64>,
    /// Proximity in the chain base frame.
    proximity: ProximityMap,
}

impl IterationSnapshot {
    /// Runs a single proximity query for all given links and converts the results from
    /// the world frame into the chain base frame.
    pub fn capture(state: &SolverState, links: &[String]) -> Self {
        let world_to_base = state.chain.base_in_world().inverse();
        let proximity = state.collisions
            .query_proximity(state.chain, state.joints, links, state.allowed)
            .into_iter()
            .map(|(link, p)| (link, p.transformed(&world_to_base)))
            .collect();
        IterationSnapshot { joints: state.joints.to_vec(), proximity }
    }

    /// Builds the snapshot from data already expressed in the chain base frame.
    pub fn from_parts(joints: Vec<f64>, proximity: ProximityMap) -> Self {
        IterationSnapshot { joints, proximity }
    }

    pub fn joints(&self) -> &[f64] {
        &self.joints
    }

    /// Closest threat for the link, None if the link is safe in this iteration.
    pub fn proximity(&self, link: &str) -> Option<&PerLinkProximity> {
        self.proximity.get(link)
    }

    /// Number of links with an active threat.
    pub fn threat_count(&self) -> usize {
        self.proximity.len()
    }
}
