//! Obstacle avoidance constraint for iterative, constraint-stack inverse kinematics solvers.
//!
//! Each iteration of such a solver asks every active constraint for an error vector and a
//! Jacobian block, then combines them (for instance with weighted damped least squares)
//! into a joint step. This crate provides the constraint that steers the links of a
//! kinematic chain away from nearby obstacles while other constraints pursue the task.
//!
//! # Features
//!
//! - Smooth, sigmoid shaped repulsion per link that saturates at a configurable amplitude
//!   and fades out past the avoidance distance, so the solver does not oscillate at the
//!   border of the activation region.
//! - One Jacobian row per link: the link Jacobian is moved to the point closest to the
//!   obstacle and projected on the escape direction.
//! - A stop condition per link: the solver should not stop with a link closer than its
//!   minimum distance.
//! - A single proximity query per iteration serves all monitored links.
//! - Parry3d based proximity service for link and environment shapes (`collisions` feature).
//! - Parameters from YAML (`allow_filesystem` feature).
//!
//! The outer solver loop, collision geometry beyond the provided service, and robot model
//! parsing are left to the caller: plug them in through [`kinematic_traits::KinematicChain`]
//! and [`collisions_traits::CollisionService`].

pub mod avoidance_error;
pub mod kinematic_traits;

pub mod jacobian;
pub mod serial_chain;

pub mod collisions_traits;
pub mod snapshot;

pub mod avoidance_terms;
pub mod avoid_obstacles;
pub mod avoidance_parameters;

#[path = "utils/utils.rs"]
pub mod utils;

#[cfg(feature = "allow_filesystem")]
pub mod parameters_from_file;

#[cfg(feature = "collisions")]
pub mod collisions;

#[cfg(test)]
mod tests;
