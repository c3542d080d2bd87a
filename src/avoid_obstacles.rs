//! Obstacle avoidance constraint for constraint-stack inverse kinematics.
//!
//! Every monitored link contributes one row per solver iteration: a repulsion error that
//! grows smoothly as the link approaches its closest obstacle, and the Jacobian row of the
//! distance to that obstacle. The outer solver weights and stacks these rows together
//! with the rows of its other constraints.
//!
//! ```
//! use rs_obstacle_avoidance::avoid_obstacles::ObstacleAvoidance;
//!
//! let mut avoidance = ObstacleAvoidance::new();
//! avoidance.add_link("forearm");
//! avoidance.set_min_distance("forearm", 0.05).unwrap();
//! // Unknown links are rejected rather than silently registered
//! assert!(avoidance.set_amplitude("gripper", 0.2).is_err());
//! ```

use nalgebra::{DMatrix, DVector, RowDVector};
use tracing::{debug, error, trace, warn};
use crate::avoidance_error::AvoidanceError;
use crate::avoidance_terms::{distance_jacobian_row, link_error, stop_allowed, DEFAULTS};
use crate::kinematic_traits::{JacobianSolver, KinematicChain};
use crate::snapshot::{IterationSnapshot, SolverState};

/// Avoidance settings and bound kinematics of one monitored link.
pub struct LinkAvoidance {
    name: String,
    weight: f64,
    min_distance: f64,
    avoidance_distance: f64,
    amplitude: f64,
    /// Joints of the full chain, the length of every Jacobian row.
    total_joints: usize,
    /// Joints between the chain base and this link.
    inboard_joints: usize,
    /// Acquired on bind, released with the constraint.
    jacobian_solver: Option<Box<dyn JacobianSolver>>,
}

impl LinkAvoidance {
    /// New link with default parameters, not yet bound to a chain.
    pub fn new(name: &str) -> Self {
        LinkAvoidance {
            name: name.to_string(),
            weight: DEFAULTS.weight,
            min_distance: DEFAULTS.min_distance,
            avoidance_distance: DEFAULTS.avoidance_distance,
            amplitude: DEFAULTS.amplitude,
            total_joints: 0,
            inboard_joints: 0,
            jacobian_solver: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn min_distance(&self) -> f64 {
        self.min_distance
    }

    pub fn avoidance_distance(&self) -> f64 {
        self.avoidance_distance
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    pub fn total_joints(&self) -> usize {
        self.total_joints
    }

    pub fn inboard_joints(&self) -> usize {
        self.inboard_joints
    }

    fn bind(&mut self, chain: &dyn KinematicChain, total_joints: usize) -> Result<(), AvoidanceError> {
        let solver = chain.sub_chain(&self.name).ok_or_else(|| AvoidanceError::SubChainUnavailable {
            base: chain.base_link_name().to_string(),
            link: self.name.clone(),
        })?;
        if solver.joint_count() > total_joints {
            return Err(AvoidanceError::JointCountMismatch {
                expected: total_joints,
                found: solver.joint_count(),
            });
        }
        self.total_joints = total_joints;
        self.inboard_joints = solver.joint_count();
        self.jacobian_solver = Some(solver);
        Ok(())
    }

    /// Error, Jacobian row and stop status of this link for the snapshot.
    fn evaluate(&self, snapshot: &IterationSnapshot) -> (f64, RowDVector<f64>, bool) {
        let proximity = snapshot.proximity(&self.name);
        if proximity.is_none() {
            trace!("No proximity data for link '{}'", self.name);
        }

        let error = link_error(proximity, self.amplitude, self.avoidance_distance);
        let row = match &self.jacobian_solver {
            Some(solver) => distance_jacobian_row(solver.as_ref(), snapshot.joints(), proximity, self.total_joints)
                .unwrap_or_else(|e| {
                    error!("Jacobian of link '{}' not available: {}", self.name, e);
                    RowDVector::zeros(self.total_joints)
                }),
            None => RowDVector::zeros(self.total_joints),
        };
        let status = stop_allowed(proximity, self.min_distance);
        (error, row, status)
    }
}

/// Rows the constraint hands to the outer solver in one iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintContribution {
    /// One repulsion error per monitored link.
    pub error: DVector<f64>,
    /// One row per monitored link, one column per chain joint.
    pub jacobian: DMatrix<f64>,
    /// True if the solver may stop as far as this constraint is concerned.
    pub ok: bool,
}

impl ConstraintContribution {
    /// Contribution without rows for a chain with the given number of joints.
    pub fn empty(total_joints: usize) -> Self {
        ConstraintContribution {
            error: DVector::zeros(0),
            jacobian: DMatrix::zeros(0, total_joints),
            ok: true,
        }
    }

    /// Contribution with `rows` zero rows, ready to be filled with [`set_row`](Self::set_row).
    pub fn zeros(rows: usize, total_joints: usize) -> Self {
        ConstraintContribution {
            error: DVector::zeros(rows),
            jacobian: DMatrix::zeros(rows, total_joints),
            ok: true,
        }
    }

    /// Overwrites row `index`. The status is combined with a logical AND.
    pub fn set_row(&mut self, index: usize, error: f64, row: &RowDVector<f64>, ok: bool) -> Result<(), AvoidanceError> {
        if row.len() != self.jacobian.ncols() {
            return Err(AvoidanceError::JointCountMismatch { expected: self.jacobian.ncols(), found: row.len() });
        }
        if index >= self.rows() {
            return Err(AvoidanceError::Invalid(format!("row {} out of {} rows", index, self.rows())));
        }
        self.error[index] = error;
        self.jacobian.row_mut(index).copy_from(row);
        self.ok &= ok;
        Ok(())
    }

    /// Number of stacked rows.
    pub fn rows(&self) -> usize {
        self.error.len()
    }

    /// Stacks one more row, reallocating the storage. Prefer [`zeros`](Self::zeros) and
    /// [`set_row`](Self::set_row) when the row count is known. The status is combined with
    /// a logical AND.
    pub fn push_row(&mut self, error: f64, row: &RowDVector<f64>, ok: bool) -> Result<(), AvoidanceError> {
        if row.len() != self.jacobian.ncols() {
            return Err(AvoidanceError::JointCountMismatch { expected: self.jacobian.ncols(), found: row.len() });
        }
        let n = self.rows();
        let error_rows = std::mem::replace(&mut self.error, DVector::zeros(0));
        self.error = error_rows.push(error);
        let jacobian = std::mem::replace(&mut self.jacobian, DMatrix::zeros(0, 0));
        self.jacobian = jacobian.insert_row(n, 0.0);
        self.jacobian.row_mut(n).copy_from(row);
        self.ok &= ok;
        Ok(())
    }

    /// Stacks all rows of another contribution below the rows of this one.
    pub fn append(&mut self, other: &ConstraintContribution) -> Result<(), AvoidanceError> {
        if other.jacobian.ncols() != self.jacobian.ncols() {
            return Err(AvoidanceError::JointCountMismatch {
                expected: self.jacobian.ncols(),
                found: other.jacobian.ncols(),
            });
        }
        let (top, bottom) = (self.rows(), other.rows());
        let mut jacobian = DMatrix::zeros(top + bottom, self.jacobian.ncols());
        jacobian.rows_mut(0, top).copy_from(&self.jacobian);
        jacobian.rows_mut(top, bottom).copy_from(&other.jacobian);
        self.jacobian = jacobian;
        self.error = DVector::from_iterator(top + bottom, self.error.iter().chain(other.error.iter()).copied());
        self.ok &= other.ok;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum BindState {
    Unbound,
    Bound,
    /// Binding failed, with the reason.
    Invalid(String),
}

/// Keeps the monitored links of a kinematic chain away from obstacles.
///
/// Configure with [`add_link`](Self::add_link) and the `set_*` methods, then
/// [`bind`](Self::bind) to the chain once, then call [`evaluate`](Self::evaluate) once
/// per solver iteration. Configuration must not change while a solve is running.
pub struct ObstacleAvoidance {
    /// Monitored links, in the order they were added. Rows follow this order.
    links: Vec<LinkAvoidance>,
    state: BindState,
    total_joints: usize,
}

impl Default for ObstacleAvoidance {
    fn default() -> Self {
        Self::new()
    }
}

impl ObstacleAvoidance {
    pub fn new() -> Self {
        ObstacleAvoidance {
            links: Vec::new(),
            state: BindState::Unbound,
            total_joints: 0,
        }
    }

    /// Starts monitoring the link with default parameters. Returns false and keeps the
    /// current parameters if the link is already monitored. Adding a link to a bound
    /// constraint requires binding again.
    pub fn add_link(&mut self, name: &str) -> bool {
        if self.link(name).is_some() {
            return false;
        }
        self.links.push(LinkAvoidance::new(name));
        if self.state == BindState::Bound {
            self.state = BindState::Unbound;
        }
        true
    }

    pub fn set_weight(&mut self, name: &str, weight: f64) -> Result<(), AvoidanceError> {
        check(name, "weight", weight, weight > 0.0)?;
        self.link_mut(name)?.weight = weight;
        Ok(())
    }

    pub fn set_min_distance(&mut self, name: &str, min_distance: f64) -> Result<(), AvoidanceError> {
        check(name, "minimum distance", min_distance, min_distance >= 0.0)?;
        self.link_mut(name)?.min_distance = min_distance;
        Ok(())
    }

    /// The avoidance distance scales the sigmoid and must be positive.
    pub fn set_avoidance_distance(&mut self, name: &str, avoidance_distance: f64) -> Result<(), AvoidanceError> {
        check(name, "avoidance distance", avoidance_distance, avoidance_distance > 0.0)?;
        self.link_mut(name)?.avoidance_distance = avoidance_distance;
        Ok(())
    }

    /// Zero amplitude is accepted and mutes the repulsion of the link.
    pub fn set_amplitude(&mut self, name: &str, amplitude: f64) -> Result<(), AvoidanceError> {
        check(name, "amplitude", amplitude, amplitude >= 0.0)?;
        self.link_mut(name)?.amplitude = amplitude;
        Ok(())
    }

    pub fn link(&self, name: &str) -> Option<&LinkAvoidance> {
        self.links.iter().find(|l| l.name == name)
    }

    fn link_mut(&mut self, name: &str) -> Result<&mut LinkAvoidance, AvoidanceError> {
        self.links.iter_mut()
            .find(|l| l.name == name)
            .ok_or_else(|| AvoidanceError::UnknownLink(name.to_string()))
    }

    pub fn links(&self) -> &[LinkAvoidance] {
        &self.links
    }

    /// Monitored link names in evaluation order.
    pub fn link_names(&self) -> Vec<String> {
        self.links.iter().map(|l| l.name.clone()).collect()
    }

    pub fn is_bound(&self) -> bool {
        self.state == BindState::Bound
    }

    /// Weights of the rows [`evaluate`](Self::evaluate) produces, in the same order.
    pub fn row_weights(&self) -> DVector<f64> {
        DVector::from_iterator(self.links.len(), self.links.iter().map(|l| l.weight))
    }

    /// Resolves the sub-chain of every monitored link. If no links were added, every link
    /// of the chain is monitored with default parameters.
    ///
    /// If a link cannot be reached from the chain base, the constraint becomes invalid and
    /// [`evaluate`](Self::evaluate) reports it until a later bind succeeds.
    pub fn bind(&mut self, chain: &dyn KinematicChain) -> Result<(), AvoidanceError> {
        if self.links.is_empty() {
            warn!("Obstacle avoidance: no links were specified, using all links of the kinematic chain");
            for name in chain.link_names() {
                self.add_link(&name);
            }
        }

        let total_joints = chain.joint_count();
        let result = self.links.iter_mut().try_for_each(|link| link.bind(chain, total_joints));
        match result {
            Ok(()) => {
                self.total_joints = total_joints;
                self.state = BindState::Bound;
                debug!("Obstacle avoidance bound {} links on a {} joint chain", self.links.len(), total_joints);
                Ok(())
            }
            Err(e) => {
                error!("Failed to initialize obstacle avoidance constraint: {}", e);
                self.state = BindState::Invalid(e.to_string());
                Err(e)
            }
        }
    }

    /// Computes the rows of all monitored links for the current solver iteration.
    ///
    /// One proximity query serves all links. Links without an obstacle nearby produce a
    /// zero error and a zero row and do not block stopping. Every link is evaluated even
    /// after one has already vetoed stopping.
    ///
    /// # Errors
    ///
    /// Only when the constraint cannot produce rows at all: not bound, binding failed,
    /// or the joint state does not match the chain.
    pub fn evaluate(&self, state: &SolverState) -> Result<ConstraintContribution, AvoidanceError> {
        match &self.state {
            BindState::Unbound => return Err(AvoidanceError::NotBound),
            BindState::Invalid(reason) => return Err(AvoidanceError::Invalid(reason.clone())),
            BindState::Bound => {}
        }
        if state.joints.len() != self.total_joints {
            return Err(AvoidanceError::JointCountMismatch {
                expected: self.total_joints,
                found: state.joints.len(),
            });
        }

        let snapshot = IterationSnapshot::capture(state, &self.link_names());
        let mut output = ConstraintContribution::zeros(self.links.len(), self.total_joints);
        for (i, link) in self.links.iter().enumerate() {
            let (error, row, ok) = link.evaluate(&snapshot);
            output.set_row(i, error, &row, ok)?;
        }
        debug!("Obstacle avoidance: {} threats among {} links, ok = {}",
            snapshot.threat_count(), self.links.len(), output.ok);
        Ok(output)
    }
}

fn check(link: &str, name: &'static str, value: f64, valid: bool) -> Result<(), AvoidanceError> {
    if value.is_finite() && valid {
        Ok(())
    } else {
        Err(AvoidanceError::InvalidParameter { link: link.to_string(), name, value })
    }
}
