//! Avoidance parameters as they come from a configuration source: a list of link names
//! with optional per-link parameter arrays.

use tracing::warn;
use crate::avoid_obstacles::ObstacleAvoidance;
use crate::avoidance_error::AvoidanceError;

/// Link names plus optional arrays parallel to them. An absent array means defaults
/// are used for that parameter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvoidanceParameters {
    pub link_names: Vec<String>,
    pub amplitude: Option<Vec<f64>>,
    pub minimum_distance: Option<Vec<f64>>,
    pub avoidance_distance: Option<Vec<f64>>,
    pub weight: Option<Vec<f64>>,
}

impl AvoidanceParameters {
    /// Registers every listed link with the constraint and sets the parameters given.
    ///
    /// An array whose length differs from the number of links is dropped with a warning
    /// and defaults are used for that parameter only. Out of range values are rejected,
    /// and then the constraint is left exactly as it was.
    pub fn apply(&self, avoidance: &mut ObstacleAvoidance) -> Result<(), AvoidanceError> {
        let arrays = [
            self.checked("amplitude", &self.amplitude),
            self.checked("minimum_distance", &self.minimum_distance),
            self.checked("avoidance_distance", &self.avoidance_distance),
            self.checked("weight", &self.weight),
        ];

        // Dry run on a scratch constraint validates every value first
        self.configure(&mut ObstacleAvoidance::new(), &arrays)?;
        self.configure(avoidance, &arrays)
    }

    fn configure(&self, avoidance: &mut ObstacleAvoidance, arrays: &[Option<&[f64]>; 4]) -> Result<(), AvoidanceError> {
        let [amplitude, minimum_distance, avoidance_distance, weight] = *arrays;
        for (i, name) in self.link_names.iter().enumerate() {
            avoidance.add_link(name);
            if let Some(values) = amplitude {
                avoidance.set_amplitude(name, values[i])?;
            }
            if let Some(values) = minimum_distance {
                avoidance.set_min_distance(name, values[i])?;
            }
            if let Some(values) = avoidance_distance {
                avoidance.set_avoidance_distance(name, values[i])?;
            }
            if let Some(values) = weight {
                avoidance.set_weight(name, values[i])?;
            }
        }
        Ok(())
    }

    fn checked<'a>(&self, member: &str, values: &'a Option<Vec<f64>>) -> Option<&'a [f64]> {
        match values {
            None => {
                warn!("Obstacle avoidance: {} not given, default parameter will be used", member);
                None
            }
            Some(values) if values.len() != self.link_names.len() => {
                warn!("Obstacle avoidance: {} has {} values but there are {} link_names, default parameters will be used",
                    member, values.len(), self.link_names.len());
                None
            }
            Some(values) => Some(values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_apply_all_parameters() {
        let parameters = AvoidanceParameters {
            link_names: names(&["upper_arm", "forearm"]),
            amplitude: Some(vec![0.2, 0.4]),
            minimum_distance: Some(vec![0.05, 0.06]),
            avoidance_distance: Some(vec![0.25, 0.35]),
            weight: Some(vec![2.0, 3.0]),
        };
        let mut avoidance = ObstacleAvoidance::new();
        parameters.apply(&mut avoidance).unwrap();

        let forearm = avoidance.link("forearm").unwrap();
        assert_eq!(forearm.amplitude(), 0.4);
        assert_eq!(forearm.min_distance(), 0.06);
        assert_eq!(forearm.avoidance_distance(), 0.35);
        assert_eq!(forearm.weight(), 3.0);
        assert_eq!(avoidance.link_names(), names(&["upper_arm", "forearm"]));
    }

    #[test]
    fn test_mismatched_array_falls_back_to_defaults_for_that_parameter_only() {
        let parameters = AvoidanceParameters {
            link_names: names(&["upper_arm", "forearm"]),
            amplitude: Some(vec![0.2]),
            weight: Some(vec![2.0, 3.0]),
            ..Default::default()
        };
        let mut avoidance = ObstacleAvoidance::new();
        parameters.apply(&mut avoidance).unwrap();

        for link in avoidance.links() {
            assert_eq!(link.amplitude(), 0.3);
            assert_eq!(link.min_distance(), 0.1);
        }
        assert_eq!(avoidance.link("upper_arm").unwrap().weight(), 2.0);
        assert_eq!(avoidance.link("forearm").unwrap().weight(), 3.0);
    }

    #[test]
    fn test_invalid_value_is_reported() {
        let parameters = AvoidanceParameters {
            link_names: names(&["forearm"]),
            avoidance_distance: Some(vec![0.0]),
            ..Default::default()
        };
        let mut avoidance = ObstacleAvoidance::new();
        let result = parameters.apply(&mut avoidance);
        assert!(matches!(result, Err(AvoidanceError::InvalidParameter { name: "avoidance distance", .. })));
        assert!(avoidance.links().is_empty());
    }

    #[test]
    fn test_rejected_parameters_leave_constraint_unchanged() {
        let mut avoidance = ObstacleAvoidance::new();
        avoidance.add_link("upper_arm");
        avoidance.set_amplitude("upper_arm", 0.7).unwrap();

        // The last value of the second link is out of range
        let parameters = AvoidanceParameters {
            link_names: names(&["upper_arm", "forearm"]),
            amplitude: Some(vec![0.5, 0.5]),
            avoidance_distance: Some(vec![0.2, 0.0]),
            ..Default::default()
        };
        assert!(parameters.apply(&mut avoidance).is_err());

        assert_eq!(avoidance.link_names(), names(&["upper_arm"]));
        let upper_arm = avoidance.link("upper_arm").unwrap();
        assert_eq!(upper_arm.amplitude(), 0.7);
        assert_eq!(upper_arm.avoidance_distance(), 0.3);
        assert!(avoidance.link("forearm").is_none());
    }
}
