//! Supports reading avoidance parameters from YAML file (optional)

use std::path::Path;
use tracing::warn;
use yaml_rust2::{Yaml, YamlLoader};

use crate::avoidance_error::AvoidanceError;
use crate::avoidance_parameters::AvoidanceParameters;

impl AvoidanceParameters {
    /// Read avoidance parameters from YAML file. YAML file like this is supported:
    /// ```yaml
    /// link_names: [upper_arm, forearm, wrist]
    /// amplitude: [0.3, 0.3, 0.2]
    /// minimum_distance: [0.1, 0.1, 0.05]
    /// avoidance_distance: [0.3, 0.3, 0.25]
    /// weight: [1, 1, 2]
    /// ```
    /// All keys are optional. Without `link_names`, nothing is registered and the
    /// constraint later monitors every link of the chain.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, AvoidanceError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Same as [`from_yaml_file`](Self::from_yaml_file), reading from a string.
    pub fn from_yaml_str(contents: &str) -> Result<Self, AvoidanceError> {
        let docs = YamlLoader::load_from_str(contents)
            .map_err(|e| AvoidanceError::ParseError(e.to_string()))?;
        let doc = docs.first().ok_or_else(|| AvoidanceError::ParseError("empty YAML document".to_string()))?;

        let link_names = match &doc["link_names"] {
            Yaml::BadValue => {
                warn!("Obstacle avoidance: link_names not given, all links of the chain will be used");
                Vec::new()
            }
            Yaml::Array(items) => items.iter()
                .map(|item| item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| AvoidanceError::ParseError(format!("link name is not a string: {:?}", item))))
                .collect::<Result<Vec<_>, _>>()?,
            other => return Err(AvoidanceError::ParseError(format!("link_names must be a list, got {:?}", other))),
        };

        Ok(AvoidanceParameters {
            link_names,
            amplitude: read_numbers(doc, "amplitude")?,
            minimum_distance: read_numbers(doc, "minimum_distance")?,
            avoidance_distance: read_numbers(doc, "avoidance_distance")?,
            weight: read_numbers(doc, "weight")?,
        })
    }
}

/// Reads an optional list of numbers, accepting both integer and real entries.
fn read_numbers(doc: &Yaml, key: &str) -> Result<Option<Vec<f64>>, AvoidanceError> {
    match &doc[key] {
        Yaml::BadValue => Ok(None),
        Yaml::Array(items) => items.iter()
            .map(|item| number(item).ok_or_else(|| AvoidanceError::ParseError(
                format!("{} must contain numbers only, got {:?}", key, item))))
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        other => Err(AvoidanceError::ParseError(format!("{} must be a list, got {:?}", key, other))),
    }
}

fn number(item: &Yaml) -> Option<f64> {
    match item {
        Yaml::Integer(i) => Some(*i as f64),
        _ => item.as_f64(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_document() {
        let parameters = AvoidanceParameters::from_yaml_str(
            "link_names: [upper_arm, forearm]\n\
             amplitude: [0.3, 0.2]\n\
             minimum_distance: [0.1, 0.05]\n\
             avoidance_distance: [0.3, 0.25]\n\
             weight: [1, 2.5]\n").unwrap();
        assert_eq!(parameters.link_names, vec!["upper_arm", "forearm"]);
        assert_eq!(parameters.amplitude, Some(vec![0.3, 0.2]));
        assert_eq!(parameters.minimum_distance, Some(vec![0.1, 0.05]));
        assert_eq!(parameters.avoidance_distance, Some(vec![0.3, 0.25]));
        assert_eq!(parameters.weight, Some(vec![1.0, 2.5]));
    }

    #[test]
    fn test_missing_members_are_none() {
        let parameters = AvoidanceParameters::from_yaml_str("amplitude: [0.2]\n").unwrap();
        assert!(parameters.link_names.is_empty());
        assert_eq!(parameters.amplitude, Some(vec![0.2]));
        assert_eq!(parameters.weight, None);
    }

    #[test]
    fn test_malformed_values_rejected() {
        assert!(matches!(
            AvoidanceParameters::from_yaml_str("link_names: [a]\nweight: [heavy]\n"),
            Err(AvoidanceError::ParseError(_))));
        assert!(matches!(
            AvoidanceParameters::from_yaml_str("link_names: forearm\n"),
            Err(AvoidanceError::ParseError(_))));
        assert!(matches!(
            AvoidanceParameters::from_yaml_str("link_names: [a\n"),
            Err(AvoidanceError::ParseError(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = AvoidanceParameters::from_yaml_file("/nonexistent/avoidance.yaml");
        assert!(matches!(result, Err(AvoidanceError::IoError(_))));
    }
}
