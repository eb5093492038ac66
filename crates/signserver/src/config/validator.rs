use crate::worker::{Constraint, PropertySpec, Requirement, WorkerCapabilities};

use super::WorkerConfig;

/// Human-readable description of one configuration violation.
pub type FatalError = String;

/// Checks `config` against the property table of a worker type.
///
/// Every rule is evaluated and every violation reported, in the order the
/// properties are declared by `capabilities`. The result depends on nothing
/// but the two arguments, so callers may assert on exact messages.
pub fn validate(config: &WorkerConfig, capabilities: &WorkerCapabilities) -> Vec<FatalError> {
    capabilities
        .properties()
        .iter()
        .filter_map(|spec| check_property(spec, config.get(spec.name)))
        .collect()
}

fn check_property(spec: &PropertySpec, value: Option<&str>) -> Option<FatalError> {
    match (spec.requirement, value) {
        (Requirement::Unsupported, Some(_)) => Some(format!("{} is not supported.", spec.name)),
        (Requirement::Unsupported, None) => None,
        (Requirement::Required, None) => Some(format!("Missing required property: {}.", spec.name)),
        (Requirement::Optional, None) => None,
        (Requirement::Required | Requirement::Optional, Some(value)) => {
            check_constraint(spec.name, spec.constraint, value)
        }
    }
}

fn check_constraint(name: &str, constraint: Constraint, value: &str) -> Option<FatalError> {
    match constraint {
        Constraint::Any => None,
        Constraint::OneOf(allowed) => {
            if allowed.iter().any(|candidate| candidate.eq_ignore_ascii_case(value)) {
                None
            } else {
                Some(format!(
                    "Illegal value for property {name}: {value}. Supported values: {}.",
                    allowed.join(", ")
                ))
            }
        }
        Constraint::NonNegativeInteger => match value.parse::<u32>() {
            Ok(_) => None,
            Err(_) => Some(format!(
                "Illegal value for property {name}: {value}. Only numbers >= 0 supported."
            )),
        },
        Constraint::DistinguishedName => {
            let well_formed = value.split(',').all(|rdn| {
                rdn.split_once('=')
                    .is_some_and(|(attr, val)| !attr.trim().is_empty() && !val.trim().is_empty())
            });
            if well_formed {
                None
            } else {
                Some(format!(
                    "Illegal value for property {name}: {value}. Expected a distinguished name such as CN=Signer."
                ))
            }
        }
    }
}
