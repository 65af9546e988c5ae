//! Checks on the upstream instrument-signature-removal settings
//!
//! Defect finding assumes its input exposures were processed in a particular
//! way (assembled, bias subtracted, not already defect-interpolated, ...).
//! The ISR stage reports its step flags as a name -> enabled map, and
//! [`validate_isr_steps`] checks that map against a set of requirements.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::defects::ValidationReporter;
use crate::error::DefectError;

/// Expectations on ISR step flags, grouped by how strictly they apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsrRequirements {
    /// Must be present and enabled
    pub mandatory: Vec<String>,
    /// Must not be enabled
    pub forbidden: Vec<String>,
    /// Should be enabled
    pub desirable: Vec<String>,
    /// Should not be enabled
    pub undesirable: Vec<String>,
}

/// Check ISR step flags against `requirements`.
///
/// A mandatory step that is missing or disabled, or a forbidden step that is
/// enabled, is an error. A forbidden step missing from `steps` is reported as
/// a warning since it usually means a misspelled name. Desirable steps that
/// are disabled and undesirable steps that are enabled are warnings; either
/// kind missing from `steps` is reported as info.
pub fn validate_isr_steps(
    steps: &BTreeMap<String, bool>,
    requirements: &IsrRequirements,
    reporter: &mut dyn ValidationReporter,
) -> Result<(), DefectError> {
    for step in &requirements.mandatory {
        match steps.get(step) {
            None => {
                return Err(DefectError::IsrConfig(format!(
                    "mandatory step {step} not found in the ISR configuration"
                )))
            }
            Some(false) => {
                return Err(DefectError::IsrConfig(format!(
                    "{step} must be enabled for defect finding"
                )))
            }
            Some(true) => {}
        }
    }

    for step in &requirements.forbidden {
        match steps.get(step) {
            None => reporter.warn(&format!(
                "forbidden step {step} not found in the ISR configuration; check its spelling"
            )),
            Some(true) => {
                return Err(DefectError::IsrConfig(format!(
                    "{step} must be disabled for defect finding"
                )))
            }
            Some(false) => {}
        }
    }

    for (names, wanted) in [(&requirements.desirable, true), (&requirements.undesirable, false)] {
        for step in names {
            match steps.get(step) {
                None => reporter.info(&format!(
                    "step {step} not found in the ISR configuration; it is recommended to be {}",
                    if wanted { "enabled" } else { "disabled" }
                )),
                Some(&enabled) if enabled != wanted => reporter.warn(&format!(
                    "{step} is {}; defect finding recommends {}",
                    if enabled { "enabled" } else { "disabled" },
                    if wanted { "enabling it" } else { "disabling it" }
                )),
                Some(_) => {}
            }
        }
    }

    Ok(())
}
