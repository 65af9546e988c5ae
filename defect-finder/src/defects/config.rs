//! Defect finding configuration and validation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::CombinationMode;
use crate::algo::SigmaClip;
use crate::error::DefectError;

/// Name of a consolidation policy as written in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CombinationModeName {
    And,
    Or,
    Fraction,
}

impl FromStr for CombinationModeName {
    type Err = DefectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AND" => Ok(Self::And),
            "OR" => Ok(Self::Or),
            "FRACTION" => Ok(Self::Fraction),
            other => Err(DefectError::UnknownCombinationMode(other.to_string())),
        }
    }
}

impl fmt::Display for CombinationModeName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Fraction => "FRACTION",
        };
        f.write_str(name)
    }
}

/// Receives non-fatal findings from configuration validation.
pub trait ValidationReporter {
    fn warn(&mut self, message: &str);
    fn info(&mut self, message: &str);
}

/// Forwards validation findings to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ValidationReporter for TracingReporter {
    fn warn(&mut self, message: &str) {
        tracing::warn!("{message}");
    }

    fn info(&mut self, message: &str) {
        tracing::info!("{message}");
    }
}

/// Keeps validation findings for later inspection.
#[derive(Debug, Default, Clone)]
pub struct CollectingReporter {
    pub warnings: Vec<String>,
    pub infos: Vec<String>,
}

impl ValidationReporter for CollectingReporter {
    fn warn(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    fn info(&mut self, message: &str) {
        self.infos.push(message.to_string());
    }
}

/// Configuration for hot/cold pixel finding, column merging and consolidation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FindDefectsConfig {
    /// Pixels brighter than mean + n_sigma_bright * sigma are defects
    pub n_sigma_bright: f64,
    /// Pixels darker than mean - n_sigma_dark * sigma are defects (flats only)
    pub n_sigma_dark: f64,
    /// Rows at top and bottom excluded from detection
    pub n_pix_border_up_down: usize,
    /// Columns at left and right excluded from detection
    pub n_pix_border_left_right: usize,
    /// Minimum number of separate bad runs for a column to count as intermittent
    pub bad_on_and_off_pixel_column_threshold: usize,
    /// Largest run of good pixels bridged when merging an intermittent column
    pub good_pixel_column_gap_threshold: usize,
    /// Policy for reducing several defect sets into one
    pub combination_mode: CombinationModeName,
    /// Vote fraction required under FRACTION mode
    pub combination_fraction: f64,
    /// Mask planes whose pixels are left out of the population statistics
    pub excluded_mask_planes: Vec<String>,
    /// Add the border strips to the final defect set
    pub edges_as_defects: bool,
    /// Clip threshold, in sigma, for the population statistics
    pub clip_sigma: f64,
    /// Maximum clipping rounds for the population statistics
    pub clip_iterations: usize,
}

impl Default for FindDefectsConfig {
    fn default() -> Self {
        Self {
            n_sigma_bright: 4.8,
            n_sigma_dark: 5.0,
            n_pix_border_up_down: 7,
            n_pix_border_left_right: 7,
            bad_on_and_off_pixel_column_threshold: 50,
            good_pixel_column_gap_threshold: 30,
            combination_mode: CombinationModeName::Fraction,
            combination_fraction: 0.7,
            excluded_mask_planes: vec!["BAD".to_string(), "SAT".to_string(), "NO_DATA".to_string()],
            edges_as_defects: false,
            clip_sigma: 3.0,
            clip_iterations: 3,
        }
    }
}

impl FindDefectsConfig {
    /// Check the configuration, reporting questionable but legal settings.
    ///
    /// Every fatal problem is an error here so that nothing runs with a
    /// silently substituted default.
    pub fn validate(&self, reporter: &mut dyn ValidationReporter) -> Result<(), DefectError> {
        for (name, value) in [
            ("n_sigma_bright", self.n_sigma_bright),
            ("n_sigma_dark", self.n_sigma_dark),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(DefectError::InvalidConfig(format!(
                    "{name} must be a positive number of sigma, got {value}"
                )));
            }
            if value < 3.0 {
                reporter.warn(&format!(
                    "{name} = {value} will flag a large number of ordinary noise pixels"
                ));
            }
        }

        if !self.clip_sigma.is_finite() || self.clip_sigma <= 0.0 {
            return Err(DefectError::InvalidConfig(format!(
                "clip_sigma must be positive, got {}",
                self.clip_sigma
            )));
        }
        if self.clip_iterations == 0 {
            return Err(DefectError::InvalidConfig(
                "clip_iterations must be at least 1".to_string(),
            ));
        }

        let mode = self.combination_mode()?;
        if !matches!(mode, CombinationMode::Fraction(_))
            && (self.combination_fraction - Self::default().combination_fraction).abs() > f64::EPSILON
        {
            reporter.info(&format!(
                "combination_fraction = {} is ignored in {} mode",
                self.combination_fraction, self.combination_mode
            ));
        }

        if self.bad_on_and_off_pixel_column_threshold <= 1 {
            reporter.warn(
                "bad_on_and_off_pixel_column_threshold <= 1 treats every defective column as intermittent",
            );
        }

        Ok(())
    }

    /// The consolidation policy, with the fraction attached for FRACTION mode.
    pub fn combination_mode(&self) -> Result<CombinationMode, DefectError> {
        match self.combination_mode {
            CombinationModeName::And => Ok(CombinationMode::And),
            CombinationModeName::Or => Ok(CombinationMode::Or),
            CombinationModeName::Fraction => CombinationMode::fraction(self.combination_fraction),
        }
    }

    pub fn sigma_clip(&self) -> SigmaClip {
        SigmaClip {
            n_sigma: self.clip_sigma,
            max_iterations: self.clip_iterations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let mut reporter = CollectingReporter::default();
        FindDefectsConfig::default().validate(&mut reporter).unwrap();
        assert!(reporter.warnings.is_empty());
        assert!(reporter.infos.is_empty());
    }

    #[test]
    fn test_mode_names() {
        assert_eq!("AND".parse::<CombinationModeName>().unwrap(), CombinationModeName::And);
        assert_eq!("OR".parse::<CombinationModeName>().unwrap(), CombinationModeName::Or);
        assert_eq!(
            "FRACTION".parse::<CombinationModeName>().unwrap(),
            CombinationModeName::Fraction
        );
        assert_eq!(
            "MAJORITY".parse::<CombinationModeName>(),
            Err(DefectError::UnknownCombinationMode("MAJORITY".to_string()))
        );
        assert_eq!(CombinationModeName::Fraction.to_string(), "FRACTION");
    }

    #[test]
    fn test_invalid_fraction_rejected() {
        for fraction in [0.0, -0.2, 1.5, f64::NAN] {
            let config = FindDefectsConfig {
                combination_fraction: fraction,
                ..Default::default()
            };
            let result = config.validate(&mut CollectingReporter::default());
            assert!(
                matches!(result, Err(DefectError::InvalidFraction(_))),
                "fraction {fraction} accepted"
            );
        }
    }

    #[test]
    fn test_fraction_of_one_is_valid() {
        let config = FindDefectsConfig {
            combination_fraction: 1.0,
            ..Default::default()
        };
        assert!(config.validate(&mut CollectingReporter::default()).is_ok());
    }

    #[test]
    fn test_invalid_sigma_and_clip() {
        let bad_sigma = FindDefectsConfig {
            n_sigma_dark: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            bad_sigma.validate(&mut CollectingReporter::default()),
            Err(DefectError::InvalidConfig(_))
        ));

        let bad_clip = FindDefectsConfig {
            clip_iterations: 0,
            ..Default::default()
        };
        assert!(bad_clip.validate(&mut CollectingReporter::default()).is_err());
    }

    #[test]
    fn test_warnings_go_to_reporter() {
        let config = FindDefectsConfig {
            n_sigma_bright: 2.0,
            bad_on_and_off_pixel_column_threshold: 1,
            combination_mode: CombinationModeName::Or,
            combination_fraction: 0.9,
            ..Default::default()
        };
        let mut reporter = CollectingReporter::default();
        config.validate(&mut reporter).unwrap();
        assert_eq!(reporter.warnings.len(), 2);
        assert!(reporter.warnings[0].contains("n_sigma_bright"));
        assert_eq!(reporter.infos.len(), 1);
        assert!(reporter.infos[0].contains("OR"));
    }

    #[test]
    fn test_json_rejects_unknown_mode() {
        let json = r#"{ "combination_mode": "MAJORITY" }"#;
        assert!(serde_json::from_str::<FindDefectsConfig>(json).is_err());
    }

    #[test]
    fn test_json_rejects_negative_margin() {
        let json = r#"{ "n_pix_border_up_down": -1 }"#;
        assert!(serde_json::from_str::<FindDefectsConfig>(json).is_err());
    }

    #[test]
    fn test_json_partial_config_uses_defaults() {
        let json = r#"{ "combination_mode": "AND", "n_sigma_bright": 8.0 }"#;
        let config: FindDefectsConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.combination_mode().unwrap(), CombinationMode::And);
        assert_eq!(config.n_sigma_bright, 8.0);
        assert_eq!(config.n_pix_border_up_down, 7);
    }
}
