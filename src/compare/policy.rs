//! What to do when a live capture does not match its reference.

use super::{delta_file_name, ComparisonResult, SizeMismatch};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub const ENV_RECAPTURE: &str = "RECAPTURE";
pub const ENV_RECAPTURE_CONDITIONALLY: &str = "RECAPTURE_CONDITIONALLY";
pub const ENV_RECAPTURE_LOWER_BOUND: &str = "RECAPTURE_LOWER_BOUND";
pub const ENV_WHITE_EQUALS: &str = "WHITE_EQUALS";

#[derive(Debug, Clone, PartialEq)]
pub enum PolicyConfigError {
    InvalidLowerBound(String),
}

impl fmt::Display for PolicyConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyConfigError::InvalidLowerBound(raw) => {
                write!(f, "{ENV_RECAPTURE_LOWER_BOUND} is not a number: {raw:?}")
            }
        }
    }
}

impl std::error::Error for PolicyConfigError {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapturePolicy {
    /// Overwrite every mismatching reference with the live capture.
    pub recapture: bool,
    /// Overwrite only when the score reaches `recapture_lower_bound`.
    pub recapture_conditionally: bool,
    pub recapture_lower_bound: Option<f64>,
    /// Paint identical pixels white in delta images.
    pub white_equals: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FailReason {
    Mismatch,
    BelowLowerBound { lower_bound: f64 },
    Dimensions(SizeMismatch),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PolicyDecision {
    Pass,
    Overwrite,
    Fail { reason: FailReason },
}

/// A collected, non-fatal replay failure.
#[derive(Debug, Clone, PartialEq)]
pub enum AssertionFailure {
    Mismatch {
        file: String,
        score: f64,
        delta: Option<String>,
    },
    NotEligibleForRecapture {
        file: String,
        score: f64,
        lower_bound: f64,
        delta: Option<String>,
    },
    DimensionMismatch {
        file: String,
        expected: (u32, u32),
        actual: (u32, u32),
    },
    ReferenceUnreadable {
        file: String,
        reason: String,
    },
    CaptureFailed {
        file: String,
        reason: String,
    },
    WriteFailed {
        file: String,
        reason: String,
    },
}

impl AssertionFailure {
    pub fn file(&self) -> &str {
        match self {
            AssertionFailure::Mismatch { file, .. }
            | AssertionFailure::NotEligibleForRecapture { file, .. }
            | AssertionFailure::DimensionMismatch { file, .. }
            | AssertionFailure::ReferenceUnreadable { file, .. }
            | AssertionFailure::CaptureFailed { file, .. }
            | AssertionFailure::WriteFailed { file, .. } => file,
        }
    }

    /// Delta image written next to the reference, if any.
    pub fn delta(&self) -> Option<&str> {
        match self {
            AssertionFailure::Mismatch { delta, .. }
            | AssertionFailure::NotEligibleForRecapture { delta, .. } => delta.as_deref(),
            _ => None,
        }
    }
}

fn write_see(f: &mut fmt::Formatter<'_>, delta: &Option<String>) -> fmt::Result {
    match delta {
        Some(delta) => write!(f, ". See {delta}"),
        None => write!(f, "."),
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssertionFailure::Mismatch { file, delta, .. } => {
                write!(f, "Image does not match {file}")?;
                write_see(f, delta)
            }
            AssertionFailure::NotEligibleForRecapture { file, delta, .. } => {
                write!(
                    f,
                    "Image does not match {file} and not eligible for recapture"
                )?;
                write_see(f, delta)
            }
            AssertionFailure::DimensionMismatch {
                file,
                expected,
                actual,
            } => write!(
                f,
                "Image does not match {file}: expected {}x{}, captured {}x{}",
                expected.0, expected.1, actual.0, actual.1
            ),
            AssertionFailure::ReferenceUnreadable { file, reason } => {
                write!(f, "Cannot read reference image {file}: {reason}")
            }
            AssertionFailure::CaptureFailed { file, reason } => {
                write!(f, "Cannot capture screen for {file}: {reason}")
            }
            AssertionFailure::WriteFailed { file, reason } => {
                write!(f, "Cannot write image for {file}: {reason}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PolicyOutcome {
    Passed,
    Recaptured { delta: Option<String> },
    Failed(AssertionFailure),
}

fn flag(value: Option<String>) -> bool {
    value.as_deref().map(str::trim) == Some("1")
}

impl CapturePolicy {
    pub fn from_env() -> Result<Self, PolicyConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, PolicyConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let recapture_lower_bound = match lookup(ENV_RECAPTURE_LOWER_BOUND) {
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(bound) if bound.is_finite() => Some(bound),
                _ => return Err(PolicyConfigError::InvalidLowerBound(raw)),
            },
            None => None,
        };

        Ok(Self {
            recapture: flag(lookup(ENV_RECAPTURE)),
            recapture_conditionally: flag(lookup(ENV_RECAPTURE_CONDITIONALLY)),
            recapture_lower_bound,
            white_equals: flag(lookup(ENV_WHITE_EQUALS)),
        })
    }

    pub fn decide(&self, result: &ComparisonResult) -> PolicyDecision {
        if result.matched {
            return PolicyDecision::Pass;
        }
        if self.recapture {
            return PolicyDecision::Overwrite;
        }
        if self.recapture_conditionally {
            if let Some(lower_bound) = self.recapture_lower_bound {
                if result.score >= lower_bound {
                    return PolicyDecision::Overwrite;
                }
                if result.size_mismatch.is_none() {
                    return PolicyDecision::Fail {
                        reason: FailReason::BelowLowerBound { lower_bound },
                    };
                }
            }
        }
        let reason = match result.size_mismatch {
            Some(mismatch) => FailReason::Dimensions(mismatch),
            None => FailReason::Mismatch,
        };
        PolicyDecision::Fail { reason }
    }

    /// Carry out `decision` for the reference `file` inside `image_dir`.
    ///
    /// The delta image, when the comparison produced one, is written next to
    /// the reference whatever the decision. I/O errors become
    /// `AssertionFailure::WriteFailed`.
    pub fn apply(
        &self,
        decision: PolicyDecision,
        result: &ComparisonResult,
        live: &RgbaImage,
        image_dir: &Path,
        file: &str,
    ) -> PolicyOutcome {
        if decision == PolicyDecision::Pass {
            return PolicyOutcome::Passed;
        }

        let delta = match &result.delta {
            Some(image) => {
                let name = delta_file_name(file);
                if let Err(err) = image.save(image_dir.join(&name)) {
                    log::error!("failed to write delta image {name}: {err}");
                    return PolicyOutcome::Failed(AssertionFailure::WriteFailed {
                        file: name,
                        reason: err.to_string(),
                    });
                }
                Some(name)
            }
            None => None,
        };

        match decision {
            PolicyDecision::Pass => PolicyOutcome::Passed,
            PolicyDecision::Overwrite => {
                let reference = image_dir.join(file);
                if let Err(err) = live.save(&reference) {
                    log::error!("failed to recapture {file}: {err}");
                    return PolicyOutcome::Failed(AssertionFailure::WriteFailed {
                        file: file.to_string(),
                        reason: err.to_string(),
                    });
                }
                log::info!("recaptured {file} (signal {:.2} dB)", result.score);
                PolicyOutcome::Recaptured { delta }
            }
            PolicyDecision::Fail { reason } => {
                let file = file.to_string();
                let failure = match reason {
                    FailReason::Mismatch => AssertionFailure::Mismatch {
                        file,
                        score: result.score,
                        delta,
                    },
                    FailReason::BelowLowerBound { lower_bound } => {
                        AssertionFailure::NotEligibleForRecapture {
                            file,
                            score: result.score,
                            lower_bound,
                            delta,
                        }
                    }
                    FailReason::Dimensions(mismatch) => AssertionFailure::DimensionMismatch {
                        file,
                        expected: mismatch.source,
                        actual: mismatch.target,
                    },
                };
                log::warn!("{failure}");
                PolicyOutcome::Failed(failure)
            }
        }
    }
}
