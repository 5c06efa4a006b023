//! Heuristic constants of the company-match validator and the evidence extractor.
//! Kept in one injectable structure so the policy can be tuned and tested on its own.

use anyhow::{bail, Result};
use log::{debug, info};
use std::env;

pub const DEFAULT_ACCEPT_THRESHOLD: f64 = 0.9;
pub const DEFAULT_REJECT_THRESHOLD: f64 = 0.2;
pub const DEFAULT_MIN_SIGNIFICANT_WORD_LEN: usize = 3;
pub const DEFAULT_COMPANY_SUFFIXES: [&str; 6] =
    ["Inc.", "LLC", "Corporation", "Corp.", "Limited", "Ltd."];

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationPolicy {
    /// Similarity at or above this value validates a pair.
    pub accept_threshold: f64,
    /// Similarity strictly below this value rejects a pair, given evidence was available.
    pub reject_threshold: f64,
    /// Company words must be strictly longer than this to be scored.
    pub min_significant_word_len: usize,
    /// Tokens that terminate a bioequivalence sentence naming the reference company.
    pub company_suffixes: Vec<String>,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            accept_threshold: DEFAULT_ACCEPT_THRESHOLD,
            reject_threshold: DEFAULT_REJECT_THRESHOLD,
            min_significant_word_len: DEFAULT_MIN_SIGNIFICANT_WORD_LEN,
            company_suffixes: DEFAULT_COMPANY_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ValidationPolicy {
    /// Create the policy from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let accept_threshold = env::var("VALIDATION_ACCEPT_THRESHOLD")
            .unwrap_or_else(|_| DEFAULT_ACCEPT_THRESHOLD.to_string())
            .parse::<f64>()
            .unwrap_or(DEFAULT_ACCEPT_THRESHOLD);

        let reject_threshold = env::var("VALIDATION_REJECT_THRESHOLD")
            .unwrap_or_else(|_| DEFAULT_REJECT_THRESHOLD.to_string())
            .parse::<f64>()
            .unwrap_or(DEFAULT_REJECT_THRESHOLD);

        let min_significant_word_len = env::var("VALIDATION_MIN_WORD_LENGTH")
            .unwrap_or_else(|_| DEFAULT_MIN_SIGNIFICANT_WORD_LEN.to_string())
            .parse::<usize>()
            .unwrap_or(DEFAULT_MIN_SIGNIFICANT_WORD_LEN);

        let company_suffixes: Vec<String> = match env::var("VALIDATION_COMPANY_SUFFIXES") {
            Ok(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => Self::default().company_suffixes,
        };

        debug!(
            "Validation policy from env: accept={}, reject={}, min_word_len={}, suffixes={:?}",
            accept_threshold, reject_threshold, min_significant_word_len, company_suffixes
        );

        Self {
            accept_threshold,
            reject_threshold,
            min_significant_word_len,
            company_suffixes,
        }
    }

    /// Reject inconsistent settings before any record is processed
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("accept_threshold", self.accept_threshold),
            ("reject_threshold", self.reject_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("{} must lie within [0, 1], got {}", name, value);
            }
        }
        if self.reject_threshold > self.accept_threshold {
            bail!(
                "reject_threshold ({}) must not exceed accept_threshold ({})",
                self.reject_threshold,
                self.accept_threshold
            );
        }
        if self.company_suffixes.is_empty() {
            bail!("company_suffixes must contain at least one suffix");
        }
        Ok(())
    }

    /// Log the current configuration
    pub fn log_config(&self) {
        info!("🧪 Validation policy");
        info!("   Validated at similarity >= {:.2}", self.accept_threshold);
        info!(
            "   Rejected below {:.2} (only when reference text and company names exist)",
            self.reject_threshold
        );
        info!(
            "   Company words scored when longer than {} characters",
            self.min_significant_word_len
        );
        info!("   Company suffixes: {:?}", self.company_suffixes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_default_policy() {
        let policy = ValidationPolicy::default();
        assert_eq!(policy.accept_threshold, 0.9);
        assert_eq!(policy.reject_threshold, 0.2);
        assert_eq!(policy.min_significant_word_len, 3);
        assert_eq!(policy.company_suffixes.len(), 6);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_policy_from_env() {
        env::set_var("VALIDATION_ACCEPT_THRESHOLD", "0.8");
        env::set_var("VALIDATION_REJECT_THRESHOLD", "0.1");
        env::set_var("VALIDATION_MIN_WORD_LENGTH", "2");
        env::set_var("VALIDATION_COMPANY_SUFFIXES", "Inc., GmbH , ");

        let policy = ValidationPolicy::from_env();
        assert_eq!(policy.accept_threshold, 0.8);
        assert_eq!(policy.reject_threshold, 0.1);
        assert_eq!(policy.min_significant_word_len, 2);
        assert_eq!(policy.company_suffixes, vec!["Inc.", "GmbH"]);

        // Cleanup
        env::remove_var("VALIDATION_ACCEPT_THRESHOLD");
        env::remove_var("VALIDATION_REJECT_THRESHOLD");
        env::remove_var("VALIDATION_MIN_WORD_LENGTH");
        env::remove_var("VALIDATION_COMPANY_SUFFIXES");
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let policy = ValidationPolicy {
            accept_threshold: 0.3,
            reject_threshold: 0.5,
            ..Default::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_and_empty_suffixes() {
        let policy = ValidationPolicy {
            accept_threshold: 1.5,
            ..Default::default()
        };
        assert!(policy.validate().is_err());

        let policy = ValidationPolicy {
            company_suffixes: Vec::new(),
            ..Default::default()
        };
        assert!(policy.validate().is_err());
    }
}
