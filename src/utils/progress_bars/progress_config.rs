// src/utils/progress_bars/progress_config.rs - Progress bar switches and shared bar styling

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::env;

const BAR_CHARS: &str = "█▉▊▋▌▍▎▏  ";

/// Which progress output a run shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressConfig {
    /// Master switch; nothing is drawn when false
    pub enabled: bool,
    /// Per-stage bars for criteria and validation
    pub stage_bars: bool,
    /// Memory readout in the final summary
    pub show_memory: bool,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stage_bars: true,
            show_memory: true,
        }
    }
}

/// Boolean environment switch; unset or unparseable values give `default`.
fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|raw| raw.trim().to_lowercase().parse().ok())
        .unwrap_or(default)
}

impl ProgressConfig {
    /// Reads `PROGRESS_ENABLED`, `PROGRESS_DETAILED` and `PROGRESS_SHOW_MEMORY`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_flag("PROGRESS_ENABLED", defaults.enabled),
            stage_bars: env_flag("PROGRESS_DETAILED", defaults.stage_bars),
            show_memory: env_flag("PROGRESS_SHOW_MEMORY", defaults.show_memory),
        }
    }

    pub fn create_multi_progress(&self) -> Option<MultiProgress> {
        self.enabled.then(MultiProgress::new)
    }

    /// The container stage bars attach to, or `None` when they are switched off.
    pub fn stage_target<'m>(
        &self,
        multi_progress: Option<&'m MultiProgress>,
    ) -> Option<&'m MultiProgress> {
        if self.enabled && self.stage_bars {
            multi_progress
        } else {
            None
        }
    }

    pub fn should_show_memory(&self) -> bool {
        self.enabled && self.show_memory
    }
}

/// Bar style for `template`, falling back to the plain default on a bad template.
pub fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars(BAR_CHARS)
}

/// Stage bar attached to `multi_progress`, or a hidden bar when progress is off.
pub fn stage_progress_bar(
    multi_progress: Option<&MultiProgress>,
    len: u64,
    template: &str,
) -> ProgressBar {
    match multi_progress {
        Some(mp) => {
            let pb = mp.add(ProgressBar::new(len));
            pb.set_style(bar_style(template));
            pb
        }
        None => ProgressBar::hidden(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_switches() {
        env::set_var("PROGRESS_ENABLED", "FALSE");
        env::set_var("PROGRESS_DETAILED", "not-a-bool");
        env::set_var("PROGRESS_SHOW_MEMORY", " false ");
        let config = ProgressConfig::from_env();
        env::remove_var("PROGRESS_ENABLED");
        env::remove_var("PROGRESS_DETAILED");
        env::remove_var("PROGRESS_SHOW_MEMORY");

        assert_eq!(
            config,
            ProgressConfig {
                enabled: false,
                stage_bars: true,
                show_memory: false,
            }
        );
        assert!(config.create_multi_progress().is_none());
    }

    #[test]
    fn test_stage_target_follows_switches() {
        let mp = MultiProgress::new();
        let mut config = ProgressConfig::default();
        assert!(config.stage_target(Some(&mp)).is_some());
        assert!(config.stage_target(None).is_none());

        config.stage_bars = false;
        assert!(config.stage_target(Some(&mp)).is_none());

        config.stage_bars = true;
        config.enabled = false;
        assert!(config.stage_target(Some(&mp)).is_none());
        assert!(!config.should_show_memory());
    }

    #[test]
    fn test_hidden_bar_without_multi_progress() {
        let pb = stage_progress_bar(None, 10, "{pos}/{len}");
        assert!(pb.is_hidden());
    }
}
