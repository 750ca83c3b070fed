//! Configuration management module
//!
//! One YAML document tunes every stage: where scenarios are stored, the
//! classifier rule table, the synthesis priority table and playback pacing.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use action_flow::PlaybackOptions;
use action_locator::{
    DefaultElementResolver, SelectorSynthesizer, StabilityClassifier, StabilityRules,
    SynthesisPolicy,
};
use domreplay_scenario_store::{JsonFileScenarioStore, ScenarioCatalog};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Overrides the scenario file location
pub const ENV_STORE: &str = "DOMREPLAY_STORE";

/// Overrides the playback speed multiplier
pub const ENV_SPEED: &str = "DOMREPLAY_SPEED";

const STORE_FILE: &str = "scenarios.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scenario file; defaults to the platform data directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,

    pub playback: PlaybackOptions,

    pub stability: StabilityRules,

    pub synthesis: SynthesisPolicy,
}

impl Config {
    /// Apply `DOMREPLAY_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = env::var(ENV_STORE) {
            if !path.trim().is_empty() {
                info!("Using scenario store from {}: {}", ENV_STORE, path);
                self.store_path = Some(PathBuf::from(path));
            }
        }

        if let Ok(raw) = env::var(ENV_SPEED) {
            match raw.trim().parse::<f64>() {
                Ok(speed) if speed.is_finite() && speed > 0.0 => {
                    info!("Using playback speed from {}: {}", ENV_SPEED, speed);
                    self.playback.speed = speed;
                }
                _ => warn!("Ignoring invalid {} value: {}", ENV_SPEED, raw),
            }
        }
    }

    /// Resolved scenario file location
    pub fn store_path(&self) -> PathBuf {
        if let Some(path) = &self.store_path {
            return path.clone();
        }
        match dirs::data_dir() {
            Some(mut path) => {
                path.push("domreplay");
                path.push(STORE_FILE);
                path
            }
            None => PathBuf::from(STORE_FILE),
        }
    }

    pub fn classifier(&self) -> StabilityClassifier {
        StabilityClassifier::new(self.stability.clone())
    }

    pub fn synthesizer(&self) -> SelectorSynthesizer {
        SelectorSynthesizer::new(self.classifier(), self.synthesis.clone())
    }

    pub fn resolver(&self) -> DefaultElementResolver {
        DefaultElementResolver::new(self.classifier())
    }

    /// Catalog over the JSON scenario file
    pub fn catalog(&self) -> ScenarioCatalog {
        ScenarioCatalog::new(Arc::new(JsonFileScenarioStore::new(self.store_path())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_flow::FailureStrategy;
    use serial_test::serial;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str(
            r#"
store_path: /tmp/scenarios.json
playback:
  speed: 2.0
  highlight: false
  failure_strategy:
    strategy: retry
    max_attempts: 3
    backoff_ms: 250
stability:
  max_id_len: 20
"#,
        )
        .unwrap();

        assert_eq!(config.store_path(), PathBuf::from("/tmp/scenarios.json"));
        assert_eq!(config.playback.speed, 2.0);
        assert!(!config.playback.highlight);
        assert_eq!(config.playback.typing_delay_ms, 50);
        assert_eq!(
            config.playback.failure_strategy,
            FailureStrategy::Retry {
                max_attempts: 3,
                backoff_ms: 250
            }
        );
        assert_eq!(config.stability.max_id_len, 20);
        assert_eq!(config.synthesis, SynthesisPolicy::default());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        env::set_var(ENV_STORE, "/tmp/other.json");
        env::set_var(ENV_SPEED, "4");
        let mut config = Config::default();
        config.apply_env_overrides();
        env::remove_var(ENV_STORE);
        env::remove_var(ENV_SPEED);

        assert_eq!(config.store_path(), PathBuf::from("/tmp/other.json"));
        assert_eq!(config.playback.speed, 4.0);
    }

    #[test]
    #[serial]
    fn test_invalid_speed_is_ignored() {
        env::set_var(ENV_SPEED, "fast");
        let mut config = Config::default();
        config.apply_env_overrides();
        env::remove_var(ENV_SPEED);

        assert_eq!(config.playback.speed, 1.0);
    }
}
