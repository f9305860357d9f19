//! Process-level runtime settings read from the environment.

use std::env;
use std::path::PathBuf;

use aerie_pipeline::Direction;

/// Default prefix of parameter override variables:
/// `AERIE_PARAM__<service>__<parameter>=<value>`.
pub const DEFAULT_OVERRIDE_PREFIX: &str = "AERIE_PARAM__";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Prefix selecting parameter override variables.
    pub override_prefix: String,
    /// Main loop executed by the binary.
    pub main_loop: String,
    pub direction: Direction,
    /// Print the INI dump of every service before `configure()`.
    pub dump_config: bool,
    /// TOML nest file describing the services to assemble.
    pub nest_file: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            override_prefix: DEFAULT_OVERRIDE_PREFIX.to_string(),
            main_loop: "main".to_string(),
            direction: Direction::Forward,
            dump_config: false,
            nest_file: None,
        }
    }
}

impl RuntimeConfig {
    /// Load from environment variables.
    ///
    /// - `AERIE_PARAM_PREFIX`: override prefix (default: `AERIE_PARAM__`)
    /// - `AERIE_MAIN_LOOP`: main loop name (default: main)
    /// - `AERIE_DIRECTION`: `forward` or `reverse` (default: forward)
    /// - `AERIE_DUMP_CONFIG`: print the assembled configuration (default: false)
    /// - `AERIE_NEST_FILE`: nest file to load
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            override_prefix: lookup("AERIE_PARAM_PREFIX")
                .filter(|p| !p.is_empty())
                .unwrap_or(defaults.override_prefix),
            main_loop: lookup("AERIE_MAIN_LOOP").unwrap_or(defaults.main_loop),
            direction: match lookup("AERIE_DIRECTION").map(|d| d.trim().to_lowercase()).as_deref() {
                Some("reverse") | Some("backward") => Direction::Reverse,
                _ => defaults.direction,
            },
            dump_config: lookup("AERIE_DUMP_CONFIG")
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(defaults.dump_config),
            nest_file: lookup("AERIE_NEST_FILE").map(PathBuf::from),
        }
    }

    /// Environment variables carrying parameter overrides.
    pub fn overrides_from_env(&self) -> Vec<(String, String)> {
        env::vars()
            .filter(|(key, _)| key.starts_with(&self.override_prefix))
            .collect()
    }
}
