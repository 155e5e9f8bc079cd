//! Configuration management
//!
//! Handles locating, parsing, and validating the TOML configuration file.
//! The file declares an ordered list of sinks (the order is the switching
//! priority) plus a few settings.

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};

/// Directory and file name under the XDG config directory
const CONFIG_DIR_NAME: &str = "sps";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Pre-XDG location, relative to the home directory
const LEGACY_CONFIG_DIR: &str = ".sps";

// ============================================================================
// Public Configuration Types
// ============================================================================

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    pub sinks: Vec<SinkEntry>,
}

/// Global settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub discovery: Discovery,
    pub log_level: String,
    /// Deadline for each sound server round-trip
    pub timeout: Duration,
    /// Server module to load before the first client call, if any
    pub control_module: Option<String>,
    /// Send a desktop notification after switching
    pub notify: bool,
}

/// How labels and DSP sinks are attached to a configured sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Discovery {
    /// Everything comes from the config file
    #[default]
    Names,
    /// `sps.label` / `sps.dsp` properties on the server's sink win over the config file
    Properties,
}

/// One configured sink, in priority order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkEntry {
    /// Server-side sink name (e.g., `"alsa_output.pci-0000_00_1f.3.analog-stereo"`)
    pub sink: String,
    /// Optional sink that non-local streams are routed through
    pub dsp: Option<String>,
    /// Human-readable label
    pub label: Option<String>,
}

// ============================================================================
// Config File Deserialization (TOML)
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    settings: SettingsFile,
    #[serde(default)]
    sinks: Vec<SinkEntryFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    #[serde(default)]
    discovery: Discovery,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_timeout_ms")]
    timeout_ms: u64,
    #[serde(default)]
    control_module: Option<String>,
    #[serde(default)]
    notify: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SinkEntryFile {
    sink: String,
    #[serde(default)]
    dsp: Option<String>,
    #[serde(default)]
    label: Option<String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Default for SettingsFile {
    fn default() -> Self {
        Self {
            discovery: Discovery::default(),
            log_level: default_log_level(),
            timeout_ms: default_timeout_ms(),
            control_module: None,
            notify: false,
        }
    }
}

// ============================================================================
// Config Implementation
// ============================================================================

impl Config {
    /// Load configuration from `path`, or from the default location
    ///
    /// # Errors
    /// Returns a config error if no file can be located, read, parsed, or validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::get_config_path()?,
        };
        Self::load_from_path(&path)
    }

    /// Load configuration from an explicit path
    ///
    /// # Errors
    /// Returns [`Error::ConfigRead`], [`Error::ConfigParse`] or [`Error::ConfigInvalid`].
    pub fn load_from_path(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());

        let contents = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml(&contents).map_err(|e| match e {
            Error::ConfigParse { source, .. } => Error::ConfigParse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// Returns [`Error::ConfigParse`] (with an empty path) or [`Error::ConfigInvalid`].
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config_file: ConfigFile =
            toml::from_str(contents).map_err(|source| Error::ConfigParse {
                path: PathBuf::new(),
                source,
            })?;
        Self::from_config_file(config_file)
    }

    fn from_config_file(config_file: ConfigFile) -> Result<Self> {
        if config_file.sinks.is_empty() {
            return Err(Error::ConfigInvalid(
                "no sinks defined, add at least one [[sinks]] section".to_string(),
            ));
        }

        let settings = Settings {
            discovery: config_file.settings.discovery,
            log_level: config_file.settings.log_level,
            timeout: Duration::from_millis(config_file.settings.timeout_ms),
            control_module: config_file
                .settings
                .control_module
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
            notify: config_file.settings.notify,
        };

        let sinks = config_file
            .sinks
            .into_iter()
            .map(|s| SinkEntry {
                sink: s.sink.trim().to_string(),
                dsp: s
                    .dsp
                    .map(|d| d.trim().to_string())
                    .filter(|d| !d.is_empty()),
                label: s.label,
            })
            .collect();

        let config = Config { settings, sinks };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        match self.settings.log_level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            level => {
                return Err(Error::ConfigInvalid(format!(
                    "invalid log_level '{level}', must be: error, warn, info, debug, or trace"
                )));
            }
        }

        if self.settings.timeout.is_zero() {
            return Err(Error::ConfigInvalid(
                "timeout_ms must be greater than 0".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(self.sinks.len());
        for (i, entry) in self.sinks.iter().enumerate() {
            if entry.sink.is_empty() {
                return Err(Error::ConfigInvalid(format!(
                    "sink {} has an empty 'sink' name",
                    i + 1
                )));
            }
            if !seen.insert(&entry.sink) {
                return Err(Error::ConfigInvalid(format!(
                    "duplicate sink '{}'",
                    entry.sink
                )));
            }
            if entry.dsp.as_deref() == Some(entry.sink.as_str()) {
                return Err(Error::ConfigInvalid(format!(
                    "sink '{}' uses itself as its DSP sink",
                    entry.sink
                )));
            }
        }

        Ok(())
    }

    /// Default config path: XDG location, or the legacy `~/.sps/config.toml` when only that exists
    ///
    /// # Errors
    /// Returns [`Error::ConfigInvalid`] if neither the config nor the home directory can be determined.
    pub fn get_config_path() -> Result<PathBuf> {
        resolve_config_path(dirs::config_dir(), dirs::home_dir())
    }
}

/// Pick the config file location from the platform directories
fn resolve_config_path(config_dir: Option<PathBuf>, home_dir: Option<PathBuf>) -> Result<PathBuf> {
    let xdg = config_dir.map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
    let legacy = home_dir.map(|d| d.join(LEGACY_CONFIG_DIR).join(CONFIG_FILE_NAME));

    match (xdg, legacy) {
        (Some(xdg), Some(legacy)) if !xdg.exists() && legacy.exists() => Ok(legacy),
        (Some(xdg), _) => Ok(xdg),
        (None, Some(legacy)) => Ok(legacy),
        (None, None) => Err(Error::ConfigInvalid(
            "could not determine config directory".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    const TWO_SINKS: &str = r#"
[[sinks]]
sink = "alsa_output.speakers"
label = "Speakers"

[[sinks]]
sink = "alsa_output.headphones"
dsp = "effect_input.eq"
label = "Headphones"
"#;

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_toml(TWO_SINKS).unwrap();
        assert_eq!(config.settings.discovery, Discovery::Names);
        assert_eq!(config.settings.log_level, "warn");
        assert_eq!(config.settings.timeout, Duration::from_millis(5000));
        assert_eq!(config.settings.control_module, None);
        assert!(!config.settings.notify);
    }

    #[test]
    fn test_sinks_keep_declared_order() {
        let config = Config::from_toml(TWO_SINKS).unwrap();
        assert_eq!(
            config.sinks,
            vec![
                SinkEntry {
                    sink: "alsa_output.speakers".to_string(),
                    dsp: None,
                    label: Some("Speakers".to_string()),
                },
                SinkEntry {
                    sink: "alsa_output.headphones".to_string(),
                    dsp: Some("effect_input.eq".to_string()),
                    label: Some("Headphones".to_string()),
                },
            ]
        );
    }

    #[test]
    fn test_settings_parsed() {
        let config = Config::from_toml(
            r#"
[settings]
discovery = "properties"
log_level = "debug"
timeout_ms = 250
control_module = "module-dbus-protocol"
notify = true

[[sinks]]
sink = "a"
"#,
        )
        .unwrap();
        assert_eq!(config.settings.discovery, Discovery::Properties);
        assert_eq!(config.settings.log_level, "debug");
        assert_eq!(config.settings.timeout, Duration::from_millis(250));
        assert_eq!(
            config.settings.control_module.as_deref(),
            Some("module-dbus-protocol")
        );
        assert!(config.settings.notify);
    }

    #[test]
    fn test_blank_control_module_treated_as_absent() {
        let config =
            Config::from_toml("[settings]\ncontrol_module = \"  \"\n[[sinks]]\nsink = \"a\"\n")
                .unwrap();
        assert_eq!(config.settings.control_module, None);
    }

    #[test]
    fn test_empty_dsp_treated_as_absent() {
        let config = Config::from_toml("[[sinks]]\nsink = \"a\"\ndsp = \"\"\n").unwrap();
        assert_eq!(config.sinks[0].dsp, None);
    }

    #[test_case("" ; "no sinks")]
    #[test_case("[[sinks]]\nsink = \"\"\n" ; "empty sink name")]
    #[test_case("[[sinks]]\nsink = \"a\"\n[[sinks]]\nsink = \"a\"\n" ; "duplicate sink")]
    #[test_case("[[sinks]]\nsink = \"a\"\ndsp = \"a\"\n" ; "dsp is the sink itself")]
    #[test_case("[settings]\nlog_level = \"loud\"\n[[sinks]]\nsink = \"a\"\n" ; "bad log level")]
    #[test_case("[settings]\ntimeout_ms = 0\n[[sinks]]\nsink = \"a\"\n" ; "zero timeout")]
    fn test_invalid_config_rejected(toml: &str) {
        assert!(matches!(
            Config::from_toml(toml),
            Err(Error::ConfigInvalid(_))
        ));
    }

    #[test_case("[[sinks]]\nlabel = \"x\"\n" ; "missing sink key")]
    #[test_case("[settings]\ndiscovery = \"magic\"\n[[sinks]]\nsink = \"a\"\n" ; "unknown discovery")]
    #[test_case("[[sinks]]\nsink = \"a\"\ncolour = \"red\"\n" ; "unknown field")]
    #[test_case("[[sinks]\nsink = " ; "malformed toml")]
    fn test_malformed_config_is_parse_error(toml: &str) {
        assert!(matches!(
            Config::from_toml(toml),
            Err(Error::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        let err = Config::load(Some(path.as_path())).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
        assert!(err.to_string().contains("missing.toml"));
    }

    #[test]
    fn test_load_parse_error_carries_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "sinks = 3").unwrap();
        match Config::load_from_path(&path) {
            Err(Error::ConfigParse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_config_path_prefers_xdg() {
        let config_dir = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        let path = resolve_config_path(
            Some(config_dir.path().to_path_buf()),
            Some(home.path().to_path_buf()),
        )
        .unwrap();
        assert_eq!(path, config_dir.path().join("sps").join("config.toml"));
    }

    #[test]
    fn test_config_path_falls_back_to_legacy_file() {
        let config_dir = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        let legacy_dir = home.path().join(".sps");
        fs::create_dir_all(&legacy_dir).unwrap();
        fs::write(legacy_dir.join("config.toml"), TWO_SINKS).unwrap();

        let path = resolve_config_path(
            Some(config_dir.path().to_path_buf()),
            Some(home.path().to_path_buf()),
        )
        .unwrap();
        assert_eq!(path, legacy_dir.join("config.toml"));
    }

    #[test]
    fn test_config_path_without_directories() {
        assert!(resolve_config_path(None, None).is_err());
    }
}
