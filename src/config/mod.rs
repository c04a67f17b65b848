//! Building, persisting, and re-loading fleet configurations.
//!
//! A [`FleetConfig`] is the resolved record of everything one invocation
//! knows about the fleet. In `config` mode it is built from command-line
//! flags and optionally written to disk; in `run` mode it is parsed back
//! from disk, with explicitly supplied flags overriding the file when
//! `--update` is set. File-valued entries stay plain paths here; opening
//! and validating them is the run plan's job.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::archive;
use crate::cmd::fleet::FleetOpts;

/// Keys a configuration file may legitimately contain.
const KNOWN_KEYS: [&str; 7] = [
    "num_clients",
    "base_dir",
    "branch",
    "files",
    "pull",
    "read_key",
    "command_str",
];

/// The resolved options record for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// How many workers to launch.
    pub num_clients: u32,
    /// Directory to enter on each worker before doing anything else.
    pub base_dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Path to the tar archive distributed to every worker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<PathBuf>,
    pub pull: bool,
    /// Path to a read-only deploy key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_key: Option<PathBuf>,
    /// Per-worker command template; `{}` becomes the worker index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_str: Option<String>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            num_clients: 1,
            base_dir: String::from("~"),
            branch: None,
            files: None,
            pull: false,
            read_key: None,
            command_str: None,
        }
    }
}

impl FleetConfig {
    /// Resolve command-line options into a full record, filling every
    /// unsupplied field with its default.
    pub fn from_opts(opts: &FleetOpts) -> Self {
        let mut config = Self::default();
        config.apply_overrides(opts);
        config
    }

    /// Overwrite the fields that were explicitly supplied on the command
    /// line, leaving all other fields untouched.
    pub fn apply_overrides(&mut self, opts: &FleetOpts) {
        if let Some(n) = opts.num_clients {
            self.num_clients = n;
        }
        if let Some(dir) = &opts.base_dir {
            self.base_dir = dir.clone();
        }
        if let Some(branch) = &opts.branch {
            self.branch = Some(branch.clone());
        }
        if let Some(files) = &opts.files {
            self.files = Some(files.clone());
        }
        if let Some(pull) = opts.pull {
            self.pull = pull;
        }
        if let Some(key) = &opts.read_key {
            self.read_key = Some(key.clone());
        }
        if let Some(cmd) = &opts.command_str {
            self.command_str = Some(cmd.clone());
        }
        let overridden = opts.explicit();
        if !overridden.is_empty() {
            debug!("applied command-line values for: {}", overridden.iter().join(", "));
        }
    }
}

/// Build a configuration from `config` mode's flags.
///
/// A configuration intended for later execution must at least say what to
/// run, so an unset `--command-str` is rejected here. File-valued flags
/// are checked up front too: a record pointing at a missing key or a
/// non-tar archive must not be saved or run.
pub fn build_config(opts: &FleetOpts) -> Result<FleetConfig> {
    if opts.command_str.is_none() {
        bail!("must set a value for --command-str in config mode");
    }
    if let Some(path) = &opts.files {
        archive::validate_tar(path)?;
    }
    if let Some(path) = &opts.read_key {
        archive::open_binary(path)?;
    }
    Ok(FleetConfig::from_opts(opts))
}

/// Load a configuration file, forcing a `.json` extension on the path.
///
/// Missing keys take their defaults; unknown keys are reported and
/// ignored rather than failing the load.
pub fn load_config(path: &Path) -> Result<FleetConfig> {
    let path = force_json_extension(path);
    let file = File::open(&path)
        .with_context(|| format!("failed to open configuration file {}", path.display()))?;
    let mut doc: serde_json::Map<String, serde_json::Value> =
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("{} is not a JSON object", path.display()))?;

    let unknown: Vec<String> = doc
        .keys()
        .filter(|k| !KNOWN_KEYS.contains(&k.as_str()))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        warn!(
            "ignoring unknown keys in {}: {}",
            path.display(),
            unknown.iter().join(", ")
        );
        for key in &unknown {
            doc.remove(key);
        }
    }

    serde_json::from_value(serde_json::Value::Object(doc))
        .with_context(|| format!("invalid configuration in {}", path.display()))
}

/// Save a configuration, forcing a `.json` extension on the path.
///
/// Returns the path actually written.
pub fn save_config(config: &FleetConfig, path: &Path) -> Result<PathBuf> {
    let path = force_json_extension(path);
    let file = File::create(&path)
        .with_context(|| format!("failed to create configuration file {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), config)
        .with_context(|| format!("failed to write configuration to {}", path.display()))?;
    Ok(path)
}

/// Append `.json` unless the path already ends with it.
fn force_json_extension(path: &Path) -> PathBuf {
    if path.to_string_lossy().ends_with(".json") {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_os_string();
        name.push(".json");
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn opts_with_command(command: &str) -> FleetOpts {
        FleetOpts {
            command_str: Some(command.to_string()),
            ..FleetOpts::default()
        }
    }

    #[test]
    fn build_config_requires_command_str() {
        let err = build_config(&FleetOpts::default()).unwrap_err();
        assert!(err.to_string().contains("--command-str"));
    }

    #[test]
    fn build_config_applies_defaults() {
        let config = build_config(&opts_with_command("echo {}")).unwrap();
        assert_eq!(config.num_clients, 1);
        assert_eq!(config.base_dir, "~");
        assert!(!config.pull);
        assert_eq!(config.command_str.as_deref(), Some("echo {}"));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let tar_path = dir.path().join("code.tar");
        crate::archive::write_tar(&tar_path);
        let opts = FleetOpts {
            num_clients: Some(5),
            branch: Some("main".into()),
            files: Some(tar_path.clone()),
            pull: Some(true),
            ..opts_with_command("train.sh {}")
        };
        let config = build_config(&opts).unwrap();

        let written = save_config(&config, &dir.path().join("exp")).unwrap();
        assert!(written.to_string_lossy().ends_with("exp.json"));

        let loaded = load_config(&written).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.files, Some(tar_path));
    }

    #[test]
    fn build_config_rejects_a_non_tar_archive() {
        let dir = tempdir().unwrap();
        let tar_path = dir.path().join("notatar.tar");
        fs::write(&tar_path, "not a tar archive at all").unwrap();

        let opts = FleetOpts {
            files: Some(tar_path),
            ..opts_with_command("echo {}")
        };
        let err = build_config(&opts).unwrap_err();
        assert!(err.to_string().contains("notatar.tar"));
    }

    #[test]
    fn build_config_rejects_a_missing_archive() {
        let opts = FleetOpts {
            files: Some(PathBuf::from("/nonexistent/code.tar")),
            ..opts_with_command("echo {}")
        };
        let err = build_config(&opts).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/code.tar"));
    }

    #[test]
    fn build_config_rejects_a_missing_read_key() {
        let opts = FleetOpts {
            read_key: Some(PathBuf::from("/nonexistent/deploy.key")),
            ..opts_with_command("echo {}")
        };
        let err = build_config(&opts).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/deploy.key"));
    }

    #[test]
    fn load_fills_missing_keys_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"num_clients": 3, "command_str": "echo {}"}"#).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.num_clients, 3);
        assert_eq!(config.command_str.as_deref(), Some("echo {}"));
        assert_eq!(config.base_dir, "~");
        assert_eq!(config.files, None);
        assert_eq!(config.read_key, None);
    }

    #[test]
    fn load_ignores_unknown_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"num_clients": 2, "command_str": "echo {}", "region": "us-east-1"}"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.num_clients, 2);
    }

    #[test]
    fn load_forces_json_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"command_str": "echo {}"}"#).unwrap();

        // Asking for "settings" reads "settings.json".
        let config = load_config(&dir.path().join("settings")).unwrap();
        assert_eq!(config.command_str.as_deref(), Some("echo {}"));
    }

    #[test]
    fn extension_is_appended_not_replaced() {
        assert_eq!(
            force_json_extension(Path::new("conf.txt")),
            PathBuf::from("conf.txt.json")
        );
        assert_eq!(
            force_json_extension(Path::new("conf.json")),
            PathBuf::from("conf.json")
        );
    }

    #[test]
    fn update_overrides_only_supplied_flags() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"num_clients": 3, "base_dir": "/srv/exp", "command_str": "echo {}"}"#,
        )
        .unwrap();

        let mut config = load_config(&path).unwrap();
        let overrides = FleetOpts {
            num_clients: Some(10),
            ..FleetOpts::default()
        };
        config.apply_overrides(&overrides);

        // Supplied on the command line: overridden.
        assert_eq!(config.num_clients, 10);
        // Not supplied: the file's values stand.
        assert_eq!(config.base_dir, "/srv/exp");
        assert_eq!(config.command_str.as_deref(), Some("echo {}"));
    }

    #[test]
    fn malformed_json_names_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "not json").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = load_config(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/config.json"));
    }
}
