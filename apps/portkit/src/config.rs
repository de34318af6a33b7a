//! # Configuration
//!
//! Layers, highest first: command line, environment (`PORTKIT_SRCDIR`,
//! `PORTKIT_PATCH`), `portkit.toml`, then built-in defaults. Settings that
//! also live in the cache (local dirs) fall through to the cache when no
//! layer here sets them.

use portkit_core::PortkitError;
use portkit_core::primitives::CONFIG_FILE_NAME;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming the canonical module source tree.
pub const ENV_SRCDIR: &str = "PORTKIT_SRCDIR";

/// Environment variable naming the patch program.
pub const ENV_PATCH: &str = "PORTKIT_PATCH";

const DEFAULT_PATCH_PROGRAM: &str = "patch";

/// Contents of `portkit.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub source_dir: Option<PathBuf>,
    pub local_dirs: Vec<PathBuf>,
    pub patch_program: Option<String>,
}

impl FileConfig {
    pub fn parse(text: &str) -> Result<Self, PortkitError> {
        toml::from_str(text)
            .map_err(|e| PortkitError::Usage(format!("invalid {CONFIG_FILE_NAME}: {e}")))
    }

    /// Load `explicit` (which must exist) or `<project_root>/portkit.toml`
    /// (which may not).
    pub fn load(project_root: &Path, explicit: Option<&Path>) -> Result<Self, PortkitError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = project_root.join(CONFIG_FILE_NAME);
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            }
        };
        let text = fs::read_to_string(&path).map_err(|e| PortkitError::io(&path, e))?;
        tracing::debug!(path = %path.display(), "loaded configuration file");
        Self::parse(&text)
    }
}

/// Values read from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    pub source_dir: Option<PathBuf>,
    pub patch_program: Option<String>,
}

impl Environment {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            source_dir: std::env::var_os(ENV_SRCDIR).map(PathBuf::from),
            patch_program: std::env::var(ENV_PATCH).ok().filter(|p| !p.is_empty()),
        }
    }
}

/// Fully layered configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub source_dir: PathBuf,
    /// Empty when no layer sets local dirs.
    pub local_dirs: Vec<PathBuf>,
    pub patch_program: String,
}

impl Config {
    /// Layer command-line values over `env` over `file`.
    pub fn layer(
        cli_source_dir: Option<PathBuf>,
        cli_local_dirs: Vec<PathBuf>,
        env: Environment,
        file: FileConfig,
    ) -> Result<Self, PortkitError> {
        let source_dir = cli_source_dir
            .or(env.source_dir)
            .or(file.source_dir)
            .ok_or_else(|| {
                PortkitError::MissingConfig(format!(
                    "no module source directory; pass --source-dir, set {ENV_SRCDIR} \
                     or add source_dir to {CONFIG_FILE_NAME}"
                ))
            })?;
        let local_dirs = if cli_local_dirs.is_empty() {
            file.local_dirs
        } else {
            cli_local_dirs
        };
        let patch_program = env
            .patch_program
            .or(file.patch_program)
            .unwrap_or_else(|| DEFAULT_PATCH_PROGRAM.to_string());

        Ok(Self {
            source_dir,
            local_dirs,
            patch_program,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_beats_environment_beats_file() {
        let env = Environment {
            source_dir: Some(PathBuf::from("/env")),
            patch_program: None,
        };
        let file = FileConfig {
            source_dir: Some(PathBuf::from("/file")),
            local_dirs: vec![PathBuf::from("local")],
            patch_program: Some("gpatch".to_string()),
        };

        let config = Config::layer(None, Vec::new(), env.clone(), file.clone()).expect("layer");
        assert_eq!(config.source_dir, PathBuf::from("/env"));
        assert_eq!(config.local_dirs, vec![PathBuf::from("local")]);
        assert_eq!(config.patch_program, "gpatch");

        let config =
            Config::layer(Some(PathBuf::from("/cli")), vec![PathBuf::from("mine")], env, file)
                .expect("layer");
        assert_eq!(config.source_dir, PathBuf::from("/cli"));
        assert_eq!(config.local_dirs, vec![PathBuf::from("mine")]);
    }

    #[test]
    fn missing_source_dir_is_missing_config() {
        let result = Config::layer(None, Vec::new(), Environment::default(), FileConfig::default());
        assert!(matches!(result, Err(PortkitError::MissingConfig(_))));
    }

    #[test]
    fn parses_config_file() {
        let config = FileConfig::parse(
            "source_dir = \"/opt/modules\"\nlocal_dirs = [\"local\"]\npatch_program = \"gpatch\"\n",
        )
        .expect("parse");
        assert_eq!(config.source_dir, Some(PathBuf::from("/opt/modules")));
        assert_eq!(config.local_dirs, vec![PathBuf::from("local")]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            FileConfig::parse("sourcedir = \"/x\"\n"),
            Err(PortkitError::Usage(_))
        ));
    }

    #[test]
    fn absent_default_file_is_empty() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        assert_eq!(
            FileConfig::load(dir.path(), None).expect("load"),
            FileConfig::default()
        );
    }
}
