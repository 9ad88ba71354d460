use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use directories_next::ProjectDirs;
use stageconfig::StageConfig;

pub const ENV_CONFIG_DIR: &str = "FITSTAGE_CONFIG_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "Fitstage";
const APPLICATION: &str = "fitstage";
const CONFIG_FILE: &str = "stage.toml";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
}

impl AppPaths {
    /// `$FITSTAGE_CONFIG_DIR` when set and non-empty, else the platform config dir.
    pub fn discover() -> Result<Self> {
        let from_env = env::var_os(ENV_CONFIG_DIR)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        Self::resolve(from_env)
    }

    fn resolve(override_dir: Option<PathBuf>) -> Result<Self> {
        let config_dir = match override_dir {
            Some(dir) => dir,
            None => ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
                .map(|dirs| dirs.config_dir().to_path_buf())
                .ok_or_else(|| anyhow!("no home directory to place {APPLICATION} config in"))?,
        };
        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }
}

/// Loads an explicit config (file or directory), else the discovered
/// `stage.toml`, else the built-in defaults. Returns the path actually read.
pub fn load_config(explicit: Option<&Path>, paths: &AppPaths) -> Result<(StageConfig, Option<PathBuf>)> {
    let candidate = match explicit {
        Some(path) if path.is_dir() => path.join(CONFIG_FILE),
        Some(path) => path.to_path_buf(),
        None => {
            let discovered = paths.config_file();
            if !discovered.exists() {
                tracing::debug!(
                    path = %discovered.display(),
                    "no stage config found; using built-in defaults"
                );
                return Ok((StageConfig::default(), None));
            }
            discovered
        }
    };

    if !candidate.exists() {
        bail!("stage config {} does not exist", candidate.display());
    }
    let contents = fs::read_to_string(&candidate)
        .with_context(|| format!("failed to read stage config at {}", candidate.display()))?;
    let config = StageConfig::from_toml_str(&contents)
        .with_context(|| format!("failed to load stage config at {}", candidate.display()))?;
    Ok((config, Some(candidate)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn override_dir_replaces_platform_dir() {
        let root = TempDir::new().unwrap();
        let paths = AppPaths::resolve(Some(root.path().join("stage"))).unwrap();
        assert_eq!(paths.config_dir(), root.path().join("stage"));
        assert_eq!(paths.config_file(), root.path().join("stage/stage.toml"));
    }

    #[test]
    fn missing_discovered_config_falls_back_to_defaults() {
        let root = TempDir::new().unwrap();
        let paths = AppPaths::resolve(Some(root.path().to_path_buf())).unwrap();
        let (config, source) = load_config(None, &paths).unwrap();
        assert!(source.is_none());
        assert_eq!(config.exercises.len(), 3);
    }

    #[test]
    fn explicit_directory_resolves_stage_toml() {
        let root = TempDir::new().unwrap();
        fs::write(
            root.path().join("stage.toml"),
            "version = 1\n\n[timing]\nexercise_fade = \"1s\"\n",
        )
        .unwrap();
        let paths = AppPaths::resolve(Some(root.path().join("unused"))).unwrap();
        let (config, source) = load_config(Some(root.path()), &paths).unwrap();
        assert_eq!(source, Some(root.path().join("stage.toml")));
        assert_eq!(config.timing.exercise_fade.as_secs(), 1);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let root = TempDir::new().unwrap();
        let paths = AppPaths::resolve(Some(root.path().to_path_buf())).unwrap();
        assert!(load_config(Some(&root.path().join("nope.toml")), &paths).is_err());
    }
}
