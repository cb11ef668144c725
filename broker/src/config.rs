use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use dirs::home_dir;
use serde::Deserialize;

pub const ROOTPROMPT_HOME_ENV_VAR: &str = "ROOTPROMPT_HOME";
pub const CONFIG_FILE_NAME: &str = "config.toml";
const DEFAULT_HOME_DIR_NAME: &str = ".rootprompt";
const DEFAULT_APP_DATA_DIR: &str = "/data/user_de";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrokerConfig {
    /// How long to wait for the requester to attach its reader.
    pub fifo_open_timeout_ms: u64,
    /// Upper bound of the duration slider, in minutes.
    pub max_duration_minutes: u32,
    /// Treat losing terminal focus like the prompt being backgrounded.
    pub deny_on_focus_loss: bool,
    /// Per-user package data root used to map uids to packages.
    pub app_data_dir: PathBuf,
    /// Defaults to `<home>/log`.
    pub log_dir: Option<PathBuf>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            fifo_open_timeout_ms: 5_000,
            max_duration_minutes: 60,
            deny_on_focus_loss: true,
            app_data_dir: PathBuf::from(DEFAULT_APP_DATA_DIR),
            log_dir: None,
        }
    }
}

impl BrokerConfig {
    /// Loads `<home>/config.toml`; a missing file yields the defaults.
    pub fn load(home: &Path) -> Result<Self, ConfigError> {
        let path = home.join(CONFIG_FILE_NAME);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Self::from_toml(&contents, &path),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read { path, source }),
        }
    }

    fn from_toml(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn fifo_open_timeout(&self) -> Duration {
        Duration::from_millis(self.fifo_open_timeout_ms)
    }

    pub fn log_dir(&self, home: &Path) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| home.join("log"))
    }
}

/// Returns the rootprompt home directory: `ROOTPROMPT_HOME` when set, which
/// must be an existing directory, otherwise `~/.rootprompt` (not required to
/// exist).
pub fn find_rootprompt_home() -> io::Result<PathBuf> {
    let home_env = std::env::var(ROOTPROMPT_HOME_ENV_VAR)
        .ok()
        .filter(|val| !val.is_empty());
    find_rootprompt_home_from_env(home_env.as_deref())
}

fn find_rootprompt_home_from_env(home_env: Option<&str>) -> io::Result<PathBuf> {
    let Some(val) = home_env else {
        let mut path = home_dir().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "could not find home directory")
        })?;
        path.push(DEFAULT_HOME_DIR_NAME);
        return Ok(path);
    };

    let path = PathBuf::from(val);
    let metadata = std::fs::metadata(&path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => io::Error::new(
            io::ErrorKind::NotFound,
            format!("{ROOTPROMPT_HOME_ENV_VAR} points to {val:?}, but that path does not exist"),
        ),
        _ => io::Error::new(
            err.kind(),
            format!("failed to read {ROOTPROMPT_HOME_ENV_VAR} {val:?}: {err}"),
        ),
    })?;
    if !metadata.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{ROOTPROMPT_HOME_ENV_VAR} points to {val:?}, but that path is not a directory"),
        ));
    }
    path.canonicalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() -> anyhow::Result<()> {
        let home = TempDir::new()?;
        let config = BrokerConfig::load(home.path())?;
        assert_eq!(config, BrokerConfig::default());
        assert_eq!(config.fifo_open_timeout(), Duration::from_secs(5));
        assert_eq!(config.log_dir(home.path()), home.path().join("log"));
        Ok(())
    }

    #[test]
    fn partial_file_overrides_only_given_keys() -> anyhow::Result<()> {
        let home = TempDir::new()?;
        std::fs::write(
            home.path().join(CONFIG_FILE_NAME),
            "fifo_open_timeout_ms = 250\ndeny_on_focus_loss = false\n",
        )?;

        let config = BrokerConfig::load(home.path())?;

        assert_eq!(
            config,
            BrokerConfig {
                fifo_open_timeout_ms: 250,
                deny_on_focus_loss: false,
                ..BrokerConfig::default()
            }
        );
        Ok(())
    }

    #[test]
    fn unknown_keys_are_rejected() -> anyhow::Result<()> {
        let home = TempDir::new()?;
        std::fs::write(home.path().join(CONFIG_FILE_NAME), "fifo_timeout = 1\n")?;

        let err = BrokerConfig::load(home.path()).err();

        assert!(
            matches!(err, Some(ConfigError::Parse { .. })),
            "unexpected result: {err:?}"
        );
        Ok(())
    }

    #[test]
    fn home_env_missing_path_is_fatal() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let missing = temp.path().join("missing");
        let missing = missing.to_string_lossy();

        let err = find_rootprompt_home_from_env(Some(&missing)).err();

        let Some(err) = err else {
            anyhow::bail!("missing home must fail");
        };
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(err.to_string().contains(ROOTPROMPT_HOME_ENV_VAR));
        Ok(())
    }

    #[test]
    fn home_env_file_is_fatal() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let file = temp.path().join("home.txt");
        std::fs::write(&file, "not a directory")?;

        let err = find_rootprompt_home_from_env(Some(&file.to_string_lossy())).err();

        assert_eq!(err.map(|e| e.kind()), Some(io::ErrorKind::InvalidInput));
        Ok(())
    }

    #[test]
    fn home_env_directory_is_canonicalized() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let resolved = find_rootprompt_home_from_env(Some(&temp.path().to_string_lossy()))?;
        assert_eq!(resolved, temp.path().canonicalize()?);
        Ok(())
    }

    #[test]
    fn default_home_is_under_user_home() -> anyhow::Result<()> {
        let resolved = find_rootprompt_home_from_env(None)?;
        let Some(mut expected) = home_dir() else {
            anyhow::bail!("no home dir");
        };
        expected.push(".rootprompt");
        assert_eq!(resolved, expected);
        Ok(())
    }
}
