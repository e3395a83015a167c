use std::path::PathBuf;

use printfleet_core::{AgentConfig, ConfigSource, Error, StorageAction};

const CONFIG_PATH_ENV: &str = "PRINTFLEET_CONFIG";
const DEFAULT_CONFIG_FILENAME: &str = "agent.json";

/// Loads `AgentConfig` from a JSON file, falling back to spec defaults when
/// the file is absent entirely (a fresh install with no scan ranges
/// configured yet still starts and idles rather than refusing to run).
/// Environment variables override the server URL and token so a deployment
/// doesn't have to bake credentials into the config file on disk.
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Resolves the config path from `PRINTFLEET_CONFIG`, falling back to
    /// `agent.json` in the platform data directory.
    pub fn from_env() -> Self {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir().join(DEFAULT_CONFIG_FILENAME));
        Self::new(path)
    }
}

impl ConfigSource for FileConfigSource {
    fn load(&self) -> Result<AgentConfig, Error> {
        let mut config = if self.path.exists() {
            let raw = std::fs::read_to_string(&self.path).map_err(|source| Error::StorageIo {
                action: StorageAction::Load,
                path: Some(self.path.display().to_string()),
                source,
            })?;
            serde_json::from_str(&raw).map_err(|source| Error::Diagnostics {
                action: StorageAction::Load,
                path: Some(self.path.display().to_string()),
                source,
            })?
        } else {
            AgentConfig::default()
        };

        if let Ok(server_url) = std::env::var("PRINTFLEET_SERVER_URL") {
            config.server_url = Some(server_url);
        }
        if let Ok(token) = std::env::var("PRINTFLEET_AGENT_TOKEN") {
            config.agent_token = Some(token);
        }

        Ok(config)
    }
}

fn data_dir() -> PathBuf {
    let base = if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg)
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".config")
    } else {
        PathBuf::from("/etc")
    };
    base.join("printfleet")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let source = FileConfigSource::new(PathBuf::from("/nonexistent/printfleet/agent.json"));
        let config = source.load().unwrap();
        assert_eq!(config, AgentConfig::default());
    }

    #[test]
    fn reads_config_from_disk() {
        let dir = std::env::temp_dir().join(format!("printfleet-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("agent.json");
        std::fs::write(&path, r#"{"scan_ranges": ["192.168.1.0/24"]}"#).unwrap();

        let source = FileConfigSource::new(path);
        let config = source.load().unwrap();
        assert_eq!(config.scan_ranges, vec!["192.168.1.0/24".to_string()]);

        std::fs::remove_dir_all(&dir).ok();
    }
}
