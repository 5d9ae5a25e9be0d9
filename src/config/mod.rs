use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::platform::Region;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Platform connection settings
    pub platform: PlatformConfig,

    /// Export and download settings
    pub export: ExportConfig,

    /// External conversion script
    pub transcode: TranscodeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Region host, e.g. `sae1.pure.cloud`
    pub region: String,

    /// OAuth client id
    pub client_id: Option<String>,

    /// OAuth client secret
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Download directory (defaults to `Recordings` next to the executable)
    pub output_dir: Option<PathBuf>,

    /// Conversation search page size
    pub page_size: u32,

    /// Batch status checks before giving up
    pub max_poll_attempts: u32,

    /// Seconds between batch status checks
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeConfig {
    /// Program that runs the conversion script
    pub program: String,

    /// Arguments; `{script}`, `{dir}` and `{format}` are substituted
    pub args: Vec<String>,

    /// Conversion script, relative to the executable directory unless absolute
    pub script: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            platform: PlatformConfig {
                region: Region::SaoPaulo.host().to_string(),
                client_id: None,
                client_secret: None,
            },
            export: ExportConfig {
                output_dir: None,
                page_size: 100,
                max_poll_attempts: 60,
                poll_interval_secs: 10,
            },
            transcode: TranscodeConfig {
                program: "powershell.exe".to_string(),
                args: [
                    "-ExecutionPolicy",
                    "Bypass",
                    "-NoProfile",
                    "-File",
                    "{script}",
                    "-targetDir",
                    "{dir}",
                    "-targetFormat",
                    "{format}",
                ]
                .iter()
                .map(|arg| arg.to_string())
                .collect(),
                script: PathBuf::from("convert.ps1"),
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config = Self::from_yaml(&content)?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Parse and validate configuration YAML
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("recording-downloader").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if Region::from_host(&self.platform.region).is_none() {
            anyhow::bail!("Unknown region: {}", self.platform.region);
        }

        if !(1..=100).contains(&self.export.page_size) {
            anyhow::bail!("export.page_size must be between 1 and 100");
        }

        if self.export.max_poll_attempts == 0 {
            anyhow::bail!("export.max_poll_attempts must be greater than zero");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Region: {}", self.platform.region);
        println!(
            "  Client ID: {}",
            self.platform.client_id.as_deref().unwrap_or("(not set)")
        );
        println!(
            "  Client Secret: {}",
            if self.platform.client_secret.is_some() { "********" } else { "(not set)" }
        );
        match &self.export.output_dir {
            Some(dir) => println!("  Output Directory: {}", dir.display()),
            None => println!("  Output Directory: Recordings (next to the executable)"),
        }
        println!(
            "  Polling: {} checks every {}s",
            self.export.max_poll_attempts, self.export.poll_interval_secs
        );
        println!("  Conversion: {} {}", self.transcode.program, self.transcode.args.join(" "));
    }

    /// Print where the configuration file lives
    pub fn print_location() -> Result<()> {
        println!("{}", Self::location_hint(&Self::config_path()?));
        Ok(())
    }

    fn location_hint(path: &Path) -> String {
        format!(
            "Edit the config file to change settings:\n  {}\nCredentials can also be passed with GENESYS_CLIENT_ID / GENESYS_CLIENT_SECRET.",
            path.display()
        )
    }

    /// Configured region
    pub fn region(&self) -> Result<Region> {
        Region::from_host(&self.platform.region)
            .with_context(|| format!("Unknown region: {}", self.platform.region))
    }

    /// Client id and secret, preferring explicit overrides
    pub fn credentials(&self, client_id: Option<&str>, client_secret: Option<&str>) -> Result<(String, String)> {
        let id = client_id
            .map(str::to_string)
            .or_else(|| self.platform.client_id.clone())
            .filter(|id| !id.is_empty())
            .context("Client id is not configured (use --client-id or GENESYS_CLIENT_ID)")?;

        let secret = client_secret
            .map(str::to_string)
            .or_else(|| self.platform.client_secret.clone())
            .filter(|secret| !secret.is_empty())
            .context("Client secret is not configured (use --client-secret or GENESYS_CLIENT_SECRET)")?;

        Ok((id, secret))
    }

    /// Download directory, defaulting to `Recordings` under `base_dir`
    pub fn output_dir(&self, base_dir: &Path) -> PathBuf {
        self.export
            .output_dir
            .clone()
            .unwrap_or_else(|| base_dir.join("Recordings"))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.export.poll_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trips_through_yaml() {
        let yaml = serde_yaml::to_string(&Config::default()).unwrap();
        let config = Config::from_yaml(&yaml).unwrap();

        assert_eq!(config.region().unwrap(), Region::SaoPaulo);
        assert_eq!(config.export.max_poll_attempts, 60);
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
    }

    #[test]
    fn test_location_hint_names_file_and_env() {
        let hint = Config::location_hint(Path::new("/home/op/.config/recording-downloader/config.yaml"));

        assert!(hint.contains("/home/op/.config/recording-downloader/config.yaml"));
        assert!(hint.contains("GENESYS_CLIENT_ID"));
    }

    #[test]
    fn test_rejects_invalid_values() {
        let mut config = Config::default();
        config.export.page_size = 250;
        assert!(Config::from_yaml(&serde_yaml::to_string(&config).unwrap()).is_err());

        let mut config = Config::default();
        config.export.max_poll_attempts = 0;
        assert!(Config::from_yaml(&serde_yaml::to_string(&config).unwrap()).is_err());

        let mut config = Config::default();
        config.platform.region = "example.com".to_string();
        assert!(Config::from_yaml(&serde_yaml::to_string(&config).unwrap()).is_err());
    }

    #[test]
    fn test_credentials_prefer_overrides() {
        let mut config = Config::default();
        config.platform.client_id = Some("file-id".to_string());
        config.platform.client_secret = Some("file-secret".to_string());

        let (id, secret) = config.credentials(Some("cli-id"), None).unwrap();
        assert_eq!(id, "cli-id");
        assert_eq!(secret, "file-secret");
    }

    #[test]
    fn test_missing_credentials() {
        let config = Config::default();
        assert!(config.credentials(None, None).is_err());
        assert!(config.credentials(Some("id"), Some("")).is_err());
    }

    #[test]
    fn test_output_dir_default() {
        let config = Config::default();
        assert_eq!(
            config.output_dir(Path::new("/opt/recdl")),
            PathBuf::from("/opt/recdl/Recordings")
        );
    }
}
