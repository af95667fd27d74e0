use super::types::MeshdexConfig;
use std::fs;
use std::path::Path;

impl MeshdexConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: MeshdexConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration settings
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.index.forward_key_suffix.is_empty() {
            return Err(anyhow::anyhow!("forward_key_suffix cannot be empty"));
        }

        if self.storage.cas_max_retries == 0 {
            return Err(anyhow::anyhow!("cas_max_retries must be at least 1"));
        }

        if self.storage.data_path.trim().is_empty() {
            return Err(anyhow::anyhow!("data_path cannot be empty"));
        }

        if self.storage.max_open_files == 0 || self.storage.max_open_files < -1 {
            return Err(anyhow::anyhow!(
                "max_open_files must be positive or -1 (unlimited), got {}",
                self.storage.max_open_files
            ));
        }

        Ok(())
    }
}
