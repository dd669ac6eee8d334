use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub server: ServerConfig,
}

/// Location of the GeoNames dump files
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DataConfig {
    pub dir: PathBuf,
    /// Populated places indexed for lookup
    pub cities: String,
    /// Country dump; its ADM3/ADM4 features name the municipalities
    pub country: String,
    pub admin1: String,
    pub admin2: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            cities: "cities500.txt".to_string(),
            country: "GR.txt".to_string(),
            admin1: "admin1CodesASCII.txt".to_string(),
            admin2: "admin2Codes.txt".to_string(),
        }
    }
}

impl DataConfig {
    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Load `path` if given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.data.path(&config.data.cities), PathBuf::from("data/cities500.txt"));
        assert_eq!(config.data.country, "GR.txt");
        assert_eq!(config.server.listen, "0.0.0.0:3000");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[data]\ndir = \"/srv/geonames\"\ncountry = \"CY.txt\"").unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.data.dir, PathBuf::from("/srv/geonames"));
        assert_eq!(config.data.country, "CY.txt");
        assert_eq!(config.data.admin1, "admin1CodesASCII.txt");
        assert_eq!(config.server.listen, "0.0.0.0:3000");
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[data\ndir = 3").unwrap();
        assert!(Config::load_from_file(file.path()).is_err());
        assert!(Config::load_or_default(None).is_ok());
    }
}
