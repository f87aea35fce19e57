use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::errors::ServerError;

/// Startup configuration (spec §6). No persisted state beyond this: the
/// server never writes its own config back out, and nothing survives a
/// restart.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub network: NetworkConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
    pub motd: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NetworkConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            name: "LudServer".to_string(),
            version: "LudServer1.0".to_string(),
            motd: "This is a cool message".to_string(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig { port: 6667 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}

impl Config {
    /// Loads and parses the TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ServerError> {
        let content = fs::read_to_string(path).map_err(|e| ServerError::Config(e.to_string()))?;
        toml::from_str(&content).map_err(|e| ServerError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.server.name, "LudServer");
        assert_eq!(cfg.network.port, 6667);
        assert_eq!(cfg.server.motd, "This is a cool message");
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg: Config = toml::from_str("[server]\nname = \"Elsewhere\"\n").unwrap();
        assert_eq!(cfg.server.name, "Elsewhere");
        assert_eq!(cfg.server.version, "LudServer1.0");
        assert_eq!(cfg.network.port, 6667);
    }
}
