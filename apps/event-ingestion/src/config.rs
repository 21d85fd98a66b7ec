use core_config::ingest::{AggregationConfig, IngestConfig};
use core_config::{AppInfo, FromEnv, app_info, server::ServerConfig};

// Re-export Environment for use in other modules
pub use core_config::Environment;

/// Application-specific configuration
/// Composes shared config components from the `config` library
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub server: ServerConfig,
    pub ingest: IngestConfig,
    pub aggregation: AggregationConfig,
    pub environment: Environment,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let server = ServerConfig::from_env()?; // HOST=0.0.0.0, PORT=8080
        let ingest = IngestConfig::from_env()?;
        let aggregation = AggregationConfig::from_env()?;

        Ok(Self {
            app: app_info!(),
            server,
            ingest,
            aggregation,
            environment,
        })
    }

    /// Defaults for every section, listening on an ephemeral local port.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            app: app_info!(),
            server: ServerConfig::new("127.0.0.1".to_string(), 0),
            ingest: IngestConfig::default(),
            aggregation: AggregationConfig::default(),
            environment: Environment::Development,
        }
    }
}
