// Configuration module entry point
// Loads layered configuration and builds the shared application state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{
    Config, DiagramConfig, HealthConfig, HttpConfig, LoggingConfig, PerformanceConfig,
    PlotConfig, RoutesConfig, ServerConfig, StorageConfig, UpstreamConfig,
};

/// Default config file name (without extension)
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// Missing keys fall back to the `Default` impls, the file is optional,
    /// and `PROXY_<SECTION>__<KEY>` environment variables override both.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("PROXY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::load_from("does-not-exist/config").unwrap();
        assert_eq!(cfg.server.port, 7860);
        assert_eq!(cfg.storage.route_prefix, "/static");
        assert!(cfg.upstream.v1_model.contains("stable-diffusion-xl-base"));
        assert_eq!(cfg.plot.max_resolution, 200);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proxy.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[server]\nport = 9000\n\n[storage]\npublic_base_url = \"https://cdn.example.com/static\"\n\n[plot]\nimage_width = 320"
        )
        .unwrap();

        let stem = dir.path().join("proxy");
        let cfg = Config::load_from(stem.to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.storage.public_base_url, "https://cdn.example.com/static");
        assert_eq!(cfg.plot.image_width, 320);
        assert_eq!(cfg.plot.image_height, 600);
    }

    #[test]
    fn test_socket_addr() {
        let mut cfg = Config::default();
        cfg.server.host = "127.0.0.1".to_string();
        cfg.server.port = 8080;
        assert_eq!(cfg.get_socket_addr().unwrap().port(), 8080);

        cfg.server.host = "not an address".to_string();
        assert!(cfg.get_socket_addr().is_err());
    }
}
