// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub routes: RoutesConfig,
    pub storage: StorageConfig,
    pub upstream: UpstreamConfig,
    pub diagram: DiagramConfig,
    pub plot: PlotConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7860,
            workers: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Output format: `compact` or `json`
    pub format: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    pub access_log_format: String,
    /// Log request payloads at debug level (tokens are redacted)
    pub log_payloads: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
            access_log: true,
            access_log_format: "combined".to_string(),
            log_payloads: false,
        }
    }
}

/// Performance configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
    /// Seconds to wait for open connections after a shutdown signal
    pub shutdown_grace_secs: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            keep_alive_timeout: 75,
            read_timeout: 180,
            write_timeout: 180,
            max_connections: None,
            shutdown_grace_secs: 10,
        }
    }
}

/// HTTP configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub server_name: String,
    pub enable_cors: bool,
    pub max_body_size: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            server_name: "artifact-proxy".to_string(),
            enable_cors: true,
            max_body_size: 1_048_576, // 1MB
        }
    }
}

/// Routes configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct RoutesConfig {
    pub health: HealthConfig,
}

/// Health check configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct HealthConfig {
    /// Enable health check endpoints
    pub enabled: bool,
    /// Liveness probe path (default: /healthz)
    pub liveness_path: String,
    /// Readiness probe path (default: /readyz)
    pub readiness_path: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            liveness_path: "/healthz".to_string(),
            readiness_path: "/readyz".to_string(),
        }
    }
}

/// Artifact storage configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory artifacts are written to and served from
    pub static_dir: String,
    /// URL path prefix the static directory is served under
    pub route_prefix: String,
    /// Base URL placed in front of artifact filenames in responses
    pub public_base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            static_dir: "static".to_string(),
            route_prefix: "/static".to_string(),
            public_base_url: "http://127.0.0.1:7860/static".to_string(),
        }
    }
}

/// Image generation upstream configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct UpstreamConfig {
    pub cloudflare_base_url: String,
    /// Model used by `/v1/images/generations`
    pub v1_model: String,
    /// Model used by `/v2/images/generations`
    pub v2_model: String,
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            cloudflare_base_url: "https://api.cloudflare.com/client/v4".to_string(),
            v1_model: "@cf/stabilityai/stable-diffusion-xl-base-1.0".to_string(),
            v2_model: "@cf/bytedance/stable-diffusion-xl-lightning".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Diagram rendering service configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DiagramConfig {
    pub render_url: String,
    /// Result URL; `{id}` is replaced by the render service's reply
    pub result_url_template: String,
    pub start_marker: String,
    pub end_marker: String,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            render_url: "http://127.0.0.1:8090/render".to_string(),
            result_url_template: "http://127.0.0.1:8090/diagrams/{id}.svg".to_string(),
            start_marker: "```mermaid".to_string(),
            end_marker: "```".to_string(),
        }
    }
}

/// Plot rendering configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PlotConfig {
    pub start_marker: String,
    pub end_marker: String,
    pub max_source_bytes: usize,
    pub default_resolution: usize,
    pub max_resolution: usize,
    pub image_width: u32,
    pub image_height: u32,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            start_marker: "```plot".to_string(),
            end_marker: "```".to_string(),
            max_source_bytes: 8192,
            default_resolution: 60,
            max_resolution: 200,
            image_width: 800,
            image_height: 600,
        }
    }
}
