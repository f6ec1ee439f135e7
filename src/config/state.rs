// Application state module
// Holds the loaded configuration and the long-lived service handles

use crate::storage::ArtifactStore;
use crate::upstream::UpstreamClient;

use super::types::Config;

/// Application state shared by every connection
pub struct AppState {
    pub config: Config,
    pub upstream: UpstreamClient,
    pub store: ArtifactStore,
}

impl AppState {
    /// Build the outbound client and artifact store from configuration
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let upstream = UpstreamClient::new(&config.upstream, &config.diagram)?;
        let store = ArtifactStore::new(
            &config.storage.static_dir,
            &config.storage.public_base_url,
        );

        Ok(Self {
            config,
            upstream,
            store,
        })
    }
}
