use std::sync::Arc;

use crate::{
    catalog::WorkCatalog, config::ServerConfig, error::CatalogError, spotify::SpotifyClient,
    statics::StaticDir,
};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<WorkCatalog>,
    pub spotify: Option<SpotifyClient>,
    pub site: StaticDir,
    pub uploads: StaticDir,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Result<Self, CatalogError> {
        let catalog = WorkCatalog::open(config)?;

        Ok(Self {
            catalog: Arc::new(catalog),
            spotify: config.spotify.clone().map(SpotifyClient::new),
            site: StaticDir::new(&config.site_root)
                .hide(&config.data_dir)
                .hide(&config.uploads_dir),
            uploads: StaticDir::new(&config.uploads_dir),
        })
    }
}
