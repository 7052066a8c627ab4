use std::sync::Arc;

use farewatch_amadeus::AmadeusClient;
use farewatch_store::app_config::SearchConfig;
use farewatch_store::WatchlistRepository;

#[derive(Clone)]
pub struct AppState {
    pub amadeus: Arc<AmadeusClient>,
    pub watchlist: Arc<dyn WatchlistRepository>,
    pub search: SearchConfig,
}
