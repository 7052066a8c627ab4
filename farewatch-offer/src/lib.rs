pub mod flex;
pub mod grouping;
pub mod reconcile;

pub use flex::{search_with_flex, FlexSearch};
pub use grouping::{fetch_all_prices, group_by_carrier, CarrierOffer, PricedSearch};
pub use reconcile::{reconcile, RefreshOutcome, WatchKeys};
