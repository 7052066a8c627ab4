pub mod details;
pub mod fingerprint;
pub mod offer;
pub mod supplier;

pub use details::{normalize, OfferDetails};
pub use fingerprint::fingerprint;
pub use offer::FlightOffer;
pub use supplier::{FlightSupplier, SearchQuery, SearchResponse, SupplierError};
