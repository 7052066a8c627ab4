pub mod client;
pub mod token;

pub use client::{Airline, AmadeusClient, ConfirmedPrice, Location};
pub use token::{OAuthTokenProvider, TokenProvider};
