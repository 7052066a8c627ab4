use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use farewatch_core::details::approximate_taxes;
use farewatch_core::fingerprint::tag_fingerprint;
use farewatch_core::offer::FlightOffer;
use farewatch_core::supplier::{FlightSupplier, SearchQuery, SearchResponse, SupplierError};

use crate::token::TokenProvider;

/// HTTP client for the Amadeus Self-Service APIs.
pub struct AmadeusClient {
    http: reqwest::Client,
    base_url: String,
    currency: String,
    max_results: u32,
    tokens: Arc<dyn TokenProvider>,
}

/// Firm price for an offer, confirmed against the pricing endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedPrice {
    pub base: f64,
    pub grand_total: f64,
    pub taxes: f64,
    pub currency: String,
    /// The repriced offer, re-fingerprinted.
    pub offer: FlightOffer,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iata_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    #[serde(default = "empty_object")]
    pub address: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct Airline {
    pub code: Option<String>,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    data: Vec<FlightOffer>,
    #[serde(default)]
    dictionaries: Option<Dictionaries>,
}

#[derive(Debug, Default, Deserialize)]
struct Dictionaries {
    #[serde(default)]
    carriers: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct PricingBody {
    #[serde(default)]
    data: Option<PricingData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PricingData {
    #[serde(default)]
    flight_offers: Vec<FlightOffer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListBody<T> {
    #[serde(default)]
    data: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AirlineRow {
    #[serde(default)]
    iata_code: Option<String>,
    #[serde(default)]
    business_name: Option<String>,
    #[serde(default)]
    common_name: Option<String>,
    #[serde(default)]
    legal_name: Option<String>,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

fn transport(err: reqwest::Error) -> SupplierError {
    SupplierError::Transport(err.to_string())
}

fn decode(err: reqwest::Error) -> SupplierError {
    SupplierError::Decode(err.to_string())
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

impl AmadeusClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        currency: impl Into<String>,
        max_results: u32,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            currency: currency.into(),
            max_results,
            tokens,
        }
    }

    /// Confirm the firm price for an offer via the pricing endpoint.
    ///
    /// Taxes prefer the per-traveler tax itemization when the supplier sends
    /// one; otherwise the price-block approximation applies.
    pub async fn confirm_price(&self, offer: &FlightOffer) -> Result<ConfirmedPrice, SupplierError> {
        let token = self.tokens.bearer_token().await?;
        let url = format!("{}/v1/shopping/flight-offers/pricing", self.base_url);
        tracing::debug!(%url, "pricing request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(&serde_json::json!({
                "data": {
                    "type": "flight-offers-pricing",
                    "flightOffers": [offer],
                }
            }))
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %truncate(&body, 500), "pricing failed");
            return Err(SupplierError::Status {
                status: status.as_u16(),
            });
        }

        let body: PricingBody = response.json().await.map_err(decode)?;
        let mut priced = body
            .data
            .and_then(|d| d.flight_offers.into_iter().next())
            .unwrap_or_else(|| offer.clone());
        tag_fingerprint(&mut priced);

        let approx = approximate_taxes(priced.price.as_ref());
        let taxes = traveler_taxes(&priced).unwrap_or(approx.taxes);
        let currency = priced
            .price
            .as_ref()
            .and_then(|p| p.currency.clone())
            .unwrap_or_else(|| self.currency.clone());

        Ok(ConfirmedPrice {
            base: approx.base,
            grand_total: approx.grand,
            taxes,
            currency,
            offer: priced,
        })
    }

    /// City/airport lookup for the search form. Bad-input and rate-limit
    /// responses degrade to an empty list.
    pub async fn search_locations(&self, keyword: &str) -> Result<Vec<Location>, SupplierError> {
        let query = sanitize_keyword(keyword);
        if query.len() < 2 {
            return Ok(Vec::new());
        }

        let token = self.tokens.bearer_token().await?;
        let url = format!("{}/v1/reference-data/locations", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .query(&[
                ("subType", "CITY,AIRPORT"),
                ("keyword", query.as_str()),
                ("page[limit]", "20"),
            ])
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %truncate(&body, 300), "locations lookup failed");
            if status.as_u16() == 400 || status.as_u16() == 429 {
                return Ok(Vec::new());
            }
            return Err(SupplierError::Status {
                status: status.as_u16(),
            });
        }

        let body: ListBody<Location> = response.json().await.map_err(decode)?;
        Ok(body.data)
    }

    /// Airline lookup by IATA code prefix. Degrades like `search_locations`.
    pub async fn search_airlines(&self, query: &str) -> Result<Vec<Airline>, SupplierError> {
        let code = sanitize_airline_code(query);
        if code.len() < 2 {
            return Ok(Vec::new());
        }

        let token = self.tokens.bearer_token().await?;
        let url = format!("{}/v1/reference-data/airlines", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .query(&[("airlineCodes", code.as_str())])
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %truncate(&body, 300), "airlines lookup failed");
            if status.as_u16() == 400 || status.as_u16() == 429 {
                return Ok(Vec::new());
            }
            return Err(SupplierError::Status {
                status: status.as_u16(),
            });
        }

        let body: ListBody<AirlineRow> = response.json().await.map_err(decode)?;
        Ok(body
            .data
            .into_iter()
            .map(|a| Airline {
                code: a.iata_code,
                name: a
                    .business_name
                    .or(a.common_name)
                    .or(a.legal_name)
                    .unwrap_or_default(),
            })
            .collect())
    }
}

#[async_trait]
impl FlightSupplier for AmadeusClient {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SupplierError> {
        let token = self.tokens.bearer_token().await?;

        let mut params: Vec<(&str, String)> = vec![
            ("originLocationCode", query.origin.clone()),
            ("destinationLocationCode", query.destination.clone()),
            (
                "departureDate",
                query.depart_date.format("%Y-%m-%d").to_string(),
            ),
        ];
        if let Some(return_date) = query.return_date {
            params.push(("returnDate", return_date.format("%Y-%m-%d").to_string()));
        }
        params.push(("adults", query.adults.to_string()));
        params.push(("currencyCode", self.currency.clone()));
        params.push(("max", self.max_results.to_string()));
        if let Some(airline) = query.airline.as_deref() {
            let code = airline.trim().to_uppercase();
            if !code.is_empty() {
                params.push(("includedAirlineCodes", code));
            }
        }

        tracing::debug!(
            origin = %query.origin,
            destination = %query.destination,
            depart = %query.depart_date,
            "flight-offers search",
        );

        let response = self
            .http
            .get(format!("{}/v2/shopping/flight-offers", self.base_url))
            .bearer_auth(&token)
            .query(&params)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %truncate(&body, 500), "flight-offers search failed");
            return Err(SupplierError::Status {
                status: status.as_u16(),
            });
        }

        let body: SearchBody = response.json().await.map_err(decode)?;
        let mut offers = body.data;
        for offer in &mut offers {
            tag_fingerprint(offer);
        }
        let carriers = body.dictionaries.map(|d| d.carriers).unwrap_or_default();

        tracing::debug!(offers = offers.len(), "flight-offers search returned");
        Ok(SearchResponse { offers, carriers })
    }
}

/// Sum of the per-traveler tax itemization, when the supplier sends one.
fn traveler_taxes(offer: &FlightOffer) -> Option<f64> {
    let travelers = offer.extra.get("travelerPricings")?.as_array()?;
    let mut sum = 0.0;
    for traveler in travelers {
        if let Some(taxes) = traveler.pointer("/price/taxes").and_then(|t| t.as_array()) {
            for tax in taxes {
                sum += tax
                    .get("amount")
                    .and_then(|a| a.as_str())
                    .and_then(|s| s.parse::<f64>().ok())
                    .unwrap_or(0.0);
            }
        }
    }
    Some(sum)
}

/// Keep letters, digits and single spaces; uppercase the rest away.
fn sanitize_keyword(input: &str) -> String {
    let replaced: String = input
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();
    replaced
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Reduce free-form input to an IATA-shaped airline code.
fn sanitize_airline_code(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(3)
        .collect::<String>()
        .to_uppercase()
}
