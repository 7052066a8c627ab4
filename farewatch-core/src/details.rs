use serde::{Deserialize, Serialize};

use crate::offer::{FlightOffer, OfferPrice, SegmentEndpoint};

/// Display-ready view of an offer: headline price, tax breakdown and
/// per-itinerary stop/layover structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferDetails {
    /// Grand total rounded to the nearest unit of currency. Used for sorting
    /// and list display; the detail fields keep full precision.
    pub price: i64,
    pub currency: String,
    pub base: f64,
    pub grand_total: f64,
    pub taxes: f64,
    pub itineraries: Vec<ItineraryDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryDetails {
    pub segments: Vec<SegmentDetails>,
    pub stops: u32,
    pub layovers: Vec<Layover>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure: Option<SegmentEndpoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival: Option<SegmentEndpoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marketing_carrier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_carrier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

/// Connection window between two consecutive segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layover {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub airport: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxBreakdown {
    pub base: f64,
    pub grand: f64,
    pub taxes: f64,
    pub fees_sum: f64,
}

fn parse_amount(value: Option<&str>) -> Option<f64> {
    value.and_then(|s| s.trim().parse::<f64>().ok())
}

/// Approximate the tax portion of a price block.
///
/// Priority: an explicit total-taxes figure; otherwise grand total minus base
/// minus itemized fees, clamped at zero. Unparseable amounts count as zero.
pub fn approximate_taxes(price: Option<&OfferPrice>) -> TaxBreakdown {
    let base = price
        .and_then(|p| parse_amount(p.base.as_deref()))
        .unwrap_or(0.0);
    let grand = price
        .and_then(|p| parse_amount(p.grand_total.as_deref()).or_else(|| parse_amount(p.total.as_deref())))
        .unwrap_or(0.0);
    let fees_sum = price
        .and_then(|p| p.fees.as_ref())
        .map(|fees| {
            fees.iter()
                .filter_map(|f| parse_amount(f.amount.as_deref()))
                .sum()
        })
        .unwrap_or(0.0);

    let taxes = match price.and_then(|p| parse_amount(p.total_taxes.as_deref())) {
        Some(total_taxes) => total_taxes,
        None => (grand - base - fees_sum).max(0.0),
    };

    TaxBreakdown {
        base,
        grand,
        taxes,
        fees_sum,
    }
}

/// Map a raw supplier offer to its display shape.
pub fn normalize(offer: &FlightOffer) -> OfferDetails {
    let price = offer.price.as_ref();
    let TaxBreakdown {
        base, grand, taxes, ..
    } = approximate_taxes(price);
    let currency = price
        .and_then(|p| p.currency.clone())
        .unwrap_or_else(|| "USD".to_string());

    let itineraries = offer
        .itineraries
        .iter()
        .map(|itinerary| {
            let segments: Vec<SegmentDetails> = itinerary
                .segments
                .iter()
                .map(|s| SegmentDetails {
                    departure: s.departure.clone(),
                    arrival: s.arrival.clone(),
                    marketing_carrier: s.marketing().map(str::to_string),
                    operating_carrier: s.operating_code().map(str::to_string),
                    flight_number: s.number.clone(),
                    duration: s.duration.clone(),
                })
                .collect();

            let stops = segments.len().saturating_sub(1) as u32;

            let layovers = segments
                .windows(2)
                .map(|pair| {
                    let arrival = pair[0].arrival.as_ref();
                    let departure = pair[1].departure.as_ref();
                    Layover {
                        airport: arrival.and_then(|e| e.iata_code.clone()),
                        from: arrival.and_then(|e| e.at.clone()),
                        to: departure.and_then(|e| e.at.clone()),
                    }
                })
                .collect();

            ItineraryDetails {
                segments,
                stops,
                layovers,
            }
        })
        .collect();

    OfferDetails {
        price: grand.round() as i64,
        currency,
        base,
        grand_total: grand,
        taxes,
        itineraries,
    }
}
