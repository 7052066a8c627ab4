use serde::{Deserialize, Serialize};

/// A priced itinerary quote as returned by the fare supplier.
///
/// Only the fields this service reads are modeled; everything else the
/// supplier sends is kept in `extra` so an offer can be echoed back verbatim
/// on the price-confirmation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightOffer {
    /// Supplier-native identifier. May be absent or unstable between searches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub itineraries: Vec<Itinerary>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<OfferPrice>,

    /// Derived stable identity, attached by the search path once per offer.
    #[serde(rename = "_uid", default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One direction of travel (outbound or return).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(default)]
    pub segments: Vec<Segment>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One physical flight leg within an itinerary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure: Option<SegmentEndpoint>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival: Option<SegmentEndpoint>,

    /// Marketing carrier code as the supplier reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier_code: Option<String>,

    /// Some supplier payloads carry an explicit marketing-carrier field
    /// instead of (or in addition to) `carrierCode`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketing_carrier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating: Option<OperatingCarrier>,

    /// Flight number, without the carrier prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,

    /// ISO-8601 duration string, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Segment {
    /// Carrier code used for fingerprinting: `carrierCode` first, then the
    /// explicit marketing-carrier field.
    pub fn fingerprint_carrier(&self) -> Option<&str> {
        self.carrier_code
            .as_deref()
            .or(self.marketing_carrier.as_deref())
    }

    /// Carrier code used for display: the explicit marketing-carrier field
    /// first, then `carrierCode`.
    pub fn marketing(&self) -> Option<&str> {
        self.marketing_carrier
            .as_deref()
            .or(self.carrier_code.as_deref())
    }

    pub fn operating_code(&self) -> Option<&str> {
        self.operating.as_ref().and_then(|o| o.carrier_code.as_deref())
    }
}

/// Departure or arrival point of a segment. Times are supplier-formatted
/// local timestamps and are never reinterpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentEndpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iata_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatingCarrier {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier_code: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Price block of an offer. Amounts are decimal strings exactly as the
/// supplier sends them; parsing happens at normalization time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferPrice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grand_total: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_taxes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fees: Option<Vec<PriceFee>>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceFee {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
