use crate::offer::FlightOffer;

/// Derive a stable identity for an offer.
///
/// The supplier id is authoritative when present. Otherwise the identity is
/// built from every segment's routing, times, carrier and flight number plus
/// the offer price, so two quotes for the same seats at the same price
/// collapse to one identity across searches. Returns `None` when the offer
/// carries neither a price nor itineraries; callers treat that as "cannot
/// dedupe".
pub fn fingerprint(offer: &FlightOffer) -> Option<String> {
    if let Some(id) = offer.id.as_deref() {
        if !id.is_empty() {
            return Some(id.to_string());
        }
    }

    if offer.itineraries.is_empty() && offer.price.is_none() {
        return None;
    }

    let mut parts = Vec::new();
    for itinerary in &offer.itineraries {
        for segment in &itinerary.segments {
            let departure = segment.departure.as_ref();
            let arrival = segment.arrival.as_ref();
            parts.push(format!(
                "{}-{}-{}-{}-{}-{}",
                departure.and_then(|e| e.iata_code.as_deref()).unwrap_or(""),
                arrival.and_then(|e| e.iata_code.as_deref()).unwrap_or(""),
                departure.and_then(|e| e.at.as_deref()).unwrap_or(""),
                arrival.and_then(|e| e.at.as_deref()).unwrap_or(""),
                segment.fingerprint_carrier().unwrap_or(""),
                segment.number.as_deref().unwrap_or(""),
            ));
        }
    }

    let price = offer.price.as_ref();
    parts.push(format!(
        "price:{}:{}",
        price
            .and_then(|p| p.grand_total.as_deref().or(p.total.as_deref()))
            .unwrap_or(""),
        price.and_then(|p| p.currency.as_deref()).unwrap_or(""),
    ));

    Some(parts.join("|"))
}

/// Attach the computed fingerprint to an offer in place. Idempotent; the
/// fingerprint never depends on a previously attached value.
pub fn tag_fingerprint(offer: &mut FlightOffer) {
    offer.uid = fingerprint(offer);
}
