use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use farewatch_core::details::{normalize, OfferDetails};
use farewatch_core::offer::FlightOffer;
use farewatch_core::supplier::{FlightSupplier, SearchQuery};

use crate::flex::search_with_flex;

/// Offers per carrier group are capped at the cheapest five.
const GROUP_LIMIT: usize = 5;

/// One offer as presented under a carrier group: resolved airline name,
/// normalized price view and the raw offer for later re-pricing or watching.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarrierOffer {
    pub airline: String,
    pub code: String,
    pub price: i64,
    pub currency: String,
    pub details: OfferDetails,
    pub offer: FlightOffer,
    pub offer_id: Option<String>,
    pub offer_fingerprint: Option<String>,
    pub depart_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
}

/// Grouped and flattened view of one priced search.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedSearch {
    /// Carrier code → up to five cheapest offers touching that carrier.
    pub grouped: BTreeMap<String, Vec<CarrierOffer>>,
    /// All group entries re-sorted ascending by price. An interline offer
    /// appears once per carrier it touches.
    pub results: Vec<CarrierOffer>,
    /// Propagated from the flexible-date sweep.
    pub degraded: bool,
}

/// Carrier codes an offer touches, marketing and operating both counted,
/// de-duplicated per offer.
fn carriers_in_offer(offer: &FlightOffer) -> BTreeSet<String> {
    let mut codes = BTreeSet::new();
    for itinerary in &offer.itineraries {
        for segment in &itinerary.segments {
            for code in [
                segment.carrier_code.as_deref(),
                segment.marketing_carrier.as_deref(),
                segment.operating_code(),
            ]
            .into_iter()
            .flatten()
            {
                codes.insert(code.to_string());
            }
        }
    }
    codes
}

/// Fan offers out per carrier code, sort each group by price and truncate to
/// the cheapest five. Carriers touching no offer do not appear.
pub fn group_by_carrier(
    offers: &[FlightOffer],
    carriers: &HashMap<String, String>,
    depart_date: NaiveDate,
    return_date: Option<NaiveDate>,
) -> BTreeMap<String, Vec<CarrierOffer>> {
    let mut grouped: BTreeMap<String, Vec<CarrierOffer>> = BTreeMap::new();

    for offer in offers {
        let details = normalize(offer);
        for code in carriers_in_offer(offer) {
            let airline = carriers.get(&code).cloned().unwrap_or_else(|| code.clone());
            grouped.entry(code.clone()).or_default().push(CarrierOffer {
                airline,
                code,
                price: details.price,
                currency: details.currency.clone(),
                details: details.clone(),
                offer: offer.clone(),
                offer_id: offer.id.clone(),
                offer_fingerprint: offer.uid.clone(),
                depart_date,
                return_date,
            });
        }
    }

    for group in grouped.values_mut() {
        group.sort_by_key(|entry| entry.price);
        group.truncate(GROUP_LIMIT);
    }

    grouped
}

fn flatten_ranked(grouped: &BTreeMap<String, Vec<CarrierOffer>>) -> Vec<CarrierOffer> {
    let mut results: Vec<CarrierOffer> = grouped.values().flatten().cloned().collect();
    results.sort_by_key(|entry| entry.price);
    results
}

/// Full search pipeline: flexible-date sweep, then per-carrier grouping and
/// the globally price-ranked flat list.
pub async fn fetch_all_prices(
    supplier: &dyn FlightSupplier,
    query: &SearchQuery,
    flex_days: i64,
) -> PricedSearch {
    let found = search_with_flex(supplier, query, flex_days).await;
    if found.offers.is_empty() {
        if found.degraded {
            tracing::warn!("search degraded and produced no offers");
        }
        return PricedSearch {
            degraded: found.degraded,
            ..Default::default()
        };
    }

    let grouped = group_by_carrier(
        &found.offers,
        &found.carriers,
        query.depart_date,
        query.return_date,
    );
    let results = flatten_ranked(&grouped);

    PricedSearch {
        grouped,
        results,
        degraded: found.degraded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use farewatch_core::fingerprint::tag_fingerprint;
    use farewatch_core::offer::{Itinerary, OfferPrice, OperatingCarrier, Segment, SegmentEndpoint};

    fn endpoint(code: &str, at: &str) -> Option<SegmentEndpoint> {
        Some(SegmentEndpoint {
            iata_code: Some(code.to_string()),
            terminal: None,
            at: Some(at.to_string()),
            extra: Default::default(),
        })
    }

    fn offer(carriers: &[&str], grand_total: &str, number: &str) -> FlightOffer {
        let segments = carriers
            .iter()
            .enumerate()
            .map(|(i, carrier)| Segment {
                departure: endpoint("CLT", &format!("2025-03-01T0{}:00", i)),
                arrival: endpoint("DXB", &format!("2025-03-01T0{}:45", i)),
                carrier_code: Some(carrier.to_string()),
                marketing_carrier: None,
                operating: None,
                number: Some(number.to_string()),
                duration: None,
                extra: Default::default(),
            })
            .collect();

        let mut offer = FlightOffer {
            id: None,
            itineraries: vec![Itinerary {
                duration: None,
                segments,
                extra: Default::default(),
            }],
            price: Some(OfferPrice {
                currency: Some("USD".to_string()),
                total: Some(grand_total.to_string()),
                base: None,
                grand_total: Some(grand_total.to_string()),
                total_taxes: None,
                fees: None,
                extra: Default::default(),
            }),
            uid: None,
            extra: Default::default(),
        };
        tag_fingerprint(&mut offer);
        offer
    }

    fn dictionary() -> HashMap<String, String> {
        HashMap::from([
            ("EK".to_string(), "EMIRATES".to_string()),
            ("QR".to_string(), "QATAR AIRWAYS".to_string()),
        ])
    }

    fn depart() -> NaiveDate {
        "2025-03-01".parse().unwrap()
    }

    #[test]
    fn test_interline_offer_lands_in_every_group() {
        let offers = vec![offer(&["EK", "QR"], "800.00", "101")];
        let grouped = group_by_carrier(&offers, &dictionary(), depart(), None);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["EK"].len(), 1);
        assert_eq!(grouped["QR"].len(), 1);
        assert_eq!(grouped["EK"][0].airline, "EMIRATES");
        assert_eq!(grouped["QR"][0].airline, "QATAR AIRWAYS");
    }

    #[test]
    fn test_operating_carrier_counts() {
        let mut o = offer(&["EK"], "800.00", "101");
        o.itineraries[0].segments[0].operating = Some(OperatingCarrier {
            carrier_code: Some("FZ".to_string()),
            extra: Default::default(),
        });
        let grouped = group_by_carrier(&[o], &dictionary(), depart(), None);

        assert!(grouped.contains_key("EK"));
        assert!(grouped.contains_key("FZ"));
        // No dictionary entry: the raw code stands in for the name.
        assert_eq!(grouped["FZ"][0].airline, "FZ");
    }

    #[test]
    fn test_groups_sorted_and_capped_at_five() {
        let offers: Vec<FlightOffer> = (0..7)
            .map(|i| offer(&["EK"], &format!("{}.00", 900 - i * 50), &format!("{}", 100 + i)))
            .collect();
        let grouped = group_by_carrier(&offers, &dictionary(), depart(), None);

        let group = &grouped["EK"];
        assert_eq!(group.len(), 5);
        let prices: Vec<i64> = group.iter().map(|entry| entry.price).collect();
        assert_eq!(prices, vec![600, 650, 700, 750, 800]);
    }

    #[test]
    fn test_flat_list_globally_sorted_with_duplicates() {
        let offers = vec![
            offer(&["EK", "QR"], "800.00", "101"),
            offer(&["EK"], "500.00", "102"),
        ];
        let grouped = group_by_carrier(&offers, &dictionary(), depart(), None);
        let results = flatten_ranked(&grouped);

        // The interline offer appears under both carriers; three rows total.
        assert_eq!(results.len(), 3);
        assert_eq!(
            results.iter().map(|entry| entry.price).collect::<Vec<_>>(),
            vec![500, 800, 800],
        );
    }

    #[test]
    fn test_rows_carry_fingerprint_and_dates() {
        let offers = vec![offer(&["EK"], "800.00", "101")];
        let ret: NaiveDate = "2025-03-10".parse().unwrap();
        let grouped = group_by_carrier(&offers, &dictionary(), depart(), Some(ret));

        let entry = &grouped["EK"][0];
        assert!(entry.offer_fingerprint.is_some());
        assert_eq!(entry.offer_fingerprint, entry.offer.uid);
        assert_eq!(entry.depart_date, depart());
        assert_eq!(entry.return_date, Some(ret));
    }
}
