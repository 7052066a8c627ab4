use std::collections::HashMap;

use chrono::Duration;

use farewatch_core::fingerprint::tag_fingerprint;
use farewatch_core::offer::FlightOffer;
use farewatch_core::supplier::{FlightSupplier, SearchQuery, SearchResponse};

/// Result of a flexible-date search sweep.
///
/// `degraded` is set when at least one attempt errored, so callers can tell
/// "no offers exist for these dates" apart from "an attempt failed".
#[derive(Debug, Default)]
pub struct FlexSearch {
    pub offers: Vec<FlightOffer>,
    pub carriers: HashMap<String, String>,
    pub degraded: bool,
}

impl FlexSearch {
    fn found(response: SearchResponse, degraded: bool) -> Self {
        let SearchResponse {
            mut offers,
            carriers,
        } = response;
        // Contract: every offer leaves this function fingerprinted, whatever
        // the supplier did.
        for offer in &mut offers {
            if offer.uid.is_none() {
                tag_fingerprint(offer);
            }
        }
        Self {
            offers,
            carriers,
            degraded,
        }
    }

    fn empty(degraded: bool) -> Self {
        Self {
            degraded,
            ..Default::default()
        }
    }
}

/// Search exact dates first; when that yields nothing, sweep the four
/// +/-`flex_days` combinations over depart and return date in fixed order
/// and return the first combination that produces offers.
///
/// Attempt failures are logged and downgraded; they never fail the sweep.
/// Offers are never merged across combinations.
pub async fn search_with_flex(
    supplier: &dyn FlightSupplier,
    query: &SearchQuery,
    flex_days: i64,
) -> FlexSearch {
    let mut degraded = false;

    match supplier.search(query).await {
        Ok(response) if !response.offers.is_empty() => {
            return FlexSearch::found(response, false);
        }
        Ok(_) => {}
        Err(error) => {
            tracing::warn!(%error, "exact-date search failed");
            degraded = true;
        }
    }

    tracing::info!(flex_days, "no offers for exact dates, trying flexible dates");

    for depart_offset in [-flex_days, flex_days] {
        for return_offset in [-flex_days, flex_days] {
            let attempt = SearchQuery {
                depart_date: query.depart_date + Duration::days(depart_offset),
                return_date: query
                    .return_date
                    .map(|d| d + Duration::days(return_offset)),
                ..query.clone()
            };

            tracing::debug!(
                depart = %attempt.depart_date,
                return_date = ?attempt.return_date,
                "flexible-date attempt",
            );

            match supplier.search(&attempt).await {
                Ok(response) if !response.offers.is_empty() => {
                    tracing::info!(
                        depart = %attempt.depart_date,
                        count = response.offers.len(),
                        "flexible dates produced offers",
                    );
                    return FlexSearch::found(response, degraded);
                }
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!(%error, "flexible-date attempt failed");
                    degraded = true;
                }
            }
        }
    }

    tracing::info!("no offers found after flexible-date attempts");
    FlexSearch::empty(degraded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use farewatch_core::offer::{Itinerary, OfferPrice, Segment, SegmentEndpoint};
    use farewatch_core::supplier::SupplierError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn query() -> SearchQuery {
        SearchQuery {
            origin: "CLT".to_string(),
            destination: "DXB".to_string(),
            depart_date: date("2025-03-01"),
            return_date: Some(date("2025-03-10")),
            adults: 1,
            airline: None,
        }
    }

    fn one_offer() -> FlightOffer {
        FlightOffer {
            id: None,
            itineraries: vec![Itinerary {
                duration: None,
                segments: vec![Segment {
                    departure: Some(SegmentEndpoint {
                        iata_code: Some("CLT".to_string()),
                        terminal: None,
                        at: Some("2025-03-01T08:00".to_string()),
                        extra: Default::default(),
                    }),
                    arrival: Some(SegmentEndpoint {
                        iata_code: Some("DXB".to_string()),
                        terminal: None,
                        at: Some("2025-03-02T06:00".to_string()),
                        extra: Default::default(),
                    }),
                    carrier_code: Some("EK".to_string()),
                    marketing_carrier: None,
                    operating: None,
                    number: Some("202".to_string()),
                    duration: None,
                    extra: Default::default(),
                }],
                extra: Default::default(),
            }],
            price: Some(OfferPrice {
                currency: Some("USD".to_string()),
                total: Some("800.00".to_string()),
                base: None,
                grand_total: Some("800.00".to_string()),
                total_taxes: None,
                fees: None,
                extra: Default::default(),
            }),
            uid: None,
            extra: Default::default(),
        }
    }

    /// Scripted supplier: one canned response per call, recorded in order.
    struct ScriptedSupplier {
        calls: AtomicUsize,
        seen: Mutex<Vec<(NaiveDate, Option<NaiveDate>)>>,
        script: Vec<Result<Vec<FlightOffer>, ()>>,
    }

    impl ScriptedSupplier {
        fn new(script: Vec<Result<Vec<FlightOffer>, ()>>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                script,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FlightSupplier for ScriptedSupplier {
        async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SupplierError> {
            let index = self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen
                .lock()
                .unwrap()
                .push((query.depart_date, query.return_date));
            match self.script.get(index) {
                Some(Ok(offers)) => Ok(SearchResponse {
                    offers: offers.clone(),
                    carriers: HashMap::from([("EK".to_string(), "EMIRATES".to_string())]),
                }),
                Some(Err(())) => Err(SupplierError::Status { status: 500 }),
                None => Ok(SearchResponse::default()),
            }
        }
    }

    #[tokio::test]
    async fn test_exact_hit_makes_single_call() {
        let supplier = ScriptedSupplier::new(vec![Ok(vec![one_offer()])]);
        let result = search_with_flex(&supplier, &query(), 1).await;

        assert_eq!(supplier.call_count(), 1);
        assert_eq!(result.offers.len(), 1);
        assert!(!result.degraded);
        assert!(result.offers[0].uid.is_some());
    }

    #[tokio::test]
    async fn test_flex_sweep_order_and_early_return() {
        // Exact empty, first three combinations empty, fourth hits.
        let supplier = ScriptedSupplier::new(vec![
            Ok(vec![]),
            Ok(vec![]),
            Ok(vec![]),
            Ok(vec![]),
            Ok(vec![one_offer()]),
        ]);
        let result = search_with_flex(&supplier, &query(), 1).await;

        assert_eq!(supplier.call_count(), 5);
        assert_eq!(result.offers.len(), 1);

        let seen = supplier.seen.lock().unwrap();
        let expected = vec![
            (date("2025-03-01"), Some(date("2025-03-10"))),
            (date("2025-02-28"), Some(date("2025-03-09"))),
            (date("2025-02-28"), Some(date("2025-03-11"))),
            (date("2025-03-02"), Some(date("2025-03-09"))),
            (date("2025-03-02"), Some(date("2025-03-11"))),
        ];
        assert_eq!(*seen, expected);
    }

    #[tokio::test]
    async fn test_flex_stops_at_first_hit() {
        let supplier = ScriptedSupplier::new(vec![Ok(vec![]), Ok(vec![one_offer()])]);
        let result = search_with_flex(&supplier, &query(), 1).await;

        // Exact miss plus one flex hit; the remaining three combinations are
        // never attempted.
        assert_eq!(supplier.call_count(), 2);
        assert_eq!(result.offers.len(), 1);
    }

    #[tokio::test]
    async fn test_all_empty_returns_empty_not_degraded() {
        let supplier = ScriptedSupplier::new(vec![]);
        let result = search_with_flex(&supplier, &query(), 1).await;

        assert_eq!(supplier.call_count(), 5);
        assert!(result.offers.is_empty());
        assert!(result.carriers.is_empty());
        assert!(!result.degraded);
    }

    #[tokio::test]
    async fn test_errors_mark_degraded_but_do_not_abort() {
        let supplier = ScriptedSupplier::new(vec![
            Err(()),
            Err(()),
            Ok(vec![]),
            Ok(vec![one_offer()]),
        ]);
        let result = search_with_flex(&supplier, &query(), 1).await;

        assert_eq!(supplier.call_count(), 4);
        assert_eq!(result.offers.len(), 1);
        assert!(result.degraded);
    }

    #[tokio::test]
    async fn test_one_way_query_keeps_return_absent() {
        let supplier = ScriptedSupplier::new(vec![]);
        let mut q = query();
        q.return_date = None;
        search_with_flex(&supplier, &q, 1).await;

        let seen = supplier.seen.lock().unwrap();
        assert_eq!(seen.len(), 5);
        assert!(seen.iter().all(|(_, ret)| ret.is_none()));
    }

    #[tokio::test]
    async fn test_flex_days_scales_offsets() {
        let supplier = ScriptedSupplier::new(vec![Ok(vec![]), Ok(vec![one_offer()])]);
        search_with_flex(&supplier, &query(), 2).await;

        let seen = supplier.seen.lock().unwrap();
        assert_eq!(seen[1], (date("2025-02-27"), Some(date("2025-03-08"))));
    }
}
