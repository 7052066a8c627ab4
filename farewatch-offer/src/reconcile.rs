use crate::grouping::CarrierOffer;

/// Identifying projection of a watched flight, as stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchKeys<'a> {
    pub offer_id: Option<&'a str>,
    pub offer_fingerprint: Option<&'a str>,
    pub airline_code: Option<&'a str>,
}

/// Result of reconciling a watched flight against a fresh fetch.
#[derive(Debug)]
pub enum RefreshOutcome<'a> {
    /// The offer to record as the new price observation.
    Selected(&'a CarrierOffer),
    /// The fetch returned no offers; record nothing, fabricate nothing.
    Unavailable,
}

/// Pick the offer that represents a watched flight in a fresh fetch.
///
/// Precedence: supplier-id match, fingerprint match, carrier-code match,
/// then the cheapest offer. `fresh` is expected price-ascending (as produced
/// by the search pipeline), so "cheapest" is the first entry.
///
/// The final fallback can rebind the watch to an unrelated itinerary when
/// nothing identifying matches; that mirrors the shipped behavior and is
/// questionable as a product decision.
pub fn reconcile<'a>(watch: &WatchKeys<'_>, fresh: &'a [CarrierOffer]) -> RefreshOutcome<'a> {
    if fresh.is_empty() {
        return RefreshOutcome::Unavailable;
    }

    if let Some(stored_id) = watch.offer_id {
        let hit = fresh.iter().find(|entry| {
            entry.offer_id.as_deref() == Some(stored_id)
                || (watch.offer_fingerprint.is_some()
                    && entry.offer_fingerprint.as_deref() == watch.offer_fingerprint)
        });
        if let Some(entry) = hit {
            return RefreshOutcome::Selected(entry);
        }
    }

    if let Some(fingerprint) = watch.offer_fingerprint {
        if let Some(entry) = fresh
            .iter()
            .find(|entry| entry.offer_fingerprint.as_deref() == Some(fingerprint))
        {
            return RefreshOutcome::Selected(entry);
        }
    }

    if let Some(code) = watch.airline_code {
        if let Some(entry) = fresh
            .iter()
            .find(|entry| entry.code.eq_ignore_ascii_case(code))
        {
            return RefreshOutcome::Selected(entry);
        }
    }

    RefreshOutcome::Selected(&fresh[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use farewatch_core::details::OfferDetails;
    use farewatch_core::offer::FlightOffer;

    fn entry(code: &str, price: i64, id: Option<&str>, fingerprint: Option<&str>) -> CarrierOffer {
        CarrierOffer {
            airline: code.to_string(),
            code: code.to_string(),
            price,
            currency: "USD".to_string(),
            details: OfferDetails {
                price,
                currency: "USD".to_string(),
                base: 0.0,
                grand_total: price as f64,
                taxes: 0.0,
                itineraries: Vec::new(),
            },
            offer: FlightOffer {
                id: id.map(str::to_string),
                itineraries: Vec::new(),
                price: None,
                uid: fingerprint.map(str::to_string),
                extra: Default::default(),
            },
            offer_id: id.map(str::to_string),
            offer_fingerprint: fingerprint.map(str::to_string),
            depart_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            return_date: None,
        }
    }

    fn selected<'a>(outcome: RefreshOutcome<'a>) -> &'a CarrierOffer {
        match outcome {
            RefreshOutcome::Selected(entry) => entry,
            RefreshOutcome::Unavailable => panic!("expected a selection"),
        }
    }

    #[test]
    fn test_fingerprint_match_beats_cheaper_offers() {
        // Watched fingerprint F1; fresh fetch F2/F1/F3 at 500/650/300 must
        // select the F1 offer at 650, not the cheapest.
        let fresh = vec![
            entry("QR", 300, None, Some("F3")),
            entry("EK", 500, None, Some("F2")),
            entry("EK", 650, None, Some("F1")),
        ];
        let watch = WatchKeys {
            offer_fingerprint: Some("F1"),
            ..Default::default()
        };
        let best = selected(reconcile(&watch, &fresh));
        assert_eq!(best.price, 650);
        assert_eq!(best.offer_fingerprint.as_deref(), Some("F1"));
    }

    #[test]
    fn test_empty_fetch_is_unavailable() {
        let watch = WatchKeys {
            offer_fingerprint: Some("F1"),
            ..Default::default()
        };
        assert!(matches!(
            reconcile(&watch, &[]),
            RefreshOutcome::Unavailable
        ));
    }

    #[test]
    fn test_supplier_id_checked_first() {
        let fresh = vec![
            entry("EK", 400, Some("other"), Some("F9")),
            entry("EK", 700, Some("stored"), Some("F8")),
        ];
        let watch = WatchKeys {
            offer_id: Some("stored"),
            offer_fingerprint: Some("F1"),
            ..Default::default()
        };
        assert_eq!(selected(reconcile(&watch, &fresh)).price, 700);
    }

    #[test]
    fn test_id_step_accepts_fingerprint_alias() {
        // With a stored id, a fingerprint hit satisfies the first step too.
        let fresh = vec![
            entry("EK", 400, Some("other"), Some("F2")),
            entry("EK", 700, Some("another"), Some("F1")),
        ];
        let watch = WatchKeys {
            offer_id: Some("stored"),
            offer_fingerprint: Some("F1"),
            ..Default::default()
        };
        assert_eq!(selected(reconcile(&watch, &fresh)).price, 700);
    }

    #[test]
    fn test_carrier_code_fallback() {
        let fresh = vec![
            entry("QR", 300, None, Some("F3")),
            entry("EK", 500, None, Some("F2")),
        ];
        let watch = WatchKeys {
            airline_code: Some("ek"),
            ..Default::default()
        };
        assert_eq!(selected(reconcile(&watch, &fresh)).code, "EK");
    }

    #[test]
    fn test_cheapest_fallback_when_nothing_matches() {
        let fresh = vec![
            entry("QR", 300, None, Some("F3")),
            entry("EK", 500, None, Some("F2")),
        ];
        let watch = WatchKeys {
            offer_fingerprint: Some("F1"),
            airline_code: Some("BA"),
            ..Default::default()
        };
        assert_eq!(selected(reconcile(&watch, &fresh)).price, 300);
    }
}
