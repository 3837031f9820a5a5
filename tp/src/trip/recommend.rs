//! Recommendation ranking
//!
//! Flights rank by lowest price. Hotels rank by highest rating, then lowest
//! nightly price. Remaining ties go to the earliest entry.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::domain::{FlightResult, HotelResult};

/// Cheapest flight
pub fn recommend_flight(flights: &[FlightResult]) -> Option<&str> {
    flights
        .iter()
        .reduce(|best, flight| {
            if flight.price.total_cmp(&best.price).is_lt() {
                flight
            } else {
                best
            }
        })
        .map(|flight| flight.id.as_str())
}

/// Best-rated hotel, cheapest among equals
pub fn recommend_hotel(hotels: &[HotelResult]) -> Option<&str> {
    hotels
        .iter()
        .reduce(|best, hotel| match hotel.rating.total_cmp(&best.rating) {
            Ordering::Greater => hotel,
            Ordering::Equal if hotel.price_per_night.total_cmp(&best.price_per_night).is_lt() => hotel,
            _ => best,
        })
        .map(|hotel| hotel.id.as_str())
}

/// Run `pick` over every keyed group, dropping empty groups
pub fn recommend_by_key<T>(
    groups: &BTreeMap<String, Vec<T>>,
    pick: impl Fn(&[T]) -> Option<&str>,
) -> BTreeMap<String, String> {
    groups
        .iter()
        .filter_map(|(key, items)| pick(items).map(|id| (key.clone(), id.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommend_flight_cheapest() {
        let flights = vec![FlightResult::new("a", 500.0), FlightResult::new("b", 300.0)];
        assert_eq!(recommend_flight(&flights), Some("b"));
    }

    #[test]
    fn test_recommend_flight_tie_keeps_first() {
        let flights = vec![
            FlightResult::new("a", 500.0),
            FlightResult::new("b", 300.0),
            FlightResult::new("c", 300.0),
        ];
        assert_eq!(recommend_flight(&flights), Some("b"));
    }

    #[test]
    fn test_recommend_hotel_rating_then_price() {
        let hotels = vec![
            HotelResult::new("x", 4.5, 200.0),
            HotelResult::new("y", 4.5, 150.0),
        ];
        assert_eq!(recommend_hotel(&hotels), Some("y"));

        let hotels = vec![
            HotelResult::new("cheap", 3.0, 50.0),
            HotelResult::new("best", 4.8, 400.0),
            HotelResult::new("mid", 4.0, 120.0),
        ];
        assert_eq!(recommend_hotel(&hotels), Some("best"));
    }

    #[test]
    fn test_recommend_hotel_full_tie_keeps_first() {
        let hotels = vec![
            HotelResult::new("first", 4.0, 100.0),
            HotelResult::new("second", 4.0, 100.0),
        ];
        assert_eq!(recommend_hotel(&hotels), Some("first"));
    }

    #[test]
    fn test_recommend_empty() {
        assert_eq!(recommend_flight(&[]), None);
        assert_eq!(recommend_hotel(&[]), None);
    }

    #[test]
    fn test_recommend_by_key() {
        let groups = BTreeMap::from([
            (
                "leg_1".to_string(),
                vec![FlightResult::new("f1", 300.0), FlightResult::new("f2", 200.0)],
            ),
            ("leg_2".to_string(), vec![]),
        ]);

        let picks = recommend_by_key(&groups, recommend_flight);
        assert_eq!(picks.len(), 1);
        assert_eq!(picks.get("leg_1").map(String::as_str), Some("f2"));
    }
}
