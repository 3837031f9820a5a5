//! Trip domain types
//!
//! A trip is either a single round trip (one city pair plus a return date,
//! modelled as exactly two legs) or a multi-city trip of up to four
//! user-entered legs that must close back at the first origin.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Maximum number of legs in a multi-city trip
pub const MAX_LEGS: usize = 4;

/// Minimum number of legs in a multi-city trip (out and back)
pub const MIN_MULTI_LEGS: usize = 2;

/// Selection slot key for a leg, e.g. `leg_2`
pub fn leg_key(leg_number: u32) -> String {
    format!("leg_{leg_number}")
}

/// Whether two city names refer to the same city, ignoring case and
/// surrounding whitespace
pub fn same_city(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Errors raised before any network call when trip input is malformed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Return date {return_date} is before departure date {departure_date}")]
    ReturnBeforeDeparture {
        departure_date: NaiveDate,
        return_date: NaiveDate,
    },

    #[error("A multi-city trip needs at least 2 legs, got {0}")]
    TooFewLegs(usize),

    #[error("A multi-city trip supports at most 4 legs")]
    TooManyLegs,

    #[error("Leg {position} is numbered {leg_number}; legs must be numbered 1, 2, 3... in order")]
    LegNumbering { position: usize, leg_number: u32 },

    #[error("Trip does not return to its origin: last leg ends in {destination}, trip starts in {origin}")]
    NotClosed { origin: String, destination: String },

    #[error("City {0} appears more than once as a stopover")]
    RepeatedStopover(String),

    #[error("An active subscription is required to add more than one leg")]
    SubscriptionRequired,
}

/// Trip shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripType {
    Single,
    Multi,
}

impl std::fmt::Display for TripType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Multi => write!(f, "multi"),
        }
    }
}

/// One origin -> destination segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripLeg {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    /// 1-based position in the trip
    pub leg_number: u32,
}

impl TripLeg {
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        departure_date: NaiveDate,
        leg_number: u32,
    ) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            departure_date,
            leg_number,
        }
    }

    /// Selection slot key for this leg
    pub fn key(&self) -> String {
        leg_key(self.leg_number)
    }
}

/// A hotel stay implied by the leg sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotelStay {
    pub city: String,
    pub checkin_date: NaiveDate,
    pub checkout_date: NaiveDate,
}

impl HotelStay {
    /// Nights between check-in and check-out, never less than one
    pub fn nights(&self) -> u32 {
        let days = (self.checkout_date - self.checkin_date).num_days();
        u32::try_from(days).unwrap_or(0).max(1)
    }
}

/// Round trip between one city pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleTrip {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
    pub budget: f64,
    pub passengers: u32,
}

/// Multi-city trip; the legs close back at the first origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiCityTrip {
    pub legs: Vec<TripLeg>,
    pub budget: f64,
    pub passengers: u32,
}

/// Everything the user asked for, discriminated by trip type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "trip_type", rename_all = "lowercase")]
pub enum TripDetails {
    Single(SingleTrip),
    Multi(MultiCityTrip),
}

impl TripDetails {
    pub fn trip_type(&self) -> TripType {
        match self {
            TripDetails::Single(_) => TripType::Single,
            TripDetails::Multi(_) => TripType::Multi,
        }
    }

    pub fn budget(&self) -> f64 {
        match self {
            TripDetails::Single(trip) => trip.budget,
            TripDetails::Multi(trip) => trip.budget,
        }
    }

    pub fn passengers(&self) -> u32 {
        match self {
            TripDetails::Single(trip) => trip.passengers,
            TripDetails::Multi(trip) => trip.passengers,
        }
    }

    /// Leg sequence; a round trip is outbound plus return
    pub fn legs(&self) -> Vec<TripLeg> {
        match self {
            TripDetails::Single(trip) => vec![
                TripLeg::new(&trip.origin, &trip.destination, trip.departure_date, 1),
                TripLeg::new(&trip.destination, &trip.origin, trip.return_date, 2),
            ],
            TripDetails::Multi(trip) => trip.legs.clone(),
        }
    }

    pub fn leg_count(&self) -> usize {
        match self {
            TripDetails::Single(_) => 2,
            TripDetails::Multi(trip) => trip.legs.len(),
        }
    }

    /// Leg keys in trip order
    pub fn leg_keys(&self) -> Vec<String> {
        self.legs().iter().map(TripLeg::key).collect()
    }

    /// Hotel stays implied by the trip
    ///
    /// A round trip stays at the destination from departure to return. A
    /// multi-city trip stays at every leg's destination except the last one,
    /// which is the origin.
    pub fn hotel_stays(&self) -> Vec<HotelStay> {
        match self {
            TripDetails::Single(trip) => vec![HotelStay {
                city: trip.destination.clone(),
                checkin_date: trip.departure_date,
                checkout_date: trip.return_date,
            }],
            TripDetails::Multi(trip) => trip
                .legs
                .windows(2)
                .map(|pair| HotelStay {
                    city: pair[0].destination.clone(),
                    checkin_date: pair[0].departure_date,
                    checkout_date: pair[1].departure_date,
                })
                .collect(),
        }
    }

    /// Canonical stopover city name for `city`, matched case-insensitively
    pub fn stopover(&self, city: &str) -> Option<String> {
        self.hotel_stays()
            .into_iter()
            .map(|stay| stay.city)
            .find(|c| same_city(c, city))
    }

    /// Check the trip is complete and well formed
    pub fn validate(&self) -> Result<(), ValidationError> {
        debug!(trip_type = %self.trip_type(), "validate: called");
        match self {
            TripDetails::Single(trip) => {
                require("origin", &trip.origin)?;
                require("destination", &trip.destination)?;
                if trip.passengers == 0 {
                    return Err(ValidationError::MissingField("passengers"));
                }
                if trip.return_date < trip.departure_date {
                    return Err(ValidationError::ReturnBeforeDeparture {
                        departure_date: trip.departure_date,
                        return_date: trip.return_date,
                    });
                }
                Ok(())
            }
            TripDetails::Multi(trip) => {
                if trip.passengers == 0 {
                    return Err(ValidationError::MissingField("passengers"));
                }
                if trip.legs.len() < MIN_MULTI_LEGS {
                    return Err(ValidationError::TooFewLegs(trip.legs.len()));
                }
                if trip.legs.len() > MAX_LEGS {
                    return Err(ValidationError::TooManyLegs);
                }
                for (i, leg) in trip.legs.iter().enumerate() {
                    require("origin", &leg.origin)?;
                    require("destination", &leg.destination)?;
                    // Leg keys are built from the number, so it must match the position
                    if leg.leg_number as usize != i + 1 {
                        return Err(ValidationError::LegNumbering {
                            position: i + 1,
                            leg_number: leg.leg_number,
                        });
                    }
                }

                // Non-empty by the length check above
                let origin = &trip.legs[0].origin;
                let destination = &trip.legs[trip.legs.len() - 1].destination;
                if !same_city(origin, destination) {
                    debug!(%origin, %destination, "validate: chain not closed");
                    return Err(ValidationError::NotClosed {
                        origin: origin.clone(),
                        destination: destination.clone(),
                    });
                }

                // Hotel selections are keyed by city, so stopovers must be distinct
                let stays = self.hotel_stays();
                for (i, stay) in stays.iter().enumerate() {
                    if stays[..i].iter().any(|s| same_city(&s.city, &stay.city)) {
                        return Err(ValidationError::RepeatedStopover(stay.city.clone()));
                    }
                }
                Ok(())
            }
        }
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

/// Incremental multi-city form; legs are numbered as they are added
#[derive(Debug, Clone, Default)]
pub struct MultiCityForm {
    legs: Vec<TripLeg>,
}

impl MultiCityForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a leg
    ///
    /// Any leg past the first needs an active subscription.
    pub fn add_leg(
        &mut self,
        origin: impl Into<String>,
        destination: impl Into<String>,
        departure_date: NaiveDate,
        has_subscription: bool,
    ) -> Result<&TripLeg, ValidationError> {
        debug!(leg_count = self.legs.len(), %has_subscription, "add_leg: called");
        if !self.legs.is_empty() && !has_subscription {
            return Err(ValidationError::SubscriptionRequired);
        }
        if self.legs.len() >= MAX_LEGS {
            return Err(ValidationError::TooManyLegs);
        }
        let leg_number = self.legs.len() as u32 + 1;
        self.legs
            .push(TripLeg::new(origin, destination, departure_date, leg_number));
        Ok(&self.legs[self.legs.len() - 1])
    }

    pub fn legs(&self) -> &[TripLeg] {
        &self.legs
    }

    /// Finish the form into validated trip details
    pub fn build(self, budget: f64, passengers: u32) -> Result<TripDetails, ValidationError> {
        let details = TripDetails::Multi(MultiCityTrip {
            legs: self.legs,
            budget,
            passengers,
        });
        details.validate()?;
        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn round_trip() -> TripDetails {
        TripDetails::Single(SingleTrip {
            origin: "New York".to_string(),
            destination: "Los Angeles".to_string(),
            departure_date: date("2025-12-10"),
            return_date: date("2025-12-15"),
            budget: 2000.0,
            passengers: 1,
        })
    }

    fn three_city() -> TripDetails {
        TripDetails::Multi(MultiCityTrip {
            legs: vec![
                TripLeg::new("New York", "Los Angeles", date("2025-01-15"), 1),
                TripLeg::new("Los Angeles", "San Francisco", date("2025-01-18"), 2),
                TripLeg::new("San Francisco", "new york", date("2025-01-22"), 3),
            ],
            budget: 5000.0,
            passengers: 2,
        })
    }

    #[test]
    fn test_round_trip_is_two_legs() {
        let details = round_trip();
        let legs = details.legs();
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[1].origin, "Los Angeles");
        assert_eq!(legs[1].destination, "New York");
        assert_eq!(legs[1].departure_date, date("2025-12-15"));
        assert_eq!(details.leg_keys(), vec!["leg_1", "leg_2"]);
    }

    #[test]
    fn test_multi_city_hotel_stays_skip_origin() {
        let stays = three_city().hotel_stays();
        assert_eq!(stays.len(), 2);
        assert_eq!(stays[0].city, "Los Angeles");
        assert_eq!(stays[0].checkout_date, date("2025-01-18"));
        assert_eq!(stays[1].city, "San Francisco");
        assert_eq!(stays[1].nights(), 4);
    }

    #[test]
    fn test_closure_is_case_insensitive() {
        assert!(three_city().validate().is_ok());
    }

    #[test]
    fn test_open_chain_rejected() {
        let details = TripDetails::Multi(MultiCityTrip {
            legs: vec![
                TripLeg::new("New York", "Los Angeles", date("2025-01-15"), 1),
                TripLeg::new("Los Angeles", "San Francisco", date("2025-01-18"), 2),
            ],
            budget: 1000.0,
            passengers: 1,
        });
        assert!(matches!(details.validate(), Err(ValidationError::NotClosed { .. })));
    }

    #[test]
    fn test_closure_folds_non_ascii_case() {
        let details = TripDetails::Multi(MultiCityTrip {
            legs: vec![
                TripLeg::new("Zürich", "São Paulo", date("2025-03-01"), 1),
                TripLeg::new("SÃO PAULO", "ZÜRICH ", date("2025-03-06"), 2),
            ],
            budget: 4000.0,
            passengers: 1,
        });
        assert_eq!(details.validate(), Ok(()));
        assert_eq!(details.stopover("são paulo"), Some("São Paulo".to_string()));
        assert!(same_city("Zürich", " zürich"));
        assert!(!same_city("Zürich", "Zurich"));
    }

    #[test]
    fn test_leg_numbers_must_follow_position() {
        let legs = vec![
            TripLeg::new("New York", "Chicago", date("2025-06-01"), 1),
            TripLeg::new("Chicago", "Denver", date("2025-06-04"), 1),
            TripLeg::new("Denver", "New York", date("2025-06-08"), 1),
        ];
        let details = TripDetails::Multi(MultiCityTrip {
            legs,
            budget: 5000.0,
            passengers: 1,
        });
        assert_eq!(
            details.validate(),
            Err(ValidationError::LegNumbering {
                position: 2,
                leg_number: 1
            })
        );

        let zero_based = TripDetails::Multi(MultiCityTrip {
            legs: vec![
                TripLeg::new("A", "B", date("2025-06-01"), 0),
                TripLeg::new("B", "A", date("2025-06-04"), 1),
            ],
            budget: 1000.0,
            passengers: 1,
        });
        assert!(matches!(
            zero_based.validate(),
            Err(ValidationError::LegNumbering { position: 1, leg_number: 0 })
        ));
    }

    #[test]
    fn test_repeated_stopover_rejected() {
        let details = TripDetails::Multi(MultiCityTrip {
            legs: vec![
                TripLeg::new("A", "B", date("2025-01-01"), 1),
                TripLeg::new("B", "C", date("2025-01-03"), 2),
                TripLeg::new("C", "b", date("2025-01-05"), 3),
                TripLeg::new("B", "A", date("2025-01-07"), 4),
            ],
            budget: 1000.0,
            passengers: 1,
        });
        assert_eq!(
            details.validate(),
            Err(ValidationError::RepeatedStopover("b".to_string()))
        );
    }

    #[test]
    fn test_single_trip_validation() {
        let mut details = round_trip();
        assert!(details.validate().is_ok());

        if let TripDetails::Single(trip) = &mut details {
            trip.return_date = date("2025-12-01");
        }
        assert!(matches!(
            details.validate(),
            Err(ValidationError::ReturnBeforeDeparture { .. })
        ));

        if let TripDetails::Single(trip) = &mut details {
            trip.return_date = date("2025-12-20");
            trip.origin = "  ".to_string();
        }
        assert_eq!(details.validate(), Err(ValidationError::MissingField("origin")));
    }

    #[test]
    fn test_form_requires_subscription_for_second_leg() {
        let mut form = MultiCityForm::new();
        form.add_leg("New York", "Chicago", date("2025-01-01"), false).unwrap();
        assert_eq!(
            form.add_leg("Chicago", "New York", date("2025-01-04"), false),
            Err(ValidationError::SubscriptionRequired)
        );
        assert_eq!(form.legs().len(), 1);
    }

    #[test]
    fn test_form_caps_legs_and_numbers_them() {
        let mut form = MultiCityForm::new();
        for (i, (from, to)) in [("A", "B"), ("B", "C"), ("C", "D"), ("D", "A")].iter().enumerate() {
            let leg = form.add_leg(*from, *to, date("2025-01-01"), true).unwrap();
            assert_eq!(leg.leg_number as usize, i + 1);
        }
        assert_eq!(
            form.add_leg("A", "E", date("2025-01-09"), true),
            Err(ValidationError::TooManyLegs)
        );

        let details = form.build(3000.0, 1).unwrap();
        assert_eq!(details.leg_keys(), vec!["leg_1", "leg_2", "leg_3", "leg_4"]);
    }

    #[test]
    fn test_stopover_lookup() {
        let details = three_city();
        assert_eq!(details.stopover("los angeles"), Some("Los Angeles".to_string()));
        assert_eq!(details.stopover("New York"), None);
    }

    #[test]
    fn test_details_serde_tag() {
        let value = serde_json::to_value(round_trip()).unwrap();
        assert_eq!(value["trip_type"], "single");
        assert_eq!(value["departure_date"], "2025-12-10");
        let back: TripDetails = serde_json::from_value(value).unwrap();
        assert_eq!(back, round_trip());
    }
}
