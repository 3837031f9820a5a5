//! Canonical client state for one trip
//!
//! Results arrive in one of two shapes: a flat list for a round trip, or a
//! mapping keyed by leg (flights) or city (hotels) for a multi-city trip.
//! [`TripState::apply_flights`] and [`TripState::apply_hotels`] dispatch on
//! the shape that actually arrived and only ever replace the matching slot.

use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::api::BookingRequest;
use crate::domain::{FlightResult, HotelResult, ResultSet, TripDetails, WorkflowStep, same_city};

use super::completion;
use super::recommend::{recommend_by_key, recommend_flight, recommend_hotel};

/// Errors from applying a selection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("No trip is being planned")]
    NoActiveTrip,

    #[error("Multi-city selections need a {0}")]
    MissingKey(&'static str),

    #[error("Trip has no leg '{0}'")]
    UnknownLeg(String),

    #[error("Trip has no stopover in '{0}'")]
    UnknownCity(String),

    #[error("'{0}' is not among the loaded results")]
    NotInResults(String),
}

/// Chosen flights and hotels
///
/// Round trips use `flight`/`hotel`; multi-city trips use the keyed maps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub flight: Option<FlightResult>,
    pub hotel: Option<HotelResult>,
    pub flights_by_leg: BTreeMap<String, FlightResult>,
    pub hotels_by_city: BTreeMap<String, HotelResult>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.flight.is_none()
            && self.hotel.is_none()
            && self.flights_by_leg.is_empty()
            && self.hotels_by_city.is_empty()
    }

    /// Store a flight; `None` is the round-trip slot
    fn put_flight(&mut self, leg_key: Option<String>, flight: FlightResult) {
        match leg_key {
            Some(key) => {
                self.flights_by_leg.insert(key, flight);
            }
            None => self.flight = Some(flight),
        }
    }

    /// Store a hotel; `None` is the round-trip slot
    fn put_hotel(&mut self, city: Option<String>, hotel: HotelResult) {
        match city {
            Some(city) => {
                self.hotels_by_city.insert(city, hotel);
            }
            None => self.hotel = Some(hotel),
        }
    }
}

/// Selection slot for a flight: `None` for a round trip, else a known leg key
fn flight_slot(details: &TripDetails, leg_key: Option<&str>) -> Result<Option<String>, SelectionError> {
    match details {
        TripDetails::Single(_) => Ok(None),
        TripDetails::Multi(_) => {
            let key = leg_key.ok_or(SelectionError::MissingKey("leg key"))?;
            if !details.leg_keys().iter().any(|k| k == key) {
                return Err(SelectionError::UnknownLeg(key.to_string()));
            }
            Ok(Some(key.to_string()))
        }
    }
}

/// Selection slot for a hotel: `None` for a round trip, else the canonical stopover name
fn hotel_slot(details: &TripDetails, city: Option<&str>) -> Result<Option<String>, SelectionError> {
    match details {
        TripDetails::Single(_) => Ok(None),
        TripDetails::Multi(_) => {
            let city = city.ok_or(SelectionError::MissingKey("city"))?;
            details
                .stopover(city)
                .map(Some)
                .ok_or_else(|| SelectionError::UnknownCity(city.to_string()))
        }
    }
}

/// Recommended result ids, computed once per result set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recommendations {
    pub flight: Option<String>,
    pub hotel: Option<String>,
    pub flights_by_leg: BTreeMap<String, String>,
    pub hotels_by_city: BTreeMap<String, String>,
}

/// All state for the trip being planned
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripState {
    details: Option<TripDetails>,
    plan: Option<String>,
    steps: Vec<WorkflowStep>,
    flights: Vec<FlightResult>,
    hotels: Vec<HotelResult>,
    flights_by_leg: BTreeMap<String, Vec<FlightResult>>,
    hotels_by_city: BTreeMap<String, Vec<HotelResult>>,
    selection: Selection,
    recommendations: Recommendations,
}

impl TripState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh trip; nothing from a previous trip survives
    pub fn begin(&mut self, details: TripDetails) {
        debug!(trip_type = %details.trip_type(), "begin: called");
        *self = Self {
            details: Some(details),
            ..Self::default()
        };
    }

    /// Clear everything back to the empty state
    pub fn reset(&mut self) {
        debug!("reset: called");
        *self = Self::default();
    }

    pub fn details(&self) -> Option<&TripDetails> {
        self.details.as_ref()
    }

    pub fn plan(&self) -> Option<&str> {
        self.plan.as_deref()
    }

    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    pub fn flights(&self) -> &[FlightResult] {
        &self.flights
    }

    pub fn hotels(&self) -> &[HotelResult] {
        &self.hotels
    }

    pub fn flights_by_leg(&self) -> &BTreeMap<String, Vec<FlightResult>> {
        &self.flights_by_leg
    }

    pub fn hotels_by_city(&self) -> &BTreeMap<String, Vec<HotelResult>> {
        &self.hotels_by_city
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn recommendations(&self) -> &Recommendations {
        &self.recommendations
    }

    /// Append one workflow step
    pub fn record_step(&mut self, step: WorkflowStep) {
        self.steps.push(step);
    }

    /// Replace the step log wholesale, used when the plan came back in one piece
    pub fn replace_steps(&mut self, steps: Vec<WorkflowStep>) {
        self.steps = steps;
    }

    pub fn set_plan(&mut self, plan: impl Into<String>) {
        self.plan = Some(plan.into());
    }

    /// Whether any result set is populated
    pub fn has_results(&self) -> bool {
        !(self.flights.is_empty()
            && self.hotels.is_empty()
            && self.flights_by_leg.is_empty()
            && self.hotels_by_city.is_empty())
    }

    /// Ingest flight results into the slot matching their shape
    pub fn apply_flights(&mut self, results: ResultSet<FlightResult>) {
        match results {
            ResultSet::List(flights) => {
                debug!(count = flights.len(), "apply_flights: list");
                self.recommendations.flight = recommend_flight(&flights).map(str::to_string);
                self.flights = flights;
            }
            ResultSet::ByKey(flights) => {
                debug!(legs = flights.len(), "apply_flights: keyed by leg");
                self.recommendations.flights_by_leg = recommend_by_key(&flights, recommend_flight);
                self.flights_by_leg = flights;
            }
        }
    }

    /// Ingest hotel results into the slot matching their shape
    pub fn apply_hotels(&mut self, results: ResultSet<HotelResult>) {
        match results {
            ResultSet::List(hotels) => {
                debug!(count = hotels.len(), "apply_hotels: list");
                self.recommendations.hotel = recommend_hotel(&hotels).map(str::to_string);
                self.hotels = hotels;
            }
            ResultSet::ByKey(hotels) => {
                debug!(cities = hotels.len(), "apply_hotels: keyed by city");
                self.recommendations.hotels_by_city = recommend_by_key(&hotels, recommend_hotel);
                self.hotels_by_city = hotels;
            }
        }
    }

    /// Choose a flight
    ///
    /// Round trips ignore `leg_key`. Multi-city trips replace only the entry
    /// for `leg_key`.
    pub fn select_flight(&mut self, leg_key: Option<&str>, flight: FlightResult) -> Result<(), SelectionError> {
        debug!(?leg_key, id = %flight.id, "select_flight: called");
        let details = self.details.as_ref().ok_or(SelectionError::NoActiveTrip)?;
        let slot = flight_slot(details, leg_key)?;
        self.selection.put_flight(slot, flight);
        Ok(())
    }

    /// Choose a hotel
    ///
    /// Round trips ignore `city`. Multi-city trips replace only the entry for
    /// the stopover matching `city`.
    pub fn select_hotel(&mut self, city: Option<&str>, hotel: HotelResult) -> Result<(), SelectionError> {
        debug!(?city, id = %hotel.id, "select_hotel: called");
        let details = self.details.as_ref().ok_or(SelectionError::NoActiveTrip)?;
        let slot = hotel_slot(details, city)?;
        self.selection.put_hotel(slot, hotel);
        Ok(())
    }

    /// Loaded flight with `id`, from the list or the leg's group
    pub fn find_flight(&self, leg_key: Option<&str>, id: &str) -> Option<&FlightResult> {
        let candidates = match leg_key {
            Some(key) => self.flights_by_leg.get(key).map(Vec::as_slice).unwrap_or_default(),
            None => self.flights.as_slice(),
        };
        candidates.iter().find(|flight| flight.id == id)
    }

    /// Loaded hotel with `id`, from the list or the city's group
    pub fn find_hotel(&self, city: Option<&str>, id: &str) -> Option<&HotelResult> {
        let candidates = match city {
            Some(city) => self
                .hotels_by_city
                .iter()
                .find(|(name, _)| same_city(name, city))
                .map(|(_, hotels)| hotels.as_slice())
                .unwrap_or_default(),
            None => self.hotels.as_slice(),
        };
        candidates.iter().find(|hotel| hotel.id == id)
    }

    /// Select every recommended result; returns how many selections were made
    ///
    /// Every pick is resolved before any is applied, so a failure leaves the
    /// current selection untouched.
    pub fn select_recommended(&mut self) -> Result<usize, SelectionError> {
        let details = self.details.as_ref().ok_or(SelectionError::NoActiveTrip)?;
        let picks = &self.recommendations;

        let (flight_picks, hotel_picks): (Vec<(Option<&str>, &String)>, Vec<(Option<&str>, &String)>) = match details {
            TripDetails::Single(_) => (
                picks.flight.iter().map(|id| (None, id)).collect(),
                picks.hotel.iter().map(|id| (None, id)).collect(),
            ),
            TripDetails::Multi(_) => (
                picks.flights_by_leg.iter().map(|(k, id)| (Some(k.as_str()), id)).collect(),
                picks.hotels_by_city.iter().map(|(c, id)| (Some(c.as_str()), id)).collect(),
            ),
        };

        let mut flights = Vec::with_capacity(flight_picks.len());
        for (key, id) in flight_picks {
            let slot = flight_slot(details, key)?;
            let flight = self
                .find_flight(key, id)
                .cloned()
                .ok_or_else(|| SelectionError::NotInResults(id.clone()))?;
            flights.push((slot, flight));
        }
        let mut hotels = Vec::with_capacity(hotel_picks.len());
        for (city, id) in hotel_picks {
            let slot = hotel_slot(details, city)?;
            let hotel = self
                .find_hotel(city, id)
                .cloned()
                .ok_or_else(|| SelectionError::NotInResults(id.clone()))?;
            hotels.push((slot, hotel));
        }

        let selected = flights.len() + hotels.len();
        for (slot, flight) in flights {
            self.selection.put_flight(slot, flight);
        }
        for (slot, hotel) in hotels {
            self.selection.put_hotel(slot, hotel);
        }

        info!(selected, "select_recommended: done");
        Ok(selected)
    }

    /// Whether the selections cover the whole trip
    pub fn is_complete(&self) -> bool {
        self.details
            .as_ref()
            .is_some_and(|details| completion::is_complete(details, &self.selection))
    }

    /// Selected flight prices plus nightly hotel prices times nights stayed
    pub fn total_cost(&self) -> f64 {
        let Some(details) = &self.details else {
            return 0.0;
        };
        let stays = details.hotel_stays();
        let nights_in = |city: &str| {
            stays
                .iter()
                .find(|stay| same_city(&stay.city, city))
                .map(|stay| stay.nights())
                .unwrap_or(1)
        };

        match details {
            TripDetails::Single(trip) => {
                let flight = self.selection.flight.as_ref().map_or(0.0, |f| f.price);
                let hotel = self
                    .selection
                    .hotel
                    .as_ref()
                    .map_or(0.0, |h| h.price_per_night * f64::from(nights_in(&trip.destination)));
                flight + hotel
            }
            TripDetails::Multi(_) => {
                let flights: f64 = self.selection.flights_by_leg.values().map(|f| f.price).sum();
                let hotels: f64 = self
                    .selection
                    .hotels_by_city
                    .iter()
                    .map(|(city, h)| h.price_per_night * f64::from(nights_in(city)))
                    .sum();
                flights + hotels
            }
        }
    }

    /// Booking body for the current selections
    pub fn booking_request(&self, user_email: &str) -> Result<BookingRequest, SelectionError> {
        let details = self.details.clone().ok_or(SelectionError::NoActiveTrip)?;
        let (flight_id, hotel_id, flight_ids, hotel_ids) = match &details {
            TripDetails::Single(_) => (
                self.selection.flight.as_ref().map(|f| f.id.clone()),
                self.selection.hotel.as_ref().map(|h| h.id.clone()),
                BTreeMap::new(),
                BTreeMap::new(),
            ),
            TripDetails::Multi(_) => (
                None,
                None,
                self.selection
                    .flights_by_leg
                    .iter()
                    .map(|(key, f)| (key.clone(), f.id.clone()))
                    .collect(),
                self.selection
                    .hotels_by_city
                    .iter()
                    .map(|(city, h)| (city.clone(), h.id.clone()))
                    .collect(),
            ),
        };

        Ok(BookingRequest {
            user_email: user_email.to_string(),
            trip: details,
            flight_id,
            hotel_id,
            flight_ids,
            hotel_ids,
            total_cost: self.total_cost(),
        })
    }
}
