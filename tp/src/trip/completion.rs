//! Booking readiness

use crate::domain::TripDetails;

use super::Selection;

/// Whether every slot the trip needs has a selection
///
/// A round trip needs one flight and one hotel. A multi-city trip with `L`
/// legs needs exactly `L` flights and `L - 1` hotels; the last leg returns to
/// the origin.
pub fn is_complete(details: &TripDetails, selection: &Selection) -> bool {
    match details {
        TripDetails::Single(_) => selection.flight.is_some() && selection.hotel.is_some(),
        TripDetails::Multi(trip) => {
            let legs = trip.legs.len();
            legs > 0
                && selection.flights_by_leg.len() == legs
                && selection.hotels_by_city.len() == legs - 1
        }
    }
}
