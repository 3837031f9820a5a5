//! Domain types for trip planning
//!
//! - [`trip`] - legs, trip details and input validation
//! - [`results`] - flight/hotel offers and the two result shapes
//! - [`step`] - workflow steps observed while the backend plans

pub mod results;
pub mod step;
pub mod trip;

pub use results::{FlightResult, HotelResult, ResultSet};
pub use step::{StepKind, WorkflowStep};
pub use trip::{
    HotelStay, MAX_LEGS, MultiCityForm, MultiCityTrip, SingleTrip, TripDetails, TripLeg, TripType, ValidationError,
    leg_key, same_city,
};
