//! Travel backend client
//!
//! [`TravelApi`] is the seam the trip session talks through. [`HttpTravelApi`]
//! is the real implementation: planning goes through the streaming endpoint
//! with a legacy fallback (see [`planner`]), searches and booking are plain
//! JSON calls.

mod client;
mod error;
mod http;
pub mod planner;
mod types;

pub use client::TravelApi;
#[cfg(test)]
pub use client::mock;
pub use error::{ApiError, PlanError};
pub use http::HttpTravelApi;
pub use planner::PlanStream;
pub use types::{
    BookingConfirmation, BookingRequest, ErrorPayload, FinalResult, FlightSearchRequest, HotelSearchRequest,
    MultiCityFlightSearchRequest, MultiCityHotelSearchRequest, PlanOutcome, PlanRequest, PlanSource,
    SubscriptionStatus,
};
