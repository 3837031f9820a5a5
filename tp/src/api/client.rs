//! TravelApi trait definition

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{FlightResult, HotelResult, ResultSet, TripDetails, WorkflowStep};

use super::{ApiError, BookingConfirmation, BookingRequest, PlanError, PlanOutcome};

/// Backend collaborators the trip session talks to
///
/// Planning streams workflow steps to `step_tx` in arrival order and resolves
/// once the terminal result is known. Searches pick the single-city or
/// multi-city endpoint from the trip type; the caller must still dispatch on
/// the returned shape.
#[async_trait]
pub trait TravelApi: Send + Sync {
    /// Plan a trip, falling back to the legacy endpoint when streaming fails
    async fn plan_trip(
        &self,
        details: &TripDetails,
        step_tx: mpsc::Sender<WorkflowStep>,
    ) -> Result<PlanOutcome, PlanError>;

    /// Flight offers for every leg of the trip
    async fn search_flights(&self, details: &TripDetails) -> Result<ResultSet<FlightResult>, ApiError>;

    /// Hotel offers for every stopover of the trip
    async fn search_hotels(&self, details: &TripDetails) -> Result<ResultSet<HotelResult>, ApiError>;

    /// Submit a booking
    async fn create_booking(&self, request: &BookingRequest) -> Result<BookingConfirmation, ApiError>;

    /// Whether `email` holds an active subscription
    async fn has_active_subscription(&self, email: &str) -> Result<bool, ApiError>;
}
