//! Request/response types for the travel backend
//!
//! Request bodies mirror the backend's snake_case models. Response types are
//! lenient: the streaming and legacy planning endpoints do not agree on key
//! names, so both spellings are accepted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::domain::{HotelStay, TripDetails, TripLeg, WorkflowStep};

use super::ApiError;

/// Body of a planning request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PlanRequest {
    Single {
        origin: String,
        destination: String,
        departure_date: NaiveDate,
        return_date: NaiveDate,
        budget: f64,
        passengers: u32,
    },
    Multi {
        trip_legs: Vec<TripLeg>,
        budget: f64,
        passengers: u32,
    },
}

impl From<&TripDetails> for PlanRequest {
    fn from(details: &TripDetails) -> Self {
        match details {
            TripDetails::Single(trip) => PlanRequest::Single {
                origin: trip.origin.clone(),
                destination: trip.destination.clone(),
                departure_date: trip.departure_date,
                return_date: trip.return_date,
                budget: trip.budget,
                passengers: trip.passengers,
            },
            TripDetails::Multi(trip) => PlanRequest::Multi {
                trip_legs: trip.legs.clone(),
                budget: trip.budget,
                passengers: trip.passengers,
            },
        }
    }
}

/// Terminal payload of a planning stream, and the legacy response body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FinalResult {
    #[serde(default)]
    pub success: Option<bool>,

    #[serde(default, alias = "finalResponse")]
    pub final_response: Option<String>,

    /// Older responses carry the plan text under `plan`
    #[serde(default)]
    pub plan: Option<String>,

    #[serde(default, alias = "workflowSteps")]
    pub workflow_steps: Vec<WorkflowStep>,

    #[serde(default, alias = "detail")]
    pub error: Option<String>,
}

impl FinalResult {
    /// Plan text, whichever key carried it
    pub fn plan_text(&self) -> Option<&str> {
        self.final_response.as_deref().or(self.plan.as_deref())
    }

    /// A result without an explicit flag succeeded if it carries plan text
    pub fn succeeded(&self) -> bool {
        self.success.unwrap_or_else(|| self.plan_text().is_some())
    }

    /// Turn the payload into an outcome
    ///
    /// `streamed` holds the steps already delivered over the stream; they
    /// stand in when the payload does not repeat them.
    pub fn into_outcome(self, streamed: Vec<WorkflowStep>, source: PlanSource) -> Result<PlanOutcome, ApiError> {
        debug!(?source, success = ?self.success, "into_outcome: called");
        if !self.succeeded() {
            let message = self.error.unwrap_or_else(|| "Planning failed".to_string());
            return Err(ApiError::Stream(message));
        }

        let final_response = self.plan_text().map(str::to_string).unwrap_or_default();
        let workflow_steps = if self.workflow_steps.is_empty() {
            streamed
        } else {
            self.workflow_steps
        };

        Ok(PlanOutcome {
            final_response,
            workflow_steps,
            source,
        })
    }
}

/// Payload of an `error` frame
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorPayload {
    pub fn text(&self) -> String {
        self.detail
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "Planning stream reported an error".to_string())
    }
}

/// Which planning path produced an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanSource {
    Stream,
    Legacy,
}

/// Successful planning result
#[derive(Debug, Clone, PartialEq)]
pub struct PlanOutcome {
    pub final_response: String,
    pub workflow_steps: Vec<WorkflowStep>,
    pub source: PlanSource,
}

/// Single-city flight search
#[derive(Debug, Clone, Serialize)]
pub struct FlightSearchRequest {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
}

/// Single-city hotel search
#[derive(Debug, Clone, Serialize)]
pub struct HotelSearchRequest {
    pub city: String,
    pub checkin_date: NaiveDate,
    pub checkout_date: NaiveDate,
}

impl From<&HotelStay> for HotelSearchRequest {
    fn from(stay: &HotelStay) -> Self {
        Self {
            city: stay.city.clone(),
            checkin_date: stay.checkin_date,
            checkout_date: stay.checkout_date,
        }
    }
}

/// Multi-city flight search, one entry per leg
#[derive(Debug, Clone, Serialize)]
pub struct MultiCityFlightSearchRequest {
    pub legs: Vec<TripLeg>,
}

/// Multi-city hotel search, one entry per stopover
#[derive(Debug, Clone, Serialize)]
pub struct MultiCityHotelSearchRequest {
    pub cities: Vec<HotelSearchRequest>,
}

/// Booking submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingRequest {
    pub user_email: String,
    #[serde(flatten)]
    pub trip: TripDetails,
    /// Round trip: the chosen flight and hotel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotel_id: Option<String>,
    /// Multi-city: chosen flight per leg key and hotel per city
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub flight_ids: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub hotel_ids: BTreeMap<String, String>,
    pub total_cost: f64,
}

/// Stored booking as returned by the backend
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BookingConfirmation {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub total_cost: Option<f64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Subscription collaborator response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "hasActiveSubscription", alias = "has_active_subscription")]
    pub has_active_subscription: bool,
}
