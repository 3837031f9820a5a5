//! Trip session state machine
//!
//! Drives one trip through plan, search, select and book. Planning streams
//! workflow steps into the state as they arrive; searches are issued together
//! once the plan succeeds and applied only if both come back.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::{BookingConfirmation, PlanError, PlanOutcome, PlanSource, TravelApi};
use crate::domain::{FlightResult, HotelResult, TripDetails, ValidationError, WorkflowStep};
use crate::store::FormStore;

use super::{SelectionError, TripState};

/// Bound on workflow steps buffered between the stream and the state
const STEP_CHANNEL_CAPACITY: usize = 64;

/// Where a trip is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripPhase {
    Empty,
    Planning,
    Planned,
    ResultsLoaded,
    Selecting,
    ReadyToBook,
    Booking,
    Booked,
}

impl std::fmt::Display for TripPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Empty => "empty",
            Self::Planning => "planning",
            Self::Planned => "planned",
            Self::ResultsLoaded => "results loaded",
            Self::Selecting => "selecting",
            Self::ReadyToBook => "ready to book",
            Self::Booking => "booking",
            Self::Booked => "booked",
        };
        write!(f, "{}", name)
    }
}

/// Errors surfaced to whoever drives the session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("Trip planned, but results could not be loaded: {0}")]
    SearchFailed(String),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("Cannot {action} while {phase}")]
    WrongPhase { action: &'static str, phase: TripPhase },

    #[error("Select a flight and a hotel for every stop before booking")]
    NotReady,

    #[error("Booking failed: {0}")]
    BookingFailed(String),
}

impl SessionError {
    /// Whether the user should be sent to subscribe rather than shown an error
    pub fn is_subscription_required(&self) -> bool {
        matches!(
            self,
            SessionError::Plan(PlanError::SubscriptionRequired)
                | SessionError::Validation(ValidationError::SubscriptionRequired)
        )
    }
}

/// One user's trip, from search to booking
pub struct TripSession {
    api: Arc<dyn TravelApi>,
    store: Box<dyn FormStore>,
    state: TripState,
    phase: TripPhase,
    error: Option<String>,
}

impl TripSession {
    pub fn new(api: Arc<dyn TravelApi>, store: Box<dyn FormStore>) -> Self {
        Self {
            api,
            store,
            state: TripState::new(),
            phase: TripPhase::Empty,
            error: None,
        }
    }

    pub fn phase(&self) -> TripPhase {
        self.phase
    }

    pub fn state(&self) -> &TripState {
        &self.state
    }

    /// Last user-facing error, kept until the next action that succeeds
    pub fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Form saved by an earlier run, if any
    pub fn restore_form(&self) -> Option<TripDetails> {
        match self.store.load() {
            Ok(details) => details,
            Err(e) => {
                warn!(error = %e, "restore_form: ignoring unreadable form state");
                None
            }
        }
    }

    /// Whether `email` may add a second leg; lookup failures count as no
    pub async fn has_active_subscription(&self, email: &str) -> bool {
        match self.api.has_active_subscription(email).await {
            Ok(active) => active,
            Err(e) => {
                warn!(%email, error = %e, "has_active_subscription: lookup failed");
                false
            }
        }
    }

    /// Plan a trip and load its results
    pub async fn plan(&mut self, details: TripDetails) -> Result<PlanOutcome, SessionError> {
        self.plan_with(details, |_| {}).await
    }

    /// Plan a trip, calling `on_step` for each workflow step as it arrives
    ///
    /// Validation happens before any network call. A new plan discards
    /// everything from the previous trip. If planning succeeds but the
    /// searches fail, the plan is kept and [`SessionError::SearchFailed`] is
    /// returned.
    pub async fn plan_with<F>(&mut self, details: TripDetails, mut on_step: F) -> Result<PlanOutcome, SessionError>
    where
        F: FnMut(&WorkflowStep),
    {
        debug!(trip_type = %details.trip_type(), "plan_with: called");
        if let Err(e) = details.validate() {
            self.error = Some(e.to_string());
            return Err(e.into());
        }

        self.state.begin(details.clone());
        self.error = None;
        self.transition(TripPhase::Planning);
        if let Err(e) = self.store.save(&details) {
            warn!(error = %e, "plan_with: failed to save form state");
        }

        // A fresh channel per plan; nothing from an earlier stream can land here
        let (step_tx, mut step_rx) = mpsc::channel(STEP_CHANNEL_CAPACITY);
        let api = Arc::clone(&self.api);
        let state = &mut self.state;
        let planning = api.plan_trip(&details, step_tx);
        let recording = async {
            while let Some(step) = step_rx.recv().await {
                on_step(&step);
                state.record_step(step);
            }
        };
        let (result, ()) = tokio::join!(planning, recording);

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "plan_with: planning failed");
                self.state.reset();
                self.error = Some(e.to_string());
                self.transition(TripPhase::Empty);
                return Err(e.into());
            }
        };

        if outcome.source == PlanSource::Legacy {
            self.state.replace_steps(outcome.workflow_steps.clone());
        }
        self.state.set_plan(outcome.final_response.clone());
        self.transition(TripPhase::Planned);

        self.load_results().await?;
        Ok(outcome)
    }

    /// Search flights and hotels for the planned trip
    ///
    /// Both searches run together and nothing is applied unless both succeed.
    pub async fn load_results(&mut self) -> Result<(), SessionError> {
        let Some(details) = self.state.details().cloned() else {
            return Err(self.wrong_phase("load results"));
        };
        if self.phase == TripPhase::Planning || self.phase == TripPhase::Booking {
            return Err(self.wrong_phase("load results"));
        }
        debug!(trip_type = %details.trip_type(), "load_results: called");

        let (flights, hotels) = tokio::join!(self.api.search_flights(&details), self.api.search_hotels(&details));
        match (flights, hotels) {
            (Ok(flights), Ok(hotels)) => {
                self.state.apply_flights(flights);
                self.state.apply_hotels(hotels);
                self.error = None;
                self.transition(TripPhase::ResultsLoaded);
                Ok(())
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "load_results: search failed");
                let message = e.message();
                self.error = Some(format!("Trip planned, but results could not be loaded: {}", message));
                Err(SessionError::SearchFailed(message))
            }
        }
    }

    /// Choose a flight; `leg_key` is required for multi-city trips
    pub fn select_flight(&mut self, leg_key: Option<&str>, flight: FlightResult) -> Result<(), SessionError> {
        self.ensure_selectable("select a flight")?;
        self.state.select_flight(leg_key, flight)?;
        self.refresh_selection_phase();
        Ok(())
    }

    /// Choose a hotel; `city` is required for multi-city trips
    pub fn select_hotel(&mut self, city: Option<&str>, hotel: HotelResult) -> Result<(), SessionError> {
        self.ensure_selectable("select a hotel")?;
        self.state.select_hotel(city, hotel)?;
        self.refresh_selection_phase();
        Ok(())
    }

    /// Choose a loaded flight by id
    pub fn select_flight_by_id(&mut self, leg_key: Option<&str>, id: &str) -> Result<(), SessionError> {
        let flight = self
            .state
            .find_flight(leg_key, id)
            .cloned()
            .ok_or_else(|| SelectionError::NotInResults(id.to_string()))?;
        self.select_flight(leg_key, flight)
    }

    /// Choose a loaded hotel by id
    pub fn select_hotel_by_id(&mut self, city: Option<&str>, id: &str) -> Result<(), SessionError> {
        let hotel = self
            .state
            .find_hotel(city, id)
            .cloned()
            .ok_or_else(|| SelectionError::NotInResults(id.to_string()))?;
        self.select_hotel(city, hotel)
    }

    /// Take every recommendation; returns how many selections were made
    pub fn select_recommended(&mut self) -> Result<usize, SessionError> {
        self.ensure_selectable("select recommendations")?;
        let selected = self.state.select_recommended()?;
        self.refresh_selection_phase();
        Ok(selected)
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    pub fn total_cost(&self) -> f64 {
        self.state.total_cost()
    }

    /// Book the current selections
    ///
    /// On success all trip state and the saved form are cleared. On failure
    /// nothing changes and the booking may be retried.
    pub async fn book(&mut self, user_email: &str) -> Result<BookingConfirmation, SessionError> {
        debug!(%user_email, phase = %self.phase, "book: called");
        if user_email.trim().is_empty() {
            return Err(ValidationError::MissingField("user_email").into());
        }
        if !self.is_complete() {
            return Err(SessionError::NotReady);
        }

        let request = self.state.booking_request(user_email.trim())?;
        self.transition(TripPhase::Booking);

        match self.api.create_booking(&request).await {
            Ok(confirmation) => {
                self.state.reset();
                self.error = None;
                if let Err(e) = self.store.clear() {
                    warn!(error = %e, "book: failed to clear form state");
                }
                self.transition(TripPhase::Booked);
                Ok(confirmation)
            }
            Err(e) => {
                warn!(error = %e, "book: booking failed");
                let message = e.message();
                self.error = Some(message.clone());
                self.transition(TripPhase::ReadyToBook);
                Err(SessionError::BookingFailed(message))
            }
        }
    }

    /// Drop the current trip
    pub fn reset(&mut self) {
        self.state.reset();
        self.error = None;
        self.transition(TripPhase::Empty);
    }

    fn transition(&mut self, phase: TripPhase) {
        if self.phase != phase {
            info!(from = %self.phase, to = %phase, "transition");
            self.phase = phase;
        }
    }

    fn wrong_phase(&self, action: &'static str) -> SessionError {
        SessionError::WrongPhase {
            action,
            phase: self.phase,
        }
    }

    fn ensure_selectable(&self, action: &'static str) -> Result<(), SessionError> {
        match self.phase {
            TripPhase::ResultsLoaded | TripPhase::Selecting | TripPhase::ReadyToBook => Ok(()),
            _ => Err(self.wrong_phase(action)),
        }
    }

    fn refresh_selection_phase(&mut self) {
        let phase = if self.state.is_complete() {
            TripPhase::ReadyToBook
        } else if self.state.selection().is_empty() {
            TripPhase::ResultsLoaded
        } else {
            TripPhase::Selecting
        };
        self.transition(phase);
    }
}
