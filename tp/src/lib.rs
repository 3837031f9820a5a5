//! TripPlanner - streaming trip planning client
//!
//! Requests a trip plan from an agent backend, shows the planning workflow as
//! it unfolds, then loads flights and hotels, recommends the best of each and
//! books the user's choices.
//!
//! # Core Concepts
//!
//! - **Streamed planning**: workflow steps arrive as an event stream and are
//!   delivered in order; a legacy single-response endpoint covers failures
//! - **Two result shapes**: round trips get flat lists, multi-city trips get
//!   results keyed by leg and by city, reconciled behind one state
//! - **Explicit lifecycle**: a trip moves from planning through selection to
//!   booking, and a new search or a booking clears everything
//!
//! # Modules
//!
//! - [`domain`] - Trips, legs, results and workflow steps
//! - [`stream`] - Event-stream frame decoding
//! - [`api`] - Backend client trait, HTTP implementation and planner fallback
//! - [`trip`] - Result reconciliation, recommendations and the trip session
//! - [`store`] - Form-state persistence
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod store;
pub mod stream;
pub mod trip;

// Re-export commonly used types
pub use api::{ApiError, HttpTravelApi, PlanError, PlanOutcome, PlanSource, TravelApi};
pub use config::{ApiConfig, Config};
pub use domain::{
    FlightResult, HotelResult, MultiCityForm, ResultSet, StepKind, TripDetails, TripLeg, ValidationError, WorkflowStep,
};
pub use store::{FileFormStore, FormStore, MemoryFormStore};
pub use trip::{SessionError, TripPhase, TripSession, TripState};
