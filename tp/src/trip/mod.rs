//! Trip reconciliation and the session state machine

mod completion;
mod recommend;
mod session;
mod state;

pub use completion::is_complete;
pub use recommend::{recommend_by_key, recommend_flight, recommend_hotel};
pub use session::{SessionError, TripPhase, TripSession};
pub use state::{Recommendations, Selection, SelectionError, TripState};
