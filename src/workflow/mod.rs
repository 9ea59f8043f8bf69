pub mod review_session;
pub mod review_state;

pub use review_session::{ExportReport, PollOutcome, ReviewSession, SelectOutcome, SkipReason};
pub use review_state::{CatalogState, PollTicket, ReviewState, Selection, SelectionPhase, SelectionState};
