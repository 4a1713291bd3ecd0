pub mod profile;
pub mod session;
pub mod tokens;

pub use session::{FailureReason, ReservationSession, SessionOutcome};
pub use tokens::{StepForm, StepTokens};
