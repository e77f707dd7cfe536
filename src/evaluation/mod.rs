pub mod orchestrator;
pub mod state;

pub use orchestrator::{BatchOutcome, Orchestrator, SubjectOutcome, SystemStatus};
pub use state::{transition, Action, EvaluationState, Event, RetryPolicy, Step, Transition};
