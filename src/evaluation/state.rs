//! Per-subject evaluation state machine.
//!
//! `transition` is pure: the orchestrator performs the step a state names,
//! reports the outcome as an `Event`, and follows the returned `Action`.

use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;

use crate::config::RetryConfig;
use crate::error::EvaluationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Collecting,
    Scoring,
    BiasChecking,
    Assembling,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationState {
    Collecting,
    Scoring,
    BiasChecking,
    Assembling,
    Done,
    Failed(EvaluationError),
}

impl EvaluationState {
    /// Step to perform in this state, `None` once terminal
    pub fn step(&self) -> Option<Step> {
        match self {
            EvaluationState::Collecting => Some(Step::Collecting),
            EvaluationState::Scoring => Some(Step::Scoring),
            EvaluationState::BiasChecking => Some(Step::BiasChecking),
            EvaluationState::Assembling => Some(Step::Assembling),
            EvaluationState::Done | EvaluationState::Failed(_) => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.step().is_none()
    }
}

/// Outcome of performing the current step
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Completed,
    StepFailed(EvaluationError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Perform the next step
    Run(Step),
    /// Perform the same step again after a delay
    RetryAfter(Step, Duration),
    Finish,
    Abort,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: EvaluationState,
    pub action: Action,
}

/// How often and how patiently failed steps are retried
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: config.initial_backoff(),
            max_backoff: config.max_backoff(),
        }
    }

    /// Delay before retry number `attempt + 1`: doubles from the initial backoff
    pub fn delay(&self, attempt: u32) -> Duration {
        // The strategy yields factor * 2^(n+1); halving the result keeps odd
        // millisecond backoffs exact.
        let factor = u64::try_from(self.initial_backoff.as_millis())
            .unwrap_or(u64::MAX)
            .max(1);
        let doubled = ExponentialBackoff::from_millis(2)
            .factor(factor)
            .max_delay(self.max_backoff.saturating_mul(2))
            .nth(attempt as usize)
            .unwrap_or(self.max_backoff.saturating_mul(2));
        (doubled / 2).min(self.max_backoff)
    }
}

/// Decide what follows `event` in `state`.
///
/// `attempt` counts retries already made of the current step.
pub fn transition(
    state: &EvaluationState,
    event: Event,
    attempt: u32,
    policy: &RetryPolicy,
) -> Transition {
    let Some(step) = state.step() else {
        // Terminal states absorb every event
        return Transition {
            next: state.clone(),
            action: match state {
                EvaluationState::Done => Action::Finish,
                _ => Action::Abort,
            },
        };
    };

    match event {
        Event::Completed => match step {
            Step::Collecting => Transition {
                next: EvaluationState::Scoring,
                action: Action::Run(Step::Scoring),
            },
            Step::Scoring => Transition {
                next: EvaluationState::BiasChecking,
                action: Action::Run(Step::BiasChecking),
            },
            Step::BiasChecking => Transition {
                next: EvaluationState::Assembling,
                action: Action::Run(Step::Assembling),
            },
            Step::Assembling => Transition {
                next: EvaluationState::Done,
                action: Action::Finish,
            },
        },
        Event::StepFailed(error) => {
            let no_data = step == Step::Collecting
                && matches!(error, EvaluationError::NoDataAvailable { .. });

            if !no_data && error.is_retryable() && attempt < policy.max_retries {
                Transition {
                    next: state.clone(),
                    action: Action::RetryAfter(step, policy.delay(attempt)),
                }
            } else {
                Transition {
                    next: EvaluationState::Failed(error),
                    action: Action::Abort,
                }
            }
        }
    }
}
