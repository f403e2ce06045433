use super::{
    client::RelayApi,
    state::{transition, PollerEvent, PollerState},
};
use crate::{
    config::{PollerConfig, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT_INTERVALS},
    error::Result,
    models::StatusReport,
};
use std::pin::Pin;
use tokio::sync::watch;
use tokio::time::{self, Instant, Interval, MissedTickBehavior, Sleep};

/// Timers that only exist while a job is being polled.
struct PollTimers {
    ticker: Interval,
    deadline: Pin<Box<Sleep>>,
}

impl PollTimers {
    fn arm(config: &PollerConfig) -> Self {
        let now = Instant::now();
        let period = config.period();
        let first_tick = now
            .checked_add(period)
            .unwrap_or_else(|| now + DEFAULT_POLL_INTERVAL);
        let deadline = now
            .checked_add(config.timeout())
            .unwrap_or_else(|| now + DEFAULT_POLL_INTERVAL * DEFAULT_TIMEOUT_INTERVALS);

        let mut ticker = time::interval_at(first_tick, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            ticker,
            deadline: Box::pin(time::sleep_until(deadline)),
        }
    }
}

/// Owns one poller state machine and the relay it talks to.
pub struct PollerController<R> {
    relay: R,
    config: PollerConfig,
    state: PollerState,
    timers: Option<PollTimers>,
    updates: watch::Sender<PollerState>,
}

impl<R: RelayApi> PollerController<R> {
    pub fn new(relay: R, config: PollerConfig) -> Self {
        let (updates, _) = watch::channel(PollerState::Idle);
        Self {
            relay,
            config,
            state: PollerState::Idle,
            timers: None,
            updates,
        }
    }

    pub fn state(&self) -> &PollerState {
        &self.state
    }

    pub fn relay(&self) -> &R {
        &self.relay
    }

    /// Receives every state the controller moves through.
    pub fn subscribe(&self) -> watch::Receiver<PollerState> {
        self.updates.subscribe()
    }

    pub fn is_polling(&self) -> bool {
        self.timers.is_some()
    }

    /// Feeds one event through the state machine.
    ///
    /// Timers are armed when polling starts and dropped on the same call that reaches a
    /// terminal state, so nothing can fire for a finished job.
    pub fn apply(&mut self, event: PollerEvent) -> &PollerState {
        let next = transition(&self.state, event);
        if next == self.state {
            return &self.state;
        }

        let started_polling = matches!(next, PollerState::Polling { .. })
            && !matches!(self.state, PollerState::Polling { .. });
        if started_polling {
            self.timers = Some(PollTimers::arm(&self.config));
        }
        if !matches!(next, PollerState::Polling { .. }) {
            self.timers = None;
        }

        log::debug!("Poller state: {:?}", next);
        if next.is_terminal() {
            match &next {
                PollerState::Complete { .. } => log::info!("✅ {}", next.status_line()),
                _ => log::warn!("⚠️  {}", next.status_line()),
            }
        }

        self.state = next;
        self.updates.send_replace(self.state.clone());
        &self.state
    }

    /// Submits `prompt` and polls until the job finishes, fails or times out.
    pub async fn generate(&mut self, prompt: &str) -> &PollerState {
        self.apply(PollerEvent::Submit {
            prompt: prompt.to_string(),
        });
        if !matches!(self.state, PollerState::Submitting { .. }) {
            return &self.state;
        }

        let event = match self.relay.submit(prompt).await {
            Ok(task_id) => PollerEvent::Submitted { task_id },
            Err(e) => PollerEvent::SubmitFailed {
                message: e.to_string(),
            },
        };
        self.apply(event);

        while let Some(event) = self.next_poll_event().await {
            self.apply(event);
        }
        &self.state
    }

    /// Waits for the next tick and runs one status query, racing both against the deadline.
    async fn next_poll_event(&mut self) -> Option<PollerEvent> {
        let task_id = match &self.state {
            PollerState::Polling { job, .. } => job.task_id().to_string(),
            _ => return None,
        };
        let timers = self.timers.as_mut()?;

        let ticked = tokio::select! {
            biased;
            _ = timers.deadline.as_mut() => false,
            _ = timers.ticker.tick() => true,
        };
        if !ticked {
            return Some(PollerEvent::DeadlineElapsed);
        }

        log::debug!("Querying status for task {}", task_id);
        let result = tokio::select! {
            biased;
            _ = timers.deadline.as_mut() => None,
            result = self.relay.query_status(&task_id) => Some(result),
        };

        Some(match result {
            None => PollerEvent::DeadlineElapsed,
            Some(result) => query_event(task_id, result),
        })
    }
}

fn query_event(task_id: String, result: Result<StatusReport>) -> PollerEvent {
    match result {
        Ok(report) => PollerEvent::StatusReceived { task_id, report },
        Err(e) => PollerEvent::QueryFailed {
            task_id,
            message: e.to_string(),
        },
    }
}
