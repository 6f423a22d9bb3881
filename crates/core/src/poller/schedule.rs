//! Generic periodic poller.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::PollingConfig;
use crate::error::CurtainError;

/// Lifecycle of a poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Polling,
    Converged,
    Failed,
}

/// Upper bounds on one polling run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollLimits {
    /// Fail after this many ticks without convergence.
    pub max_ticks: Option<u32>,
    /// Fail once this much time has passed without convergence.
    pub timeout: Option<Duration>,
}

impl PollLimits {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn max_ticks(max_ticks: u32) -> Self {
        Self {
            max_ticks: Some(max_ticks),
            timeout: None,
        }
    }

    fn exceeded(&self, ticks: u32, started: Instant) -> bool {
        self.max_ticks.is_some_and(|max| ticks >= max)
            || self.timeout.is_some_and(|timeout| started.elapsed() >= timeout)
    }
}

impl From<&PollingConfig> for PollLimits {
    fn from(config: &PollingConfig) -> Self {
        Self {
            max_ticks: (config.max_ticks > 0).then_some(config.max_ticks),
            timeout: (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs)),
        }
    }
}

#[derive(Debug)]
struct Schedule {
    state: PollerState,
    /// Bumped on every run, so a stale run cannot settle a newer one.
    generation: u64,
    stop: CancellationToken,
}

/// A reusable periodic poller that owns its own schedule.
///
/// `poll` begins a run and drives it; a second `poll` while one is running
/// is refused without touching the broker. `end` disarms the schedule from
/// any state and returns the poller to `Idle`.
#[derive(Debug)]
pub struct Poller {
    label: &'static str,
    period: Duration,
    limits: PollLimits,
    schedule: Mutex<Schedule>,
}

impl Poller {
    /// A zero `period` is raised to one millisecond.
    pub fn new(label: &'static str, period: Duration, limits: PollLimits) -> Self {
        Self {
            label,
            period: period.max(Duration::from_millis(1)),
            limits,
            schedule: Mutex::new(Schedule {
                state: PollerState::Idle,
                generation: 0,
                stop: CancellationToken::new(),
            }),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn state(&self) -> PollerState {
        self.schedule().state
    }

    pub fn is_polling(&self) -> bool {
        self.state() == PollerState::Polling
    }

    /// Disarm the schedule and return to `Idle`. Safe to call in any state.
    pub fn end(&self) {
        let mut schedule = self.schedule();
        schedule.stop.cancel();
        if schedule.state != PollerState::Idle {
            debug!(poller = self.label, from = ?schedule.state, "poller ended");
        }
        schedule.state = PollerState::Idle;
    }

    /// Begin a run and drive it until `converged` holds for a fetched value.
    ///
    /// The first tick fires one period after the call. Every tick awaits
    /// `fetch` and passes the value to `on_tick` before testing `converged`.
    /// A fetch error fails the run immediately; `end()` or `cancel` abort it
    /// with [`CurtainError::Cancelled`]. The wall-clock limit also interrupts
    /// a fetch that is still in flight.
    pub async fn poll<T, F, Fut, P, O>(
        &self,
        cancel: &CancellationToken,
        mut fetch: F,
        converged: P,
        mut on_tick: O,
    ) -> Result<T, CurtainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CurtainError>>,
        P: Fn(&T) -> bool,
        O: FnMut(&T),
    {
        let (generation, stop) = self
            .begin()
            .ok_or(CurtainError::AlreadyPolling(self.label))?;
        let run = Run {
            poller: self,
            generation,
        };

        let started = Instant::now();
        let mut interval = interval_at(started + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks: u32 = 0;

        let deadline = self.limits.timeout.map(|timeout| started + timeout);
        let expired = async move {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(expired);

        loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => return Err(CurtainError::Cancelled),
                _ = cancel.cancelled() => return Err(CurtainError::Cancelled),
                _ = &mut expired => return Err(run.give_up(ticks)),
                _ = interval.tick() => {}
            }

            ticks += 1;
            trace!(poller = self.label, tick = ticks, "poll tick");

            let fetched = tokio::select! {
                biased;
                _ = stop.cancelled() => return Err(CurtainError::Cancelled),
                _ = cancel.cancelled() => return Err(CurtainError::Cancelled),
                _ = &mut expired => return Err(run.give_up(ticks)),
                fetched = fetch() => fetched,
            };

            match fetched {
                Ok(value) => {
                    on_tick(&value);
                    if converged(&value) {
                        run.settle(PollerState::Converged);
                        debug!(poller = self.label, ticks = ticks, "poller converged");
                        return Ok(value);
                    }
                }
                Err(e) => {
                    run.settle(PollerState::Failed);
                    warn!(poller = self.label, ticks = ticks, error = %e, "poller failed");
                    return Err(e);
                }
            }

            if self.limits.exceeded(ticks, started) {
                return Err(run.give_up(ticks));
            }
        }
    }

    fn schedule(&self) -> MutexGuard<'_, Schedule> {
        self.schedule.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arm a fresh schedule. Returns `None`, changing nothing, if already
    /// polling.
    fn begin(&self) -> Option<(u64, CancellationToken)> {
        let mut schedule = self.schedule();
        if schedule.state == PollerState::Polling {
            trace!(poller = self.label, "begin while polling ignored");
            return None;
        }
        schedule.state = PollerState::Polling;
        schedule.generation += 1;
        schedule.stop = CancellationToken::new();
        debug!(poller = self.label, generation = schedule.generation, "poller started");
        Some((schedule.generation, schedule.stop.clone()))
    }

    /// Leave `Polling` for `outcome`, if `generation` is still the live run.
    fn settle(&self, generation: u64, outcome: PollerState) {
        let mut schedule = self.schedule();
        if schedule.generation == generation && schedule.state == PollerState::Polling {
            schedule.state = outcome;
            schedule.stop.cancel();
        }
    }
}

/// One armed run; returns the poller to `Idle` if dropped while polling.
struct Run<'a> {
    poller: &'a Poller,
    generation: u64,
}

impl Run<'_> {
    fn settle(&self, outcome: PollerState) {
        self.poller.settle(self.generation, outcome);
    }

    fn give_up(&self, ticks: u32) -> CurtainError {
        self.settle(PollerState::Failed);
        warn!(poller = self.poller.label, ticks = ticks, "poller gave up before convergence");
        CurtainError::PollTimeout {
            poller: self.poller.label,
            ticks,
        }
    }
}

impl Drop for Run<'_> {
    fn drop(&mut self) {
        self.settle(PollerState::Idle);
    }
}
