use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Repeating heartbeat timer. Stopped until [`Heartbeat::start`]; a stopped
/// timer never ticks.
#[derive(Debug, Default)]
pub struct Heartbeat {
    state: State,
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Stopped,
    /// Started but not yet polled; the interval is built on the first tick
    /// so starting does not need a runtime.
    Armed { first: Instant, period: Duration },
    Running(Interval),
}

impl Heartbeat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer; the first tick comes one period from now. Restarting
    /// a running timer resets it. A zero period leaves the timer stopped.
    pub fn start(&mut self, period: Duration) {
        if period.is_zero() {
            tracing::warn!("zero heartbeat period, heartbeat disabled");
            self.stop();
            return;
        }
        self.state = State::Armed {
            first: Instant::now() + period,
            period,
        };
        tracing::info!(?period, "heartbeat started");
    }

    /// Stop the timer. Stopping a stopped timer is a no-op.
    pub fn stop(&mut self) {
        if !matches!(self.state, State::Stopped) {
            self.state = State::Stopped;
            tracing::info!("heartbeat stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        !matches!(self.state, State::Stopped)
    }

    /// Wait for the next tick. Pending forever while stopped. Cancel-safe.
    pub async fn tick(&mut self) {
        if let State::Armed { first, period } = self.state {
            let mut interval = time::interval_at(first, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.state = State::Running(interval);
        }
        match &mut self.state {
            State::Running(interval) => {
                interval.tick().await;
            }
            _ => std::future::pending::<()>().await,
        }
    }
}
