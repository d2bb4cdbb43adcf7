//! Fixed-interval driver for [`UpdateCycle`].

use std::{future::Future, time::Duration};

use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::cycle::UpdateCycle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting for the next tick.
    Idle,
    /// A cycle is in flight.
    Running,
    /// The last cycle was rate limited; the timer was re-armed for a full interval.
    Backoff,
    /// Shutdown was requested; no further cycles will run.
    Stopped,
}

#[derive(Debug)]
pub struct PollScheduler {
    cycle: UpdateCycle,
    interval: Duration,
    state: SchedulerState,
}

impl PollScheduler {
    pub fn new(cycle: UpdateCycle, interval: Duration) -> Self {
        Self { cycle, interval, state: SchedulerState::Idle }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Run one cycle right away, then one per interval until `shutdown`
    /// resolves. Cycle failures are logged and never end the loop. A cycle
    /// already in progress is allowed to finish before shutdown is noticed.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tracing::info!(interval = ?self.interval, device = %self.cycle.device(), "running server");

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        self.run_cycle(&mut ticker).await;

        loop {
            tokio::select! {
                _ = ticker.tick() => self.run_cycle(&mut ticker).await,
                () = &mut shutdown => break,
            }
        }

        self.state = SchedulerState::Stopped;
        tracing::info!("shutting down");
    }

    async fn run_cycle(&mut self, ticker: &mut Interval) {
        self.state = SchedulerState::Running;

        match self.cycle.run().await {
            Ok(()) => self.state = SchedulerState::Idle,
            Err(err) if err.is_rate_limited() => {
                // Push the next attempt a whole interval out from now.
                ticker.reset();
                self.state = SchedulerState::Backoff;
                tracing::warn!(
                    error = %err.report(),
                    backoff = ?self.interval,
                    "rate limited, applying backoff"
                );
            }
            Err(err) => {
                self.state = SchedulerState::Idle;
                tracing::error!(error = %err.report(), kind = ?err.kind(), "failed to update");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::fakes::{Call, FakeSource, FakeWebhook};
    use serde_json::json;

    const INTERVAL: Duration = Duration::from_secs(60);

    fn source() -> FakeSource {
        let mut source = FakeSource::with_device("AA:BB", json!({ "tempf": 68.2 }));
        source.history = vec![
            json!({ "tempf": 70.0, "dateutc": 1_700_000_000_000_i64 })
                .as_object()
                .cloned()
                .unwrap(),
        ];
        source
    }

    fn scheduler(source: &FakeSource, webhook: &FakeWebhook) -> PollScheduler {
        let cycle = UpdateCycle::new(
            Box::new(source.clone()),
            Box::new(webhook.clone()),
            "AA:BB",
            288,
        );
        PollScheduler::new(cycle, INTERVAL)
    }

    /// Seconds since `start` at which each cycle began.
    fn cycle_starts(source: &FakeSource, start: Instant) -> Vec<u64> {
        source
            .calls()
            .into_iter()
            .filter(|(_, call)| *call == Call::Devices)
            .map(|(at, _)| (at - start).as_secs())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn runs_immediately_then_every_interval() {
        let source = source();
        let webhook = FakeWebhook::default();
        let mut scheduler = scheduler(&source, &webhook);
        let start = Instant::now();

        scheduler.run(tokio::time::sleep(Duration::from_secs(125))).await;

        assert_eq!(cycle_starts(&source, start), vec![0, 60, 120]);
        assert_eq!(webhook.delivered().len(), 3);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_rearms_timer_for_full_interval() {
        let source = source();
        source.script([Some(429)]);
        let webhook = FakeWebhook::default();
        let mut scheduler = scheduler(&source, &webhook);
        let start = Instant::now();

        scheduler.run(tokio::time::sleep(Duration::from_secs(130))).await;

        // first cycle fails at t=1 after the pacing delay; next attempt is t=1+60
        assert_eq!(cycle_starts(&source, start), vec![0, 61, 121]);
        assert_eq!(webhook.delivered().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_mid_run_shifts_later_ticks() {
        let source = source();
        source.script([None, Some(429)]);
        let webhook = FakeWebhook::default();
        let mut scheduler = scheduler(&source, &webhook);
        let start = Instant::now();

        scheduler.run(tokio::time::sleep(Duration::from_secs(190))).await;

        assert_eq!(cycle_starts(&source, start), vec![0, 60, 121, 181]);
    }

    #[tokio::test(start_paused = true)]
    async fn webhook_rate_limit_rearms_timer() {
        let source = source();
        let webhook = FakeWebhook::failing(429);
        let mut scheduler = scheduler(&source, &webhook);
        let start = Instant::now();

        scheduler.run(tokio::time::sleep(Duration::from_secs(190))).await;

        // every delivery is rejected one second into the cycle
        assert_eq!(cycle_starts(&source, start), vec![0, 61, 122, 183]);
        assert!(webhook.delivered().is_empty());
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn other_failures_keep_the_schedule() {
        let source = source();
        let webhook = FakeWebhook::failing(503);
        let mut scheduler = scheduler(&source, &webhook);
        let start = Instant::now();

        scheduler.run(tokio::time::sleep(Duration::from_secs(125))).await;

        assert_eq!(cycle_starts(&source, start), vec![0, 60, 120]);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_device_is_not_fatal() {
        let source = FakeSource::with_device("CC:DD", json!({}));
        let webhook = FakeWebhook::default();
        let mut scheduler = scheduler(&source, &webhook);
        let start = Instant::now();

        scheduler.run(tokio::time::sleep(Duration::from_secs(65))).await;

        assert_eq!(cycle_starts(&source, start), vec![0, 60]);
        assert!(webhook.delivered().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_after_first_cycle() {
        let source = source();
        let webhook = FakeWebhook::default();
        let mut scheduler = scheduler(&source, &webhook);

        scheduler.run(std::future::ready(())).await;

        assert_eq!(webhook.delivered().len(), 1);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_outcome_drives_state() {
        let source = source();
        source.script([Some(429), Some(500)]);
        let webhook = FakeWebhook::default();
        let mut scheduler = scheduler(&source, &webhook);
        let mut ticker = tokio::time::interval(INTERVAL);
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        scheduler.run_cycle(&mut ticker).await;
        assert_eq!(scheduler.state(), SchedulerState::Backoff);

        scheduler.run_cycle(&mut ticker).await;
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        scheduler.run_cycle(&mut ticker).await;
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(webhook.delivered().len(), 1);
    }
}
