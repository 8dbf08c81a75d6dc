use std::time::Duration;

use derive_new::new;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::config::Config;
use crate::poll::{self, LiveSearch};
use crate::time;

/// Lifecycle of a [Watcher].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Waiting,
    Polling,
    ShuttingDown,
    Terminated,
}

/// Polls a channel for livestreams on a fixed period until cancelled.
#[derive(Debug, new)]
pub struct Watcher<S> {
    search: S,
    config: Config,
    #[new(value = "time::DEFAULT_PERIOD")]
    period: Duration,
    #[new(value = "State::Idle")]
    state: State,
}

impl<S: LiveSearch> Watcher<S> {
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Poll once per period until `token` is cancelled or a poll fails.
    ///
    /// Cancellation ends the loop with `Ok(())`. A poll error ends it right away
    /// and is returned as is. A poll that is already running when the token is
    /// cancelled is allowed to finish; the loop exits at the next tick boundary.
    #[instrument(skip_all, fields(channel = %self.config.channel, period = ?self.period))]
    pub async fn run(&mut self, token: &CancellationToken) -> Result<(), S::Error> {
        if self.state == State::Terminated {
            return Ok(());
        }

        let mut timer = time::ticker(self.period);
        self.transition(State::Waiting);

        loop {
            if token.is_cancelled() {
                break;
            }

            select! {
                biased;

                _ = token.cancelled() => break,
                _ = timer.tick() => {}
            }

            self.transition(State::Polling);

            let result = poll::poll_once(&self.search, &self.config).await;

            if let Err(error) = result {
                self.transition(State::Terminated);
                return Err(error);
            }

            if token.is_cancelled() {
                break;
            }

            self.transition(State::Waiting);
        }

        self.transition(State::ShuttingDown);
        tracing::info!("cancellation observed, stopping");
        self.transition(State::Terminated);

        Ok(())
    }

    fn transition(&mut self, next: State) {
        tracing::trace!(from = ?self.state, to = ?next, "watcher state changed");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tokio::time::Instant;
    use tracing::Level;

    use super::*;
    use crate::logger::capture::Logs;
    use crate::poll::fake::{FakeError, FakeSearch};
    use crate::youtube::LiveItem;

    const PERIOD: Duration = Duration::from_secs(1);

    fn watcher(search: FakeSearch) -> Watcher<FakeSearch> {
        Watcher::new(search, Config::new("test-key", "UC1234")).with_period(PERIOD)
    }

    fn failure(reason: &str) -> FakeError {
        FakeError {
            reason: reason.to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_first_tick_never_polls() {
        let search = FakeSearch::new([]);
        let token = CancellationToken::new();
        token.cancel();

        let mut watcher = watcher(search.clone());
        watcher.run(&token).await.unwrap();

        assert_eq!(search.calls(), 0);
        assert_eq!(watcher.state(), State::Terminated);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_during_wait_exits_without_another_poll() {
        let search = FakeSearch::new([]);
        let token = CancellationToken::new();

        tokio::spawn({
            let token = token.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(2500)).await;
                token.cancel();
            }
        });

        let begin = Instant::now();
        let mut watcher = watcher(search.clone());
        watcher.run(&token).await.unwrap();

        assert_eq!(search.calls(), 2, "polls at 1s and 2s only");
        assert_eq!(begin.elapsed(), Duration::from_millis(2500), "exit right at cancellation");
    }

    #[tokio::test(start_paused = true)]
    async fn error_on_tick_n_stops_after_n_polls() {
        let search = FakeSearch::new([Ok(vec![]), Ok(vec![]), Err(failure("quotaExceeded")), Ok(vec![])]);
        let token = CancellationToken::new();

        let mut watcher = watcher(search.clone());
        let error = watcher.run(&token).await.unwrap_err();

        assert_eq!(error, failure("quotaExceeded"));
        assert_eq!(search.calls(), 3);
        assert_eq!(watcher.state(), State::Terminated);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_results_keep_the_loop_running() {
        let search = FakeSearch::new([]);
        let token = CancellationToken::new();

        tokio::spawn({
            let token = token.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(10_500)).await;
                token.cancel();
            }
        });

        watcher(search.clone()).run(&token).await.unwrap();
        assert_eq!(search.calls(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn polls_never_overlap() {
        let search = FakeSearch::new([]).with_latency(Duration::from_millis(1500));
        let token = CancellationToken::new();

        tokio::spawn({
            let token = token.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(20)).await;
                token.cancel();
            }
        });

        watcher(search.clone()).run(&token).await.unwrap();

        assert!(search.calls() > 1);
        assert_eq!(search.max_in_flight(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_poll_finishes_before_exit() {
        let token = CancellationToken::new();
        let search = FakeSearch::new([]).with_latency(Duration::from_secs(2));

        tokio::spawn({
            let token = token.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(1500)).await;
                token.cancel();
            }
        });

        let begin = Instant::now();
        watcher(search.clone()).run(&token).await.unwrap();

        assert_eq!(search.calls(), 1);
        assert_eq!(begin.elapsed(), Duration::from_secs(3), "tick at 1s plus 2s of latency");
    }

    #[tokio::test(start_paused = true)]
    async fn reports_live_item_then_shuts_down() {
        let live = LiveItem::new("abc", "Live Now");
        let token = CancellationToken::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let search = FakeSearch::new([Ok(vec![]), Ok(vec![]), Ok(vec![live])]).on_call({
            let token = token.clone();
            let seen = seen.clone();
            move |call| {
                seen.store(call, Ordering::SeqCst);
                if call == 3 {
                    token.cancel();
                }
            }
        });

        let (logs, _guard) = Logs::install();
        let begin = Instant::now();
        let mut watcher = watcher(search.clone());
        watcher.run(&token).await.unwrap();

        assert_eq!(search.calls(), 3);
        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert_eq!(begin.elapsed(), Duration::from_secs(3), "no wait for a fourth tick");
        assert_eq!(watcher.state(), State::Terminated);

        assert_eq!(logs.count(Level::INFO, "no livestream"), 2);
        assert_eq!(logs.count(Level::INFO, "live"), 1);
        assert_eq!(logs.count_level(Level::ERROR), 0);

        let live = logs.events().into_iter().find(|event| event.message == "live").unwrap();
        assert_eq!(live.fields.get("video.id").map(String::as_str), Some("abc"));
        assert_eq!(live.fields.get("video.title").map(String::as_str), Some("Live Now"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_poll_goes_straight_to_shutdown() {
        let token = CancellationToken::new();
        let search = FakeSearch::new([]).on_call({
            let token = token.clone();
            move |_| token.cancel()
        });

        let (logs, _guard) = Logs::install();
        watcher(search.clone()).run(&token).await.unwrap();

        let transitions: Vec<(String, String)> = logs
            .events()
            .into_iter()
            .filter(|event| event.message == "watcher state changed")
            .map(|event| (event.fields["from"].clone(), event.fields["to"].clone()))
            .collect();

        let expected = [
            ("Idle", "Waiting"),
            ("Waiting", "Polling"),
            ("Polling", "ShuttingDown"),
            ("ShuttingDown", "Terminated"),
        ]
        .map(|(from, to)| (from.to_string(), to.to_string()));

        assert_eq!(transitions, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_results_never_log_errors() {
        let search = FakeSearch::new([]);
        let token = CancellationToken::new();

        tokio::spawn({
            let token = token.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(5500)).await;
                token.cancel();
            }
        });

        let (logs, _guard) = Logs::install();
        watcher(search.clone()).run(&token).await.unwrap();

        assert_eq!(logs.count(Level::INFO, "no livestream"), 5);
        assert_eq!(logs.count_level(Level::ERROR), 0);
        assert_eq!(logs.count_level(Level::WARN), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_error_is_returned_without_logging_it() {
        let search = FakeSearch::new([Err(failure("forbidden"))]);
        let token = CancellationToken::new();

        let (logs, _guard) = Logs::install();
        let error = watcher(search).run(&token).await.unwrap_err();

        assert_eq!(error, failure("forbidden"));
        assert_eq!(logs.count_level(Level::ERROR), 0, "the caller logs fatal errors");
    }

    #[tokio::test(start_paused = true)]
    async fn terminated_watcher_does_not_run_again() {
        let search = FakeSearch::new([Err(failure("forbidden"))]);
        let token = CancellationToken::new();

        let mut watcher = watcher(search.clone());
        watcher.run(&token).await.unwrap_err();
        watcher.run(&token).await.unwrap();

        assert_eq!(search.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn double_cancel_is_a_single_shutdown() {
        let search = FakeSearch::new([]);
        let token = CancellationToken::new();

        tokio::spawn({
            let token = token.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(1500)).await;
                token.cancel();
                token.cancel();
            }
        });

        let mut watcher = watcher(search.clone());
        watcher.run(&token).await.unwrap();

        assert_eq!(search.calls(), 1);
        assert_eq!(watcher.state(), State::Terminated);
    }
}
