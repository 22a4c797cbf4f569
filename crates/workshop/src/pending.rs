//! Deferred completions and the callback pump.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::WorkshopError;
use crate::client::WorkshopClient;

/// How often the pump dispatches callbacks by default.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(1);

/// Creates a linked completion/pending pair.
pub fn pending<T>() -> (Completion<T>, PendingCall<T>) {
    let (tx, rx) = oneshot::channel();
    (Completion { tx }, PendingCall { rx })
}

/// Backend half of a queued operation.
#[derive(Debug)]
pub struct Completion<T> {
    tx: oneshot::Sender<Result<T, WorkshopError>>,
}

impl<T> Completion<T> {
    /// Delivers the result. A caller that stopped waiting is ignored.
    pub fn complete(self, result: Result<T, WorkshopError>) {
        let _ = self.tx.send(result);
    }
}

/// Caller half of a queued operation.
///
/// Awaiting it directly never drives the backend; use [`Pump::wait`]
/// unless something else is running callbacks.
#[derive(Debug)]
pub struct PendingCall<T> {
    rx: oneshot::Receiver<Result<T, WorkshopError>>,
}

impl<T> PendingCall<T> {
    /// A call that has already completed.
    pub fn ready(result: Result<T, WorkshopError>) -> Self {
        let (completion, call) = pending();
        completion.complete(result);
        call
    }

    /// Takes the result if it has been delivered.
    pub fn try_take(&mut self) -> Option<Result<T, WorkshopError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(WorkshopError::Dropped)),
        }
    }
}

impl<T> Future for PendingCall<T> {
    type Output = Result<T, WorkshopError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(WorkshopError::Dropped)))
    }
}

/// Awaits pending calls while running the client's callbacks on a fixed
/// interval.
pub struct Pump<'a> {
    client: &'a dyn WorkshopClient,
    interval: Duration,
    timeout: Option<Duration>,
    cancel: CancellationToken,
    on_tick: Option<Box<dyn Fn() + Send + Sync + 'a>>,
}

impl<'a> Pump<'a> {
    pub fn new(client: &'a dyn WorkshopClient) -> Self {
        Self {
            client,
            interval: DEFAULT_UPDATE_INTERVAL,
            timeout: None,
            cancel: CancellationToken::new(),
            on_tick: None,
        }
    }

    /// Sets the callback interval. Zero is clamped to one millisecond.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Gives up on a single call after `timeout`. `None` waits forever.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Called after every callback dispatch.
    pub fn on_tick(mut self, on_tick: impl Fn() + Send + Sync + 'a) -> Self {
        self.on_tick = Some(Box::new(on_tick));
        self
    }

    pub fn client(&self) -> &'a dyn WorkshopClient {
        self.client
    }

    /// Waits for `call`, dispatching callbacks until it completes.
    pub async fn wait<T>(&self, mut call: PendingCall<T>) -> Result<T, WorkshopError> {
        if let Some(result) = call.try_take() {
            return result;
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // A timeout past the clock's range never fires.
        let deadline = self
            .timeout
            .and_then(|t| Instant::now().checked_add(t));
        let expired = async {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(expired);

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => return Err(WorkshopError::Cancelled),
                result = &mut call => return result,
                _ = &mut expired => {
                    return Err(WorkshopError::TimedOut(self.timeout.unwrap_or_default()));
                }
                _ = ticker.tick() => {
                    self.client.run_callbacks();
                    if let Some(on_tick) = &self.on_tick {
                        on_tick();
                    }
                }
            }
        }
    }

    /// Waits for every call in order, stopping at the first failure.
    pub async fn wait_all<T>(&self, calls: Vec<PendingCall<T>>) -> Result<Vec<T>, WorkshopError> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            results.push(self.wait(call).await?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::{LocalWorkshop, LocalWorkshopConfig};
    use crate::types::AppId;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn local() -> (tempfile::TempDir, LocalWorkshop) {
        let dir = tempfile::tempdir().unwrap();
        let client =
            LocalWorkshop::initialize(LocalWorkshopConfig::new(dir.path(), AppId(480))).unwrap();
        (dir, client)
    }

    #[tokio::test]
    async fn ready_call_resolves_without_pumping() {
        let (_dir, client) = local();
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let pump = Pump::new(&client).on_tick(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let value = pump.wait(PendingCall::ready(Ok(7))).await.unwrap();
        assert_eq!(value, 7);
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn completion_only_arrives_through_callbacks() {
        let (_dir, client) = local();
        let mut call = client.enumerate_published_files();
        assert!(call.try_take().is_none());

        client.run_callbacks();
        let ids = call.try_take().unwrap().unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn pump_drives_callbacks_and_ticks() {
        let (_dir, client) = local();
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let pump = Pump::new(&client)
            .interval(Duration::from_millis(1))
            .on_tick(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        let ids = pump.wait(client.enumerate_published_files()).await.unwrap();
        assert!(ids.is_empty());
        assert!(ticks.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn dropped_completion_reports_dropped() {
        let (completion, call) = pending::<()>();
        drop(completion);
        assert!(matches!(call.await, Err(WorkshopError::Dropped)));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_when_never_completed() {
        let (_dir, client) = local();
        let (_completion, call) = pending::<()>();
        let pump = Pump::new(&client)
            .interval(Duration::from_millis(10))
            .timeout(Some(Duration::from_millis(50)));

        let result = pump.wait(call).await;
        assert!(matches!(result, Err(WorkshopError::TimedOut(d)) if d == Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn unbounded_timeout_still_completes() {
        let (_dir, client) = local();
        let pump = Pump::new(&client)
            .interval(Duration::from_millis(1))
            .timeout(Some(Duration::from_secs(u64::MAX)));

        let ids = pump.wait(client.enumerate_published_files()).await.unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn cancellation_stops_waiting() {
        let (_dir, client) = local();
        let (_completion, call) = pending::<()>();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let pump = Pump::new(&client).cancel_token(cancel);

        assert!(matches!(pump.wait(call).await, Err(WorkshopError::Cancelled)));
    }

    #[tokio::test]
    async fn wait_all_stops_at_first_failure() {
        let (_dir, client) = local();
        let pump = Pump::new(&client).interval(Duration::from_millis(1));
        let calls = vec![
            PendingCall::ready(Ok(1)),
            PendingCall::ready(Err(WorkshopError::Rejected("no".into()))),
            PendingCall::ready(Ok(3)),
        ];
        assert!(matches!(
            pump.wait_all(calls).await,
            Err(WorkshopError::Rejected(_))
        ));
    }
}
