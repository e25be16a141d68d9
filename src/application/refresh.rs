// Periodically refreshed view snapshots bound to the view's lifetime
use chrono::NaiveDateTime;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Live dashboards refresh every 10 seconds.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

type Fetch<S> = Box<dyn Fn() -> BoxFuture<'static, anyhow::Result<S>> + Send + Sync>;

/// What a view currently shows.
#[derive(Debug, Clone)]
pub struct ViewState<S> {
    /// Last good snapshot, kept across failed fetches.
    pub snapshot: Option<S>,
    pub loading: bool,
    pub last_updated: Option<NaiveDateTime>,
}

impl<S> Default for ViewState<S> {
    fn default() -> Self {
        Self {
            snapshot: None,
            loading: false,
            last_updated: None,
        }
    }
}

struct Inner<S> {
    name: &'static str,
    state: RwLock<ViewState<S>>,
    generation: AtomicU64,
    fetch: Fetch<S>,
}

impl<S: Send + Sync + 'static> Inner<S> {
    /// Returns true when the result was applied.
    async fn refresh(&self) -> bool {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.write().await.loading = true;

        let result = (self.fetch)().await;

        let mut state = self.state.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(view = self.name, generation, "discarding superseded fetch");
            return false;
        }
        state.loading = false;
        match result {
            Ok(snapshot) => {
                state.snapshot = Some(snapshot);
                state.last_updated = Some(chrono::Local::now().naive_local());
                true
            }
            Err(e) => {
                tracing::warn!(view = self.name, "refresh failed, keeping last snapshot: {:#}", e);
                false
            }
        }
    }
}

/// A view snapshot plus the task that keeps it fresh.
///
/// Polling stops when the view is dropped or disposed.
pub struct LiveView<S> {
    inner: Arc<Inner<S>>,
    cancel: CancellationToken,
}

impl<S> LiveView<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut>(name: &'static str, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<S>> + Send + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                name,
                state: RwLock::new(ViewState::default()),
                generation: AtomicU64::new(0),
                fetch: Box::new(move || fetch().boxed()),
            }),
            cancel: CancellationToken::new(),
        }
    }

    /// Fetch now, then every `interval` until disposed.
    ///
    /// Ticks that fall due while a fetch is still running are skipped, so a
    /// backend slower than the interval still gets its results applied.
    pub fn start(self, interval: Duration) -> Self {
        let inner = self.inner.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = inner.refresh() => {}
                        }
                    }
                }
            }
            tracing::debug!(view = inner.name, "refresh task stopped");
        });
        self
    }

    /// Fetch immediately, superseding any fetch still in flight.
    pub async fn refresh_now(&self) -> bool {
        self.inner.refresh().await
    }

    pub async fn state(&self) -> ViewState<S> {
        self.inner.state.read().await.clone()
    }

    pub async fn snapshot(&self) -> Option<S> {
        self.inner.state.read().await.snapshot.clone()
    }

    /// Edit the held snapshot in place. Fetches already in flight are
    /// superseded so they cannot overwrite the edit with older data.
    pub async fn update<F, R>(&self, edit: F) -> Option<R>
    where
        F: FnOnce(&mut S) -> R,
    {
        let mut state = self.inner.state.write().await;
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        state.loading = false;
        state.snapshot.as_mut().map(edit)
    }

    pub fn dispose(&self) {
        self.cancel.cancel();
    }

    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl<S> Drop for LiveView<S> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
