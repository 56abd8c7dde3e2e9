//! Scheduled re-resolution.
//!
//! [`PeriodicResolver`] wraps any inner [`Resolver`] and re-triggers its
//! `resolve_now` on a fixed cadence, so address sets track scale events
//! without an external push mechanism.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::resolver::Resolver;

/// Default cadence for scheduled re-resolution.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Wraps an inner resolver with a recurring re-resolution timer.
///
/// Lifecycle is Active → Closed: while Active, each timer tick forwards to
/// the inner resolver's `resolve_now`; [`Resolver::close`] stops the timer,
/// closes the inner resolver, and is terminal. Ticks and `resolve_now` calls
/// after close are no-ops. The inner resolver performs its own implicit
/// initial resolution at build; the timer only schedules refreshes.
#[derive(Debug)]
pub struct PeriodicResolver<R: Resolver + 'static> {
    inner: Arc<R>,
    closed: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl<R: Resolver + 'static> PeriodicResolver<R> {
    /// Wraps `inner` and starts the refresh timer.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn new(inner: R, interval: Duration) -> Self {
        let inner = Arc::new(inner);
        let (shutdown, shutdown_rx) = watch::channel(false);

        tokio::spawn(refresh_loop(Arc::clone(&inner), interval, shutdown_rx));

        Self {
            inner,
            closed: AtomicBool::new(false),
            shutdown,
        }
    }

    /// Wraps `inner` with the default 30s interval.
    #[must_use]
    pub fn with_default_interval(inner: R) -> Self {
        Self::new(inner, DEFAULT_REFRESH_INTERVAL)
    }
}

impl<R: Resolver + 'static> Resolver for PeriodicResolver<R> {
    /// Forwards immediately to the inner resolver, independent of the timer.
    fn resolve_now(&self) {
        if !self.closed.load(Ordering::SeqCst) {
            self.inner.resolve_now();
        }
    }

    /// Stops the timer and closes the inner resolver, exactly once.
    ///
    /// Safe under concurrent calls; only the first caller releases anything.
    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.shutdown.send(true);
            self.inner.close();
        }
    }
}

/// Timer task: tick → inner `resolve_now`, until shut down.
///
/// The shutdown branch is biased ahead of the ticker so no tick is processed
/// once `close` has returned. The sender being dropped (resolver abandoned
/// without close) also stops the task.
async fn refresh_loop<R: Resolver>(
    inner: Arc<R>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    // interval_at skips the immediate first tick a plain interval would fire.
    let mut ticker = time::interval_at(time::Instant::now() + interval, interval);

    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => inner.resolve_now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[derive(Clone, Debug, Default)]
    struct CountingResolver {
        resolves: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
    }

    impl CountingResolver {
        fn resolve_count(&self) -> usize {
            self.resolves.load(Ordering::SeqCst)
        }

        fn close_count(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    impl Resolver for CountingResolver {
        fn resolve_now(&self) {
            self.resolves.fetch_add(1, Ordering::SeqCst);
        }

        fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Advances the paused clock while giving the timer task a chance to run.
    async fn advance(duration: Duration) {
        tokio::task::yield_now().await;
        time::advance(duration).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_twice_over_65_seconds() {
        let inner = CountingResolver::default();
        let resolver = PeriodicResolver::new(inner.clone(), Duration::from_secs(30));

        advance(Duration::from_secs(30)).await;
        advance(Duration::from_secs(30)).await;
        advance(Duration::from_secs(5)).await;

        assert_eq!(inner.resolve_count(), 2);
        resolver.close();
    }

    #[tokio::test(start_paused = true)]
    async fn no_tick_before_first_interval_elapses() {
        let inner = CountingResolver::default();
        let resolver = PeriodicResolver::new(inner.clone(), Duration::from_secs(30));

        advance(Duration::from_secs(29)).await;

        assert_eq!(inner.resolve_count(), 0);
        resolver.close();
    }

    #[tokio::test(start_paused = true)]
    async fn no_ticks_after_close() {
        let inner = CountingResolver::default();
        let resolver = PeriodicResolver::new(inner.clone(), Duration::from_secs(30));

        advance(Duration::from_secs(65)).await;
        resolver.close();
        advance(Duration::from_secs(120)).await;

        assert_eq!(inner.resolve_count(), 2);
    }

    #[tokio::test]
    async fn resolve_now_forwards_to_inner() {
        let inner = CountingResolver::default();
        let resolver = PeriodicResolver::new(inner.clone(), Duration::from_secs(30));

        resolver.resolve_now();
        resolver.resolve_now();

        assert_eq!(inner.resolve_count(), 2);
        resolver.close();
    }

    #[tokio::test]
    async fn resolve_now_after_close_is_a_no_op() {
        let inner = CountingResolver::default();
        let resolver = PeriodicResolver::new(inner.clone(), Duration::from_secs(30));

        resolver.close();
        resolver.resolve_now();

        assert_eq!(inner.resolve_count(), 0);
    }

    #[tokio::test]
    async fn close_twice_closes_inner_once() {
        let inner = CountingResolver::default();
        let resolver = PeriodicResolver::new(inner.clone(), Duration::from_secs(30));

        resolver.close();
        resolver.close();

        assert_eq!(inner.close_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_close_closes_inner_once() {
        let inner = CountingResolver::default();
        let resolver = Arc::new(PeriodicResolver::new(inner.clone(), Duration::from_secs(30)));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                tokio::spawn(async move { resolver.close() })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(inner.close_count(), 1);
    }

    #[test]
    fn default_interval_is_30_seconds() {
        assert_eq!(DEFAULT_REFRESH_INTERVAL, Duration::from_secs(30));
    }
}
