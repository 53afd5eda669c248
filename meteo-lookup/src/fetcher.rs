//! Per-city request coalescing in front of the weather provider.
//!
//! Concurrent cache misses for the same city must not each hit the
//! rate-limited provider. The first caller to miss becomes the leader and
//! performs the fetch; everyone else parks on a watch channel and receives
//! the leader's outcome. Different cities never block each other: the table
//! lock is held only to install or observe a marker, never across the
//! network call.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use meteo_cache::WeatherCache;
use meteo_core::error::{MeteoError, Result};
use meteo_core::traits::WeatherProvider;
use meteo_core::types::{CityKey, WeatherReport};

/// One fetch outcome, shared verbatim with every coalesced caller.
type Outcome = Result<WeatherReport>;

/// What a caller found in the in-flight table.
enum Flight {
    /// This caller installed the marker and must perform the fetch.
    Leader(watch::Sender<Option<Outcome>>),
    /// Another caller is already fetching; wait for its outcome.
    Waiter(watch::Receiver<Option<Outcome>>),
}

/// Fetch-once orchestrator: at most one outstanding provider call per city.
///
/// On success the leader populates the cache before releasing waiters, so a
/// cache read that races the resolution can only see the new value or a miss,
/// never a torn state. Failures leave the cache untouched (no negative
/// caching); the very next caller starts a fresh fetch.
pub struct CoalescingFetcher {
    provider: Arc<dyn WeatherProvider>,
    cache: Option<Arc<WeatherCache>>,
    in_flight: Mutex<HashMap<CityKey, watch::Receiver<Option<Outcome>>>>,
}

impl CoalescingFetcher {
    /// Creates a fetcher over the given provider and optional cache.
    pub fn new(provider: Arc<dyn WeatherProvider>, cache: Option<Arc<WeatherCache>>) -> Self {
        Self {
            provider,
            cache,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Number of cities with a fetch currently outstanding.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Fetches the city's weather, joining an in-flight fetch if one exists.
    ///
    /// All callers coalesced onto one provider call receive the identical
    /// outcome. Dropping a waiter detaches only that waiter; dropping the
    /// leader resolves the marker with [`MeteoError::Cancelled`] so nobody is
    /// left parked.
    #[instrument(skip(self))]
    pub async fn fetch_once(&self, city: &CityKey) -> Outcome {
        // Check-and-create must be atomic with respect to other callers for
        // the same city: exactly one caller wins the insert.
        let flight = {
            let mut table = self.in_flight.lock();
            match table.get(city) {
                Some(rx) => Flight::Waiter(rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    table.insert(city.clone(), rx);
                    Flight::Leader(tx)
                }
            }
        };

        match flight {
            Flight::Waiter(rx) => {
                debug!(%city, "Joining in-flight fetch");
                self.wait_for_leader(city, rx).await
            }
            Flight::Leader(tx) => {
                debug!(%city, "Leading fetch");
                self.lead_fetch(city, tx).await
            }
        }
    }

    /// Leader path: fetch from the provider, populate the cache on success,
    /// resolve the marker either way.
    async fn lead_fetch(&self, city: &CityKey, tx: watch::Sender<Option<Outcome>>) -> Outcome {
        // Resolves with Cancelled and removes the marker if this future is
        // dropped mid-fetch, so waiters never hang on an abandoned leader.
        let mut guard = FlightGuard {
            table: &self.in_flight,
            city: city.clone(),
            tx: Some(tx),
        };

        let outcome = self.provider.fetch(city).await;

        match &outcome {
            Ok(report) => {
                if let Some(cache) = &self.cache {
                    cache.put(city, report.clone());
                }
            }
            Err(err) => {
                warn!(%city, error = %err, "Fetch failed");
            }
        }

        guard.resolve(outcome.clone());
        outcome
    }

    /// Waiter path: park until the leader resolves the marker.
    async fn wait_for_leader(
        &self,
        city: &CityKey,
        mut rx: watch::Receiver<Option<Outcome>>,
    ) -> Outcome {
        loop {
            let resolved = rx.borrow_and_update().clone();
            if let Some(outcome) = resolved {
                return outcome;
            }
            if rx.changed().await.is_err() {
                // Sender gone without a value. The leader's guard always
                // resolves before dropping the sender, so this is unreachable
                // in practice; fail closed rather than park forever.
                return Err(MeteoError::Cancelled(format!(
                    "fetch for '{city}' was abandoned before it resolved"
                )));
            }
        }
    }
}

/// Marker lifetime guard held by the leader.
///
/// The in-flight table keeps a receiver clone until the entry is removed, so
/// the `send` here can never fail for lack of receivers: every waiter,
/// present or future, observes the resolution.
struct FlightGuard<'a> {
    table: &'a Mutex<HashMap<CityKey, watch::Receiver<Option<Outcome>>>>,
    city: CityKey,
    tx: Option<watch::Sender<Option<Outcome>>>,
}

impl FlightGuard<'_> {
    fn resolve(&mut self, outcome: Outcome) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Some(outcome));
        }
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Some(Err(MeteoError::Cancelled(format!(
                "fetch for '{}' was cancelled",
                self.city
            )))));
        }
        self.table.lock().remove(&self.city);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use futures::future::join_all;
    use tokio::sync::Notify;

    fn key(raw: &str) -> CityKey {
        CityKey::parse(raw).unwrap()
    }

    fn report_for(city: &CityKey) -> WeatherReport {
        WeatherReport {
            city: city.as_str().to_string(),
            temperature_c: 22.5,
            description: "ensoleillé".into(),
            humidity_pct: 56,
            wind_speed_ms: 3.4,
        }
    }

    /// Provider that counts calls and replays scripted outcomes, defaulting
    /// to success once the script is exhausted.
    struct ScriptedProvider {
        calls: AtomicUsize,
        script: Mutex<VecDeque<Outcome>>,
        delay: Option<Duration>,
    }

    impl ScriptedProvider {
        fn ok() -> Self {
            Self::with_script(vec![])
        }

        fn with_script(script: Vec<Outcome>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                script: Mutex::new(script.into()),
                delay: None,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WeatherProvider for ScriptedProvider {
        async fn fetch(&self, city: &CityKey) -> Result<WeatherReport> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match self.script.lock().pop_front() {
                Some(outcome) => outcome,
                None => Ok(report_for(city)),
            }
        }
    }

    /// Provider whose first call parks on a notify; later calls succeed.
    struct StallingProvider {
        calls: AtomicUsize,
        release: Notify,
    }

    impl StallingProvider {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                release: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl WeatherProvider for StallingProvider {
        async fn fetch(&self, city: &CityKey) -> Result<WeatherReport> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.release.notified().await;
            }
            Ok(report_for(city))
        }
    }

    #[tokio::test]
    async fn test_concurrent_misses_coalesce_into_one_call() {
        let provider = Arc::new(ScriptedProvider::ok().with_delay(Duration::from_millis(50)));
        let fetcher = Arc::new(CoalescingFetcher::new(provider.clone(), None));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let fetcher = fetcher.clone();
                tokio::spawn(async move { fetcher.fetch_once(&key("paris")).await })
            })
            .collect();

        let results: Vec<Outcome> = join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(provider.calls(), 1, "exactly one provider call");
        let first = results[0].clone().unwrap();
        for result in results {
            assert_eq!(result.unwrap(), first);
        }
        assert_eq!(fetcher.in_flight(), 0, "marker removed after resolution");
    }

    #[tokio::test]
    async fn test_waiters_share_the_leader_failure() {
        let provider = Arc::new(
            ScriptedProvider::with_script(vec![Err(MeteoError::ProviderUnavailable {
                reason: "HTTP 502".into(),
            })])
            .with_delay(Duration::from_millis(50)),
        );
        let fetcher = Arc::new(CoalescingFetcher::new(provider.clone(), None));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let fetcher = fetcher.clone();
                tokio::spawn(async move { fetcher.fetch_once(&key("paris")).await })
            })
            .collect();

        for result in join_all(tasks).await {
            assert_eq!(
                result.unwrap().unwrap_err(),
                MeteoError::ProviderUnavailable { reason: "HTTP 502".into() }
            );
        }
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached_and_next_call_fetches_again() {
        let provider = Arc::new(ScriptedProvider::with_script(vec![Err(
            MeteoError::ProviderUnavailable { reason: "timeout".into() },
        )]));
        let fetcher = CoalescingFetcher::new(provider.clone(), None);

        assert!(fetcher.fetch_once(&key("paris")).await.is_err());
        assert!(fetcher.fetch_once(&key("paris")).await.is_ok());
        assert_eq!(provider.calls(), 2, "failure must not suppress a retry");
    }

    #[tokio::test]
    async fn test_leader_populates_cache_on_success() {
        let provider = Arc::new(ScriptedProvider::ok());
        let cache = Arc::new(WeatherCache::new());
        let fetcher = CoalescingFetcher::new(provider, Some(cache.clone()));

        let report = fetcher.fetch_once(&key("marseille")).await.unwrap();
        assert_eq!(cache.get(&key("marseille")), Some(report));
    }

    #[tokio::test]
    async fn test_failure_leaves_cache_untouched() {
        let provider = Arc::new(ScriptedProvider::with_script(vec![Err(
            MeteoError::ProviderUnavailable { reason: "HTTP 503".into() },
        )]));
        let cache = Arc::new(WeatherCache::new());
        let fetcher = CoalescingFetcher::new(provider, Some(cache.clone()));

        assert!(fetcher.fetch_once(&key("paris")).await.is_err());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_in_flight_city_does_not_block_other_cities() {
        let provider = Arc::new(StallingProvider::new());
        let fetcher = Arc::new(CoalescingFetcher::new(provider.clone(), None));

        // Park a leader on "a" indefinitely.
        let stalled = {
            let fetcher = fetcher.clone();
            tokio::spawn(async move { fetcher.fetch_once(&key("a")).await })
        };
        tokio::task::yield_now().await;
        assert_eq!(fetcher.in_flight(), 1);

        // "b" must complete while "a" is still in flight.
        let b = tokio::time::timeout(Duration::from_secs(1), fetcher.fetch_once(&key("b")))
            .await
            .expect("lookup for another city must not be blocked")
            .unwrap();
        assert_eq!(b.city, "b");

        provider.release.notify_one();
        stalled.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_leader_releases_waiters() {
        let provider = Arc::new(StallingProvider::new());
        let fetcher = Arc::new(CoalescingFetcher::new(provider.clone(), None));

        let leader = {
            let fetcher = fetcher.clone();
            tokio::spawn(async move { fetcher.fetch_once(&key("paris")).await })
        };
        tokio::task::yield_now().await;
        assert_eq!(fetcher.in_flight(), 1);

        let waiter = {
            let fetcher = fetcher.clone();
            tokio::spawn(async move { fetcher.fetch_once(&key("paris")).await })
        };
        tokio::task::yield_now().await;

        // Abandon the leader mid-fetch; its guard must resolve the marker.
        leader.abort();
        let outcome = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter must not hang on a cancelled leader")
            .unwrap();
        assert!(matches!(outcome, Err(MeteoError::Cancelled(_))));
        assert_eq!(fetcher.in_flight(), 0);

        // A fresh call starts a fresh fetch (second call does not stall).
        let report = fetcher.fetch_once(&key("paris")).await.unwrap();
        assert_eq!(report.city, "paris");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dropped_waiter_does_not_disturb_the_fetch() {
        let provider = Arc::new(ScriptedProvider::ok().with_delay(Duration::from_millis(50)));
        let fetcher = Arc::new(CoalescingFetcher::new(provider.clone(), None));

        let leader = {
            let fetcher = fetcher.clone();
            tokio::spawn(async move { fetcher.fetch_once(&key("paris")).await })
        };
        tokio::task::yield_now().await;

        // A waiter with its own deadline gives up early.
        let impatient = tokio::time::timeout(
            Duration::from_millis(1),
            fetcher.fetch_once(&key("paris")),
        )
        .await;
        assert!(impatient.is_err(), "waiter deadline expires first");

        // Leader and remaining callers are unaffected.
        let report = leader.await.unwrap().unwrap();
        assert_eq!(report.city, "paris");
        assert_eq!(provider.calls(), 1);
    }
}
