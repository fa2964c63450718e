//! Drive-time resolution with a deterministic offline fallback.
//!
//! Callers always get an answer immediately: a cache hit when the external
//! service has already resolved the pair, otherwise the street-grammar
//! heuristic. Async resolution silently upgrades the cache; per-pair
//! network failures are swallowed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use futures::StreamExt;
use regex::Regex;
use tokio::sync::RwLock;

use crate::provider::{DriveTime, RouteProvider};

/// Concurrent in-flight pair resolutions per batch.
const PAIR_CONCURRENCY: usize = 8;

/// Same street, bucketed by house-number delta.
const SAME_STREET_BUCKETS: [(i64, u32); 3] = [(50, 2), (200, 3), (400, 5)];
const SAME_STREET_FAR_MINUTES: u32 = 7;

/// Streets sharing a name token longer than three characters.
const SHARED_NAME_MINUTES: u32 = 8;
const SHARED_NAME_MIN_TOKEN_LEN: usize = 3;

/// Same street type, close house numbers.
const SAME_TYPE_NEAR_DELTA: i64 = 200;
const SAME_TYPE_NEAR_MINUTES: u32 = 10;

/// Unrelated streets, bucketed by house-number delta.
const CROSS_STREET_BUCKETS: [(i64, u32); 5] =
    [(100, 8), (300, 12), (500, 15), (1000, 18), (2000, 22)];
const CROSS_STREET_FAR_MINUTES: u32 = 25;

fn street_type_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(lane|ln|drive|dr|street|st|road|rd|avenue|ave|circle|cir|court|ct|way|boulevard|blvd)\.?$")
            .unwrap()
    })
}

fn canonical_street_type(token: &str) -> Option<&'static str> {
    if !street_type_regex().is_match(token) {
        return None;
    }
    let token = token.trim_end_matches('.').to_lowercase();
    Some(match token.as_str() {
        "lane" | "ln" => "lane",
        "drive" | "dr" => "drive",
        "street" | "st" => "street",
        "road" | "rd" => "road",
        "avenue" | "ave" => "avenue",
        "circle" | "cir" => "circle",
        "court" | "ct" => "court",
        "way" => "way",
        "boulevard" | "blvd" => "boulevard",
        _ => return None,
    })
}

#[derive(Debug, PartialEq)]
struct ParsedAddress {
    house_number: Option<i64>,
    /// Lowercased street name without the type token.
    street_name: String,
    street_type: Option<&'static str>,
}

fn parse_address(address: &str) -> ParsedAddress {
    let tokens: Vec<&str> = address.split_whitespace().collect();

    let house_number = tokens.first().and_then(|t| {
        let digits: String = t.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    });
    let name_start = if house_number.is_some() { 1 } else { 0 };

    let type_index = tokens
        .iter()
        .enumerate()
        .skip(name_start)
        .rev()
        .find_map(|(i, t)| canonical_street_type(t).map(|c| (i, c)));

    let name_end = type_index.map(|(i, _)| i).unwrap_or(tokens.len());
    let street_name = tokens[name_start.min(tokens.len())..name_end]
        .join(" ")
        .to_lowercase();

    ParsedAddress {
        house_number,
        street_name,
        street_type: type_index.map(|(_, c)| c),
    }
}

fn shares_name_token(a: &str, b: &str) -> bool {
    a.split_whitespace()
        .filter(|t| t.len() > SHARED_NAME_MIN_TOKEN_LEN)
        .any(|t| b.split_whitespace().any(|other| other == t))
}

fn bucket(delta: i64, buckets: &[(i64, u32)], far: u32) -> u32 {
    buckets
        .iter()
        .find(|(limit, _)| delta < *limit)
        .map(|(_, minutes)| *minutes)
        .unwrap_or(far)
}

/// Resolves drive times through the route provider, with a directional
/// cache and an always-available offline fallback.
pub struct DriveTimeEstimator {
    provider: Arc<dyn RouteProvider>,
    cache: RwLock<HashMap<String, DriveTime>>,
}

impl DriveTimeEstimator {
    pub fn new(provider: Arc<dyn RouteProvider>) -> Self {
        Self {
            provider,
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn cache_key(from: &str, to: &str) -> String {
        // Directional on purpose: A->B and B->A are separate entries.
        format!("{}|{}", from, to)
    }

    /// Deterministic street-grammar estimate. Never touches the network.
    pub fn fallback(from: &str, to: &str) -> DriveTime {
        let a = parse_address(from);
        let b = parse_address(to);

        let delta = match (a.house_number, b.house_number) {
            (Some(x), Some(y)) => (x - y).abs(),
            _ => i64::MAX,
        };

        let same_street = !a.street_name.is_empty()
            && a.street_name == b.street_name
            && a.street_type == b.street_type;

        let minutes = if same_street {
            bucket(delta, &SAME_STREET_BUCKETS, SAME_STREET_FAR_MINUTES)
        } else if shares_name_token(&a.street_name, &b.street_name) {
            SHARED_NAME_MINUTES
        } else if a.street_type.is_some()
            && a.street_type == b.street_type
            && delta < SAME_TYPE_NEAR_DELTA
        {
            SAME_TYPE_NEAR_MINUTES
        } else {
            bucket(delta, &CROSS_STREET_BUCKETS, CROSS_STREET_FAR_MINUTES)
        };

        DriveTime::from_minutes(minutes)
    }

    /// Immediate estimate: cache hit if the pair has been resolved,
    /// otherwise the fallback.
    pub async fn estimate(&self, from: &str, to: &str) -> DriveTime {
        if let Some(hit) = self.cache.read().await.get(&Self::cache_key(from, to)) {
            return hit.clone();
        }
        Self::fallback(from, to)
    }

    /// Resolve a pair through the provider, upgrading the cache on
    /// success. Failures fall back to the offline estimate and are not
    /// cached, so a later attempt can still upgrade.
    pub async fn resolve(&self, from: &str, to: &str) -> DriveTime {
        let key = Self::cache_key(from, to);
        if let Some(hit) = self.cache.read().await.get(&key) {
            return hit.clone();
        }

        match self.provider.drive_time(from, to).await {
            Ok(Some(resolved)) => {
                self.cache.write().await.insert(key, resolved.clone());
                resolved
            }
            Ok(None) => Self::fallback(from, to),
            Err(e) => {
                tracing::debug!("Drive time lookup failed for {} -> {}: {}", from, to, e);
                Self::fallback(from, to)
            }
        }
    }

    /// Resolve a whole pair set concurrently.
    ///
    /// `on_complete` fires exactly once, when the resolved count reaches
    /// the expected count; the one-shot guard holds even though pairs
    /// complete on different tasks. Returns the number of pairs resolved.
    pub async fn resolve_batch<F>(&self, pairs: &[(String, String)], on_complete: F) -> usize
    where
        F: FnOnce() + Send,
    {
        let expected = pairs.len();
        let refresh = Mutex::new(Some(on_complete));
        if expected == 0 {
            if let Some(callback) = refresh.lock().ok().and_then(|mut g| g.take()) {
                callback();
            }
            return 0;
        }

        let resolved = AtomicUsize::new(0);

        futures::stream::iter(pairs)
            .map(|(from, to)| {
                let resolved = &resolved;
                let refresh = &refresh;
                async move {
                    self.resolve(from, to).await;
                    let done = resolved.fetch_add(1, Ordering::SeqCst) + 1;
                    if done == expected
                        && let Some(callback) = refresh.lock().ok().and_then(|mut g| g.take())
                    {
                        callback();
                    }
                }
            })
            .buffer_unordered(PAIR_CONCURRENCY)
            .for_each(|_| futures::future::ready(()))
            .await;

        resolved.load(Ordering::SeqCst)
    }

    /// Empty the cache. Called at the start of every full re-optimization
    /// pass so stale pairs cannot leak across routes.
    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use async_trait::async_trait;

    use super::*;
    use crate::error::RouteError;
    use crate::provider::{OptimizedRoute, RouteStop};

    struct FixedProvider {
        minutes: Option<u32>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl FixedProvider {
        fn with_minutes(minutes: u32) -> Self {
            Self {
                minutes: Some(minutes),
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                minutes: None,
                fail: true,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RouteProvider for FixedProvider {
        async fn drive_time(
            &self,
            _from: &str,
            _to: &str,
        ) -> Result<Option<DriveTime>, RouteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RouteError::RequestFailed {
                    reason: "offline".to_string(),
                });
            }
            Ok(self.minutes.map(DriveTime::from_minutes))
        }

        async fn optimize_route(
            &self,
            _origin: &str,
            _stops: &[RouteStop],
        ) -> Result<OptimizedRoute, RouteError> {
            Err(RouteError::EmptyRoute)
        }
    }

    #[test]
    fn test_fallback_same_street_buckets() {
        let close = DriveTimeEstimator::fallback("100 Oak Lane", "120 Oak Lane");
        assert_eq!(close.duration_minutes, 2);
        assert_eq!(close.duration_text, "2 min");

        assert_eq!(
            DriveTimeEstimator::fallback("100 Oak Lane", "260 Oak Lane").duration_minutes,
            3
        );
        assert_eq!(
            DriveTimeEstimator::fallback("100 Oak Lane", "460 Oak Lane").duration_minutes,
            5
        );
        assert_eq!(
            DriveTimeEstimator::fallback("100 Oak Lane", "900 Oak Lane").duration_minutes,
            7
        );
    }

    #[test]
    fn test_fallback_cross_street_is_at_least_eight_minutes() {
        let cross = DriveTimeEstimator::fallback("100 Oak Lane", "900 Pine Drive");
        assert!(cross.duration_minutes >= 8);
    }

    #[test]
    fn test_fallback_shared_name_token_and_same_type() {
        // "maple" is longer than three characters and shared.
        assert_eq!(
            DriveTimeEstimator::fallback("10 Maple Lane", "5000 Maple Street").duration_minutes,
            SHARED_NAME_MINUTES
        );

        // Different short names, same street type, close numbers.
        assert_eq!(
            DriveTimeEstimator::fallback("100 Oak Lane", "250 Elm Lane").duration_minutes,
            SAME_TYPE_NEAR_MINUTES
        );
    }

    #[test]
    fn test_fallback_handles_abbreviations() {
        assert_eq!(
            DriveTimeEstimator::fallback("100 Oak Ln", "120 Oak Lane").duration_minutes,
            2
        );
        assert_eq!(
            DriveTimeEstimator::fallback("1 Sunset Blvd.", "30 Sunset Boulevard")
                .duration_minutes,
            2
        );
    }

    #[test]
    fn test_fallback_is_deterministic() {
        let a = DriveTimeEstimator::fallback("12 Cedar Ct", "900 Birch Ave");
        let b = DriveTimeEstimator::fallback("12 Cedar Ct", "900 Birch Ave");
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_resolve_upgrades_cache_directionally() {
        let provider = Arc::new(FixedProvider::with_minutes(4));
        let estimator = DriveTimeEstimator::new(provider.clone());

        // Before resolution, estimate uses the fallback.
        let before = estimator.estimate("100 Oak Lane", "120 Oak Lane").await;
        assert_eq!(before.duration_minutes, 2);

        let resolved = estimator.resolve("100 Oak Lane", "120 Oak Lane").await;
        assert_eq!(resolved.duration_minutes, 4);

        let after = estimator.estimate("100 Oak Lane", "120 Oak Lane").await;
        assert_eq!(after.duration_minutes, 4);

        // The reverse direction is a separate entry, still unresolved.
        let reverse = estimator.estimate("120 Oak Lane", "100 Oak Lane").await;
        assert_eq!(reverse.duration_minutes, 2);

        // A second resolve is served from cache.
        estimator.resolve("100 Oak Lane", "120 Oak Lane").await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_resolution_falls_back_and_is_not_cached() {
        let provider = Arc::new(FixedProvider::failing());
        let estimator = DriveTimeEstimator::new(provider.clone());

        let result = estimator.resolve("100 Oak Lane", "120 Oak Lane").await;
        assert_eq!(result.duration_minutes, 2);

        // Not cached: the next resolve tries the provider again.
        estimator.resolve("100 Oak Lane", "120 Oak Lane").await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clear_drops_resolved_pairs() {
        let provider = Arc::new(FixedProvider::with_minutes(4));
        let estimator = DriveTimeEstimator::new(provider);

        estimator.resolve("100 Oak Lane", "120 Oak Lane").await;
        estimator.clear().await;

        let estimate = estimator.estimate("100 Oak Lane", "120 Oak Lane").await;
        assert_eq!(estimate.duration_minutes, 2);
    }

    #[tokio::test]
    async fn test_batch_completion_fires_exactly_once() {
        let provider = Arc::new(FixedProvider::with_minutes(4));
        let estimator = DriveTimeEstimator::new(provider);

        let pairs: Vec<(String, String)> = (0..20)
            .map(|i| (format!("{} Oak Lane", i * 10), format!("{} Elm Street", i * 10)))
            .collect();

        let fired = AtomicUsize::new(0);
        let resolved = estimator
            .resolve_batch(&pairs, || {
                fired.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert_eq!(resolved, pairs.len());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_batch_still_signals_completion() {
        let provider = Arc::new(FixedProvider::with_minutes(4));
        let estimator = DriveTimeEstimator::new(provider);

        let fired = AtomicBool::new(false);
        estimator
            .resolve_batch(&[], || {
                fired.store(true, Ordering::SeqCst);
            })
            .await;
        assert!(fired.load(Ordering::SeqCst));
    }
}
