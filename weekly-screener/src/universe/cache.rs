//! Universe cache keyed by market.
//!
//! A universe is loaded on first use and kept until invalidated. There is
//! no TTL. Loading happens outside the lock, so a slow download for one
//! market never blocks readers of another.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{load_with_fallback, Market, TickerUniverse, UniverseSource};

/// Loaded universes, shared between scans.
#[derive(Default)]
pub struct UniverseCache {
    universes: RwLock<HashMap<Market, Arc<TickerUniverse>>>,
}

impl UniverseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached universe, if loaded.
    pub async fn get(&self, market: Market) -> Option<Arc<TickerUniverse>> {
        self.universes.read().await.get(&market).cloned()
    }

    /// Cached universe, loading it from `source` on a miss.
    pub async fn get_or_load(&self, source: &dyn UniverseSource) -> Arc<TickerUniverse> {
        let market = source.market();
        if let Some(universe) = self.get(market).await {
            debug!(market = %market, "Universe cache hit");
            return universe;
        }

        // Load without holding the lock; a concurrent loader may win the insert.
        let loaded = Arc::new(load_with_fallback(source).await);

        let mut universes = self.universes.write().await;
        Arc::clone(universes.entry(market).or_insert(loaded))
    }

    /// Replace the cached universe for a market.
    pub async fn insert(&self, market: Market, universe: TickerUniverse) {
        self.universes.write().await.insert(market, Arc::new(universe));
    }

    /// Drop one market so the next access reloads it.
    pub async fn invalidate(&self, market: Market) {
        self.universes.write().await.remove(&market);
    }

    pub async fn clear(&self) {
        self.universes.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.universes.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingSource {
        loads: AtomicU32,
    }

    #[async_trait]
    impl UniverseSource for CountingSource {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn market(&self) -> Market {
            Market::Sp500
        }

        async fn load(&self) -> anyhow::Result<TickerUniverse> {
            let n = self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(vec![(format!("T{}", n), "Test")].into_iter().collect())
        }
    }

    #[tokio::test]
    async fn test_populates_once() {
        let cache = UniverseCache::new();
        let source = CountingSource {
            loads: AtomicU32::new(0),
        };

        let first = cache.get_or_load(&source).await;
        let second = cache.get_or_load(&source).await;

        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.contains("T0"));
    }

    #[tokio::test]
    async fn test_reloads_after_invalidate() {
        let cache = UniverseCache::new();
        let source = CountingSource {
            loads: AtomicU32::new(0),
        };

        cache.get_or_load(&source).await;
        cache.invalidate(Market::Sp500).await;
        let reloaded = cache.get_or_load(&source).await;

        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
        assert!(reloaded.contains("T1"));
    }

    /// Blocks in `load` until released.
    struct GatedSource {
        gate: tokio::sync::Notify,
    }

    #[async_trait]
    impl UniverseSource for GatedSource {
        fn name(&self) -> &'static str {
            "gated"
        }

        fn market(&self) -> Market {
            Market::TsePrime
        }

        async fn load(&self) -> anyhow::Result<TickerUniverse> {
            self.gate.notified().await;
            Ok(vec![("7203.T", "トヨタ自動車")].into_iter().collect())
        }
    }

    #[tokio::test]
    async fn test_slow_load_does_not_block_other_markets() {
        let cache = Arc::new(UniverseCache::new());
        cache
            .insert(Market::Sp500, vec![("AAPL", "Apple Inc.")].into_iter().collect())
            .await;

        let source = Arc::new(GatedSource {
            gate: tokio::sync::Notify::new(),
        });
        let loader = {
            let cache = Arc::clone(&cache);
            let source = Arc::clone(&source);
            tokio::spawn(async move { cache.get_or_load(source.as_ref()).await })
        };
        tokio::task::yield_now().await;

        let sp500 = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            cache.get(Market::Sp500),
        )
        .await
        .expect("read blocked by a pending load");
        assert!(sp500.unwrap().contains("AAPL"));

        source.gate.notify_one();
        let tse = loader.await.unwrap();
        assert!(tse.contains("7203.T"));
        assert!(Arc::ptr_eq(&tse, &cache.get(Market::TsePrime).await.unwrap()));
    }

    #[tokio::test]
    async fn test_clear_and_insert() {
        let cache = UniverseCache::new();
        cache
            .insert(Market::TsePrime, vec![("7203.T", "トヨタ自動車")].into_iter().collect())
            .await;
        assert_eq!(cache.len().await, 1);
        assert!(cache.get(Market::Sp500).await.is_none());

        cache.clear().await;
        assert!(cache.get(Market::TsePrime).await.is_none());
    }
}
