//! In-memory caches over RPC reads.

use anyhow::Result;
use std::fmt;
use std::thread;
use std::time::Duration;

/// A cached value with the loading flags the views render from.
#[derive(Clone, Debug)]
pub struct Cached<T> {
    data: Option<T>,
    loaded: bool,
    refreshing: bool,
    fetches: usize,
}

impl<T> Default for Cached<T> {
    fn default() -> Self {
        Self {
            data: None,
            loaded: false,
            refreshing: false,
            fetches: 0,
        }
    }
}

impl<T> Cached<T> {
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn loaded(&self) -> bool {
        self.loaded
    }

    pub fn refreshing(&self) -> bool {
        self.refreshing
    }

    pub fn fetches(&self) -> usize {
        self.fetches
    }

    /// Re-queries the value. With `force` the current value is dropped first,
    /// so views fall back to their loading state; otherwise the stale value
    /// stays visible until the new one arrives. A failed fetch leaves the
    /// previous value in place.
    pub fn refresh(&mut self, force: bool, fetch: impl FnOnce() -> Result<T>) -> Result<()> {
        if force {
            self.data = None;
            self.loaded = false;
        }
        self.refreshing = true;
        self.fetches += 1;
        let result = fetch();
        self.refreshing = false;
        self.loaded = true;
        self.data = Some(result?);
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheKind {
    WalletTokens,
    StakedTokens,
    PoolEntries,
    Rewards,
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheKind::WalletTokens => "wallet tokens",
            CacheKind::StakedTokens => "staked tokens",
            CacheKind::PoolEntries => "pool entries",
            CacheKind::Rewards => "rewards",
        };
        f.write_str(name)
    }
}

pub trait CacheRefresher {
    fn refresh(&mut self, kind: CacheKind, force: bool) -> Result<()>;
}

/// Invalidates each cache, waits `settle_delay`, then queries each once more.
///
/// RPC nodes lag behind a freshly confirmed transaction, so the first read can
/// still return the old state; the second read picks up the settled one.
/// Refresh failures are printed and never stop the caller.
pub fn refresh_then_settle(
    refresher: &mut dyn CacheRefresher,
    kinds: &[CacheKind],
    settle_delay: Duration,
) {
    for kind in kinds {
        if let Err(e) = refresher.refresh(*kind, true) {
            println!("failed to refresh {}: {:#}", kind, e);
        }
    }
    if !settle_delay.is_zero() {
        thread::sleep(settle_delay);
    }
    for kind in kinds {
        if let Err(e) = refresher.refresh(*kind, false) {
            println!("failed to refresh {}: {:#}", kind, e);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::format_err;

    /// Records every refresh call in order.
    #[derive(Default)]
    pub struct RecordingRefresher {
        pub calls: Vec<(CacheKind, bool)>,
    }

    impl RecordingRefresher {
        pub fn count(&self, kind: CacheKind) -> usize {
            self.calls.iter().filter(|(k, _)| *k == kind).count()
        }
    }

    impl CacheRefresher for RecordingRefresher {
        fn refresh(&mut self, kind: CacheKind, force: bool) -> Result<()> {
            self.calls.push((kind, force));
            Ok(())
        }
    }

    #[test]
    fn force_drops_value_before_fetching() {
        let mut cached = Cached::default();
        cached.refresh(false, || Ok(1)).unwrap();
        assert!(cached.loaded());
        cached
            .refresh(true, || {
                Err::<i32, _>(format_err!("rpc down"))
            })
            .unwrap_err();
        assert_eq!(cached.data(), None);
        assert_eq!(cached.fetches(), 2);
    }

    #[test]
    fn soft_refresh_keeps_stale_value_on_error() {
        let mut cached = Cached::default();
        cached.refresh(false, || Ok("first")).unwrap();
        assert!(cached.refresh(false, || Err(format_err!("timeout"))).is_err());
        assert_eq!(cached.data(), Some(&"first"));
        assert!(!cached.refreshing());
    }

    #[test]
    fn settle_forces_then_requeries_each_kind() {
        let mut refresher = RecordingRefresher::default();
        refresh_then_settle(
            &mut refresher,
            &[CacheKind::WalletTokens, CacheKind::StakedTokens],
            Duration::ZERO,
        );
        assert_eq!(
            refresher.calls,
            vec![
                (CacheKind::WalletTokens, true),
                (CacheKind::StakedTokens, true),
                (CacheKind::WalletTokens, false),
                (CacheKind::StakedTokens, false),
            ]
        );
    }
}
