//! Instrumentation decorator that counts cache calls.

use super::CacheStore;
use crate::error::Result;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A single call seen by [`CountingStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheOp {
    Store { key: String, value: String },
    Load { key: String },
}

type Callback = Box<dyn Fn(usize, CacheOp) -> Result<String> + Send + Sync>;

/// Counts `store` and `load` invocations.
///
/// With a callback, each call is delegated to it along with its 1-based call number,
/// and the callback's result is returned as-is. Without one, every call succeeds and
/// `load` returns an empty string.
pub struct CountingStore {
    count: AtomicUsize,
    callback: Option<Callback>,
}

impl std::fmt::Debug for CountingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountingStore")
            .field("count", &self.count())
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

impl Default for CountingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            count: AtomicUsize::new(0),
            callback: None,
        }
    }

    pub fn with_callback<F>(callback: F) -> Self
    where
        F: Fn(usize, CacheOp) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            count: AtomicUsize::new(0),
            callback: Some(Box::new(callback)),
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    fn dispatch(&self, op: CacheOp) -> Result<String> {
        let n = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        match &self.callback {
            Some(callback) => callback(n, op),
            None => Ok(String::new()),
        }
    }
}

impl CacheStore for CountingStore {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        self.dispatch(CacheOp::Store {
            key: key.to_string(),
            value: value.to_string(),
        })
        .map(|_| ())
    }

    fn load(&self, key: &str) -> Result<String> {
        self.dispatch(CacheOp::Load {
            key: key.to_string(),
        })
    }

    fn describe(&self) -> String {
        format!("counting store ({} calls)", self.count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BidderError;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_no_callback_is_noop() {
        let store = CountingStore::new();
        store.store("a", "1").unwrap();
        assert_eq!(store.load("a").unwrap(), "");
        assert_eq!(store.load("missing").unwrap(), "");
        assert_eq!(store.count(), 3);
    }

    #[test]
    fn test_callback_sees_every_call() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let store = CountingStore::with_callback(move |n, op| {
            sink.lock().push((n, op.clone()));
            match op {
                CacheOp::Load { key } => Ok(format!("value-of-{}", key)),
                CacheOp::Store { .. } => Ok(String::new()),
            }
        });

        store.store("k", "v").unwrap();
        assert_eq!(store.load("k").unwrap(), "value-of-k");

        let seen = seen.lock();
        assert_eq!(
            *seen,
            vec![
                (
                    1,
                    CacheOp::Store {
                        key: "k".to_string(),
                        value: "v".to_string()
                    }
                ),
                (
                    2,
                    CacheOp::Load {
                        key: "k".to_string()
                    }
                ),
            ]
        );
    }

    #[test]
    fn test_callback_errors_surface_verbatim() {
        let store =
            CountingStore::with_callback(|_, _| Err(BidderError::CacheIo("disk full".to_string())));
        assert_eq!(
            store.store("k", "v").unwrap_err(),
            BidderError::CacheIo("disk full".to_string())
        );
        assert_eq!(store.count(), 1);
    }
}
