//! Shared counter contracts backing rate-limit windows and cross-delivery retry counts.
//!
//! Every adapter instance talks to the same [`CounterStore`], so each operation must be
//! atomic with respect to concurrent callers on other instances. The check-then-increment
//! used by the rate limiter in particular must never admit more than `limit` callers per
//! window, even under contention.

pub mod memory;
#[cfg(feature = "redis")] pub mod redis;

pub use memory::MemoryCounterStore;
#[cfg(feature = "redis")] pub use self::redis::RedisCounterStore;

// self
use crate::_prelude::*;

/// Boxed future returned by [`CounterStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Atomic counter operations shared by all adapter instances.
pub trait CounterStore
where
	Self: Send + Sync,
{
	/// Admits the caller when the counter under `key` is below `limit`, incrementing it.
	///
	/// The first admission in a window starts the window: the key expires `window` later
	/// and the next caller begins a fresh count. Rejections never increment.
	fn check_and_increment<'a>(
		&'a self,
		key: &'a str,
		limit: u64,
		window: Duration,
	) -> StoreFuture<'a, bool>;

	/// Increments the counter under `key` and returns the new value.
	///
	/// `ttl` is applied only when the increment created the key.
	fn increment<'a>(&'a self, key: &'a str, ttl: Duration) -> StoreFuture<'a, u64>;

	/// Removes the counter under `key`; missing keys are not an error.
	fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()>;
}
impl<T> CounterStore for Arc<T>
where
	T: ?Sized + CounterStore,
{
	fn check_and_increment<'a>(
		&'a self,
		key: &'a str,
		limit: u64,
		window: Duration,
	) -> StoreFuture<'a, bool> {
		(**self).check_and_increment(key, limit, window)
	}

	fn increment<'a>(&'a self, key: &'a str, ttl: Duration) -> StoreFuture<'a, u64> {
		(**self).increment(key, ttl)
	}

	fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
		(**self).delete(key)
	}
}

/// Error type produced by [`CounterStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum StoreError {
	/// The backend returned a value the store could not interpret.
	#[error("Unexpected counter value: {message}.")]
	UnexpectedValue {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Counter backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn arc_wrapped_stores_delegate() {
		let store: Arc<dyn CounterStore> = Arc::new(MemoryCounterStore::default());

		assert_eq!(
			store.increment("k", Duration::minutes(1)).await.expect("Increment should succeed."),
			1
		);
		assert_eq!(
			store.increment("k", Duration::minutes(1)).await.expect("Increment should succeed."),
			2
		);

		store.delete("k").await.expect("Delete should succeed.");

		assert_eq!(
			store.increment("k", Duration::minutes(1)).await.expect("Increment should succeed."),
			1
		);
	}

	#[test]
	fn store_errors_render_their_message() {
		let err = StoreError::Backend { message: "connection reset".into() };

		assert_eq!(err.to_string(), "Counter backend failure: connection reset.");
	}
}
