//! Thread-safe in-memory [`CounterStore`] for single-instance deployments and tests.

// std
use std::time::Instant;
// self
use crate::{
	_prelude::*,
	store::{CounterStore, StoreError, StoreFuture},
};

#[derive(Clone, Copy, Debug)]
struct Counter {
	value: u64,
	expires_at: Option<Instant>,
}
impl Counter {
	fn live(&self, now: Instant) -> bool {
		self.expires_at.is_none_or(|deadline| deadline > now)
	}
}

type CounterMap = Arc<Mutex<HashMap<String, Counter>>>;

/// Process-local counters with lazy expiry; every operation holds one lock.
#[derive(Clone, Debug, Default)]
pub struct MemoryCounterStore(CounterMap);
impl MemoryCounterStore {
	/// Returns the live value under `key`, if any.
	pub fn get(&self, key: &str) -> Option<u64> {
		let now = Instant::now();

		self.0.lock().get(key).filter(|c| c.live(now)).map(|c| c.value)
	}

	fn check_and_increment_now(map: &CounterMap, key: &str, limit: u64, window: Duration) -> bool {
		let now = Instant::now();
		let mut guard = map.lock();
		let current = guard.get(key).filter(|c| c.live(now)).map_or(0, |c| c.value);

		if current >= limit {
			return false;
		}

		let expires_at = match guard.get(key).filter(|c| c.live(now)) {
			Some(counter) if current > 0 => counter.expires_at,
			_ => deadline(now, window),
		};

		guard.insert(key.to_owned(), Counter { value: current + 1, expires_at });

		true
	}

	fn increment_now(map: &CounterMap, key: &str, ttl: Duration) -> u64 {
		let now = Instant::now();
		let mut guard = map.lock();
		let counter = match guard.get(key).copied().filter(|c| c.live(now)) {
			Some(existing) => Counter { value: existing.value + 1, ..existing },
			None => Counter { value: 1, expires_at: deadline(now, ttl) },
		};

		guard.insert(key.to_owned(), counter);

		counter.value
	}
}
impl CounterStore for MemoryCounterStore {
	fn check_and_increment<'a>(
		&'a self,
		key: &'a str,
		limit: u64,
		window: Duration,
	) -> StoreFuture<'a, bool> {
		Box::pin(async move { Ok(Self::check_and_increment_now(&self.0, key, limit, window)) })
	}

	fn increment<'a>(&'a self, key: &'a str, ttl: Duration) -> StoreFuture<'a, u64> {
		Box::pin(async move { Ok(Self::increment_now(&self.0, key, ttl)) })
	}

	fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.0.lock().remove(key);

			Ok::<_, StoreError>(())
		})
	}
}

// A span too large for the platform clock never expires.
fn deadline(now: Instant, span: Duration) -> Option<Instant> {
	now.checked_add(span.unsigned_abs())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn admits_up_to_the_limit_then_rejects() {
		let store = MemoryCounterStore::default();

		for _ in 0..3 {
			assert!(
				store
					.check_and_increment("rl", 3, Duration::minutes(1))
					.await
					.expect("Check should succeed.")
			);
		}

		assert!(
			!store
				.check_and_increment("rl", 3, Duration::minutes(1))
				.await
				.expect("Check should succeed.")
		);
		assert_eq!(store.get("rl"), Some(3), "Rejections must not increment.");
	}

	#[tokio::test]
	async fn windows_reset_after_expiry() {
		let store = MemoryCounterStore::default();
		let window = Duration::milliseconds(40);

		assert!(store.check_and_increment("rl", 1, window).await.expect("Check should succeed."));
		assert!(!store.check_and_increment("rl", 1, window).await.expect("Check should succeed."));

		tokio::time::sleep(std::time::Duration::from_millis(80)).await;

		assert!(store.check_and_increment("rl", 1, window).await.expect("Check should succeed."));
	}

	#[tokio::test]
	async fn zero_limit_rejects_everything() {
		let store = MemoryCounterStore::default();

		assert!(
			!store
				.check_and_increment("rl", 0, Duration::seconds(1))
				.await
				.expect("Check should succeed.")
		);
		assert_eq!(store.get("rl"), None);
	}

	#[tokio::test]
	async fn increment_keeps_the_first_ttl() {
		let store = MemoryCounterStore::default();
		let ttl = Duration::milliseconds(40);

		assert_eq!(store.increment("retry", ttl).await.expect("Increment should succeed."), 1);

		tokio::time::sleep(std::time::Duration::from_millis(25)).await;

		assert_eq!(store.increment("retry", ttl).await.expect("Increment should succeed."), 2);

		tokio::time::sleep(std::time::Duration::from_millis(40)).await;

		assert_eq!(store.get("retry"), None, "Later increments must not extend the TTL.");
		assert_eq!(store.increment("retry", ttl).await.expect("Increment should succeed."), 1);
	}

	#[tokio::test]
	async fn oversized_windows_never_expire() {
		let store = MemoryCounterStore::default();

		assert!(
			store
				.check_and_increment("rl", 2, Duration::MAX)
				.await
				.expect("Check should succeed.")
		);
		assert_eq!(store.increment("retry", Duration::MAX).await.expect("Increment should succeed."), 1);
		assert_eq!(store.get("rl"), Some(1));
		assert_eq!(store.get("retry"), Some(1));
	}
}
