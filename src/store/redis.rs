//! Redis-backed [`CounterStore`] shared by every adapter instance.
//!
//! Check-then-increment runs as a Lua script so the read, the increment, and the window
//! expiry happen atomically on the server.

// crates.io
use redis::{AsyncCommands, Script, aio::ConnectionManager};
// self
use crate::{
	_prelude::*,
	store::{CounterStore, StoreError, StoreFuture},
};

const CHECK_AND_INCREMENT: &str = r"
local current = tonumber(redis.call('get', KEYS[1]) or '0')
if current >= tonumber(ARGV[1]) then
	return 0
end
redis.call('incr', KEYS[1])
if current == 0 then
	redis.call('pexpire', KEYS[1], ARGV[2])
end
return 1
";
const INCREMENT: &str = r"
local count = redis.call('incr', KEYS[1])
if count == 1 then
	redis.call('pexpire', KEYS[1], ARGV[1])
end
return count
";

/// Counter store over a multiplexed Redis connection.
#[derive(Clone)]
pub struct RedisCounterStore {
	connection: ConnectionManager,
	check_and_increment: Arc<Script>,
	increment: Arc<Script>,
}
impl RedisCounterStore {
	/// Wraps an established connection manager.
	pub fn new(connection: ConnectionManager) -> Self {
		Self {
			connection,
			check_and_increment: Arc::new(Script::new(CHECK_AND_INCREMENT)),
			increment: Arc::new(Script::new(INCREMENT)),
		}
	}

	/// Opens a connection manager for `url` (for example `redis://127.0.0.1/`).
	pub async fn connect(url: &str) -> Result<Self, StoreError> {
		let client = redis::Client::open(url).map_err(backend)?;
		let connection = ConnectionManager::new(client).await.map_err(backend)?;

		Ok(Self::new(connection))
	}
}
impl Debug for RedisCounterStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RedisCounterStore").finish_non_exhaustive()
	}
}
impl CounterStore for RedisCounterStore {
	fn check_and_increment<'a>(
		&'a self,
		key: &'a str,
		limit: u64,
		window: Duration,
	) -> StoreFuture<'a, bool> {
		Box::pin(async move {
			let mut connection = self.connection.clone();
			let admitted: i64 = self
				.check_and_increment
				.key(key)
				.arg(limit)
				.arg(millis(window))
				.invoke_async(&mut connection)
				.await
				.map_err(backend)?;

			Ok(admitted == 1)
		})
	}

	fn increment<'a>(&'a self, key: &'a str, ttl: Duration) -> StoreFuture<'a, u64> {
		Box::pin(async move {
			let mut connection = self.connection.clone();
			let count: i64 = self
				.increment
				.key(key)
				.arg(millis(ttl))
				.invoke_async(&mut connection)
				.await
				.map_err(backend)?;

			u64::try_from(count)
				.map_err(|_| StoreError::UnexpectedValue { message: format!("counter {key} is {count}") })
		})
	}

	fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut connection = self.connection.clone();
			let _: i64 = connection.del(key).await.map_err(backend)?;

			Ok(())
		})
	}
}

fn millis(duration: Duration) -> u64 {
	u64::try_from(duration.whole_milliseconds()).unwrap_or(u64::MAX).max(1)
}

fn backend(e: redis::RedisError) -> StoreError {
	StoreError::Backend { message: e.to_string() }
}
