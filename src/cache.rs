use std::{
	collections::HashMap,
	hash::Hash,
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc,
	},
	time::{Duration, Instant},
};

use parking_lot::Mutex;

use crate::events::{EntityChanged, Listener};

/// A map whose entries expire a fixed time after they were written.
///
/// Expired entries are dropped lazily on read, and in bulk by
/// [`TtlCache::retain_fresh`].
#[derive(Debug)]
pub struct TtlCache<K, V> {
	ttl: Duration,
	/// Values keyed with the instant they expire at.
	entries: Mutex<HashMap<K, (Instant, V)>>,
}

impl<K, V> TtlCache<K, V>
where
	K: Eq + Hash,
	V: Clone,
{
	pub fn new(ttl: Duration) -> Self {
		Self {
			ttl,
			entries: Mutex::new(HashMap::new()),
		}
	}

	pub fn get(&self, key: &K) -> Option<V> {
		let mut entries = self.entries.lock();
		let (expires, value) = entries.get(key)?;

		if Instant::now() < *expires {
			return Some(value.clone());
		}

		entries.remove(key);
		None
	}

	pub fn insert(&self, key: K, value: V) {
		self.insert_for(key, value, self.ttl);
	}

	/// Inserts an entry that expires after `ttl`, capped at the cache TTL.
	pub fn insert_for(&self, key: K, value: V, ttl: Duration) {
		let expires = Instant::now() + ttl.min(self.ttl);

		self.entries.lock().insert(key, (expires, value));
	}

	pub fn remove(&self, key: &K) {
		self.entries.lock().remove(key);
	}

	pub fn retain(&self, mut keep: impl FnMut(&K, &V) -> bool) {
		self.entries.lock().retain(|key, (_, value)| keep(key, value));
	}

	/// Drops every expired entry.
	pub fn retain_fresh(&self) {
		let now = Instant::now();

		self.entries.lock().retain(|_, (expires, _)| now < *expires);
	}

	pub fn clear(&self) {
		self.entries.lock().clear();
	}

	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}
}

/// Response cache for the read actions of one service.
///
/// Keys are built by the service from the caller's id and every parameter
/// that shapes the response. Any change to the owning service, or to a service
/// whose entities are embedded in its responses, clears the whole cache so
/// that no viewer keeps a stale variant.
///
/// Every clear bumps a generation counter. A service reads the generation
/// before loading a response and hands it back to [`ActionCache::insert`],
/// which drops responses loaded before a clear.
#[derive(Debug)]
pub struct ActionCache<V> {
	service: &'static str,
	embeds: &'static [&'static str],
	generation: AtomicU64,
	entries: TtlCache<String, V>,
}

impl<V: Clone> ActionCache<V> {
	pub fn new(service: &'static str, embeds: &'static [&'static str], ttl: Duration) -> Arc<Self> {
		Arc::new(Self {
			service,
			embeds,
			generation: AtomicU64::new(0),
			entries: TtlCache::new(ttl),
		})
	}

	pub fn get(&self, key: &str) -> Option<V> {
		let value = self.entries.get(&key.to_owned());

		if value.is_some() {
			tracing::trace!(service = self.service, key, "cache hit");
		}

		value
	}

	pub fn generation(&self) -> u64 {
		self.generation.load(Ordering::SeqCst)
	}

	/// Caches a response loaded at `generation`, unless the cache was cleared
	/// since.
	pub fn insert(&self, key: String, value: V, generation: u64) {
		if self.generation() != generation {
			return;
		}

		self.entries.insert(key.clone(), value);

		// A clear may have run between the check and the write
		if self.generation() != generation {
			self.entries.remove(&key);
		}
	}

	pub fn retain_fresh(&self) {
		self.entries.retain_fresh();

		tracing::trace!(service = self.service, size = self.len(), "swept response cache");
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}
}

impl<V: Clone + Send> Listener for ActionCache<V> {
	fn entity_changed(&self, event: &EntityChanged) {
		if event.service == self.service || self.embeds.contains(&event.service) {
			tracing::debug!(
				service = self.service,
				cause = event.service,
				"clearing response cache"
			);

			self.generation.fetch_add(1, Ordering::SeqCst);
			self.entries.clear();
		}
	}
}

#[cfg(test)]
mod test {
	use uuid::Uuid;

	use super::*;
	use crate::events::Change;

	#[test]
	fn test_entries_expire() {
		let cache = TtlCache::new(Duration::ZERO);
		cache.insert("key", 1);

		assert_eq!(cache.get(&"key"), None);
		assert_eq!(cache.len(), 0);
	}

	#[test]
	fn test_fresh_entries_are_returned() {
		let cache = TtlCache::new(Duration::from_secs(60));
		cache.insert("key", 1);

		assert_eq!(cache.get(&"key"), Some(1));

		cache.retain_fresh();

		assert_eq!(cache.len(), 1);
	}

	#[test]
	fn test_retain() {
		let cache = TtlCache::new(Duration::from_secs(60));
		cache.insert("a", 1);
		cache.insert("b", 2);

		cache.retain(|_, value| *value != 1);

		assert_eq!(cache.get(&"a"), None);
		assert_eq!(cache.get(&"b"), Some(2));
	}

	#[test]
	fn test_action_cache_clears_on_related_change() {
		let cache = ActionCache::new("galleries", &["stories"], Duration::from_secs(60));
		let event = |service| EntityChanged {
			service,
			change: Change::Updated,
			id: Uuid::new_v4(),
		};

		cache.insert("viewer|id".into(), 1, cache.generation());
		cache.entity_changed(&event("users"));

		assert_eq!(cache.get("viewer|id"), Some(1));

		cache.entity_changed(&event("stories"));

		assert_eq!(cache.get("viewer|id"), None);

		cache.insert("viewer|id".into(), 1, cache.generation());
		cache.entity_changed(&event("galleries"));

		assert_eq!(cache.len(), 0);
	}

	#[test]
	fn test_response_loaded_before_clear_is_dropped() {
		let cache = ActionCache::new("galleries", &["stories"], Duration::from_secs(60));
		let generation = cache.generation();

		cache.entity_changed(&EntityChanged {
			service: "stories",
			change: Change::Updated,
			id: Uuid::new_v4(),
		});
		cache.insert("viewer|id".into(), 1, generation);

		assert_eq!(cache.get("viewer|id"), None);

		cache.insert("viewer|id".into(), 2, cache.generation());

		assert_eq!(cache.get("viewer|id"), Some(2));
	}

	#[test]
	fn test_insert_for_is_capped_by_ttl() {
		let cache = TtlCache::new(Duration::ZERO);
		cache.insert_for("key", 1, Duration::from_secs(60));

		assert_eq!(cache.get(&"key"), None);

		let cache = TtlCache::new(Duration::from_secs(60));
		cache.insert_for("key", 1, Duration::ZERO);

		assert_eq!(cache.get(&"key"), None);
	}
}
