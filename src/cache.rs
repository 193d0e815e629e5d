use std::cell::RefCell;
use std::rc::{Rc, Weak};

use fxhash::FxHashMap;

use crate::{Result, Runtime};

pub type CacheResolver<T> = Box<dyn Fn(&str) -> Result<Option<T>>>;

/// Called after each flush with the evicted and the newly resolved keys.
pub type FlushListener = Rc<dyn Fn(&[String], &[String])>;

/// Called with every entry a flush evicts, before the flush listener runs.
pub type EvictionListener<T> = Rc<dyn Fn(&str, &T)>;

/// Lazily resolved components addressed by hierarchical ids
/// (`repeater.entry.child`).
///
/// A miss is resolved once and memoized. A failed resolution is memoized as
/// well, as a miss sentinel that lives until the next flush, so a hot lookup
/// of a missing id costs one resolver call per turn. `remember` and `forget`
/// are applied in bulk at the next deferred flush.
pub struct ComponentCache<T: Clone + 'static> {
	body: Rc<CacheBody<T>>,
}

impl<T: Clone + 'static> Clone for ComponentCache<T> {
	fn clone(&self) -> Self {
		ComponentCache {
			body: self.body.clone(),
		}
	}
}

struct CacheBody<T: 'static> {
	runtime: Runtime,
	resolver: CacheResolver<T>,
	listener: RefCell<Option<FlushListener>>,
	on_evict: RefCell<Option<EvictionListener<T>>>,
	inner: RefCell<CacheInner<T>>,
}

struct CacheInner<T: 'static> {
	entries: FxHashMap<String, Option<T>>,
	remember: Vec<String>,
	forget: Vec<String>,
	flush_scheduled: bool,
	this: Weak<CacheBody<T>>,
}

impl<T: Clone + 'static> ComponentCache<T> {
	pub fn new(runtime: Runtime, resolver: impl Fn(&str) -> Result<Option<T>> + 'static) -> Self {
		ComponentCache {
			body: Rc::new_cyclic(|this| CacheBody {
				runtime,
				resolver: Box::new(resolver),
				listener: RefCell::new(None),
				on_evict: RefCell::new(None),
				inner: RefCell::new(CacheInner {
					entries: FxHashMap::default(),
					remember: Vec::new(),
					forget: Vec::new(),
					flush_scheduled: false,
					this: this.clone(),
				}),
			}),
		}
	}

	pub fn set_flush_listener(&self, listener: FlushListener) {
		*self.body.listener.borrow_mut() = Some(listener);
	}

	pub fn set_eviction_listener(&self, listener: EvictionListener<T>) {
		*self.body.on_evict.borrow_mut() = Some(listener);
	}

	pub fn get(&self, key: &str) -> Option<T> {
		self.body.get(key)
	}

	pub fn set(&self, key: &str, entry: T) {
		let previous = self.body.inner.borrow_mut().entries.insert(key.to_owned(), Some(entry));
		match previous {
			Some(Some(_)) => tracing::debug!(key, "cache entry overwritten"),
			_ => tracing::debug!(key, "cache entry added"),
		}
	}

	pub fn unset(&self, key: &str) -> Option<T> {
		self.body.inner.borrow_mut().entries.remove(key).flatten()
	}

	/// `key` is resolved and cached. A key of the form `*prefix` asks whether
	/// any resolved descendant of `prefix` is cached.
	pub fn in_cache(&self, key: &str) -> bool {
		let inner = self.body.inner.borrow();
		match key.strip_prefix('*') {
			Some(prefix) => {
				let prefix = self.body.child_prefix(prefix);
				inner
					.entries
					.iter()
					.any(|(k, entry)| entry.is_some() && k.starts_with(&prefix))
			}
			None => matches!(inner.entries.get(key), Some(Some(_))),
		}
	}

	/// Every resolved, cached descendant of `key`.
	pub fn children(&self, key: &str) -> Vec<String> {
		let prefix = self.body.child_prefix(key);
		self.body
			.inner
			.borrow()
			.entries
			.iter()
			.filter(|(k, entry)| entry.is_some() && k.starts_with(&prefix))
			.map(|(k, _)| k.clone())
			.collect()
	}

	/// Guarantees `key` is resolved at the next flush.
	pub fn remember(&self, key: &str) {
		self.body.inner.borrow_mut().remember.push(key.to_owned());
		self.body.schedule_flush();
	}

	/// Evicts `key` and all of its descendants at the next flush.
	pub fn forget(&self, key: &str) {
		self.body.inner.borrow_mut().forget.push(key.to_owned());
		self.body.schedule_flush();
	}

	/// Applies pending forgets, then pending remembers, and drops miss
	/// sentinels. Normally run by the scheduler.
	pub fn flush(&self) {
		self.body.flush()
	}

	pub fn len(&self) -> usize {
		self.body
			.inner
			.borrow()
			.entries
			.values()
			.filter(|entry| entry.is_some())
			.count()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl<T: Clone + 'static> CacheBody<T> {
	fn child_prefix(&self, key: &str) -> String {
		format!("{key}{}", self.runtime.separator())
	}

	fn get(&self, key: &str) -> Option<T> {
		if let Some(entry) = self.inner.borrow().entries.get(key) {
			return entry.clone();
		}

		let resolved = match (self.resolver)(key) {
			Ok(resolved) => resolved,
			Err(error) => {
				tracing::warn!(key, %error, "cache resolution failed");
				None
			}
		};

		if resolved.is_none() {
			tracing::trace!(key, "caching miss until next flush");
			self.schedule_flush();
		}

		self.inner
			.borrow_mut()
			.entries
			.entry(key.to_owned())
			.or_insert(resolved)
			.clone()
	}

	fn schedule_flush(&self) {
		let this = {
			let mut inner = self.inner.borrow_mut();
			if inner.flush_scheduled {
				return;
			}
			inner.flush_scheduled = true;
			inner.this.clone()
		};

		self.runtime.defer(move || {
			if let Some(body) = this.upgrade() {
				body.flush();
			}
		});
	}

	fn flush(&self) {
		let (forget, remember) = {
			let mut inner = self.inner.borrow_mut();
			inner.flush_scheduled = false;
			inner.entries.retain(|_, entry| entry.is_some());
			(std::mem::take(&mut inner.forget), std::mem::take(&mut inner.remember))
		};

		let mut evicted: Vec<(String, Option<T>)> = Vec::new();
		for key in &forget {
			let prefix = self.child_prefix(key);
			let mut inner = self.inner.borrow_mut();
			let subtree: Vec<String> = inner
				.entries
				.keys()
				.filter(|k| *k == key || k.starts_with(&prefix))
				.cloned()
				.collect();
			tracing::debug!(key, evicted = subtree.len(), "forgot cache subtree");
			for k in subtree {
				if let Some(entry) = inner.entries.remove(&k) {
					evicted.push((k, entry));
				}
			}
		}

		let on_evict = self.on_evict.borrow().clone();
		if let Some(on_evict) = on_evict {
			for (key, entry) in &evicted {
				if let Some(entry) = entry {
					on_evict(key, entry);
				}
			}
		}
		let evicted: Vec<String> = evicted.into_iter().map(|(key, _)| key).collect();

		let mut resolved = Vec::new();
		for key in remember {
			let cached = matches!(self.inner.borrow().entries.get(&key), Some(Some(_)));
			if !cached && self.get(&key).is_some() {
				resolved.push(key);
			}
		}

		if evicted.is_empty() && resolved.is_empty() {
			return;
		}
		let listener = self.listener.borrow().clone();
		if let Some(listener) = listener {
			listener(&evicted, &resolved);
		}
	}
}

#[cfg(test)]
mod tests {
	use std::cell::Cell;
	use std::rc::Rc;

	use super::*;
	use crate::{DeferredQueue, Error, RuntimeConfig};

	fn cache() -> (ComponentCache<String>, DeferredQueue, Rc<Cell<usize>>) {
		let queue = DeferredQueue::new();
		let runtime = Runtime::new(Rc::new(queue.clone()), RuntimeConfig::default());
		let calls = Rc::new(Cell::new(0));
		let counter = calls.clone();
		let cache = ComponentCache::new(runtime, move |key| {
			counter.set(counter.get() + 1);
			match key {
				k if k.starts_with("missing") => Ok(None),
				k if k.starts_with("broken") => Err(Error::Resolve(k.to_owned())),
				k => Ok(Some(format!("component {k}"))),
			}
		});
		(cache, queue, calls)
	}

	#[test]
	fn children_lists_descendants_only() {
		let (cache, _, _) = cache();
		cache.set("rep.1.a", "X".to_owned());
		cache.set("rep.1.b", "Y".to_owned());
		cache.set("rep.10.a", "Z".to_owned());

		let mut children = cache.children("rep.1");
		children.sort();
		assert_eq!(children, vec!["rep.1.a".to_owned(), "rep.1.b".to_owned()]);
		assert!(cache.in_cache("*rep.1"));
		assert!(!cache.in_cache("*rep.2"));
	}

	#[test]
	fn resolves_once_and_memoizes() {
		let (cache, _, calls) = cache();
		assert_eq!(cache.get("a"), Some("component a".to_owned()));
		assert_eq!(cache.get("a"), Some("component a".to_owned()));
		assert_eq!(calls.get(), 1);
	}

	#[test]
	fn misses_are_cached_until_flush() {
		let (cache, queue, calls) = cache();
		assert_eq!(cache.get("missing"), None);
		assert_eq!(cache.get("broken"), None);
		assert_eq!(cache.get("missing"), None);
		assert_eq!(cache.get("broken"), None);
		assert_eq!(calls.get(), 2);
		assert!(!cache.in_cache("missing"));

		queue.run_pending();
		assert_eq!(cache.get("missing"), None);
		assert_eq!(calls.get(), 3);
	}

	#[test]
	fn forget_evicts_subtree_at_flush() {
		let (cache, queue, _) = cache();
		cache.get("rep.1");
		cache.get("rep.1.a");
		cache.get("rep.2.a");

		cache.forget("rep.1");
		assert!(cache.in_cache("rep.1.a"));

		queue.run_pending();
		assert!(!cache.in_cache("rep.1"));
		assert!(!cache.in_cache("rep.1.a"));
		assert!(cache.in_cache("rep.2.a"));
	}

	#[test]
	fn eviction_listener_sees_every_evicted_entry() {
		let (cache, queue, _) = cache();
		let seen = Rc::new(std::cell::RefCell::new(Vec::new()));
		let log = seen.clone();
		cache.set_eviction_listener(Rc::new(move |key: &str, entry: &String| {
			log.borrow_mut().push(format!("{key}={entry}"));
		}));

		cache.get("rep.1");
		cache.get("rep.1.a");
		cache.get("missing.1.b");
		cache.forget("rep.1");
		queue.run_pending();

		let mut seen = seen.borrow().clone();
		seen.sort();
		assert_eq!(seen, vec!["rep.1.a=component rep.1.a", "rep.1=component rep.1"]);
	}

	#[test]
	fn remember_resolves_at_flush() {
		let (cache, queue, calls) = cache();
		cache.remember("rep.3.b");
		assert!(!cache.in_cache("rep.3.b"));
		assert_eq!(calls.get(), 0);

		queue.run_pending();
		assert!(cache.in_cache("rep.3.b"));
		assert_eq!(calls.get(), 1);
	}
}
