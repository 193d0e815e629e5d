//! Per-object event multiplexing.
//!
//! An [`EventHolder`] layers any number of logical handlers over at most one
//! raw host listener per (base event, delegate). Keys have the shape
//! `base[:slot]`: registering without a slot fills the default slot, so
//! re-registering replaces instead of stacking. Triggering `base` runs every
//! slot; triggering `base:slot` runs only that slot.

mod definition;
mod key;
mod link;

use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use fxhash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

pub use key::{DefinitionKey, EventKey, DEFAULT_SLOT};
pub use link::LinkTarget;

use self::definition::EventDefinition;
use self::link::Link;
use crate::addr::WeakAddr;
use crate::config::DedupPolicy;
use crate::host::{self, RawComponent, RawEvent, RawHandler};
use crate::setter::Subscribable;
use crate::{Error, Hashed, Result, Value};

pub const HANDLER_ADDED: &str = "handler-added";
pub const HANDLER_UPDATED: &str = "handler-updated";
pub const HANDLER_REMOVED: &str = "handler-removed";
pub const EVENT_ENABLED: &str = "event-enabled";
pub const EVENT_DISABLED: &str = "event-disabled";

const LIFECYCLE: [&str; 5] = [HANDLER_ADDED, HANDLER_UPDATED, HANDLER_REMOVED, EVENT_ENABLED, EVENT_DISABLED];

pub fn is_lifecycle(base: &str) -> bool {
	LIFECYCLE.contains(&base)
}

pub type Handler<T> = Rc<dyn Fn(&T, &EventArgs) -> Result<()>>;

/// Arguments of one dispatch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventArgs {
	pub values: Vec<Value>,
	/// Ids of the holders this event was forwarded through by links, oldest
	/// first.
	pub chain: SmallVec<[String; 2]>,
}

impl EventArgs {
	pub fn new(values: Vec<Value>) -> Self {
		EventArgs {
			values,
			chain: SmallVec::new(),
		}
	}

	pub fn empty() -> Self {
		Self::default()
	}

	pub fn value(&self, index: usize) -> Option<&Value> {
		self.values.get(index)
	}

	/// The holder that forwarded this event last, if it arrived via a link.
	pub fn linked_from(&self) -> Option<&str> {
		self.chain.last().map(String::as_str)
	}
}

impl From<Vec<Value>> for EventArgs {
	fn from(values: Vec<Value>) -> Self {
		EventArgs::new(values)
	}
}

/// What the target resolver is asked for: the delegate of the definition
/// that fired and, for host firings, the id of the raw source.
#[derive(Debug, Clone, Copy)]
pub struct Resolve<'a> {
	pub delegate: Option<&'a str>,
	pub source: Option<&'a str>,
}

pub type TargetResolver<T> = Rc<dyn Fn(&Resolve<'_>) -> Option<T>>;

/// One running dispatch and the keys canceled while it runs.
struct Frame {
	base: String,
	canceled: FxHashSet<String>,
}

enum Origin {
	Host { source: String, value: Option<Value> },
	Manual,
}

pub struct EventHolder<T: 'static> {
	body: Rc<HolderBody<T>>,
}

impl<T: 'static> Clone for EventHolder<T> {
	fn clone(&self) -> Self {
		EventHolder {
			body: self.body.clone(),
		}
	}
}

pub struct HolderBody<T: 'static> {
	id: String,
	dedup: DedupPolicy,
	resolver: TargetResolver<T>,
	inner: RefCell<HolderInner<T>>,
}

struct HolderInner<T: 'static> {
	raw: Option<Rc<dyn RawComponent>>,
	definitions: FxHashMap<DefinitionKey, EventDefinition<T>>,
	/// Dispatches currently running handlers, innermost last.
	frames: SmallVec<[Frame; 4]>,
	disabled: FxHashSet<String>,
	last_observed: FxHashMap<DefinitionKey, Hashed<Value>>,
	links: Vec<Link>,
	this: Weak<HolderBody<T>>,
}

impl<T: 'static> EventHolder<T> {
	pub fn new(id: impl Into<String>, dedup: DedupPolicy, resolver: TargetResolver<T>) -> Self {
		EventHolder {
			body: Rc::new_cyclic(|this| HolderBody {
				id: id.into(),
				dedup,
				resolver,
				inner: RefCell::new(HolderInner {
					raw: None,
					definitions: FxHashMap::default(),
					frames: SmallVec::new(),
					disabled: FxHashSet::default(),
					last_observed: FxHashMap::default(),
					links: Vec::new(),
					this: this.clone(),
				}),
			}),
		}
	}

	/// A holder whose handlers always receive a clone of `target`.
	pub fn with_target(id: impl Into<String>, dedup: DedupPolicy, target: T) -> Self
	where
		T: Clone,
	{
		Self::new(id, dedup, Rc::new(move |_: &Resolve<'_>| Some(target.clone())))
	}

	/// Wraps `raw`: native events registered from now on attach to it.
	pub fn attach_raw(&self, raw: Rc<dyn RawComponent>) {
		self.transfer_events(raw)
	}

	pub fn id(&self) -> &str {
		&self.body.id
	}

	pub fn raw(&self) -> Option<Rc<dyn RawComponent>> {
		self.body.inner.borrow().raw.clone()
	}

	pub fn on(&self, key: &str, delegate: Option<&str>, handler: impl Fn(&T, &EventArgs) -> Result<()> + 'static) {
		self.body.on(key, delegate, Rc::new(handler))
	}

	/// Removes the slot named by `key`. Returns whether a handler was removed.
	pub fn off(&self, key: &str, delegate: Option<&str>) -> bool {
		self.body.off(key, delegate)
	}

	/// Registers a handler that unregisters itself before its first run.
	pub fn once(&self, key: &str, delegate: Option<&str>, handler: impl Fn(&T, &EventArgs) -> Result<()> + 'static) {
		let this = Rc::downgrade(&self.body);
		let owned_key = key.to_owned();
		let owned_delegate = delegate.map(str::to_owned);
		let fired = std::cell::Cell::new(false);

		self.on(key, delegate, move |target, args| {
			if fired.replace(true) {
				return Ok(());
			}
			if let Some(body) = this.upgrade() {
				body.off(&owned_key, owned_delegate.as_deref());
			}
			handler(target, args)
		})
	}

	pub fn trigger(&self, key: &str, args: impl Into<EventArgs>) {
		self.body.dispatch(key, None, args.into(), Origin::Manual)
	}

	pub fn trigger_delegated(&self, key: &str, delegate: &str, args: impl Into<EventArgs>) {
		self.body.dispatch(key, Some(delegate), args.into(), Origin::Manual)
	}

	/// Skips the handlers of `key` that have not run yet in the innermost
	/// dispatch of its base event. `base` stops that dispatch and its links,
	/// `base:slot` skips only that slot. The next trigger runs normally.
	pub fn cancel_event(&self, key: &str) {
		let parsed = EventKey::parse(key);
		let mut inner = self.body.inner.borrow_mut();
		let Some(frame) = inner.frames.iter_mut().rev().find(|frame| frame.base == parsed.base) else {
			tracing::trace!(holder = %self.body.id, key, "nothing in flight to cancel");
			return;
		};
		frame.canceled.insert(parsed.normalized());
	}

	pub fn disable_event(&self, key: &str) {
		self.body.set_enabled(key, false)
	}

	pub fn enable_event(&self, key: &str) {
		self.body.set_enabled(key, true)
	}

	pub fn is_enabled(&self, key: &str) -> bool {
		let parsed = EventKey::parse(key);
		let inner = self.body.inner.borrow();
		!inner.disabled.contains(parsed.base) && !inner.disabled.contains(&parsed.normalized())
	}

	/// Moves every attached host listener onto `raw`, which becomes the
	/// wrapped object. Logical handlers are untouched.
	pub fn transfer_events(&self, raw: Rc<dyn RawComponent>) {
		self.body.transfer_events(raw)
	}

	/// Makes every dispatch of `key` here also trigger `destination_key` (or
	/// `key`) on `destination`.
	pub fn link_event_to<U: 'static>(&self, key: &str, destination: &EventHolder<U>, destination_key: Option<&str>) {
		let target = Rc::downgrade(&destination.body) as Weak<dyn LinkTarget>;
		let destination_key = destination_key.unwrap_or(key);
		let mut inner = self.body.inner.borrow_mut();
		let addr = WeakAddr::new(target.clone());
		if inner.links.iter().any(|link| link.matches(key, &addr, Some(destination_key))) {
			return;
		}

		tracing::debug!(holder = %self.body.id, key, to = %destination.id(), destination_key, "linking event");
		inner.links.push(Link::new(key, target, destination_key));
		let attach = inner.ensure_definition(&self.body.id, &DefinitionKey::new(EventKey::parse(key).base, None));
		drop(inner);

		if let Some((raw, raw_handler)) = attach {
			raw.on(EventKey::parse(key).base, None, raw_handler);
		}
	}

	/// Removes links from `key` to `destination`; all of them when
	/// `destination_key` is `None`.
	pub fn unlink_event_to<U: 'static>(&self, key: &str, destination: &EventHolder<U>, destination_key: Option<&str>) {
		let addr = WeakAddr::new(Rc::downgrade(&destination.body) as Weak<dyn LinkTarget>);
		let base = EventKey::parse(key).base;
		let detach = {
			let mut inner = self.body.inner.borrow_mut();
			inner.links.retain(|link| !link.matches(key, &addr, destination_key));
			inner.release_definition(&self.body.id, &DefinitionKey::new(base, None))
		};

		if let Some(raw) = detach {
			raw.off(base, None);
		}
	}

	pub fn has_event(&self, key: &str, delegate: Option<&str>) -> bool {
		let parsed = EventKey::parse(key);
		let inner = self.body.inner.borrow();
		let Some(definition) = inner.definitions.get(&DefinitionKey::new(parsed.base, delegate)) else {
			return false;
		};
		match parsed.slot {
			Some(slot) => definition.slot_ids().any(|id| id == slot),
			None => !definition.is_empty(),
		}
	}

	/// Number of handler slots registered for the base event of `key`.
	pub fn handler_count(&self, key: &str, delegate: Option<&str>) -> usize {
		let parsed = EventKey::parse(key);
		self.body
			.inner
			.borrow()
			.definitions
			.get(&DefinitionKey::new(parsed.base, delegate))
			.map_or(0, |definition| definition.len())
	}

	pub fn link_count(&self) -> usize {
		self.body.inner.borrow().links.len()
	}

	/// Removes every host listener from the wrapped object and forgets it.
	/// Logical handlers stay registered; a later [`transfer_events`] attaches
	/// them again.
	///
	/// [`transfer_events`]: EventHolder::transfer_events
	pub fn detach_raw(&self) {
		self.body.detach_raw()
	}

	/// Type-erased handle for dependency subscriptions.
	pub fn subscribable(&self) -> Rc<dyn Subscribable> {
		self.body.clone()
	}
}

impl<T: 'static> HolderInner<T> {
	/// Creates the definition for `key` if missing. Returns the raw object and
	/// listener to attach when the base event is host-native.
	fn ensure_definition(&mut self, holder: &str, key: &DefinitionKey) -> Option<(Rc<dyn RawComponent>, RawHandler)> {
		if self.definitions.contains_key(key) {
			return None;
		}

		let raw_handler = HolderBody::raw_handler(self.this.clone(), key);
		let mut definition = EventDefinition::new(key.clone(), raw_handler.clone());
		let attach = self.raw.clone().filter(|_| host::is_native(&key.base));
		definition.attached = attach.is_some();
		tracing::trace!(holder, definition = %key, "event definition created");
		self.definitions.insert(key.clone(), definition);
		attach.map(|raw| (raw, raw_handler))
	}

	/// Drops the definition for `key` once it has no slots and no link
	/// forwards its base event. Returns the raw object to detach from.
	fn release_definition(&mut self, holder: &str, key: &DefinitionKey) -> Option<Rc<dyn RawComponent>> {
		let linked = key.delegate.is_none()
			&& self
				.links
				.iter()
				.any(|link| EventKey::parse(&link.source_key).base == key.base);
		if linked || !self.definitions.get(key).map_or(false, |definition| definition.is_empty()) {
			return None;
		}

		let definition = self.definitions.remove(key)?;
		self.last_observed.remove(key);
		tracing::trace!(holder, definition = %key, "event definition dropped");
		self.raw.clone().filter(|_| definition.attached)
	}
}

impl<T: 'static> HolderBody<T> {
	fn on(&self, key: &str, delegate: Option<&str>, handler: Handler<T>) {
		let parsed = EventKey::parse(key);
		let definition_key = DefinitionKey::new(parsed.base, delegate);

		let (fresh, attach) = {
			let mut inner = self.inner.borrow_mut();
			let attach = inner.ensure_definition(&self.id, &definition_key);
			let fresh = match inner.definitions.get_mut(&definition_key) {
				Some(definition) => definition.insert(parsed.slot_id(), handler),
				None => false,
			};
			(fresh, attach)
		};

		if let Some((raw, raw_handler)) = attach {
			raw.on(parsed.base, delegate, raw_handler);
		}

		if !is_lifecycle(parsed.base) {
			let lifecycle = if fresh { HANDLER_ADDED } else { HANDLER_UPDATED };
			self.emit_lifecycle(lifecycle, &parsed, delegate, vec![]);
		}
	}

	fn off(&self, key: &str, delegate: Option<&str>) -> bool {
		let parsed = EventKey::parse(key);
		let definition_key = DefinitionKey::new(parsed.base, delegate);

		let (dropped, detach) = {
			let mut inner = self.inner.borrow_mut();
			let Some(definition) = inner.definitions.get_mut(&definition_key) else {
				return false;
			};
			if definition.remove(parsed.slot_id()).is_none() {
				return false;
			}
			if !definition.is_empty() {
				(false, None)
			} else {
				(true, inner.release_definition(&self.id, &definition_key))
			}
		};

		if let Some(raw) = detach {
			raw.off(parsed.base, delegate);
		}

		if !is_lifecycle(parsed.base) {
			self.emit_lifecycle(HANDLER_REMOVED, &parsed, delegate, vec![Value::Bool(dropped)]);
		}
		true
	}

	fn set_enabled(&self, key: &str, enabled: bool) {
		let parsed = EventKey::parse(key);
		let normalized = parsed.normalized();
		let changed = {
			let mut inner = self.inner.borrow_mut();
			if enabled {
				inner.disabled.remove(&normalized)
			} else {
				inner.disabled.insert(normalized)
			}
		};

		if changed && !is_lifecycle(parsed.base) {
			let lifecycle = if enabled { EVENT_ENABLED } else { EVENT_DISABLED };
			self.emit_lifecycle(lifecycle, &parsed, None, vec![]);
		}
	}

	fn emit_lifecycle(&self, lifecycle: &str, key: &EventKey<'_>, delegate: Option<&str>, extra: Vec<Value>) {
		let mut values = vec![Value::from(key.normalized()), Value::from(key.slot_id())];
		values.push(delegate.map(Value::from).unwrap_or_default());
		values.extend(extra);
		self.dispatch(lifecycle, None, EventArgs::new(values), Origin::Manual);
	}

	fn raw_handler(this: Weak<HolderBody<T>>, definition_key: &DefinitionKey) -> RawHandler {
		let base = definition_key.base.clone();
		let delegate = definition_key.delegate.clone();
		Rc::new(move |event: &RawEvent| {
			if let Some(body) = this.upgrade() {
				let args = EventArgs::new(event.value.iter().cloned().collect());
				let origin = Origin::Host {
					source: event.source.clone(),
					value: event.value.clone(),
				};
				body.dispatch(&base, delegate.as_deref(), args, origin);
			}
		})
	}

	fn transfer_events(&self, raw: Rc<dyn RawComponent>) {
		let (previous, moves) = {
			let mut inner = self.inner.borrow_mut();
			let previous = inner.raw.replace(raw.clone());
			let mut moves = Vec::new();
			for definition in inner.definitions.values_mut() {
				if !host::is_native(&definition.key.base) {
					continue;
				}
				moves.push((definition.key.clone(), definition.raw_handler.clone(), definition.attached));
				definition.attached = true;
			}
			inner.last_observed.clear();
			(previous, moves)
		};

		tracing::debug!(holder = %self.id, listeners = moves.len(), "transferring events to new raw object");
		for (key, handler, was_attached) in moves {
			if let Some(previous) = previous.as_ref().filter(|_| was_attached) {
				previous.off(&key.base, key.delegate.as_deref());
			}
			raw.on(&key.base, key.delegate.as_deref(), handler);
		}
	}

	fn detach_raw(&self) {
		let (raw, detached) = {
			let mut inner = self.inner.borrow_mut();
			let Some(raw) = inner.raw.take() else {
				return;
			};
			let detached: Vec<DefinitionKey> = inner
				.definitions
				.values_mut()
				.filter(|definition| definition.attached)
				.map(|definition| {
					definition.attached = false;
					definition.key.clone()
				})
				.collect();
			inner.last_observed.clear();
			(raw, detached)
		};

		tracing::debug!(holder = %self.id, listeners = detached.len(), "detaching from raw object");
		for key in detached {
			raw.off(&key.base, key.delegate.as_deref());
		}
	}

	/// Returns `true` when the dispatch must stop because the observed value
	/// did not change.
	fn observe(&self, key: &EventKey<'_>, delegate: Option<&str>, origin: &Origin) -> bool {
		if !key.is_update() {
			return false;
		}

		let definition_key = DefinitionKey::new(key.base, delegate);
		match origin {
			Origin::Host { value: Some(value), .. } => {
				let snapshot = Hashed::new(value.clone());
				let mut inner = self.inner.borrow_mut();
				let unchanged = inner
					.last_observed
					.get(&definition_key)
					.map_or(false, |last| last.unchanged(&snapshot, self.dedup));
				if !unchanged {
					inner.last_observed.insert(definition_key, snapshot);
				}
				unchanged
			}
			Origin::Host { value: None, .. } => false,
			Origin::Manual => {
				// keep the snapshot in step with what was committed, so the
				// host echo of a manual update is deduplicated
				if delegate.is_none() {
					let raw = self.inner.borrow().raw.clone();
					if let Some(raw) = raw {
						let snapshot = Hashed::new(raw.value());
						self.inner.borrow_mut().last_observed.insert(definition_key, snapshot);
					}
				}
				false
			}
		}
	}

	fn dispatch(&self, key: &str, delegate: Option<&str>, args: EventArgs, origin: Origin) {
		let parsed = EventKey::parse(key);
		let normalized = parsed.normalized();

		if self.observe(&parsed, delegate, &origin) {
			tracing::trace!(holder = %self.id, key, "value unchanged, update skipped");
			return;
		}

		let (handlers, links) = {
			let inner = self.inner.borrow();
			if inner.disabled.contains(parsed.base) || inner.disabled.contains(&normalized) {
				tracing::trace!(holder = %self.id, key, "event disabled");
				return;
			}

			let handlers = inner
				.definitions
				.get(&DefinitionKey::new(parsed.base, delegate))
				.map(|definition| definition.select(parsed.slot))
				.unwrap_or_default();

			// links forward the holder's own events, never delegated ones
			let links: SmallVec<[(Weak<dyn LinkTarget>, String); 2]> = inner
				.links
				.iter()
				.filter(|link| delegate.is_none() && link.source_key == normalized)
				.map(|link| ((*link.destination).clone(), link.destination_key.clone()))
				.collect();

			(handlers, links)
		};

		if handlers.is_empty() && links.is_empty() {
			return;
		}

		let mut canceled = false;
		if !handlers.is_empty() {
			let source = match &origin {
				Origin::Host { source, .. } => Some(source.as_str()),
				Origin::Manual => None,
			};
			let Some(target) = (self.resolver)(&Resolve { delegate, source }) else {
				tracing::warn!(holder = %self.id, key, ?delegate, ?source, "no target for event");
				return;
			};
			let depth = {
				let mut inner = self.inner.borrow_mut();
				inner.frames.push(Frame {
					base: parsed.base.to_owned(),
					canceled: FxHashSet::default(),
				});
				inner.frames.len() - 1
			};

			for (slot, handler) in handlers.iter() {
				let slot_key = format!("{}:{}", parsed.base, slot);
				{
					let inner = self.inner.borrow();
					let frame = &inner.frames[depth];
					if frame.canceled.contains(parsed.base) || frame.canceled.contains(&normalized) {
						canceled = true;
						break;
					}
					if frame.canceled.contains(&slot_key) || inner.disabled.contains(&slot_key) {
						continue;
					}
					let current = inner
						.definitions
						.get(&DefinitionKey::new(parsed.base, delegate))
						.map_or(false, |definition| definition.is_current(slot, handler));
					if !current {
						continue;
					}
				}
				self.run_isolated(key, slot, handler, &target, &args);
			}

			let mut inner = self.inner.borrow_mut();
			if let Some(frame) = inner.frames.drain(depth..).next() {
				canceled |= frame.canceled.contains(parsed.base) || frame.canceled.contains(&normalized);
			};
		}

		if canceled {
			return;
		}

		for (destination, destination_key) in links {
			let Some(destination) = destination.upgrade() else {
				continue;
			};
			if destination.holder_id() == self.id || args.chain.iter().any(|id| id.as_str() == destination.holder_id()) {
				continue;
			}
			let mut forwarded = args.clone();
			forwarded.chain.push(self.id.clone());
			destination.receive(&destination_key, forwarded);
		}
	}

	fn run_isolated(&self, key: &str, slot: &str, handler: &Handler<T>, target: &T, args: &EventArgs) {
		let outcome = catch_unwind(AssertUnwindSafe(|| handler(target, args)));
		let error = match outcome {
			Ok(Ok(())) => return,
			Ok(Err(error)) => error,
			Err(payload) => Error::from_panic(payload),
		};
		tracing::error!(holder = %self.id, key, slot, %error, "event handler failed");
	}
}

impl<T: 'static> LinkTarget for HolderBody<T> {
	fn holder_id(&self) -> &str {
		&self.id
	}

	fn receive(&self, key: &str, args: EventArgs) {
		self.dispatch(key, None, args, Origin::Manual)
	}
}

impl<T: 'static> Subscribable for HolderBody<T> {
	fn subject_id(&self) -> &str {
		&self.id
	}

	fn subscribe(&self, key: &str, callback: Rc<dyn Fn() -> Result<()>>) {
		self.on(key, None, Rc::new(move |_: &T, _: &EventArgs| callback()))
	}

	fn unsubscribe(&self, key: &str) {
		self.off(key, None);
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;
	use std::rc::Rc;

	use super::*;

	fn holder() -> (EventHolder<&'static str>, Rc<RefCell<Vec<String>>>) {
		let log = Rc::new(RefCell::new(vec![]));
		(EventHolder::with_target("h", DedupPolicy::default(), "target"), log)
	}

	fn record(log: &Rc<RefCell<Vec<String>>>, name: &'static str) -> impl Fn(&&'static str, &EventArgs) -> Result<()> {
		let log = log.clone();
		move |_: &&'static str, _: &EventArgs| {
			log.borrow_mut().push(name.to_owned());
			Ok(())
		}
	}

	#[test]
	fn base_trigger_runs_every_slot_in_order() {
		let (h, log) = holder();
		h.on("click", None, record(&log, "h1"));
		h.on("click:a", None, record(&log, "h2"));

		h.trigger("click", EventArgs::empty());
		assert_eq!(*log.borrow(), vec!["h1", "h2"]);

		log.borrow_mut().clear();
		h.trigger("click:a", EventArgs::empty());
		assert_eq!(*log.borrow(), vec!["h2"]);
	}

	#[test]
	fn reregistering_a_slot_replaces_the_handler() {
		let (h, log) = holder();
		h.on("click", None, record(&log, "first"));
		h.on("click", None, record(&log, "second"));
		assert_eq!(h.handler_count("click", None), 1);

		h.trigger("click", EventArgs::empty());
		assert_eq!(*log.borrow(), vec!["second"]);
	}

	#[test]
	fn failing_handler_does_not_block_siblings() {
		let (h, log) = holder();
		h.on("click:a", None, |_, _| Err(Error::handler("click", "nope")));
		h.on("click:b", None, |_, _| panic!("handler exploded"));
		h.on("click:c", None, record(&log, "c"));

		h.trigger("click", EventArgs::empty());
		assert_eq!(*log.borrow(), vec!["c"]);
	}

	#[test]
	fn delegated_dispatches_are_not_forwarded() {
		let (a, log) = holder();
		let b: EventHolder<&'static str> = EventHolder::with_target("b", DedupPolicy::default(), "b");
		b.on("click", None, record(&log, "b"));
		a.on("click", Some("child"), record(&log, "child"));
		a.link_event_to("click", &b, None);

		a.trigger_delegated("click", "child", EventArgs::empty());
		assert_eq!(*log.borrow(), vec!["child"]);

		a.trigger("click", EventArgs::empty());
		assert_eq!(*log.borrow(), vec!["child", "b"]);
	}

	#[test]
	fn lifecycle_events_are_observable() {
		let (h, log) = holder();
		let seen = log.clone();
		h.on(HANDLER_ADDED, None, move |_, args| {
			seen.borrow_mut().push(format!("added {}", args.values[0]));
			Ok(())
		});
		let seen = log.clone();
		h.on(HANDLER_REMOVED, None, move |_, args| {
			seen.borrow_mut().push(format!("removed {} {:?}", args.values[0], args.values[3]));
			Ok(())
		});

		h.on("click:x", None, |_, _| Ok(()));
		h.off("click:x", None);
		assert_eq!(*log.borrow(), vec!["added click:x", "removed click:x true"]);
	}
}
