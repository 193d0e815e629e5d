//! Setters that accept computed sources.
//!
//! A [`DynamicSetter`] wraps a plain property setter. Given a literal it just
//! applies it. Given a computation or a provider it evaluates the source in
//! virtual mode, applies the result, and subscribes itself to the events of
//! exactly the subjects the evaluation read. Every re-evaluation diffs the new
//! reads against the previous ones, so dependencies that are no longer read
//! stop re-arming the setter. Subscriptions on components follow the subject
//! id: when the cache evicts a component and resolves the id again, the
//! setter moves its subscription onto the new component.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use crate::context::{AccessKind, AccessLog, ExecutionContext};
use crate::{Error, Result, Runtime, Value};

/// Something a setter can subscribe to, usually an event holder.
pub trait Subscribable {
	fn subject_id(&self) -> &str;

	fn subscribe(&self, key: &str, callback: Rc<dyn Fn() -> Result<()>>);

	fn unsubscribe(&self, key: &str);
}

/// An external data source with a current value. Providers fire `refresh`
/// on their subscribable handle when that value changes.
pub trait Provider {
	fn id(&self) -> &str;

	fn current(&self) -> Result<Value>;
}

/// Finds the subscribable behind a logged subject.
pub type SubjectResolver = Rc<dyn Fn(AccessKind, &str) -> Option<Rc<dyn Subscribable>>>;

#[derive(Clone)]
pub enum Source {
	Literal(Value),
	Computation(Rc<dyn Fn() -> Result<Value>>),
	Provider(Rc<dyn Provider>),
}

impl Source {
	pub fn computation(func: impl Fn() -> Result<Value> + 'static) -> Self {
		Source::Computation(Rc::new(func))
	}

	pub fn provider(provider: Rc<dyn Provider>) -> Self {
		Source::Provider(provider)
	}

	pub fn is_literal(&self) -> bool {
		matches!(self, Source::Literal(_))
	}

	fn produce(&self, context: &ExecutionContext) -> Result<Value> {
		match self {
			Source::Literal(value) => Ok(value.clone()),
			Source::Computation(func) => func(),
			Source::Provider(provider) => {
				context.log_access(AccessKind::Provider, provider.id());
				provider.current()
			}
		}
	}
}

impl std::fmt::Debug for Source {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Source::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
			Source::Computation(_) => f.write_str("Computation"),
			Source::Provider(provider) => f.debug_tuple("Provider").field(&provider.id()).finish(),
		}
	}
}

impl From<Value> for Source {
	fn from(value: Value) -> Self {
		Source::Literal(value)
	}
}

impl From<&str> for Source {
	fn from(value: &str) -> Self {
		Source::Literal(value.into())
	}
}

impl From<String> for Source {
	fn from(value: String) -> Self {
		Source::Literal(value.into())
	}
}

impl From<bool> for Source {
	fn from(value: bool) -> Self {
		Source::Literal(value.into())
	}
}

impl From<f64> for Source {
	fn from(value: f64) -> Self {
		Source::Literal(value.into())
	}
}

impl From<i32> for Source {
	fn from(value: i32) -> Self {
		Source::Literal(value.into())
	}
}

#[derive(Clone)]
pub struct DynamicSetter {
	body: Rc<SetterBody>,
}

struct SetterBody {
	name: String,
	slot: String,
	runtime: Runtime,
	resolver: SubjectResolver,
	apply: Box<dyn Fn(Value) -> Result<()>>,
	inner: RefCell<SetterInner>,
}

struct SetterInner {
	source: Option<Source>,
	log: AccessLog,
	subscriptions: Vec<Subscription>,
	/// The sheet events watched for `cache-update` while component
	/// subscriptions exist.
	watch: Option<Weak<dyn Subscribable>>,
	evaluating: bool,
	this: Weak<SetterBody>,
}

struct Subscription {
	subject: String,
	event: &'static str,
	kind: AccessKind,
	/// `None` while the subject has no event source.
	target: Option<Weak<dyn Subscribable>>,
}

impl DynamicSetter {
	pub fn new(
		name: impl Into<String>,
		runtime: Runtime,
		resolver: SubjectResolver,
		apply: impl Fn(Value) -> Result<()> + 'static,
	) -> Self {
		let name = name.into();
		let slot = runtime.unique_id(&name.replace(':', "_"));
		DynamicSetter {
			body: Rc::new_cyclic(|this| SetterBody {
				name,
				slot,
				runtime,
				resolver,
				apply: Box::new(apply),
				inner: RefCell::new(SetterInner {
					source: None,
					log: AccessLog::new(),
					subscriptions: Vec::new(),
					watch: None,
					evaluating: false,
					this: this.clone(),
				}),
			}),
		}
	}

	pub fn set(&self, source: impl Into<Source>) -> Result<()> {
		self.body.set(source.into())
	}

	/// Re-runs the current computed source, if any.
	pub fn refresh(&self) -> Result<()> {
		self.body.evaluate()
	}

	/// Drops the computed source and every subscription it installed.
	pub fn detach(&self) {
		self.body.detach()
	}

	pub fn is_reactive(&self) -> bool {
		self.body.inner.borrow().source.is_some()
	}

	/// Everything the last evaluation read.
	pub fn dependencies(&self) -> AccessLog {
		self.body.inner.borrow().log.clone()
	}

	/// (subject, event) pairs this setter is currently subscribed to.
	pub fn subscriptions(&self) -> Vec<(String, &'static str)> {
		self.body
			.inner
			.borrow()
			.subscriptions
			.iter()
			.filter(|s| s.target.is_some())
			.map(|s| (s.subject.clone(), s.event))
			.collect()
	}

	/// The handler slot this setter owns on the holders it subscribes to.
	pub fn slot(&self) -> &str {
		&self.body.slot
	}
}

impl SetterBody {
	fn set(&self, source: Source) -> Result<()> {
		self.detach();
		match source {
			Source::Literal(value) => (self.apply)(value),
			source => {
				self.inner.borrow_mut().source = Some(source);
				self.evaluate()
			}
		}
	}

	fn detach(&self) {
		let subscriptions = {
			let mut inner = self.inner.borrow_mut();
			inner.source = None;
			inner.log = AccessLog::new();
			std::mem::take(&mut inner.subscriptions)
		};
		self.unsubscribe(subscriptions);
		self.unwatch();
	}

	fn evaluate(&self) -> Result<()> {
		let source = {
			let mut inner = self.inner.borrow_mut();
			if inner.evaluating {
				tracing::debug!(setter = %self.slot, "re-entrant evaluation skipped");
				return Ok(());
			}
			let Some(source) = inner.source.clone() else {
				return Ok(());
			};
			inner.evaluating = true;
			source
		};

		let context = self.runtime.context();
		let (result, log) = context.evaluate(|| source.produce(context));
		tracing::trace!(setter = %self.slot, reads = log.len(), "evaluated");

		let outcome = match result {
			Ok(value) => catch_unwind(AssertUnwindSafe(|| (self.apply)(value)))
				.unwrap_or_else(|payload| Err(Error::from_panic(payload))),
			Err(error) => {
				tracing::warn!(setter = %self.slot, %error, "computed source failed");
				Err(error)
			}
		};

		self.resubscribe(log);
		self.inner.borrow_mut().evaluating = false;
		outcome
	}

	fn resubscribe(&self, log: AccessLog) {
		let mut wanted: BTreeMap<(String, &'static str), AccessKind> = BTreeMap::new();
		for (kind, subject) in log.iter() {
			wanted
				.entry((subject.to_owned(), kind.trigger_event()))
				.or_insert(kind);
		}

		let stale = {
			let mut inner = self.inner.borrow_mut();
			let (kept, stale): (Vec<_>, Vec<_>) = std::mem::take(&mut inner.subscriptions)
				.into_iter()
				.partition(|s| wanted.contains_key(&(s.subject.clone(), s.event)));
			inner.subscriptions = kept;
			inner.log = log;
			stale
		};
		self.unsubscribe(stale);

		let fresh: Vec<_> = {
			let inner = self.inner.borrow();
			wanted
				.into_iter()
				.filter(|((subject, event), _)| {
					!inner
						.subscriptions
						.iter()
						.any(|s| &s.subject == subject && s.event == *event)
				})
				.collect()
		};

		for ((subject, event), kind) in fresh {
			let target = self.arm(kind, &subject, event);
			self.inner.borrow_mut().subscriptions.push(Subscription {
				subject,
				event,
				kind,
				target,
			});
		}
		self.watch_cache();
	}

	/// Subscribes to whatever currently fires `event` for `subject`.
	fn arm(&self, kind: AccessKind, subject: &str, event: &'static str) -> Option<Weak<dyn Subscribable>> {
		let Some(target) = (self.resolver)(kind, subject) else {
			tracing::debug!(setter = %self.slot, ?kind, subject, "dependency has no event source");
			return None;
		};
		target.subscribe(&self.key(event), self.callback(SetterBody::evaluate));
		tracing::trace!(setter = %self.slot, subject, event, "subscribed");
		Some(Rc::downgrade(&target))
	}

	/// Moves component subscriptions onto whatever the cache resolves for
	/// their subject now, and re-evaluates if any moved.
	fn rearm(&self) -> Result<()> {
		let subscriptions = std::mem::take(&mut self.inner.borrow_mut().subscriptions);
		let mut moved = 0;
		let mut kept = Vec::with_capacity(subscriptions.len());
		for mut subscription in subscriptions {
			if subscription.kind.reads_component() {
				let current = (self.resolver)(subscription.kind, &subscription.subject);
				let previous = subscription.target.as_ref().and_then(Weak::upgrade);
				let unchanged = match (&current, &previous) {
					(Some(current), Some(previous)) => same_subject(current, previous),
					(None, None) => true,
					_ => false,
				};
				if !unchanged {
					if let Some(previous) = previous {
						previous.unsubscribe(&self.key(subscription.event));
					}
					subscription.target = self.arm(subscription.kind, &subscription.subject, subscription.event);
					moved += 1;
				}
			}
			kept.push(subscription);
		}
		self.inner.borrow_mut().subscriptions.extend(kept);

		if moved == 0 {
			return Ok(());
		}
		tracing::debug!(setter = %self.slot, moved, "re-armed after cache update");
		self.evaluate()
	}

	fn watch_cache(&self) {
		let (needed, watching) = {
			let inner = self.inner.borrow();
			let needed = inner.subscriptions.iter().any(|s| s.kind.reads_component());
			(needed, inner.watch.is_some())
		};
		match (needed, watching) {
			(true, false) => {
				let Some(sheet) = (self.resolver)(AccessKind::CacheMembership, "") else {
					return;
				};
				sheet.subscribe(&self.rearm_key(), self.callback(SetterBody::rearm));
				self.inner.borrow_mut().watch = Some(Rc::downgrade(&sheet));
			}
			(false, true) => self.unwatch(),
			_ => {}
		}
	}

	fn unwatch(&self) {
		let watch = self.inner.borrow_mut().watch.take();
		if let Some(sheet) = watch.and_then(|weak| weak.upgrade()) {
			sheet.unsubscribe(&self.rearm_key());
		}
	}

	fn callback(&self, run: fn(&SetterBody) -> Result<()>) -> Rc<dyn Fn() -> Result<()>> {
		let this = self.inner.borrow().this.clone();
		Rc::new(move || match this.upgrade() {
			Some(body) => run(&body),
			None => Ok(()),
		})
	}

	fn unsubscribe(&self, subscriptions: Vec<Subscription>) {
		for subscription in subscriptions {
			if let Some(target) = subscription.target.and_then(|weak| weak.upgrade()) {
				target.unsubscribe(&self.key(subscription.event));
				tracing::trace!(setter = %self.slot, subject = %subscription.subject, "unsubscribed");
			}
		}
	}

	fn key(&self, event: &str) -> String {
		format!("{event}:{}", self.slot)
	}

	fn rearm_key(&self) -> String {
		format!("cache-update:{}.rearm", self.slot)
	}
}

fn same_subject(a: &Rc<dyn Subscribable>, b: &Rc<dyn Subscribable>) -> bool {
	Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

impl Drop for SetterBody {
	fn drop(&mut self) {
		let subscriptions = std::mem::take(&mut self.inner.get_mut().subscriptions);
		self.unsubscribe(subscriptions);
		self.unwatch();
		tracing::trace!(setter = %self.name, "dropped");
	}
}
