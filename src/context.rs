use std::cell::RefCell;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use fxhash::FxHashMap;

use crate::{Error, Result, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
	/// Writes reach the host.
	#[default]
	Real,
	/// Writes stay in context scratch storage and reads are logged, so a
	/// computation can be previewed and its dependencies discovered.
	Virtual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccessKind {
	Value,
	RawValue,
	VirtualValue,
	Text,
	Visibility,
	ClassState,
	Data,
	CacheMembership,
	Provider,
}

impl AccessKind {
	pub const ALL: [AccessKind; 9] = [
		AccessKind::Value,
		AccessKind::RawValue,
		AccessKind::VirtualValue,
		AccessKind::Text,
		AccessKind::Visibility,
		AccessKind::ClassState,
		AccessKind::Data,
		AccessKind::CacheMembership,
		AccessKind::Provider,
	];

	/// The event a subject fires when a read of this kind may have gone
	/// stale. This is the only kind-to-event table in the crate.
	pub fn trigger_event(self) -> &'static str {
		match self {
			AccessKind::Value | AccessKind::RawValue | AccessKind::VirtualValue | AccessKind::Text => {
				"update"
			}
			AccessKind::Visibility | AccessKind::ClassState => "class-update",
			AccessKind::Data => "data-update",
			AccessKind::CacheMembership => "cache-update",
			AccessKind::Provider => "refresh",
		}
	}

	/// Reads whose subject is a cached component, as opposed to sheet data,
	/// cache membership or a provider.
	pub fn reads_component(self) -> bool {
		!matches!(self, AccessKind::Data | AccessKind::CacheMembership | AccessKind::Provider)
	}
}

/// The set of (kind, subject) pairs read by one computation. Subjects keep
/// their first-read order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessLog {
	entries: BTreeMap<AccessKind, Vec<String>>,
}

impl AccessLog {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns `false` if the entry was already present.
	pub fn record(&mut self, kind: AccessKind, subject: &str) -> bool {
		let subjects = self.entries.entry(kind).or_default();
		if subjects.iter().any(|s| s == subject) {
			return false;
		}
		subjects.push(subject.to_owned());
		true
	}

	pub fn get(&self, kind: AccessKind) -> &[String] {
		self.entries.get(&kind).map(Vec::as_slice).unwrap_or(&[])
	}

	pub fn contains(&self, kind: AccessKind, subject: &str) -> bool {
		self.get(kind).iter().any(|s| s == subject)
	}

	pub fn iter(&self) -> impl Iterator<Item = (AccessKind, &str)> {
		self.entries
			.iter()
			.flat_map(|(kind, subjects)| subjects.iter().map(move |s| (*kind, s.as_str())))
	}

	/// Entries of `self` missing from `other`.
	pub fn difference<'a>(&'a self, other: &'a AccessLog) -> impl Iterator<Item = (AccessKind, &'a str)> {
		self.iter().filter(move |(kind, subject)| !other.contains(*kind, subject))
	}

	pub fn len(&self) -> usize {
		self.entries.values().map(Vec::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

struct SavedLogs {
	current: AccessLog,
	previous: AccessLog,
}

#[derive(Default)]
struct ContextInner {
	mode: Mode,
	current: AccessLog,
	previous: AccessLog,
	stack: Vec<SavedLogs>,
	disabled: u32,
	scratch: FxHashMap<String, Value>,
}

/// Execution mode, access log and virtual scratch storage of one session.
/// Cloning yields another handle to the same context.
#[derive(Clone, Default)]
pub struct ExecutionContext {
	inner: Rc<RefCell<ContextInner>>,
}

impl ExecutionContext {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn mode(&self) -> Mode {
		self.inner.borrow().mode
	}

	pub fn is_virtual(&self) -> bool {
		self.mode() == Mode::Virtual
	}

	/// Switching to another mode turns the current log into the previous one
	/// and drops the scratch storage. Re-entering the active mode does nothing.
	pub fn set_mode(&self, mode: Mode) {
		let mut inner = self.inner.borrow_mut();
		if inner.mode == mode {
			return;
		}

		tracing::trace!(from = ?inner.mode, to = ?mode, "switching mode");
		inner.previous = std::mem::take(&mut inner.current);
		inner.scratch.clear();
		inner.mode = mode;
	}

	pub fn log_access(&self, kind: AccessKind, subject: &str) {
		let mut inner = self.inner.borrow_mut();
		if inner.disabled > 0 {
			return;
		}
		inner.current.record(kind, subject);
	}

	pub fn access_log(&self, kind: AccessKind) -> Vec<String> {
		self.inner.borrow().current.get(kind).to_vec()
	}

	pub fn previous_access_log(&self, kind: AccessKind) -> Vec<String> {
		self.inner.borrow().previous.get(kind).to_vec()
	}

	pub fn current_log(&self) -> AccessLog {
		self.inner.borrow().current.clone()
	}

	pub fn previous_log(&self) -> AccessLog {
		self.inner.borrow().previous.clone()
	}

	/// Saves both logs and starts from an empty one.
	pub fn push_log_context(&self) {
		let mut inner = self.inner.borrow_mut();
		let saved = SavedLogs {
			current: std::mem::take(&mut inner.current),
			previous: std::mem::take(&mut inner.previous),
		};
		inner.stack.push(saved);
	}

	pub fn pop_log_context(&self) {
		let mut inner = self.inner.borrow_mut();
		match inner.stack.pop() {
			Some(saved) => {
				inner.current = saved.current;
				inner.previous = saved.previous;
			}
			None => tracing::warn!("pop_log_context without a matching push"),
		}
	}

	pub fn disable_access_log(&self) {
		self.inner.borrow_mut().disabled += 1;
	}

	pub fn enable_access_log(&self) {
		let mut inner = self.inner.borrow_mut();
		inner.disabled = inner.disabled.saturating_sub(1);
	}

	pub fn is_logging(&self) -> bool {
		self.inner.borrow().disabled == 0
	}

	/// Only stored while in virtual mode.
	pub fn set_context(&self, id: &str, value: Value) {
		let mut inner = self.inner.borrow_mut();
		if inner.mode != Mode::Virtual {
			tracing::trace!(id, "context write ignored in real mode");
			return;
		}
		inner.scratch.insert(id.to_owned(), value);
	}

	pub fn context(&self, id: &str) -> Option<Value> {
		let inner = self.inner.borrow();
		if inner.mode != Mode::Virtual {
			return None;
		}
		inner.scratch.get(id).cloned()
	}

	/// Runs `func` in virtual mode inside its own log region and returns what
	/// it produced together with everything it read. The previous mode and
	/// log region are restored whatever `func` does, panics included.
	pub fn evaluate<R>(&self, func: impl FnOnce() -> Result<R>) -> (Result<R>, AccessLog) {
		let scope = VirtualScope::enter(self);
		let result = catch_unwind(AssertUnwindSafe(func)).unwrap_or_else(|payload| Err(Error::from_panic(payload)));
		let log = scope.finish();
		(result, log)
	}

	/// Runs `func` without recording any access.
	pub fn untracked<R>(&self, func: impl FnOnce() -> R) -> R {
		let _guard = Untracked::new(self);
		func()
	}
}

struct VirtualScope<'a> {
	context: &'a ExecutionContext,
	previous_mode: Mode,
	armed: bool,
}

impl<'a> VirtualScope<'a> {
	fn enter(context: &'a ExecutionContext) -> Self {
		let previous_mode = context.mode();
		context.push_log_context();
		context.set_mode(Mode::Virtual);
		VirtualScope {
			context,
			previous_mode,
			armed: true,
		}
	}

	fn finish(mut self) -> AccessLog {
		let log = std::mem::take(&mut self.context.inner.borrow_mut().current);
		self.restore();
		log
	}

	fn restore(&mut self) {
		if !self.armed {
			return;
		}
		self.armed = false;
		self.context.set_mode(self.previous_mode);
		self.context.pop_log_context();
	}
}

impl Drop for VirtualScope<'_> {
	fn drop(&mut self) {
		self.restore();
	}
}

struct Untracked<'a>(&'a ExecutionContext);

impl<'a> Untracked<'a> {
	fn new(context: &'a ExecutionContext) -> Self {
		context.disable_access_log();
		Untracked(context)
	}
}

impl Drop for Untracked<'_> {
	fn drop(&mut self) {
		self.0.enable_access_log();
	}
}
