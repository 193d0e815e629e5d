use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use crate::host::RawSheet;
use crate::{Runtime, Value};

/// Coalesces writes to the host-persisted record: every `set` within one
/// turn lands in a single `RawSheet::set_data` call.
#[derive(Clone)]
pub struct DataBatcher {
	body: Rc<BatcherBody>,
}

struct BatcherBody {
	runtime: Runtime,
	sheet: Rc<dyn RawSheet>,
	inner: RefCell<BatcherInner>,
}

struct BatcherInner {
	pending: BTreeMap<String, Value>,
	scheduled: bool,
	this: Weak<BatcherBody>,
}

impl DataBatcher {
	pub fn new(runtime: Runtime, sheet: Rc<dyn RawSheet>) -> Self {
		DataBatcher {
			body: Rc::new_cyclic(|this| BatcherBody {
				runtime,
				sheet,
				inner: RefCell::new(BatcherInner {
					pending: BTreeMap::new(),
					scheduled: false,
					this: this.clone(),
				}),
			}),
		}
	}

	pub fn set(&self, key: &str, value: Value) {
		let schedule = {
			let mut inner = self.body.inner.borrow_mut();
			inner.pending.insert(key.to_owned(), value);
			if inner.scheduled {
				None
			} else {
				inner.scheduled = true;
				Some(inner.this.clone())
			}
		};

		if let Some(this) = schedule {
			self.body.runtime.defer(move || {
				if let Some(body) = this.upgrade() {
					body.flush();
				}
			});
		}
	}

	/// The pending value if one is queued, otherwise the persisted one.
	pub fn get(&self, key: &str) -> Option<Value> {
		if let Some(value) = self.body.inner.borrow().pending.get(key) {
			return Some(value.clone());
		}
		self.body.sheet.data().get(key).cloned()
	}

	pub fn has_pending(&self) -> bool {
		!self.body.inner.borrow().pending.is_empty()
	}

	pub fn flush(&self) {
		self.body.flush()
	}
}

impl BatcherBody {
	fn flush(&self) {
		let pending = {
			let mut inner = self.inner.borrow_mut();
			inner.scheduled = false;
			std::mem::take(&mut inner.pending)
		};

		if pending.is_empty() {
			return;
		}

		tracing::debug!(entries = pending.len(), "flushing batched data");
		self.sheet.set_data(pending);
	}
}
