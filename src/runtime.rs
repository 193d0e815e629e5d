use std::cell::Cell;
use std::rc::Rc;

use crate::host::Scheduler;
use crate::{ExecutionContext, RuntimeConfig};

/// Per-session services shared by every wrapper: the execution context, the
/// host scheduler and the configuration. Build one per document session and
/// hand clones to everything constructed in that session.
#[derive(Clone)]
pub struct Runtime {
	body: Rc<RuntimeBody>,
}

struct RuntimeBody {
	context: ExecutionContext,
	scheduler: Rc<dyn Scheduler>,
	config: RuntimeConfig,
	next_id: Cell<u64>,
}

impl Runtime {
	pub fn new(scheduler: Rc<dyn Scheduler>, config: RuntimeConfig) -> Self {
		Runtime {
			body: Rc::new(RuntimeBody {
				context: ExecutionContext::new(),
				scheduler,
				config,
				next_id: Cell::new(0),
			}),
		}
	}

	pub fn context(&self) -> &ExecutionContext {
		&self.body.context
	}

	pub fn config(&self) -> &RuntimeConfig {
		&self.body.config
	}

	pub fn separator(&self) -> char {
		self.body.config.separator
	}

	/// Runs `func` after the current synchronous turn.
	pub fn defer(&self, func: impl FnOnce() + 'static) {
		self.body
			.scheduler
			.wait(self.body.config.flush_delay_ms, Box::new(func));
	}

	/// A session-unique id, used for handler slots owned by the runtime.
	pub fn unique_id(&self, prefix: &str) -> String {
		let id = self.body.next_id.get() + 1;
		self.body.next_id.set(id);
		format!("{prefix}#{id}")
	}

	/// Joins hierarchical id segments with the configured separator.
	pub fn join(&self, parent: &str, child: &str) -> String {
		format!("{parent}{}{child}", self.separator())
	}
}
