use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::host::Scheduler;

type Task = Box<dyn FnOnce()>;

/// An in-process deferred executor. Nothing runs until `run_pending` is
/// called, which is how an embedder (or a test) marks the end of a
/// synchronous turn.
#[derive(Clone, Default)]
pub struct DeferredQueue {
	inner: Rc<RefCell<QueueInner>>,
}

#[derive(Default)]
struct QueueInner {
	seq: u64,
	running: bool,
	pending: BTreeMap<(u32, u64), Task>,
}

impl DeferredQueue {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.inner.borrow().pending.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Runs deferred callbacks, shortest delay first and in scheduling order
	/// within a delay, until none remain. Callbacks scheduled while draining
	/// run in the same call. Returns the number of callbacks executed.
	pub fn run_pending(&self) -> usize {
		{
			let mut inner = self.inner.borrow_mut();
			if inner.running {
				return 0;
			}
			inner.running = true;
		}

		let mut executed = 0;
		loop {
			let next = {
				let mut inner = self.inner.borrow_mut();
				inner.pending.pop_first()
			};

			let Some((_, task)) = next else {
				break;
			};

			task();
			executed += 1;
		}

		self.inner.borrow_mut().running = false;
		tracing::trace!(executed, "deferred queue drained");
		executed
	}
}

impl Scheduler for DeferredQueue {
	fn wait(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) {
		let mut inner = self.inner.borrow_mut();
		inner.seq += 1;
		let seq = inner.seq;
		inner.pending.insert((delay_ms, seq), callback);
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;
	use std::rc::Rc;

	use super::*;

	#[test]
	fn same_delay_runs_in_scheduling_order() {
		let queue = DeferredQueue::new();
		let order = Rc::new(RefCell::new(vec![]));

		for i in 0..3 {
			let order = order.clone();
			queue.wait(10, Box::new(move || order.borrow_mut().push(i)));
		}
		let early = order.clone();
		queue.wait(0, Box::new(move || early.borrow_mut().push(99)));

		assert!(order.borrow().is_empty());
		assert_eq!(queue.run_pending(), 4);
		assert_eq!(*order.borrow(), vec![99, 0, 1, 2]);
	}

	#[test]
	fn drains_work_scheduled_while_running() {
		let queue = DeferredQueue::new();
		let hits = Rc::new(RefCell::new(0));

		let inner_queue = queue.clone();
		let inner_hits = hits.clone();
		queue.wait(
			0,
			Box::new(move || {
				*inner_hits.borrow_mut() += 1;
				let hits = inner_hits.clone();
				inner_queue.wait(0, Box::new(move || *hits.borrow_mut() += 1));
			}),
		);

		assert_eq!(queue.run_pending(), 2);
		assert_eq!(*hits.borrow(), 2);
		assert!(queue.is_empty());
	}
}
