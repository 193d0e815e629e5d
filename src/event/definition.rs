use std::rc::Rc;

use smallvec::SmallVec;

use super::key::DefinitionKey;
use super::Handler;
use crate::host::RawHandler;

pub(crate) type Slots<T> = SmallVec<[(String, Handler<T>); 4]>;

/// Every logical handler registered for one (base event, delegate) pair,
/// sharing a single raw host listener.
pub(crate) struct EventDefinition<T: 'static> {
	pub key: DefinitionKey,
	slots: Slots<T>,
	/// Created once; attached to the host only for native events.
	pub raw_handler: RawHandler,
	pub attached: bool,
}

impl<T: 'static> EventDefinition<T> {
	pub fn new(key: DefinitionKey, raw_handler: RawHandler) -> Self {
		EventDefinition {
			key,
			slots: SmallVec::new(),
			raw_handler,
			attached: false,
		}
	}

	/// Returns `true` when the slot was empty. An existing slot is replaced
	/// in place and keeps its position.
	pub fn insert(&mut self, slot: &str, handler: Handler<T>) -> bool {
		match self.slots.iter_mut().find(|(id, _)| id.as_str() == slot) {
			Some((_, existing)) => {
				*existing = handler;
				false
			}
			None => {
				self.slots.push((slot.to_owned(), handler));
				true
			}
		}
	}

	pub fn remove(&mut self, slot: &str) -> Option<Handler<T>> {
		let index = self.slots.iter().position(|(id, _)| id.as_str() == slot)?;
		Some(self.slots.remove(index).1)
	}

	pub fn is_current(&self, slot: &str, handler: &Handler<T>) -> bool {
		self.slots
			.iter()
			.any(|(id, h)| id.as_str() == slot && Rc::ptr_eq(h, handler))
	}

	/// Snapshot of one slot, or of every slot in insertion order.
	pub fn select(&self, slot: Option<&str>) -> Slots<T> {
		self.slots
			.iter()
			.filter(|(id, _)| slot.map_or(true, |slot| id.as_str() == slot))
			.cloned()
			.collect()
	}

	pub fn slot_ids(&self) -> impl Iterator<Item = &str> {
		self.slots.iter().map(|(id, _)| id.as_str())
	}

	pub fn len(&self) -> usize {
		self.slots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}
}
