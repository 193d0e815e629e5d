use std::rc::Weak;

use super::EventArgs;
use crate::addr::WeakAddr;

/// Anything that can receive an event forwarded by `link_event_to`.
pub trait LinkTarget {
	fn holder_id(&self) -> &str;

	fn receive(&self, key: &str, args: EventArgs);
}

pub(crate) struct Link {
	pub source_key: String,
	pub destination: WeakAddr<dyn LinkTarget>,
	pub destination_key: String,
}

impl Link {
	pub fn new(source_key: &str, destination: Weak<dyn LinkTarget>, destination_key: &str) -> Self {
		Link {
			source_key: source_key.to_owned(),
			destination: WeakAddr::new(destination),
			destination_key: destination_key.to_owned(),
		}
	}

	pub fn matches(&self, source_key: &str, destination: &WeakAddr<dyn LinkTarget>, destination_key: Option<&str>) -> bool {
		self.source_key == source_key
			&& self.destination == *destination
			&& destination_key.map_or(true, |key| self.destination_key == key)
	}
}
