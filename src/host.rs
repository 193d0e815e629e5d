//! Boundary to the sandboxed host. Everything here is implemented by the
//! embedding environment (or by test doubles).

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::Value;

/// Events the host itself can fire on a raw component. Only these get a
/// listener attached on the raw object.
pub const NATIVE_EVENTS: [&str; 5] = ["click", "update", "mouseenter", "mouseleave", "keyup"];

pub fn is_native(event: &str) -> bool {
	NATIVE_EVENTS.contains(&event)
}

/// A firing of a host-native event.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
	/// Id of the raw component that physically fired. With delegation this
	/// is a descendant of the component the listener was attached to.
	pub source: String,
	/// Current value carried by `update` firings.
	pub value: Option<Value>,
}

pub type RawHandler = Rc<dyn Fn(&RawEvent)>;

pub trait RawComponent {
	fn id(&self) -> String;

	fn value(&self) -> Value;
	fn set_value(&self, value: Value);

	fn text(&self) -> Option<String>;
	fn set_text(&self, text: &str);

	fn visible(&self) -> bool;
	fn set_visible(&self, visible: bool);

	fn has_class(&self, class: &str) -> bool;
	fn add_class(&self, class: &str);
	fn remove_class(&self, class: &str);

	/// Attaches `handler` for `event`, optionally delegated to the descendant
	/// `delegate`. The host keeps at most one handler per (event, delegate).
	fn on(&self, event: &str, delegate: Option<&str>, handler: RawHandler);
	fn off(&self, event: &str, delegate: Option<&str>);
}

pub trait RawSheet {
	fn id(&self) -> String;

	fn get(&self, id: &str) -> Option<Rc<dyn RawComponent>>;

	fn data(&self) -> BTreeMap<String, Value>;

	/// Merges `partial` into the persisted record.
	fn set_data(&self, partial: BTreeMap<String, Value>);
}

/// The host's deferred-execution primitive. The delay only means "not this
/// turn"; callbacks with equal delays must run in scheduling order.
pub trait Scheduler {
	fn wait(&self, delay_ms: u32, callback: Box<dyn FnOnce()>);
}
