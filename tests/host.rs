use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use sheet_reactor::host::{RawComponent, RawEvent, RawHandler, RawSheet};
use sheet_reactor::Value;

type ListenerKey = (String, Option<String>);

/// In-memory stand-in for a host component.
#[derive(Default)]
pub struct FakeComponent {
	id: String,
	value: RefCell<Value>,
	text: RefCell<Option<String>>,
	visible: Cell<bool>,
	classes: RefCell<BTreeSet<String>>,
	listeners: RefCell<BTreeMap<ListenerKey, RawHandler>>,
	pub attached: Cell<usize>,
}

impl FakeComponent {
	pub fn new(id: &str) -> Rc<Self> {
		Rc::new(FakeComponent {
			id: id.to_owned(),
			visible: Cell::new(true),
			..Default::default()
		})
	}

	/// Simulates the host firing `event`. An `update` carrying a value first
	/// stores it, as a user edit would.
	pub fn fire(&self, event: &str, delegate: Option<&str>, source: &str, value: Option<Value>) {
		if let (Some(value), "update") = (value.as_ref(), event) {
			*self.value.borrow_mut() = value.clone();
		}
		let handler = self
			.listeners
			.borrow()
			.get(&(event.to_owned(), delegate.map(str::to_owned)))
			.cloned();
		if let Some(handler) = handler {
			handler(&RawEvent {
				source: source.to_owned(),
				value,
			});
		}
	}

	pub fn listener_count(&self) -> usize {
		self.listeners.borrow().len()
	}

	pub fn has_listener(&self, event: &str, delegate: Option<&str>) -> bool {
		self.listeners
			.borrow()
			.contains_key(&(event.to_owned(), delegate.map(str::to_owned)))
	}
}

impl RawComponent for FakeComponent {
	fn id(&self) -> String {
		self.id.clone()
	}

	fn value(&self) -> Value {
		self.value.borrow().clone()
	}

	fn set_value(&self, value: Value) {
		*self.value.borrow_mut() = value;
	}

	fn text(&self) -> Option<String> {
		self.text.borrow().clone()
	}

	fn set_text(&self, text: &str) {
		*self.text.borrow_mut() = Some(text.to_owned());
	}

	fn visible(&self) -> bool {
		self.visible.get()
	}

	fn set_visible(&self, visible: bool) {
		self.visible.set(visible)
	}

	fn has_class(&self, class: &str) -> bool {
		self.classes.borrow().contains(class)
	}

	fn add_class(&self, class: &str) {
		self.classes.borrow_mut().insert(class.to_owned());
	}

	fn remove_class(&self, class: &str) {
		self.classes.borrow_mut().remove(class);
	}

	fn on(&self, event: &str, delegate: Option<&str>, handler: RawHandler) {
		self.attached.set(self.attached.get() + 1);
		self.listeners
			.borrow_mut()
			.insert((event.to_owned(), delegate.map(str::to_owned)), handler);
	}

	fn off(&self, event: &str, delegate: Option<&str>) {
		self.listeners
			.borrow_mut()
			.remove(&(event.to_owned(), delegate.map(str::to_owned)));
	}
}

#[derive(Default)]
pub struct FakeSheet {
	components: RefCell<BTreeMap<String, Rc<FakeComponent>>>,
	data: RefCell<BTreeMap<String, Value>>,
	pub lookups: Cell<usize>,
	pub writes: Cell<usize>,
}

impl FakeSheet {
	pub fn with(ids: &[&str]) -> Rc<Self> {
		let sheet = Rc::new(FakeSheet::default());
		for id in ids {
			sheet.add(id);
		}
		sheet
	}

	pub fn add(&self, id: &str) -> Rc<FakeComponent> {
		let component = FakeComponent::new(id);
		self.components
			.borrow_mut()
			.insert(id.to_owned(), component.clone());
		component
	}

	pub fn component(&self, id: &str) -> Rc<FakeComponent> {
		self.components.borrow()[id].clone()
	}

	pub fn stored(&self, key: &str) -> Option<Value> {
		self.data.borrow().get(key).cloned()
	}
}

impl RawSheet for FakeSheet {
	fn id(&self) -> String {
		"sheet".to_owned()
	}

	fn get(&self, id: &str) -> Option<Rc<dyn RawComponent>> {
		self.lookups.set(self.lookups.get() + 1);
		let component = self.components.borrow().get(id).cloned()?;
		Some(component)
	}

	fn data(&self) -> BTreeMap<String, Value> {
		self.data.borrow().clone()
	}

	fn set_data(&self, partial: BTreeMap<String, Value>) {
		self.writes.set(self.writes.get() + 1);
		self.data.borrow_mut().extend(partial);
	}
}
