use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use crate::context::AccessKind;
use crate::event::{EventHolder, Resolve, TargetResolver};
use crate::host::RawComponent;
use crate::setter::{DynamicSetter, Source};
use crate::sheet::{self, Sheet, SheetBody};
use crate::{Result, Runtime, Value};

/// Logical wrapper over a raw host component.
///
/// Reads are logged into the execution context so computed setters learn
/// their dependencies. In virtual mode writes go to context scratch storage;
/// in real mode they reach the host and fire `update` (value, text) or
/// `class-update` (visibility, classes). Visibility and class changes are
/// pushed to the host once per turn.
#[derive(Clone)]
pub struct Component {
	body: Rc<ComponentBody>,
}

struct ComponentBody {
	id: String,
	runtime: Runtime,
	sheet: Weak<SheetBody>,
	raw: RefCell<Rc<dyn RawComponent>>,
	events: EventHolder<Component>,
	value: DynamicSetter,
	text: DynamicSetter,
	visible: DynamicSetter,
	pending: RefCell<PendingToggles>,
	this: Weak<ComponentBody>,
}

#[derive(Default)]
struct PendingToggles {
	visible: Option<bool>,
	classes: BTreeMap<String, bool>,
	scheduled: bool,
}

impl Component {
	pub(crate) fn new(id: &str, raw: Rc<dyn RawComponent>, runtime: Runtime, sheet: Weak<SheetBody>) -> Self {
		let resolver = sheet::subject_resolver(sheet.clone());
		let body = Rc::new_cyclic(|this: &Weak<ComponentBody>| {
			let events = EventHolder::new(id, runtime.config().dedup, target_resolver(this.clone(), runtime.clone()));

			let setter = |property: &str, apply: fn(&ComponentBody, Value) -> Result<()>| {
				let this = this.clone();
				DynamicSetter::new(
					format!("{id}.{property}"),
					runtime.clone(),
					resolver.clone(),
					move |value| match this.upgrade() {
						Some(body) => apply(&body, value),
						None => Ok(()),
					},
				)
			};

			ComponentBody {
				id: id.to_owned(),
				runtime: runtime.clone(),
				sheet: sheet.clone(),
				raw: RefCell::new(raw.clone()),
				value: setter("value", ComponentBody::apply_value),
				text: setter("text", ComponentBody::apply_text),
				visible: setter("visible", ComponentBody::apply_visible),
				events,
				pending: RefCell::new(PendingToggles::default()),
				this: this.clone(),
			}
		});

		body.events.attach_raw(raw);
		Component { body }
	}

	pub fn id(&self) -> &str {
		&self.body.id
	}

	pub fn events(&self) -> &EventHolder<Component> {
		&self.body.events
	}

	pub fn sheet(&self) -> Option<Sheet> {
		self.body.sheet.upgrade().map(Sheet::from_body)
	}

	pub fn raw(&self) -> Rc<dyn RawComponent> {
		self.body.raw.borrow().clone()
	}

	/// Detaches from the host object once the cache evicts this component.
	pub(crate) fn release(&self) {
		tracing::debug!(component = %self.body.id, "released from cache");
		self.body.events.detach_raw();
	}

	/// Swaps the underlying host object, keeping every logical handler.
	pub fn replace_raw(&self, raw: Rc<dyn RawComponent>) {
		*self.body.raw.borrow_mut() = raw.clone();
		self.body.events.transfer_events(raw);
	}

	pub fn value(&self) -> Value {
		let context = self.body.runtime.context();
		context.log_access(AccessKind::Value, &self.body.id);
		context
			.context(&self.body.scratch_key("value"))
			.unwrap_or_else(|| self.raw().value())
	}

	/// The host's value, ignoring any virtual override.
	pub fn raw_value(&self) -> Value {
		self.body
			.runtime
			.context()
			.log_access(AccessKind::RawValue, &self.body.id);
		self.raw().value()
	}

	/// The value written during the current virtual evaluation, if any.
	pub fn virtual_value(&self) -> Option<Value> {
		let context = self.body.runtime.context();
		context.log_access(AccessKind::VirtualValue, &self.body.id);
		context.context(&self.body.scratch_key("value"))
	}

	pub fn text(&self) -> Option<String> {
		let context = self.body.runtime.context();
		context.log_access(AccessKind::Text, &self.body.id);
		match context.context(&self.body.scratch_key("text")) {
			Some(text) => Some(text.to_string()),
			None => self.raw().text(),
		}
	}

	pub fn visible(&self) -> bool {
		let context = self.body.runtime.context();
		context.log_access(AccessKind::Visibility, &self.body.id);
		if let Some(visible) = context.context(&self.body.scratch_key("visible")) {
			return visible.is_truthy();
		}
		self.body.visible_now()
	}

	pub fn has_class(&self, class: &str) -> bool {
		let context = self.body.runtime.context();
		context.log_access(AccessKind::ClassState, &self.body.id);
		if let Some(state) = context.context(&self.body.scratch_key(&format!("class.{class}"))) {
			return state.is_truthy();
		}
		self.body.has_class_now(class)
	}

	pub fn set_value(&self, source: impl Into<Source>) -> Result<()> {
		self.body.value.set(source)
	}

	pub fn set_text(&self, source: impl Into<Source>) -> Result<()> {
		self.body.text.set(source)
	}

	pub fn set_visible(&self, source: impl Into<Source>) -> Result<()> {
		self.body.visible.set(source)
	}

	pub fn add_class(&self, class: &str) {
		self.body.toggle_class(class, true)
	}

	pub fn remove_class(&self, class: &str) {
		self.body.toggle_class(class, false)
	}

	pub fn value_binding(&self) -> &DynamicSetter {
		&self.body.value
	}

	pub fn text_binding(&self) -> &DynamicSetter {
		&self.body.text
	}

	pub fn visible_binding(&self) -> &DynamicSetter {
		&self.body.visible
	}
}

impl std::fmt::Debug for Component {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Component").field("id", &self.body.id).finish()
	}
}

fn target_resolver(this: Weak<ComponentBody>, runtime: Runtime) -> TargetResolver<Component> {
	Rc::new(move |resolve: &Resolve<'_>| {
		let component = Component { body: this.upgrade()? };
		let descendant = match (resolve.source, resolve.delegate) {
			(Some(source), _) if source != component.id() => source.to_owned(),
			(None, Some(delegate)) => runtime.join(component.id(), delegate),
			_ => return Some(component),
		};
		component.sheet()?.get(&descendant)
	})
}

impl ComponentBody {
	fn scratch_key(&self, property: &str) -> String {
		format!("{}#{}", self.id, property)
	}

	fn raw(&self) -> Rc<dyn RawComponent> {
		self.raw.borrow().clone()
	}

	fn apply_value(&self, value: Value) -> Result<()> {
		let context = self.runtime.context();
		if context.is_virtual() {
			context.set_context(&self.scratch_key("value"), value);
			return Ok(());
		}

		let raw = self.raw();
		if raw.value() == value {
			return Ok(());
		}
		raw.set_value(value.clone());
		self.events.trigger("update", vec![value]);
		Ok(())
	}

	fn apply_text(&self, value: Value) -> Result<()> {
		let context = self.runtime.context();
		if context.is_virtual() {
			context.set_context(&self.scratch_key("text"), value);
			return Ok(());
		}

		let text = value.to_string();
		let raw = self.raw();
		if raw.text().as_deref() == Some(text.as_str()) {
			return Ok(());
		}
		raw.set_text(&text);
		self.events.trigger("update", vec![Value::from(text)]);
		Ok(())
	}

	fn apply_visible(&self, value: Value) -> Result<()> {
		let visible = value.is_truthy();
		let context = self.runtime.context();
		if context.is_virtual() {
			context.set_context(&self.scratch_key("visible"), Value::Bool(visible));
			return Ok(());
		}

		if self.visible_now() == visible {
			return Ok(());
		}
		self.pending.borrow_mut().visible = Some(visible);
		self.schedule_toggles();
		self.events
			.trigger("class-update", vec![Value::from("visible"), Value::Bool(visible)]);
		Ok(())
	}

	fn toggle_class(&self, class: &str, on: bool) {
		let context = self.runtime.context();
		if context.is_virtual() {
			context.set_context(&self.scratch_key(&format!("class.{class}")), Value::Bool(on));
			return;
		}

		if self.has_class_now(class) == on {
			return;
		}
		self.pending.borrow_mut().classes.insert(class.to_owned(), on);
		self.schedule_toggles();
		self.events
			.trigger("class-update", vec![Value::from(class), Value::Bool(on)]);
	}

	fn visible_now(&self) -> bool {
		let pending = self.pending.borrow().visible;
		pending.unwrap_or_else(|| self.raw().visible())
	}

	fn has_class_now(&self, class: &str) -> bool {
		let pending = self.pending.borrow().classes.get(class).copied();
		pending.unwrap_or_else(|| self.raw().has_class(class))
	}

	fn schedule_toggles(&self) {
		let this = {
			let mut pending = self.pending.borrow_mut();
			if pending.scheduled {
				return;
			}
			pending.scheduled = true;
			self.this.clone()
		};

		self.runtime.defer(move || {
			if let Some(body) = this.upgrade() {
				body.apply_toggles();
			}
		});
	}

	fn apply_toggles(&self) {
		let pending = std::mem::take(&mut *self.pending.borrow_mut());
		let raw = self.raw();

		if let Some(visible) = pending.visible.filter(|v| *v != raw.visible()) {
			raw.set_visible(visible);
		}
		for (class, on) in pending.classes {
			match (on, raw.has_class(&class)) {
				(true, false) => raw.add_class(&class),
				(false, true) => raw.remove_class(&class),
				_ => {}
			}
		}
		tracing::trace!(component = %self.id, "visual toggles applied");
	}
}
