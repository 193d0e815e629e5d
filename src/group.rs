use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use crate::event::{EventArgs, EventHolder, EventKey, Resolve, HANDLER_ADDED, HANDLER_REMOVED};
use crate::sheet::{Sheet, SheetBody};
use crate::{Component, Value};

/// A named set of components that share handlers.
///
/// Registering a handler on the group links the matching base event of every
/// member to the group holder, so a member firing `click` runs the group's
/// `click` handlers with the member id in [`EventArgs::linked_from`]. Links
/// are installed when the first handler for a base event appears and removed
/// with the last one. Members the cache cannot resolve yet, or resolves again
/// after an eviction, are linked at the next `cache-update` of the sheet.
#[derive(Clone)]
pub struct Group {
	body: Rc<GroupBody>,
}

struct GroupBody {
	name: String,
	sheet: Weak<SheetBody>,
	events: EventHolder<Group>,
	inner: RefCell<GroupInner>,
}

#[derive(Default)]
struct GroupInner {
	members: Vec<String>,
	/// Registered slots per base event.
	linked: BTreeMap<String, usize>,
}

impl Group {
	pub fn new(name: &str, sheet: &Sheet) -> Self {
		let runtime = sheet.runtime().clone();
		let body = Rc::new_cyclic(|this: &Weak<GroupBody>| {
			let target = this.clone();
			GroupBody {
				name: name.to_owned(),
				sheet: sheet.downgrade(),
				events: EventHolder::new(
					runtime.unique_id(&format!("group.{name}")),
					runtime.config().dedup,
					Rc::new(move |_: &Resolve<'_>| target.upgrade().map(|body| Group { body })),
				),
				inner: RefCell::new(GroupInner::default()),
			}
		});

		let weak = Rc::downgrade(&body);
		body.events.on(HANDLER_ADDED, None, move |_, args| {
			if let Some(body) = weak.upgrade() {
				body.count(args, true);
			}
			Ok(())
		});
		let weak = Rc::downgrade(&body);
		body.events.on(HANDLER_REMOVED, None, move |_, args| {
			if let Some(body) = weak.upgrade() {
				body.count(args, false);
			}
			Ok(())
		});
		let weak = Rc::downgrade(&body);
		sheet.events().on(&body.cache_key(), None, move |_, _| {
			if let Some(body) = weak.upgrade() {
				body.relink();
			}
			Ok(())
		});

		Group { body }
	}

	pub fn name(&self) -> &str {
		&self.body.name
	}

	pub fn events(&self) -> &EventHolder<Group> {
		&self.body.events
	}

	pub fn members(&self) -> Vec<String> {
		self.body.inner.borrow().members.clone()
	}

	/// Adds `id` and links it for every base event the group handles.
	pub fn add(&self, id: &str) {
		let bases: Vec<String> = {
			let mut inner = self.body.inner.borrow_mut();
			if inner.members.iter().any(|member| member == id) {
				return;
			}
			inner.members.push(id.to_owned());
			inner.linked.keys().cloned().collect()
		};

		let Some(component) = self.body.component(id) else {
			tracing::debug!(group = %self.body.name, member = id, "member not resolvable yet");
			if let Some(sheet) = self.body.sheet.upgrade() {
				Sheet::from_body(sheet).remember(id);
			}
			return;
		};
		for base in bases {
			component.events().link_event_to(&base, &self.body.events, None);
		}
	}

	pub fn remove(&self, id: &str) -> bool {
		let bases: Vec<String> = {
			let mut inner = self.body.inner.borrow_mut();
			let Some(index) = inner.members.iter().position(|member| member == id) else {
				return false;
			};
			inner.members.remove(index);
			inner.linked.keys().cloned().collect()
		};

		if let Some(component) = self.body.component(id) {
			for base in bases {
				component.events().unlink_event_to(&base, &self.body.events, None);
			}
		}
		true
	}

	/// Triggers `key` on every member.
	pub fn trigger(&self, key: &str, args: impl Into<EventArgs>) {
		let args = args.into();
		for member in self.members() {
			if let Some(component) = self.body.component(&member) {
				component.events().trigger(key, args.clone());
			}
		}
	}
}

impl std::fmt::Debug for Group {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Group")
			.field("name", &self.body.name)
			.field("members", &self.body.inner.borrow().members)
			.finish()
	}
}

impl GroupBody {
	fn cache_key(&self) -> String {
		format!("cache-update:{}", self.events.id().replace(':', "_"))
	}

	fn relink(&self) {
		let (members, bases): (Vec<String>, Vec<String>) = {
			let inner = self.inner.borrow();
			(inner.members.clone(), inner.linked.keys().cloned().collect())
		};
		if bases.is_empty() {
			return;
		}
		for member in members {
			let Some(component) = self.component(&member) else {
				continue;
			};
			for base in &bases {
				component.events().link_event_to(base, &self.events, None);
			}
		}
	}

	fn component(&self, id: &str) -> Option<Component> {
		Sheet::from_body(self.sheet.upgrade()?).get(id)
	}

	fn count(&self, args: &EventArgs, added: bool) {
		let Some(Value::Text(key)) = args.value(0) else {
			return;
		};
		let base = EventKey::parse(key).base.to_owned();

		let members = {
			let mut inner = self.inner.borrow_mut();
			let count = inner.linked.entry(base.clone()).or_default();
			let edge = if added {
				*count += 1;
				*count == 1
			} else {
				*count = count.saturating_sub(1);
				*count == 0
			};
			if !added && edge {
				inner.linked.remove(&base);
			}
			if !edge {
				return;
			}
			inner.members.clone()
		};
		let link = added;

		tracing::debug!(group = %self.name, base, link, members = members.len(), "propagating group handlers");
		for member in members {
			let Some(component) = self.component(&member) else {
				continue;
			};
			if link {
				component.events().link_event_to(&base, &self.events, None);
			} else {
				component.events().unlink_event_to(&base, &self.events, None);
			}
		}
	}
}

impl Drop for GroupBody {
	fn drop(&mut self) {
		if let Some(sheet) = self.sheet.upgrade() {
			Sheet::from_body(sheet).events().off(&self.cache_key(), None);
		}
	}
}
