use std::cell::RefCell;
use std::rc::{Rc, Weak};

use fxhash::FxHashMap;

use crate::context::AccessKind;
use crate::event::{EventArgs, EventHolder};
use crate::host::RawSheet;
use crate::setter::{DynamicSetter, Provider, SubjectResolver, Subscribable};
use crate::{Component, ComponentCache, DataBatcher, Group, Result, Runtime, Value};

/// One wrapped host sheet: the component cache, the data batcher, the
/// provider registry and the sheet-level events (`data-update`,
/// `cache-update`).
#[derive(Clone)]
pub struct Sheet {
	body: Rc<SheetBody>,
}

pub(crate) struct SheetBody {
	id: String,
	runtime: Runtime,
	raw: Rc<dyn RawSheet>,
	cache: ComponentCache<Component>,
	batcher: DataBatcher,
	events: EventHolder<Sheet>,
	providers: RefCell<FxHashMap<String, RegisteredProvider>>,
}

struct RegisteredProvider {
	provider: Rc<dyn Provider>,
	events: EventHolder<Sheet>,
}

impl Sheet {
	pub fn new(runtime: Runtime, raw: Rc<dyn RawSheet>) -> Self {
		let id = raw.id();
		let body = Rc::new_cyclic(|this: &Weak<SheetBody>| {
			let cache = {
				let this = this.clone();
				let runtime = runtime.clone();
				ComponentCache::new(runtime.clone(), move |key: &str| -> Result<Option<Component>> {
					let Some(body) = this.upgrade() else {
						return Ok(None);
					};
					Ok(body
						.raw
						.get(key)
						.map(|raw| Component::new(key, raw, runtime.clone(), this.clone())))
				})
			};

			SheetBody {
				events: EventHolder::new(id.clone(), runtime.config().dedup, sheet_target(this.clone())),
				id,
				batcher: DataBatcher::new(runtime.clone(), raw.clone()),
				runtime,
				raw,
				cache,
				providers: RefCell::new(FxHashMap::default()),
			}
		});

		body.cache
			.set_eviction_listener(Rc::new(|_: &str, component: &Component| component.release()));
		let weak = Rc::downgrade(&body);
		body.cache.set_flush_listener(Rc::new(move |evicted: &[String], resolved: &[String]| {
			if let Some(body) = weak.upgrade() {
				let evicted = Value::from(evicted.to_vec());
				let resolved = Value::from(resolved.to_vec());
				body.events.trigger("cache-update", vec![evicted, resolved]);
			}
		}));

		Sheet { body }
	}

	pub(crate) fn from_body(body: Rc<SheetBody>) -> Self {
		Sheet { body }
	}

	pub(crate) fn downgrade(&self) -> Weak<SheetBody> {
		Rc::downgrade(&self.body)
	}

	pub fn id(&self) -> &str {
		&self.body.id
	}

	pub fn runtime(&self) -> &Runtime {
		&self.body.runtime
	}

	pub fn events(&self) -> &EventHolder<Sheet> {
		&self.body.events
	}

	pub fn cache(&self) -> &ComponentCache<Component> {
		&self.body.cache
	}

	pub fn batcher(&self) -> &DataBatcher {
		&self.body.batcher
	}

	pub fn get(&self, id: &str) -> Option<Component> {
		self.body.cache.get(id)
	}

	/// Whether `id` is resolved in the cache; `*prefix` asks for any
	/// resolved descendant. Logged as a cache-membership read.
	pub fn has_component(&self, id: &str) -> bool {
		self.body
			.runtime
			.context()
			.log_access(AccessKind::CacheMembership, id);
		self.body.cache.in_cache(id)
	}

	pub fn remember(&self, id: &str) {
		self.body.cache.remember(id)
	}

	pub fn forget(&self, id: &str) {
		self.body.cache.forget(id)
	}

	pub fn data(&self, key: &str) -> Option<Value> {
		let context = self.body.runtime.context();
		context.log_access(AccessKind::Data, key);
		context
			.context(&data_key(key))
			.or_else(|| self.body.batcher.get(key))
	}

	pub fn set_data(&self, key: &str, value: Value) {
		let context = self.body.runtime.context();
		if context.is_virtual() {
			context.set_context(&data_key(key), value);
			return;
		}
		self.body.batcher.set(key, value.clone());
		self.body
			.events
			.trigger("data-update", vec![Value::from(key), value]);
	}

	pub fn register_provider(&self, provider: Rc<dyn Provider>) {
		let id = provider.id().to_owned();
		let events = EventHolder::new(
			id.clone(),
			self.body.runtime.config().dedup,
			sheet_target(self.downgrade()),
		);
		tracing::debug!(sheet = %self.body.id, provider = %id, "provider registered");
		self.body
			.providers
			.borrow_mut()
			.insert(id, RegisteredProvider { provider, events });
	}

	pub fn provider(&self, id: &str) -> Option<Rc<dyn Provider>> {
		self.body
			.providers
			.borrow()
			.get(id)
			.map(|registered| registered.provider.clone())
	}

	/// Tells every setter that read provider `id` to re-evaluate.
	pub fn refresh_provider(&self, id: &str) -> Result<()> {
		let events = self
			.body
			.providers
			.borrow()
			.get(id)
			.map(|registered| registered.events.clone())
			.ok_or_else(|| crate::Error::UnknownProvider(id.to_owned()))?;
		events.trigger("refresh", EventArgs::empty());
		Ok(())
	}

	/// A setter whose computed sources resolve their dependencies through
	/// this sheet.
	pub fn setter(&self, name: &str, apply: impl Fn(Value) -> Result<()> + 'static) -> DynamicSetter {
		DynamicSetter::new(
			name,
			self.body.runtime.clone(),
			subject_resolver(Rc::downgrade(&self.body)),
			apply,
		)
	}

	pub fn group(&self, name: &str, members: &[&str]) -> Group {
		let group = Group::new(name, self);
		for member in members {
			group.add(member);
		}
		group
	}
}

impl std::fmt::Debug for Sheet {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Sheet").field("id", &self.body.id).finish()
	}
}

fn data_key(key: &str) -> String {
	format!("data#{key}")
}

fn sheet_target(this: Weak<SheetBody>) -> crate::event::TargetResolver<Sheet> {
	Rc::new(move |_: &crate::event::Resolve<'_>| this.upgrade().map(Sheet::from_body))
}

/// Maps logged subjects to what fires their invalidation events: the sheet
/// for data and cache reads, the registry for providers, the component
/// otherwise.
pub(crate) fn subject_resolver(sheet: Weak<SheetBody>) -> SubjectResolver {
	Rc::new(move |kind: AccessKind, subject: &str| -> Option<Rc<dyn Subscribable>> {
		let body = sheet.upgrade()?;
		let subscribable = match kind {
			AccessKind::Data | AccessKind::CacheMembership => Some(body.events.subscribable()),
			AccessKind::Provider => body
				.providers
				.borrow()
				.get(subject)
				.map(|registered| registered.events.subscribable()),
			_ => body
				.cache
				.get(subject)
				.map(|component| component.events().subscribable()),
		};
		subscribable
	})
}
