use std::cell::Cell;
use std::rc::Rc;

use sheet_reactor::host::RawComponent;
use sheet_reactor::{computation, AccessKind, Error, Provider, Result, Source, Value};

use crate::Fixture;

struct Rate {
	value: Cell<f64>,
}

impl Provider for Rate {
	fn id(&self) -> &str {
		"rate"
	}

	fn current(&self) -> Result<Value> {
		Ok(Value::from(self.value.get()))
	}
}

fn number(value: Value) -> f64 {
	value.as_number().unwrap_or(0.0)
}

#[test]
fn recomputes_when_a_dependency_changes() {
	let fx = Fixture::new(&["a", "b", "total"]);
	let a = fx.sheet.get("a").unwrap();
	let b = fx.sheet.get("b").unwrap();
	let total = fx.sheet.get("total").unwrap();

	a.set_value(2).unwrap();
	b.set_value(3).unwrap();
	total
		.set_value(computation!((a, b) => number(a.value()) + number(b.value())))
		.unwrap();
	assert_eq!(fx.raw.component("total").value(), Value::from(5));

	a.set_value(10).unwrap();
	assert_eq!(fx.raw.component("total").value(), Value::from(13));

	fx.raw.component("b").fire("update", None, "b", Some(Value::from(4)));
	assert_eq!(fx.raw.component("total").value(), Value::from(14));
}

#[test]
fn stale_dependencies_are_dropped() {
	let fx = Fixture::new(&["flag", "a", "b", "out"]);
	let flag = fx.sheet.get("flag").unwrap();
	let a = fx.sheet.get("a").unwrap();
	let b = fx.sheet.get("b").unwrap();
	let out = fx.sheet.get("out").unwrap();
	let runs = Rc::new(Cell::new(0));

	let counter = runs.clone();
	let (f, x, y) = (flag.clone(), a.clone(), b.clone());
	out.set_value(Source::computation(move || {
		counter.set(counter.get() + 1);
		Ok(if f.value().is_truthy() { x.value() } else { y.value() })
	}))
	.unwrap();
	assert_eq!(runs.get(), 1);
	assert!(out.value_binding().dependencies().contains(AccessKind::Value, "b"));

	flag.set_value(true).unwrap();
	assert_eq!(runs.get(), 2);
	let dependencies = out.value_binding().dependencies();
	assert!(dependencies.contains(AccessKind::Value, "a"));
	assert!(!dependencies.contains(AccessKind::Value, "b"));
	assert_eq!(b.events().handler_count("update", None), 0);

	b.set_value(7).unwrap();
	assert_eq!(runs.get(), 2);

	a.set_value(1).unwrap();
	assert_eq!(runs.get(), 3);
	assert_eq!(fx.raw.component("out").value(), Value::from(1));
}

#[test]
fn a_literal_drops_every_subscription() {
	let fx = Fixture::new(&["a", "out"]);
	let a = fx.sheet.get("a").unwrap();
	let out = fx.sheet.get("out").unwrap();

	out.set_value(computation!((a) => a.value())).unwrap();
	assert_eq!(a.events().handler_count("update", None), 1);
	assert!(out.value_binding().is_reactive());

	out.set_value("fixed").unwrap();
	assert_eq!(a.events().handler_count("update", None), 0);
	assert!(out.value_binding().subscriptions().is_empty());
	assert_eq!(fx.raw.component("out").value(), Value::from("fixed"));
}

#[test]
fn subscriptions_do_not_replace_user_handlers() {
	let fx = Fixture::new(&["a", "out"]);
	let a = fx.sheet.get("a").unwrap();
	let out = fx.sheet.get("out").unwrap();
	let hits = Rc::new(Cell::new(0));

	let counter = hits.clone();
	a.events().on("update", None, move |_, _| {
		counter.set(counter.get() + 1);
		Ok(())
	});
	out.set_value(computation!((a) => a.value())).unwrap();
	assert_eq!(a.events().handler_count("update", None), 2);

	a.set_value(1).unwrap();
	assert_eq!(hits.get(), 1);
	assert_eq!(fx.raw.component("out").value(), Value::from(1));
}

#[test]
fn failed_computation_keeps_the_previous_value() {
	let fx = Fixture::new(&["out"]);
	let out = fx.sheet.get("out").unwrap();

	out.set_value(1).unwrap();
	let result = out.set_value(Source::computation(|| Err(Error::computation("boom"))));
	assert_eq!(result, Err(Error::computation("boom")));
	assert_eq!(fx.raw.component("out").value(), Value::from(1));

	let result = out.set_value(Source::computation(|| panic!("exploded")));
	assert!(matches!(result, Err(Error::Panicked(_))));
	assert_eq!(fx.raw.component("out").value(), Value::from(1));
}

#[test]
fn virtual_writes_stay_in_scratch_storage() {
	let fx = Fixture::new(&["field"]);
	let field = fx.sheet.get("field").unwrap();
	let context = fx.sheet.runtime().context().clone();

	let (preview, log) = context.evaluate(|| {
		field.set_value(42)?;
		Ok(field.value())
	});
	assert_eq!(preview, Ok(Value::from(42)));
	assert!(log.contains(AccessKind::Value, "field"));
	assert_eq!(fx.raw.component("field").value(), Value::Null);
	assert!(!context.is_virtual());
	assert_eq!(field.value(), Value::Null);
}

#[test]
fn data_reads_follow_data_updates() {
	let fx = Fixture::new(&["out"]);
	let out = fx.sheet.get("out").unwrap();
	let sheet = fx.sheet.clone();

	out.set_value(computation!((sheet) => sheet.data("x").unwrap_or_default()))
		.unwrap();
	assert_eq!(fx.raw.component("out").value(), Value::Null);

	fx.sheet.set_data("x", Value::from(3));
	assert_eq!(fx.raw.component("out").value(), Value::from(3));
}

#[test]
fn providers_refresh_their_dependents() {
	let fx = Fixture::new(&["price"]);
	let price = fx.sheet.get("price").unwrap();
	let rate = Rc::new(Rate { value: Cell::new(1.5) });
	fx.sheet.register_provider(rate.clone());

	price.set_value(Source::provider(rate.clone())).unwrap();
	assert_eq!(fx.raw.component("price").value(), Value::from(1.5));

	rate.value.set(2.0);
	fx.sheet.refresh_provider("rate").unwrap();
	assert_eq!(fx.raw.component("price").value(), Value::from(2.0));

	assert_eq!(
		fx.sheet.refresh_provider("missing"),
		Err(Error::UnknownProvider("missing".to_owned()))
	);
}

#[test]
fn visibility_is_applied_once_per_turn() {
	let fx = Fixture::new(&["panel", "toggle"]);
	let panel = fx.sheet.get("panel").unwrap();
	let toggle = fx.sheet.get("toggle").unwrap();
	let raw = fx.raw.component("panel");
	let updates = Rc::new(Cell::new(0));

	let counter = updates.clone();
	panel.events().on("class-update", None, move |_, _| {
		counter.set(counter.get() + 1);
		Ok(())
	});

	panel
		.set_visible(computation!((toggle) => toggle.value().is_truthy()))
		.unwrap();
	assert!(!panel.visible());
	assert!(raw.visible());
	assert_eq!(updates.get(), 1);

	fx.tick();
	assert!(!raw.visible());

	toggle.set_value(true).unwrap();
	panel.add_class("open");
	assert!(panel.visible());
	assert!(panel.has_class("open"));
	assert!(!raw.has_class("open"));
	assert_eq!(updates.get(), 3);

	fx.tick();
	assert!(raw.visible());
	assert!(raw.has_class("open"));
}

#[test]
fn text_follows_its_source() {
	let fx = Fixture::new(&["name", "greeting"]);
	let name = fx.sheet.get("name").unwrap();
	let greeting = fx.sheet.get("greeting").unwrap();

	name.set_text("Ada").unwrap();
	greeting
		.set_text(computation!((name) => format!("Hello, {}", name.text().unwrap_or_default())))
		.unwrap();
	assert_eq!(fx.raw.component("greeting").text().as_deref(), Some("Hello, Ada"));

	name.set_text("Grace").unwrap();
	assert_eq!(fx.raw.component("greeting").text().as_deref(), Some("Hello, Grace"));
}

#[test]
fn free_standing_setters_track_sheet_data() {
	let fx = Fixture::new(&[]);
	let seen = Rc::new(Cell::new(0.0));

	let sink = seen.clone();
	let setter = fx.sheet.setter("summary", move |value| {
		sink.set(number(value));
		Ok(())
	});
	let sheet = fx.sheet.clone();
	setter
		.set(computation!((sheet) => number(sheet.data("count").unwrap_or_default()) * 2.0))
		.unwrap();
	assert_eq!(setter.subscriptions(), vec![("count".to_owned(), "data-update")]);

	fx.sheet.set_data("count", Value::from(4));
	assert_eq!(seen.get(), 8.0);

	seen.set(0.0);
	setter.refresh().unwrap();
	assert_eq!(seen.get(), 8.0);

	setter.detach();
	fx.sheet.set_data("count", Value::from(5));
	assert_eq!(seen.get(), 8.0);
	assert!(!fx.sheet.events().has_event("data-update", None));
}
