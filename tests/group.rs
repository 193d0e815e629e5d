use sheet_reactor::EventArgs;

use crate::{journal, Fixture};

#[test]
fn group_handlers_hear_every_member() {
	let fx = Fixture::new(&["f1", "f2", "f3"]);
	let group = fx.sheet.group("fields", &["f1", "f2"]);
	let log = journal();

	let l = log.clone();
	group.events().on("click", None, move |group, args| {
		l.borrow_mut()
			.push(format!("{} <- {}", group.name(), args.linked_from().unwrap_or("?")));
		Ok(())
	});
	assert!(fx.raw.component("f1").has_listener("click", None));

	fx.raw.component("f1").fire("click", None, "f1", None);
	fx.raw.component("f2").fire("click", None, "f2", None);
	fx.raw.component("f3").fire("click", None, "f3", None);
	assert_eq!(*log.borrow(), vec!["fields <- f1", "fields <- f2"]);

	group.add("f3");
	log.borrow_mut().clear();
	fx.raw.component("f3").fire("click", None, "f3", None);
	assert_eq!(*log.borrow(), vec!["fields <- f3"]);

	assert!(group.remove("f1"));
	log.borrow_mut().clear();
	fx.raw.component("f1").fire("click", None, "f1", None);
	assert!(log.borrow().is_empty());
	assert!(!fx.raw.component("f1").has_listener("click", None));
}

#[test]
fn links_follow_the_last_group_handler() {
	let fx = Fixture::new(&["f1"]);
	let group = fx.sheet.group("fields", &["f1"]);
	let f1 = fx.sheet.get("f1").unwrap();

	group.events().on("click:a", None, |_, _| Ok(()));
	group.events().on("click:b", None, |_, _| Ok(()));
	assert_eq!(f1.events().link_count(), 1);

	group.events().off("click:a", None);
	assert_eq!(f1.events().link_count(), 1);

	group.events().off("click:b", None);
	assert_eq!(f1.events().link_count(), 0);
	assert!(!fx.raw.component("f1").has_listener("click", None));
}

#[test]
fn group_trigger_fans_out_to_members() {
	let fx = Fixture::new(&["f1", "f2"]);
	let group = fx.sheet.group("fields", &["f1", "f2"]);
	let log = journal();

	for id in ["f1", "f2"] {
		let l = log.clone();
		fx.sheet.get(id).unwrap().events().on("reset", None, move |target, _| {
			l.borrow_mut().push(target.id().to_owned());
			Ok(())
		});
	}

	group.trigger("reset", EventArgs::empty());
	assert_eq!(*log.borrow(), vec!["f1", "f2"]);
	assert_eq!(group.members(), vec!["f1", "f2"]);
}

#[test]
fn late_members_are_linked_once_they_resolve() {
	let fx = Fixture::new(&["f1"]);
	let group = fx.sheet.group("fields", &["f1", "f2"]);
	let log = journal();

	let l = log.clone();
	group.events().on("click", None, move |_, args| {
		l.borrow_mut().push(args.linked_from().unwrap_or("?").to_owned());
		Ok(())
	});

	let raw = fx.raw.add("f2");
	fx.tick();
	raw.fire("click", None, "f2", None);
	assert_eq!(*log.borrow(), vec!["f2"]);
}
