use std::fmt::{self, Display};

pub const DEFAULT_SLOT: &str = "default";

/// A logical event key, `base[:slot[:...]]`. Only the first discriminator
/// segment names the handler slot; anything after it is free-form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventKey<'a> {
	pub base: &'a str,
	pub slot: Option<&'a str>,
}

impl<'a> EventKey<'a> {
	pub fn parse(key: &'a str) -> Self {
		match key.split_once(':') {
			Some((base, rest)) => {
				let slot = rest.split(':').next().filter(|s| !s.is_empty());
				EventKey { base, slot }
			}
			None => EventKey { base: key, slot: None },
		}
	}

	pub fn slot_id(&self) -> &'a str {
		self.slot.unwrap_or(DEFAULT_SLOT)
	}

	pub fn is_update(&self) -> bool {
		self.base == "update"
	}

	/// `base` or `base:slot`, without the free-form tail.
	pub fn normalized(&self) -> String {
		match self.slot {
			Some(slot) => format!("{}:{}", self.base, slot),
			None => self.base.to_owned(),
		}
	}
}

/// Identity of an event definition on a holder: one per base event and
/// delegation target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DefinitionKey {
	pub base: String,
	pub delegate: Option<String>,
}

impl DefinitionKey {
	pub fn new(base: &str, delegate: Option<&str>) -> Self {
		DefinitionKey {
			base: base.to_owned(),
			delegate: delegate.map(str::to_owned),
		}
	}
}

impl Display for DefinitionKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.delegate {
			Some(delegate) => write!(f, "{}@{}", self.base, delegate),
			None => f.write_str(&self.base),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_base_and_slot() {
		assert_eq!(
			EventKey::parse("click"),
			EventKey {
				base: "click",
				slot: None
			}
		);
		assert_eq!(EventKey::parse("click:a").slot, Some("a"));
		assert_eq!(EventKey::parse("click:a:extra").slot, Some("a"));
		assert_eq!(EventKey::parse("click:").slot, None);
		assert_eq!(EventKey::parse("click").slot_id(), DEFAULT_SLOT);
		assert_eq!(EventKey::parse("click:a:extra").normalized(), "click:a");
	}

	#[test]
	fn definition_key_display() {
		assert_eq!(DefinitionKey::new("click", None).to_string(), "click");
		assert_eq!(DefinitionKey::new("click", Some("btn")).to_string(), "click@btn");
	}
}
