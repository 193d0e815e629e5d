/// How an automatic `update` dispatch decides that the observed value did
/// not change since the previous dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupPolicy {
	/// Hash first, then full structural equality.
	#[default]
	Structural,
	/// Compare only the 64-bit fxhash of the snapshot.
	Hash,
	/// Never deduplicate; every host firing dispatches.
	Never,
}

/// Per-session runtime settings.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
	/// Path separator of hierarchical component ids (`rep.entry.child`).
	pub separator: char,
	pub dedup: DedupPolicy,
	/// Delay handed to the host scheduler for deferred flushes.
	pub flush_delay_ms: u32,
}

impl Default for RuntimeConfig {
	fn default() -> Self {
		RuntimeConfig {
			separator: '.',
			dedup: DedupPolicy::default(),
			flush_delay_ms: 0,
		}
	}
}

impl RuntimeConfig {
	pub fn with_separator(mut self, separator: char) -> Self {
		self.separator = separator;
		self
	}

	pub fn with_dedup(mut self, dedup: DedupPolicy) -> Self {
		self.dedup = dedup;
		self
	}

	pub fn with_flush_delay(mut self, delay_ms: u32) -> Self {
		self.flush_delay_ms = delay_ms;
		self
	}
}
