use std::fmt::Debug;
use std::hash::Hash;
use std::ops::Deref;

use crate::config::DedupPolicy;

/// An owned snapshot paired with its fxhash, so repeated comparisons
/// against fresh host values stay cheap.
#[derive(Clone)]
pub struct Hashed<T> {
	pub value: T,
	pub hash: u64,
}

impl<T> Hashed<T> {
	pub fn new(value: T) -> Self
	where
		T: Hash,
	{
		let hash = fxhash::hash64(&value);
		Self { value, hash }
	}

	/// Whether `other` counts as unchanged relative to this snapshot.
	pub fn unchanged(&self, other: &Hashed<T>, policy: DedupPolicy) -> bool
	where
		T: PartialEq,
	{
		match policy {
			DedupPolicy::Structural => self.hash == other.hash && self.value == other.value,
			DedupPolicy::Hash => self.hash == other.hash,
			DedupPolicy::Never => false,
		}
	}
}

impl<T> Deref for Hashed<T> {
	type Target = T;
	fn deref(&self) -> &Self::Target {
		&self.value
	}
}

impl<T> Debug for Hashed<T>
where
	T: Debug,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.value.fmt(f)
	}
}
