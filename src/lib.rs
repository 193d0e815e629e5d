//! Reactive event and dependency tracking over host-provided sheet
//! components.
//!
//! Every wrapped object gets an [`EventHolder`] that multiplexes logical
//! handlers over a single host listener per event. Property setters accept
//! computed [`Source`]s: the computation runs in virtual mode under the
//! [`ExecutionContext`], its reads are logged, and the setter subscribes to
//! exactly the events that can invalidate them. [`ComponentCache`] and
//! [`DataBatcher`] keep host lookups and persistence writes down to one per
//! turn.

pub mod macros;

mod addr;
mod batcher;
mod cache;
mod component;
mod config;
mod context;
mod error;
pub mod event;
mod group;
mod hashed;
pub mod host;
#[cfg(target_arch = "wasm32")]
mod microtask;
mod runtime;
mod scheduler;
mod setter;
mod sheet;
mod value;

pub use batcher::DataBatcher;
pub use cache::{CacheResolver, ComponentCache, EvictionListener, FlushListener};
pub use component::Component;
pub use config::{DedupPolicy, RuntimeConfig};
pub use context::{AccessKind, AccessLog, ExecutionContext, Mode};
pub use error::{Error, Result};
pub use event::{EventArgs, EventHolder};
pub use group::Group;
pub use hashed::Hashed;
#[cfg(target_arch = "wasm32")]
pub use microtask::MicrotaskScheduler;
pub use runtime::Runtime;
pub use scheduler::DeferredQueue;
pub use setter::{DynamicSetter, Provider, Source, SubjectResolver, Subscribable};
pub use sheet::Sheet;
pub use value::Value;
