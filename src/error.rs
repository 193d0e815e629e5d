use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
	#[error("handler for `{key}` failed: {message}")]
	Handler { key: String, message: String },

	#[error("computation failed: {0}")]
	Computation(String),

	#[error("cannot resolve `{0}`")]
	Resolve(String),

	#[error("panicked: {0}")]
	Panicked(String),

	#[error("unknown provider `{0}`")]
	UnknownProvider(String),
}

impl Error {
	pub fn handler(key: impl Into<String>, message: impl Into<String>) -> Self {
		Error::Handler {
			key: key.into(),
			message: message.into(),
		}
	}

	pub fn computation(message: impl Into<String>) -> Self {
		Error::Computation(message.into())
	}

	/// Converts a payload caught by `catch_unwind` into an error.
	pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
		let message = if let Some(s) = payload.downcast_ref::<&str>() {
			(*s).to_owned()
		} else if let Some(s) = payload.downcast_ref::<String>() {
			s.clone()
		} else {
			"<non-string panic payload>".to_owned()
		};
		Error::Panicked(message)
	}
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
