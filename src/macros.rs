pub use enclose::*;

/// Builds a computed [`Source`](crate::Source), cloning the listed captures
/// into the closure.
///
/// ```ignore
/// field.set_value(computation!((price, quantity) => price.value().as_number().unwrap_or(0.0) * 2.0))?;
/// ```
#[macro_export]
macro_rules! computation {
    (( $($d_tt:tt)* ) => $($b:tt)*) => {
        $crate::Source::computation($crate::macros::enclose!(($( $d_tt )*) move || -> $crate::Result<$crate::Value> {
            Ok($crate::Value::from({ $($b)* }))
        }))
    };
    (=> $($b:tt)*) => {
        $crate::Source::computation(move || -> $crate::Result<$crate::Value> {
            Ok($crate::Value::from({ $($b)* }))
        })
    };
}

/// An event handler closure with cloned captures. The body may evaluate to
/// `()` or to a `Result`, whose error becomes the handler's error.
#[macro_export]
macro_rules! handler {
    (( $($d_tt:tt)* ) |$target:pat_param, $args:pat_param| $($b:tt)*) => {
        $crate::macros::enclose!(($( $d_tt )*) move |$target, $args: &$crate::EventArgs| -> $crate::Result<()> {
            $crate::macros::HandlerOutput::into_result({ $($b)* })
        })
    };
    (|$target:pat_param, $args:pat_param| $($b:tt)*) => {
        move |$target, $args: &$crate::EventArgs| -> $crate::Result<()> {
            $crate::macros::HandlerOutput::into_result({ $($b)* })
        }
    };
}

/// What a [`handler!`] body may evaluate to.
#[doc(hidden)]
pub trait HandlerOutput {
    fn into_result(self) -> crate::Result<()>;
}

impl HandlerOutput for () {
    fn into_result(self) -> crate::Result<()> {
        Ok(())
    }
}

impl<T> HandlerOutput for crate::Result<T> {
    fn into_result(self) -> crate::Result<()> {
        self.map(drop)
    }
}
