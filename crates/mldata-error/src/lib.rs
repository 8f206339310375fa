//! Error types shared by the ml_data crates.
//!
//! Every fatal condition of the row layer surfaces as an [`MlDataError`]. There
//! is no recovery path inside the layer itself: the operation that produced the
//! error is abandoned and whatever it was building is discarded by the caller.
mod warning;

use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};
use std::ops::Deref;
use std::sync::Arc;
use std::{env, io};

pub use warning::*;

#[derive(Debug, Clone)]
pub struct ErrString(Cow<'static, str>);

impl ErrString {
    pub const fn new_static(s: &'static str) -> Self {
        Self(Cow::Borrowed(s))
    }
}

impl<T> From<T> for ErrString
where
    T: Into<Cow<'static, str>>,
{
    fn from(msg: T) -> Self {
        if env::var("MLDATA_PANIC_ON_ERR").as_deref().unwrap_or("") == "1" {
            panic!("{}", msg.into())
        } else {
            ErrString(msg.into())
        }
    }
}

impl AsRef<str> for ErrString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ErrString {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Display for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum MlDataError {
    #[error("{0}")]
    ComputeError(ErrString),
    #[error("block corrupted: {0}")]
    Corruption(ErrString),
    #[error("missing value: {0}")]
    MissingValue(ErrString),
    #[error("{0}")]
    OutOfBounds(ErrString),
    #[error("schema mismatch: {0}")]
    SchemaMismatch(ErrString),
    #[error("{error}")]
    Io {
        error: Arc<io::Error>,
        msg: Option<ErrString>,
    },
}

impl From<io::Error> for MlDataError {
    fn from(value: io::Error) -> Self {
        MlDataError::Io {
            error: Arc::new(value),
            msg: None,
        }
    }
}

impl MlDataError {
    /// Prepends `msg` to the message carried by this error.
    pub fn context(self, msg: ErrString) -> Self {
        use MlDataError::*;
        match self {
            ComputeError(inner) => ComputeError(format!("{msg}: {inner}").into()),
            Corruption(inner) => Corruption(format!("{msg}: {inner}").into()),
            MissingValue(inner) => MissingValue(format!("{msg}: {inner}").into()),
            OutOfBounds(inner) => OutOfBounds(format!("{msg}: {inner}").into()),
            SchemaMismatch(inner) => SchemaMismatch(format!("{msg}: {inner}").into()),
            Io { error, msg: None } => Io {
                error,
                msg: Some(msg),
            },
            Io {
                error,
                msg: Some(inner),
            } => Io {
                error,
                msg: Some(format!("{msg}: {inner}").into()),
            },
        }
    }
}

pub type MlDataResult<T> = Result<T, MlDataError>;

pub fn to_compute_err(err: impl Display) -> MlDataError {
    MlDataError::ComputeError(err.to_string().into())
}

#[doc(hidden)]
pub mod __private {
    #[doc(hidden)]
    #[inline]
    #[cold]
    #[must_use]
    pub fn must_use(error: crate::MlDataError) -> crate::MlDataError {
        error
    }
}

#[macro_export]
macro_rules! mldata_err {
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use(
            $crate::MlDataError::$variant(format!($fmt, $($arg),*).into())
        )
    };
    ($variant:ident: $err:expr $(,)?) => {
        $crate::__private::must_use(
            $crate::MlDataError::$variant($err.into())
        )
    };
    (oob = $idx:expr, $len:expr) => {
        $crate::mldata_err!(OutOfBounds: "index {} is out of bounds for sequence of length {}", $idx, $len)
    };
    (corrupted = $what:expr) => {
        $crate::mldata_err!(Corruption: "{}", $what)
    };
}

#[macro_export]
macro_rules! mldata_bail {
    ($($tt:tt)+) => {
        return Err($crate::mldata_err!($($tt)+))
    };
}

#[macro_export]
macro_rules! mldata_ensure {
    ($cond:expr, $($tt:tt)+) => {
        if !$cond {
            $crate::mldata_bail!($($tt)+);
        }
    };
}
