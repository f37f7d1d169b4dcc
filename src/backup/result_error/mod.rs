//! Crate error type plus extension traits for attaching context to it.
//!
//! Both traits are implemented for [`error::Error`] and for
//! [`result::Result`], so context can be added at either level:
//!
//! ```
//! use auto_backup::backup::result_error::result::Result;
//! use auto_backup::backup::result_error::WithMsg;
//!
//! fn open() -> Result<std::fs::File> {
//!     std::fs::File::open("/definitely/missing")
//!         .map_err(Into::into)
//!         .with_msg("Open config failed")
//! }
//! assert!(open().unwrap_err().to_string().starts_with("Open config failed"));
//! ```
use std::fmt::Debug;
pub mod error;
pub mod result;

/// Wraps an error with the debug form of the object being worked on and
/// the function that failed.
pub trait WithDebugObjectAndFnName<S: Into<String>, O: Debug + 'static> {
    fn with_debug_object_and_fn_name(self, obj: O, fn_name: S) -> Self;
}

/// Wraps an error with a human readable message.
pub trait WithMsg<S: Into<String>> {
    fn with_msg(self, msg: S) -> Self;
}
