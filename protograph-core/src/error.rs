// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! # PERFORMANCE CRITICAL MODULE
//!
//! Error constructors are reached from every cursor read/write and field dispatch.
//! They are kept out of line (`#[cold]`) so the successful paths stay small enough
//! for LLVM to inline them into the serializers.

use std::borrow::Cow;

use thiserror::Error;

/// Global flag to check if PROTOGRAPH_PANIC_ON_ERROR environment variable is set at compile time.
/// Set PROTOGRAPH_PANIC_ON_ERROR=1 at compile time to enable panic on error.
pub const PANIC_ON_ERROR: bool = option_env!("PROTOGRAPH_PANIC_ON_ERROR").is_some();

/// Check if PROTOGRAPH_PANIC_ON_ERROR environment variable is set.
#[inline(always)]
pub const fn should_panic_on_error() -> bool {
    PANIC_ON_ERROR
}

/// Error type for protobuf serialization and deserialization operations.
///
/// # IMPORTANT: Always Use Static Constructor Functions
///
/// **DO NOT** construct error variants directly using the enum syntax.
/// **ALWAYS** use the provided static constructor functions instead.
///
/// ```rust
/// use protograph_core::error::Error;
///
/// let err = Error::format("varint is longer than 10 bytes");
/// let err = Error::schema_mismatch(format!("unexpected wire type {}", 7));
/// let err = Error::bounds(12, 4, 10);
/// ```
///
/// ## Categories
///
/// - [`Error::format`] - malformed or overflowing varints, truncated input
/// - [`Error::schema_mismatch`] - wire type disagrees with the declared field,
///   unknown subtype discriminators, unmapped enum values, missing required fields
/// - [`Error::bounds`] / [`Error::bounds_msg`] - a read crosses its sub-item
///   boundary, or a writer token is closed out of LIFO order
/// - [`Error::timeout`] - plan-build lock contention exceeded the configured wait
/// - [`Error::construction`] - no usable construction strategy for a type
/// - [`Error::depth_exceed`] - nesting deeper than the configured maximum
/// - [`Error::invalid_state`] - cursor misuse, e.g. writing after abandonment
/// - [`Error::not_allowed`] - invalid registration or model configuration
///
/// ## Debug Mode: PROTOGRAPH_PANIC_ON_ERROR
///
/// Set `PROTOGRAPH_PANIC_ON_ERROR` at compile time to make the program panic at the
/// exact location where an error is created:
///
/// ```bash
/// RUST_BACKTRACE=1 PROTOGRAPH_PANIC_ON_ERROR=1 cargo test
/// ```
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Malformed wire data.
    ///
    /// Do not construct this variant directly; use [`Error::format`] instead.
    #[error("Invalid wire format: {0}")]
    Format(Cow<'static, str>),

    /// The stream disagrees with the registered schema.
    ///
    /// Do not construct this variant directly; use [`Error::schema_mismatch`] instead.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(Cow<'static, str>),

    /// A read would cross its innermost sub-item boundary.
    ///
    /// Do not construct this variant directly; use [`Error::bounds`] instead.
    #[error("Sub-item boundary violated: {0} + {1} > {2}")]
    OutOfBounds(usize, usize, usize),

    /// Sub-item bookkeeping violated, e.g. tokens closed out of order.
    ///
    /// Do not construct this variant directly; use [`Error::bounds_msg`] instead.
    #[error("{0}")]
    Bounds(Cow<'static, str>),

    /// Waiting for a plan-build lock took longer than allowed.
    ///
    /// Do not construct this variant directly; use [`Error::timeout`] instead.
    #[error("{0}")]
    Timeout(Cow<'static, str>),

    /// No usable construction strategy for a type that must be materialized.
    ///
    /// Do not construct this variant directly; use [`Error::construction`] instead.
    #[error("{0}")]
    Construction(Cow<'static, str>),

    /// Maximum nesting depth exceeded.
    ///
    /// Do not construct this variant directly; use [`Error::depth_exceed`] instead.
    #[error("{0}")]
    DepthExceed(Cow<'static, str>),

    /// A cursor or model was used in a state that does not permit the operation.
    ///
    /// Do not construct this variant directly; use [`Error::invalid_state`] instead.
    #[error("{0}")]
    InvalidState(Cow<'static, str>),

    /// Operation not allowed by the model configuration.
    ///
    /// Do not construct this variant directly; use [`Error::not_allowed`] instead.
    #[error("{0}")]
    NotAllowed(Cow<'static, str>),

    /// I/O failure of the underlying byte sink or source.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates a new [`Error::Format`].
    ///
    /// If `PROTOGRAPH_PANIC_ON_ERROR` is set, this will panic with the error message.
    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn format<S: Into<Cow<'static, str>>>(s: S) -> Self {
        let err = Error::Format(s.into());
        if PANIC_ON_ERROR {
            panic!("PROTOGRAPH_PANIC_ON_ERROR: {}", err);
        }
        err
    }

    /// Creates a new [`Error::SchemaMismatch`].
    ///
    /// If `PROTOGRAPH_PANIC_ON_ERROR` is set, this will panic with the error message.
    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn schema_mismatch<S: Into<Cow<'static, str>>>(s: S) -> Self {
        let err = Error::SchemaMismatch(s.into());
        if PANIC_ON_ERROR {
            panic!("PROTOGRAPH_PANIC_ON_ERROR: {}", err);
        }
        err
    }

    /// Creates a new [`Error::OutOfBounds`] for a read of `length` bytes at `offset`
    /// against a boundary at `limit`.
    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn bounds(offset: usize, length: usize, limit: usize) -> Self {
        let err = Error::OutOfBounds(offset, length, limit);
        if PANIC_ON_ERROR {
            panic!("PROTOGRAPH_PANIC_ON_ERROR: {}", err);
        }
        err
    }

    /// Creates a new [`Error::Bounds`] with a free-form message.
    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn bounds_msg<S: Into<Cow<'static, str>>>(s: S) -> Self {
        let err = Error::Bounds(s.into());
        if PANIC_ON_ERROR {
            panic!("PROTOGRAPH_PANIC_ON_ERROR: {}", err);
        }
        err
    }

    /// Creates a new [`Error::Timeout`].
    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn timeout<S: Into<Cow<'static, str>>>(s: S) -> Self {
        let err = Error::Timeout(s.into());
        if PANIC_ON_ERROR {
            panic!("PROTOGRAPH_PANIC_ON_ERROR: {}", err);
        }
        err
    }

    /// Creates a new [`Error::Construction`].
    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn construction<S: Into<Cow<'static, str>>>(s: S) -> Self {
        let err = Error::Construction(s.into());
        if PANIC_ON_ERROR {
            panic!("PROTOGRAPH_PANIC_ON_ERROR: {}", err);
        }
        err
    }

    /// Creates a new [`Error::DepthExceed`].
    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn depth_exceed<S: Into<Cow<'static, str>>>(s: S) -> Self {
        let err = Error::DepthExceed(s.into());
        if PANIC_ON_ERROR {
            panic!("PROTOGRAPH_PANIC_ON_ERROR: {}", err);
        }
        err
    }

    /// Creates a new [`Error::InvalidState`].
    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn invalid_state<S: Into<Cow<'static, str>>>(s: S) -> Self {
        let err = Error::InvalidState(s.into());
        if PANIC_ON_ERROR {
            panic!("PROTOGRAPH_PANIC_ON_ERROR: {}", err);
        }
        err
    }

    /// Creates a new [`Error::NotAllowed`].
    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn not_allowed<S: Into<Cow<'static, str>>>(s: S) -> Self {
        let err = Error::NotAllowed(s.into());
        if PANIC_ON_ERROR {
            panic!("PROTOGRAPH_PANIC_ON_ERROR: {}", err);
        }
        err
    }

    /// Returns `true` for [`Error::OutOfBounds`] and [`Error::Bounds`].
    pub fn is_bounds(&self) -> bool {
        matches!(self, Error::OutOfBounds(..) | Error::Bounds(_))
    }

    /// Appends the Rust type name to a [`Error::SchemaMismatch`] or
    /// [`Error::Construction`] message. Other errors are returned unchanged.
    #[inline(never)]
    pub fn enhance_type_error<T: ?Sized + 'static>(err: Error) -> Error {
        match err {
            Error::SchemaMismatch(s) => {
                Error::schema_mismatch(format!("{} (type: {})", s, std::any::type_name::<T>()))
            }
            Error::Construction(s) => {
                Error::construction(format!("{} (type: {})", s, std::any::type_name::<T>()))
            }
            other => other,
        }
    }
}

/// Ensures a condition is true; otherwise returns an [`enum@Error`].
///
/// # Examples
/// ```
/// use protograph_core::ensure;
/// use protograph_core::error::Error;
///
/// fn check_tag(tag: u32) -> Result<(), Error> {
///     ensure!(tag > 0, Error::not_allowed("tags must be positive"));
///     ensure!(tag < 19000, "tag {} is reserved", tag);
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $msg:literal) => {
        if !$cond {
            return Err($crate::error::Error::invalid_state($msg));
        }
    };
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
    ($cond:expr, $fmt:expr, $($arg:tt)*) => {
        if !$cond {
            return Err($crate::error::Error::not_allowed(format!($fmt, $($arg)*)));
        }
    };
}

/// Returns early with an [`Error::InvalidState`].
///
/// # Examples
/// ```
/// use protograph_core::bail;
/// use protograph_core::error::Error;
///
/// fn fail_fast() -> Result<(), Error> {
///     bail!("something went wrong");
/// }
/// ```
#[macro_export]
macro_rules! bail {
    ($err:expr) => {
        return Err($crate::error::Error::invalid_state($err))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::error::Error::invalid_state(format!($fmt, $($arg)*)))
    };
}

/// Returns early with an [`Error::NotAllowed`].
///
/// # Examples
/// ```
/// use protograph_core::not_allowed;
/// use protograph_core::error::Error;
///
/// fn check_tag(tag: u32) -> Result<(), Error> {
///     if tag == 0 {
///         not_allowed!("tag {} is not a valid field number", tag);
///     }
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! not_allowed {
    ($err:expr) => {
        return Err($crate::error::Error::not_allowed($err))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::error::Error::not_allowed(format!($fmt, $($arg)*)))
    };
}
