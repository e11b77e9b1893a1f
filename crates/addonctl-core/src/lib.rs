//! Shared plumbing for the addonctl crates.

use std::future::Future;
use std::pin::Pin;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod tracing;

pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};

/// A boxed future type for trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
