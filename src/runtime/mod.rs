//! Runtime support for locating the nearest provider.
//!
//! A composition's children are rendered inside a provider scope, so connected
//! leaves anywhere below them can find the current snapshot without being
//! handed a consumer.

mod context;

pub use context::ProviderScope;
