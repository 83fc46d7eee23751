//! Object-graph marshalling between the native and foreign runtimes.
//!
//! Conversions are identity-preserving within one [`IdentityMemo`]: an
//! object reachable along several paths converts to one shared result, and
//! cyclic graphs convert to equally cyclic results.

mod adapters;
mod memo;
mod opaque;
mod to_foreign;
mod to_native;

pub use adapters::{ForeignIterAdapter, NativeIterAdapter};
pub use memo::IdentityMemo;
pub use to_foreign::to_foreign;
pub use to_native::{to_native, Fallback};
