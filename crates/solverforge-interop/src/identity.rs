//! Object identity shared by both runtimes.

use std::fmt;
use std::sync::Arc;

/// Address-based identity of a shared object.
///
/// Two handles have the same `ObjectId` exactly when they point at the same
/// allocation. An id is only meaningful while the object is alive, so every
/// table keyed by `ObjectId` also holds a strong reference to the object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl ObjectId {
    pub fn of<T: ?Sized>(arc: &Arc<T>) -> Self {
        ObjectId(Arc::as_ptr(arc) as *const () as usize)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:x}", self.0)
    }
}
