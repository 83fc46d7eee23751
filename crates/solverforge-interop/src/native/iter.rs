use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;

use super::NativeRef;

/// Outcome of advancing an iterator: a value, exhaustion, or a raised exception.
pub type NativeStep = Result<Option<NativeRef>, NativeRef>;

/// A native iterator or generator.
pub trait NativeIterator: Send + Sync + fmt::Debug {
    fn next(&self) -> NativeStep;

    /// Resumes a generator with `value`. Plain iterators ignore it.
    fn send(&self, _value: NativeRef) -> NativeStep {
        self.next()
    }

    /// Raises `exception` inside a generator. Plain iterators re-raise it.
    fn throw(&self, exception: NativeRef) -> NativeStep {
        Err(exception)
    }
}

/// Iterator over a fixed sequence of values.
pub struct SequenceIterator {
    remaining: Mutex<VecDeque<NativeRef>>,
}

impl SequenceIterator {
    pub fn new(items: impl IntoIterator<Item = NativeRef>) -> Self {
        Self {
            remaining: Mutex::new(items.into_iter().collect()),
        }
    }
}

impl NativeIterator for SequenceIterator {
    fn next(&self) -> NativeStep {
        Ok(self.remaining.lock().pop_front())
    }
}

impl fmt::Debug for SequenceIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceIterator")
            .field("remaining", &self.remaining.lock().len())
            .finish()
    }
}
