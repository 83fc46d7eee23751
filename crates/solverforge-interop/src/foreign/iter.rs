use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;

use super::ForeignRef;

/// Outcome of advancing a foreign iterator.
pub type ForeignStep = Result<Option<ForeignRef>, ForeignRef>;

/// A foreign iterator or generator.
pub trait ForeignIterator: Send + Sync + fmt::Debug {
    fn next(&self) -> ForeignStep;

    fn send(&self, _value: ForeignRef) -> ForeignStep {
        self.next()
    }

    fn throw(&self, exception: ForeignRef) -> ForeignStep {
        Err(exception)
    }
}

/// Foreign iterator over a fixed sequence.
pub struct ForeignSequence {
    remaining: Mutex<VecDeque<ForeignRef>>,
}

impl ForeignSequence {
    pub fn new(items: impl IntoIterator<Item = ForeignRef>) -> Self {
        Self {
            remaining: Mutex::new(items.into_iter().collect()),
        }
    }
}

impl ForeignIterator for ForeignSequence {
    fn next(&self) -> ForeignStep {
        Ok(self.remaining.lock().pop_front())
    }
}

impl fmt::Debug for ForeignSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignSequence")
            .field("remaining", &self.remaining.lock().len())
            .finish()
    }
}
