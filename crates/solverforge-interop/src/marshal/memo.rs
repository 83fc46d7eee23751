use std::collections::HashMap;

use crate::foreign::ForeignRef;
use crate::identity::ObjectId;
use crate::native::NativeRef;

/// Per-conversion identity table.
///
/// Maps each source object already converted to its result, so shared
/// references convert to shared results and cycles terminate. Entries keep
/// their source alive for the life of the memo, which keeps ids unique.
#[derive(Default)]
pub struct IdentityMemo {
    to_foreign: HashMap<ObjectId, (NativeRef, ForeignRef)>,
    to_native: HashMap<ObjectId, (ForeignRef, NativeRef)>,
}

impl IdentityMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn foreign_for(&self, native: &NativeRef) -> Option<ForeignRef> {
        self.to_foreign.get(&native.id()).map(|(_, f)| f.clone())
    }

    pub fn native_for(&self, foreign: &ForeignRef) -> Option<NativeRef> {
        self.to_native.get(&foreign.id()).map(|(_, n)| n.clone())
    }

    /// Records `native -> foreign`, and the reverse pairing if it is new.
    pub fn record(&mut self, native: &NativeRef, foreign: &ForeignRef) {
        self.to_foreign
            .insert(native.id(), (native.clone(), foreign.clone()));
        self.to_native
            .entry(foreign.id())
            .or_insert_with(|| (foreign.clone(), native.clone()));
    }

    /// Records `foreign -> native`, and the reverse pairing if it is new.
    pub fn record_native(&mut self, foreign: &ForeignRef, native: &NativeRef) {
        self.to_native
            .insert(foreign.id(), (foreign.clone(), native.clone()));
        self.to_foreign
            .entry(native.id())
            .or_insert_with(|| (native.clone(), foreign.clone()));
    }

    pub fn len(&self) -> usize {
        self.to_foreign.len().max(self.to_native.len())
    }

    pub fn is_empty(&self) -> bool {
        self.to_foreign.is_empty() && self.to_native.is_empty()
    }
}
