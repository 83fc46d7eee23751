//! Foreign objects that carry more than plain data.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};

use super::types::ForeignType;
use super::ForeignRef;
use crate::native::NativeRef;
use crate::translator::{CompiledArtifact, TargetShape};

/// An instance of a structurally compiled class.
#[derive(Debug)]
pub struct ForeignInstance {
    pub ty: ForeignType,
    pub fields: RwLock<IndexMap<String, ForeignRef>>,
}

/// A foreign proxy for a native object with no structural translation.
///
/// Holds the native object itself, so the reverse conversion is exact.
/// Fields are a best-effort copy of the native attributes.
pub struct OpaqueObject {
    native: NativeRef,
    type_name: String,
    fields: RwLock<IndexMap<String, ForeignRef>>,
    /// Fields assigned on the foreign side since the last write-back.
    dirty: Mutex<Vec<String>>,
}

impl OpaqueObject {
    pub fn new(native: NativeRef) -> Self {
        Self {
            type_name: native.type_name(),
            native,
            fields: RwLock::new(IndexMap::new()),
            dirty: Mutex::new(Vec::new()),
        }
    }

    pub fn native(&self) -> &NativeRef {
        &self.native
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn field(&self, name: &str) -> Option<ForeignRef> {
        self.fields.read().get(name).cloned()
    }

    /// Assigns a field; the change is written back to the native object.
    pub fn set_field(&self, name: impl Into<String>, value: ForeignRef) {
        let name = name.into();
        self.fields.write().insert(name.clone(), value);
        let mut dirty = self.dirty.lock();
        if !dirty.contains(&name) {
            dirty.push(name);
        }
    }

    /// Copies a field from the native object without marking it changed.
    pub(crate) fn load_field(&self, name: impl Into<String>, value: ForeignRef) {
        self.fields.write().insert(name.into(), value);
    }

    /// Drains the fields changed since the last call.
    pub(crate) fn take_dirty(&self) -> Vec<(String, ForeignRef)> {
        let names = std::mem::take(&mut *self.dirty.lock());
        let fields = self.fields.read();
        names
            .into_iter()
            .filter_map(|name| fields.get(&name).cloned().map(|value| (name, value)))
            .collect()
    }

    /// Snapshot of the copied fields.
    pub fn fields(&self) -> Vec<(String, ForeignRef)> {
        self.fields
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl fmt::Debug for OpaqueObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpaqueObject")
            .field("type_name", &self.type_name)
            .field("native", &self.native.id())
            .finish()
    }
}

/// A foreign module whose attributes are converted on first access.
pub struct ForeignModule {
    name: String,
    native: NativeRef,
    pub(crate) attributes: RwLock<HashMap<String, ForeignRef>>,
}

impl ForeignModule {
    pub fn new(name: impl Into<String>, native: NativeRef) -> Self {
        Self {
            name: name.into(),
            native,
            attributes: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn native(&self) -> &NativeRef {
        &self.native
    }

    /// Number of attributes converted so far.
    pub fn loaded_count(&self) -> usize {
        self.attributes.read().len()
    }
}

impl fmt::Debug for ForeignModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignModule")
            .field("name", &self.name)
            .field("loaded", &self.loaded_count())
            .finish()
    }
}

/// A callable handle bound to a native function or code object.
///
/// The handle exists before its artifact: it is registered first so that
/// recursive references during translation resolve to it.
pub struct ForeignFunction {
    name: String,
    native: NativeRef,
    shape: TargetShape,
    artifact: OnceLock<Arc<CompiledArtifact>>,
}

impl ForeignFunction {
    pub fn new(name: impl Into<String>, native: NativeRef, shape: TargetShape) -> Self {
        Self {
            name: name.into(),
            native,
            shape,
            artifact: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn native(&self) -> &NativeRef {
        &self.native
    }

    pub fn shape(&self) -> &TargetShape {
        &self.shape
    }

    pub fn artifact(&self) -> Option<&Arc<CompiledArtifact>> {
        self.artifact.get()
    }

    pub(crate) fn set_artifact(&self, artifact: Arc<CompiledArtifact>) -> bool {
        self.artifact.set(artifact).is_ok()
    }
}

impl fmt::Debug for ForeignFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignFunction")
            .field("name", &self.name)
            .field("shape", &self.shape)
            .field("ready", &self.artifact.get().is_some())
            .finish()
    }
}

/// A foreign exception, tagged with the name of its native type.
#[derive(Debug)]
pub struct ForeignException {
    pub type_name: String,
    pub message: String,
    pub args: RwLock<Vec<ForeignRef>>,
}

/// An object owned by the foreign runtime with no native counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostObject {
    pub class_name: String,
    pub handle: u64,
}
