//! Self-contained units handed to the foreign compiler.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use solverforge_bytecode::{ExceptionRange, Instruction, RuntimeVersion};

use crate::foreign::{ForeignRef, ForeignType};
use crate::hints::TypeHint;

/// Foreign view of a defining scope's globals.
///
/// One map exists per native scope and is shared by every function defined
/// there. Names are only ever added.
#[derive(Clone, Default)]
pub struct GlobalsMap(Arc<RwLock<IndexMap<String, ForeignRef>>>);

impl GlobalsMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<ForeignRef> {
        self.0.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.0.read().keys().cloned().collect()
    }

    /// Inserts `value` unless `name` is present, returning the stored value.
    pub fn insert_if_absent(&self, name: &str, value: ForeignRef) -> ForeignRef {
        self.0
            .write()
            .entry(name.to_string())
            .or_insert(value)
            .clone()
    }

    /// True if both handles share one map.
    pub fn ptr_eq(&self, other: &GlobalsMap) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for GlobalsMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.read().keys()).finish()
    }
}

/// Everything the foreign compiler needs to translate one function.
#[derive(Debug, Clone)]
pub struct CompiledFunctionUnit {
    pub name: String,
    pub qualified_name: String,
    pub module: String,
    pub source_version: RuntimeVersion,
    pub instructions: Vec<Instruction>,
    pub exception_ranges: Vec<ExceptionRange>,
    /// Global and attribute names, foreign-safe and deduplicated.
    pub co_names: Vec<String>,
    pub varnames: Vec<String>,
    pub cellvars: Vec<String>,
    pub freevars: Vec<String>,
    pub constants: Vec<ForeignRef>,
    /// One foreign cell per free variable.
    pub closure: Vec<ForeignRef>,
    pub globals: GlobalsMap,
    pub parameter_hints: Vec<(String, TypeHint)>,
    pub return_hint: TypeHint,
    pub defaults: Vec<ForeignRef>,
    pub kwdefaults: IndexMap<String, ForeignRef>,
    pub argcount: u32,
    pub posonlyargcount: u32,
    pub kwonlyargcount: u32,
    pub has_varargs: bool,
    pub has_varkeywords: bool,
}

impl CompiledFunctionUnit {
    pub fn parameter_hint(&self, name: &str) -> Option<&TypeHint> {
        self.parameter_hints
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, hint)| hint)
    }
}

/// Everything the foreign compiler needs to emit one class.
#[derive(Debug, Clone)]
pub struct CompiledClassUnit {
    pub name: String,
    pub qualified_name: String,
    pub module: String,
    /// The descriptor being defined; resolved once compilation finishes.
    pub descriptor: ForeignType,
    pub superclasses: Vec<ForeignType>,
    pub static_attributes: IndexMap<String, ForeignRef>,
    pub static_attribute_types: IndexMap<String, ForeignType>,
    pub static_methods: IndexMap<String, CompiledFunctionUnit>,
    pub class_methods: IndexMap<String, CompiledFunctionUnit>,
    pub instance_methods: IndexMap<String, CompiledFunctionUnit>,
    pub field_hints: IndexMap<String, TypeHint>,
}
