//! Native functions and code objects.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use solverforge_bytecode::RawCode;

use super::annotation::Annotation;
use super::NativeRef;

/// A native code object: raw bytecode plus the tables it indexes into.
#[derive(Clone)]
pub struct CodeObject {
    pub raw: RawCode,
    pub qualname: String,
    pub filename: String,
    pub first_line: u32,
    pub consts: Vec<NativeRef>,
    pub names: Vec<String>,
    pub varnames: Vec<String>,
    pub cellvars: Vec<String>,
    pub freevars: Vec<String>,
    pub argcount: u32,
    pub posonlyargcount: u32,
    pub kwonlyargcount: u32,
    pub has_varargs: bool,
    pub has_varkeywords: bool,
}

impl CodeObject {
    pub fn new(raw: RawCode) -> Self {
        Self {
            qualname: raw.name.clone(),
            raw,
            filename: "<unknown>".to_string(),
            first_line: 1,
            consts: Vec::new(),
            names: Vec::new(),
            varnames: Vec::new(),
            cellvars: Vec::new(),
            freevars: Vec::new(),
            argcount: 0,
            posonlyargcount: 0,
            kwonlyargcount: 0,
            has_varargs: false,
            has_varkeywords: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.raw.name
    }

    pub fn with_qualname(mut self, qualname: impl Into<String>) -> Self {
        self.qualname = qualname.into();
        self
    }

    pub fn with_consts(mut self, consts: Vec<NativeRef>) -> Self {
        self.consts = consts;
        self
    }

    pub fn with_names<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_varnames<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.varnames = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cellvars<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.cellvars = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_freevars<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.freevars = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets positional and keyword-only parameter counts.
    pub fn with_args(mut self, argcount: u32, kwonlyargcount: u32) -> Self {
        self.argcount = argcount;
        self.kwonlyargcount = kwonlyargcount;
        self
    }

    pub fn with_posonly(mut self, posonlyargcount: u32) -> Self {
        self.posonlyargcount = posonlyargcount;
        self
    }

    pub fn with_varargs(mut self) -> Self {
        self.has_varargs = true;
        self
    }

    pub fn with_varkeywords(mut self) -> Self {
        self.has_varkeywords = true;
        self
    }

    pub fn into_ref(self) -> Arc<CodeObject> {
        Arc::new(self)
    }

    /// Names of positional and keyword-only parameters, in order.
    pub fn parameter_names(&self) -> &[String] {
        let count = (self.argcount + self.kwonlyargcount) as usize;
        &self.varnames[..count.min(self.varnames.len())]
    }

    pub fn vararg_name(&self) -> Option<&str> {
        if !self.has_varargs {
            return None;
        }
        let index = (self.argcount + self.kwonlyargcount) as usize;
        self.varnames.get(index).map(String::as_str)
    }

    pub fn kwarg_name(&self) -> Option<&str> {
        if !self.has_varkeywords {
            return None;
        }
        let index = (self.argcount + self.kwonlyargcount) as usize + usize::from(self.has_varargs);
        self.varnames.get(index).map(String::as_str)
    }
}

impl fmt::Debug for CodeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeObject")
            .field("qualname", &self.qualname)
            .field("words", &self.raw.word_count())
            .field("argcount", &self.argcount)
            .finish()
    }
}

/// A native function: a code object bound to its defining scope.
pub struct NativeFunction {
    pub name: String,
    pub qualname: String,
    pub module: String,
    pub code: Arc<CodeObject>,
    /// Globals dict of the defining module; its identity names the scope.
    pub globals: NativeRef,
    pub defaults: Vec<NativeRef>,
    pub kwdefaults: IndexMap<String, NativeRef>,
    /// One cell per free variable.
    pub closure: Vec<NativeRef>,
    /// Parameter annotations by name; the return annotation is under `"return"`.
    pub annotations: IndexMap<String, Annotation>,
}

impl NativeFunction {
    pub fn new(code: Arc<CodeObject>, globals: NativeRef, module: impl Into<String>) -> Self {
        Self {
            name: code.name().to_string(),
            qualname: code.qualname.clone(),
            module: module.into(),
            code,
            globals,
            defaults: Vec::new(),
            kwdefaults: IndexMap::new(),
            closure: Vec::new(),
            annotations: IndexMap::new(),
        }
    }

    pub fn with_defaults(mut self, defaults: Vec<NativeRef>) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_kwdefault(mut self, name: impl Into<String>, value: NativeRef) -> Self {
        self.kwdefaults.insert(name.into(), value);
        self
    }

    pub fn with_closure(mut self, cells: Vec<NativeRef>) -> Self {
        self.closure = cells;
        self
    }

    pub fn with_annotation(mut self, name: impl Into<String>, annotation: Annotation) -> Self {
        self.annotations.insert(name.into(), annotation);
        self
    }

    /// Default value for the parameter `name`, if any.
    ///
    /// Positional defaults bind to the trailing positional parameters.
    pub fn default_for(&self, name: &str) -> Option<&NativeRef> {
        if let Some(value) = self.kwdefaults.get(name) {
            return Some(value);
        }
        let argcount = self.code.argcount as usize;
        let index = self.code.varnames[..argcount.min(self.code.varnames.len())]
            .iter()
            .position(|v| v == name)?;
        let first_default = argcount.checked_sub(self.defaults.len())?;
        index
            .checked_sub(first_default)
            .and_then(|i| self.defaults.get(i))
    }

    pub fn full_name(&self) -> String {
        format!("{}.{}", self.module, self.qualname)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.full_name())
            .field("closure", &self.closure.len())
            .finish()
    }
}
