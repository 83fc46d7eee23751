//! Native functions assembled from real bytecode.
//!
//! # Example
//!
//! ```ignore
//! use solverforge_test::function::{module_scope, FunctionBuilder};
//!
//! let scope = module_scope(&[("LIMIT", NativeRef::int(10))]);
//! let f = FunctionBuilder::new("clamp", &scope)
//!     .param("value")
//!     .global("LIMIT")
//!     .build();
//! ```

use solverforge_bytecode::{CodeAssembler, RuntimeVersion};
use solverforge_interop::native::{CodeObject, NativeFunction};
use solverforge_interop::{Annotation, NativeRef};

/// Creates a module-level scope dict holding `entries`.
pub fn module_scope(entries: &[(&str, NativeRef)]) -> NativeRef {
    NativeRef::dict(
        entries
            .iter()
            .map(|(name, value)| (NativeRef::str(*name), value.clone()))
            .collect(),
    )
}

/// Builds a [`NativeFunction`] whose body loads each global and constant,
/// then returns constant 0.
#[derive(Debug, Clone)]
pub struct FunctionBuilder {
    name: String,
    module: String,
    version: RuntimeVersion,
    globals: NativeRef,
    params: Vec<String>,
    kwonly: Vec<String>,
    varargs: Option<String>,
    varkeywords: Option<String>,
    consts: Vec<NativeRef>,
    names: Vec<String>,
    freevars: Vec<String>,
    closure: Vec<NativeRef>,
    defaults: Vec<NativeRef>,
    kwdefaults: Vec<(String, NativeRef)>,
    annotations: Vec<(String, Annotation)>,
    protected: bool,
}

impl FunctionBuilder {
    pub fn new(name: &str, globals: &NativeRef) -> Self {
        Self {
            name: name.to_string(),
            module: "app".to_string(),
            version: RuntimeVersion::PY_3_11,
            globals: globals.clone(),
            params: Vec::new(),
            kwonly: Vec::new(),
            varargs: None,
            varkeywords: None,
            consts: Vec::new(),
            names: Vec::new(),
            freevars: Vec::new(),
            closure: Vec::new(),
            defaults: Vec::new(),
            kwdefaults: Vec::new(),
            annotations: Vec::new(),
            protected: false,
        }
    }

    pub fn module(mut self, module: &str) -> Self {
        self.module = module.to_string();
        self
    }

    /// Assembles the body in the dialect of `version`.
    pub fn version(mut self, version: RuntimeVersion) -> Self {
        self.version = version;
        self
    }

    pub fn param(mut self, name: &str) -> Self {
        self.params.push(name.to_string());
        self
    }

    pub fn kwonly(mut self, name: &str) -> Self {
        self.kwonly.push(name.to_string());
        self
    }

    pub fn varargs(mut self, name: &str) -> Self {
        self.varargs = Some(name.to_string());
        self
    }

    pub fn varkeywords(mut self, name: &str) -> Self {
        self.varkeywords = Some(name.to_string());
        self
    }

    /// Adds a constant the body loads.
    pub fn constant(mut self, value: NativeRef) -> Self {
        self.consts.push(value);
        self
    }

    /// Adds a global name the body loads.
    pub fn global(mut self, name: &str) -> Self {
        self.names.push(name.to_string());
        self
    }

    /// Adds a free variable bound to `cell`.
    pub fn free(mut self, name: &str, cell: NativeRef) -> Self {
        self.freevars.push(name.to_string());
        self.closure.push(cell);
        self
    }

    /// Adds a positional default, filling parameters from the right.
    pub fn default_value(mut self, value: NativeRef) -> Self {
        self.defaults.push(value);
        self
    }

    pub fn kwdefault(mut self, name: &str, value: NativeRef) -> Self {
        self.kwdefaults.push((name.to_string(), value));
        self
    }

    pub fn annotate(mut self, name: &str, annotation: Annotation) -> Self {
        self.annotations.push((name.to_string(), annotation));
        self
    }

    pub fn returns(self, annotation: Annotation) -> Self {
        self.annotate("return", annotation)
    }

    /// Wraps the body in a handler that re-raises.
    pub fn protected(mut self) -> Self {
        self.protected = true;
        self
    }

    /// The code object alone, without function-level data.
    pub fn code(&self) -> CodeObject {
        let mut varnames = self.params.clone();
        varnames.extend(self.kwonly.iter().cloned());
        varnames.extend(self.varargs.iter().cloned());
        varnames.extend(self.varkeywords.iter().cloned());

        let mut code = CodeObject::new(self.assemble())
            .with_qualname(self.name.clone())
            .with_consts(self.consts.clone())
            .with_names(self.names.clone())
            .with_varnames(varnames)
            .with_freevars(self.freevars.clone())
            .with_args(self.params.len() as u32, self.kwonly.len() as u32);
        if self.varargs.is_some() {
            code = code.with_varargs();
        }
        if self.varkeywords.is_some() {
            code = code.with_varkeywords();
        }
        code
    }

    pub fn build(self) -> NativeRef {
        let code = self.code().into_ref();
        let mut function = NativeFunction::new(code, self.globals.clone(), &self.module)
            .with_defaults(self.defaults.clone())
            .with_closure(self.closure.clone());
        for (name, value) in &self.kwdefaults {
            function = function.with_kwdefault(name, value.clone());
        }
        for (name, annotation) in &self.annotations {
            function = function.with_annotation(name, annotation.clone());
        }
        NativeRef::function(function)
    }

    fn assemble(&self) -> solverforge_bytecode::RawCode {
        let caches_shown = self.version >= RuntimeVersion::PY_3_11;
        let global_arg = |index: usize| {
            if caches_shown {
                (index as u32) << 1
            } else {
                index as u32
            }
        };

        // Every opcode used here exists in both dialects.
        let mut steps: Vec<(&str, u32)> = Vec::new();
        if caches_shown {
            steps.push(("RESUME", 0));
        }
        for index in 0..self.names.len() {
            steps.push(("LOAD_GLOBAL", global_arg(index)));
            steps.push(("POP_TOP", 0));
        }
        for index in 0..self.consts.len() {
            steps.push(("LOAD_CONST", index as u32));
            steps.push(("POP_TOP", 0));
        }

        let mut asm = CodeAssembler::new(self.version, self.name.clone()).line(1);
        let body_start = asm.position();
        for (name, arg) in steps {
            asm = emit(asm, name, arg);
        }
        asm = emit(asm, "LOAD_CONST", 0);
        asm = emit(asm, "RETURN_VALUE", 0);

        if self.protected && caches_shown {
            let body_end = asm.position().saturating_sub(1);
            let handler = asm.position();
            asm = emit(asm, "PUSH_EXC_INFO", 0);
            asm = emit(asm, "RERAISE", 0);
            asm = match asm.protect(body_start, body_end, handler, 0, true) {
                Ok(asm) => asm,
                Err(err) => panic!("fixture exception range: {err}"),
            };
        }
        asm.finish()
    }
}

fn emit(asm: CodeAssembler, name: &str, arg: u32) -> CodeAssembler {
    match asm.emit(name, arg) {
        Ok(asm) => asm,
        Err(err) => panic!("fixture opcode {name}: {err}"),
    }
}
