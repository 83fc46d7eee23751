//! Native class objects and the builtin type table.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::annotation::Annotation;
use super::NativeRef;

/// Builtin native types with a fixed foreign counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    Object,
    NoneType,
    NotImplementedType,
    Ellipsis,
    Bool,
    Int,
    Float,
    Complex,
    Str,
    Bytes,
    Tuple,
    List,
    Set,
    FrozenSet,
    Dict,
    Slice,
    Range,
    Type,
    Module,
    Function,
    Code,
    Cell,
    StaticMethod,
    ClassMethod,
    BaseException,
    Iterator,
}

impl BuiltinType {
    pub const ALL: [BuiltinType; 26] = [
        BuiltinType::Object,
        BuiltinType::NoneType,
        BuiltinType::NotImplementedType,
        BuiltinType::Ellipsis,
        BuiltinType::Bool,
        BuiltinType::Int,
        BuiltinType::Float,
        BuiltinType::Complex,
        BuiltinType::Str,
        BuiltinType::Bytes,
        BuiltinType::Tuple,
        BuiltinType::List,
        BuiltinType::Set,
        BuiltinType::FrozenSet,
        BuiltinType::Dict,
        BuiltinType::Slice,
        BuiltinType::Range,
        BuiltinType::Type,
        BuiltinType::Module,
        BuiltinType::Function,
        BuiltinType::Code,
        BuiltinType::Cell,
        BuiltinType::StaticMethod,
        BuiltinType::ClassMethod,
        BuiltinType::BaseException,
        BuiltinType::Iterator,
    ];

    /// Name of the type as the native runtime spells it.
    pub fn name(self) -> &'static str {
        match self {
            BuiltinType::Object => "object",
            BuiltinType::NoneType => "NoneType",
            BuiltinType::NotImplementedType => "NotImplementedType",
            BuiltinType::Ellipsis => "ellipsis",
            BuiltinType::Bool => "bool",
            BuiltinType::Int => "int",
            BuiltinType::Float => "float",
            BuiltinType::Complex => "complex",
            BuiltinType::Str => "str",
            BuiltinType::Bytes => "bytes",
            BuiltinType::Tuple => "tuple",
            BuiltinType::List => "list",
            BuiltinType::Set => "set",
            BuiltinType::FrozenSet => "frozenset",
            BuiltinType::Dict => "dict",
            BuiltinType::Slice => "slice",
            BuiltinType::Range => "range",
            BuiltinType::Type => "type",
            BuiltinType::Module => "module",
            BuiltinType::Function => "function",
            BuiltinType::Code => "code",
            BuiltinType::Cell => "cell",
            BuiltinType::StaticMethod => "staticmethod",
            BuiltinType::ClassMethod => "classmethod",
            BuiltinType::BaseException => "BaseException",
            BuiltinType::Iterator => "iterator",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    pub(crate) fn index(self) -> usize {
        // ALL is declared in variant order.
        self as usize
    }
}

impl fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the bridge must treat a class when resolving its foreign type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassKind {
    /// A builtin type or one of its fixed subclasses (the exception hierarchy).
    Builtin(BuiltinType),
    /// A user-defined class, translated structurally when possible.
    Ordinary,
    /// An abstract-base marker; never translated.
    AbstractBaseMarker,
    /// A native array type; never translated.
    NativeArray,
    /// A class owned by the foreign runtime, named by its foreign binary name.
    ForeignNative(String),
}

/// A native class object.
pub struct NativeClass {
    pub name: String,
    pub qualname: String,
    pub module: String,
    pub kind: ClassKind,
    pub bases: Vec<Arc<NativeClass>>,
    /// Class namespace in definition order.
    pub dict: RwLock<IndexMap<String, NativeRef>>,
    /// Field annotations in definition order.
    pub annotations: Vec<(String, Annotation)>,
    /// Globals of the defining module, used to resolve forward references.
    pub scope: Option<NativeRef>,
}

impl NativeClass {
    /// Creates an ordinary class deriving from `object`.
    pub fn new(name: impl Into<String>, module: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            qualname: name.clone(),
            name,
            module: module.into(),
            kind: ClassKind::Ordinary,
            bases: vec![NativeClass::builtin(BuiltinType::Object)],
            dict: RwLock::new(IndexMap::new()),
            annotations: Vec::new(),
            scope: None,
        }
    }

    pub fn with_qualname(mut self, qualname: impl Into<String>) -> Self {
        self.qualname = qualname.into();
        self
    }

    pub fn with_kind(mut self, kind: ClassKind) -> Self {
        self.kind = kind;
        self
    }

    /// Replaces the base list.
    pub fn with_bases(mut self, bases: Vec<Arc<NativeClass>>) -> Self {
        self.bases = bases;
        self
    }

    pub fn with_member(mut self, name: impl Into<String>, value: NativeRef) -> Self {
        self.dict.get_mut().insert(name.into(), value);
        self
    }

    pub fn with_annotation(mut self, field: impl Into<String>, annotation: Annotation) -> Self {
        self.annotations.push((field.into(), annotation));
        self
    }

    pub fn with_scope(mut self, scope: NativeRef) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn into_ref(self) -> Arc<NativeClass> {
        Arc::new(self)
    }

    /// Shared class object for a builtin type.
    pub fn builtin(builtin: BuiltinType) -> Arc<NativeClass> {
        static TABLE: OnceLock<Vec<Arc<NativeClass>>> = OnceLock::new();
        let table = TABLE.get_or_init(|| {
            let object = Arc::new(builtin_class(BuiltinType::Object, Vec::new()));
            BuiltinType::ALL
                .into_iter()
                .map(|b| match b {
                    BuiltinType::Object => object.clone(),
                    other => Arc::new(builtin_class(other, vec![object.clone()])),
                })
                .collect()
        });
        table[builtin.index()].clone()
    }

    /// Qualified name including the module, as used in log output and foreign names.
    pub fn full_name(&self) -> String {
        if self.module.is_empty() {
            self.qualname.clone()
        } else {
            format!("{}.{}", self.module, self.qualname)
        }
    }

    /// Name a foreign exception records for this class: the bare name for
    /// builtins, the module-qualified name otherwise.
    pub fn exception_name(&self) -> String {
        if self.module == "builtins" {
            self.qualname.clone()
        } else {
            self.full_name()
        }
    }

    pub fn builtin_type(&self) -> Option<BuiltinType> {
        match self.kind {
            ClassKind::Builtin(b) => Some(b),
            _ => None,
        }
    }

    /// Looks up `name` in this class's namespace only.
    pub fn member(&self, name: &str) -> Option<NativeRef> {
        self.dict.read().get(name).cloned()
    }

    /// Returns true if `other` is this class or one of its ancestors.
    pub fn is_subclass_of(&self, other: &Arc<NativeClass>) -> bool {
        std::ptr::eq(self, Arc::as_ptr(other)) || self.bases.iter().any(|b| b.is_subclass_of(other))
    }
}

fn builtin_class(builtin: BuiltinType, bases: Vec<Arc<NativeClass>>) -> NativeClass {
    NativeClass {
        name: builtin.name().to_string(),
        qualname: builtin.name().to_string(),
        module: "builtins".to_string(),
        kind: ClassKind::Builtin(builtin),
        bases,
        dict: RwLock::new(IndexMap::new()),
        annotations: Vec::new(),
        scope: None,
    }
}

impl fmt::Debug for NativeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeClass")
            .field("name", &self.full_name())
            .field("kind", &self.kind)
            .finish()
    }
}

/// Builtin exception hierarchy, child first, with parent names.
const EXCEPTION_HIERARCHY: &[(&str, &str)] = &[
    ("Exception", "BaseException"),
    ("StopIteration", "Exception"),
    ("ArithmeticError", "Exception"),
    ("ZeroDivisionError", "ArithmeticError"),
    ("OverflowError", "ArithmeticError"),
    ("AttributeError", "Exception"),
    ("LookupError", "Exception"),
    ("IndexError", "LookupError"),
    ("KeyError", "LookupError"),
    ("RuntimeError", "Exception"),
    ("NotImplementedError", "RuntimeError"),
    ("RecursionError", "RuntimeError"),
    ("TypeError", "Exception"),
    ("ValueError", "Exception"),
    ("AssertionError", "Exception"),
];

/// Returns the builtin exception class called `name`.
pub fn builtin_exception(name: &str) -> Option<Arc<NativeClass>> {
    builtin_exceptions().get(name).cloned()
}

/// All builtin exception classes by name, `BaseException` included.
pub fn builtin_exceptions() -> &'static HashMap<String, Arc<NativeClass>> {
    static TABLE: OnceLock<HashMap<String, Arc<NativeClass>>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = HashMap::new();
        table.insert(
            "BaseException".to_string(),
            NativeClass::builtin(BuiltinType::BaseException),
        );
        // Parents precede children in EXCEPTION_HIERARCHY.
        for (name, parent) in EXCEPTION_HIERARCHY {
            let base = table[*parent].clone();
            let class = builtin_class(BuiltinType::BaseException, vec![base]);
            let class = NativeClass {
                name: name.to_string(),
                qualname: name.to_string(),
                ..class
            };
            table.insert(name.to_string(), Arc::new(class));
        }
        table
    })
}

/// Native class used for foreign failures that have no native counterpart.
pub fn foreign_error_class() -> Arc<NativeClass> {
    static CLASS: OnceLock<Arc<NativeClass>> = OnceLock::new();
    CLASS
        .get_or_init(|| {
            let exception = builtin_exceptions()["Exception"].clone();
            Arc::new(NativeClass {
                name: "ForeignError".to_string(),
                qualname: "ForeignError".to_string(),
                module: "solverforge_interop".to_string(),
                ..builtin_class(BuiltinType::BaseException, vec![exception])
            })
        })
        .clone()
}
