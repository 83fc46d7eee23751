//! Native (source-runtime) object model.
//!
//! Every native value is reached through a [`NativeRef`], a shared handle
//! whose address is the object's identity. Containers are mutable behind a
//! lock so that cyclic graphs can be built and rebuilt shell-first.

mod annotation;
mod class;
mod eq;
mod function;
mod iter;

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use num_bigint::BigInt;
use parking_lot::RwLock;

pub use annotation::Annotation;
pub use class::{
    builtin_exception, builtin_exceptions, foreign_error_class, BuiltinType, ClassKind, NativeClass,
};
pub use eq::deep_eq;
pub use function::{CodeObject, NativeFunction};
pub use iter::{NativeIterator, NativeStep, SequenceIterator};

use crate::foreign::ForeignRef;
use crate::identity::ObjectId;

/// A parameterized generic such as `list[int]` used as a value.
#[derive(Debug)]
pub struct GenericAlias {
    pub origin: Arc<NativeClass>,
    pub args: Vec<Annotation>,
}

/// A native module object.
#[derive(Debug)]
pub struct NativeModule {
    pub name: String,
    /// Module globals dict.
    pub dict: NativeRef,
}

/// An instance of a native class.
#[derive(Debug)]
pub struct NativeInstance {
    pub class: Arc<NativeClass>,
    pub attrs: RwLock<IndexMap<String, NativeRef>>,
}

/// A native exception object.
#[derive(Debug)]
pub struct NativeException {
    pub class: Arc<NativeClass>,
    pub args: RwLock<Vec<NativeRef>>,
}

impl NativeException {
    /// Message text: the single string argument, or the rendered argument list.
    pub fn message(&self) -> String {
        let args = self.args.read();
        match args.as_slice() {
            [] => String::new(),
            [single] => single.display_text(),
            many => many
                .iter()
                .map(NativeRef::display_text)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// Every shape a native object can take.
#[derive(Debug)]
pub enum NativeValue {
    None,
    NotImplemented,
    Ellipsis,
    Bool(bool),
    Int(BigInt),
    Float(f64),
    Complex { real: f64, imag: f64 },
    Str(String),
    Bytes(Vec<u8>),
    Tuple(RwLock<Vec<NativeRef>>),
    List(RwLock<Vec<NativeRef>>),
    Set(RwLock<Vec<NativeRef>>),
    FrozenSet(Vec<NativeRef>),
    /// Insertion-ordered key/value pairs.
    Dict(RwLock<Vec<(NativeRef, NativeRef)>>),
    Slice {
        start: NativeRef,
        stop: NativeRef,
        step: NativeRef,
    },
    Range {
        start: NativeRef,
        stop: NativeRef,
        step: NativeRef,
    },
    Type(Arc<NativeClass>),
    GenericAlias(GenericAlias),
    Module(NativeModule),
    Function(NativeFunction),
    Code(Arc<CodeObject>),
    Cell(RwLock<Option<NativeRef>>),
    StaticMethod(NativeRef),
    ClassMethod(NativeRef),
    Instance(NativeInstance),
    Exception(NativeException),
    Iterator(Arc<dyn NativeIterator>),
    /// A foreign object passed back into the native runtime unchanged.
    Foreign(ForeignRef),
}

impl NativeValue {
    /// Class of this value.
    pub fn class(&self) -> Arc<NativeClass> {
        let builtin = match self {
            NativeValue::None => BuiltinType::NoneType,
            NativeValue::NotImplemented => BuiltinType::NotImplementedType,
            NativeValue::Ellipsis => BuiltinType::Ellipsis,
            NativeValue::Bool(_) => BuiltinType::Bool,
            NativeValue::Int(_) => BuiltinType::Int,
            NativeValue::Float(_) => BuiltinType::Float,
            NativeValue::Complex { .. } => BuiltinType::Complex,
            NativeValue::Str(_) => BuiltinType::Str,
            NativeValue::Bytes(_) => BuiltinType::Bytes,
            NativeValue::Tuple(_) => BuiltinType::Tuple,
            NativeValue::List(_) => BuiltinType::List,
            NativeValue::Set(_) => BuiltinType::Set,
            NativeValue::FrozenSet(_) => BuiltinType::FrozenSet,
            NativeValue::Dict(_) => BuiltinType::Dict,
            NativeValue::Slice { .. } => BuiltinType::Slice,
            NativeValue::Range { .. } => BuiltinType::Range,
            NativeValue::Type(_) | NativeValue::GenericAlias(_) => BuiltinType::Type,
            NativeValue::Module(_) => BuiltinType::Module,
            NativeValue::Function(_) => BuiltinType::Function,
            NativeValue::Code(_) => BuiltinType::Code,
            NativeValue::Cell(_) => BuiltinType::Cell,
            NativeValue::StaticMethod(_) => BuiltinType::StaticMethod,
            NativeValue::ClassMethod(_) => BuiltinType::ClassMethod,
            NativeValue::Iterator(_) => BuiltinType::Iterator,
            NativeValue::Foreign(_) => BuiltinType::Object,
            NativeValue::Instance(instance) => return instance.class.clone(),
            NativeValue::Exception(exception) => return exception.class.clone(),
        };
        NativeClass::builtin(builtin)
    }

    pub fn type_name(&self) -> String {
        self.class().qualname.clone()
    }
}

/// Shared handle to a native object.
#[derive(Clone)]
pub struct NativeRef(Arc<NativeValue>);

impl NativeRef {
    pub fn new(value: NativeValue) -> Self {
        NativeRef(Arc::new(value))
    }

    pub fn id(&self) -> ObjectId {
        ObjectId::of(&self.0)
    }

    pub fn ptr_eq(&self, other: &NativeRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn value(&self) -> &NativeValue {
        &self.0
    }

    /// The `None` singleton.
    pub fn none() -> Self {
        static NONE: OnceLock<NativeRef> = OnceLock::new();
        NONE.get_or_init(|| NativeRef::new(NativeValue::None)).clone()
    }

    /// The `NotImplemented` singleton.
    pub fn not_implemented() -> Self {
        static NOT_IMPLEMENTED: OnceLock<NativeRef> = OnceLock::new();
        NOT_IMPLEMENTED
            .get_or_init(|| NativeRef::new(NativeValue::NotImplemented))
            .clone()
    }

    /// The `Ellipsis` singleton.
    pub fn ellipsis() -> Self {
        static ELLIPSIS: OnceLock<NativeRef> = OnceLock::new();
        ELLIPSIS
            .get_or_init(|| NativeRef::new(NativeValue::Ellipsis))
            .clone()
    }

    pub fn bool(value: bool) -> Self {
        NativeRef::new(NativeValue::Bool(value))
    }

    pub fn int(value: impl Into<BigInt>) -> Self {
        NativeRef::new(NativeValue::Int(value.into()))
    }

    pub fn float(value: f64) -> Self {
        NativeRef::new(NativeValue::Float(value))
    }

    pub fn complex(real: f64, imag: f64) -> Self {
        NativeRef::new(NativeValue::Complex { real, imag })
    }

    pub fn str(value: impl Into<String>) -> Self {
        NativeRef::new(NativeValue::Str(value.into()))
    }

    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        NativeRef::new(NativeValue::Bytes(value.into()))
    }

    pub fn tuple(items: Vec<NativeRef>) -> Self {
        NativeRef::new(NativeValue::Tuple(RwLock::new(items)))
    }

    pub fn list(items: Vec<NativeRef>) -> Self {
        NativeRef::new(NativeValue::List(RwLock::new(items)))
    }

    /// Creates a set, dropping structurally equal duplicates.
    pub fn set(items: Vec<NativeRef>) -> Self {
        NativeRef::new(NativeValue::Set(RwLock::new(dedup(items))))
    }

    pub fn frozenset(items: Vec<NativeRef>) -> Self {
        NativeRef::new(NativeValue::FrozenSet(dedup(items)))
    }

    pub fn dict(entries: Vec<(NativeRef, NativeRef)>) -> Self {
        let dict = NativeRef::new(NativeValue::Dict(RwLock::new(Vec::with_capacity(
            entries.len(),
        ))));
        for (key, value) in entries {
            dict.dict_insert(key, value);
        }
        dict
    }

    pub fn slice(start: NativeRef, stop: NativeRef, step: NativeRef) -> Self {
        NativeRef::new(NativeValue::Slice { start, stop, step })
    }

    pub fn range(start: i64, stop: i64, step: i64) -> Self {
        NativeRef::new(NativeValue::Range {
            start: NativeRef::int(start),
            stop: NativeRef::int(stop),
            step: NativeRef::int(step),
        })
    }

    pub fn class_object(class: &Arc<NativeClass>) -> Self {
        NativeRef::new(NativeValue::Type(class.clone()))
    }

    pub fn generic_alias(origin: &Arc<NativeClass>, args: Vec<Annotation>) -> Self {
        NativeRef::new(NativeValue::GenericAlias(GenericAlias {
            origin: origin.clone(),
            args,
        }))
    }

    pub fn module(name: impl Into<String>, dict: NativeRef) -> Self {
        NativeRef::new(NativeValue::Module(NativeModule {
            name: name.into(),
            dict,
        }))
    }

    pub fn function(function: NativeFunction) -> Self {
        NativeRef::new(NativeValue::Function(function))
    }

    pub fn code(code: Arc<CodeObject>) -> Self {
        NativeRef::new(NativeValue::Code(code))
    }

    pub fn cell(contents: Option<NativeRef>) -> Self {
        NativeRef::new(NativeValue::Cell(RwLock::new(contents)))
    }

    pub fn staticmethod(function: NativeRef) -> Self {
        NativeRef::new(NativeValue::StaticMethod(function))
    }

    pub fn classmethod(function: NativeRef) -> Self {
        NativeRef::new(NativeValue::ClassMethod(function))
    }

    pub fn instance(class: &Arc<NativeClass>, attrs: Vec<(&str, NativeRef)>) -> Self {
        NativeRef::new(NativeValue::Instance(NativeInstance {
            class: class.clone(),
            attrs: RwLock::new(
                attrs
                    .into_iter()
                    .map(|(name, value)| (name.to_string(), value))
                    .collect(),
            ),
        }))
    }

    pub fn exception(class: &Arc<NativeClass>, args: Vec<NativeRef>) -> Self {
        NativeRef::new(NativeValue::Exception(NativeException {
            class: class.clone(),
            args: RwLock::new(args),
        }))
    }

    pub fn iterator(iterator: Arc<dyn NativeIterator>) -> Self {
        NativeRef::new(NativeValue::Iterator(iterator))
    }

    pub fn foreign(value: ForeignRef) -> Self {
        NativeRef::new(NativeValue::Foreign(value))
    }

    pub fn is_none(&self) -> bool {
        matches!(self.value(), NativeValue::None)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.value() {
            NativeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<&BigInt> {
        match self.value() {
            NativeValue::Int(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self.value() {
            NativeValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.value() {
            NativeValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&Arc<NativeClass>> {
        match self.value() {
            NativeValue::Type(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&NativeFunction> {
        match self.value() {
            NativeValue::Function(function) => Some(function),
            _ => None,
        }
    }

    /// Snapshot of the elements of a tuple, list, set or frozenset.
    pub fn items(&self) -> Option<Vec<NativeRef>> {
        match self.value() {
            NativeValue::Tuple(items) | NativeValue::List(items) | NativeValue::Set(items) => {
                Some(items.read().clone())
            }
            NativeValue::FrozenSet(items) => Some(items.clone()),
            _ => None,
        }
    }

    /// Appends to a list. Returns false if this is not a list.
    pub fn push(&self, item: NativeRef) -> bool {
        match self.value() {
            NativeValue::List(items) => {
                items.write().push(item);
                true
            }
            _ => false,
        }
    }

    /// Snapshot of the entries of a dict.
    pub fn dict_entries(&self) -> Option<Vec<(NativeRef, NativeRef)>> {
        match self.value() {
            NativeValue::Dict(entries) => Some(entries.read().clone()),
            _ => None,
        }
    }

    /// Looks up `key` by structural equality.
    pub fn dict_get(&self, key: &NativeRef) -> Option<NativeRef> {
        match self.value() {
            NativeValue::Dict(entries) => entries
                .read()
                .iter()
                .find(|(k, _)| deep_eq(k, key))
                .map(|(_, v)| v.clone()),
            _ => None,
        }
    }

    /// Looks up a string key, the common case for globals and namespaces.
    pub fn dict_get_str(&self, key: &str) -> Option<NativeRef> {
        match self.value() {
            NativeValue::Dict(entries) => entries
                .read()
                .iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v.clone()),
            _ => None,
        }
    }

    /// Inserts or replaces `key`. Returns false if this is not a dict.
    pub fn dict_insert(&self, key: NativeRef, value: NativeRef) -> bool {
        match self.value() {
            NativeValue::Dict(entries) => {
                let mut entries = entries.write();
                match entries.iter_mut().find(|(k, _)| deep_eq(k, &key)) {
                    Some(entry) => entry.1 = value,
                    None => entries.push((key, value)),
                }
                true
            }
            _ => false,
        }
    }

    pub fn dict_set_str(&self, key: &str, value: NativeRef) -> bool {
        self.dict_insert(NativeRef::str(key), value)
    }

    pub fn cell_get(&self) -> Option<NativeRef> {
        match self.value() {
            NativeValue::Cell(contents) => contents.read().clone(),
            _ => None,
        }
    }

    pub fn cell_set(&self, value: NativeRef) -> bool {
        match self.value() {
            NativeValue::Cell(contents) => {
                *contents.write() = Some(value);
                true
            }
            _ => false,
        }
    }

    /// Reads an instance attribute.
    pub fn attr(&self, name: &str) -> Option<NativeRef> {
        match self.value() {
            NativeValue::Instance(instance) => instance.attrs.read().get(name).cloned(),
            NativeValue::Module(module) => module.dict.dict_get_str(name),
            NativeValue::Type(class) => class.member(name),
            _ => None,
        }
    }

    /// Writes an instance attribute. Returns false if this is not an instance.
    pub fn set_attr(&self, name: &str, value: NativeRef) -> bool {
        match self.value() {
            NativeValue::Instance(instance) => {
                instance.attrs.write().insert(name.to_string(), value);
                true
            }
            _ => false,
        }
    }

    /// Short human-readable rendering; containers are not expanded.
    pub fn display_text(&self) -> String {
        match self.value() {
            NativeValue::None => "None".to_string(),
            NativeValue::Bool(b) => (if *b { "True" } else { "False" }).to_string(),
            NativeValue::Int(i) => i.to_string(),
            NativeValue::Float(f) => f.to_string(),
            NativeValue::Str(s) => s.clone(),
            NativeValue::Exception(e) => format!("{}: {}", e.class.qualname, e.message()),
            other => format!("<{} object>", other.type_name()),
        }
    }
}

fn dedup(items: Vec<NativeRef>) -> Vec<NativeRef> {
    let mut unique: Vec<NativeRef> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.iter().any(|u| deep_eq(u, &item)) {
            unique.push(item);
        }
    }
    unique
}

impl Deref for NativeRef {
    type Target = NativeValue;

    fn deref(&self) -> &NativeValue {
        &self.0
    }
}

// Shallow on purpose: object graphs may be cyclic.
impl fmt::Debug for NativeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            NativeValue::None
            | NativeValue::Bool(_)
            | NativeValue::Int(_)
            | NativeValue::Float(_)
            | NativeValue::Str(_) => write!(f, "Native({})", self.display_text()),
            other => write!(f, "Native(<{}> {:?})", other.type_name(), self.id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singletons_share_identity() {
        assert!(NativeRef::none().ptr_eq(&NativeRef::none()));
        assert!(NativeRef::ellipsis().ptr_eq(&NativeRef::ellipsis()));
        assert!(!NativeRef::int(1).ptr_eq(&NativeRef::int(1)));
    }

    #[test]
    fn test_dict_replaces_equal_keys() {
        let dict = NativeRef::dict(vec![
            (NativeRef::str("a"), NativeRef::int(1)),
            (NativeRef::str("b"), NativeRef::int(2)),
        ]);
        dict.dict_set_str("a", NativeRef::int(10));

        let entries = dict.dict_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0.as_str(), Some("a"));
        assert_eq!(dict.dict_get_str("a").unwrap().as_int(), Some(&BigInt::from(10)));
        assert_eq!(
            dict.dict_get(&NativeRef::str("b")).unwrap().as_int(),
            Some(&BigInt::from(2))
        );
    }

    #[test]
    fn test_set_drops_duplicates() {
        let set = NativeRef::set(vec![NativeRef::int(1), NativeRef::int(1), NativeRef::int(2)]);
        assert_eq!(set.items().unwrap().len(), 2);
    }

    #[test]
    fn test_class_of_values() {
        assert_eq!(NativeRef::int(3).type_name(), "int");
        assert_eq!(NativeRef::list(vec![]).type_name(), "list");
        let point = NativeClass::new("Point", "geometry").into_ref();
        let p = NativeRef::instance(&point, vec![("x", NativeRef::int(1))]);
        assert!(Arc::ptr_eq(&p.class(), &point));
        assert_eq!(p.attr("x").unwrap().as_int(), Some(&BigInt::from(1)));
    }

    #[test]
    fn test_exception_message() {
        let class = builtin_exception("ValueError").unwrap();
        let e = NativeRef::exception(&class, vec![NativeRef::str("bad value")]);
        assert_eq!(e.display_text(), "ValueError: bad value");
    }

    #[test]
    fn test_debug_is_shallow_for_cycles() {
        let list = NativeRef::list(vec![]);
        list.push(list.clone());
        let rendered = format!("{list:?}");
        assert!(rendered.starts_with("Native(<list>"));
    }
}
