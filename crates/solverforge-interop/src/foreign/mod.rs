//! Foreign (target-runtime) object model.
//!
//! Mirrors the native model: values are shared through [`ForeignRef`]
//! handles with address identity, and containers are lockable so cyclic
//! graphs can be built shell-first.

mod iter;
mod objects;
mod types;

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::Num;
use parking_lot::RwLock;

pub use iter::{ForeignIterator, ForeignSequence, ForeignStep};
pub use objects::{
    ForeignException, ForeignFunction, ForeignInstance, ForeignModule, HostObject, OpaqueObject,
};
pub use types::{ClassResolution, CompiledClass, ForeignType};

use crate::error::ConversionError;
use crate::identity::ObjectId;

/// Every shape a foreign object can take.
#[derive(Debug)]
pub enum ForeignValue {
    None,
    NotImplemented,
    Ellipsis,
    Bool(bool),
    Int(BigInt),
    Float(f64),
    /// Real and imaginary parts are independent float objects.
    Complex { real: ForeignRef, imag: ForeignRef },
    Str(String),
    Bytes(Vec<u8>),
    Tuple(RwLock<Vec<ForeignRef>>),
    List(RwLock<Vec<ForeignRef>>),
    Set(RwLock<Vec<ForeignRef>>),
    FrozenSet(Vec<ForeignRef>),
    Dict(RwLock<Vec<(ForeignRef, ForeignRef)>>),
    Slice {
        start: ForeignRef,
        stop: ForeignRef,
        step: ForeignRef,
    },
    Range {
        start: ForeignRef,
        stop: ForeignRef,
        step: ForeignRef,
    },
    Type(ForeignType),
    Module(ForeignModule),
    Function(ForeignFunction),
    Cell(RwLock<Option<ForeignRef>>),
    Object(ForeignInstance),
    Opaque(OpaqueObject),
    Exception(ForeignException),
    Iterator(Arc<dyn ForeignIterator>),
    Host(HostObject),
}

impl ForeignValue {
    /// Short name of the kind of value, for diagnostics.
    pub fn kind_name(&self) -> String {
        match self {
            ForeignValue::None => "none".to_string(),
            ForeignValue::NotImplemented => "not-implemented".to_string(),
            ForeignValue::Ellipsis => "ellipsis".to_string(),
            ForeignValue::Bool(_) => "bool".to_string(),
            ForeignValue::Int(_) => "int".to_string(),
            ForeignValue::Float(_) => "float".to_string(),
            ForeignValue::Complex { .. } => "complex".to_string(),
            ForeignValue::Str(_) => "str".to_string(),
            ForeignValue::Bytes(_) => "bytes".to_string(),
            ForeignValue::Tuple(_) => "tuple".to_string(),
            ForeignValue::List(_) => "list".to_string(),
            ForeignValue::Set(_) => "set".to_string(),
            ForeignValue::FrozenSet(_) => "frozenset".to_string(),
            ForeignValue::Dict(_) => "dict".to_string(),
            ForeignValue::Slice { .. } => "slice".to_string(),
            ForeignValue::Range { .. } => "range".to_string(),
            ForeignValue::Type(_) => "type".to_string(),
            ForeignValue::Module(_) => "module".to_string(),
            ForeignValue::Function(_) => "function".to_string(),
            ForeignValue::Cell(_) => "cell".to_string(),
            ForeignValue::Object(instance) => instance.ty.name().to_string(),
            ForeignValue::Opaque(opaque) => format!("opaque {}", opaque.type_name()),
            ForeignValue::Exception(exception) => exception.type_name.clone(),
            ForeignValue::Iterator(_) => "iterator".to_string(),
            ForeignValue::Host(host) => host.class_name.clone(),
        }
    }
}

/// Shared handle to a foreign object.
#[derive(Clone)]
pub struct ForeignRef(Arc<ForeignValue>);

impl ForeignRef {
    pub fn new(value: ForeignValue) -> Self {
        ForeignRef(Arc::new(value))
    }

    pub fn id(&self) -> ObjectId {
        ObjectId::of(&self.0)
    }

    pub fn ptr_eq(&self, other: &ForeignRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn value(&self) -> &ForeignValue {
        &self.0
    }

    /// The foreign `None` singleton.
    pub fn none() -> Self {
        static NONE: OnceLock<ForeignRef> = OnceLock::new();
        NONE.get_or_init(|| ForeignRef::new(ForeignValue::None)).clone()
    }

    /// The foreign `NotImplemented` singleton.
    pub fn not_implemented() -> Self {
        static NOT_IMPLEMENTED: OnceLock<ForeignRef> = OnceLock::new();
        NOT_IMPLEMENTED
            .get_or_init(|| ForeignRef::new(ForeignValue::NotImplemented))
            .clone()
    }

    /// The foreign `Ellipsis` singleton.
    pub fn ellipsis() -> Self {
        static ELLIPSIS: OnceLock<ForeignRef> = OnceLock::new();
        ELLIPSIS
            .get_or_init(|| ForeignRef::new(ForeignValue::Ellipsis))
            .clone()
    }

    pub fn bool(value: bool) -> Self {
        ForeignRef::new(ForeignValue::Bool(value))
    }

    pub fn int(value: impl Into<BigInt>) -> Self {
        ForeignRef::new(ForeignValue::Int(value.into()))
    }

    /// Builds an integer from its hexadecimal text, sign included.
    ///
    /// This is the only path integers take across the boundary, so widths
    /// beyond 64 bits survive unchanged.
    pub fn int_from_hex(text: &str) -> Result<Self, ConversionError> {
        BigInt::from_str_radix(text, 16)
            .map(ForeignRef::int)
            .map_err(|_| ConversionError::InvalidInteger(text.to_string()))
    }

    pub fn float(value: f64) -> Self {
        ForeignRef::new(ForeignValue::Float(value))
    }

    pub fn str(value: impl Into<String>) -> Self {
        ForeignRef::new(ForeignValue::Str(value.into()))
    }

    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        ForeignRef::new(ForeignValue::Bytes(value.into()))
    }

    pub fn list(items: Vec<ForeignRef>) -> Self {
        ForeignRef::new(ForeignValue::List(RwLock::new(items)))
    }

    pub fn tuple(items: Vec<ForeignRef>) -> Self {
        ForeignRef::new(ForeignValue::Tuple(RwLock::new(items)))
    }

    pub fn dict(entries: Vec<(ForeignRef, ForeignRef)>) -> Self {
        ForeignRef::new(ForeignValue::Dict(RwLock::new(entries)))
    }

    pub fn cell(contents: Option<ForeignRef>) -> Self {
        ForeignRef::new(ForeignValue::Cell(RwLock::new(contents)))
    }

    pub fn exception(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        ForeignRef::new(ForeignValue::Exception(ForeignException {
            type_name: type_name.into(),
            args: RwLock::new(vec![ForeignRef::str(message.clone())]),
            message,
        }))
    }

    pub fn object(ty: ForeignType, fields: Vec<(&str, ForeignRef)>) -> Self {
        ForeignRef::new(ForeignValue::Object(ForeignInstance {
            ty,
            fields: RwLock::new(
                fields
                    .into_iter()
                    .map(|(name, value)| (name.to_string(), value))
                    .collect::<IndexMap<_, _>>(),
            ),
        }))
    }

    pub fn iterator(iterator: Arc<dyn ForeignIterator>) -> Self {
        ForeignRef::new(ForeignValue::Iterator(iterator))
    }

    pub fn host(class_name: impl Into<String>, handle: u64) -> Self {
        ForeignRef::new(ForeignValue::Host(HostObject {
            class_name: class_name.into(),
            handle,
        }))
    }

    pub fn is_none(&self) -> bool {
        matches!(self.value(), ForeignValue::None)
    }

    pub fn as_int(&self) -> Option<&BigInt> {
        match self.value() {
            ForeignValue::Int(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self.value() {
            ForeignValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.value() {
            ForeignValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&ForeignType> {
        match self.value() {
            ForeignValue::Type(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&ForeignFunction> {
        match self.value() {
            ForeignValue::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_opaque(&self) -> Option<&OpaqueObject> {
        match self.value() {
            ForeignValue::Opaque(opaque) => Some(opaque),
            _ => None,
        }
    }

    /// Snapshot of the elements of a tuple, list, set or frozenset.
    pub fn items(&self) -> Option<Vec<ForeignRef>> {
        match self.value() {
            ForeignValue::Tuple(items) | ForeignValue::List(items) | ForeignValue::Set(items) => {
                Some(items.read().clone())
            }
            ForeignValue::FrozenSet(items) => Some(items.clone()),
            _ => None,
        }
    }

    pub fn dict_entries(&self) -> Option<Vec<(ForeignRef, ForeignRef)>> {
        match self.value() {
            ForeignValue::Dict(entries) => Some(entries.read().clone()),
            _ => None,
        }
    }

    pub fn cell_get(&self) -> Option<ForeignRef> {
        match self.value() {
            ForeignValue::Cell(contents) => contents.read().clone(),
            _ => None,
        }
    }

    /// Reads a field of a compiled instance or an opaque wrapper.
    pub fn field(&self, name: &str) -> Option<ForeignRef> {
        match self.value() {
            ForeignValue::Object(instance) => instance.fields.read().get(name).cloned(),
            ForeignValue::Opaque(opaque) => opaque.field(name),
            _ => None,
        }
    }

    /// Writes a field of a compiled instance or an opaque wrapper.
    pub fn set_field(&self, name: &str, value: ForeignRef) -> bool {
        match self.value() {
            ForeignValue::Object(instance) => {
                instance.fields.write().insert(name.to_string(), value);
                true
            }
            ForeignValue::Opaque(opaque) => {
                opaque.set_field(name, value);
                true
            }
            _ => false,
        }
    }
}

impl Deref for ForeignRef {
    type Target = ForeignValue;

    fn deref(&self) -> &ForeignValue {
        &self.0
    }
}

impl PartialEq for ForeignRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ForeignRef {}

impl fmt::Debug for ForeignRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            ForeignValue::None => write!(f, "Foreign(None)"),
            ForeignValue::Bool(b) => write!(f, "Foreign({b})"),
            ForeignValue::Int(i) => write!(f, "Foreign({i})"),
            ForeignValue::Float(x) => write!(f, "Foreign({x})"),
            ForeignValue::Str(s) => write!(f, "Foreign({s:?})"),
            other => write!(f, "Foreign(<{}> {:?})", other.kind_name(), self.id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_from_hex_keeps_wide_values() {
        let wide: BigInt = BigInt::from(1u8) << 100;
        let text = format!("-{}", wide.to_str_radix(16));
        let value = ForeignRef::int_from_hex(&text).unwrap();
        assert_eq!(value.as_int(), Some(&-wide));
    }

    #[test]
    fn test_int_from_hex_rejects_garbage() {
        assert_eq!(
            ForeignRef::int_from_hex("0xzz").unwrap_err(),
            ConversionError::InvalidInteger("0xzz".to_string())
        );
    }

    #[test]
    fn test_singletons() {
        assert_eq!(ForeignRef::none(), ForeignRef::none());
        assert_ne!(ForeignRef::str("a"), ForeignRef::str("a"));
    }

    #[test]
    fn test_fields() {
        let obj = ForeignRef::object(ForeignType::object(), vec![("x", ForeignRef::int(1))]);
        assert!(obj.set_field("y", ForeignRef::int(2)));
        assert_eq!(obj.field("x").unwrap().as_int(), Some(&BigInt::from(1)));
        assert_eq!(obj.field("y").unwrap().as_int(), Some(&BigInt::from(2)));
        assert!(!ForeignRef::int(3).set_field("x", ForeignRef::none()));
    }
}
