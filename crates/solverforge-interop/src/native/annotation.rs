use std::sync::Arc;

use super::class::{BuiltinType, NativeClass};
use super::NativeRef;

/// A native type annotation as found on a parameter, return value or field.
#[derive(Debug, Clone)]
pub enum Annotation {
    /// A plain class.
    Class(Arc<NativeClass>),
    /// A parameterized generic such as `list[int]`.
    Generic {
        origin: Arc<NativeClass>,
        args: Vec<Annotation>,
    },
    /// `Optional[T]`.
    Optional(Box<Annotation>),
    /// `Union[A, B]` or `A | B`.
    Union(Vec<Annotation>),
    /// `Annotated[T, metadata...]`.
    Annotated {
        inner: Box<Annotation>,
        metadata: Vec<NativeRef>,
    },
    /// A string naming a type, possibly with subscripts.
    ForwardRef(String),
    /// `None` used as a type.
    NoneType,
    Any,
    TypeVar(String),
    /// Any other object placed in annotation position.
    Other(NativeRef),
}

impl Annotation {
    pub fn class(class: &Arc<NativeClass>) -> Self {
        Annotation::Class(class.clone())
    }

    pub fn builtin(builtin: BuiltinType) -> Self {
        Annotation::Class(NativeClass::builtin(builtin))
    }

    pub fn generic(origin: BuiltinType, args: Vec<Annotation>) -> Self {
        Annotation::Generic {
            origin: NativeClass::builtin(origin),
            args,
        }
    }

    pub fn optional(inner: Annotation) -> Self {
        Annotation::Optional(Box::new(inner))
    }

    pub fn annotated(inner: Annotation, metadata: Vec<NativeRef>) -> Self {
        Annotation::Annotated {
            inner: Box::new(inner),
            metadata,
        }
    }

    pub fn forward(name: impl Into<String>) -> Self {
        Annotation::ForwardRef(name.into())
    }
}
