//! Structural equality over possibly cyclic native graphs.

use std::collections::HashSet;
use std::sync::Arc;

use super::{NativeRef, NativeValue};
use crate::identity::ObjectId;

/// Returns true if `a` and `b` are structurally equal.
///
/// Pairs already under comparison are assumed equal, so self-referencing
/// graphs compare by shape. Sets and dicts ignore order. Functions,
/// modules, code objects and iterators compare by identity.
pub fn deep_eq(a: &NativeRef, b: &NativeRef) -> bool {
    let mut visiting = HashSet::new();
    eq(a, b, &mut visiting)
}

fn eq(a: &NativeRef, b: &NativeRef, visiting: &mut HashSet<(ObjectId, ObjectId)>) -> bool {
    if a.ptr_eq(b) {
        return true;
    }
    if !visiting.insert((a.id(), b.id())) {
        return true;
    }

    let result = match (a.value(), b.value()) {
        (NativeValue::None, NativeValue::None)
        | (NativeValue::NotImplemented, NativeValue::NotImplemented)
        | (NativeValue::Ellipsis, NativeValue::Ellipsis) => true,
        (NativeValue::Bool(x), NativeValue::Bool(y)) => x == y,
        (NativeValue::Int(x), NativeValue::Int(y)) => x == y,
        (NativeValue::Float(x), NativeValue::Float(y)) => float_eq(*x, *y),
        (
            NativeValue::Complex { real: r1, imag: i1 },
            NativeValue::Complex { real: r2, imag: i2 },
        ) => float_eq(*r1, *r2) && float_eq(*i1, *i2),
        (NativeValue::Str(x), NativeValue::Str(y)) => x == y,
        (NativeValue::Bytes(x), NativeValue::Bytes(y)) => x == y,
        (NativeValue::Tuple(x), NativeValue::Tuple(y))
        | (NativeValue::List(x), NativeValue::List(y)) => {
            let (x, y) = (x.read().clone(), y.read().clone());
            seq_eq(&x, &y, visiting)
        }
        (NativeValue::Set(x), NativeValue::Set(y)) => {
            let (x, y) = (x.read().clone(), y.read().clone());
            unordered_eq(&x, &y, visiting)
        }
        (NativeValue::FrozenSet(x), NativeValue::FrozenSet(y)) => unordered_eq(x, y, visiting),
        (NativeValue::Dict(x), NativeValue::Dict(y)) => {
            let (x, y) = (x.read().clone(), y.read().clone());
            x.len() == y.len()
                && x.iter().all(|(k1, v1)| {
                    y.iter()
                        .find(|(k2, _)| eq(k1, k2, visiting))
                        .is_some_and(|(_, v2)| eq(v1, v2, visiting))
                })
        }
        (
            NativeValue::Slice {
                start: a1,
                stop: b1,
                step: c1,
            },
            NativeValue::Slice {
                start: a2,
                stop: b2,
                step: c2,
            },
        )
        | (
            NativeValue::Range {
                start: a1,
                stop: b1,
                step: c1,
            },
            NativeValue::Range {
                start: a2,
                stop: b2,
                step: c2,
            },
        ) => eq(a1, a2, visiting) && eq(b1, b2, visiting) && eq(c1, c2, visiting),
        (NativeValue::Type(x), NativeValue::Type(y)) => Arc::ptr_eq(x, y),
        (NativeValue::GenericAlias(x), NativeValue::GenericAlias(y)) => {
            Arc::ptr_eq(&x.origin, &y.origin) && x.args.len() == y.args.len()
        }
        (NativeValue::Cell(x), NativeValue::Cell(y)) => {
            let (x, y) = (x.read().clone(), y.read().clone());
            match (x, y) {
                (Some(x), Some(y)) => eq(&x, &y, visiting),
                (None, None) => true,
                _ => false,
            }
        }
        (NativeValue::StaticMethod(x), NativeValue::StaticMethod(y))
        | (NativeValue::ClassMethod(x), NativeValue::ClassMethod(y)) => eq(x, y, visiting),
        (NativeValue::Instance(x), NativeValue::Instance(y)) => {
            Arc::ptr_eq(&x.class, &y.class) && {
                let (x, y) = (x.attrs.read().clone(), y.attrs.read().clone());
                x.len() == y.len()
                    && x
                        .iter()
                        .all(|(name, v1)| y.get(name).is_some_and(|v2| eq(v1, v2, visiting)))
            }
        }
        (NativeValue::Exception(x), NativeValue::Exception(y)) => {
            Arc::ptr_eq(&x.class, &y.class) && {
                let (x, y) = (x.args.read().clone(), y.args.read().clone());
                seq_eq(&x, &y, visiting)
            }
        }
        (NativeValue::Foreign(x), NativeValue::Foreign(y)) => x.ptr_eq(y),
        _ => false,
    };

    if !result {
        visiting.remove(&(a.id(), b.id()));
    }
    result
}

fn float_eq(x: f64, y: f64) -> bool {
    x == y || (x.is_nan() && y.is_nan())
}

fn seq_eq(x: &[NativeRef], y: &[NativeRef], visiting: &mut HashSet<(ObjectId, ObjectId)>) -> bool {
    x.len() == y.len() && x.iter().zip(y).all(|(a, b)| eq(a, b, visiting))
}

fn unordered_eq(
    x: &[NativeRef],
    y: &[NativeRef],
    visiting: &mut HashSet<(ObjectId, ObjectId)>,
) -> bool {
    x.len() == y.len() && x.iter().all(|a| y.iter().any(|b| eq(a, b, visiting)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars() {
        assert!(deep_eq(&NativeRef::int(5), &NativeRef::int(5)));
        assert!(!deep_eq(&NativeRef::int(5), &NativeRef::bool(true)));
        assert!(deep_eq(&NativeRef::float(f64::NAN), &NativeRef::float(f64::NAN)));
        assert!(!deep_eq(&NativeRef::str("a"), &NativeRef::bytes(b"a".to_vec())));
    }

    #[test]
    fn test_unordered_containers() {
        let a = NativeRef::set(vec![NativeRef::int(1), NativeRef::int(2)]);
        let b = NativeRef::set(vec![NativeRef::int(2), NativeRef::int(1)]);
        assert!(deep_eq(&a, &b));

        let d1 = NativeRef::dict(vec![
            (NativeRef::str("x"), NativeRef::int(1)),
            (NativeRef::str("y"), NativeRef::int(2)),
        ]);
        let d2 = NativeRef::dict(vec![
            (NativeRef::str("y"), NativeRef::int(2)),
            (NativeRef::str("x"), NativeRef::int(1)),
        ]);
        assert!(deep_eq(&d1, &d2));
    }

    #[test]
    fn test_self_containing_lists() {
        let a = NativeRef::list(vec![NativeRef::int(1)]);
        a.push(a.clone());
        let b = NativeRef::list(vec![NativeRef::int(1)]);
        b.push(b.clone());
        assert!(deep_eq(&a, &b));

        let c = NativeRef::list(vec![NativeRef::int(2)]);
        c.push(c.clone());
        assert!(!deep_eq(&a, &c));
    }
}
