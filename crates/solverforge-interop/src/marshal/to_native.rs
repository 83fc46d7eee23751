//! Foreign to native conversion.

use std::sync::Arc;

use num_bigint::BigInt;
use num_traits::Num;
use parking_lot::RwLock;
use tracing::{debug, trace};

use super::adapters::ForeignIterAdapter;
use super::memo::IdentityMemo;
use super::opaque;
use crate::context::TranslationContext;
use crate::error::{ConversionError, Result};
use crate::foreign::{ForeignRef, ForeignValue};
use crate::native::{
    foreign_error_class, BuiltinType, NativeClass, NativeException, NativeInstance, NativeRef,
    NativeValue,
};

/// What to do with a foreign value that has no native rule.
#[derive(Debug, Clone, Default)]
pub enum Fallback {
    /// Fail with [`ConversionError::NoNativeMapping`].
    #[default]
    Raise,
    /// Substitute this value.
    Default(NativeRef),
}

/// Converts `value` to its native counterpart.
///
/// The mirror of [`super::to_foreign`]: opaque wrappers, modules and
/// function handles give back the exact native object they came from.
pub fn to_native(
    ctx: &Arc<TranslationContext>,
    value: &ForeignRef,
    memo: &mut IdentityMemo,
    fallback: &Fallback,
) -> Result<NativeRef> {
    if let Some(existing) = memo.native_for(value) {
        return Ok(existing);
    }

    let converted = match value.value() {
        ForeignValue::None => NativeRef::none(),
        ForeignValue::NotImplemented => NativeRef::not_implemented(),
        ForeignValue::Ellipsis => NativeRef::ellipsis(),
        ForeignValue::Bool(b) => NativeRef::bool(*b),
        ForeignValue::Int(i) => {
            let text = i.to_str_radix(16);
            let parsed = BigInt::from_str_radix(&text, 16)
                .map_err(|_| ConversionError::InvalidInteger(text.clone()))?;
            NativeRef::int(parsed)
        }
        ForeignValue::Float(f) => NativeRef::float(*f),
        ForeignValue::Complex { real, imag } => match (real.as_float(), imag.as_float()) {
            (Some(real), Some(imag)) => NativeRef::complex(real, imag),
            _ => {
                return Err(ConversionError::Malformed {
                    kind: "complex",
                    reason: "real and imaginary parts must be floats".to_string(),
                }
                .into())
            }
        },
        ForeignValue::Str(s) => NativeRef::str(s.clone()),
        ForeignValue::Bytes(b) => NativeRef::bytes(b.clone()),
        ForeignValue::Tuple(items) => {
            let snapshot = items.read().clone();
            let shell = NativeRef::new(NativeValue::Tuple(RwLock::new(Vec::new())));
            fill_sequence(ctx, value, &shell, snapshot, memo, fallback)?;
            return Ok(shell);
        }
        ForeignValue::List(items) => {
            let snapshot = items.read().clone();
            let shell = NativeRef::new(NativeValue::List(RwLock::new(Vec::new())));
            fill_sequence(ctx, value, &shell, snapshot, memo, fallback)?;
            return Ok(shell);
        }
        ForeignValue::Set(items) => {
            let snapshot = items.read().clone();
            let shell = NativeRef::new(NativeValue::Set(RwLock::new(Vec::new())));
            fill_sequence(ctx, value, &shell, snapshot, memo, fallback)?;
            return Ok(shell);
        }
        ForeignValue::FrozenSet(items) => {
            let converted = items
                .iter()
                .map(|item| to_native(ctx, item, memo, fallback))
                .collect::<Result<Vec<_>>>()?;
            NativeRef::frozenset(converted)
        }
        ForeignValue::Dict(entries) => {
            let snapshot = entries.read().clone();
            let shell = NativeRef::dict(Vec::new());
            memo.record_native(value, &shell);
            for (key, item) in snapshot {
                let key = to_native(ctx, &key, memo, fallback)?;
                let item = to_native(ctx, &item, memo, fallback)?;
                shell.dict_insert(key, item);
            }
            return Ok(shell);
        }
        ForeignValue::Slice { start, stop, step } => NativeRef::slice(
            to_native(ctx, start, memo, fallback)?,
            to_native(ctx, stop, memo, fallback)?,
            to_native(ctx, step, memo, fallback)?,
        ),
        ForeignValue::Range { start, stop, step } => NativeRef::new(NativeValue::Range {
            start: to_native(ctx, start, memo, fallback)?,
            stop: to_native(ctx, stop, memo, fallback)?,
            step: to_native(ctx, step, memo, fallback)?,
        }),
        ForeignValue::Type(ty) => match (ty.builtin_type(), ty.native_class()) {
            (Some(builtin), _) => NativeRef::class_object(&NativeClass::builtin(builtin)),
            (None, Some(class)) => NativeRef::class_object(class),
            (None, None) => NativeRef::class_object(&NativeClass::builtin(BuiltinType::Object)),
        },
        ForeignValue::Module(module) => module.native().clone(),
        ForeignValue::Function(function) => function.native().clone(),
        ForeignValue::Cell(contents) => {
            let contents = contents.read().clone();
            let shell = NativeRef::cell(None);
            memo.record_native(value, &shell);
            if let Some(inner) = contents {
                shell.cell_set(to_native(ctx, &inner, memo, fallback)?);
            }
            return Ok(shell);
        }
        ForeignValue::Object(instance) => {
            let Some(class) = instance.ty.native_class() else {
                return no_mapping(value, fallback);
            };
            let fields: Vec<(String, ForeignRef)> = instance
                .fields
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            let shell = NativeRef::new(NativeValue::Instance(NativeInstance {
                class: class.clone(),
                attrs: RwLock::new(Default::default()),
            }));
            memo.record_native(value, &shell);
            for (name, field) in fields {
                let converted = to_native(ctx, &field, memo, fallback)?;
                shell.set_attr(&name, converted);
            }
            return Ok(shell);
        }
        ForeignValue::Opaque(wrapper) => {
            let native = wrapper.native().clone();
            memo.record_native(value, &native);
            if ctx.config().marshalling.sync_opaque_fields {
                opaque::write_back(ctx, wrapper, memo);
            }
            return Ok(native);
        }
        ForeignValue::Exception(exception) => {
            let args = exception.args.read().clone();
            let class = match ctx.exception_type(&exception.type_name) {
                Some(class) => class,
                None => {
                    debug!(
                        type_name = %exception.type_name,
                        "no native exception type, wrapping as ForeignError"
                    );
                    let shell = NativeRef::exception(
                        &foreign_error_class(),
                        vec![NativeRef::str(format!(
                            "{}: {}",
                            exception.type_name, exception.message
                        ))],
                    );
                    memo.record_native(value, &shell);
                    return Ok(shell);
                }
            };
            let shell = NativeRef::new(NativeValue::Exception(NativeException {
                class,
                args: RwLock::new(Vec::new()),
            }));
            memo.record_native(value, &shell);
            for arg in args {
                let converted = to_native(ctx, &arg, memo, fallback)?;
                if let NativeValue::Exception(target) = shell.value() {
                    target.args.write().push(converted);
                }
            }
            return Ok(shell);
        }
        ForeignValue::Iterator(iterator) => NativeRef::iterator(Arc::new(ForeignIterAdapter::new(
            ctx.clone(),
            iterator.clone(),
        ))),
        ForeignValue::Host(_) => return no_mapping(value, fallback),
    };

    trace!(kind = %value.kind_name(), "converted to native");
    memo.record_native(value, &converted);
    Ok(converted)
}

fn no_mapping(value: &ForeignRef, fallback: &Fallback) -> Result<NativeRef> {
    match fallback {
        Fallback::Default(default) => Ok(default.clone()),
        Fallback::Raise => Err(ConversionError::NoNativeMapping {
            type_name: value.kind_name(),
        }
        .into()),
    }
}

fn fill_sequence(
    ctx: &Arc<TranslationContext>,
    source: &ForeignRef,
    shell: &NativeRef,
    items: Vec<ForeignRef>,
    memo: &mut IdentityMemo,
    fallback: &Fallback,
) -> Result<()> {
    memo.record_native(source, shell);
    for item in items {
        let converted = to_native(ctx, &item, memo, fallback)?;
        if let NativeValue::Tuple(target) | NativeValue::List(target) | NativeValue::Set(target) =
            shell.value()
        {
            target.write().push(converted);
        }
    }
    Ok(())
}
