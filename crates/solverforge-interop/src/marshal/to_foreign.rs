//! Native to foreign conversion.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use super::adapters::NativeIterAdapter;
use super::memo::IdentityMemo;
use super::opaque;
use crate::context::TranslationContext;
use crate::error::Result;
use crate::foreign::{
    ForeignException, ForeignInstance, ForeignModule, ForeignRef, ForeignValue, OpaqueObject,
};
use crate::native::{NativeRef, NativeValue};

/// Converts `value` to its foreign counterpart.
///
/// Objects already in `memo` map to their recorded result. Mutable
/// containers and instances are registered before their contents are
/// converted, which is what lets self-referencing graphs terminate.
pub fn to_foreign(
    ctx: &Arc<TranslationContext>,
    value: &NativeRef,
    memo: &mut IdentityMemo,
) -> Result<ForeignRef> {
    if let Some(existing) = memo.foreign_for(value) {
        return Ok(existing);
    }

    let converted = match value.value() {
        NativeValue::Foreign(foreign) => return Ok(foreign.clone()),
        NativeValue::None => ForeignRef::none(),
        NativeValue::NotImplemented => ForeignRef::not_implemented(),
        NativeValue::Ellipsis => ForeignRef::ellipsis(),
        NativeValue::Bool(b) => ForeignRef::bool(*b),
        NativeValue::Int(i) => ForeignRef::int_from_hex(&i.to_str_radix(16))?,
        NativeValue::Float(f) => ForeignRef::float(*f),
        NativeValue::Complex { real, imag } => {
            ForeignRef::new(ForeignValue::Complex {
                real: ForeignRef::float(*real),
                imag: ForeignRef::float(*imag),
            })
        }
        NativeValue::Str(s) => ForeignRef::str(s.clone()),
        NativeValue::Bytes(b) => ForeignRef::bytes(b.clone()),
        NativeValue::Tuple(items) => {
            let snapshot = items.read().clone();
            let shell = ForeignRef::new(ForeignValue::Tuple(RwLock::new(Vec::new())));
            fill_sequence(ctx, value, &shell, snapshot, memo)?;
            return Ok(shell);
        }
        NativeValue::List(items) => {
            let snapshot = items.read().clone();
            let shell = ForeignRef::new(ForeignValue::List(RwLock::new(Vec::new())));
            fill_sequence(ctx, value, &shell, snapshot, memo)?;
            return Ok(shell);
        }
        NativeValue::Set(items) => {
            let snapshot = items.read().clone();
            let shell = ForeignRef::new(ForeignValue::Set(RwLock::new(Vec::new())));
            fill_sequence(ctx, value, &shell, snapshot, memo)?;
            return Ok(shell);
        }
        NativeValue::FrozenSet(items) => {
            // Immutable: only registered once fully built.
            let converted = items
                .iter()
                .map(|item| to_foreign(ctx, item, memo))
                .collect::<Result<Vec<_>>>()?;
            ForeignRef::new(ForeignValue::FrozenSet(converted))
        }
        NativeValue::Dict(entries) => {
            let shell = ForeignRef::new(ForeignValue::Dict(RwLock::new(Vec::new())));
            memo.record(value, &shell);
            let snapshot = entries.read().clone();
            for (key, item) in snapshot {
                let key = to_foreign(ctx, &key, memo)?;
                let item = to_foreign(ctx, &item, memo)?;
                if let ForeignValue::Dict(target) = shell.value() {
                    target.write().push((key, item));
                }
            }
            return Ok(shell);
        }
        NativeValue::Slice { start, stop, step } => {
            let start = to_foreign(ctx, start, memo)?;
            let stop = to_foreign(ctx, stop, memo)?;
            let step = to_foreign(ctx, step, memo)?;
            ForeignRef::new(ForeignValue::Slice { start, stop, step })
        }
        NativeValue::Range { start, stop, step } => {
            let start = to_foreign(ctx, start, memo)?;
            let stop = to_foreign(ctx, stop, memo)?;
            let step = to_foreign(ctx, step, memo)?;
            ForeignRef::new(ForeignValue::Range { start, stop, step })
        }
        NativeValue::Type(class) => ForeignRef::new(ForeignValue::Type(ctx.class_type(class))),
        NativeValue::GenericAlias(alias) => {
            // Generic parameters are erased.
            ForeignRef::new(ForeignValue::Type(ctx.class_type(&alias.origin)))
        }
        NativeValue::Module(module) => {
            if ctx.config().is_bridge_module(&module.name) {
                debug!(module = %module.name, "wrapping bridge module opaquely");
                ForeignRef::new(ForeignValue::Opaque(OpaqueObject::new(value.clone())))
            } else {
                ForeignRef::new(ForeignValue::Module(ForeignModule::new(
                    module.name.clone(),
                    value.clone(),
                )))
            }
        }
        NativeValue::Function(_) | NativeValue::Code(_) => {
            let shape = ctx.default_shape();
            ctx.function_handle(value, &shape, &[])?
        }
        NativeValue::Cell(contents) => {
            let shell = ForeignRef::cell(None);
            memo.record(value, &shell);
            let contents = contents.read().clone();
            if let Some(inner) = contents {
                let inner = to_foreign(ctx, &inner, memo)?;
                if let ForeignValue::Cell(target) = shell.value() {
                    *target.write() = Some(inner);
                }
            }
            return Ok(shell);
        }
        NativeValue::StaticMethod(inner) | NativeValue::ClassMethod(inner) => {
            to_foreign(ctx, inner, memo)?
        }
        NativeValue::Instance(instance) => {
            let ty = ctx.class_type(&instance.class);
            // Placeholders become objects: the class is compiling further up the stack.
            if ty.is_opaque() || ty.native_class().is_none() {
                let shell = ForeignRef::new(ForeignValue::Opaque(OpaqueObject::new(value.clone())));
                memo.record(value, &shell);
                if ctx.config().marshalling.sync_opaque_fields {
                    opaque::sync_fields(ctx, &shell, memo);
                }
                return Ok(shell);
            }
            let shell = ForeignRef::new(ForeignValue::Object(ForeignInstance {
                ty,
                fields: RwLock::new(Default::default()),
            }));
            memo.record(value, &shell);
            let attrs: Vec<(String, NativeRef)> = instance
                .attrs
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            for (name, attr) in attrs {
                let converted = to_foreign(ctx, &attr, memo)?;
                shell.set_field(&name, converted);
            }
            return Ok(shell);
        }
        NativeValue::Exception(exception) => {
            ctx.register_exception_type(&exception.class);
            let shell = ForeignRef::new(ForeignValue::Exception(ForeignException {
                type_name: exception.class.exception_name(),
                message: exception.message(),
                args: RwLock::new(Vec::new()),
            }));
            memo.record(value, &shell);
            let args = exception.args.read().clone();
            for arg in args {
                let converted = to_foreign(ctx, &arg, memo)?;
                if let ForeignValue::Exception(target) = shell.value() {
                    target.args.write().push(converted);
                }
            }
            return Ok(shell);
        }
        NativeValue::Iterator(iterator) => ForeignRef::iterator(Arc::new(NativeIterAdapter::new(
            ctx.clone(),
            iterator.clone(),
        ))),
    };

    trace!(kind = %converted.kind_name(), "converted to foreign");
    memo.record(value, &converted);
    Ok(converted)
}

fn fill_sequence(
    ctx: &Arc<TranslationContext>,
    source: &NativeRef,
    shell: &ForeignRef,
    items: Vec<NativeRef>,
    memo: &mut IdentityMemo,
) -> Result<()> {
    memo.record(source, shell);
    for item in items {
        let converted = to_foreign(ctx, &item, memo)?;
        if let ForeignValue::Tuple(target) | ForeignValue::List(target) | ForeignValue::Set(target) =
            shell.value()
        {
            target.write().push(converted);
        }
    }
    Ok(())
}
