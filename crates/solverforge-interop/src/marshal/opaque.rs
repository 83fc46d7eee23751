//! Field synchronization for opaque wrappers and lazy module attributes.

use std::sync::Arc;

use tracing::debug;

use super::memo::IdentityMemo;
use super::to_foreign::to_foreign;
use super::to_native::{to_native, Fallback};
use crate::context::TranslationContext;
use crate::error::Result;
use crate::foreign::{ForeignModule, ForeignRef, ForeignValue, OpaqueObject};
use crate::native::NativeValue;

/// Copies the native object's attributes into the wrapper's fields.
///
/// Best effort: attributes that fail to convert are skipped.
pub(crate) fn sync_fields(
    ctx: &Arc<TranslationContext>,
    wrapper: &ForeignRef,
    memo: &mut IdentityMemo,
) {
    let ForeignValue::Opaque(opaque) = wrapper.value() else {
        return;
    };
    let NativeValue::Instance(instance) = opaque.native().value() else {
        return;
    };
    let attrs: Vec<_> = instance
        .attrs
        .read()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    for (name, attr) in attrs {
        match to_foreign(ctx, &attr, memo) {
            Ok(converted) => opaque.load_field(name, converted),
            Err(err) => debug!(
                field = %name,
                type_name = %opaque.type_name(),
                error = %err,
                "skipping opaque field"
            ),
        }
    }
}

/// Writes fields assigned on the foreign side back to the native object.
pub(crate) fn write_back(
    ctx: &Arc<TranslationContext>,
    opaque: &OpaqueObject,
    memo: &mut IdentityMemo,
) {
    for (name, value) in opaque.take_dirty() {
        match to_native(ctx, &value, memo, &Fallback::Raise) {
            Ok(converted) => {
                opaque.native().set_attr(&name, converted);
            }
            Err(err) => debug!(
                field = %name,
                type_name = %opaque.type_name(),
                error = %err,
                "skipping opaque write-back"
            ),
        }
    }
}

impl ForeignModule {
    /// Returns attribute `name`, converting it on first access.
    ///
    /// Returns `Ok(None)` if the native module has no such attribute.
    pub fn attribute(&self, ctx: &Arc<TranslationContext>, name: &str) -> Result<Option<ForeignRef>> {
        if let Some(loaded) = self.attributes.read().get(name) {
            return Ok(Some(loaded.clone()));
        }
        let Some(native) = self.native().attr(name) else {
            return Ok(None);
        };
        let converted = to_foreign(ctx, &native, &mut IdentityMemo::new())?;
        let stored = self
            .attributes
            .write()
            .entry(name.to_string())
            .or_insert(converted)
            .clone();
        Ok(Some(stored))
    }
}
