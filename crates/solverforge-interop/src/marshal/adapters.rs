//! Iterator adapters that convert each step across the boundary.
//!
//! Every step uses a fresh identity memo: values yielded by separate calls
//! share nothing.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::memo::IdentityMemo;
use super::to_foreign::to_foreign;
use super::to_native::{to_native, Fallback};
use crate::context::TranslationContext;
use crate::foreign::{ForeignIterator, ForeignRef, ForeignStep};
use crate::native::{foreign_error_class, NativeIterator, NativeRef, NativeStep};

/// Foreign view of a native iterator.
pub struct NativeIterAdapter {
    ctx: Arc<TranslationContext>,
    inner: Arc<dyn NativeIterator>,
}

impl NativeIterAdapter {
    pub fn new(ctx: Arc<TranslationContext>, inner: Arc<dyn NativeIterator>) -> Self {
        Self { ctx, inner }
    }

    fn convert(&self, step: NativeStep) -> ForeignStep {
        let mut memo = IdentityMemo::new();
        match step {
            Ok(None) => Ok(None),
            Ok(Some(value)) => match to_foreign(&self.ctx, &value, &mut memo) {
                Ok(converted) => Ok(Some(converted)),
                Err(err) => Err(ForeignRef::exception("ConversionError", err.to_string())),
            },
            Err(exception) => match to_foreign(&self.ctx, &exception, &mut memo) {
                Ok(converted) => Err(converted),
                Err(err) => Err(ForeignRef::exception("ConversionError", err.to_string())),
            },
        }
    }

    fn to_native_arg(&self, value: &ForeignRef) -> Result<NativeRef, ForeignRef> {
        to_native(&self.ctx, value, &mut IdentityMemo::new(), &Fallback::Raise)
            .map_err(|err| ForeignRef::exception("ConversionError", err.to_string()))
    }
}

impl ForeignIterator for NativeIterAdapter {
    fn next(&self) -> ForeignStep {
        self.convert(self.inner.next())
    }

    fn send(&self, value: ForeignRef) -> ForeignStep {
        let value = self.to_native_arg(&value)?;
        self.convert(self.inner.send(value))
    }

    fn throw(&self, exception: ForeignRef) -> ForeignStep {
        let exception = self.to_native_arg(&exception)?;
        self.convert(self.inner.throw(exception))
    }
}

impl fmt::Debug for NativeIterAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NativeIterAdapter").field(&self.inner).finish()
    }
}

/// Native view of a foreign iterator.
pub struct ForeignIterAdapter {
    ctx: Arc<TranslationContext>,
    inner: Arc<dyn ForeignIterator>,
}

impl ForeignIterAdapter {
    pub fn new(ctx: Arc<TranslationContext>, inner: Arc<dyn ForeignIterator>) -> Self {
        Self { ctx, inner }
    }

    fn convert(&self, step: ForeignStep) -> NativeStep {
        let mut memo = IdentityMemo::new();
        match step {
            Ok(None) => Ok(None),
            Ok(Some(value)) => to_native(&self.ctx, &value, &mut memo, &Fallback::Raise)
                .map(Some)
                .map_err(|err| conversion_failure(err.to_string())),
            Err(exception) => Err(to_native(&self.ctx, &exception, &mut memo, &Fallback::Raise)
                .unwrap_or_else(|err| conversion_failure(err.to_string()))),
        }
    }

    fn to_foreign_arg(&self, value: &NativeRef) -> Result<ForeignRef, NativeRef> {
        to_foreign(&self.ctx, value, &mut IdentityMemo::new())
            .map_err(|err| conversion_failure(err.to_string()))
    }
}

fn conversion_failure(message: String) -> NativeRef {
    debug!(%message, "iterator step failed to convert");
    NativeRef::exception(&foreign_error_class(), vec![NativeRef::str(message)])
}

impl NativeIterator for ForeignIterAdapter {
    fn next(&self) -> NativeStep {
        self.convert(self.inner.next())
    }

    fn send(&self, value: NativeRef) -> NativeStep {
        let value = self.to_foreign_arg(&value)?;
        self.convert(self.inner.send(value))
    }

    fn throw(&self, exception: NativeRef) -> NativeStep {
        let exception = self.to_foreign_arg(&exception)?;
        self.convert(self.inner.throw(exception))
    }
}

impl fmt::Debug for ForeignIterAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ForeignIterAdapter").field(&self.inner).finish()
    }
}
