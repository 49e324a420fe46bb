use std::marker::PhantomData;

use rewind_core::{BoxError, LoggedCompensation};
use serde::de::DeserializeOwned;

use crate::compensator::{Compensator, RewindMode};
use crate::error::CompensationError;

pub(crate) trait ErasedCompensator<Ctx>: Send + Sync {
    fn compensate_erased(
        &self,
        ctx: &Ctx,
        entry: &LoggedCompensation,
        mode: RewindMode,
    ) -> Result<(), CompensationError>;

    fn compensation_description(&self) -> String;
}

pub(crate) struct CompensatorWrapper<C> {
    name: String,
    compensator: C,
}

impl<C> CompensatorWrapper<C> {
    pub(crate) fn new(name: String, compensator: C) -> Self {
        Self { name, compensator }
    }
}

impl<C> ErasedCompensator<C::Context> for CompensatorWrapper<C>
where
    C: Compensator,
{
    fn compensate_erased(
        &self,
        ctx: &C::Context,
        entry: &LoggedCompensation,
        mode: RewindMode,
    ) -> Result<(), CompensationError> {
        let payload = decode_payload::<C::Payload>(entry)?;
        self.compensator
            .compensate(ctx, payload, mode)
            .map_err(|source| CompensationError::Failed {
                name: self.name.clone(),
                mark: entry.mark,
                description: self.compensation_description(),
                source,
            })
    }

    fn compensation_description(&self) -> String {
        self.compensator.compensation_description(&self.name)
    }
}

/// Compensator backed by a plain closure over the decoded payload and the
/// rewind mode.
pub(crate) struct FnCompensator<F, P> {
    name: String,
    compensate: F,
    _payload: PhantomData<fn(P)>,
}

impl<F, P> FnCompensator<F, P> {
    pub(crate) fn new(name: String, compensate: F) -> Self {
        Self {
            name,
            compensate,
            _payload: PhantomData,
        }
    }
}

impl<Ctx, F, P> ErasedCompensator<Ctx> for FnCompensator<F, P>
where
    F: Fn(&Ctx, P, RewindMode) -> Result<(), BoxError> + Send + Sync,
    P: DeserializeOwned,
{
    fn compensate_erased(
        &self,
        ctx: &Ctx,
        entry: &LoggedCompensation,
        mode: RewindMode,
    ) -> Result<(), CompensationError> {
        let payload = decode_payload::<P>(entry)?;
        (self.compensate)(ctx, payload, mode).map_err(|source| CompensationError::Failed {
            name: self.name.clone(),
            mark: entry.mark,
            description: format!("reverse {}", self.name),
            source,
        })
    }

    fn compensation_description(&self) -> String {
        format!("reverse {}", self.name)
    }
}

fn decode_payload<P: DeserializeOwned>(
    entry: &LoggedCompensation,
) -> Result<P, CompensationError> {
    serde_json::from_value(entry.record.payload.clone()).map_err(|source| {
        CompensationError::MalformedPayload {
            name: entry.compensator_name().to_string(),
            mark: entry.mark,
            source,
        }
    })
}
