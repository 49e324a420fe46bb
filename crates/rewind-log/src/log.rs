use indexmap::IndexMap;
use rewind_core::error::Result as StoreResult;
use rewind_core::{BoxError, CompensationRecord, LoggedCompensation, Mark, StoreError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, trace, warn};

use crate::audit::RewindAudit;
use crate::compensator::{Compensator, RewindMode};
use crate::erased::{CompensatorWrapper, ErasedCompensator, FnCompensator};
use crate::error::CompensationError;
use crate::store::{CompensationStore, MemoryCompensationStore};

/// Append-only access to a compensation log.
///
/// This is all a domain applier gets to see of the log: it can read the
/// current mark and append, never rewind.
pub trait CompensationWriter {
    fn mark(&self) -> Mark;

    /// # Errors
    ///
    /// Returns an error if the record cannot be persisted.
    fn append(&mut self, record: CompensationRecord) -> StoreResult<Mark>;
}

/// The compensation log: mark counter, compensator registry and rewind.
///
/// `Ctx` is the state the compensators mutate; it is passed in on every
/// rewind rather than owned by the log.
pub struct CompensationLog<Ctx, S> {
    store: S,
    next_mark: Mark,
    compensators: IndexMap<String, Box<dyn ErasedCompensator<Ctx>>>,
}

impl<Ctx> CompensationLog<Ctx, MemoryCompensationStore> {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            store: MemoryCompensationStore::new(),
            next_mark: Mark::ZERO,
            compensators: IndexMap::new(),
        }
    }
}

impl<Ctx, S> CompensationLog<Ctx, S>
where
    S: CompensationStore,
{
    /// Open a log over `store`, continuing its mark sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the store's high-water mark cannot be read.
    pub fn open(store: S) -> StoreResult<Self> {
        let next_mark = store.high_water()?;
        Ok(Self {
            store,
            next_mark,
            compensators: IndexMap::new(),
        })
    }

    /// The mark the next appended record will receive.
    #[must_use]
    pub fn mark(&self) -> Mark {
        self.next_mark
    }

    /// # Errors
    ///
    /// Returns an error if the record cannot be persisted.
    pub fn append(&mut self, compensator_name: &str, payload: Value) -> StoreResult<Mark> {
        CompensationWriter::append(self, CompensationRecord::new(compensator_name, payload))
    }

    /// Register a typed compensator. Last registration under a name wins.
    pub fn register_compensator<C>(&mut self, name: impl Into<String>, compensator: C)
    where
        C: Compensator<Context = Ctx> + 'static,
    {
        let name = name.into();
        let wrapper = CompensatorWrapper::new(name.clone(), compensator);
        self.insert(name, Box::new(wrapper));
    }

    /// Register a closure over the decoded payload as a compensator. The
    /// closure receives the rewind mode like a typed compensator does.
    pub fn register_fn<F, P>(&mut self, name: impl Into<String>, compensate: F)
    where
        F: Fn(&Ctx, P, RewindMode) -> Result<(), BoxError> + Send + Sync + 'static,
        P: DeserializeOwned + 'static,
    {
        let name = name.into();
        let compensator = FnCompensator::new(name.clone(), compensate);
        self.insert(name, Box::new(compensator));
    }

    fn insert(&mut self, name: String, compensator: Box<dyn ErasedCompensator<Ctx>>) {
        if self.compensators.insert(name.clone(), compensator).is_some() {
            debug!(compensator = %name, "replaced compensator");
        }
    }

    pub fn unregister_compensator(&mut self, name: &str) -> bool {
        self.compensators.shift_remove(name).is_some()
    }

    #[must_use]
    pub fn has_compensator(&self, name: &str) -> bool {
        self.compensators.contains_key(name)
    }

    /// Registered compensator names in registration order.
    pub fn compensator_names(&self) -> impl Iterator<Item = &str> {
        self.compensators.keys().map(String::as_str)
    }

    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn len(&self) -> StoreResult<usize> {
        self.store.len()
    }

    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn is_empty(&self) -> StoreResult<bool> {
        self.store.is_empty()
    }

    /// Records currently held, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn entries(&self) -> StoreResult<Vec<LoggedCompensation>> {
        self.store.entries_from(Mark::ZERO)
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Compensate every record appended at or after `mark`, newest first,
    /// then discard them.
    ///
    /// # Errors
    ///
    /// Returns an error if a compensator is missing, cannot decode its
    /// payload or fails, or if the store fails. The log is then partially
    /// rewound and must be treated as inconsistent.
    pub fn rewind_to(
        &mut self,
        ctx: &Ctx,
        mark: Mark,
        mode: RewindMode,
    ) -> Result<(), CompensationError> {
        let (result, _audit) = self.rewind_to_with_audit(ctx, mark, mode);
        result
    }

    /// Rewind and return both the result and an audit of every record.
    pub fn rewind_to_with_audit(
        &mut self,
        ctx: &Ctx,
        mark: Mark,
        mode: RewindMode,
    ) -> (Result<(), CompensationError>, RewindAudit) {
        let mut audit = RewindAudit::new(mark, mode);
        let result = self.rewind_internal(ctx, mark, mode, &mut audit);
        if let Err(error) = &result {
            error!(
                target_mark = %mark,
                ?mode,
                %error,
                audit = %audit.summary(),
                "compensation log rewind failed"
            );
        }
        (result, audit)
    }

    fn rewind_internal(
        &mut self,
        ctx: &Ctx,
        mark: Mark,
        mode: RewindMode,
        audit: &mut RewindAudit,
    ) -> Result<(), CompensationError> {
        let entries = self.store.entries_from(mark)?;
        debug!(
            target_mark = %mark,
            ?mode,
            count = entries.len(),
            "rewinding compensation log"
        );

        for (position, entry) in entries.iter().enumerate().rev() {
            let outcome = match self.compensators.get(entry.compensator_name()) {
                Some(compensator) => compensator
                    .compensate_erased(ctx, entry, mode)
                    .map(|()| compensator.compensation_description())
                    .map_err(|error| (error, Some(compensator.compensation_description()))),
                None => Err((
                    CompensationError::UnknownCompensator {
                        name: entry.compensator_name().to_string(),
                        mark: entry.mark,
                    },
                    None,
                )),
            };

            match outcome {
                Ok(description) => {
                    trace!(
                        mark = %entry.mark,
                        compensator = entry.compensator_name(),
                        "compensated record"
                    );
                    audit.record_compensated(entry, description);
                }
                Err((error, description)) => {
                    audit.record_failure(entry, description);
                    for older in entries[..position].iter().rev() {
                        audit.record_skipped(older);
                    }
                    if let Err(discard_error) = self.store.discard_from(entry.mark.next()) {
                        warn!(
                            %discard_error,
                            "failed to discard compensated records after compensation failure"
                        );
                    }
                    return Err(error);
                }
            }
        }

        self.store.discard_from(mark)?;
        Ok(())
    }
}

impl<Ctx, S> CompensationWriter for CompensationLog<Ctx, S>
where
    S: CompensationStore,
{
    fn mark(&self) -> Mark {
        self.next_mark
    }

    fn append(&mut self, record: CompensationRecord) -> StoreResult<Mark> {
        let mark = self.next_mark;
        if mark.next() == mark {
            return Err(StoreError::Corrupt("compensation marks exhausted".to_string()));
        }
        trace!(%mark, compensator = %record.compensator_name, "appending compensation record");
        self.store.append(LoggedCompensation::new(mark, record))?;
        self.next_mark = mark.next();
        Ok(mark)
    }
}
