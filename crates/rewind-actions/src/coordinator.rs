use std::fs;
use std::sync::Arc;

use indexmap::IndexMap;
use rewind_core::{Action, ActionEntry, BoxError, COMPOSITE_TYPE, Mark, StoreError};
use rewind_log::{
    CompensationLog, CompensationStore, Compensator, JsonFileCompensationStore,
    MemoryCompensationStore, RewindMode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::applier::{ApplierRegistry, ApplyScope, Applier};
use crate::callbacks::{ActionCallbacks, CallbackRegistry};
use crate::composite::CompositeApplier;
use crate::config::StorageConfig;
use crate::error::{ActionError, Result};
use crate::notify::{Notification, Observers, SubscriptionId};
use crate::providers::{JsonFileActionStore, MemoryActionStore};
use crate::traits::ActionStore;

pub type MemoryCoordinator<Ctx> = Coordinator<Ctx, MemoryActionStore, MemoryCompensationStore>;
pub type FileCoordinator<Ctx> = Coordinator<Ctx, JsonFileActionStore, JsonFileCompensationStore>;

/// Whether an apply is fresh forward progress or the replay of an undone
/// action. Only fresh progress invalidates redo history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApplyOrigin {
    Fresh,
    Redo,
}

/// Orchestrates atomic apply, validation, undo and redo of actions.
///
/// The coordinator owns the domain context `Ctx` (the state owners), the
/// applier registry, the action store and the compensation log. Every
/// operation that changes history takes `&mut self`, so calls can never
/// interleave.
pub struct Coordinator<Ctx, A, C> {
    ctx: Ctx,
    appliers: ApplierRegistry<Ctx>,
    actions: A,
    log: CompensationLog<Ctx, C>,
    observers: Observers,
    callbacks: CallbackRegistry,
}

impl<Ctx> Coordinator<Ctx, MemoryActionStore, MemoryCompensationStore> {
    #[must_use]
    pub fn in_memory(ctx: Ctx) -> Self {
        Self::with_log(ctx, MemoryActionStore::new(), CompensationLog::in_memory())
    }
}

impl<Ctx> Coordinator<Ctx, JsonFileActionStore, JsonFileCompensationStore> {
    /// Open a coordinator over the JSON-file stores described by `config`,
    /// creating the storage directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or either store
    /// cannot be opened.
    pub fn open_files(ctx: Ctx, config: &StorageConfig) -> Result<Self> {
        fs::create_dir_all(config.directory()).map_err(|source| StoreError::Write {
            path: config.directory().to_path_buf(),
            source,
        })?;
        let actions = JsonFileActionStore::open(config.actions_path(), config.pretty())?;
        let compensations =
            JsonFileCompensationStore::open(config.compensations_path(), config.pretty())?;
        Self::new(ctx, actions, compensations)
    }
}

impl<Ctx, A, C> Coordinator<Ctx, A, C>
where
    A: ActionStore,
    C: CompensationStore,
{
    /// # Errors
    ///
    /// Returns an error if the stores cannot be read or disagree about marks.
    pub fn new(ctx: Ctx, actions: A, compensations: C) -> Result<Self> {
        let log = CompensationLog::open(compensations)?;
        if let Some(last) = actions
            .applied_len()?
            .checked_sub(1)
            .map(|index| actions.applied_at(index))
            .transpose()?
            .flatten()
        {
            if last.mark > log.mark() {
                return Err(StoreError::Corrupt(format!(
                    "applied action '{}' refers to mark {} beyond the compensation log ({})",
                    last.action.display_name(),
                    last.mark,
                    log.mark()
                ))
                .into());
            }
        }
        Ok(Self::with_log(ctx, actions, log))
    }

    fn with_log(ctx: Ctx, actions: A, log: CompensationLog<Ctx, C>) -> Self {
        let mut appliers: ApplierRegistry<Ctx> = IndexMap::new();
        appliers.insert(COMPOSITE_TYPE.to_string(), Arc::new(CompositeApplier));
        Self {
            ctx,
            appliers,
            actions,
            log,
            observers: Observers::default(),
            callbacks: CallbackRegistry::default(),
        }
    }

    // Registration

    /// Install the applier for `kind`. Last registration wins.
    pub fn register_applier(&mut self, kind: impl Into<String>, applier: impl Applier<Ctx> + 'static) {
        let kind = kind.into();
        if self.appliers.insert(kind.clone(), Arc::new(applier)).is_some() {
            debug!(action_type = %kind, "replaced applier");
        }
    }

    /// Install a closure as the applier for `kind`.
    pub fn register_applier_fn<F>(&mut self, kind: impl Into<String>, applier: F)
    where
        F: Fn(&mut ApplyScope<'_, Ctx>, &Action) -> Result<Value> + Send + Sync + 'static,
    {
        self.register_applier(kind, applier);
    }

    pub fn unregister_applier(&mut self, kind: &str) -> bool {
        self.appliers.shift_remove(kind).is_some()
    }

    #[must_use]
    pub fn has_applier(&self, kind: &str) -> bool {
        self.appliers.contains_key(kind)
    }

    /// Registered action types in registration order, starting with the
    /// built-in composite.
    pub fn applier_types(&self) -> impl Iterator<Item = &str> {
        self.appliers.keys().map(String::as_str)
    }

    pub fn register_compensator<K>(&mut self, name: impl Into<String>, compensator: K)
    where
        K: Compensator<Context = Ctx> + 'static,
    {
        self.log.register_compensator(name, compensator);
    }

    /// Register a closure compensator. It receives the decoded payload and
    /// the rewind mode, so it can tell a history discard from an undo.
    pub fn register_compensator_fn<F, P>(&mut self, name: impl Into<String>, compensate: F)
    where
        F: Fn(&Ctx, P, RewindMode) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
        P: DeserializeOwned + 'static,
    {
        self.log.register_fn(name, compensate);
    }

    pub fn unregister_compensator(&mut self, name: &str) -> bool {
        self.log.unregister_compensator(name)
    }

    /// Observe every completed operation. Observers run in subscription
    /// order after the operation's state changes are stored.
    pub fn subscribe(
        &mut self,
        observer: impl Fn(&Notification<'_>) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe(Box::new(observer))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.observers.len()
    }

    // Queries

    #[must_use]
    pub fn context(&self) -> &Ctx {
        &self.ctx
    }

    #[must_use]
    pub fn compensation_log(&self) -> &CompensationLog<Ctx, C> {
        &self.log
    }

    #[must_use]
    pub fn action_store(&self) -> &A {
        &self.actions
    }

    /// # Errors
    ///
    /// Returns an error if the action store cannot be read.
    pub fn applied_count(&self) -> Result<usize> {
        Ok(self.actions.applied_len()?)
    }

    /// # Errors
    ///
    /// Returns an error if the action store cannot be read.
    pub fn undone_count(&self) -> Result<usize> {
        Ok(self.actions.undone_len()?)
    }

    /// # Errors
    ///
    /// Returns an error if the action store cannot be read.
    pub fn applied_at(&self, index: usize) -> Result<Option<ActionEntry>> {
        Ok(self.actions.applied_at(index)?)
    }

    /// # Errors
    ///
    /// Returns an error if the action store cannot be read.
    pub fn undone_at(&self, index: usize) -> Result<Option<Action>> {
        Ok(self.actions.undone_at(index)?)
    }

    // Operations

    /// Check whether `action` would apply, without changing anything.
    ///
    /// Returns the error the applier raised, or `None` if the action is
    /// valid. Never fails itself.
    #[must_use]
    pub fn validate(&self, action: &Action) -> Option<ActionError> {
        let mut scope = ApplyScope::validating(&self.ctx, &self.appliers);
        match scope.dispatch(action) {
            Ok(_) => None,
            Err(error) => {
                debug!(
                    action_type = %action.kind,
                    action = action.display_name(),
                    %error,
                    "action failed validation"
                );
                Some(error)
            }
        }
    }

    /// Apply `action` atomically and return the applier's result.
    ///
    /// On success the action is recorded as applied and the redo history is
    /// cleared. On failure every compensation recorded during the attempt is
    /// rewound and the applier's error is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns the applier's error, or [`ActionError::RollbackFailed`] if
    /// rewinding after the failure also failed.
    pub fn apply(&mut self, action: Action) -> Result<Value> {
        self.apply_internal(action, ApplyOrigin::Fresh)
    }

    /// Apply `action` with transient callbacks attached to it.
    ///
    /// The callbacks stay attached while an equal action is held in the
    /// applied or undone list.
    ///
    /// # Errors
    ///
    /// Same as [`Coordinator::apply`]. On failure the new callbacks are
    /// dropped and any callbacks already attached to an equal action are
    /// kept.
    pub fn apply_with_callbacks(
        &mut self,
        action: Action,
        callbacks: ActionCallbacks,
    ) -> Result<Value> {
        let previous = self.callbacks.attach(&action, callbacks);
        let attached_to = action.clone();
        let result = self.apply(action);
        if result.is_err() {
            self.callbacks.detach(&attached_to);
            if let Some(previous) = previous {
                self.callbacks.attach(&attached_to, previous);
            }
        }
        result
    }

    /// Undo the last `count` applied actions (fewer if fewer are applied).
    ///
    /// Returns how many actions were undone; 0 means there was nothing to
    /// undo.
    ///
    /// # Errors
    ///
    /// Returns an error if the stores fail or a compensator fails. A
    /// compensation failure is fatal: the history no longer matches state.
    pub fn undo_last(&mut self, count: usize) -> Result<usize> {
        let len = self.actions.applied_len()?;
        let n = count.min(len);
        if n == 0 {
            debug!(requested = count, "nothing to undo");
            return Ok(0);
        }
        let cut = len - n;
        let oldest = self.applied_entry(cut)?;

        debug!(
            count = n,
            target_mark = %oldest.mark,
            "undoing applied actions"
        );
        self.log
            .rewind_to(&self.ctx, oldest.mark, RewindMode::Undo)?;

        for index in (cut..len).rev() {
            let entry = self.applied_entry(index)?;
            self.actions.truncate_applied(index)?;
            self.actions.push_undone(entry.action.clone())?;
            self.callbacks.undone(&entry.action);
        }

        self.observers.notify(&Notification::Undone {
            action: &oldest.action,
            count: n,
        });
        Ok(n)
    }

    /// Redo the last `count` undone actions (fewer if fewer are undone),
    /// most recently undone first.
    ///
    /// Returns how many actions were redone; 0 means there was nothing to
    /// redo. If re-applying an action fails it is rolled back and returned
    /// to the undone list; actions redone before it stay applied.
    ///
    /// # Errors
    ///
    /// Returns the error of the action that failed to re-apply.
    pub fn redo_last(&mut self, count: usize) -> Result<usize> {
        let len = self.actions.undone_len()?;
        let n = count.min(len);
        if n == 0 {
            debug!(requested = count, "nothing to redo");
            return Ok(0);
        }
        let cut = len - n;
        debug!(count = n, "redoing undone actions");

        let mut last = None;
        for index in (cut..len).rev() {
            let action = self.undone_action(index)?;
            self.actions.truncate_undone(index)?;
            match self.apply_internal(action.clone(), ApplyOrigin::Redo) {
                Ok(result) => last = Some((action, result)),
                Err(error) => {
                    if let Err(store_error) = self.actions.push_undone(action) {
                        warn!(%store_error, "failed to return action to the undone list");
                    }
                    return Err(error);
                }
            }
        }

        if let Some((action, result)) = &last {
            self.observers.notify(&Notification::Redone {
                action,
                result,
                count: n,
            });
        }
        Ok(n)
    }

    /// Irreversibly forget every applied action.
    ///
    /// The compensation log is first rewound with [`RewindMode::Permanent`]
    /// to the mark of the oldest applied action. Compensators see that mode
    /// and finalize their records instead of reverting state, so the
    /// current state is kept. Returns how many actions were forgotten.
    ///
    /// # Errors
    ///
    /// Returns an error if the stores fail or a compensator fails.
    pub fn clear_applied(&mut self) -> Result<usize> {
        let len = self.actions.applied_len()?;
        if len == 0 {
            return Ok(0);
        }
        let oldest = self.applied_entry(0)?;

        debug!(count = len, target_mark = %oldest.mark, "clearing applied actions");
        self.log
            .rewind_to(&self.ctx, oldest.mark, RewindMode::Permanent)?;
        self.actions.truncate_applied(0)?;
        self.prune_callbacks_after_commit();

        self.observers
            .notify(&Notification::AppliedCleared { count: len });
        Ok(len)
    }

    /// Irreversibly forget every undone action. Returns how many were
    /// forgotten.
    ///
    /// # Errors
    ///
    /// Returns an error if the action store fails.
    pub fn clear_undone(&mut self) -> Result<usize> {
        let len = self.actions.undone_len()?;
        if len == 0 {
            return Ok(0);
        }

        debug!(count = len, "clearing undone actions");
        self.actions.truncate_undone(0)?;
        self.prune_callbacks_after_commit();

        self.observers
            .notify(&Notification::UndoneCleared { count: len });
        Ok(len)
    }

    fn apply_internal(&mut self, action: Action, origin: ApplyOrigin) -> Result<Value> {
        let checkpoint = self.log.mark();
        debug!(
            action_type = %action.kind,
            action = action.display_name(),
            checkpoint = %checkpoint,
            ?origin,
            "applying action"
        );

        let outcome = self.run_applier(&action).and_then(|result| {
            self.record_applied(checkpoint, &action, origin)
                .map(|cleared_redo| (result, cleared_redo))
        });

        match outcome {
            Ok((result, cleared_redo)) => {
                if cleared_redo {
                    self.prune_callbacks_after_commit();
                }
                self.observers.notify(&Notification::Applied {
                    action: &action,
                    result: &result,
                });
                self.callbacks.applied(&action, &result);
                Ok(result)
            }
            Err(error) => Err(self.roll_back(checkpoint, &action, error)),
        }
    }

    fn run_applier(&mut self, action: &Action) -> Result<Value> {
        let mut scope = ApplyScope::applying(&self.ctx, &self.appliers, &mut self.log);
        scope.dispatch(action)
    }

    /// Store the applied entry and, for fresh progress, drop redo history.
    /// Returns whether redo history was dropped. On error nothing is stored.
    fn record_applied(
        &mut self,
        checkpoint: Mark,
        action: &Action,
        origin: ApplyOrigin,
    ) -> Result<bool> {
        let applied_len = self.actions.applied_len()?;
        self.actions
            .push_applied(ActionEntry::new(checkpoint, action.clone()))?;

        if origin == ApplyOrigin::Redo {
            return Ok(false);
        }
        let cleared = self
            .actions
            .undone_len()
            .and_then(|undone| match undone {
                0 => Ok(false),
                _ => self.actions.truncate_undone(0).map(|()| true),
            });
        match cleared {
            Ok(cleared) => Ok(cleared),
            Err(error) => {
                if let Err(store_error) = self.actions.truncate_applied(applied_len) {
                    warn!(%store_error, "failed to drop applied entry after store failure");
                }
                Err(error.into())
            }
        }
    }

    /// Pruning runs once the apply has committed; a failure only leaves
    /// stale callbacks behind, so it is logged rather than returned.
    fn prune_callbacks_after_commit(&mut self) {
        if let Err(error) = self.prune_callbacks() {
            warn!(%error, "failed to prune action callbacks");
        }
    }

    fn roll_back(&mut self, checkpoint: Mark, action: &Action, cause: ActionError) -> ActionError {
        if self.log.mark() == checkpoint {
            debug!(
                action = action.display_name(),
                %cause,
                "action failed before recording any compensation"
            );
            return cause;
        }

        warn!(
            action = action.display_name(),
            checkpoint = %checkpoint,
            %cause,
            "rolling back failed action"
        );
        match self
            .log
            .rewind_to(&self.ctx, checkpoint, RewindMode::Undo)
        {
            Ok(()) => cause,
            Err(compensation) => ActionError::RollbackFailed {
                action: action.display_name().to_string(),
                cause: Box::new(cause),
                compensation,
            },
        }
    }

    fn applied_entry(&self, index: usize) -> Result<ActionEntry> {
        self.actions.applied_at(index)?.ok_or_else(|| {
            StoreError::Corrupt(format!("applied action {index} is missing")).into()
        })
    }

    fn undone_action(&self, index: usize) -> Result<Action> {
        self.actions.undone_at(index)?.ok_or_else(|| {
            StoreError::Corrupt(format!("undone action {index} is missing")).into()
        })
    }

    fn prune_callbacks(&mut self) -> Result<()> {
        if self.callbacks.is_empty() {
            return Ok(());
        }
        let mut live = Vec::new();
        for index in 0..self.actions.applied_len()? {
            live.push(self.applied_entry(index)?.action);
        }
        for index in 0..self.actions.undone_len()? {
            live.push(self.undone_action(index)?);
        }
        self.callbacks.retain_live(&live);
        debug!(remaining = self.callbacks.len(), "pruned action callbacks");
        Ok(())
    }
}
