use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use rewind_core::{Action, BoxError};
use rewind_log::{CompensationStore, Compensator, RewindMode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::applier::{ApplyScope, Applier, decode_param};
use crate::coordinator::{Coordinator, MemoryCoordinator};
use crate::error::{ActionError, Result};
use crate::traits::ActionStore;

pub(crate) const RESTORE_REGISTER: &str = "restore-register";
pub(crate) const FAIL_AFTER_WRITE: &str = "FailAfterWrite";

/// Named integer registers, the simplest possible state owner.
#[derive(Debug, Default)]
pub(crate) struct Registers {
    values: RefCell<BTreeMap<String, i64>>,
    permanent_restores: Cell<usize>,
}

impl Registers {
    pub(crate) fn get(&self, register: &str) -> Option<i64> {
        self.values.borrow().get(register).copied()
    }

    fn put(&self, register: &str, value: Option<i64>) -> Option<i64> {
        let mut values = self.values.borrow_mut();
        match value {
            Some(value) => values.insert(register.to_string(), value),
            None => values.remove(register),
        }
    }

    pub(crate) fn permanent_restores(&self) -> usize {
        self.permanent_restores.get()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RegisterRestore {
    register: String,
    prior: Option<i64>,
}

fn write_register(
    scope: &mut ApplyScope<'_, Registers>,
    register: &str,
    value: i64,
) -> Result<Option<i64>> {
    let registers = scope.context();
    let prior = registers.get(register);
    scope.record(
        RESTORE_REGISTER,
        &RegisterRestore {
            register: register.to_string(),
            prior,
        },
    )?;
    registers.put(register, Some(value));
    Ok(prior)
}

/// Sets one register to the action's non-negative `value` and returns the
/// prior value.
struct SetRegister {
    register: &'static str,
}

impl Applier<Registers> for SetRegister {
    fn apply(&self, scope: &mut ApplyScope<'_, Registers>, action: &Action) -> Result<Value> {
        let value: i64 = decode_param(action, "value")?;
        if value < 0 {
            return Err(ActionError::rejected(action, "register values are non-negative"));
        }
        if scope.is_validate_only() {
            return Ok(Value::Null);
        }
        let prior = write_register(scope, self.register, value)?;
        Ok(json!(prior))
    }
}

/// Writes register `a` and then fails.
struct FailAfterWrite;

impl Applier<Registers> for FailAfterWrite {
    fn apply(&self, scope: &mut ApplyScope<'_, Registers>, action: &Action) -> Result<Value> {
        if !scope.is_validate_only() {
            let value: i64 = decode_param(action, "value")?;
            write_register(scope, "a", value)?;
        }
        Err(ActionError::rejected(action, "fails after writing"))
    }
}

struct RestoreRegister;

impl Compensator for RestoreRegister {
    type Context = Registers;
    type Payload = RegisterRestore;

    fn compensate(
        &self,
        ctx: &Registers,
        payload: RegisterRestore,
        mode: RewindMode,
    ) -> std::result::Result<(), BoxError> {
        if mode.is_permanent() {
            ctx.permanent_restores.set(ctx.permanent_restores.get() + 1);
            return Ok(());
        }
        ctx.put(&payload.register, payload.prior);
        Ok(())
    }
}

pub(crate) fn set_a(value: i64) -> Action {
    Action::new("A", "").with_param("value", value)
}

pub(crate) fn set_b(value: i64) -> Action {
    Action::new("B", "").with_param("value", value)
}

pub(crate) fn install_registers<A, C>(coordinator: &mut Coordinator<Registers, A, C>)
where
    A: ActionStore,
    C: CompensationStore,
{
    coordinator.register_applier("A", SetRegister { register: "a" });
    coordinator.register_applier("B", SetRegister { register: "b" });
    coordinator.register_applier(FAIL_AFTER_WRITE, FailAfterWrite);
    coordinator.register_compensator(RESTORE_REGISTER, RestoreRegister);
}

pub(crate) fn registers_coordinator() -> MemoryCoordinator<Registers> {
    let mut coordinator = MemoryCoordinator::in_memory(Registers::default());
    install_registers(&mut coordinator);
    coordinator
}
