//! Integration tests for atomic apply and side-effect-free validation.

use std::cell::RefCell;

use rewind_actions::{
    Action, ActionError, ApplyScope, Applier, MemoryCoordinator, Result as ActionResult,
    decode_param,
};
use serde_json::Value;

/// An ordered list of strings; the state owner for these tests.
#[derive(Default)]
struct Playlist {
    tracks: RefCell<Vec<String>>,
}

impl Playlist {
    fn tracks(&self) -> Vec<String> {
        self.tracks.borrow().clone()
    }
}

struct AppendTrack;

impl Applier<Playlist> for AppendTrack {
    fn apply(&self, scope: &mut ApplyScope<'_, Playlist>, action: &Action) -> ActionResult<Value> {
        let title: String = decode_param(action, "title")?;
        if title.trim().is_empty() {
            return Err(ActionError::rejected(action, "title must not be blank"));
        }
        let playlist = scope.context();
        if playlist.tracks.borrow().contains(&title) {
            return Err(ActionError::rejected(action, format!("'{title}' is already listed")));
        }
        if scope.is_validate_only() {
            return Ok(Value::Null);
        }
        scope.record("remove-last-track", &title)?;
        playlist.tracks.borrow_mut().push(title);
        Ok(Value::from(playlist.tracks.borrow().len()))
    }
}

fn append(title: &str) -> Action {
    Action::new("Append", format!("append {title}")).with_param("title", title)
}

fn coordinator() -> MemoryCoordinator<Playlist> {
    let mut coordinator = MemoryCoordinator::in_memory(Playlist::default());
    coordinator.register_applier("Append", AppendTrack);
    coordinator.register_compensator_fn(
        "remove-last-track",
        |playlist: &Playlist, title: String, _| {
            let mut tracks = playlist.tracks.borrow_mut();
            match tracks.last() {
                Some(last) if *last == title => {
                    tracks.pop();
                    Ok(())
                }
                _ => Err(format!("'{title}' is not the last track").into()),
            }
        },
    );
    coordinator
}

#[test]
fn composite_failure_leaves_state_untouched() -> anyhow::Result<()> {
    let mut coordinator = coordinator();
    coordinator.apply(append("intro"))?;
    let mark_before = coordinator.compensation_log().mark();

    let result = coordinator.apply(Action::composite(
        "album",
        vec![append("one"), append("two"), append("intro")],
    ));

    assert!(matches!(result, Err(ActionError::Rejected { .. })));
    assert_eq!(coordinator.context().tracks(), vec!["intro"]);
    assert_eq!(coordinator.applied_count()?, 1);
    assert_eq!(coordinator.compensation_log().len()?, 1);
    assert!(coordinator.compensation_log().mark() > mark_before);
    Ok(())
}

#[test]
fn composite_inside_composite_is_atomic_as_a_whole() -> anyhow::Result<()> {
    let mut coordinator = coordinator();

    let result = coordinator.apply(Action::composite(
        "outer",
        vec![
            append("a"),
            Action::composite("inner", vec![append("b"), append(" ")]),
        ],
    ));

    assert!(result.is_err());
    assert!(coordinator.context().tracks().is_empty());
    Ok(())
}

#[test]
fn validate_is_repeatable_and_pure() -> anyhow::Result<()> {
    let mut coordinator = coordinator();
    coordinator.apply(append("intro"))?;
    let mark = coordinator.compensation_log().mark();
    let duplicate = Action::composite("dup", vec![append("fresh"), append("intro")]);

    let first = coordinator.validate(&duplicate).map(|e| e.to_string());
    let second = coordinator.validate(&duplicate).map(|e| e.to_string());

    assert!(first.is_some());
    assert_eq!(first, second);
    assert!(coordinator.validate(&append("fresh")).is_none());
    assert_eq!(coordinator.context().tracks(), vec!["intro"]);
    assert_eq!(coordinator.compensation_log().mark(), mark);
    assert_eq!(coordinator.applied_count()?, 1);
    assert_eq!(coordinator.undone_count()?, 0);
    Ok(())
}

#[test]
fn validate_reports_unknown_type_and_missing_params() {
    let coordinator = coordinator();

    assert!(matches!(
        coordinator.validate(&Action::new("Shuffle", "")),
        Some(ActionError::UnknownActionType(_))
    ));
    assert!(matches!(
        coordinator.validate(&Action::new("Append", "no title")),
        Some(ActionError::Rejected { .. })
    ));
}

#[test]
fn rollback_failure_surfaces_both_errors() -> anyhow::Result<()> {
    let mut coordinator = coordinator();
    coordinator.register_applier_fn("Sneaky", |scope, action| {
        scope.record("remove-last-track", &"never appended")?;
        Err(ActionError::rejected(action, "gave up"))
    });

    let result = coordinator.apply(Action::new("Sneaky", "sneaky"));

    match result {
        Err(ActionError::RollbackFailed {
            action,
            cause,
            compensation,
        }) => {
            assert_eq!(action, "sneaky");
            assert!(matches!(*cause, ActionError::Rejected { .. }));
            assert!(compensation.to_string().contains("remove-last-track"));
        }
        other => panic!("expected a rollback failure, got {other:?}"),
    }
    Ok(())
}

#[test]
fn applier_result_is_returned_to_caller() -> anyhow::Result<()> {
    let mut coordinator = coordinator();

    assert_eq!(coordinator.apply(append("a"))?, Value::from(1));
    assert_eq!(coordinator.apply(append("b"))?, Value::from(2));
    assert_eq!(
        coordinator.apply(Action::composite("more", vec![append("c"), append("d")]))?,
        serde_json::json!([3, 4])
    );
    Ok(())
}
