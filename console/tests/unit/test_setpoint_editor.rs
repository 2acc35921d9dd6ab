//! Setpoint editor tests

use std::sync::Arc;

use bioconsole::errors::{ConsoleError, ErrorKind};
use bioconsole::events::log::{EntryKind, EventLog};
use bioconsole::setpoint::editor::{SetpointEditor, SubmitOutcome};
use bioconsole::setpoint::state::{
    Awaiting, DisplayedSetpoint, ParameterEntry, PendingClearPolicy, SetpointState,
};
use bioconsole::status::feed::{SnapshotObserver, StatusFeed};
use http::StatusCode;
use serde_json::json;

use crate::common::{kinds, messages, snapshot, FakePlant, Reply, WriteReply};

fn wired(policy: PendingClearPolicy) -> (Arc<StatusFeed>, Arc<SetpointEditor>) {
    let feed = Arc::new(StatusFeed::new());
    let editor = Arc::new(SetpointEditor::new(policy));
    feed.add_observer(editor.clone());
    (feed, editor)
}

#[test]
fn test_pending_edit_wins_over_polls() {
    let editor = SetpointEditor::default();
    editor.observe_snapshot(&snapshot(&[("DO", 40.0, 50.0)]));
    editor.edit("DO", "52");

    for sp in [50.0, 51.0, 49.5] {
        editor.observe_snapshot(&snapshot(&[("DO", 40.0, sp)]));
        assert_eq!(
            editor.displayed_setpoint("DO"),
            Some(DisplayedSetpoint::Pending("52".to_string()))
        );
    }
    assert_eq!(editor.confirmed("DO"), Some(49.5));
}

#[test]
fn test_unedited_parameter_follows_polls() {
    let editor = SetpointEditor::default();
    editor.observe_snapshot(&snapshot(&[("Temp", 36.9, 37.0)]));
    assert_eq!(
        editor.displayed_setpoint("Temp"),
        Some(DisplayedSetpoint::Confirmed(37.0))
    );

    editor.observe_snapshot(&snapshot(&[("Temp", 37.1, 37.5)]));
    assert_eq!(
        editor.displayed_setpoint("Temp"),
        Some(DisplayedSetpoint::Confirmed(37.5))
    );
}

#[test]
fn test_revert_restores_confirmed() {
    let editor = SetpointEditor::default();
    editor.observe_snapshot(&snapshot(&[("pH", 7.0, 7.2)]));
    editor.edit("pH", "6.8");

    assert!(editor.revert("pH"));
    assert_eq!(editor.pending("pH"), None);
    assert_eq!(
        editor.displayed_setpoint("pH"),
        Some(DisplayedSetpoint::Confirmed(7.2))
    );
    assert!(!editor.revert("pH"));
}

#[test]
fn test_parameter_leaving_snapshot_is_dropped_unless_edited() {
    let editor = SetpointEditor::default();
    editor.observe_snapshot(&snapshot(&[("DO", 40.0, 50.0), ("Temp", 37.0, 37.0)]));
    editor.edit("DO", "55");

    editor.observe_snapshot(&snapshot(&[]));

    assert!(editor.view("Temp").is_none());
    let view = editor.view("DO").unwrap();
    assert_eq!(view.confirmed, None);
    assert_eq!(view.process_value, None);
    assert_eq!(view.displayed, Some(DisplayedSetpoint::Pending("55".to_string())));
}

#[test]
fn test_deviation_uses_displayed_setpoint() {
    let editor = SetpointEditor::default();
    editor.observe_snapshot(&snapshot(&[("DO", 40.0, 50.0)]));
    assert!(editor.is_deviating("DO"));

    editor.edit("DO", "41");
    assert!(!editor.is_deviating("DO"));

    // Unparseable pending text gives no flag
    editor.edit("DO", "abc");
    assert!(!editor.is_deviating("DO"));
    assert!(!editor.view("DO").unwrap().deviating);
}

#[test]
fn test_deviation_boundary_is_strict() {
    let editor = SetpointEditor::default();
    editor.observe_snapshot(&snapshot(&[("Temp", 52.5, 50.0)]));
    assert!(!editor.is_deviating("Temp"));

    editor.observe_snapshot(&snapshot(&[("Temp", 47.0, 50.0)]));
    assert!(editor.is_deviating("Temp"));
}

#[test]
fn test_views_are_sorted_by_name() {
    let editor = SetpointEditor::default();
    editor.observe_snapshot(&snapshot(&[
        ("pH", 7.0, 7.0),
        ("Agit", 300.0, 300.0),
        ("DO", 40.0, 40.0),
    ]));
    let names: Vec<_> = editor.views().into_iter().map(|v| v.name).collect();
    assert_eq!(names, vec!["Agit", "DO", "pH"]);
}

#[tokio::test]
async fn test_submit_writes_and_logs_success() {
    let plant = FakePlant::new();
    let events = EventLog::new();
    let editor = SetpointEditor::new(PendingClearPolicy::ClearOnEcho);
    editor.observe_snapshot(&snapshot(&[("DO", 40.0, 50.0)]));
    editor.edit("DO", "52");

    let outcome = editor.submit("DO", &plant, &events).await.unwrap();

    assert_eq!(
        outcome,
        SubmitOutcome::Written {
            requested: 52.0,
            echoed: json!(52.0)
        }
    );
    assert_eq!(plant.calls(), vec!["write DO=52"]);
    assert_eq!(kinds(&events), vec![EntryKind::Success]);
    assert_eq!(messages(&events), vec!["Successfully set DO: 52"]);
    assert_eq!(editor.pending("DO"), None);
    assert_eq!(editor.confirmed("DO"), Some(52.0));
}

#[tokio::test]
async fn test_invalid_setpoint_is_not_sent() {
    let plant = FakePlant::new();
    let events = EventLog::new();
    let editor = SetpointEditor::default();
    editor.observe_snapshot(&snapshot(&[("pH", 7.0, 7.2)]));
    editor.edit("pH", "abc");

    let err = editor.submit("pH", &plant, &events).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(plant.call_count("write"), 0);
    assert_eq!(kinds(&events), vec![EntryKind::Error]);
    assert_eq!(messages(&events), vec![r#"Invalid setpoint for pH: "abc""#]);
    assert_eq!(editor.pending("pH").as_deref(), Some("abc"));
}

#[tokio::test]
async fn test_failed_write_keeps_pending() {
    let plant = FakePlant::new();
    plant.set_write(WriteReply::Fixed(Reply::NetworkDown));
    let events = EventLog::new();
    let editor = SetpointEditor::default();
    editor.observe_snapshot(&snapshot(&[("Temp", 36.9, 37.0)]));
    editor.edit("Temp", "38");

    let err = editor.submit("Temp", &plant, &events).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Network);
    let entries = events.snapshot();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, EntryKind::Error);
    assert!(entries[0].message.starts_with("Failed to set Temp: "));
    assert_eq!(editor.pending("Temp").as_deref(), Some("38"));
    assert_eq!(editor.confirmed("Temp"), Some(37.0));
}

#[tokio::test]
async fn test_rejected_write_logs_backend_detail() {
    let plant = FakePlant::new();
    plant.set_write(WriteReply::Fixed(Reply::Reject(
        StatusCode::UNPROCESSABLE_ENTITY,
        Some(json!("Setpoint out of range")),
    )));
    let events = EventLog::new();
    let editor = SetpointEditor::default();
    editor.edit("Agit", "9000");

    let err = editor.submit("Agit", &plant, &events).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ServerRejection);
    assert_eq!(
        messages(&events),
        vec!["Failed to set Agit: Setpoint out of range"]
    );
    assert_eq!(editor.pending("Agit").as_deref(), Some("9000"));
}

#[tokio::test]
async fn test_missing_echo_is_a_failure() {
    let plant = FakePlant::new();
    plant.set_write(WriteReply::Fixed(Reply::Ok(Default::default())));
    let events = EventLog::new();
    let editor = SetpointEditor::default();
    editor.edit("DO", "52");

    let err = editor.submit("DO", &plant, &events).await.unwrap_err();

    assert!(matches!(err, ConsoleError::UnexpectedResponse(_)));
    assert_eq!(kinds(&events), vec![EntryKind::Error]);
    assert_eq!(editor.pending("DO").as_deref(), Some("52"));
}

#[tokio::test]
async fn test_submit_without_pending_is_noop() {
    let plant = FakePlant::new();
    let events = EventLog::new();
    let editor = SetpointEditor::default();
    editor.observe_snapshot(&snapshot(&[("DO", 40.0, 50.0)]));

    let outcome = editor.submit("DO", &plant, &events).await.unwrap();

    assert_eq!(outcome, SubmitOutcome::NothingPending);
    assert!(plant.calls().is_empty());
    assert!(events.is_empty());
}

#[tokio::test]
async fn test_poll_confirm_policy_waits_for_matching_poll() {
    let plant = FakePlant::new();
    let events = EventLog::new();
    let (feed, editor) = wired(PendingClearPolicy::ClearOnPollConfirm);

    plant.set_status(Reply::Ok(snapshot(&[("DO", 40.0, 50.0)])));
    feed.poll(&plant, &events).await;
    editor.edit("DO", "52");
    editor.submit("DO", &plant, &events).await.unwrap();

    // Written but not yet reported by the plant
    assert!(matches!(
        editor.view("DO").unwrap().state,
        SetpointState::Shadowed {
            awaiting: Some(_),
            ..
        }
    ));

    feed.poll(&plant, &events).await;
    assert_eq!(
        editor.displayed_setpoint("DO"),
        Some(DisplayedSetpoint::Pending("52".to_string()))
    );

    plant.set_status(Reply::Ok(snapshot(&[("DO", 41.0, 52.0)])));
    feed.poll(&plant, &events).await;
    assert_eq!(editor.pending("DO"), None);
    assert_eq!(
        editor.displayed_setpoint("DO"),
        Some(DisplayedSetpoint::Confirmed(52.0))
    );
}

#[tokio::test]
async fn test_clipped_text_echo_clears_once_setpoint_moves() {
    let plant = FakePlant::new();
    plant.set_write(WriteReply::Fixed(Reply::Ok(
        [(
            "Agit".to_string(),
            json!("Success (Clipped from 900 to 800)"),
        )]
        .into_iter()
        .collect(),
    )));
    let events = EventLog::new();
    let (feed, editor) = wired(PendingClearPolicy::ClearOnPollConfirm);

    plant.set_status(Reply::Ok(snapshot(&[("Agit", 290.0, 300.0)])));
    feed.poll(&plant, &events).await;
    editor.edit("Agit", "900");
    editor.submit("Agit", &plant, &events).await.unwrap();

    assert_eq!(
        messages(&events),
        vec!["Successfully set Agit: Success (Clipped from 900 to 800)"]
    );

    // Plant still reports the old setpoint
    feed.poll(&plant, &events).await;
    assert_eq!(editor.pending("Agit").as_deref(), Some("900"));

    plant.set_status(Reply::Ok(snapshot(&[("Agit", 310.0, 800.0)])));
    feed.poll(&plant, &events).await;
    assert_eq!(editor.pending("Agit"), None);
    assert_eq!(
        editor.displayed_setpoint("Agit"),
        Some(DisplayedSetpoint::Confirmed(800.0))
    );
}

#[tokio::test]
async fn test_numeric_text_echo_is_awaited_as_value() {
    let plant = FakePlant::new();
    plant.set_write(WriteReply::Fixed(Reply::Ok(
        [("pH".to_string(), json!("7.1"))].into_iter().collect(),
    )));
    let events = EventLog::new();
    let (feed, editor) = wired(PendingClearPolicy::ClearOnPollConfirm);

    plant.set_status(Reply::Ok(snapshot(&[("pH", 7.0, 7.2)])));
    feed.poll(&plant, &events).await;
    editor.edit("pH", "7.1");
    editor.submit("pH", &plant, &events).await.unwrap();

    assert_eq!(
        editor.view("pH").unwrap().state,
        SetpointState::Shadowed {
            pending: "7.1".to_string(),
            awaiting: Some(Awaiting::Value(7.1)),
        }
    );

    plant.set_status(Reply::Ok(snapshot(&[("pH", 7.0, 7.1)])));
    feed.poll(&plant, &events).await;
    assert_eq!(editor.pending("pH"), None);
}

#[tokio::test]
async fn test_retain_policy_keeps_pending_after_write() {
    let plant = FakePlant::new();
    let events = EventLog::new();
    let (feed, editor) = wired(PendingClearPolicy::Retain);

    plant.set_status(Reply::Ok(snapshot(&[("Air", 1.0, 1.0)])));
    feed.poll(&plant, &events).await;
    editor.edit("Air", "1.5");
    editor.submit("Air", &plant, &events).await.unwrap();

    plant.set_status(Reply::Ok(snapshot(&[("Air", 1.4, 1.5)])));
    feed.poll(&plant, &events).await;

    assert_eq!(editor.pending("Air").as_deref(), Some("1.5"));
    assert_eq!(editor.confirmed("Air"), Some(1.5));
}

#[test]
fn test_acknowledge_ignores_superseded_edit() {
    let mut entry = ParameterEntry::new();
    entry.observe(40.0, 50.0);
    entry.edit("52".to_string());
    // The operator typed again while the write for "52" was in flight
    entry.edit("53".to_string());
    entry.acknowledge(PendingClearPolicy::ClearOnEcho, "52", 52.0, Some(50.0), Some(52.0));

    assert_eq!(entry.pending(), Some("53"));
    assert_eq!(entry.confirmed, Some(50.0));
}

#[tokio::test]
async fn test_scenario_edit_poll_submit() {
    let plant = FakePlant::new();
    let events = EventLog::new();
    let (feed, editor) = wired(PendingClearPolicy::ClearOnPollConfirm);

    plant.set_status(Reply::Ok(snapshot(&[("DO", 40.0, 50.0)])));
    feed.poll(&plant, &events).await;
    editor.edit("DO", "52");

    // A poll arrives while the edit is pending
    plant.set_status(Reply::Ok(snapshot(&[("DO", 40.5, 50.0)])));
    feed.poll(&plant, &events).await;
    assert_eq!(
        editor.displayed_setpoint("DO"),
        Some(DisplayedSetpoint::Pending("52".to_string()))
    );

    editor.submit("DO", &plant, &events).await.unwrap();
    assert_eq!(plant.call_count("write"), 1);
    assert_eq!(messages(&events), vec!["Successfully set DO: 52"]);

    plant.set_status(Reply::Ok(snapshot(&[("DO", 41.0, 52.0)])));
    feed.poll(&plant, &events).await;
    assert_eq!(
        editor.displayed_setpoint("DO"),
        Some(DisplayedSetpoint::Confirmed(52.0))
    );
}
