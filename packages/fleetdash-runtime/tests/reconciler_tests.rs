//! Reconciler integration tests over the in-process gateway.
//!
//! Covers save round trips, failure handling, the single in-flight
//! request rule and the password change flow.

use std::sync::Arc;
use std::time::Duration;

use fleetdash_core::profile::{DISPLAY_NAME, FIRST_NAME, LAST_NAME};
use fleetdash_core::{FailureKind, FieldValue, FormConfig, FormError, PasswordPolicy, SubmitScope};
use fleetdash_runtime::{
    open_profile, EditState, LocalGateway, MutationGateway, PasswordForm, ProfileStore,
    SaveAttempt, SaveOutcome, DEMO_PASSWORD,
};

fn create_gateway() -> LocalGateway {
    let store = ProfileStore::demo(PasswordPolicy::default()).unwrap();
    LocalGateway::new(Arc::new(store))
}

#[tokio::test]
async fn test_save_round_trip() {
    let gateway = create_gateway();
    let mut editor = open_profile(&gateway, FormConfig::default()).await.unwrap();
    assert_eq!(editor.state(), EditState::Clean);

    editor.edit(FIRST_NAME, FieldValue::from("Jo")).unwrap();
    assert_eq!(editor.state(), EditState::Dirty);

    let outcome = editor.save(&gateway).await;
    assert_eq!(outcome, SaveOutcome::Saved);
    assert_eq!(editor.state(), EditState::Clean);
    assert_eq!(gateway.call_count(), 1);
    assert_eq!(
        editor.current().get(DISPLAY_NAME),
        Some(&FieldValue::OptionalText(Some("Jo Morgan".to_string())))
    );
    assert_eq!(editor.current(), &gateway.store().profile());
}

#[tokio::test]
async fn test_clean_save_makes_no_call() {
    let gateway = create_gateway();
    let mut editor = open_profile(&gateway, FormConfig::default()).await.unwrap();

    assert_eq!(editor.save(&gateway).await, SaveOutcome::NothingToSave);
    assert_eq!(gateway.call_count(), 0);
}

#[tokio::test]
async fn test_save_while_saving_never_calls_gateway() {
    let gateway = create_gateway();
    let mut editor = open_profile(&gateway, FormConfig::default()).await.unwrap();
    editor.edit(FIRST_NAME, FieldValue::from("Jo")).unwrap();

    let ticket = match editor.begin_save() {
        SaveAttempt::Dispatched(ticket) => ticket,
        other => panic!("Expected dispatched save, got {:?}", other),
    };
    assert_eq!(editor.state(), EditState::Saving);

    assert_eq!(editor.save(&gateway).await, SaveOutcome::AlreadySaving);
    assert_eq!(gateway.call_count(), 0);

    let result = gateway.submit(ticket.payload().clone()).await;
    let outcome = editor.complete_save(ticket.request_id(), result).unwrap();
    assert_eq!(outcome, SaveOutcome::Saved);
    assert_eq!(gateway.call_count(), 1);
}

#[tokio::test]
async fn test_network_failure_preserves_edits() {
    let gateway = create_gateway();
    let mut editor = open_profile(&gateway, FormConfig::default()).await.unwrap();
    editor.edit(FIRST_NAME, FieldValue::from("A")).unwrap();

    gateway.fail_next(FormError::Network("connection refused".to_string()));
    let outcome = editor.save(&gateway).await;

    match outcome {
        SaveOutcome::Failed(failure) => assert_eq!(failure.kind, FailureKind::Network),
        other => panic!("Expected failure, got {:?}", other),
    }
    assert_eq!(editor.state(), EditState::Dirty);
    assert_eq!(editor.current().get(FIRST_NAME), Some(&FieldValue::from("A")));
    assert_eq!(
        gateway.store().profile().get(FIRST_NAME),
        Some(&FieldValue::from("Alex"))
    );

    // user-initiated retry
    assert_eq!(editor.save(&gateway).await, SaveOutcome::Saved);
    assert_eq!(gateway.call_count(), 2);
}

#[tokio::test]
async fn test_server_rejection_keeps_snapshot() {
    let gateway = create_gateway();
    let mut editor = open_profile(&gateway, FormConfig::default()).await.unwrap();
    let snapshot = editor.snapshot().clone();

    // passes local rules (non-blank after the edit below), rejected by the server
    editor.edit(LAST_NAME, FieldValue::from("Smith")).unwrap();
    gateway.fail_next(FormError::ServerRejected("last name is locked".to_string()));

    let outcome = editor.save(&gateway).await;
    assert!(matches!(outcome, SaveOutcome::Failed(_)));
    assert_eq!(editor.snapshot(), &snapshot);
    assert_eq!(
        editor.last_failure().map(|f| f.message.as_str()),
        Some("last name is locked")
    );
}

#[tokio::test]
async fn test_full_field_set_scope_sends_every_editable_field() {
    let gateway = create_gateway();
    let config = FormConfig {
        submit_scope: SubmitScope::FullFieldSet,
        ..Default::default()
    };
    let mut editor = open_profile(&gateway, config).await.unwrap();
    editor.edit(FIRST_NAME, FieldValue::from("Jo")).unwrap();

    match editor.begin_save() {
        SaveAttempt::Dispatched(ticket) => {
            let names: Vec<&str> = ticket.payload().field_names().collect();
            assert_eq!(names, vec!["avatar", "firstName", "lastName", "phone"]);
        }
        other => panic!("Expected dispatched save, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_edits_during_slow_save_survive() {
    let gateway = create_gateway().with_latency(Duration::from_millis(200));
    let mut editor = open_profile(&gateway, FormConfig::default()).await.unwrap();
    editor.edit(FIRST_NAME, FieldValue::from("Jo")).unwrap();

    let ticket = match editor.begin_save() {
        SaveAttempt::Dispatched(ticket) => ticket,
        other => panic!("Expected dispatched save, got {:?}", other),
    };
    let request = gateway.submit(ticket.payload().clone());

    // edit arrives while the request is pending
    editor.edit(LAST_NAME, FieldValue::from("Smith")).unwrap();
    let result = request.await;

    editor.complete_save(ticket.request_id(), result).unwrap();
    assert_eq!(editor.current().get(LAST_NAME), Some(&FieldValue::from("Smith")));
    assert_eq!(editor.current().get(FIRST_NAME), Some(&FieldValue::from("Jo")));
    assert_eq!(editor.state(), EditState::Dirty);
    assert_eq!(editor.changes().iter().collect::<Vec<_>>(), vec![LAST_NAME]);
}

#[tokio::test]
async fn test_password_change_scenarios() {
    let gateway = create_gateway();
    let mut form = PasswordForm::new(FormConfig::default());

    form.set_old_password("");
    form.set_new_password("Abcdef1!");
    form.set_confirmation("Abcdef1!");
    match form.submit(&gateway).await {
        SaveOutcome::Failed(failure) => {
            assert_eq!(failure.kind, FailureKind::ValidationRejected);
            assert_eq!(failure.message, "old password required");
        }
        other => panic!("Expected validation failure, got {:?}", other),
    }
    assert_eq!(gateway.call_count(), 0);

    form.set_old_password("x");
    form.set_new_password("abc");
    form.set_confirmation("abc");
    match form.submit(&gateway).await {
        SaveOutcome::Failed(failure) => {
            assert_eq!(failure.message, "password must be at least 8 characters")
        }
        other => panic!("Expected validation failure, got {:?}", other),
    }
    assert_eq!(gateway.call_count(), 0);

    // valid locally, wrong current password on the server
    form.set_new_password("Abcdef1!");
    form.set_confirmation("Abcdef1!");
    match form.submit(&gateway).await {
        SaveOutcome::Failed(failure) => {
            assert_eq!(failure.kind, FailureKind::ServerRejected);
            assert_eq!(failure.message, "current password is incorrect");
        }
        other => panic!("Expected server rejection, got {:?}", other),
    }
    assert_eq!(gateway.call_count(), 1);
    assert_eq!(form.draft().old_password, "x");

    form.set_old_password(DEMO_PASSWORD);
    assert_eq!(form.submit(&gateway).await, SaveOutcome::Saved);
    assert_eq!(gateway.call_count(), 2);
    assert!(form.draft().new_password.is_empty());
    assert!(form.last_failure().is_none());
}
