mod common;

use std::sync::Arc;

use adwatch::{
    error::WatchError,
    models::Frequency,
    services::{
        sessions::WatchSessions,
        watch_component::{
            Confirmation, DeleteOutcome, DialogClose, DialogMode, DialogOutcome, DialogState, WatchComponent,
            DELETE_PROMPT, DIALOG_WIDTH,
        },
    },
};
use common::{alert, draft, every_minute, settle, Call, FakeNotifications};
use mongodb::bson::oid::ObjectId;
use tokio::sync::broadcast;

async fn started(alerts: usize) -> (WatchComponent<FakeNotifications>, Arc<FakeNotifications>) {
    let user = ObjectId::new();
    let list = (0..alerts)
        .map(|i| alert(user, &format!("alert {i}"), Frequency::Hourly))
        .collect();
    let svc = Arc::new(FakeNotifications::new(user, list));
    let (events_tx, _) = broadcast::channel(64);

    let component = WatchComponent::new(Arc::clone(&svc), user, "watcher", events_tx, 0);
    component.start();
    settle().await;
    svc.clear_calls();

    (component, svc)
}

#[tokio::test(start_paused = true)]
async fn confirmed_delete_refreshes_then_reloads() {
    let (component, svc) = started(2).await;
    let shown = component.alerts();
    let (keep, gone) = (shown[0].clone(), shown[1].clone());
    let generation = component.pipeline().reload_generation();

    assert_eq!(component.delete_notification(gone.id).unwrap(), DELETE_PROMPT);
    assert_eq!(component.dialog_state(), DialogState::ConfirmOpen(gone.id));

    let outcome = component.resolve_delete(Confirmation::Confirmed).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted(vec![keep.clone()]));
    assert_eq!(svc.calls(), vec![Call::Delete(gone.id), Call::Count]);
    assert_eq!(component.alerts(), vec![keep.clone()]);
    assert_eq!(component.pipeline().reload_generation(), generation + 1);
    assert_eq!(component.dialog_state(), DialogState::Idle);

    settle().await;
    assert_eq!(svc.calls(), vec![Call::Delete(gone.id), Call::Count, Call::Count]);
    assert_eq!(component.pipeline().active_timers(), vec![keep.id]);
}

#[tokio::test(start_paused = true)]
async fn delete_stops_polling_even_when_the_refresh_fails() {
    let user = ObjectId::new();
    let a = alert(user, "a", every_minute());
    let b = alert(user, "b", every_minute());
    let svc = Arc::new(FakeNotifications::new(user, vec![a.clone(), b.clone()]));
    let (events_tx, _) = broadcast::channel(64);

    let component = WatchComponent::new(Arc::clone(&svc), user, "watcher", events_tx, 0);
    component.start();
    tokio::time::sleep(std::time::Duration::from_secs(61)).await;
    assert_eq!(svc.queries_for(&b.id), 1);
    let generation = component.pipeline().reload_generation();

    component.delete_notification(b.id).unwrap();
    svc.fail_count(true);
    let err = component.resolve_delete(Confirmation::Confirmed).await.unwrap_err();

    assert!(matches!(err, WatchError::Fetch(_)));
    assert_eq!(component.alerts(), vec![a.clone()]);
    assert!(!component.pipeline().active_timers().contains(&b.id));
    assert_eq!(component.pipeline().reload_generation(), generation + 1);

    svc.fail_count(false);
    tokio::time::sleep(std::time::Duration::from_secs(5 * 60)).await;
    assert_eq!(svc.queries_for(&b.id), 1);
    assert!(svc.queries_for(&a.id) > 1);
    assert_eq!(component.pipeline().active_timers(), vec![a.id]);
}

#[tokio::test(start_paused = true)]
async fn cancelled_delete_touches_nothing() {
    let (component, svc) = started(2).await;
    let target = component.alerts()[0].id;
    let generation = component.pipeline().reload_generation();

    component.delete_notification(target).unwrap();
    let outcome = component.resolve_delete(Confirmation::Cancelled).await.unwrap();

    assert_eq!(outcome, DeleteOutcome::Kept);
    assert!(svc.calls().is_empty());
    assert_eq!(component.alerts().len(), 2);
    assert_eq!(component.pipeline().reload_generation(), generation);
}

#[tokio::test(start_paused = true)]
async fn delete_of_an_unknown_alert_is_rejected() {
    let (component, svc) = started(1).await;

    let err = component.delete_notification(ObjectId::new()).unwrap_err();
    assert!(matches!(err, WatchError::NotFound(_)));
    assert_eq!(component.dialog_state(), DialogState::Idle);

    let err = component.resolve_delete(Confirmation::Confirmed).await.unwrap_err();
    assert!(matches!(err, WatchError::InvalidState(_)));
    assert!(svc.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn saved_edit_refreshes_the_list_without_reloading() {
    let (component, svc) = started(2).await;
    let target = component.alerts()[0].clone();
    let generation = component.pipeline().reload_generation();

    let request = component.edit_notification(target.id).unwrap();
    assert_eq!(request.width, DIALOG_WIDTH);
    assert_eq!(request.mode, DialogMode::Edit(target.id));
    assert_eq!(request.data.subject.as_deref(), Some(target.subject.as_str()));
    assert_eq!(request.data.id, Some(target.id.to_hex()));

    let outcome = component
        .close_dialog(DialogClose::Saved(draft("renamed", Frequency::Daily)))
        .await
        .unwrap();

    let DialogOutcome::Refreshed(list) = outcome else {
        panic!("edit should refresh the list");
    };
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].subject, "renamed");
    assert_eq!(list[0].frequency, Frequency::Daily);
    assert_eq!(component.alerts(), list);

    assert_eq!(svc.calls(), vec![Call::Update(target.id), Call::Count]);
    assert_eq!(component.pipeline().reload_generation(), generation);

    settle().await;
    assert_eq!(svc.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn saved_create_reloads_the_pipeline() {
    let (component, svc) = started(1).await;
    let generation = component.pipeline().reload_generation();

    let request = component.open_dialog();
    assert_eq!(request.width, DIALOG_WIDTH);
    assert_eq!(request.mode, DialogMode::Create);
    assert_eq!(request.data.name.as_deref(), Some("watcher"));
    assert!(request.data.id.is_none());

    let outcome = component
        .close_dialog(DialogClose::Saved(draft("new one", every_minute())))
        .await
        .unwrap();

    assert_eq!(outcome, DialogOutcome::Reloaded);
    assert_eq!(svc.calls(), vec![Call::Create]);
    assert_eq!(component.pipeline().reload_generation(), generation + 1);

    settle().await;
    assert_eq!(svc.calls(), vec![Call::Create, Call::Count]);
    assert_eq!(component.alerts().len(), 2);
    assert_eq!(component.pipeline().active_timers().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn cancelled_dialog_is_a_no_op() {
    let (component, svc) = started(1).await;
    let generation = component.pipeline().reload_generation();

    component.open_dialog();
    let outcome = component.close_dialog(DialogClose::Cancelled).await.unwrap();

    assert_eq!(outcome, DialogOutcome::Dismissed);
    assert_eq!(component.dialog_state(), DialogState::Idle);
    settle().await;
    assert!(svc.calls().is_empty());
    assert_eq!(component.pipeline().reload_generation(), generation);
}

#[tokio::test(start_paused = true)]
async fn closing_without_an_open_dialog_fails() {
    let (component, svc) = started(1).await;

    let err = component.close_dialog(DialogClose::Cancelled).await.unwrap_err();
    assert!(matches!(err, WatchError::InvalidState(_)));
    assert!(svc.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn invalid_draft_keeps_the_dialog_open() {
    let (component, svc) = started(1).await;
    component.open_dialog();

    let mut bad = draft("", Frequency::Hourly);
    bad.min = 50.0;
    bad.max = 10.0;

    let err = component.close_dialog(DialogClose::Saved(bad)).await.unwrap_err();
    assert!(matches!(err, WatchError::Validation(_)));
    assert_eq!(component.dialog_state(), DialogState::DialogOpen(DialogMode::Create));
    assert!(svc.calls().is_empty());

    // the same dialog can still be saved
    let outcome = component
        .close_dialog(DialogClose::Saved(draft("fixed", Frequency::Hourly)))
        .await
        .unwrap();
    assert_eq!(outcome, DialogOutcome::Reloaded);
}

#[tokio::test(start_paused = true)]
async fn editing_an_alert_that_is_not_displayed_fails() {
    let (component, _svc) = started(1).await;

    let err = component.edit_notification(ObjectId::new()).unwrap_err();
    assert!(matches!(err, WatchError::NotFound(_)));
    assert_eq!(component.dialog_state(), DialogState::Idle);
}

#[tokio::test(start_paused = true)]
async fn destroy_stops_every_timer_and_fetch() {
    let user = ObjectId::new();
    let a = alert(user, "a", every_minute());
    let b = alert(user, "b", every_minute());
    let svc = Arc::new(FakeNotifications::new(user, vec![a.clone(), b.clone()]));
    let (events_tx, _) = broadcast::channel(64);

    let component = WatchComponent::new(Arc::clone(&svc), user, "watcher", events_tx, 0);
    component.start();
    tokio::time::sleep(std::time::Duration::from_secs(61)).await;
    assert_eq!(svc.queries_for(&a.id), 1);

    component.open_dialog();
    component.destroy();
    assert_eq!(component.dialog_state(), DialogState::Idle);
    assert!(!component.pipeline().is_running());

    let seen = svc.calls().len();
    tokio::time::sleep(std::time::Duration::from_secs(10 * 60)).await;
    assert_eq!(svc.calls().len(), seen);
}

#[tokio::test(start_paused = true)]
async fn sessions_hand_out_one_component_per_user() {
    let user = ObjectId::new();
    let a = alert(user, "a", every_minute());
    let svc = Arc::new(FakeNotifications::new(user, vec![a.clone()]));
    let sessions: WatchSessions<FakeNotifications> = WatchSessions::new();

    let make = || {
        let (events_tx, _) = broadcast::channel(8);
        WatchComponent::new(Arc::clone(&svc), user, "watcher", events_tx, 0)
    };
    let first = sessions.get_or_create(user, make);
    let again = sessions.get_or_create(user, make);
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(sessions.len(), 1);

    // creation alone does not poll
    settle().await;
    assert!(svc.calls().is_empty());

    first.start();
    tokio::time::sleep(std::time::Duration::from_secs(61)).await;
    assert_eq!(svc.queries_for(&a.id), 1);

    assert!(sessions.stop(&user));
    assert!(!sessions.stop(&user));
    assert!(sessions.is_empty());
    assert!(!first.pipeline().is_running());

    tokio::time::sleep(std::time::Duration::from_secs(10 * 60)).await;
    assert_eq!(svc.queries_for(&a.id), 1);
}
