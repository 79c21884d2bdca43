mod common;

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::Json;
use chaos_core::api::{self, AppState, StateRequest};
use chaos_core::{
    EventRequest, InMemoryStateProvider, RunState, StateProvider, TaskId, TaskRepository,
    TaskUriBuilder, Trigger, WorkerPool,
};
use common::{members, wait_until_complete, CapturingReporter, FakeInfrastructure, FixedFate, Harness};

fn app(harness: &Harness, initial: RunState) -> AppState {
    AppState {
        destroyer: Arc::new(harness.destroyer(FixedFate::new(&["a"]), WorkerPool::new(2))),
        run_state: Arc::new(InMemoryStateProvider::new(initial)),
        uri_builder: TaskUriBuilder::new("http://chaos.test"),
    }
}

fn harness() -> Harness {
    Harness::new(
        FakeInfrastructure::new(members(&["a", "b"])),
        CapturingReporter::default(),
    )
}

#[tokio::test]
async fn destroy_event_is_accepted_with_location() {
    let harness = harness();
    let response = api::event_request(
        State(app(&harness, RunState::Started)),
        Ok(Json(EventRequest::new("destroy"))),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let tasks = harness.tasks.list();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].trigger(), Trigger::Manual);
    assert_eq!(
        response.headers()[header::LOCATION].to_str().unwrap(),
        format!("http://chaos.test/task/{}", tasks[0].id())
    );

    wait_until_complete(&tasks[0]).await;
    assert_eq!(harness.reporter.count(), 1);
}

#[tokio::test]
async fn manual_run_ignores_stopped_state() {
    let harness = harness();
    let response = api::event_request(
        State(app(&harness, RunState::Stopped)),
        Ok(Json(EventRequest::new("destroy"))),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    wait_until_complete(&harness.tasks.list()[0]).await;
    assert_eq!(harness.infrastructure.destroy_calls(), 1);
}

#[tokio::test]
async fn empty_or_unknown_event_is_rejected() {
    let harness = harness();
    let state = app(&harness, RunState::Started);

    for request in [EventRequest::default(), EventRequest::new("nope")] {
        let err = api::event_request(State(state.clone()), Ok(Json(request)))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
    assert!(harness.tasks.is_empty());
}

#[tokio::test]
async fn state_can_be_read_and_changed() {
    let harness = harness();
    let state = app(&harness, RunState::Started);

    let Json(current) = api::get_state(State(state.clone())).await;
    assert_eq!(current.status, RunState::Started);

    let Json(changed) = api::set_state(
        State(state.clone()),
        Ok(Json(StateRequest {
            status: Some("stopped".into()),
        })),
    )
    .await
    .unwrap();
    assert_eq!(changed.status, RunState::Stopped);
    assert_eq!(state.run_state.get(), RunState::Stopped);

    let err = api::set_state(
        State(state),
        Ok(Json(StateRequest {
            status: Some("paused".into()),
        })),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tasks_are_listed_and_looked_up() {
    let harness = harness();
    let state = app(&harness, RunState::Started);
    let task = harness.tasks.create(Trigger::Scheduled).unwrap();

    let Json(all) = api::list_tasks(State(state.clone())).await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0]["trigger"], "SCHEDULED");
    assert_eq!(all[0]["status"], "running");

    let Json(found) = api::get_task(State(state.clone()), Path(task.id().0))
        .await
        .unwrap();
    assert_eq!(found["id"], task.id().0);

    let missing = api::get_task(State(state), Path(TaskId::new().0))
        .await
        .unwrap_err();
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
}
