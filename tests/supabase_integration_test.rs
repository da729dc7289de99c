use std::sync::Arc;

use agenda::events::TaskEvents;
use agenda::models::{NewProjectRequest, NewTaskRequest, TaskStatus};
use agenda::session::{SessionManager, SessionMode};
use agenda::state::AppState;
use agenda::store::{Filter, TaskQuery};
use agenda::supabase::{SupabaseAuth, SupabaseConfig, SupabaseStore};
use chrono::Duration;

fn live_state() -> AppState {
    dotenvy::dotenv().ok();
    let config = SupabaseConfig::new_from_env().expect("SUPABASE_URL and SUPABASE_ANON_KEY");
    let auth = Arc::new(SupabaseAuth::new(config.clone()).expect("auth client"));
    let sessions = SessionManager::new(auth, SessionMode::Anonymous);
    let store = Arc::new(SupabaseStore::new(config, sessions.clone()).expect("store client"));
    AppState::new(store, sessions, TaskEvents::default())
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored --test-threads=1
async fn test_anonymous_session_and_task_round_trip() {
    let state = live_state();
    let session = state.sessions.require_session().await.expect("anonymous sign-in");
    assert!(session.user.is_anonymous);

    let today = agenda::dates::today();
    let task = state
        .tasks()
        .create(NewTaskRequest {
            work_days: vec![today + Duration::days(1), today],
            ..NewTaskRequest::titled("integration check")
        })
        .await
        .expect("insert task");
    assert_eq!(task.status, TaskStatus::Open);
    assert_eq!(task.work_day_list(), vec![today, today + Duration::days(1)]);

    let query = TaskQuery::new()
        .status(TaskStatus::Open)
        .scheduled_on(today)
        .filter(Filter::Id(task.id.clone()));
    assert_eq!(state.tasks().count(&query).await.expect("count"), 1);

    let done = state.tasks().complete(&task.id).await.expect("complete");
    assert_eq!(done.status, TaskStatus::Done);

    state.tasks().delete(&task.id).await.expect("delete");
    assert!(state.tasks().get(&task.id).await.is_err());
}

#[tokio::test]
#[ignore]
async fn test_project_join_and_detach() {
    let state = live_state();
    state.sessions.require_session().await.expect("anonymous sign-in");

    let project = state
        .projects()
        .create(NewProjectRequest {
            name: "integration project".to_string(),
            color: None,
        })
        .await
        .expect("insert project");
    let task = state
        .tasks()
        .create(NewTaskRequest {
            project_id: Some(project.id.clone()),
            ..NewTaskRequest::titled("with project")
        })
        .await
        .expect("insert task");
    assert_eq!(task.project_name(), Some("integration project"));

    state.projects().delete(&project.id).await.expect("delete project");
    let task = state.tasks().get(&task.id).await.expect("task survives");
    assert_eq!(task.project_id, None);

    state.tasks().delete(&task.id).await.expect("cleanup");
}
