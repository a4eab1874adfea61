//! End-to-end reconciliation between tasks and users over the memory backend.

use rstest::{fixture, rstest};
use serde_json::json;
use std::sync::{Arc, Mutex};

use taskboard_atoms::store::{EntityStore, MemoryStore};
use taskboard_atoms::sync::{
    apply_batch, Applied, FailureSink, SyncApplier, SyncError, SyncIntent, SyncQueue,
};
use taskboard_atoms::tasks::{self, Task, TaskPayload, UNASSIGNED_NAME};
use taskboard_atoms::users::{self, User, UserPayload};
use taskboard_atoms::ServiceError;

#[derive(Default)]
struct RecordingSink {
    failures: Mutex<Vec<(SyncIntent, String)>>,
}

impl RecordingSink {
    fn failures(&self) -> Vec<(SyncIntent, String)> {
        self.failures.lock().unwrap().clone()
    }
}

impl FailureSink for RecordingSink {
    fn record(&self, intent: &SyncIntent, error: &SyncError) {
        self.failures
            .lock()
            .unwrap()
            .push((intent.clone(), error.to_string()));
    }
}

struct Harness {
    tasks: EntityStore<Task>,
    users: EntityStore<User>,
    sync: SyncQueue,
    sink: Arc<RecordingSink>,
}

impl Harness {
    async fn user(&self, name: &str, email: &str) -> User {
        users::create_user(
            &self.users,
            &self.sync,
            UserPayload {
                name: Some(name.to_string()),
                email: Some(email.to_string()),
                pending_tasks: None,
            },
        )
        .await
        .unwrap()
    }

    async fn task(&self, name: &str, assigned_user: &str) -> Task {
        tasks::create_task(&self.tasks, &self.sync, task_payload(name, assigned_user))
            .await
            .unwrap()
    }

    async fn settled_user(&self, id: &str) -> User {
        self.sync.flush().await;
        self.users.get(id).await.unwrap()
    }

    async fn settled_task(&self, id: &str) -> Task {
        self.sync.flush().await;
        self.tasks.get(id).await.unwrap()
    }
}

fn task_payload(name: &str, assigned_user: &str) -> TaskPayload {
    TaskPayload {
        name: Some(name.to_string()),
        deadline: Some(json!("2025-01-01")),
        assigned_user: Some(assigned_user.to_string()),
        ..TaskPayload::default()
    }
}

fn user_payload(user: &User, pending: &[&str]) -> UserPayload {
    UserPayload {
        name: Some(user.name.clone()),
        email: Some(user.email.clone()),
        pending_tasks: Some(pending.iter().map(|s| s.to_string()).collect()),
    }
}

#[fixture]
fn harness() -> Harness {
    let backend = Arc::new(MemoryStore::new());
    let tasks = EntityStore::new(backend.clone());
    let users = EntityStore::new(backend);
    let sink = Arc::new(RecordingSink::default());
    let sync = SyncQueue::spawn(SyncApplier::new(tasks.clone(), users.clone()), sink.clone());
    Harness {
        tasks,
        users,
        sync,
        sink,
    }
}

#[rstest]
#[tokio::test]
async fn assigned_task_creation_lands_in_pending_tasks(harness: Harness) {
    let bob = harness.user("Bob", "b@x.com").await;
    let task = harness.task("T", &bob.id).await;

    assert_eq!(harness.settled_user(&bob.id).await.pending_tasks, vec![task.id]);
    assert!(harness.sink.failures().is_empty());
}

#[rstest]
#[tokio::test]
async fn reassignment_moves_the_id_and_is_idempotent(harness: Harness) {
    let a = harness.user("A", "a@x.com").await;
    let b = harness.user("B", "b@x.com").await;
    let task = harness.task("T", &a.id).await;
    harness.sync.flush().await;

    tasks::replace_task(&harness.tasks, &harness.sync, &task.id, task_payload("T", &b.id))
        .await
        .unwrap();
    assert!(harness.settled_user(&a.id).await.pending_tasks.is_empty());
    assert_eq!(harness.settled_user(&b.id).await.pending_tasks, vec![task.id.clone()]);

    // back and forth twice leaves a single entry
    for owner in [&a.id, &b.id, &a.id] {
        tasks::replace_task(&harness.tasks, &harness.sync, &task.id, task_payload("T", owner))
            .await
            .unwrap();
    }
    assert_eq!(harness.settled_user(&a.id).await.pending_tasks, vec![task.id.clone()]);
    assert!(harness.settled_user(&b.id).await.pending_tasks.is_empty());
}

#[rstest]
#[tokio::test]
async fn deleting_a_user_unassigns_all_pending_tasks(harness: Harness) {
    let bob = harness.user("Bob", "b@x.com").await;
    let mut ids = Vec::new();
    for name in ["one", "two", "three"] {
        ids.push(harness.task(name, &bob.id).await.id);
    }
    assert_eq!(harness.settled_user(&bob.id).await.pending_tasks.len(), 3);

    users::delete_user(&harness.users, &harness.sync, &bob.id).await.unwrap();

    for id in &ids {
        let task = harness.settled_task(id).await;
        assert_eq!(task.assigned_user, "");
        assert_eq!(task.assigned_user_name, UNASSIGNED_NAME);
    }
}

#[rstest]
#[tokio::test]
async fn deleting_a_task_removes_it_from_the_assignee(harness: Harness) {
    let bob = harness.user("Bob", "b@x.com").await;
    let keep = harness.task("keep", &bob.id).await;
    let gone = harness.task("gone", &bob.id).await;
    harness.sync.flush().await;

    tasks::delete_task(&harness.tasks, &harness.sync, &gone.id).await.unwrap();
    assert_eq!(harness.settled_user(&bob.id).await.pending_tasks, vec![keep.id]);

    let loose = harness.task("loose", "").await;
    tasks::delete_task(&harness.tasks, &harness.sync, &loose.id).await.unwrap();
    harness.sync.flush().await;
    assert!(harness.sink.failures().is_empty());
}

#[rstest]
#[tokio::test]
async fn user_update_reassigns_tasks_with_current_name(harness: Harness) {
    let bob = harness.user("Bob", "b@x.com").await;
    let t1 = harness.task("one", &bob.id).await;
    let t2 = harness.task("two", "").await;
    harness.sync.flush().await;

    let mut payload = user_payload(&bob, &[t2.id.as_str()]);
    payload.name = Some("Robert".to_string());
    users::replace_user(&harness.users, &harness.sync, &bob.id, payload)
        .await
        .unwrap();

    let t1 = harness.settled_task(&t1.id).await;
    assert_eq!((t1.assigned_user.as_str(), t1.assigned_user_name.as_str()), ("", UNASSIGNED_NAME));

    let t2 = harness.settled_task(&t2.id).await;
    assert_eq!(t2.assigned_user, bob.id);
    assert_eq!(t2.assigned_user_name, "Robert");
}

#[rstest]
#[tokio::test]
async fn user_creation_does_not_pull_tasks(harness: Harness) {
    let task = harness.task("T", "").await;
    let user = users::create_user(
        &harness.users,
        &harness.sync,
        UserPayload {
            name: Some("Bob".to_string()),
            email: Some("b@x.com".to_string()),
            pending_tasks: Some(vec![task.id.clone()]),
        },
    )
    .await
    .unwrap();

    assert_eq!(harness.settled_user(&user.id).await.pending_tasks, vec![task.id.clone()]);
    assert_eq!(harness.settled_task(&task.id).await.assigned_user, "");
}

#[rstest]
#[tokio::test]
async fn renaming_a_user_leaves_task_names_stale(harness: Harness) {
    let bob = harness.user("Bob", "b@x.com").await;
    let task = harness.task("T", "").await;
    users::replace_user(&harness.users, &harness.sync, &bob.id, user_payload(&bob, &[task.id.as_str()]))
        .await
        .unwrap();
    assert_eq!(harness.settled_task(&task.id).await.assigned_user_name, "Bob");

    let mut rename = user_payload(&bob, &[task.id.as_str()]);
    rename.name = Some("Robert".to_string());
    users::replace_user(&harness.users, &harness.sync, &bob.id, rename)
        .await
        .unwrap();
    assert_eq!(harness.settled_task(&task.id).await.assigned_user_name, "Bob");
}

#[rstest]
#[tokio::test]
async fn missing_targets_are_recorded_not_propagated(harness: Harness) {
    let task = harness.task("T", "ghost").await;
    let bob = harness.user("Bob", "b@x.com").await;
    users::replace_user(
        &harness.users,
        &harness.sync,
        &bob.id,
        user_payload(&bob, &["no-such-task", task.id.as_str()]),
    )
    .await
    .unwrap();
    harness.sync.flush().await;

    let failures = harness.sink.failures();
    assert_eq!(failures.len(), 2);
    assert!(failures.iter().any(|(intent, _)| matches!(
        intent,
        SyncIntent::AddPendingTask { user_id, .. } if user_id == "ghost"
    )));
    assert!(failures.iter().any(|(intent, _)| matches!(
        intent,
        SyncIntent::AssignTask { task_id, .. } if task_id == "no-such-task"
    )));

    // the sibling intent in the same batch still went through
    assert_eq!(harness.settled_task(&task.id).await.assigned_user, bob.id);
}

#[rstest]
#[tokio::test]
async fn applying_an_intent_twice_is_a_no_op(harness: Harness) {
    let bob = harness.user("Bob", "b@x.com").await;
    let task = harness.task("T", "").await;
    let applier = SyncApplier::new(harness.tasks.clone(), harness.users.clone());
    let intent = SyncIntent::AddPendingTask {
        user_id: bob.id.clone(),
        task_id: task.id.clone(),
    };

    assert_eq!(applier.apply(&intent).await.unwrap(), Applied::Changed);
    assert_eq!(applier.apply(&intent).await.unwrap(), Applied::Unchanged);

    apply_batch(&applier, harness.sink.as_ref(), &[intent.clone(), intent]).await;
    assert_eq!(harness.users.get(&bob.id).await.unwrap().pending_tasks, vec![task.id]);
}

#[rstest]
#[tokio::test]
async fn duplicate_email_is_rejected_before_anything_is_written(harness: Harness) {
    harness.user("Bob", "a@x.com").await;
    let result = users::create_user(
        &harness.users,
        &harness.sync,
        UserPayload {
            name: Some("Other".to_string()),
            email: Some("a@x.com".to_string()),
            pending_tasks: None,
        },
    )
    .await;

    assert!(matches!(result, Err(ServiceError::Validation(ref m)) if m == "Email already exists."));
    assert_eq!(
        harness
            .users
            .count(&taskboard_atoms::store::Filter::default())
            .await
            .unwrap(),
        1
    );
}

#[rstest]
#[tokio::test]
async fn user_can_keep_its_own_email_on_replace(harness: Harness) {
    let bob = harness.user("Bob", "b@x.com").await;
    let other = harness.user("Other", "o@x.com").await;

    users::replace_user(&harness.users, &harness.sync, &bob.id, user_payload(&bob, &[]))
        .await
        .unwrap();

    let steal = user_payload(&other, &[]);
    let result = users::replace_user(&harness.users, &harness.sync, &bob.id, steal).await;
    assert!(matches!(result, Err(ServiceError::Validation(_))));
}

#[rstest]
#[tokio::test]
async fn replace_of_missing_entities_is_not_found(harness: Harness) {
    let result =
        tasks::replace_task(&harness.tasks, &harness.sync, "missing", task_payload("T", "")).await;
    assert!(matches!(result, Err(ServiceError::NotFound(_))));

    let result = users::delete_user(&harness.users, &harness.sync, "missing").await;
    assert!(matches!(result, Err(ServiceError::NotFound(_))));
}

#[test]
fn runtime_shutdown_records_unapplied_updates() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let backend = Arc::new(MemoryStore::new());
    let task_store: EntityStore<Task> = EntityStore::new(backend.clone());
    let user_store: EntityStore<User> = EntityStore::new(backend);
    let sink = Arc::new(RecordingSink::default());

    let (bob_id, task_id) = runtime.block_on(async {
        let sync = SyncQueue::spawn(
            SyncApplier::new(task_store.clone(), user_store.clone()),
            sink.clone(),
        );
        let bob = users::create_user(
            &user_store,
            &sync,
            UserPayload {
                name: Some("Bob".to_string()),
                email: Some("b@x.com".to_string()),
                pending_tasks: None,
            },
        )
        .await
        .unwrap();
        let task = tasks::create_task(&task_store, &sync, task_payload("T", &bob.id))
            .await
            .unwrap();
        (bob.id, task.id)
    });
    // the worker never ran; tearing the runtime down must not lose the batch
    drop(runtime);

    let failures = sink.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].0,
        SyncIntent::AddPendingTask {
            user_id: bob_id,
            task_id,
        }
    );
    assert_eq!(failures[0].1, SyncError::Abandoned.to_string());
}
