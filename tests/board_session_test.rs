//! End-to-end session tests against in-memory transport doubles: a scripted
//! server and a push channel backed directly by a broadcast sender.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use boardsync::push::{BoardEvent, ChannelMessage, PushChannel};
use boardsync::remote::{BoardApi, CreateTask, UpdateTask};
use boardsync::{BoardError, BoardSession, Column, ColumnId, InsertPosition, Task, TaskId};
use chrono::Utc;
use tokio::sync::broadcast;

fn make_column(id: &str, order: f64) -> Column {
    Column {
        id: ColumnId::from(id),
        title: id.to_string(),
        order,
        task_count: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn make_task(id: &str, column: &str, order: f64) -> Task {
    Task {
        id: TaskId::from(id),
        title: id.to_string(),
        description: None,
        column_id: ColumnId::from(column),
        order,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        local_ref: None,
    }
}

/// In-memory board server. List endpoints serve the stored data; mutations
/// echo the client's proposal as the canonical record. `fail_moves` turns
/// move commands into remote failures.
struct InMemoryApi {
    columns: Mutex<Vec<Column>>,
    tasks: Mutex<HashMap<ColumnId, Vec<Task>>>,
    fail_moves: AtomicBool,
    next_id: AtomicU64,
}

impl InMemoryApi {
    fn new(columns: Vec<Column>, tasks: HashMap<ColumnId, Vec<Task>>) -> Arc<Self> {
        Arc::new(Self {
            columns: Mutex::new(columns),
            tasks: Mutex::new(tasks),
            fail_moves: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
        })
    }
}

#[async_trait]
impl BoardApi for InMemoryApi {
    async fn list_columns(&self) -> boardsync::Result<Vec<Column>> {
        Ok(self.columns.lock().unwrap().clone())
    }

    async fn list_tasks(&self, column: &ColumnId) -> boardsync::Result<Vec<Task>> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .get(column)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_task(&self, req: &CreateTask) -> boardsync::Result<Task> {
        let id = format!("srv-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut task = make_task(&id, req.column_id.as_str(), 0.0);
        task.title = req.title.clone();
        task.description = req.description.clone();
        Ok(task)
    }

    async fn update_task(&self, id: &TaskId, req: &UpdateTask) -> boardsync::Result<Task> {
        let mut task = make_task(id.as_str(), "unused", 0.0);
        task.title = req.title.clone();
        task.description = req.description.clone();
        Ok(task)
    }

    async fn delete_task(&self, _id: &TaskId) -> boardsync::Result<()> {
        Ok(())
    }

    async fn move_task(
        &self,
        id: &TaskId,
        target: &ColumnId,
        order: f64,
    ) -> boardsync::Result<Task> {
        if self.fail_moves.load(Ordering::Relaxed) {
            return Err(BoardError::remote("move rejected"));
        }
        Ok(make_task(id.as_str(), target.as_str(), order))
    }

    async fn create_column(&self, title: &str, order: f64) -> boardsync::Result<Column> {
        let id = format!("srv-col-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut col = make_column(&id, order);
        col.title = title.to_string();
        Ok(col)
    }

    async fn update_column(&self, id: &ColumnId, title: &str) -> boardsync::Result<Column> {
        let mut col = make_column(id.as_str(), 0.0);
        col.title = title.to_string();
        Ok(col)
    }

    async fn delete_column(&self, _id: &ColumnId) -> boardsync::Result<()> {
        Ok(())
    }
}

/// Push channel double: the test holds the sender.
struct FakeChannel {
    tx: broadcast::Sender<ChannelMessage>,
}

impl FakeChannel {
    fn new() -> (Arc<Self>, broadcast::Sender<ChannelMessage>) {
        let (tx, _) = broadcast::channel(64);
        (Arc::new(Self { tx: tx.clone() }), tx)
    }
}

#[async_trait]
impl PushChannel for FakeChannel {
    async fn connect(&self) -> boardsync::Result<()> {
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChannelMessage> {
        self.tx.subscribe()
    }

    async fn disconnect(&self) {}
}

fn seeded_api() -> Arc<InMemoryApi> {
    InMemoryApi::new(
        vec![make_column("todo", 0.0), make_column("done", 1000.0)],
        HashMap::from([(
            ColumnId::from("todo"),
            vec![make_task("t1", "todo", 10.0), make_task("t2", "todo", 20.0)],
        )]),
    )
}

async fn start_session(api: Arc<InMemoryApi>) -> (BoardSession, broadcast::Sender<ChannelMessage>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let (channel, tx) = FakeChannel::new();
    let session = BoardSession::start(api, channel).await.unwrap();
    (session, tx)
}

/// Poll until the condition holds; the reconcile loop runs on its own task.
async fn eventually<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within 1s");
}

#[tokio::test]
async fn start_loads_the_full_board() {
    let (session, _tx) = start_session(seeded_api()).await;

    let board = session.snapshot().await;
    assert_eq!(board.columns().len(), 2);
    assert_eq!(board.tasks_in(&ColumnId::from("todo")).len(), 2);
    assert_eq!(board.column(&ColumnId::from("todo")).unwrap().task_count, 2);

    session.shutdown().await;
}

#[tokio::test]
async fn executor_move_reaches_canonical_order() {
    let (session, _tx) = start_session(seeded_api()).await;

    // [t1(10), t2(20)] — moving t1 behind t2 allocates 20 + 1000.
    let moved = session
        .executor()
        .move_task(&TaskId::from("t1"), &ColumnId::from("todo"), InsertPosition::Tail)
        .await
        .unwrap();
    assert_eq!(moved.order, 1020.0);

    let board = session.snapshot().await;
    let keys = board.order_keys(&ColumnId::from("todo"));
    assert_eq!(keys, vec![20.0, 1020.0]);

    session.shutdown().await;
}

#[tokio::test]
async fn failed_move_leaves_board_untouched() {
    let api = seeded_api();
    let (session, _tx) = start_session(api.clone()).await;

    let before = session.snapshot().await;
    api.fail_moves.store(true, Ordering::Relaxed);
    session
        .executor()
        .move_task(&TaskId::from("t1"), &ColumnId::from("done"), InsertPosition::Head)
        .await
        .unwrap_err();

    assert_eq!(session.snapshot().await, before);
    session.shutdown().await;
}

#[tokio::test]
async fn push_events_reconcile_into_the_board() {
    let (session, tx) = start_session(seeded_api()).await;

    tx.send(ChannelMessage::Event(BoardEvent::TaskMoved(make_task(
        "t1", "done", 500.0,
    ))))
    .unwrap();

    eventually(|| async {
        let board = session.snapshot().await;
        board.find_task_column(&TaskId::from("t1")) == Some(&ColumnId::from("done"))
    })
    .await;

    // Duplicate delivery changes nothing.
    let after_first = session.snapshot().await;
    tx.send(ChannelMessage::Event(BoardEvent::TaskMoved(make_task(
        "t1", "done", 500.0,
    ))))
    .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(session.snapshot().await, after_first);

    session.shutdown().await;
}

#[tokio::test]
async fn reconnect_triggers_full_refetch() {
    let api = seeded_api();
    let (session, tx) = start_session(api.clone()).await;

    // The server state changed while the channel was down.
    api.tasks
        .lock()
        .unwrap()
        .insert(ColumnId::from("done"), vec![make_task("t9", "done", 1.0)]);

    tx.send(ChannelMessage::Reconnected).unwrap();

    eventually(|| async {
        session
            .snapshot()
            .await
            .contains_task(&TaskId::from("t9"))
    })
    .await;

    session.shutdown().await;
}

#[tokio::test]
async fn own_confirmed_move_tolerates_echoed_notification() {
    // The server pushes our own confirmed move back at us; applying it must
    // be a no-op, not a double move.
    let (session, tx) = start_session(seeded_api()).await;

    let moved = session
        .executor()
        .move_task(&TaskId::from("t2"), &ColumnId::from("done"), InsertPosition::Head)
        .await
        .unwrap();

    let after_confirm = session.snapshot().await;
    tx.send(ChannelMessage::Event(BoardEvent::TaskMoved(moved)))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(session.snapshot().await, after_confirm);

    session.shutdown().await;
}
