//! Optimistic drag-and-drop reconciliation for one board.
//!
//! A drag end is planned and committed to the shared [`BoardState`] under its
//! write lock, then the bulk write runs on a spawned task. The caller gets the
//! task's handle and may await it or drop it.
//!
//! A failed write never reloads the board while other writes are still in
//! flight: the reload is deferred until the last of them settles, so the
//! optimistic changes of later moves are not wiped out.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use db::models::list::ListWithTasks;
use tokio::{sync::RwLock, task::JoinHandle};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{
    board_state::BoardState,
    config::MoveFailurePolicy,
    drag::{self, DragEvent, MoveKind},
    notification::{MSG_MOVE_FAILED, Notification, Notifier},
    task_store::{TaskStore, TaskStoreError},
};

/// What happened to a dispatched move once its write settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub kind: MoveKind,
    pub persisted: bool,
    pub notification: Notification,
}

/// Writes dispatched but not yet settled, and whether a reload is owed.
#[derive(Debug, Default)]
struct PendingWrites {
    in_flight: AtomicUsize,
    resync_owed: AtomicBool,
}

pub struct DragReconciler {
    board_id: Uuid,
    state: Arc<RwLock<BoardState>>,
    store: Arc<dyn TaskStore>,
    notifier: Arc<dyn Notifier>,
    policy: MoveFailurePolicy,
    pending: Arc<PendingWrites>,
}

impl DragReconciler {
    pub fn new(
        board_id: Uuid,
        lists: Vec<ListWithTasks>,
        store: Arc<dyn TaskStore>,
        notifier: Arc<dyn Notifier>,
        policy: MoveFailurePolicy,
    ) -> Self {
        Self {
            board_id,
            state: Arc::new(RwLock::new(BoardState::new(lists))),
            store,
            notifier,
            policy,
            pending: Arc::new(PendingWrites::default()),
        }
    }

    /// Load the board from `store` and build a reconciler for it.
    pub async fn load(
        board_id: Uuid,
        store: Arc<dyn TaskStore>,
        notifier: Arc<dyn Notifier>,
        policy: MoveFailurePolicy,
    ) -> Result<Self, TaskStoreError> {
        let lists = store.load_lists(board_id).await?;
        Ok(Self::new(board_id, lists, store, notifier, policy))
    }

    pub fn board_id(&self) -> Uuid {
        self.board_id
    }

    pub fn state(&self) -> Arc<RwLock<BoardState>> {
        Arc::clone(&self.state)
    }

    pub async fn lists(&self) -> Vec<ListWithTasks> {
        self.state.read().await.lists().to_vec()
    }

    /// Number of dispatched writes that have not settled yet.
    pub fn writes_in_flight(&self) -> usize {
        self.pending.in_flight.load(Ordering::SeqCst)
    }

    /// Replace the snapshot with the store's current lists.
    pub async fn refresh(&self) -> Result<(), TaskStoreError> {
        let lists = self.store.load_lists(self.board_id).await?;
        self.state.write().await.replace(lists);
        Ok(())
    }

    /// Apply a drag end optimistically and persist it in the background.
    ///
    /// Returns `None` when the event does not resolve to a move; nothing is
    /// changed or written in that case.
    pub async fn dispatch(&self, event: DragEvent) -> Option<JoinHandle<MoveOutcome>> {
        let (planned, previous, revision) = {
            let mut state = self.state.write().await;
            let planned = match drag::plan_move(&state, &event) {
                Ok(planned) => planned,
                Err(e) => {
                    warn!(
                        board_id = %self.board_id,
                        active_id = %event.active_id,
                        error = %e,
                        "Ignoring drag end"
                    );
                    return None;
                }
            };
            let previous = state.lists().to_vec();
            state.commit(planned.lists.clone());
            // Counted under the write lock so a deferred reload sees it.
            self.pending.in_flight.fetch_add(1, Ordering::SeqCst);
            (planned, previous, state.revision())
        };

        let kind = planned.kind();
        let writes = planned.writes;
        let board_id = self.board_id;
        let state = Arc::clone(&self.state);
        let store = Arc::clone(&self.store);
        let notifier = Arc::clone(&self.notifier);
        let pending = Arc::clone(&self.pending);
        let policy = self.policy;

        Some(tokio::spawn(async move {
            let outcome = match store.upsert_tasks(&writes).await {
                Ok(rows) => {
                    info!(%board_id, ?kind, rows, "Move persisted");
                    let notification = Notification::success(kind.success_message());
                    notifier.notify(notification.clone());
                    MoveOutcome {
                        kind,
                        persisted: true,
                        notification,
                    }
                }
                Err(e) => {
                    error!(%board_id, ?kind, error = %e, "Failed to persist move");
                    let notification = Notification::error(MSG_MOVE_FAILED);
                    notifier.notify(notification.clone());

                    let reverted = policy == MoveFailurePolicy::Revert && {
                        let mut state = state.write().await;
                        if state.revision() == revision {
                            state.commit(previous);
                            true
                        } else {
                            warn!(%board_id, "Not reverting move: board changed since");
                            false
                        }
                    };
                    if !reverted {
                        pending.resync_owed.store(true, Ordering::SeqCst);
                    }

                    MoveOutcome {
                        kind,
                        persisted: false,
                        notification,
                    }
                }
            };

            if pending.in_flight.fetch_sub(1, Ordering::SeqCst) == 1
                && pending.resync_owed.swap(false, Ordering::SeqCst)
                && let Err(e) = resync_when_idle(&*store, &state, &pending, board_id).await
            {
                error!(%board_id, error = %e, "Failed to resync board after move failure");
            }

            outcome
        }))
    }
}

/// Reload the snapshot once no write is in flight.
///
/// If a move is dispatched meanwhile the reload is left to that move's write;
/// if one was committed and settled during the load, the load is repeated.
async fn resync_when_idle(
    store: &dyn TaskStore,
    state: &RwLock<BoardState>,
    pending: &PendingWrites,
    board_id: Uuid,
) -> Result<(), TaskStoreError> {
    loop {
        let seen = state.read().await.revision();
        let lists = store.load_lists(board_id).await?;
        let mut state = state.write().await;
        if pending.in_flight.load(Ordering::SeqCst) > 0 {
            debug!(%board_id, "Deferring resync: writes still in flight");
            pending.resync_owed.store(true, Ordering::SeqCst);
            return Ok(());
        }
        if state.revision() == seen {
            state.replace(lists);
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use db::models::task::TaskRecord;

    use super::*;
    use crate::services::{
        board_state::fixtures::{board, titles},
        drag::DropTarget,
        notification::{BroadcastNotifier, NotificationLevel},
    };

    /// In-memory store that applies writes to its own lists and can be told
    /// to fail the next `n` of them.
    struct FakeStore {
        lists: Mutex<Vec<ListWithTasks>>,
        failures_left: AtomicUsize,
        writes: Mutex<Vec<Vec<TaskRecord>>>,
    }

    impl FakeStore {
        fn new(lists: Vec<ListWithTasks>) -> Self {
            Self {
                lists: Mutex::new(lists),
                failures_left: AtomicUsize::new(0),
                writes: Mutex::new(Vec::new()),
            }
        }

        fn failing(lists: Vec<ListWithTasks>) -> Self {
            Self::failing_first(lists, usize::MAX)
        }

        fn failing_first(lists: Vec<ListWithTasks>, n: usize) -> Self {
            let store = Self::new(lists);
            store.failures_left.store(n, Ordering::SeqCst);
            store
        }

        fn snapshot(&self) -> Vec<ListWithTasks> {
            self.lists.lock().unwrap().clone()
        }

        fn apply(&self, records: &[TaskRecord]) {
            let mut lists = self.lists.lock().unwrap();
            for record in records {
                let mut task = None;
                for list in lists.iter_mut() {
                    if let Some(i) = list.tasks.iter().position(|t| t.id == record.id) {
                        task = Some(list.tasks.remove(i));
                    }
                }
                let Some(mut task) = task else { continue };
                task.list_id = record.list_id;
                task.position = record.position;
                task.title = record.title.clone();
                if let Some(list) = lists.iter_mut().find(|l| l.id == record.list_id) {
                    list.tasks.push(task);
                }
            }
            for list in lists.iter_mut() {
                list.tasks.sort_by_key(|t| t.position);
            }
        }
    }

    #[async_trait]
    impl TaskStore for FakeStore {
        async fn upsert_tasks(&self, records: &[TaskRecord]) -> Result<u64, TaskStoreError> {
            self.writes.lock().unwrap().push(records.to_vec());
            let failing = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(sqlx::Error::PoolClosed.into());
            }
            self.apply(records);
            Ok(records.len() as u64)
        }

        async fn load_lists(&self, _board_id: Uuid) -> Result<Vec<ListWithTasks>, TaskStoreError> {
            Ok(self.snapshot())
        }
    }

    fn reconciler(
        store: Arc<FakeStore>,
        notifier: Arc<BroadcastNotifier>,
        policy: MoveFailurePolicy,
    ) -> DragReconciler {
        DragReconciler::new(Uuid::new_v4(), store.snapshot(), store, notifier, policy)
    }

    fn drop_on(active_id: Uuid, id: Uuid) -> DragEvent {
        DragEvent {
            active_id,
            over: Some(DropTarget {
                id,
                sortable_index: None,
            }),
        }
    }

    #[tokio::test]
    async fn successful_move_notifies_and_keeps_snapshot() {
        let fixture = board([&["a", "b"], &[], &[]]);
        let store = Arc::new(FakeStore::new(fixture.lists().to_vec()));
        let notifier = Arc::new(BroadcastNotifier::default());
        let mut rx = notifier.subscribe();
        let engine = reconciler(store.clone(), notifier, MoveFailurePolicy::Resync);

        let a = fixture.lists()[0].tasks[0].id;
        let doing = fixture.lists()[1].id;
        let outcome = engine.dispatch(drop_on(a, doing)).await.unwrap().await.unwrap();

        assert!(outcome.persisted);
        assert_eq!(outcome.kind, MoveKind::Transfer);
        assert_eq!(outcome.notification, Notification::success("Tâche déplacée"));
        assert_eq!(rx.recv().await.unwrap(), outcome.notification);

        let lists = engine.lists().await;
        assert_eq!(titles(&lists[0]), vec!["b"]);
        assert_eq!(titles(&lists[1]), vec!["a"]);
        assert_eq!(store.writes.lock().unwrap()[0].len(), 2);
        assert_eq!(engine.writes_in_flight(), 0);
    }

    #[tokio::test]
    async fn snapshot_is_updated_before_write_settles() {
        let fixture = board([&["a", "b"], &[], &[]]);
        let store = Arc::new(FakeStore::new(fixture.lists().to_vec()));
        let engine = reconciler(
            store,
            Arc::new(BroadcastNotifier::default()),
            MoveFailurePolicy::Resync,
        );

        let b = fixture.lists()[0].tasks[1].id;
        let done = fixture.lists()[2].id;
        let handle = engine.dispatch(drop_on(b, done)).await.unwrap();

        // Visible immediately, whether or not the write has run yet.
        assert_eq!(titles(&engine.lists().await[2]), vec!["b"]);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn unresolvable_event_changes_nothing() {
        let fixture = board([&["a"], &[], &[]]);
        let store = Arc::new(FakeStore::new(fixture.lists().to_vec()));
        let engine = reconciler(
            store.clone(),
            Arc::new(BroadcastNotifier::default()),
            MoveFailurePolicy::Resync,
        );
        let before = engine.state().read().await.revision();

        let ghost = Uuid::new_v4();
        assert!(engine.dispatch(drop_on(ghost, fixture.lists()[1].id)).await.is_none());
        let no_target = DragEvent {
            active_id: fixture.lists()[0].tasks[0].id,
            over: None,
        };
        assert!(engine.dispatch(no_target).await.is_none());

        assert_eq!(engine.state().read().await.revision(), before);
        assert_eq!(titles(&engine.lists().await[0]), vec!["a"]);
        assert!(store.writes.lock().unwrap().is_empty());
        assert_eq!(engine.writes_in_flight(), 0);
    }

    #[tokio::test]
    async fn failed_write_resyncs_from_store() {
        let fixture = board([&["a", "b"], &[], &[]]);
        let store = Arc::new(FakeStore::failing(fixture.lists().to_vec()));
        let notifier = Arc::new(BroadcastNotifier::default());
        let engine = reconciler(store, notifier, MoveFailurePolicy::Resync);

        let a = fixture.lists()[0].tasks[0].id;
        let outcome = engine
            .dispatch(drop_on(a, fixture.lists()[1].id))
            .await
            .unwrap()
            .await
            .unwrap();

        assert!(!outcome.persisted);
        assert_eq!(outcome.notification.level, NotificationLevel::Error);
        assert_eq!(outcome.notification.message, "Erreur lors du déplacement");

        let lists = engine.lists().await;
        assert_eq!(titles(&lists[0]), vec!["a", "b"]);
        assert!(lists[1].tasks.is_empty());
    }

    #[tokio::test]
    async fn failed_write_does_not_wipe_a_later_successful_move() {
        let fixture = board([&["a"], &[], &["z"]]);
        let store = Arc::new(FakeStore::failing_first(fixture.lists().to_vec(), 1));
        let engine = reconciler(
            store.clone(),
            Arc::new(BroadcastNotifier::default()),
            MoveFailurePolicy::Resync,
        );
        let a = fixture.lists()[0].tasks[0].id;
        let z = fixture.lists()[2].tasks[0].id;
        let doing = fixture.lists()[1].id;

        // Both moves are committed before either write runs.
        let first = engine.dispatch(drop_on(a, doing)).await.unwrap();
        let second = engine.dispatch(drop_on(z, doing)).await.unwrap();
        assert_eq!(engine.writes_in_flight(), 2);

        let first = first.await.unwrap();
        let second = second.await.unwrap();
        assert!(!first.persisted);
        assert!(second.persisted);
        assert_eq!(second.notification.message, "Tâche déplacée");
        assert_eq!(engine.writes_in_flight(), 0);

        // The second write carried the whole target list, `a` included.
        let lists = engine.lists().await;
        assert_eq!(lists, store.snapshot());
        assert!(lists[0].tasks.is_empty());
        assert_eq!(titles(&lists[1]), vec!["a", "z"]);
        assert!(lists[2].tasks.is_empty());
    }

    #[tokio::test]
    async fn failed_write_reverts_when_configured() {
        let fixture = board([&["a", "b"], &[], &[]]);
        // The store's view diverges from the snapshot so a resync would be observable.
        let store = Arc::new(FakeStore::failing(Vec::new()));
        let engine = DragReconciler::new(
            Uuid::new_v4(),
            fixture.lists().to_vec(),
            store,
            Arc::new(BroadcastNotifier::default()),
            MoveFailurePolicy::Revert,
        );

        let a = fixture.lists()[0].tasks[0].id;
        let outcome = engine
            .dispatch(drop_on(a, fixture.lists()[2].id))
            .await
            .unwrap()
            .await
            .unwrap();

        assert!(!outcome.persisted);
        let lists = engine.lists().await;
        assert_eq!(lists.len(), 3);
        assert_eq!(titles(&lists[0]), vec!["a", "b"]);
        assert!(lists[2].tasks.is_empty());
    }

    #[tokio::test]
    async fn revert_falls_back_to_resync_when_board_changed() {
        let fixture = board([&["a", "b"], &[], &[]]);
        let store = Arc::new(FakeStore::failing(fixture.lists().to_vec()));
        let engine = reconciler(
            store.clone(),
            Arc::new(BroadcastNotifier::default()),
            MoveFailurePolicy::Revert,
        );
        let a = fixture.lists()[0].tasks[0].id;

        let first = engine.dispatch(drop_on(a, fixture.lists()[1].id)).await.unwrap();
        // Single-threaded test runtime: the spawned write has not run yet.
        let state = engine.state();
        {
            let mut guard = state.write().await;
            let lists = guard.lists().to_vec();
            guard.commit(lists);
        }
        first.await.unwrap();

        let lists = engine.lists().await;
        assert_eq!(lists, store.snapshot());
        assert_eq!(titles(&lists[0]), vec!["a", "b"]);
    }
}
