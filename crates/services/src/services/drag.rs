//! Drag-end resolution: turn a drop event into a concrete move and the task
//! rows that have to be written back.

use db::models::{list::ListWithTasks, task::TaskRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use super::{
    board_state::BoardState,
    notification::{MSG_REORDERED, MSG_TASK_MOVED},
};

/// Drag-end event as reported by the board surface.
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq, Eq)]
pub struct DragEvent {
    /// The dragged task.
    pub active_id: Uuid,
    /// What it was released over; `None` when dropped outside any target.
    pub over: Option<DropTarget>,
}

/// A drop target: either a list area or another task card.
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq, Eq)]
pub struct DropTarget {
    pub id: Uuid,
    /// Index reported by the sortable container, if any.
    #[serde(default)]
    pub sortable_index: Option<usize>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DragResolutionError {
    #[error("Drop target missing")]
    NoDropTarget,
    #[error("Source task not found: {0}")]
    TaskNotFound(Uuid),
    #[error("Target not found: {0}")]
    TargetNotFound(Uuid),
    #[error("List not found: {0}")]
    ListNotFound(Uuid),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    /// Within one list.
    Reorder,
    /// From one list to another.
    Transfer,
}

impl MoveKind {
    pub fn success_message(self) -> &'static str {
        match self {
            MoveKind::Reorder => MSG_REORDERED,
            MoveKind::Transfer => MSG_TASK_MOVED,
        }
    }
}

/// A fully resolved move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    pub task_id: Uuid,
    pub source_list_id: Uuid,
    pub target_list_id: Uuid,
    /// Insert position in the target list; clamped to its length.
    pub target_index: usize,
}

impl MoveRequest {
    pub fn kind(&self) -> MoveKind {
        if self.source_list_id == self.target_list_id {
            MoveKind::Reorder
        } else {
            MoveKind::Transfer
        }
    }
}

/// The outcome of planning a drag: the next snapshot and the rows to persist.
#[derive(Debug, Clone)]
pub struct PlannedMove {
    pub request: MoveRequest,
    pub lists: Vec<ListWithTasks>,
    /// Every task of every touched list, source list first.
    pub writes: Vec<TaskRecord>,
}

impl PlannedMove {
    pub fn kind(&self) -> MoveKind {
        self.request.kind()
    }
}

/// Resolve a drag-end event against the current snapshot.
///
/// `over.id` may name a list (drop into its area) or a task (drop onto a card,
/// meaning the list holding that card). Without a sortable index, a same-list
/// drop keeps the task where it is, a drop onto a card takes that card's index
/// and a drop into another list's area appends.
pub fn resolve(state: &BoardState, event: &DragEvent) -> Result<MoveRequest, DragResolutionError> {
    let over = event
        .over
        .as_ref()
        .ok_or(DragResolutionError::NoDropTarget)?;

    let source = state
        .find_task(event.active_id)
        .ok_or(DragResolutionError::TaskNotFound(event.active_id))?;

    let (target_list_id, default_index) = if let Some(list_index) = state.find_list(over.id) {
        let target = &state.lists()[list_index];
        let default_index = if target.id == source.list_id {
            source.task_index
        } else {
            target.tasks.len()
        };
        (target.id, default_index)
    } else if let Some(card) = state.find_task(over.id) {
        (card.list_id, card.task_index)
    } else {
        return Err(DragResolutionError::TargetNotFound(over.id));
    };

    Ok(MoveRequest {
        task_id: event.active_id,
        source_list_id: source.list_id,
        target_list_id,
        target_index: over.sortable_index.unwrap_or(default_index),
    })
}

/// Resolve `event`, compute the next snapshot and collect the writes.
pub fn plan_move(state: &BoardState, event: &DragEvent) -> Result<PlannedMove, DragResolutionError> {
    let request = resolve(state, event)?;
    let lists = state.apply_move(&request)?;

    let mut writes = Vec::new();
    for list_id in touched_lists(&request) {
        if let Some(list) = lists.iter().find(|l| l.id == list_id) {
            writes.extend(list.tasks.iter().map(TaskRecord::from));
        }
    }

    Ok(PlannedMove {
        request,
        lists,
        writes,
    })
}

fn touched_lists(request: &MoveRequest) -> Vec<Uuid> {
    match request.kind() {
        MoveKind::Reorder => vec![request.source_list_id],
        MoveKind::Transfer => vec![request.source_list_id, request.target_list_id],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::board_state::fixtures::{board, positions, titles};

    fn drop_on(active_id: Uuid, id: Uuid, sortable_index: Option<usize>) -> DragEvent {
        DragEvent {
            active_id,
            over: Some(DropTarget { id, sortable_index }),
        }
    }

    #[test]
    fn same_list_same_index_is_idempotent() {
        let state = board([&["a", "b", "c"], &[], &[]]);
        let todo = state.lists()[0].id;
        let b = state.lists()[0].tasks[1].id;

        let planned = plan_move(&state, &drop_on(b, todo, Some(1))).unwrap();

        assert_eq!(planned.kind(), MoveKind::Reorder);
        assert_eq!(titles(&planned.lists[0]), vec!["a", "b", "c"]);
        assert_eq!(positions(&planned.lists[0]), vec![0, 1, 2]);
        // The whole list is still written back.
        assert_eq!(planned.writes.len(), 3);
        assert!(planned.writes.iter().all(|w| w.list_id == todo));
    }

    #[test]
    fn same_list_reorder_moves_and_renumbers() {
        let state = board([&["a", "b", "c"], &["x"], &[]]);
        let todo = state.lists()[0].id;
        let a = state.lists()[0].tasks[0].id;

        let planned = plan_move(&state, &drop_on(a, todo, Some(2))).unwrap();

        assert_eq!(titles(&planned.lists[0]), vec!["b", "c", "a"]);
        assert_eq!(positions(&planned.lists[0]), vec![0, 1, 2]);
        assert_eq!(planned.writes.len(), 3);
        assert_eq!(titles(&planned.lists[1]), vec!["x"]);
    }

    #[test]
    fn same_list_without_index_keeps_position() {
        let state = board([&["a", "b"], &[], &[]]);
        let todo = state.lists()[0].id;
        let a = state.lists()[0].tasks[0].id;

        let request = resolve(&state, &drop_on(a, todo, None)).unwrap();
        assert_eq!(request.target_index, 0);
    }

    #[test]
    fn cross_list_move_conserves_tasks() {
        let state = board([&["a", "b", "c"], &["x", "y"], &[]]);
        let doing = state.lists()[1].id;
        let b = state.lists()[0].tasks[1].id;

        let planned = plan_move(&state, &drop_on(b, doing, Some(1))).unwrap();

        assert_eq!(planned.kind(), MoveKind::Transfer);
        let total: usize = planned.lists.iter().map(|l| l.tasks.len()).sum();
        assert_eq!(total, state.task_count());

        assert_eq!(titles(&planned.lists[0]), vec!["a", "c"]);
        assert_eq!(positions(&planned.lists[0]), vec![0, 1]);
        assert_eq!(titles(&planned.lists[1]), vec!["x", "b", "y"]);
        assert_eq!(positions(&planned.lists[1]), vec![0, 1, 2]);

        let moved = planned.writes.iter().find(|w| w.id == b).unwrap();
        assert_eq!(moved.list_id, doing);
        assert_eq!(moved.position, 1);
        assert_eq!(planned.writes.len(), 5);
    }

    #[test]
    fn cross_list_without_index_appends() {
        let state = board([&["a"], &["x", "y"], &[]]);
        let doing = state.lists()[1].id;
        let a = state.lists()[0].tasks[0].id;

        let planned = plan_move(&state, &drop_on(a, doing, None)).unwrap();
        assert_eq!(titles(&planned.lists[1]), vec!["x", "y", "a"]);
    }

    #[test]
    fn drop_into_empty_list_lands_at_zero() {
        let state = board([&["a"], &[], &[]]);
        let done = state.lists()[2].id;
        let a = state.lists()[0].tasks[0].id;

        let planned = plan_move(&state, &drop_on(a, done, None)).unwrap();

        assert!(planned.lists[0].tasks.is_empty());
        assert_eq!(positions(&planned.lists[2]), vec![0]);
        assert_eq!(planned.lists[2].tasks[0].list_id, done);
    }

    #[test]
    fn index_past_end_is_clamped() {
        let state = board([&["a"], &["x"], &[]]);
        let doing = state.lists()[1].id;
        let a = state.lists()[0].tasks[0].id;

        let planned = plan_move(&state, &drop_on(a, doing, Some(42))).unwrap();
        assert_eq!(titles(&planned.lists[1]), vec!["x", "a"]);
        assert_eq!(positions(&planned.lists[1]), vec![0, 1]);
    }

    #[test]
    fn drop_onto_card_targets_its_list() {
        let state = board([&["a"], &["x", "y"], &[]]);
        let a = state.lists()[0].tasks[0].id;
        let y = state.lists()[1].tasks[1].id;

        let request = resolve(&state, &drop_on(a, y, None)).unwrap();
        assert_eq!(request.target_list_id, state.lists()[1].id);
        assert_eq!(request.target_index, 1);

        let planned = plan_move(&state, &drop_on(a, y, None)).unwrap();
        assert_eq!(titles(&planned.lists[1]), vec!["x", "a", "y"]);
    }

    #[test]
    fn missing_source_task_is_rejected() {
        let state = board([&["a"], &[], &[]]);
        let ghost = Uuid::new_v4();

        let err = plan_move(&state, &drop_on(ghost, state.lists()[1].id, None)).unwrap_err();
        assert_eq!(err, DragResolutionError::TaskNotFound(ghost));
    }

    #[test]
    fn unknown_target_is_rejected() {
        let state = board([&["a"], &[], &[]]);
        let a = state.lists()[0].tasks[0].id;
        let nowhere = Uuid::new_v4();

        let err = resolve(&state, &drop_on(a, nowhere, None)).unwrap_err();
        assert_eq!(err, DragResolutionError::TargetNotFound(nowhere));
    }

    #[test]
    fn missing_drop_target_is_rejected() {
        let state = board([&["a"], &[], &[]]);
        let event = DragEvent {
            active_id: state.lists()[0].tasks[0].id,
            over: None,
        };
        assert_eq!(
            resolve(&state, &event).unwrap_err(),
            DragResolutionError::NoDropTarget
        );
    }

    #[test]
    fn success_messages() {
        assert_eq!(MoveKind::Reorder.success_message(), "Réordonné");
        assert_eq!(MoveKind::Transfer.success_message(), "Tâche déplacée");
    }
}
