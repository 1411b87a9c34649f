//! In-memory snapshot of one board's lists and tasks.
//!
//! The snapshot is what gets rendered until the store confirms or rejects a
//! change. It enforces nothing on its own: the drag engine computes every new
//! arrangement through [`BoardState::apply_move`] and installs it with
//! [`BoardState::commit`].

use db::models::{list::ListWithTasks, task::Task};
use uuid::Uuid;

use super::drag::{DragResolutionError, MoveRequest};

/// Where a task sits in the current snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskLocation {
    pub list_index: usize,
    pub list_id: Uuid,
    pub task_index: usize,
}

#[derive(Debug, Clone, Default)]
pub struct BoardState {
    lists: Vec<ListWithTasks>,
    revision: u64,
}

impl BoardState {
    pub fn new(lists: Vec<ListWithTasks>) -> Self {
        Self {
            lists: sorted(lists),
            revision: 0,
        }
    }

    /// Replace the whole snapshot with fresh data from the store.
    pub fn replace(&mut self, lists: Vec<ListWithTasks>) {
        self.lists = sorted(lists);
        self.revision += 1;
    }

    /// Install a snapshot computed by [`BoardState::apply_move`].
    pub fn commit(&mut self, lists: Vec<ListWithTasks>) {
        self.lists = lists;
        self.revision += 1;
    }

    pub fn lists(&self) -> &[ListWithTasks] {
        &self.lists
    }

    /// Bumped by every `replace` and `commit`.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn task_count(&self) -> usize {
        self.lists.iter().map(|l| l.tasks.len()).sum()
    }

    pub fn find_list(&self, list_id: Uuid) -> Option<usize> {
        self.lists.iter().position(|l| l.id == list_id)
    }

    pub fn find_task(&self, task_id: Uuid) -> Option<TaskLocation> {
        self.lists
            .iter()
            .enumerate()
            .find_map(|(list_index, list)| {
                list.tasks
                    .iter()
                    .position(|t| t.id == task_id)
                    .map(|task_index| TaskLocation {
                        list_index,
                        list_id: list.id,
                        task_index,
                    })
            })
    }

    pub fn task(&self, task_id: Uuid) -> Option<&Task> {
        self.find_task(task_id)
            .map(|loc| &self.lists[loc.list_index].tasks[loc.task_index])
    }

    /// Compute the snapshot after moving a task. Never mutates `self`.
    ///
    /// Touched lists come back renumbered `0..n-1` with `list_id` matching
    /// their list; untouched lists are returned as they are.
    pub fn apply_move(
        &self,
        request: &MoveRequest,
    ) -> Result<Vec<ListWithTasks>, DragResolutionError> {
        let source_index = self
            .find_list(request.source_list_id)
            .ok_or(DragResolutionError::ListNotFound(request.source_list_id))?;
        let target_index = self
            .find_list(request.target_list_id)
            .ok_or(DragResolutionError::ListNotFound(request.target_list_id))?;
        let task_index = self.lists[source_index]
            .tasks
            .iter()
            .position(|t| t.id == request.task_id)
            .ok_or(DragResolutionError::TaskNotFound(request.task_id))?;

        let mut next = self.lists.clone();

        let mut task = next[source_index].tasks.remove(task_index);
        task.list_id = request.target_list_id;

        let target = &mut next[target_index];
        let insert_at = request.target_index.min(target.tasks.len());
        target.tasks.insert(insert_at, task);

        renumber(&mut next[source_index]);
        if target_index != source_index {
            renumber(&mut next[target_index]);
        }

        Ok(next)
    }
}

fn sorted(mut lists: Vec<ListWithTasks>) -> Vec<ListWithTasks> {
    lists.sort_by_key(|l| l.position);
    for list in &mut lists {
        list.tasks.sort_by_key(|t| t.position);
    }
    lists
}

fn renumber(list: &mut ListWithTasks) {
    let list_id = list.list.id;
    for (position, task) in list.tasks.iter_mut().enumerate() {
        task.position = position as i64;
        task.list_id = list_id;
    }
}


#[cfg(test)]
mod tests {
    use super::{fixtures::*, *};

    #[test]
    fn new_sorts_lists_and_tasks() {
        let state = board([&["a", "b"], &[], &[]]);
        let mut lists = state.lists().to_vec();
        lists.reverse();
        lists[2].tasks.reverse();

        let resorted = BoardState::new(lists);
        assert_eq!(resorted.lists()[0].title, "À faire");
        assert_eq!(titles(&resorted.lists()[0]), vec!["a", "b"]);
    }

    #[test]
    fn apply_move_does_not_mutate_receiver() {
        let state = board([&["a", "b"], &[], &[]]);
        let a = state.lists()[0].tasks[0].id;
        let request = MoveRequest {
            task_id: a,
            source_list_id: state.lists()[0].id,
            target_list_id: state.lists()[1].id,
            target_index: 0,
        };

        let next = state.apply_move(&request).unwrap();

        assert_eq!(titles(&state.lists()[0]), vec!["a", "b"]);
        assert_eq!(titles(&next[0]), vec!["b"]);
        assert_eq!(titles(&next[1]), vec!["a"]);
        assert_eq!(state.revision(), 0);
    }

    #[test]
    fn untouched_lists_keep_their_gaps() {
        let mut state = board([&["a"], &[], &[]]);
        let mut lists = state.lists().to_vec();
        let done_id = lists[2].id;
        lists[2].tasks = vec![task(done_id, "x", 3), task(done_id, "y", 7)];
        state.replace(lists);

        let a = state.lists()[0].tasks[0].id;
        let next = state
            .apply_move(&MoveRequest {
                task_id: a,
                source_list_id: state.lists()[0].id,
                target_list_id: state.lists()[1].id,
                target_index: 0,
            })
            .unwrap();

        assert_eq!(positions(&next[2]), vec![3, 7]);
    }

    #[test]
    fn commit_and_replace_bump_revision() {
        let mut state = board([&["a"], &[], &[]]);
        let snapshot = state.lists().to_vec();
        state.commit(snapshot.clone());
        state.replace(snapshot);
        assert_eq!(state.revision(), 2);
        assert_eq!(state.task_count(), 1);
    }

    #[test]
    fn find_task_reports_location() {
        let state = board([&["a"], &["b", "c"], &[]]);
        let c = state.lists()[1].tasks[1].id;

        let location = state.find_task(c).unwrap();
        assert_eq!(location.list_index, 1);
        assert_eq!(location.task_index, 1);
        assert_eq!(location.list_id, state.lists()[1].id);
        assert_eq!(state.task(c).unwrap().title, "c");
        assert!(state.find_task(Uuid::new_v4()).is_none());
    }
}
