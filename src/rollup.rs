//! Derived task status and progress over the subtask tree.
//!
//! A task's stored status is authoritative only while it has no subtasks.
//! Once children exist, the effective status is derived from the recursively
//! computed statuses of the direct children, with a strict precedence:
//!
//! 1. every child Complete        -> Complete
//! 2. any child On Hold           -> On Hold
//! 3. any child In Progress or Complete -> In Progress
//! 4. otherwise (no child started) -> the task's own stored status
//!
//! A single stalled subtask therefore blocks its parent from reading
//! "In Progress" even when the remaining siblings are done, and a manually
//! set parent status survives until some child actually starts.
//!
//! The parent relation is expected to form a forest, but a bad edit can
//! introduce cycles; every recursion here is visited-set guarded and falls
//! back to the stored status instead of looping.

use std::collections::HashSet;

use crate::fields::Status;
use crate::task::Task;

/// Effective status of `item`, derived from its subtree.
pub fn compute_status(item: &Task, all: &[Task]) -> Status {
    let mut visited = HashSet::new();
    compute_status_guarded(item, all, &mut visited)
}

fn compute_status_guarded(item: &Task, all: &[Task], visited: &mut HashSet<u64>) -> Status {
    if !visited.insert(item.id) {
        // parent cycle: treat the re-entered node as a leaf
        return item.status;
    }

    let children: Vec<&Task> = all.iter().filter(|t| t.parent == Some(item.id)).collect();
    if children.is_empty() {
        return item.status;
    }

    let child_statuses: Vec<Status> = children
        .iter()
        .map(|c| compute_status_guarded(c, all, visited))
        .collect();

    if child_statuses.iter().all(|s| *s == Status::Complete) {
        return Status::Complete;
    }
    if child_statuses.iter().any(|s| *s == Status::OnHold) {
        return Status::OnHold;
    }
    if child_statuses
        .iter()
        .any(|s| matches!(s, Status::InProgress | Status::Complete))
    {
        return Status::InProgress;
    }

    item.status
}

/// Completion percentage of `item`.
///
/// For a task with subtasks this is the share of direct children whose
/// *computed* status is Complete, rounded to the nearest integer, so nested
/// sub-subtasks roll up correctly. For a leaf it is the stored progress.
pub fn compute_progress(item: &Task, all: &[Task]) -> u8 {
    let children: Vec<&Task> = all.iter().filter(|t| t.parent == Some(item.id)).collect();
    if children.is_empty() {
        return item.progress.min(100);
    }
    let completed = children
        .iter()
        .filter(|c| compute_status(c, all) == Status::Complete)
        .count();
    ((completed as f64 / children.len() as f64) * 100.0).round() as u8
}

/// Ancestor chain of a task, closest first, bounded against parent cycles.
pub fn ancestor_chain(task_id: u64, tasks: &[Task]) -> Vec<u64> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    seen.insert(task_id);
    let mut cur = tasks.iter().find(|t| t.id == task_id).and_then(|t| t.parent);
    while let Some(pid) = cur {
        if !seen.insert(pid) {
            break;
        }
        // Dangling parent references end the chain.
        let Some(parent) = tasks.iter().find(|t| t.id == pid) else {
            break;
        };
        chain.push(pid);
        cur = parent.parent;
    }
    chain
}

/// Ancestors whose stored status no longer matches their computed status,
/// child-before-parent.
///
/// This is the pure half of the upward cascade: after mutating a task the
/// caller applies these updates in order and persists once, so no parent is
/// ever recomputed from a stale child value.
pub fn stale_ancestors(task_id: u64, tasks: &[Task]) -> Vec<(u64, Status)> {
    ancestor_chain(task_id, tasks)
        .into_iter()
        .filter_map(|pid| {
            let parent = tasks.iter().find(|t| t.id == pid)?;
            let computed = compute_status(parent, tasks);
            (computed != parent.status).then_some((pid, computed))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Priority;

    fn task(id: u64, parent: Option<u64>, status: Status) -> Task {
        Task {
            id,
            title: format!("Task {id}"),
            description: None,
            status,
            priority: Priority::Medium,
            assignee: 1,
            created_by: 1,
            due: None,
            total_target: None,
            progress: 0,
            parent,
            created_at_utc: 0,
            updated_at_utc: 0,
        }
    }

    #[test]
    fn test_leaf_passthrough_every_status() {
        for s in [Status::NotStarted, Status::InProgress, Status::OnHold, Status::Complete] {
            let tasks = vec![task(1, None, s)];
            assert_eq!(compute_status(&tasks[0], &tasks), s);
        }
    }

    #[test]
    fn test_all_children_complete() {
        // Parent stored as Not Started; children override it entirely.
        let tasks = vec![
            task(1, None, Status::NotStarted),
            task(2, Some(1), Status::Complete),
            task(3, Some(1), Status::Complete),
            task(4, Some(1), Status::Complete),
        ];
        assert_eq!(compute_status(&tasks[0], &tasks), Status::Complete);
    }

    #[test]
    fn test_on_hold_dominates_mixed_children() {
        let tasks = vec![
            task(1, None, Status::InProgress),
            task(2, Some(1), Status::Complete),
            task(3, Some(1), Status::OnHold),
            task(4, Some(1), Status::NotStarted),
        ];
        assert_eq!(compute_status(&tasks[0], &tasks), Status::OnHold);
    }

    #[test]
    fn test_mixed_progress_reads_in_progress() {
        let tasks = vec![
            task(1, None, Status::NotStarted),
            task(2, Some(1), Status::Complete),
            task(3, Some(1), Status::NotStarted),
        ];
        assert_eq!(compute_status(&tasks[0], &tasks), Status::InProgress);
    }

    #[test]
    fn test_no_child_started_falls_back_to_stored() {
        let tasks = vec![
            task(1, None, Status::OnHold),
            task(2, Some(1), Status::NotStarted),
            task(3, Some(1), Status::NotStarted),
        ];
        // Manually parked parent keeps reading On Hold.
        assert_eq!(compute_status(&tasks[0], &tasks), Status::OnHold);
    }

    #[test]
    fn test_on_hold_propagates_through_levels() {
        // Grandchild on hold parks the whole chain.
        let tasks = vec![
            task(1, None, Status::NotStarted),
            task(2, Some(1), Status::NotStarted),
            task(3, Some(2), Status::OnHold),
            task(4, Some(1), Status::Complete),
        ];
        assert_eq!(compute_status(&tasks[1], &tasks), Status::OnHold);
        assert_eq!(compute_status(&tasks[0], &tasks), Status::OnHold);
    }

    #[test]
    fn test_progress_counts_computed_child_status() {
        // Child 2 is Complete only by derivation from its own child.
        let tasks = vec![
            task(1, None, Status::NotStarted),
            task(2, Some(1), Status::NotStarted),
            task(3, Some(2), Status::Complete),
            task(4, Some(1), Status::NotStarted),
        ];
        assert_eq!(compute_status(&tasks[1], &tasks), Status::Complete);
        assert_eq!(compute_progress(&tasks[0], &tasks), 50);
    }

    #[test]
    fn test_progress_rounding_and_leaf() {
        let mut tasks = vec![
            task(1, None, Status::NotStarted),
            task(2, Some(1), Status::Complete),
            task(3, Some(1), Status::NotStarted),
            task(4, Some(1), Status::NotStarted),
        ];
        // 1 of 3 complete -> 33%.
        assert_eq!(compute_progress(&tasks[0], &tasks), 33);

        // Leaf progress comes straight from the stored field.
        tasks[2].progress = 40;
        assert_eq!(compute_progress(&tasks[2], &tasks), 40);
    }

    #[test]
    fn test_parent_cycle_terminates() {
        let tasks = vec![
            task(1, Some(2), Status::InProgress),
            task(2, Some(1), Status::NotStarted),
        ];
        // Both directions terminate and yield a defined status.
        let _ = compute_status(&tasks[0], &tasks);
        let _ = compute_status(&tasks[1], &tasks);
        let _ = compute_progress(&tasks[0], &tasks);
        assert_eq!(ancestor_chain(1, &tasks), vec![2]);
    }

    #[test]
    fn test_stale_ancestors_child_before_parent() {
        // 3 -> 2 -> 1; completing 3 makes both ancestors stale.
        let tasks = vec![
            task(1, None, Status::NotStarted),
            task(2, Some(1), Status::NotStarted),
            task(3, Some(2), Status::Complete),
        ];
        let updates = stale_ancestors(3, &tasks);
        assert_eq!(updates, vec![(2, Status::Complete), (1, Status::Complete)]);
    }

    #[test]
    fn test_stale_ancestors_skips_in_sync_parents() {
        let tasks = vec![
            task(1, None, Status::InProgress),
            task(2, Some(1), Status::InProgress),
            task(3, Some(2), Status::InProgress),
        ];
        assert!(stale_ancestors(3, &tasks).is_empty());
    }

    #[test]
    fn test_dangling_parent_treated_as_root() {
        let tasks = vec![task(1, Some(42), Status::InProgress)];
        assert_eq!(compute_status(&tasks[0], &tasks), Status::InProgress);
        assert!(ancestor_chain(1, &tasks).is_empty());
        assert!(stale_ancestors(1, &tasks).is_empty());
    }
}
