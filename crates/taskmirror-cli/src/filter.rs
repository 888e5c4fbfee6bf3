//! Completion-state filtering
//!
//! Pure view over the mirrored list: no caching, recomputed from the full
//! list whenever either the filter or the list changes.

use taskmirror_core::Task;

/// Which tasks the view shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskFilter {
    All,
    #[default]
    Active,
    Completed,
}

impl TaskFilter {
    /// Every filter, in display order
    pub const ALL: [TaskFilter; 3] = [TaskFilter::All, TaskFilter::Active, TaskFilter::Completed];

    pub fn label(self) -> &'static str {
        match self {
            TaskFilter::All => "All",
            TaskFilter::Active => "Active",
            TaskFilter::Completed => "Completed",
        }
    }

    /// Does this filter admit the given task?
    pub fn matches(self, task: &Task) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Active => !task.completed,
            TaskFilter::Completed => task.completed,
        }
    }

    /// Cycle to the next filter (wrapping)
    pub fn next(self) -> Self {
        match self {
            TaskFilter::All => TaskFilter::Active,
            TaskFilter::Active => TaskFilter::Completed,
            TaskFilter::Completed => TaskFilter::All,
        }
    }
}

/// The subsequence of `tasks` admitted by `filter`, in list order
pub fn visible(filter: TaskFilter, tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().filter(|task| filter.matches(task)).collect()
}

/// How many tasks the given filter admits
pub fn count(filter: TaskFilter, tasks: &[Task]) -> usize {
    tasks.iter().filter(|task| filter.matches(task)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, completed: bool) -> Task {
        Task {
            id: id.to_string(),
            text: format!("task {}", id),
            completed,
        }
    }

    fn sample() -> Vec<Task> {
        vec![
            task("k-1", false),
            task("k-2", true),
            task("k-3", false),
            task("k-4", true),
        ]
    }

    #[test]
    fn test_default_filter_is_active() {
        assert_eq!(TaskFilter::default(), TaskFilter::Active);
    }

    #[test]
    fn test_all_is_identity() {
        let tasks = sample();
        let shown = visible(TaskFilter::All, &tasks);
        assert_eq!(shown.len(), tasks.len());
        for (shown, original) in shown.iter().zip(&tasks) {
            assert_eq!(*shown, original);
        }
    }

    #[test]
    fn test_active_and_completed_are_complementary() {
        let tasks = sample();

        let active = visible(TaskFilter::Active, &tasks);
        let completed = visible(TaskFilter::Completed, &tasks);

        assert!(active.iter().all(|t| !t.completed));
        assert!(completed.iter().all(|t| t.completed));
        assert_eq!(active.len() + completed.len(), tasks.len());
    }

    #[test]
    fn test_filter_preserves_list_order() {
        let tasks = sample();
        let active: Vec<_> = visible(TaskFilter::Active, &tasks)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(active, vec!["k-1", "k-3"]);
    }

    #[test]
    fn test_counts_match_visible_lengths() {
        let tasks = sample();
        for filter in TaskFilter::ALL {
            assert_eq!(count(filter, &tasks), visible(filter, &tasks).len());
        }
    }

    #[test]
    fn test_cycle_wraps() {
        assert_eq!(TaskFilter::All.next(), TaskFilter::Active);
        assert_eq!(TaskFilter::Active.next(), TaskFilter::Completed);
        assert_eq!(TaskFilter::Completed.next(), TaskFilter::All);
    }
}
