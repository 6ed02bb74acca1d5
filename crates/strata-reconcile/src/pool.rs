//! Bounded scoped worker pool.
//!
//! Workers pull task indices from a shared cursor until the queue drains
//! or the deadline passes. A task that panics is caught and reported; it
//! never takes down its worker's siblings.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// How one task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult<R> {
    Done(R),
    Panicked(String),
    /// The deadline passed before the task was dispatched.
    NotStarted,
}

/// Run `task` over every item with at most `workers` threads.
///
/// Results are returned in item order. Once `deadline` has passed no new
/// task is dispatched; tasks already running are left to finish.
pub fn run_bounded<T, R, F>(
    items: &[T],
    workers: usize,
    deadline: Option<Instant>,
    task: F,
) -> Vec<TaskResult<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    if items.is_empty() {
        return Vec::new();
    }

    let next = AtomicUsize::new(0);
    let slots: Mutex<Vec<Option<TaskResult<R>>>> =
        Mutex::new((0..items.len()).map(|_| None).collect());
    let workers = workers.clamp(1, items.len());

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    return;
                }
                let idx = next.fetch_add(1, Ordering::Relaxed);
                if idx >= items.len() {
                    return;
                }
                let result = match panic::catch_unwind(AssertUnwindSafe(|| task(&items[idx]))) {
                    Ok(value) => TaskResult::Done(value),
                    Err(payload) => TaskResult::Panicked(panic_message(payload.as_ref())),
                };
                if let Ok(mut guard) = slots.lock() {
                    guard[idx] = Some(result);
                }
            });
        }
    });

    slots
        .into_inner()
        .unwrap_or_else(|e| e.into_inner())
        .into_iter()
        .map(|slot| slot.unwrap_or(TaskResult::NotStarted))
        .collect()
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
