use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, MutexGuard},
};

use tokio::task::{AbortHandle, JoinHandle};
use tracing::info;

use super::ActionKind;
use crate::error::ActionError;

struct InFlight {
    generation: u64,
    handle: AbortHandle,
    submitted: bool,
}

#[derive(Default)]
struct TaskTable {
    next_generation: u64,
    in_flight: HashMap<ActionKind, InFlight>,
}

type SharedTable = Arc<Mutex<TaskTable>>;

fn lock(table: &Mutex<TaskTable>) -> MutexGuard<'_, TaskTable> {
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One running task per action kind.
///
/// Spawning a kind that is already running aborts the older task unless it
/// has submitted a transaction; a submitted task always runs to completion.
/// Tasks commit their own results and clear their own entry, so nothing is
/// lost when the caller stops waiting.
#[derive(Default)]
pub struct ActionTasks {
    table: SharedTable,
}

/// Ticket returned by [`ActionTasks::spawn`], needed to collect the result.
pub struct ActionTicket<T> {
    handle: JoinHandle<Result<T, ActionError>>,
}

/// Handed to every spawned action. Claiming it before sending a transaction
/// makes the task immune to being superseded.
pub struct Submission {
    table: SharedTable,
    kind: ActionKind,
    generation: u64,
}

/// Removes the task's entry when its future completes, panics or is aborted.
struct Finish {
    table: SharedTable,
    kind: ActionKind,
    generation: u64,
}

impl ActionTasks {
    pub fn spawn<T, A, F>(&self, kind: ActionKind, action: A) -> ActionTicket<T>
    where
        T: Send + 'static,
        A: FnOnce(Submission) -> F,
        F: Future<Output = Result<T, ActionError>> + Send + 'static,
    {
        let mut table = lock(&self.table);
        table.next_generation += 1;
        let generation = table.next_generation;

        let future = action(Submission {
            table: self.table.clone(),
            kind,
            generation,
        });
        let finish = Finish {
            table: self.table.clone(),
            kind,
            generation,
        };
        let handle = tokio::spawn(async move {
            let _finish = finish;
            future.await
        });

        let previous = table.in_flight.insert(
            kind,
            InFlight {
                generation,
                handle: handle.abort_handle(),
                submitted: false,
            },
        );
        drop(table);

        match previous {
            Some(previous) if previous.submitted => {
                info!("Stale {} already submitted its transaction, letting it finish", kind)
            }
            Some(previous) => {
                info!("Cancelling stale {} request", kind);
                previous.handle.abort();
            }
            None => {}
        }

        ActionTicket { handle }
    }

    pub fn in_flight(&self) -> Vec<ActionKind> {
        let mut kinds: Vec<ActionKind> = lock(&self.table).in_flight.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Aborts every task that has not submitted a transaction yet.
    pub fn abort_all(&self) {
        let aborted: Vec<InFlight> = {
            let mut table = lock(&self.table);
            let kinds: Vec<ActionKind> = table
                .in_flight
                .iter()
                .filter(|(_, entry)| !entry.submitted)
                .map(|(kind, _)| *kind)
                .collect();
            kinds
                .into_iter()
                .filter_map(|kind| table.in_flight.remove(&kind))
                .collect()
        };

        for entry in aborted {
            entry.handle.abort();
        }
    }
}

impl<T> ActionTicket<T> {
    /// Waits for the task. Dropping this future leaves the task running.
    pub async fn join(self) -> Result<T, ActionError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(ActionError::Cancelled),
            Err(e) => Err(ActionError::TaskFailed(e.to_string())),
        }
    }
}

impl Submission {
    /// Fails with [`ActionError::Cancelled`] if a newer request of the same
    /// kind already took over.
    pub fn claim(&self) -> Result<(), ActionError> {
        match lock(&self.table).in_flight.get_mut(&self.kind) {
            Some(entry) if entry.generation == self.generation => {
                entry.submitted = true;
                Ok(())
            }
            _ => Err(ActionError::Cancelled),
        }
    }
}

impl Drop for Finish {
    fn drop(&mut self) {
        let mut table = lock(&self.table);
        if table
            .in_flight
            .get(&self.kind)
            .is_some_and(|entry| entry.generation == self.generation)
        {
            table.in_flight.remove(&self.kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_newer_request_cancels_older() {
        let tasks = ActionTasks::default();

        let stale = tasks.spawn(ActionKind::CheckAllowance, |_| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(1)
        });
        let fresh = tasks.spawn(ActionKind::CheckAllowance, |_| async { Ok(2) });

        assert_eq!(stale.join().await, Err(ActionError::Cancelled));
        assert_eq!(fresh.join().await, Ok(2));
        assert!(tasks.in_flight().is_empty());
    }

    #[tokio::test]
    async fn test_submitted_task_outlives_newer_request() {
        let tasks = ActionTasks::default();

        let stale = tasks.spawn(ActionKind::DeployCallback, |submission| async move {
            submission.claim()?;
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok("first")
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        let fresh = tasks.spawn(ActionKind::DeployCallback, |_| async { Ok("second") });

        assert_eq!(stale.join().await, Ok("first"));
        assert_eq!(fresh.join().await, Ok("second"));
        assert!(tasks.in_flight().is_empty());
    }

    #[tokio::test]
    async fn test_superseded_task_cannot_claim() {
        let tasks = ActionTasks::default();

        let stale = tasks.spawn(ActionKind::ApproveCollateral, |submission| async move {
            tokio::task::yield_now().await;
            submission.claim()
        });
        let fresh = tasks.spawn(ActionKind::ApproveCollateral, |submission| async move {
            submission.claim()
        });

        assert_eq!(stale.join().await, Err(ActionError::Cancelled));
        assert_eq!(fresh.join().await, Ok(()));
    }

    #[tokio::test]
    async fn test_task_clears_its_entry_without_a_caller() {
        let tasks = ActionTasks::default();

        let ticket = tasks.spawn(ActionKind::FetchHealthFactor, |_| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(())
        });
        assert_eq!(tasks.in_flight(), vec![ActionKind::FetchHealthFactor]);
        drop(ticket);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(tasks.in_flight().is_empty());
    }

    #[tokio::test]
    async fn test_distinct_kinds_run_side_by_side() {
        let tasks = ActionTasks::default();

        let approve = tasks.spawn(ActionKind::ApproveCollateral, |_| async { Ok("approve") });
        let allowance = tasks.spawn(ActionKind::CheckAllowance, |_| async { Ok("allowance") });
        assert_eq!(
            tasks.in_flight(),
            vec![ActionKind::ApproveCollateral, ActionKind::CheckAllowance]
        );

        assert_eq!(approve.join().await, Ok("approve"));
        assert_eq!(allowance.join().await, Ok("allowance"));
    }

    #[tokio::test]
    async fn test_abort_all_spares_submitted_tasks() {
        let tasks = ActionTasks::default();

        let read = tasks.spawn(ActionKind::CheckAllowance, |_| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        });
        let deploy = tasks.spawn(ActionKind::DeployReactive, |submission| async move {
            submission.claim()?;
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(())
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        tasks.abort_all();

        assert_eq!(tasks.in_flight(), vec![ActionKind::DeployReactive]);
        assert_eq!(read.join().await, Err(ActionError::Cancelled));
        assert_eq!(deploy.join().await, Ok(()));
        assert!(tasks.in_flight().is_empty());
    }

    #[tokio::test]
    async fn test_panicking_task_is_reported() {
        let tasks = ActionTasks::default();
        async fn explode() -> Result<(), ActionError> {
            panic!("boom")
        }
        let ticket = tasks.spawn(ActionKind::DeployReactive, |_| explode());

        assert!(matches!(ticket.join().await, Err(ActionError::TaskFailed(_))));
        assert!(tasks.in_flight().is_empty());
    }
}
