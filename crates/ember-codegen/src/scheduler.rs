//! Cooperative generation scheduler.
//!
//! Tasks are continuation-passing state machines: a resume either completes
//! or returns [`Resume::Await`] with the id it needs and the continuation to
//! run once that id is registered. The ready queue is ordered by descending
//! priority with insertion order breaking ties, and a task that yields is
//! re-enqueued one priority lower so blocked high-priority tasks eventually
//! cede to the tasks that can produce their dependencies.
//!
//! There is no parallelism and no cancellation: a task either completes or
//! the whole build aborts. Circular waits are caught by the step cap.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

use tracing::{debug, trace};

use ember_config::Ident;

use crate::context::CoreContext;
use crate::error::{Error, Result};
use crate::registry::Handle;

/// Step cap before the scheduler declares a deadlock.
const STEP_CAP: usize = 1_000_000;

/// Entry point of a generation task.
pub type StartFn = Box<dyn FnOnce(&mut CoreContext) -> Result<Resume>>;

/// Continuation run when an awaited id becomes available.
pub type ContFn = Box<dyn FnOnce(&mut CoreContext, &Ident, &Handle) -> Result<Resume>>;

/// Outcome of resuming a task.
pub enum Resume {
    /// The task is finished.
    Done,
    /// The task suspends until `id` is registered.
    Await { id: Ident, cont: ContFn },
}

/// Suspend until `id` is registered, resuming with its handle.
pub fn get_variable(
    id: Ident,
    cont: impl FnOnce(&mut CoreContext, &Handle) -> Result<Resume> + 'static,
) -> Resume {
    Resume::Await {
        id,
        cont: Box::new(move |ctx, _full_id, handle| cont(ctx, handle)),
    }
}

/// Suspend until `id` is registered, resuming with the canonical id and the
/// handle, for callers that need the resolved type.
pub fn get_variable_with_full_id(
    id: Ident,
    cont: impl FnOnce(&mut CoreContext, &Ident, &Handle) -> Result<Resume> + 'static,
) -> Resume {
    Resume::Await {
        id,
        cont: Box::new(cont),
    }
}

/// A task still queued when the scheduler hit the step cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StalledTask {
    pub domain: String,
    /// The id the task is blocked on, or `None` if it never started.
    pub awaited: Option<String>,
}

impl fmt::Display for StalledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.awaited {
            Some(id) => write!(f, "{} (awaiting '{}')", self.domain, id),
            None => write!(f, "{} (not started)", self.domain),
        }
    }
}

enum Step {
    Start(StartFn),
    Waiting { id: Ident, cont: ContFn },
}

struct Entry {
    priority: f64,
    seq: u64,
    domain: String,
    step: Step,
}

impl Entry {
    fn describe(&self) -> StalledTask {
        StalledTask {
            domain: self.domain.clone(),
            awaited: match &self.step {
                Step::Start(_) => None,
                Step::Waiting { id, .. } => {
                    Some(id.name().unwrap_or_default().to_string())
                }
            },
        }
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.priority.to_bits() == other.priority.to_bits() && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority first, then earlier insertion.
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority-ordered cooperative task queue.
#[derive(Default)]
pub struct Scheduler {
    queue: BinaryHeap<Entry>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a task at the given priority.
    pub fn enqueue(&mut self, domain: &str, priority: f64, start: StartFn) {
        debug!(domain, priority, "enqueueing generation task");
        self.push(priority, domain.to_string(), Step::Start(start));
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    fn push(&mut self, priority: f64, domain: String, step: Step) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Entry {
            priority,
            seq,
            domain,
            step,
        });
    }

    /// Run tasks until the ready queue is empty.
    pub fn flush(&mut self, ctx: &mut CoreContext) -> Result<()> {
        let mut steps = 0usize;
        while let Some(entry) = self.queue.pop() {
            steps += 1;
            if steps > STEP_CAP {
                let mut remaining = vec![entry.describe()];
                // Sorted drain keeps the diagnostic deterministic.
                for e in std::mem::take(&mut self.queue).into_sorted_vec().iter().rev() {
                    remaining.push(e.describe());
                }
                return Err(Error::Deadlock { remaining });
            }

            let Entry {
                priority,
                domain,
                step,
                ..
            } = entry;

            match step {
                Step::Start(start) => {
                    trace!(%domain, priority, "starting task");
                    let resume = start(ctx)?;
                    self.requeue(priority, domain, resume);
                }
                Step::Waiting { id, cont } => {
                    let name = id.name().unwrap_or_default().to_string();
                    // Clone out of the registry so the continuation can
                    // mutate the context freely.
                    let found = ctx
                        .variables()
                        .lookup_full(&name)
                        .map(|(full, handle)| (full.clone(), handle.clone()));
                    match found {
                        Some((full, handle)) => {
                            trace!(%domain, id = %name, "resuming task");
                            let resume = cont(ctx, &full, &handle)?;
                            self.requeue(priority, domain, resume);
                        }
                        None => {
                            trace!(%domain, id = %name, "still waiting for variable");
                            self.push(priority - 1.0, domain, Step::Waiting { id, cont });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn requeue(&mut self, priority: f64, domain: String, resume: Resume) {
        match resume {
            Resume::Done => {
                trace!(%domain, "task finished");
            }
            Resume::Await { id, cont } => {
                // A yield always costs one priority step.
                self.push(priority - 1.0, domain, Step::Waiting { id, cont });
            }
        }
    }
}
