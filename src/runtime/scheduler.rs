//! Cooperative task scheduler
//!
//! Single-threaded, single run-loop concurrency: tasks interleave only at
//! explicit yield points, so no data race between tasks is possible. A task
//! body is an explicit state-machine callback returning [`TaskStep`]; the
//! scheduler moves tasks between one FIFO ready queue and one suspended set,
//! and every spawned task produces exactly one externally observable
//! [`Promise`].
//!
//! There is deliberately no timeout or cancellation primitive: a task slice
//! that never returns blocks the tick forever, and a task suspended on a
//! promise nobody settles keeps the loop spinning. Both are documented
//! behavior, not bugs to patch with preemption.

use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::runtime::error::{RtResult, RuntimeError};
use crate::runtime::value::Value;

/// What a task slice did with its turn.
pub enum TaskStep {
    /// Suspend; the scheduler will offer another slice on a later tick.
    Yield,
    /// Finished with a result.
    Done(Value),
}

/// A task body: called once per slice.
pub type TaskFn = Box<dyn FnMut() -> RtResult<TaskStep>>;

/// Task lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Ready,
    Suspended,
    Completed,
    Failed,
}

/// Promise settlement states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseState {
    Pending,
    Fulfilled,
    Rejected,
}

type FulfillCallback = Box<dyn FnOnce(&Value)>;
type RejectCallback = Box<dyn FnOnce(&str)>;

struct PromiseInner {
    state: PromiseState,
    result: Option<Value>,
    error: Option<String>,
    on_fulfilled: Vec<FulfillCallback>,
    on_rejected: Vec<RejectCallback>,
}

/// A one-shot settleable future handle.
///
/// `pending -> fulfilled` and `pending -> rejected` are the only transitions;
/// settling twice is a hard error.
#[derive(Clone)]
pub struct Promise(Rc<RefCell<PromiseInner>>);

impl std::fmt::Debug for Promise {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

impl Default for Promise {
    fn default() -> Self {
        Self::new()
    }
}

impl Promise {
    /// A fresh pending promise.
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(PromiseInner {
            state: PromiseState::Pending,
            result: None,
            error: None,
            on_fulfilled: Vec::new(),
            on_rejected: Vec::new(),
        })))
    }

    /// An already-fulfilled promise.
    pub fn resolved(value: Value) -> Self {
        let promise = Self::new();
        promise
            .resolve(value)
            .expect("a fresh promise cannot already be settled");
        promise
    }

    /// An already-rejected promise.
    pub fn rejected(error: impl Into<String>) -> Self {
        let promise = Self::new();
        promise
            .reject(error)
            .expect("a fresh promise cannot already be settled");
        promise
    }

    /// Fulfill with a value. Erring when already settled.
    pub fn resolve(
        &self,
        value: Value,
    ) -> RtResult<()> {
        let callbacks = {
            let mut inner = self.0.borrow_mut();
            if inner.state != PromiseState::Pending {
                return Err(RuntimeError::Value(
                    "Promise is already settled".to_string(),
                ));
            }
            inner.state = PromiseState::Fulfilled;
            inner.result = Some(value.clone());
            inner.on_rejected.clear();
            std::mem::take(&mut inner.on_fulfilled)
        };
        for callback in callbacks {
            callback(&value);
        }
        Ok(())
    }

    /// Reject with an error message. Erring when already settled.
    pub fn reject(
        &self,
        error: impl Into<String>,
    ) -> RtResult<()> {
        let error = error.into();
        let callbacks = {
            let mut inner = self.0.borrow_mut();
            if inner.state != PromiseState::Pending {
                return Err(RuntimeError::Value(
                    "Promise is already settled".to_string(),
                ));
            }
            inner.state = PromiseState::Rejected;
            inner.error = Some(error.clone());
            inner.on_fulfilled.clear();
            std::mem::take(&mut inner.on_rejected)
        };
        for callback in callbacks {
            callback(&error);
        }
        Ok(())
    }

    /// Run `callback` when fulfilled, immediately if already fulfilled.
    /// Ignored on rejection.
    pub fn then(
        &self,
        callback: impl FnOnce(&Value) + 'static,
    ) {
        let run_now = {
            let inner = self.0.borrow();
            match inner.state {
                PromiseState::Fulfilled => Some(inner.result.clone().unwrap_or_default()),
                PromiseState::Pending => None,
                PromiseState::Rejected => return,
            }
        };
        match run_now {
            Some(value) => callback(&value),
            None => self.0.borrow_mut().on_fulfilled.push(Box::new(callback)),
        }
    }

    /// Run `callback` when rejected, immediately if already rejected.
    /// Ignored on fulfillment.
    pub fn on_rejected(
        &self,
        callback: impl FnOnce(&str) + 'static,
    ) {
        let run_now = {
            let inner = self.0.borrow();
            match inner.state {
                PromiseState::Rejected => inner.error.clone(),
                PromiseState::Pending => None,
                PromiseState::Fulfilled => return,
            }
        };
        match run_now {
            Some(error) => callback(&error),
            None => self.0.borrow_mut().on_rejected.push(Box::new(callback)),
        }
    }

    pub fn state(&self) -> PromiseState {
        self.0.borrow().state
    }

    pub fn is_pending(&self) -> bool {
        self.state() == PromiseState::Pending
    }

    pub fn is_fulfilled(&self) -> bool {
        self.state() == PromiseState::Fulfilled
    }

    pub fn is_rejected(&self) -> bool {
        self.state() == PromiseState::Rejected
    }

    pub fn is_settled(&self) -> bool {
        self.state() != PromiseState::Pending
    }

    /// The fulfilled value, if fulfilled.
    pub fn result(&self) -> Option<Value> {
        self.0.borrow().result.clone()
    }

    /// The rejection message, if rejected.
    pub fn error_message(&self) -> Option<String> {
        self.0.borrow().error.clone()
    }

    /// Identity comparison for the `equals` fallback.
    pub fn ptr_eq(
        &self,
        other: &Promise,
    ) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Display form, also used by `Value`'s rendering.
    pub fn describe(&self) -> String {
        let inner = self.0.borrow();
        match inner.state {
            PromiseState::Pending => "Promise{PENDING}".to_string(),
            PromiseState::Fulfilled => format!(
                "Promise{{FULFILLED: {}}}",
                inner.result.clone().unwrap_or_default()
            ),
            PromiseState::Rejected => format!(
                "Promise{{REJECTED: {}}}",
                inner.error.clone().unwrap_or_default()
            ),
        }
    }
}

struct Task {
    id: u64,
    body: TaskFn,
    state: TaskState,
    promise: Promise,
    dependencies: Vec<Promise>,
    error: Option<String>,
}

impl Task {
    fn dependencies_satisfied(&self) -> bool {
        self.dependencies.iter().all(Promise::is_settled)
    }
}

/// The cooperative scheduler: one ready queue, one suspended set, one task
/// table.
#[derive(Default)]
pub struct Scheduler {
    next_task_id: u64,
    tasks: HashMap<u64, Task>,
    ready: VecDeque<u64>,
    suspended: Vec<u64>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            next_task_id: 1,
            tasks: HashMap::new(),
            ready: VecDeque::new(),
            suspended: Vec::new(),
        }
    }

    /// Spawn a task. The body is never executed synchronously: the task is
    /// placed on the ready queue and its still-pending promise is returned
    /// immediately.
    pub fn spawn_task(
        &mut self,
        body: TaskFn,
    ) -> Promise {
        self.spawn_task_with_dependencies(body, Vec::new())
    }

    /// Spawn a task that stays suspended until every dependency promise has
    /// settled. With no dependencies it is immediately ready.
    pub fn spawn_task_with_dependencies(
        &mut self,
        body: TaskFn,
        dependencies: Vec<Promise>,
    ) -> Promise {
        let id = self.next_task_id;
        self.next_task_id += 1;

        let promise = Promise::new();
        let mut task = Task {
            id,
            body,
            state: TaskState::Pending,
            promise: promise.clone(),
            dependencies,
            error: None,
        };

        if task.dependencies_satisfied() {
            task.state = TaskState::Ready;
            self.ready.push_back(id);
        } else {
            task.state = TaskState::Suspended;
            self.suspended.push(id);
        }
        debug!(task_id = id, state = ?task.state, "task spawned");
        self.tasks.insert(id, task);
        promise
    }

    /// Whether any task is still ready or suspended.
    pub fn has_pending_tasks(&self) -> bool {
        !self.ready.is_empty() || !self.suspended.is_empty()
    }

    /// Number of live tasks, in any state.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// One scheduler tick.
    ///
    /// Every task that was ready when the tick started gets exactly one
    /// slice; tasks scheduled mid-tick wait for the next tick. Afterwards,
    /// suspended tasks whose dependencies settled are woken and finished
    /// tasks are removed from the table.
    pub fn run_one_iteration(&mut self) {
        self.wake_satisfied_tasks();

        // Round-robin batch: drain everything that is ready right now.
        let batch: Vec<u64> = self.ready.drain(..).collect();
        for id in batch {
            self.execute_slice(id);
        }

        self.wake_satisfied_tasks();
        self.cleanup_finished_tasks();
    }

    /// Pump ticks until no ready or suspended task remains.
    pub fn run_until_complete(&mut self) {
        while self.has_pending_tasks() {
            self.run_one_iteration();
        }
    }

    /// Wait for a promise by pumping the scheduler.
    ///
    /// Returns immediately when already settled. If every task drains away
    /// while the promise is still pending, gives up gracefully and returns
    /// `none` instead of raising.
    pub fn await_promise(
        &mut self,
        promise: &Promise,
    ) -> RtResult<Value> {
        loop {
            match promise.state() {
                PromiseState::Fulfilled => {
                    return Ok(promise.result().unwrap_or_default());
                }
                PromiseState::Rejected => {
                    return Err(RuntimeError::Value(format!(
                        "Promise rejected: {}",
                        promise.error_message().unwrap_or_default()
                    )));
                }
                PromiseState::Pending => {
                    if !self.has_pending_tasks() {
                        trace!("await gave up: no tasks remain to settle the promise");
                        return Ok(Value::None);
                    }
                    self.run_one_iteration();
                }
            }
        }
    }

    /// Combine promises: fulfilled with the ordered list of all results, or
    /// rejected with the first rejection's error.
    pub fn all(
        &mut self,
        promises: &[Promise],
    ) -> Promise {
        if promises.is_empty() {
            return Promise::resolved(Value::list(Vec::new()));
        }

        loop {
            if let Some(rejected) = promises.iter().find(|p| p.is_rejected()) {
                // First rejection wins, even with others still pending.
                return Promise::rejected(rejected.error_message().unwrap_or_default());
            }
            if promises.iter().all(Promise::is_fulfilled) {
                let results: Vec<Value> = promises
                    .iter()
                    .map(|p| p.result().unwrap_or_default())
                    .collect();
                return Promise::resolved(Value::list(results));
            }
            if !self.has_pending_tasks() {
                // Nothing left that could settle the stragglers.
                warn!("all() stalled: input promises pending with no tasks remaining");
                return Promise::new();
            }
            self.run_one_iteration();
        }
    }

    /// Drop every task and reset the id counter.
    pub fn reset(&mut self) {
        self.tasks.clear();
        self.ready.clear();
        self.suspended.clear();
        self.next_task_id = 1;
    }

    fn wake_satisfied_tasks(&mut self) {
        let tasks = &mut self.tasks;
        let ready = &mut self.ready;
        self.suspended.retain(|id| {
            let Some(task) = tasks.get_mut(id) else {
                return false;
            };
            if task.dependencies_satisfied() {
                task.state = TaskState::Ready;
                ready.push_back(*id);
                trace!(task_id = id, "task woken");
                false
            } else {
                true
            }
        });
    }

    fn execute_slice(
        &mut self,
        id: u64,
    ) {
        let Some(task) = self.tasks.get_mut(&id) else {
            return;
        };
        if matches!(task.state, TaskState::Completed | TaskState::Failed) {
            return;
        }

        match (task.body)() {
            Ok(TaskStep::Yield) => {
                task.state = TaskState::Suspended;
                self.suspended.push(id);
                trace!(task_id = id, "task yielded");
            }
            Ok(TaskStep::Done(value)) => {
                task.state = TaskState::Completed;
                debug!(task_id = id, "task completed");
                // The scheduler is the promise's only settler.
                let _ = task.promise.resolve(value);
            }
            Err(error) => {
                task.state = TaskState::Failed;
                let message = error.to_string();
                warn!(task_id = id, error = %message, "task failed");
                task.error = Some(message.clone());
                let _ = task.promise.reject(message);
            }
        }
    }

    fn cleanup_finished_tasks(&mut self) {
        self.tasks
            .retain(|_, task| !matches!(task.state, TaskState::Completed | TaskState::Failed));
    }
}
