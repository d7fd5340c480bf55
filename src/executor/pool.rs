//! Parallel test execution
//!
//! A bounded pool of worker processes drains a FIFO queue of files. The
//! coordinator reacts to one event stream (result messages and process
//! exits), owns the aggregate summary, and supervises every outstanding
//! task: a worker that exits while holding a file never stalls or silently
//! shrinks the run without a diagnostic.

use anyhow::{Context, Result};
use futures::future::join_all;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::protocol::{decode, encode, FromWorker, ToWorker};
use crate::config::{CrashPolicy, HarnessConfig};
use crate::models::RunSummary;
use crate::utils::{LogLevel, Timer};

pub type WorkerId = usize;

/// Something that happened to a worker
#[derive(Debug)]
pub enum WorkerEvent {
    Message {
        worker: WorkerId,
        message: FromWorker,
    },
    /// Always the last event of a worker; `status` is `None` when the
    /// process was killed by a signal or could not be waited on.
    Exited {
        worker: WorkerId,
        status: Option<i32>,
    },
}

/// Coordinator-side handle of a spawned worker
pub struct WorkerLink {
    /// Task channel; dropping it tells the worker to finish
    pub outbox: mpsc::UnboundedSender<ToWorker>,
    pub pid: Option<u32>,
    /// Background IO tasks reaped when the run ends
    pub io: Vec<JoinHandle<()>>,
}

/// Starts workers. Each worker reports through `events`, ending with
/// exactly one `Exited` event.
pub trait WorkerSpawner: Send + Sync {
    fn spawn(
        &self,
        worker: WorkerId,
        events: mpsc::UnboundedSender<WorkerEvent>,
    ) -> Result<WorkerLink>;
}

/// Spawns worker processes speaking JSON lines over stdin/stdout
pub struct ProcessSpawner {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessSpawner {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Re-invoke the running executable with the `worker` subcommand
    pub fn current_exe() -> Result<Self> {
        let program = std::env::current_exe().context("Failed to locate current executable")?;
        Ok(Self::new(program, vec!["worker".to_string()]))
    }

    /// Pass the coordinator's log level on to workers
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.args.push("--log-level".to_string());
        self.args.push(level.as_str().to_string());
        self
    }
}

impl WorkerSpawner for ProcessSpawner {
    fn spawn(
        &self,
        worker: WorkerId,
        events: mpsc::UnboundedSender<WorkerEvent>,
    ) -> Result<WorkerLink> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn worker {}", self.program.display()))?;

        let pid = child.id();
        let mut stdin = child.stdin.take().context("Worker stdin unavailable")?;
        let stdout = child.stdout.take().context("Worker stdout unavailable")?;
        let (outbox, mut tasks) = mpsc::unbounded_channel::<ToWorker>();

        let writer = tokio::spawn(async move {
            while let Some(task) = tasks.recv().await {
                let line = match encode(&task) {
                    Ok(line) => line + "\n",
                    Err(e) => {
                        warn!("Worker {}: {}", worker, e);
                        break;
                    }
                };
                if let Err(e) = stdin.write_all(line.as_bytes()).await {
                    debug!("Worker {} stopped accepting tasks: {}", worker, e);
                    break;
                }
                if stdin.flush().await.is_err() {
                    break;
                }
            }
            // Dropping stdin closes the pipe and lets the worker exit.
        });

        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) if line.trim().is_empty() => continue,
                    Ok(Some(line)) => match decode::<FromWorker>(&line) {
                        Ok(message) => {
                            let _ = events.send(WorkerEvent::Message { worker, message });
                        }
                        Err(e) => {
                            warn!("Worker {} broke protocol, killing it: {}", worker, e);
                            let _ = child.start_kill();
                            break;
                        }
                    },
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Failed to read from worker {}: {}", worker, e);
                        let _ = child.start_kill();
                        break;
                    }
                }
            }

            let status = match child.wait().await {
                Ok(status) => status.code(),
                Err(e) => {
                    warn!("Failed to wait for worker {}: {}", worker, e);
                    None
                }
            };
            let _ = events.send(WorkerEvent::Exited { worker, status });
        });

        debug!("Spawned worker {} (pid {:?})", worker, pid);
        Ok(WorkerLink {
            outbox,
            pid,
            io: vec![writer, reader],
        })
    }
}

/// Pool settings
#[derive(Clone, Debug)]
pub struct PoolConfig {
    pub workers: usize,
    pub tasks_per_worker: usize,
    pub crash_policy: CrashPolicy,
    pub retry_crashed: bool,
}

impl PoolConfig {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            tasks_per_worker: 0,
            crash_policy: CrashPolicy::Record,
            retry_crashed: false,
        }
    }

    pub fn with_tasks_per_worker(mut self, tasks: usize) -> Self {
        self.tasks_per_worker = tasks;
        self
    }

    pub fn with_crash_policy(mut self, policy: CrashPolicy) -> Self {
        self.crash_policy = policy;
        self
    }

    pub fn with_retry(mut self, retry: bool) -> Self {
        self.retry_crashed = retry;
        self
    }
}

impl From<&HarnessConfig> for PoolConfig {
    fn from(config: &HarnessConfig) -> Self {
        PoolConfig::new(config.effective_workers())
            .with_tasks_per_worker(config.tasks_per_worker)
            .with_crash_policy(config.crash_policy)
            .with_retry(config.retry_crashed)
    }
}

/// Result of a parallel run
#[derive(Clone, Debug, Default)]
pub struct PoolOutcome {
    pub summary: RunSummary,
    /// Workers started over the whole run, replacements included
    pub spawned: usize,
    /// Files whose worker exited before reporting, one entry per crash
    pub crashed: Vec<PathBuf>,
    pub retried: usize,
}

/// Worker pool coordinator
pub struct ParallelExecutor<S: WorkerSpawner> {
    spawner: S,
    config: PoolConfig,
}

impl<S: WorkerSpawner> ParallelExecutor<S> {
    pub fn new(spawner: S, config: PoolConfig) -> Self {
        Self { spawner, config }
    }

    /// Run every file on the pool and merge the results. Files that no
    /// worker could be started for are handled like crashed ones.
    pub async fn run_all(&self, files: Vec<PathBuf>) -> PoolOutcome {
        if files.is_empty() {
            return PoolOutcome::default();
        }

        let pool_size = self.config.workers.min(files.len());
        info!("Running {} files on {} workers", files.len(), pool_size);

        let timer = Timer::start("parallel run");
        let (events_tx, mut events) = mpsc::unbounded_channel();
        let mut pool = Pool {
            spawner: &self.spawner,
            config: &self.config,
            pool_size,
            events: events_tx,
            queue: files.into_iter().map(Task::new).collect(),
            slots: HashMap::new(),
            io: Vec::new(),
            next_id: 0,
            outcome: PoolOutcome::default(),
        };

        pool.replenish();

        while !pool.slots.is_empty() {
            let Some(event) = events.recv().await else {
                break;
            };
            pool.handle(event);
        }

        for result in join_all(pool.io.drain(..)).await {
            if let Err(e) = result {
                warn!("Worker IO task failed: {}", e);
            }
        }

        let outcome = pool.outcome;
        info!(
            "Parallel run completed in {}ms - Pass: {}/{} ({:.1}%), {} workers, {} crashed",
            timer.stop(),
            outcome.summary.passed,
            outcome.summary.total,
            outcome.summary.pass_rate(),
            outcome.spawned,
            outcome.crashed.len()
        );

        outcome
    }
}

#[derive(Clone, Debug)]
struct Task {
    path: PathBuf,
    attempt: u32,
}

impl Task {
    fn new(path: PathBuf) -> Self {
        Self { path, attempt: 0 }
    }
}

struct Slot {
    outbox: Option<mpsc::UnboundedSender<ToWorker>>,
    pid: Option<u32>,
    task: Option<Task>,
    served: usize,
}

/// Coordinator state for one run, mutated only from the event loop
struct Pool<'a, S: WorkerSpawner> {
    spawner: &'a S,
    config: &'a PoolConfig,
    pool_size: usize,
    events: mpsc::UnboundedSender<WorkerEvent>,
    queue: VecDeque<Task>,
    slots: HashMap<WorkerId, Slot>,
    io: Vec<JoinHandle<()>>,
    next_id: WorkerId,
    outcome: PoolOutcome,
}

impl<S: WorkerSpawner> Pool<'_, S> {
    fn spawn_worker(&mut self) -> Result<WorkerId> {
        let worker = self.next_id;
        self.next_id += 1;

        let link = self.spawner.spawn(worker, self.events.clone())?;
        self.io.extend(link.io);
        self.slots.insert(
            worker,
            Slot {
                outbox: Some(link.outbox),
                pid: link.pid,
                task: None,
                served: 0,
            },
        );
        self.outcome.spawned += 1;
        Ok(worker)
    }

    /// Workers that can still be given tasks
    fn active(&self) -> usize {
        self.slots.values().filter(|s| s.outbox.is_some()).count()
    }

    /// Give an idle worker its next task, or retire it
    fn assign(&mut self, worker: WorkerId) {
        let cap = self.config.tasks_per_worker;
        let Some(slot) = self.slots.get_mut(&worker) else {
            return;
        };

        let exhausted = cap > 0 && slot.served >= cap;
        if exhausted || self.queue.is_empty() {
            // Closing the outbox ends the worker; its exit event follows.
            slot.outbox = None;
            self.replenish();
            return;
        }

        let Some(outbox) = slot.outbox.as_ref() else {
            return;
        };
        let Some(task) = self.queue.pop_front() else {
            return;
        };

        if outbox.send(ToWorker::Task(task.path.clone())).is_err() {
            // The worker is already gone; its exit event will replace it.
            self.queue.push_front(task);
            slot.outbox = None;
            return;
        }

        debug!("Assigned {} to worker {}", task.path.display(), worker);
        slot.task = Some(task);
    }

    /// Keep the pool at size while work is queued. Every failed spawn
    /// consumes the task it was meant for, so this always terminates.
    fn replenish(&mut self) {
        while !self.queue.is_empty() && self.active() < self.pool_size {
            match self.spawn_worker() {
                Ok(worker) => self.assign(worker),
                Err(e) => self.on_spawn_failure(e),
            }
        }
    }

    fn on_spawn_failure(&mut self, error: anyhow::Error) {
        let Some(task) = self.queue.pop_front() else {
            return;
        };
        warn!(
            "Could not start a worker for {}: {:#}",
            task.path.display(),
            error
        );
        self.outcome.crashed.push(task.path.clone());
        self.outcome
            .summary
            .record_crash(&task.path, format!("no worker could be started: {error:#}"));
    }

    fn handle(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Message {
                worker,
                message: FromWorker::Result(summary),
            } => self.on_result(worker, summary),
            WorkerEvent::Exited { worker, status } => self.on_exit(worker, status),
        }
    }

    fn on_result(&mut self, worker: WorkerId, summary: RunSummary) {
        let Some(slot) = self.slots.get_mut(&worker) else {
            warn!("Result from unknown worker {} ignored", worker);
            return;
        };
        let Some(task) = slot.task.take() else {
            warn!("Worker {} reported without holding a task; ignored", worker);
            return;
        };
        slot.served += 1;

        debug!(
            "Worker {} finished {}: {}",
            worker,
            task.path.display(),
            summary
        );
        if !summary.is_consistent() {
            warn!(
                "Worker {} sent inconsistent counters for {}: {}",
                worker,
                task.path.display(),
                summary
            );
        }
        let merged = std::mem::take(&mut self.outcome.summary).merge(summary);
        self.outcome.summary = merged;
        self.assign(worker);
    }

    fn on_exit(&mut self, worker: WorkerId, status: Option<i32>) {
        let Some(slot) = self.slots.remove(&worker) else {
            return;
        };

        if let Some(task) = slot.task {
            self.on_crash(worker, slot.pid, task, status);
        } else {
            debug!("Worker {} exited with {:?}", worker, status);
        }

        self.replenish();
    }

    fn on_crash(&mut self, worker: WorkerId, pid: Option<u32>, task: Task, status: Option<i32>) {
        let status_text = describe_status(status);
        warn!(
            "Worker died: {} (pid {}) {} while running {}",
            worker,
            pid.map(|p| p.to_string()).unwrap_or_else(|| "?".into()),
            status_text,
            task.path.display()
        );
        self.outcome.crashed.push(task.path.clone());

        match self.config.crash_policy {
            CrashPolicy::Drop => {}
            CrashPolicy::Record if self.config.retry_crashed && task.attempt == 0 => {
                info!("Retrying {}", task.path.display());
                self.outcome.retried += 1;
                self.queue.push_front(Task {
                    path: task.path,
                    attempt: task.attempt + 1,
                });
            }
            CrashPolicy::Record => {
                self.outcome.summary.record_crash(
                    &task.path,
                    format!("worker {status_text} before reporting a result"),
                );
            }
        }
    }
}

fn describe_status(status: Option<i32>) -> String {
    match status {
        Some(code) => format!("exited with status {code}"),
        None => "was terminated".to_string(),
    }
}
