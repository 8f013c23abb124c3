// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blueprint Queue: one strictly-serial FIFO task lane per blueprint, with
//! independent blueprints draining concurrently (§4.4).

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bp_core::{BlueprintId, MacroNodeId};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::{oneshot, Notify};
use tracing::Instrument;
use uuid::Uuid;

/// The kind of task a lane entry represents, mirroring the Node Executor
/// entrypoints that enqueue onto a blueprint's lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Run,
    Reevaluate,
    Enrich,
    Generate,
    Split,
    SmartDeps,
}

/// A snapshot of one queued or running task, exposed through `info`/`globalInfo`.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub task_id: Uuid,
    pub kind: TaskKind,
    pub node_id: Option<MacroNodeId>,
    pub queued_at: DateTime<Utc>,
}

/// Aggregated view of a single blueprint's lane.
#[derive(Debug, Clone)]
pub struct LaneInfo {
    pub running: Option<TaskRecord>,
    pub depth: usize,
    pub pending_tasks: Vec<TaskRecord>,
}

/// One blueprint's view inside `globalInfo`, enriched with titles and the
/// running node's session id (looked up through the Store by the caller).
#[derive(Debug, Clone)]
pub struct GlobalLaneEntry {
    pub blueprint_id: BlueprintId,
    pub info: LaneInfo,
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

struct PendingItem<T> {
    record: TaskRecord,
    work: Box<dyn FnOnce() -> BoxFuture<T> + Send>,
    reply: oneshot::Sender<Option<T>>,
}

struct Lane<T> {
    queue: VecDeque<PendingItem<T>>,
    running: Option<TaskRecord>,
}

impl<T> Default for Lane<T> {
    fn default() -> Self {
        Self { queue: VecDeque::new(), running: None }
    }
}

struct LaneHandle<T> {
    state: Arc<Mutex<Lane<T>>>,
    notify: Arc<Notify>,
}

impl<T> Clone for LaneHandle<T> {
    fn clone(&self) -> Self {
        Self { state: self.state.clone(), notify: self.notify.clone() }
    }
}

/// A future resolving to the task's eventual value, or `None` if it was
/// cancelled via `remove` before it started.
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<Option<T>>,
}

impl<T> Future for TaskHandle<T> {
    type Output = Option<T>;

    fn poll(
        self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.rx).poll(cx) {
            std::task::Poll::Ready(Ok(v)) => std::task::Poll::Ready(v),
            std::task::Poll::Ready(Err(_)) => std::task::Poll::Ready(None),
            std::task::Poll::Pending => std::task::Poll::Pending,
        }
    }
}

/// Strictly-serial-per-blueprint, concurrent-across-blueprints task queue.
///
/// There is no cap on the number of concurrently-active blueprint lanes; a
/// background driver task is spawned lazily on each blueprint's first
/// `enqueue` and lives for the lifetime of the `BlueprintQueue`.
pub struct BlueprintQueue<T: Send + 'static> {
    lanes: Mutex<HashMap<BlueprintId, LaneHandle<T>>>,
}

impl<T: Send + 'static> Default for BlueprintQueue<T> {
    fn default() -> Self {
        Self { lanes: Mutex::new(HashMap::new()) }
    }
}

impl<T: Send + 'static> BlueprintQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lane_for(&self, blueprint_id: &BlueprintId) -> LaneHandle<T> {
        let mut lanes = self.lanes.lock();
        if let Some(handle) = lanes.get(blueprint_id) {
            return handle.clone();
        }
        let handle = LaneHandle { state: Arc::new(Mutex::new(Lane::default())), notify: Arc::new(Notify::new()) };
        lanes.insert(blueprint_id.clone(), handle.clone());
        spawn_driver(handle.clone());
        handle
    }

    /// Enqueues a task for `blueprint_id`; tasks for the same blueprint run
    /// strictly serially, tasks for different blueprints run concurrently.
    pub fn enqueue<F, Fut>(
        &self,
        blueprint_id: &BlueprintId,
        kind: TaskKind,
        node_id: Option<MacroNodeId>,
        work: F,
    ) -> TaskHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let handle = self.lane_for(blueprint_id);
        let (tx, rx) = oneshot::channel();
        let record = TaskRecord { task_id: Uuid::new_v4(), kind, node_id, queued_at: Utc::now() };
        let item = PendingItem {
            record,
            work: Box::new(move || Box::pin(work()) as BoxFuture<T>),
            reply: tx,
        };
        handle.state.lock().queue.push_back(item);
        handle.notify.notify_one();
        TaskHandle { rx }
    }

    /// Removes a not-yet-started task; returns `true` if it was found and
    /// removed (its `TaskHandle` resolves to `None`). Returns `false` if
    /// the task is already running or unknown.
    pub fn remove(&self, blueprint_id: &BlueprintId, node_id: &MacroNodeId) -> bool {
        let Some(handle) = self.lanes.lock().get(blueprint_id).cloned() else {
            return false;
        };
        let mut lane = handle.state.lock();
        let position = lane
            .queue
            .iter()
            .position(|item| item.record.node_id.as_ref() == Some(node_id));
        let Some(position) = position else { return false };
        let item = lane.queue.remove(position).expect("position just found");
        let _ = item.reply.send(None);
        true
    }

    /// Current view of one blueprint's lane.
    pub fn info(&self, blueprint_id: &BlueprintId) -> LaneInfo {
        match self.lanes.lock().get(blueprint_id) {
            Some(handle) => lane_info(&handle.state.lock()),
            None => LaneInfo { running: None, depth: 0, pending_tasks: Vec::new() },
        }
    }

    /// Aggregated view across every blueprint that has ever had a task
    /// enqueued in this process incarnation.
    pub fn global_info(&self) -> Vec<GlobalLaneEntry> {
        self.lanes
            .lock()
            .iter()
            .map(|(blueprint_id, handle)| GlobalLaneEntry {
                blueprint_id: blueprint_id.clone(),
                info: lane_info(&handle.state.lock()),
            })
            .collect()
    }
}

fn lane_info<T>(lane: &Lane<T>) -> LaneInfo {
    LaneInfo {
        running: lane.running.clone(),
        depth: lane.queue.len(),
        pending_tasks: lane.queue.iter().map(|item| item.record.clone()).collect(),
    }
}

/// Drains one blueprint's lane forever: pop front, mark running, await the
/// work, mark idle, repeat. The lane holds no lock while a task executes.
fn spawn_driver<T: Send + 'static>(handle: LaneHandle<T>) {
    tokio::spawn(async move {
        loop {
            let next = {
                let mut lane = handle.state.lock();
                match lane.queue.pop_front() {
                    Some(item) => {
                        lane.running = Some(item.record.clone());
                        Some(item)
                    }
                    None => None,
                }
            };

            let Some(item) = next else {
                handle.notify.notified().await;
                continue;
            };

            let span = tracing::info_span!(
                "blueprint_queue.task",
                task_id = %item.record.task_id,
                kind = ?item.record.kind,
            );
            let result = (item.work)().instrument(span).await;
            let _ = item.reply.send(Some(result));

            handle.state.lock().running = None;
        }
    });
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
