//! Background hive searches. A [PathWorker] owns one thread that decodes grid
//! snapshots and runs [Pathfinder::find_hive_path_while] on them, so the
//! simulation thread never shares the live grid with it.
use crate::config::PathfinderConfig;
use crate::cost::{CostModel, CostTable};
use crate::error::{PathDataError, SnapshotError};
use crate::pathfinder::{Pathfinder, VisitWeights};
use crate::snapshot;
use grid_util::Point;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Everything a worker needs to run a hive search in isolation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub snapshot: Vec<u8>,
    pub costs: CostTable,
    pub scale: u8,
    pub config: PathfinderConfig,
    pub origins: Vec<(i32, i32)>,
    pub target: (i32, i32),
}

/// Routes as plain coordinates, aligned with the request's origins. An origin
/// that cannot reach the target has no route.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkerResponse {
    pub generation: u64,
    pub routes: Vec<Option<Vec<(i32, i32)>>>,
}

type Reply = Result<WorkerResponse, PathDataError>;

pub(crate) struct Job {
    generation: u64,
    token: Arc<AtomicU64>,
    request: WorkerRequest,
    reply: Sender<Reply>,
}

pub(crate) enum Message {
    Job(Job),
    Shutdown,
}

/// Runs the search a [WorkerRequest] describes. `keep_going` is consulted
/// before every origin; [None] means the search was abandoned.
pub fn solve<F>(
    request: &WorkerRequest,
    keep_going: F,
) -> Result<Option<Vec<Option<Vec<(i32, i32)>>>>, SnapshotError>
where
    F: FnMut() -> bool,
{
    let grid = snapshot::decode(&request.snapshot)?;
    let pathfinder = Pathfinder::new(
        CostModel::new(request.costs.clone(), request.scale),
        request.config,
    );
    let origins: Vec<Point> = request
        .origins
        .iter()
        .map(|&(x, y)| Point::new(x, y))
        .collect();
    let target = Point::new(request.target.0, request.target.1);
    let mut weights = VisitWeights::new();
    let routes =
        pathfinder.find_hive_path_while(&grid, &origins, target, &mut weights, keep_going);
    Ok(routes.map(|routes| {
        routes
            .into_iter()
            .map(|route| route.map(|r| r.to_coords()))
            .collect()
    }))
}

impl Job {
    pub(crate) fn run(self) {
        let Job {
            generation,
            token,
            request,
            reply,
        } = self;
        let current = || token.load(Ordering::Acquire);
        let outcome = match solve(&request, || current() == generation) {
            Ok(Some(routes)) => Ok(WorkerResponse { generation, routes }),
            Ok(None) => {
                debug!("Abandoned hive search of generation {generation}");
                Err(PathDataError::Stale {
                    expected: current(),
                    got: generation,
                })
            }
            Err(err) => {
                warn!("Could not decode snapshot of generation {generation}: {err}");
                Err(err.into())
            }
        };
        // The requester may have given up on this job already
        let _ = reply.send(outcome);
    }
}

/// A job submitted to a worker. Resolves to the worker's reply once the
/// search is done.
#[derive(Debug)]
pub struct PendingPaths {
    generation: u64,
    receiver: Receiver<Reply>,
}

impl PendingPaths {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The reply, if it has arrived. Does not block.
    pub fn try_take(&self) -> Option<Reply> {
        match self.receiver.try_recv() {
            Ok(reply) => Some(reply),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(PathDataError::WorkerDisconnected)),
        }
    }

    /// Blocks until the reply arrives.
    pub fn wait(self) -> Reply {
        self.receiver
            .recv()
            .unwrap_or(Err(PathDataError::WorkerDisconnected))
    }
}

/// Clonable sending side of a [PathWorker].
#[derive(Clone, Debug)]
pub struct WorkerHandle {
    sender: Sender<Message>,
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Message::Job(job) => write!(f, "Job({})", job.generation),
            Message::Shutdown => write!(f, "Shutdown"),
        }
    }
}

impl WorkerHandle {
    /// Queues a search. The worker abandons it as soon as `token` no longer
    /// holds `generation`.
    pub fn submit(
        &self,
        request: WorkerRequest,
        generation: u64,
        token: Arc<AtomicU64>,
    ) -> Result<PendingPaths, PathDataError> {
        let (reply, receiver) = mpsc::channel();
        let job = Job {
            generation,
            token,
            request,
            reply,
        };
        self.sender
            .send(Message::Job(job))
            .map_err(|_| PathDataError::WorkerDisconnected)?;
        Ok(PendingPaths {
            generation,
            receiver,
        })
    }
}

#[cfg(test)]
impl WorkerHandle {
    /// A handle whose jobs pile up in the returned queue instead of running.
    pub(crate) fn queue() -> (WorkerHandle, Receiver<Message>) {
        let (sender, receiver) = mpsc::channel();
        (WorkerHandle { sender }, receiver)
    }
}

/// A background thread running hive searches one job at a time.
///
/// Shutting down or dropping the worker waits for the job it is running. A
/// job stops at its next origin once the [PathData](crate::PathData) that
/// submitted it is invalidated or dropped.
#[derive(Debug)]
pub struct PathWorker {
    handle: WorkerHandle,
    thread: Option<JoinHandle<()>>,
}

impl PathWorker {
    pub fn spawn() -> io::Result<PathWorker> {
        let (sender, receiver) = mpsc::channel::<Message>();
        let thread = thread::Builder::new()
            .name("path-worker".to_string())
            .spawn(move || {
                for message in receiver {
                    match message {
                        Message::Job(job) => job.run(),
                        Message::Shutdown => break,
                    }
                }
                info!("Path worker stopped");
            })?;
        info!("Path worker started");
        Ok(PathWorker {
            handle: WorkerHandle { sender },
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> WorkerHandle {
        self.handle.clone()
    }

    /// Stops the worker after the job it is running and waits for it.
    /// Jobs still queued are dropped and report a disconnected worker.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.handle.sender.send(Message::Shutdown);
            if thread.join().is_err() {
                warn!("Path worker panicked");
            }
        }
    }
}

impl Drop for PathWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
