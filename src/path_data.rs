use crate::checkpoint::{combine, CheckpointProvider};
use crate::error::PathDataError;
use crate::path::Path;
use crate::pathfinder::{Pathfinder, VisitWeights};
use crate::route::Route;
use crate::snapshot;
use crate::terrain::TerrainGrid;
use crate::worker::{PendingPaths, WorkerHandle, WorkerRequest, WorkerResponse};
use fxhash::FxHashSet;
use grid_util::Point;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type SharedProvider = Arc<dyn CheckpointProvider + Send + Sync>;

/// The paths of a group of origins converging on one target, computed as one
/// hive batch and cached until the grid changes under them.
///
/// With a [WorkerHandle] the search runs in the background; at most one job
/// is outstanding at a time and a generation counter makes sure replies for
/// an invalidated batch are never applied.
pub struct PathData {
    origins: Vec<Point>,
    target: Point,
    pathfinder: Arc<Pathfinder>,
    speed: f64,
    providers: Vec<SharedProvider>,
    paths: Option<Vec<Path>>,
    generation: u64,
    token: Arc<AtomicU64>,
    pending: Option<PendingPaths>,
    worker: Option<WorkerHandle>,
}

impl PathData {
    pub fn new(origins: Vec<Point>, target: Point, pathfinder: Arc<Pathfinder>, speed: f64) -> PathData {
        PathData {
            origins,
            target,
            pathfinder,
            speed,
            providers: Vec::new(),
            paths: None,
            generation: 0,
            token: Arc::new(AtomicU64::new(0)),
            pending: None,
            worker: None,
        }
    }

    /// Attaches the checkpoints `provider` finds to every path.
    pub fn with_provider<P>(mut self, provider: P) -> PathData
    where
        P: CheckpointProvider + Send + Sync + 'static,
    {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Runs searches on `worker` instead of the calling thread.
    pub fn with_worker(mut self, worker: WorkerHandle) -> PathData {
        self.worker = Some(worker);
        self
    }

    pub fn origins(&self) -> &[Point] {
        &self.origins
    }

    pub fn target(&self) -> Point {
        self.target
    }

    pub fn pathfinder(&self) -> &Arc<Pathfinder> {
        &self.pathfinder
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The cached paths, if a batch has completed since the last
    /// invalidation.
    pub fn paths(&self) -> Option<&[Path]> {
        self.paths.as_deref()
    }

    fn cached(&self) -> &[Path] {
        self.paths.as_deref().unwrap_or(&[])
    }

    /// Returns the cached paths without ever blocking on a worker. Starts a
    /// background job when none is running and returns no paths until it
    /// has replied. Without a worker the paths are computed right away.
    pub fn get_paths_now_or_empty<G: TerrainGrid>(&mut self, grid: &G) -> &[Path] {
        self.request(grid);
        self.settle(grid, false);
        self.cached()
    }

    /// Requests the paths of the current generation and returns a ticket
    /// that resolves to them. A job already running for this generation is
    /// shared rather than started again. Without a worker the paths are
    /// computed before this returns.
    pub fn get_paths_async<G: TerrainGrid>(&mut self, grid: &G) -> PathsTicket {
        self.request(grid);
        PathsTicket {
            generation: self.generation,
        }
    }

    /// Starts computing the current generation unless it is cached or a job
    /// for it is running.
    fn request<G: TerrainGrid>(&mut self, grid: &G) {
        if self.paths.is_some() || self.pending.is_some() {
            return;
        }
        if self.worker.is_some() {
            match self.dispatch(grid) {
                Ok(pending) => {
                    self.pending = Some(pending);
                    return;
                }
                Err(err) => {
                    warn!("Could not dispatch hive search ({err}), searching on this thread");
                    self.worker = None;
                }
            }
        }
        self.get_paths_blocking(grid);
    }

    /// Applies the reply of the job in flight once it has arrived, waiting for
    /// it if `block` is set. A failed job drops the worker and the batch is
    /// searched on this thread instead.
    fn settle<G: TerrainGrid>(&mut self, grid: &G, block: bool) {
        let reply = match self.pending.take() {
            None => return,
            Some(pending) if block => pending.wait(),
            Some(pending) => match pending.try_take() {
                Some(reply) => reply,
                None => {
                    self.pending = Some(pending);
                    return;
                }
            },
        };
        match reply.and_then(|response| self.accept(grid, response).map(|_| ())) {
            Ok(()) => {}
            Err(PathDataError::Stale { got, .. }) => {
                debug!("Dropping abandoned job of generation {got}");
            }
            Err(err) => {
                warn!("Hive search failed ({err}), searching on this thread");
                self.worker = None;
                self.get_paths_blocking(grid);
            }
        }
    }

    fn resolve<G: TerrainGrid>(
        &mut self,
        generation: u64,
        grid: &G,
        block: bool,
    ) -> Option<Result<&[Path], PathDataError>> {
        if generation != self.generation {
            return Some(Err(PathDataError::Stale {
                expected: self.generation,
                got: generation,
            }));
        }
        self.request(grid);
        self.settle(grid, block);
        if block && self.paths.is_none() {
            self.get_paths_blocking(grid);
        }
        self.paths.as_deref().map(Ok)
    }

    /// Applies a worker reply, rebuilding its routes against the live grid.
    /// Replies for an earlier generation are rejected.
    pub fn accept<G: TerrainGrid>(
        &mut self,
        grid: &G,
        response: WorkerResponse,
    ) -> Result<&[Path], PathDataError> {
        if response.generation != self.generation {
            return Err(PathDataError::Stale {
                expected: self.generation,
                got: response.generation,
            });
        }
        let model = self.pathfinder.model();
        let mut routes = Vec::with_capacity(response.routes.len());
        for (origin, coords) in self.origins.iter().zip(&response.routes) {
            match coords {
                Some(coords) => match Route::rehydrate(grid, model, coords) {
                    Some(route) => routes.push(route),
                    None => warn!("Route from {:?} no longer fits the grid", origin),
                },
                None => debug!("{:?} cannot reach {:?}", origin, self.target),
            }
        }
        self.store(grid, routes);
        Ok(self.cached())
    }

    /// Computes the paths on the calling thread if none are cached. A job
    /// running in the background is abandoned.
    pub fn get_paths_blocking<G: TerrainGrid>(&mut self, grid: &G) -> &[Path] {
        if self.paths.is_none() {
            if self.pending.is_some() {
                self.bump_generation();
            }
            let mut weights = VisitWeights::new();
            let routes = self
                .pathfinder
                .find_hive_path(grid, &self.origins, self.target, &mut weights);
            for (origin, route) in self.origins.iter().zip(&routes) {
                if route.is_none() {
                    debug!("{:?} cannot reach {:?}", origin, self.target);
                }
            }
            self.store(grid, routes.into_iter().flatten().collect());
        }
        self.cached()
    }

    /// Drops the cached paths and abandons any job in flight. The next
    /// request searches the grid again.
    pub fn invalidate(&mut self) {
        self.paths = None;
        self.bump_generation();
        debug!("Paths towards {:?} invalidated", self.target);
    }

    /// Invalidates the cache if a changed cell lies under a cached path, or if
    /// a search is in flight. Returns whether it did.
    pub fn notify_changed(&mut self, changed: &FxHashSet<Point>) -> bool {
        let affected = self.pending.is_some()
            || self
                .paths
                .iter()
                .flatten()
                .any(|path| path.is_affected_by(changed));
        if affected {
            self.invalidate();
        }
        affected
    }

    /// Recomputes the cached paths a change touches, in place, and returns
    /// how many it recomputed.
    pub fn recompute_affected<G: TerrainGrid>(
        &mut self,
        grid: &G,
        changed: &FxHashSet<Point>,
    ) -> usize {
        let model = self.pathfinder.model();
        let mut count = 0;
        for path in self.paths.iter_mut().flatten() {
            if path.is_affected_by(changed) {
                path.recompute(grid, model);
                count += 1;
            }
        }
        count
    }

    fn bump_generation(&mut self) {
        self.generation += 1;
        self.token.store(self.generation, Ordering::Release);
        self.pending = None;
    }

    fn dispatch<G: TerrainGrid>(&self, grid: &G) -> Result<PendingPaths, PathDataError> {
        let Some(worker) = &self.worker else {
            return Err(PathDataError::WorkerDisconnected);
        };
        let request = WorkerRequest {
            snapshot: snapshot::encode(grid, true)?,
            costs: self.pathfinder.model().table.clone(),
            scale: self.pathfinder.model().scale(),
            config: *self.pathfinder.config(),
            origins: self.origins.iter().map(|p| (p.x, p.y)).collect(),
            target: (self.target.x, self.target.y),
        };
        info!(
            "Dispatching hive search of generation {} for {} origins",
            self.generation,
            self.origins.len()
        );
        worker.submit(request, self.generation, Arc::clone(&self.token))
    }

    fn store<G: TerrainGrid>(&mut self, grid: &G, routes: Vec<Route>) {
        let providers: Vec<&dyn CheckpointProvider> = self
            .providers
            .iter()
            .map(|p| p.as_ref() as &dyn CheckpointProvider)
            .collect();
        let paths: Vec<Path> = routes
            .into_iter()
            .map(|route| {
                let checkpoints = combine(&route, grid, &providers);
                Path::with_checkpoints(route, self.speed, checkpoints)
            })
            .collect();
        info!(
            "{} of {} origins have a path towards {:?}",
            paths.len(),
            self.origins.len(),
            self.target
        );
        self.paths = Some(paths);
    }
}

impl Drop for PathData {
    fn drop(&mut self) {
        // Lets the worker abandon the job in flight
        if self.pending.is_some() {
            self.token.store(self.generation + 1, Ordering::Release);
        }
    }
}

/// A batch requested through [PathData::get_paths_async]. It resolves
/// against the [PathData] that issued it, and to [PathDataError::Stale] once
/// that data has been invalidated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathsTicket {
    generation: u64,
}

impl PathsTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The paths, if they are ready. Does not block.
    pub fn try_take<'a, G: TerrainGrid>(
        &self,
        data: &'a mut PathData,
        grid: &G,
    ) -> Option<Result<&'a [Path], PathDataError>> {
        data.resolve(self.generation, grid, false)
    }

    /// Blocks until the paths are ready. Falls back to searching on the
    /// calling thread if the worker goes away.
    pub fn wait<'a, G: TerrainGrid>(
        self,
        data: &'a mut PathData,
        grid: &G,
    ) -> Result<&'a [Path], PathDataError> {
        data.resolve(self.generation, grid, true)
            .unwrap_or(Ok(&[][..]))
    }
}
