//! # Tide
//!
//! Runs a [`LiquidSimulation`] on a fixed wall-clock tick, feeds it block
//! changes from the rest of the world, and hands finished meshes to a
//! renderer.
//!
//! Each tick holds the simulation lock for the whole drain-and-resolve pass.
//! Meshing happens afterwards on snapshots, off the lock, so it overlaps with
//! the next tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tide_core::LiquidSimulation;
use tide_core::mesh::{TriangleBuffer, generate, generate_all};
use tide_core::world::{BlockKind, ChunkedGrid, Grid, RegionSnapshot};
use tide_utils::{BlockPos, ChunkPos};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, spawn_blocking};
use tokio::time::{MissedTickBehavior, interval};
use tokio::{select, spawn};
use tokio_util::sync::CancellationToken;

/// The logging setup.
pub mod logger;

/// A change reported by some other part of the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldEvent {
    /// A block at the position was placed or removed by someone else.
    BlockChanged(BlockPos),
    /// Set a block and report the change.
    Place {
        /// Where.
        pos: BlockPos,
        /// The new block kind.
        kind: BlockKind,
        /// Its metadata byte.
        raw: u8,
    },
    /// The renderer wants a fresh mesh of this chunk once it settles.
    RemeshRequest(ChunkPos),
    /// The chunk is going away.
    UnloadChunk(ChunkPos),
}

/// Shared handle to the simulation.
pub type SharedSimulation = Arc<Mutex<LiquidSimulation<ChunkedGrid>>>;

/// Drives a simulation from a tokio task.
pub struct LiquidHost {
    /// Cancelled to stop the tick loop.
    pub cancel_token: CancellationToken,
    simulation: SharedSimulation,
    paused: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<WorldEvent>,
    event_rx: Option<mpsc::UnboundedReceiver<WorldEvent>>,
    meshes: mpsc::UnboundedSender<TriangleBuffer>,
}

impl LiquidHost {
    /// Creates a host. Meshes of settled regions are sent to `meshes`.
    #[must_use]
    pub fn new(
        simulation: LiquidSimulation<ChunkedGrid>,
        meshes: mpsc::UnboundedSender<TriangleBuffer>,
    ) -> Self {
        let (events, event_rx) = mpsc::unbounded_channel();
        Self {
            cancel_token: CancellationToken::new(),
            simulation: Arc::new(Mutex::new(simulation)),
            paused: Arc::new(AtomicBool::new(false)),
            events,
            event_rx: Some(event_rx),
            meshes,
        }
    }

    /// A sender other systems use to report changes.
    #[must_use]
    pub fn events(&self) -> mpsc::UnboundedSender<WorldEvent> {
        self.events.clone()
    }

    /// The shared simulation.
    #[must_use]
    pub fn simulation(&self) -> SharedSimulation {
        Arc::clone(&self.simulation)
    }

    /// Stops ticking. Events keep being applied and nothing is lost.
    pub fn pause(&self) {
        if !self.paused.swap(true, Ordering::Relaxed) {
            log::info!("Liquid simulation paused");
        }
    }

    /// Resumes ticking.
    pub fn resume(&self) {
        if self.paused.swap(false, Ordering::Relaxed) {
            log::info!("Liquid simulation resumed");
        }
    }

    /// Returns true while paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    /// Meshes `chunk` right away on a blocking thread.
    ///
    /// Returns `None` if the chunk is not loaded.
    pub async fn remesh(&self, chunk: ChunkPos) -> Option<TriangleBuffer> {
        let (snapshot, diagnostics) = {
            let simulation = self.simulation.lock();
            let (x, z) = chunk.min_block_xz();
            if !simulation.grid().is_loaded(x, z) {
                return None;
            }
            (
                RegionSnapshot::capture(simulation.grid(), chunk),
                simulation.diagnostics(),
            )
        };
        match spawn_blocking(move || generate(&snapshot)).await {
            Ok(buffer) => {
                diagnostics.record_meshed();
                Some(buffer)
            }
            Err(e) => {
                log::warn!("Meshing {chunk} failed: {e}");
                None
            }
        }
    }

    /// Starts the tick loop. Calling it again does nothing.
    pub fn start(&mut self) -> Option<JoinHandle<()>> {
        let Some(mut event_rx) = self.event_rx.take() else {
            log::warn!("Liquid host already started");
            return None;
        };
        let simulation = Arc::clone(&self.simulation);
        let paused = Arc::clone(&self.paused);
        let meshes = self.meshes.clone();
        let cancel_token = self.cancel_token.clone();
        let period = simulation
            .lock()
            .scheduler()
            .tick_interval()
            .max(Duration::from_millis(1));

        log::info!("Liquid simulation ticking every {period:?}");

        Some(spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                select! {
                    () = cancel_token.cancelled() => {
                        break;
                    }
                    _ = ticker.tick() => {
                        let snapshots = {
                            let mut simulation = simulation.lock();
                            while let Ok(event) = event_rx.try_recv() {
                                apply_event(&mut simulation, event);
                            }
                            if paused.load(Ordering::Relaxed) {
                                continue;
                            }
                            run_tick(&mut simulation)
                        };
                        if !snapshots.is_empty() {
                            publish_meshes(&simulation, snapshots, &meshes).await;
                        }
                    }
                }
            }
            log::info!("Liquid simulation stopped");
        }))
    }

    /// Stops the tick loop.
    pub fn stop(&self) {
        self.cancel_token.cancel();
    }
}

fn apply_event(simulation: &mut LiquidSimulation<ChunkedGrid>, event: WorldEvent) {
    match event {
        WorldEvent::BlockChanged(pos) => simulation.block_changed(pos),
        WorldEvent::Place { pos, kind, raw } => {
            simulation.place(pos, kind, raw);
        }
        WorldEvent::RemeshRequest(chunk) => simulation.request_remesh(chunk),
        WorldEvent::UnloadChunk(chunk) => {
            simulation.unload_chunk(chunk);
        }
    }
}

fn run_tick(simulation: &mut LiquidSimulation<ChunkedGrid>) -> Vec<RegionSnapshot> {
    let tick = simulation.scheduler().tick_count() + 1;
    let _span = tracing::debug_span!("liquid_tick", tick).entered();
    let report = simulation.tick();
    if report.processed > 0 {
        tracing::debug!(
            processed = report.processed,
            written = report.written,
            pending = report.pending,
            "tick done"
        );
    }
    simulation.take_settled_snapshots()
}

async fn publish_meshes(
    simulation: &SharedSimulation,
    snapshots: Vec<RegionSnapshot>,
    meshes: &mpsc::UnboundedSender<TriangleBuffer>,
) {
    let diagnostics = simulation.lock().diagnostics();
    let buffers = match spawn_blocking(move || generate_all(&snapshots)).await {
        Ok(buffers) => buffers,
        Err(e) => {
            log::warn!("Meshing settled regions failed: {e}");
            return;
        }
    };
    for buffer in buffers {
        diagnostics.record_meshed();
        if meshes.send(buffer).is_err() {
            log::debug!("Mesh receiver dropped");
            return;
        }
    }
}
