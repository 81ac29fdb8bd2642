//! Demo host: floods a small terraced world and logs the meshes it produces.

use std::path::Path;
use std::time::Duration;

use tide::{LiquidHost, WorldEvent, logger};
use tide_core::liquid::LiquidCell;
use tide_core::world::{BlockKind, ChunkedGrid};
use tide_core::{LiquidConfig, LiquidSimulation};
use tide_utils::{BlockPos, ChunkPos};
use tokio::sync::mpsc;

const CONFIG_PATH: &str = "tide_config.json5";
const RUN_FOR: Duration = Duration::from_secs(30);

/// Four chunks with a floor at y = 0 and a raised terrace in one corner.
fn build_world() -> ChunkedGrid {
    let mut grid = ChunkedGrid::new(0, 48);
    grid.load_area(ChunkPos::new(-1, -1), ChunkPos::new(0, 0));
    grid.fill(BlockPos::new(-16, 0, -16), BlockPos::new(15, 0, 15), BlockKind::Solid);
    grid.fill(BlockPos::new(-16, 1, -16), BlockPos::new(-4, 6, -4), BlockKind::Solid);
    grid
}

fn main() -> anyhow::Result<()> {
    logger::init()?;
    let config = LiquidConfig::load_or_create(Path::new(CONFIG_PATH))?;
    log::info!("Starting liquid demo with {config:?}");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(config))
}

async fn run(config: LiquidConfig) -> anyhow::Result<()> {
    let (mesh_tx, mut mesh_rx) = mpsc::unbounded_channel();
    let mut host = LiquidHost::new(LiquidSimulation::new(build_world(), config), mesh_tx);
    let Some(handle) = host.start() else {
        anyhow::bail!("liquid host did not start");
    };

    let source = LiquidCell::source();
    let events = host.events();
    for pos in [BlockPos::new(-8, 7, -8), BlockPos::new(6, 20, 6)] {
        events.send(WorldEvent::Place {
            pos,
            kind: source.kind(),
            raw: source.state.encode(),
        })?;
    }

    let deadline = tokio::time::sleep(RUN_FOR);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            () = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted");
                break;
            }
            Some(buffer) = mesh_rx.recv() => {
                log::info!(
                    "Meshed {}: {} faces, {} bytes of vertices",
                    buffer.chunk,
                    buffer.quad_count(),
                    buffer.vertex_bytes().len()
                );
            }
        }
    }

    host.stop();
    handle.await?;
    let stats = host.simulation().lock().diagnostics().snapshot();
    log::info!("Done: {stats:?}");
    Ok(())
}
