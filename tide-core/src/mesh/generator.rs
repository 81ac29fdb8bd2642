use rayon::prelude::*;
use tide_utils::{CHUNK_WIDTH, Direction};

use super::buffer::TriangleBuffer;
use crate::liquid::height_fraction;
use crate::world::RegionSnapshot;

/// Builds the liquid surface of a settled region.
///
/// For each liquid cell a face is emitted only where it borders something
/// that is not liquid. The top sits at the cell's height fraction unless
/// liquid is stacked above, in which case the sides run to the full block.
#[must_use]
pub fn generate(region: &RegionSnapshot) -> TriangleBuffer {
    let mut buffer = TriangleBuffer::new(region.chunk());
    let range = region.y_range();

    // The outermost layers are border padding.
    for y in range.start + 1..range.end - 1 {
        for lz in 0..CHUNK_WIDTH {
            for lx in 0..CHUNK_WIDTH {
                let cell = region.get(lx, y, lz);
                if !cell.kind.is_liquid() {
                    continue;
                }
                let covered = region.is_liquid(lx, y + 1, lz);
                let top = if covered {
                    1.0
                } else {
                    height_fraction(cell.kind, cell.state)
                };
                emit_cell(&mut buffer, region, (lx, y, lz), top, covered);
            }
        }
    }
    buffer
}

/// Meshes many regions in parallel.
#[must_use]
pub fn generate_all(regions: &[RegionSnapshot]) -> Vec<TriangleBuffer> {
    regions.par_iter().map(generate).collect()
}

fn emit_cell(
    buffer: &mut TriangleBuffer,
    region: &RegionSnapshot,
    (lx, y, lz): (i32, i32, i32),
    top: f32,
    covered: bool,
) {
    let (x0, y0, z0) = (lx as f32, y as f32, lz as f32);
    let (x1, y1, z1) = (x0 + 1.0, y0 + top, z0 + 1.0);

    if !covered {
        buffer.push_quad(
            [[x0, y1, z0], [x0, y1, z1], [x1, y1, z1], [x1, y1, z0]],
            [0.0, 1.0, 0.0],
        );
    }
    if !region.is_liquid(lx, y - 1, lz) {
        buffer.push_quad(
            [[x0, y0, z0], [x1, y0, z0], [x1, y0, z1], [x0, y0, z1]],
            [0.0, -1.0, 0.0],
        );
    }

    for direction in Direction::HORIZONTAL {
        let (dx, _, dz) = direction.offset();
        if region.is_liquid(lx + dx, y, lz + dz) {
            continue;
        }
        let (corners, normal) = match direction {
            Direction::North => (
                [[x0, y0, z0], [x0, y1, z0], [x1, y1, z0], [x1, y0, z0]],
                [0.0, 0.0, -1.0],
            ),
            Direction::South => (
                [[x1, y0, z1], [x1, y1, z1], [x0, y1, z1], [x0, y0, z1]],
                [0.0, 0.0, 1.0],
            ),
            Direction::West => (
                [[x0, y0, z1], [x0, y1, z1], [x0, y1, z0], [x0, y0, z0]],
                [-1.0, 0.0, 0.0],
            ),
            Direction::East => (
                [[x1, y0, z0], [x1, y1, z0], [x1, y1, z1], [x1, y0, z1]],
                [1.0, 0.0, 0.0],
            ),
            Direction::Up | Direction::Down => continue,
        };
        buffer.push_quad(corners, normal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::liquid::{FULL_HEIGHT, LiquidCell, LiquidState, height_fraction, write_liquid};
    use crate::mesh::LiquidVertex;
    use crate::world::{BlockKind, ChunkedGrid, Grid};
    use tide_utils::{BlockPos, ChunkPos};

    fn grid() -> ChunkedGrid {
        let mut grid = ChunkedGrid::new(0, 8);
        grid.load_area(ChunkPos::new(-1, -1), ChunkPos::new(1, 1));
        grid
    }

    fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
        a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
    }

    /// Front vertices of every upward facing quad.
    fn tops(buffer: &TriangleBuffer) -> Vec<&LiquidVertex> {
        buffer
            .vertices
            .chunks(8)
            .filter(|quad| quad[0].normal == [0.0, 1.0, 0.0])
            .flat_map(|quad| &quad[..4])
            .collect()
    }

    #[test]
    fn test_single_cell_has_six_faces() {
        let mut grid = grid();
        write_liquid(&mut grid, BlockPos::new(3, 2, 4), Some(LiquidCell::source()));

        let buffer = generate(&RegionSnapshot::capture(&grid, ChunkPos::new(0, 0)));

        assert_eq!(buffer.quad_count(), 6);
        assert_eq!(buffer.vertices.len(), 48);
        assert_eq!(buffer.indices.len(), 72);
        assert_eq!(buffer.tint, crate::mesh::LIQUID_TINT);
        let top = tops(&buffer);
        assert_eq!(top.len(), 4);
        assert!(top.iter().all(|vertex| (vertex.position[1] - (2.0 + FULL_HEIGHT)).abs() < 1e-6));
        assert!(
            top.iter()
                .all(|vertex| (3.0..=4.0).contains(&vertex.position[0])
                    && (4.0..=5.0).contains(&vertex.position[2]))
        );
    }

    #[test]
    fn test_faces_are_double_sided() {
        let mut grid = grid();
        write_liquid(&mut grid, BlockPos::new(7, 3, 7), Some(LiquidCell::source()));

        let buffer = generate(&RegionSnapshot::capture(&grid, ChunkPos::new(0, 0)));

        for triangle in buffer.indices.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|i| buffer.vertices[triangle[i] as usize]);
            let facing = cross(sub(b.position, a.position), sub(c.position, a.position));
            assert!(dot(facing, a.normal) > 0.0, "triangle winds against its normal");
        }
        for quad in buffer.vertices.chunks(8) {
            let (front, back) = quad.split_at(4);
            for (f, b) in front.iter().zip(back) {
                assert_eq!(f.position, b.position);
                assert_eq!(f.normal.map(|n| -n), b.normal);
            }
        }
    }

    #[test]
    fn test_shared_faces_are_culled() {
        let mut grid = grid();
        let cell = Some(LiquidCell::source());
        write_liquid(&mut grid, BlockPos::new(5, 2, 5), cell);
        write_liquid(&mut grid, BlockPos::new(6, 2, 5), cell);

        let buffer = generate(&RegionSnapshot::capture(&grid, ChunkPos::new(0, 0)));
        // Two cubes minus the two touching faces.
        assert_eq!(buffer.quad_count(), 10);
    }

    #[test]
    fn test_stacked_cells_cover_top() {
        let mut grid = grid();
        let column = Some(LiquidCell::flowing(LiquidState::new(0, true)));
        write_liquid(&mut grid, BlockPos::new(5, 2, 5), column);
        write_liquid(&mut grid, BlockPos::new(5, 3, 5), column);

        let buffer = generate(&RegionSnapshot::capture(&grid, ChunkPos::new(0, 0)));
        assert_eq!(buffer.quad_count(), 10);
        // The lower cell's sides reach the full block.
        assert!(
            buffer
                .vertices
                .iter()
                .any(|vertex| vertex.normal == [1.0, 0.0, 0.0] && vertex.position[1] == 3.0)
        );
        assert_eq!(tops(&buffer).len(), 4);
    }

    #[test]
    fn test_top_follows_level() {
        let mut grid = grid();
        let state = LiquidState::new(5, false);
        write_liquid(&mut grid, BlockPos::new(2, 1, 2), Some(LiquidCell::flowing(state)));

        let buffer = generate(&RegionSnapshot::capture(&grid, ChunkPos::new(0, 0)));
        let expected = 1.0 + height_fraction(BlockKind::LiquidFlowing, state);
        assert!(tops(&buffer).iter().all(|vertex| (vertex.position[1] - expected).abs() < 1e-6));
    }

    #[test]
    fn test_neighbor_chunk_culls_edge() {
        let mut grid = grid();
        let cell = Some(LiquidCell::source());
        write_liquid(&mut grid, BlockPos::new(15, 2, 3), cell);
        write_liquid(&mut grid, BlockPos::new(16, 2, 3), cell);

        let left = generate(&RegionSnapshot::capture(&grid, ChunkPos::new(0, 0)));
        let right = generate(&RegionSnapshot::capture(&grid, ChunkPos::new(1, 0)));
        assert_eq!(left.quad_count(), 5);
        assert_eq!(right.quad_count(), 5);
        assert!(right.vertices.iter().all(|vertex| vertex.position[0] <= 1.0));
    }

    #[test]
    fn test_dry_region_is_empty() {
        let mut grid = grid();
        grid.set_block(BlockPos::new(1, 1, 1), BlockKind::Solid, 0);
        let buffer = generate(&RegionSnapshot::capture(&grid, ChunkPos::new(0, 0)));
        assert!(buffer.is_empty());
        assert!(buffer.vertex_bytes().is_empty());
    }

    #[test]
    fn test_generate_all_keeps_order() {
        let mut grid = grid();
        write_liquid(&mut grid, BlockPos::new(-3, 1, 2), Some(LiquidCell::source()));
        let chunks = [ChunkPos::new(-1, 0), ChunkPos::new(0, 0), ChunkPos::new(1, 1)];
        let regions: Vec<_> = chunks
            .iter()
            .map(|chunk| RegionSnapshot::capture(&grid, *chunk))
            .collect();

        let buffers = generate_all(&regions);
        assert_eq!(buffers.iter().map(|b| b.chunk).collect::<Vec<_>>(), chunks);
        assert_eq!(buffers[0].quad_count(), 6);
        assert!(buffers[1].is_empty());
        assert_eq!(grid.y_range(), 0..8);
    }
}
