use tide_utils::ChunkPos;

/// Default RGBA tint applied to every liquid surface.
pub const LIQUID_TINT: [f32; 4] = [0.25, 0.45, 0.85, 0.75];

/// Vertex layout handed to the renderer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LiquidVertex {
    /// Chunk-local x/z, world y.
    pub position: [f32; 3],
    /// Unit face normal.
    pub normal: [f32; 3],
    /// Texture coordinates.
    pub uv: [f32; 2],
}

/// Triangle list geometry for the liquid in one chunk column.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleBuffer {
    /// The chunk column the geometry belongs to.
    pub chunk: ChunkPos,
    /// Vertex data.
    pub vertices: Vec<LiquidVertex>,
    /// Triangle list indices into `vertices`.
    pub indices: Vec<u32>,
    /// Uniform RGBA tint.
    pub tint: [f32; 4],
}

const CORNER_UVS: [[f32; 2]; 4] = [[0.0, 1.0], [0.0, 0.0], [1.0, 0.0], [1.0, 1.0]];

impl TriangleBuffer {
    /// An empty buffer for `chunk`.
    #[must_use]
    pub fn new(chunk: ChunkPos) -> Self {
        Self {
            chunk,
            vertices: Vec::new(),
            indices: Vec::new(),
            tint: LIQUID_TINT,
        }
    }

    /// Returns true if there is nothing to draw.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of faces emitted. Each face is drawn from both sides.
    #[must_use]
    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 8
    }

    /// Raw vertex bytes for upload.
    #[must_use]
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Raw index bytes for upload.
    #[must_use]
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Appends a face visible from both sides.
    ///
    /// `corners` must wind counter-clockwise when seen from the side `normal`
    /// points to. The back copy flips the normal and the winding.
    pub(crate) fn push_quad(&mut self, corners: [[f32; 3]; 4], normal: [f32; 3]) {
        let back = [-normal[0], -normal[1], -normal[2]];
        self.push_face(corners, normal, [0, 1, 2, 0, 2, 3]);
        self.push_face(corners, back, [0, 2, 1, 0, 3, 2]);
    }

    fn push_face(&mut self, corners: [[f32; 3]; 4], normal: [f32; 3], order: [u32; 6]) {
        let base = self.vertices.len() as u32;
        for (corner, uv) in corners.into_iter().zip(CORNER_UVS) {
            self.vertices.push(LiquidVertex {
                position: corner,
                normal,
                uv,
            });
        }
        self.indices.extend(order.iter().map(|index| base + index));
    }
}
