/// Fixed-function pipeline state
///
/// A `PipelineStateDescriptor` is the complete fixed-function configuration a
/// pass applies on begin: depth, rasterization, blending, color write mask,
/// topology and scissor. It is hashable so explicit backends can key their
/// pipeline-object caches on it.

use bitflags::bitflags;

/// Depth comparison function
///
/// The incoming fragment depth is compared against the stored value:
/// `incoming <op> stored`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

impl CompareOp {
    /// Run the comparison
    ///
    /// Undefined (NaN) depth on either side fails every op except `Always`.
    pub fn test(&self, incoming: f32, stored: f32) -> bool {
        if *self == CompareOp::Always {
            return true;
        }
        if incoming.is_nan() || stored.is_nan() {
            return false;
        }
        match self {
            CompareOp::Never => false,
            CompareOp::Less => incoming < stored,
            CompareOp::Equal => incoming == stored,
            CompareOp::LessEqual => incoming <= stored,
            CompareOp::Greater => incoming > stored,
            CompareOp::NotEqual => incoming != stored,
            CompareOp::GreaterEqual => incoming >= stored,
            CompareOp::Always => true,
        }
    }
}

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
    FrontAndBack,
}

/// Winding order that defines a front face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontFace {
    CounterClockwise,
    Clockwise,
}

/// Polygon fill mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolygonMode {
    Fill,
    Line,
    Point,
}

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    TriangleList,
    TriangleStrip,
    LineList,
    PointList,
}

/// Color blending mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Source replaces destination
    Opaque,
    /// src * a + dst * (1 - a)
    AlphaBlend,
    /// dst + src * a
    Additive,
}

impl BlendMode {
    /// Blend one texel
    pub fn blend(&self, src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
        let alpha = src[3];
        match self {
            BlendMode::Opaque => src,
            BlendMode::AlphaBlend => [
                src[0] * alpha + dst[0] * (1.0 - alpha),
                src[1] * alpha + dst[1] * (1.0 - alpha),
                src[2] * alpha + dst[2] * (1.0 - alpha),
                alpha + dst[3] * (1.0 - alpha),
            ],
            BlendMode::Additive => [
                dst[0] + src[0] * alpha,
                dst[1] + src[1] * alpha,
                dst[2] + src[2] * alpha,
                dst[3],
            ],
        }
    }
}

bitflags! {
    /// Color channels written by a pass
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorWriteMask: u8 {
        const R = 1 << 0;
        const G = 1 << 1;
        const B = 1 << 2;
        const A = 1 << 3;
        const RGB = Self::R.bits() | Self::G.bits() | Self::B.bits();
        const ALL = Self::RGB.bits() | Self::A.bits();
    }
}

impl ColorWriteMask {
    /// Write the masked channels of `value` into `dst`
    pub fn apply(&self, dst: &mut [f32; 4], value: [f32; 4]) {
        let channels = [ColorWriteMask::R, ColorWriteMask::G, ColorWriteMask::B, ColorWriteMask::A];
        for (i, channel) in channels.iter().enumerate() {
            if self.contains(*channel) {
                dst[i] = value[i];
            }
        }
    }
}

/// Rectangle in pixels (origin top-left)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Whether pixel (px, py) lies inside
    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x
            && py >= self.y
            && (px as i64) < self.x as i64 + self.width as i64
            && (py as i64) < self.y as i64 + self.height as i64
    }
}

/// Depth test configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthState {
    pub test_enable: bool,
    pub write_enable: bool,
    pub compare: CompareOp,
}

impl DepthState {
    pub const DISABLED: DepthState = DepthState {
        test_enable: false,
        write_enable: false,
        compare: CompareOp::Always,
    };
}

/// Rasterizer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RasterizationState {
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub polygon_mode: PolygonMode,
}

impl Default for RasterizationState {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::None,
            front_face: FrontFace::CounterClockwise,
            polygon_mode: PolygonMode::Fill,
        }
    }
}

/// Complete fixed-function state of a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineStateDescriptor {
    pub depth: DepthState,
    pub rasterization: RasterizationState,
    pub blend: BlendMode,
    pub color_write_mask: ColorWriteMask,
    pub topology: PrimitiveTopology,
    /// `None` = whole target
    pub scissor: Option<Rect2D>,
}

impl PipelineStateDescriptor {
    /// Scene geometry: depth test + write with LessEqual, back-face culling
    pub fn opaque() -> Self {
        Self {
            depth: DepthState {
                test_enable: true,
                write_enable: true,
                compare: CompareOp::LessEqual,
            },
            rasterization: RasterizationState {
                cull_mode: CullMode::Back,
                ..RasterizationState::default()
            },
            blend: BlendMode::Opaque,
            color_write_mask: ColorWriteMask::ALL,
            topology: PrimitiveTopology::TriangleList,
            scissor: None,
        }
    }

    /// Full-screen resolve: depth tested against the copied scene depth, never written
    pub fn fullscreen() -> Self {
        Self {
            depth: DepthState {
                test_enable: true,
                write_enable: false,
                compare: CompareOp::LessEqual,
            },
            rasterization: RasterizationState::default(),
            blend: BlendMode::Opaque,
            color_write_mask: ColorWriteMask::ALL,
            topology: PrimitiveTopology::TriangleList,
            scissor: None,
        }
    }

    /// Editor overlays: alpha-blended, depth tested, depth not written
    pub fn overlay_depth_tested() -> Self {
        Self {
            depth: DepthState {
                test_enable: true,
                write_enable: false,
                compare: CompareOp::LessEqual,
            },
            rasterization: RasterizationState::default(),
            blend: BlendMode::AlphaBlend,
            color_write_mask: ColorWriteMask::ALL,
            topology: PrimitiveTopology::TriangleList,
            scissor: None,
        }
    }

    /// Particles: additive color, depth tested, alpha channel untouched
    pub fn additive_particles() -> Self {
        Self {
            depth: DepthState {
                test_enable: true,
                write_enable: false,
                compare: CompareOp::Less,
            },
            rasterization: RasterizationState::default(),
            blend: BlendMode::Additive,
            color_write_mask: ColorWriteMask::RGB,
            topology: PrimitiveTopology::TriangleList,
            scissor: None,
        }
    }

    /// Fill mode actually rasterized, folding line and point topologies in
    pub fn effective_polygon_mode(&self) -> PolygonMode {
        match self.topology {
            PrimitiveTopology::PointList => PolygonMode::Point,
            PrimitiveTopology::LineList => PolygonMode::Line,
            PrimitiveTopology::TriangleList | PrimitiveTopology::TriangleStrip => {
                self.rasterization.polygon_mode
            }
        }
    }

    /// Whether a primitive with `winding` survives face culling
    pub fn passes_cull(&self, winding: FrontFace) -> bool {
        let front = winding == self.rasterization.front_face;
        match self.rasterization.cull_mode {
            CullMode::None => true,
            CullMode::Front => !front,
            CullMode::Back => front,
            CullMode::FrontAndBack => false,
        }
    }

    pub fn with_scissor(mut self, scissor: Option<Rect2D>) -> Self {
        self.scissor = scissor;
        self
    }

    pub fn with_polygon_mode(mut self, mode: PolygonMode) -> Self {
        self.rasterization.polygon_mode = mode;
        self
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
