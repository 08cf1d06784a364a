use derivative::Derivative;
use glam::{Mat4, Vec2, Vec3};
use hush_gpu::FrameIndex;

/// What happens with the history this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AccumulationMode {
    /// Keep accumulating
    #[default]
    Continue,

    /// Ignore the history (e.g. after a camera cut)
    Restart,

    /// Ignore the history and clear every permanent resource beforehand
    ClearAndRestart,
}

impl AccumulationMode {
    pub fn is_reset(self) -> bool {
        !matches!(self, Self::Continue)
    }
}

/// Which cells of a checkerboard pattern contain valid samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Checkerboard {
    #[default]
    Off,
    Black,
    White,
}

impl Checkerboard {
    pub fn index(self) -> usize {
        match self {
            Self::Off => 0,
            Self::Black => 1,
            Self::White => 2,
        }
    }

    pub fn from_index(index: usize) -> Self {
        match index {
            1 => Self::Black,
            2 => Self::White,
            _ => Self::Off,
        }
    }

    pub fn is_on(self) -> bool {
        self != Self::Off
    }
}

/// Neighborhood used to reconstruct hit distances of pixels that didn't trace
/// any rays this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HitDistanceReconstruction {
    #[default]
    Off,
    Area3x3,
    Area5x5,
}

impl HitDistanceReconstruction {
    pub fn index(self) -> usize {
        match self {
            Self::Off => 0,
            Self::Area3x3 => 1,
            Self::Area5x5 => 2,
        }
    }

    pub fn from_index(index: usize) -> Self {
        match index {
            1 => Self::Area3x3,
            2 => Self::Area5x5,
            _ => Self::Off,
        }
    }
}

/// Settings shared by every denoiser, supplied each frame.
///
/// Matrices and jitter describe the current frame only; their previous-frame
/// counterparts are remembered by each denoiser.
#[derive(Clone, Debug, PartialEq, Derivative)]
#[derivative(Default)]
pub struct CommonSettings {
    pub view_to_clip: Mat4,
    pub world_to_view: Mat4,

    #[derivative(Default(value = "glam::vec3(1.0, 1.0, 0.0)"))]
    pub motion_vector_scale: Vec3,

    /// Sub-pixel camera jitter, in pixels
    pub camera_jitter: Vec2,

    /// Dynamic-resolution scale of the render target, in `(0.0, 1.0]`
    #[derivative(Default(value = "Vec2::ONE"))]
    pub resolution_scale: Vec2,

    /// Time between frames, in milliseconds; `0.0` if unknown
    pub time_delta_between_frames: f32,

    /// View-space depth beyond which pixels are treated as background
    #[derivative(Default(value = "500000.0"))]
    pub denoising_range: f32,

    #[derivative(Default(value = "0.01"))]
    pub disocclusion_threshold: f32,

    /// Fraction of the screen showing the noisy input; `1.0` bypasses
    /// denoising entirely
    pub split_screen: f32,

    pub frame_index: FrameIndex,
    pub accumulation_mode: AccumulationMode,
    pub is_motion_vector_in_world_space: bool,
    pub is_history_confidence_available: bool,
    pub enable_validation: bool,
}

impl CommonSettings {
    pub fn is_split_screen_only(&self) -> bool {
        self.split_screen >= 1.0
    }

    pub fn is_split_screen(&self) -> bool {
        self.split_screen > 0.0
    }
}
