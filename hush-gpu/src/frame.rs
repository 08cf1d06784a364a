use bytemuck::{Pod, Zeroable};

/// Index of the frame being denoised.
///
/// Used as a monotonic token: history buffers get swapped only when a
/// strictly larger index is observed.
#[repr(C)]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod,
    Zeroable,
)]
pub struct FrameIndex(u32);

impl FrameIndex {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// Returns whether this frame lands on the "white" cells of a
    /// checkerboard pattern.
    pub fn is_odd(self) -> bool {
        self.0 % 2 == 1
    }
}

impl From<u32> for FrameIndex {
    fn from(id: u32) -> Self {
        Self(id)
    }
}
