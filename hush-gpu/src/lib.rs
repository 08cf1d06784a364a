//! Constant-data layouts and numeric helpers shared between Hush's dispatch
//! builder and the denoising kernels.
//!
//! Every struct here is `#[repr(C)]` and `Pod`; the kernels read them as raw
//! bytes, so field order and size are part of the kernel interface.

#![allow(clippy::len_without_is_empty)]

mod frame;
mod passes;
mod view;

pub use self::frame::*;
pub use self::passes::*;
pub use self::view::*;

/// Side of the thread groups used by most denoising kernels.
pub const GROUP_SIZE: u32 = 8;

/// Side of a tile produced by tile classification, in pixels.
pub const TILE_SIZE: u32 = 16;
