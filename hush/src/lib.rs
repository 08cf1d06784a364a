//! Hush assembles compute dispatches of real-time denoisers.
//!
//! Denoisers are declared once, as graphs of passes over pooled textures;
//! afterwards, each frame boils down to a call to
//! [`Instance::get_compute_dispatches()`], which picks kernel variants,
//! binds textures, sizes thread-group grids and packs constant data. Hush
//! never touches the GPU itself: creating textures and pipelines and
//! submitting dispatches is up to the caller.
//!
//! ```no_run
//! use hush::*;
//!
//! let mut instance = Instance::new(&InstanceCreationDesc {
//!     denoisers: vec![DenoiserDesc {
//!         identifier: Identifier(0),
//!         denoiser: Denoiser::ReblurDiffuse,
//!         render_width: 1920,
//!         render_height: 1080,
//!     }],
//!     ..Default::default()
//! })
//! .unwrap();
//!
//! for dispatch in instance.get_compute_dispatches(&CommonSettings::default())
//! {
//!     // bind `dispatch.resources`, upload `dispatch.constants`, dispatch
//!     // `dispatch.grid` thread groups
//! }
//! ```

#![allow(clippy::len_without_is_empty)]

mod constants;
mod denoisers;
mod dispatch;
mod double_buffered;
mod error;
mod family;
mod graph;
mod instance;
mod permutation;
mod pipelines;
mod pool;
mod resources;
mod settings;
mod utils;
mod view;

pub use hush_gpu::FrameIndex;

pub use self::constants::*;
pub use self::denoisers::*;
pub use self::dispatch::*;
pub use self::double_buffered::*;
pub use self::error::*;
pub use self::family::*;
pub use self::graph::*;
pub use self::instance::*;
pub use self::permutation::*;
pub use self::pipelines::*;
pub use self::pool::*;
pub use self::resources::*;
pub use self::settings::*;
pub use self::view::*;
