use std::sync::Arc;

use glam::UVec2;

use crate::{Identifier, PipelineId, ResourceDesc};

/// Compute dispatch the caller has to submit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dispatch {
    /// Name of the pass this dispatch comes from, for debug labels
    pub name: Arc<str>,

    /// Denoiser this dispatch belongs to; `None` for the clears issued on the
    /// first frame
    pub identifier: Option<Identifier>,

    pub pipeline: PipelineId,

    /// Inputs followed by outputs, in the order the pipeline binds them
    pub resources: Vec<ResourceDesc>,

    /// Number of thread groups
    pub grid: UVec2,

    pub constants: Vec<u8>,
}
