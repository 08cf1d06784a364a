use fxhash::FxHashMap;
use log::debug;

use crate::{DescriptorKind, Error, Result};

/// Kernel clearing float and normalized textures.
pub const CLEAR_FLOAT_KERNEL: &str = "hush_clear_f";

/// Kernel clearing integer textures.
pub const CLEAR_UINT_KERNEL: &str = "hush_clear_u";

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct PipelineId(u16);

impl PipelineId {
    pub fn get(self) -> usize {
        self.0 as usize
    }
}

/// Contiguous run of descriptors of the same kind, bound starting from
/// register zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceRange {
    pub kind: DescriptorKind,
    pub count: u32,
}

/// Everything the caller needs to create a compute pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineDesc {
    pub kernel: String,
    pub resource_ranges: Vec<ResourceRange>,
    pub has_constant_data: bool,
}

impl PipelineDesc {
    pub(crate) fn new(
        kernel: impl Into<String>,
        textures: usize,
        storage_textures: usize,
        has_constant_data: bool,
    ) -> Self {
        let resource_ranges = [
            (DescriptorKind::Texture, textures),
            (DescriptorKind::StorageTexture, storage_textures),
        ]
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(kind, count)| ResourceRange {
            kind,
            count: count as u32,
        })
        .collect();

        Self {
            kernel: kernel.into(),
            resource_ranges,
            has_constant_data,
        }
    }
}

/// Pipeline table, deduplicated by kernel name.
#[derive(Clone, Debug, Default)]
pub(crate) struct Pipelines {
    pipelines: Vec<PipelineDesc>,
    ids: FxHashMap<String, PipelineId>,
}

impl Pipelines {
    pub fn register(&mut self, desc: PipelineDesc) -> Result<PipelineId> {
        if let Some(&id) = self.ids.get(&desc.kernel) {
            if self.pipelines[id.get()] != desc {
                return Err(Error::PipelineMismatch {
                    kernel: desc.kernel,
                });
            }

            return Ok(id);
        }

        let id = PipelineId(self.pipelines.len() as u16);

        debug!("Registering pipeline #{}: {}", id.get(), desc.kernel);

        self.ids.insert(desc.kernel.clone(), id);
        self.pipelines.push(desc);

        Ok(id)
    }

    pub fn get(&self, id: PipelineId) -> &PipelineDesc {
        &self.pipelines[id.get()]
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn into_vec(self) -> Vec<PipelineDesc> {
        self.pipelines
    }
}

/// Worst-case number of descriptors needed within a single frame; used to
/// size the caller's descriptor allocator up front.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DescriptorPoolDesc {
    pub sets_max_num: u32,
    pub textures_max_num: u32,
    pub storage_textures_max_num: u32,
    pub constant_buffers_max_num: u32,
}

impl DescriptorPoolDesc {
    /// Accounts for a pipeline that gets dispatched `times` times per frame.
    pub(crate) fn add(&mut self, pipeline: &PipelineDesc, times: u32) {
        self.sets_max_num += times;

        for range in &pipeline.resource_ranges {
            match range.kind {
                DescriptorKind::Texture => {
                    self.textures_max_num += range.count * times;
                }
                DescriptorKind::StorageTexture => {
                    self.storage_textures_max_num += range.count * times;
                }
            }
        }

        if pipeline.has_constant_data {
            self.constant_buffers_max_num += times;
        }
    }
}
