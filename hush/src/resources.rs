use crate::{PairId, Role};

/// Texture living in one of the pools.
///
/// Descriptors are frozen once the graph is built; only the binding of
/// [`ResourceRef::History`] changes from frame to frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureDesc {
    pub format: wgpu::TextureFormat,
    pub width: u16,
    pub height: u16,
    pub mip_num: u16,
}

impl TextureDesc {
    /// Returns whether this texture has to be cleared with integer values.
    pub fn is_integer(&self) -> bool {
        matches!(
            self.format.sample_type(None),
            Some(
                wgpu::TextureSampleType::Uint | wgpu::TextureSampleType::Sint
            )
        )
    }

    /// Describes this texture in a form the caller can hand straight to
    /// `wgpu::Device::create_texture()`.
    pub fn to_wgpu<'a>(
        &self,
        label: Option<&'a str>,
    ) -> wgpu::TextureDescriptor<'a> {
        wgpu::TextureDescriptor {
            label,
            size: wgpu::Extent3d {
                width: self.width as u32,
                height: self.height as u32,
                depth_or_array_layers: 1,
            },
            mip_level_count: self.mip_num as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::STORAGE_BINDING,
            view_formats: &[],
        }
    }
}

/// Texture owned by the caller, bound as-is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExternalSlot {
    InMotionVectors,
    InNormalRoughness,
    InViewZ,
    InDiffuseRadiance,
    InSpecularRadiance,
    InDiffuseConfidence,
    InSpecularConfidence,
    InPenumbra,
    InRadiance,
    OutDiffuseRadiance,
    OutSpecularRadiance,
    OutShadow,
    OutRadiance,
    OutValidation,
}

/// Symbolic reference to a texture, as used when declaring passes.
///
/// Pool indices are local to the denoiser that declares them; they get
/// resolved into absolute pool indices once all denoisers are built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceRef {
    Permanent(u16),
    Transient(u16),
    History(PairId, Role),
    External(ExternalSlot),
}

impl ResourceRef {
    pub fn mips(self, mip_offset: u16, mip_num: u16) -> ResourceBinding {
        ResourceBinding {
            resource: self,
            alternate: None,
            mip_offset,
            mip_num,
        }
    }
}

impl From<ExternalSlot> for ResourceRef {
    fn from(slot: ExternalSlot) -> Self {
        Self::External(slot)
    }
}

/// Resource attached to a pass' input or output slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceBinding {
    pub resource: ResourceRef,

    /// Resource bound instead of `resource` on odd iterations of a repeated
    /// pass
    pub alternate: Option<ResourceRef>,

    pub mip_offset: u16,
    pub mip_num: u16,
}

impl ResourceBinding {
    pub fn get(&self, odd: bool) -> ResourceRef {
        match (odd, self.alternate) {
            (true, Some(alternate)) => alternate,
            _ => self.resource,
        }
    }
}

impl From<ResourceRef> for ResourceBinding {
    fn from(resource: ResourceRef) -> Self {
        resource.mips(0, 1)
    }
}

impl From<ExternalSlot> for ResourceBinding {
    fn from(slot: ExternalSlot) -> Self {
        ResourceRef::from(slot).into()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    /// Read-only, sampled texture
    Texture,

    /// Read-write storage texture
    StorageTexture,
}

/// Resource resolved to an absolute pool index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resource {
    Permanent(usize),
    Transient(usize),
    External(ExternalSlot),
}

/// Single entry of a dispatch's resource list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceDesc {
    pub kind: DescriptorKind,
    pub resource: Resource,
    pub mip_offset: u16,
    pub mip_num: u16,
}
