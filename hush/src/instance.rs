use std::sync::Arc;

use derivative::Derivative;
use fxhash::FxHashSet;
use glam::{uvec2, UVec2};
use hush_gpu::{FrameIndex, GROUP_SIZE};
use log::{debug, info, trace, warn};

use crate::{
    utils, AccumulationMode, CommonSettings, ConstantWriter, Denoiser,
    DescriptorKind, DescriptorPoolDesc, Dispatch, Error, Family, FrameContext,
    GraphBuilder, Pass, PassKind, Permutation, PingPong, PipelineDesc,
    PoolRegion, Resource, ResourceDesc, ResourcePool, ResourceRef, Result,
    ShaderBinding, ShaderTable, TextureDesc, TransientArena, TransientPolicy,
    ViewState, CLEAR_FLOAT_KERNEL, CLEAR_UINT_KERNEL,
};

/// Caller-chosen handle of a denoiser within an instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier(pub u32);

#[derive(Clone, Debug)]
pub struct DenoiserDesc {
    pub identifier: Identifier,
    pub denoiser: Denoiser,
    pub render_width: u16,
    pub render_height: u16,
}

#[derive(Clone, Debug, Default)]
pub struct InstanceCreationDesc {
    pub denoisers: Vec<DenoiserDesc>,
    pub transient_policy: TransientPolicy,
}

/// Everything the caller has to allocate up front.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstanceDesc {
    pub permanent_pool: Vec<TextureDesc>,
    pub transient_pool: Vec<TextureDesc>,

    /// Indexed by [`crate::PipelineId`]
    pub pipelines: Vec<PipelineDesc>,

    /// Size of the largest constant data of any dispatch, in bytes
    pub constant_buffer_max_size: usize,

    pub descriptor_pool: DescriptorPoolDesc,

    /// Dispatches clearing every texture of both pools; issued automatically
    /// on the first frame
    pub clears: Vec<Dispatch>,
}

/// Single denoiser of an instance.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct DenoiserInstance {
    identifier: Identifier,

    #[derivative(Debug = "ignore")]
    family: Arc<dyn Family>,

    render_size: UVec2,
    settings: Vec<u8>,
    passes: Vec<Pass>,

    #[derivative(Debug = "ignore")]
    names: Vec<Arc<str>>,

    ping_pong: PingPong,
    region: PoolRegion,
    view: ViewState,

    /// Clears of this denoiser's permanent textures
    clears: Vec<Dispatch>,
}

impl DenoiserInstance {
    pub fn identifier(&self) -> Identifier {
        self.identifier
    }

    pub fn name(&self) -> &'static str {
        self.family.name()
    }

    pub fn render_size(&self) -> UVec2 {
        self.render_size
    }

    pub fn settings(&self) -> &[u8] {
        &self.settings
    }

    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    pub fn ping_pong(&self) -> &PingPong {
        &self.ping_pong
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    fn resolve(&self, resource: ResourceRef) -> Resource {
        match resource {
            ResourceRef::Permanent(idx) => {
                Resource::Permanent(self.region.permanent(idx))
            }
            ResourceRef::Transient(idx) => {
                Resource::Transient(self.region.transient(idx))
            }
            ResourceRef::History(pair, role) => Resource::Permanent(
                self.region.permanent(self.ping_pong.resolve(pair, role)),
            ),
            ResourceRef::External(slot) => Resource::External(slot),
        }
    }
}

/// Set of denoisers sharing pools, pipelines and a constant buffer.
#[derive(Debug)]
pub struct Instance {
    desc: InstanceDesc,
    denoisers: Vec<DenoiserInstance>,
    bindings: Vec<ShaderBinding>,
    constants: ConstantWriter,
    arena: TransientArena,
    startup: Startup,
    dispatches: Vec<Dispatch>,
}

/// Progress of the clears issued when an instance starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Startup {
    Pending,

    /// Clears are part of given frame; assembling it again repeats them
    Clearing(FrameIndex),

    Done,
}

impl Startup {
    /// Returns whether given frame has to begin with every build-time clear.
    fn observe(&mut self, frame: FrameIndex) -> bool {
        match *self {
            Self::Pending => {
                *self = Self::Clearing(frame);
                true
            }
            Self::Clearing(first) if first == frame => true,
            Self::Clearing(_) | Self::Done => {
                *self = Self::Done;
                false
            }
        }
    }
}

impl Instance {
    pub fn new(desc: &InstanceCreationDesc) -> Result<Self> {
        utils::measure("instance.new", || Self::build(desc))
    }

    fn build(desc: &InstanceCreationDesc) -> Result<Self> {
        let mut identifiers = FxHashSet::default();
        let mut shaders = ShaderTable::default();
        let mut pool = ResourcePool::default();
        let mut denoisers = Vec::with_capacity(desc.denoisers.len());

        for denoiser in &desc.denoisers {
            if !identifiers.insert(denoiser.identifier) {
                return Err(Error::DuplicateIdentifier(denoiser.identifier));
            }

            if denoiser.render_width == 0 || denoiser.render_height == 0 {
                return Err(Error::InvalidRenderSize {
                    width: denoiser.render_width,
                    height: denoiser.render_height,
                });
            }

            let family = denoiser.denoiser.family()?;

            let render_size = uvec2(
                denoiser.render_width as u32,
                denoiser.render_height as u32,
            );

            info!(
                "Creating denoiser #{}: {} ({}x{})",
                denoiser.identifier.0,
                family.name(),
                render_size.x,
                render_size.y,
            );

            let mut graph =
                GraphBuilder::new(family.name(), render_size, &mut shaders);

            family.declare(&mut graph)?;

            let graph = graph.finish()?;

            let region = pool.allocate(
                family.name(),
                &graph.permanent,
                &graph.transient,
                desc.transient_policy,
            );

            let names = graph
                .passes
                .iter()
                .map(|pass| format!("{}:{}", family.name(), pass.name()).into())
                .collect();

            denoisers.push(DenoiserInstance {
                identifier: denoiser.identifier,
                settings: family.default_settings(),
                family,
                render_size,
                passes: graph.passes,
                names,
                ping_pong: graph.ping_pong,
                region,
                view: ViewState::default(),
                clears: Vec::new(),
            });
        }

        let clears = Self::build_clears(&mut shaders, &pool)?;

        for denoiser in &mut denoisers {
            denoiser.clears = clears[denoiser.region.permanent_range()]
                .iter()
                .cloned()
                .map(|clear| Dispatch {
                    identifier: Some(denoiser.identifier),
                    ..clear
                })
                .collect();
        }

        let descriptor_pool =
            Self::build_descriptor_pool(&shaders, &denoisers, &clears);

        let ShaderTable {
            pipelines,
            bindings,
            constants,
        } = shaders;

        let desc = InstanceDesc {
            permanent_pool: pool.permanent().to_vec(),
            transient_pool: pool.transient().to_vec(),
            pipelines: pipelines.into_vec(),
            constant_buffer_max_size: constants.max_size(),
            descriptor_pool,
            clears,
        };

        info!(
            "Instance created: {} denoiser(s), {} pipeline(s), {} permanent \
             and {} transient texture(s), {} bytes of constants",
            denoisers.len(),
            desc.pipelines.len(),
            desc.permanent_pool.len(),
            desc.transient_pool.len(),
            desc.constant_buffer_max_size,
        );

        Ok(Self {
            arena: TransientArena::new(desc.transient_pool.len()),
            desc,
            denoisers,
            bindings,
            constants,
            startup: Startup::Pending,
            dispatches: Vec::new(),
        })
    }

    fn build_clears(
        shaders: &mut ShaderTable,
        pool: &ResourcePool,
    ) -> Result<Vec<Dispatch>> {
        let permanent =
            pool.permanent().iter().enumerate().map(|(idx, desc)| {
                let name = format!("clear:permanent#{idx}");

                (Resource::Permanent(idx), name, desc)
            });

        let transient =
            pool.transient().iter().enumerate().map(|(idx, desc)| {
                let name = format!("clear:transient#{idx}");

                (Resource::Transient(idx), name, desc)
            });

        permanent
            .chain(transient)
            .map(|(resource, name, desc)| {
                let kernel = if desc.is_integer() {
                    CLEAR_UINT_KERNEL
                } else {
                    CLEAR_FLOAT_KERNEL
                };

                let pipeline = shaders
                    .pipelines
                    .register(PipelineDesc::new(kernel, 0, 1, false))?;

                let size = uvec2(desc.width as u32, desc.height as u32);

                Ok(Dispatch {
                    name: name.into(),
                    identifier: None,
                    pipeline,
                    resources: vec![ResourceDesc {
                        kind: DescriptorKind::StorageTexture,
                        resource,
                        mip_offset: 0,
                        mip_num: desc.mip_num,
                    }],
                    grid: (size + UVec2::splat(GROUP_SIZE - 1)) / GROUP_SIZE,
                    constants: Vec::new(),
                })
            })
            .collect()
    }

    fn build_descriptor_pool(
        shaders: &ShaderTable,
        denoisers: &[DenoiserInstance],
        clears: &[Dispatch],
    ) -> DescriptorPoolDesc {
        let mut desc = DescriptorPoolDesc::default();

        for pass in denoisers.iter().flat_map(|denoiser| &denoiser.passes) {
            let binding = pass
                .bindings(&shaders.bindings)
                .iter()
                .max_by_key(|binding| {
                    (binding.max_repeat, binding.constant_size)
                });

            if let Some(binding) = binding {
                desc.add(
                    shaders.pipelines.get(binding.pipeline),
                    binding.max_repeat,
                );
            }
        }

        for clear in clears {
            desc.add(shaders.pipelines.get(clear.pipeline), 1);
        }

        desc
    }

    pub fn desc(&self) -> &InstanceDesc {
        &self.desc
    }

    pub fn denoisers(&self) -> &[DenoiserInstance] {
        &self.denoisers
    }

    pub fn denoiser(
        &self,
        identifier: Identifier,
    ) -> Option<&DenoiserInstance> {
        self.denoisers
            .iter()
            .find(|denoiser| denoiser.identifier == identifier)
    }

    /// Replaces settings of given denoiser; on failure, the previous settings
    /// stay in effect.
    pub fn set_denoiser_settings(
        &mut self,
        identifier: Identifier,
        settings: &[u8],
    ) -> Result<()> {
        let denoiser = self
            .denoisers
            .iter_mut()
            .find(|denoiser| denoiser.identifier == identifier)
            .ok_or(Error::UnknownIdentifier(identifier))?;

        if denoiser.settings.len() != settings.len() {
            return Err(Error::SettingsSizeMismatch {
                denoiser: denoiser.family.name(),
                expected: denoiser.settings.len(),
                actual: settings.len(),
            });
        }

        debug!(
            "Updating settings of denoiser #{} ({})",
            identifier.0,
            denoiser.family.name()
        );

        denoiser.settings.copy_from_slice(settings);

        Ok(())
    }

    /// See: [`Self::set_denoiser_settings()`].
    pub fn set_settings<S>(
        &mut self,
        identifier: Identifier,
        settings: &S,
    ) -> Result<()>
    where
        S: bytemuck::Pod,
    {
        self.set_denoiser_settings(identifier, bytemuck::bytes_of(settings))
    }

    /// Returns the dispatches the caller has to submit this frame, in order.
    ///
    /// Calling this again for the same frame index yields the same
    /// dispatches.
    pub fn get_compute_dispatches(
        &mut self,
        settings: &CommonSettings,
    ) -> &[Dispatch] {
        utils::measure("instance.get_compute_dispatches", || {
            self.assemble(settings)
        });

        &self.dispatches
    }

    fn assemble(&mut self, common: &CommonSettings) {
        let frame = common.frame_index;

        self.dispatches.clear();
        self.arena.begin_frame();

        let clear_all = self.startup.observe(frame);

        if clear_all {
            self.dispatches.extend(self.desc.clears.iter().cloned());
        }

        let mut emitter = Emitter {
            bindings: &self.bindings,
            constants: &mut self.constants,
            arena: &mut self.arena,
            dispatches: &mut self.dispatches,
        };

        for (idx, denoiser) in self.denoisers.iter_mut().enumerate() {
            denoiser
                .ping_pong
                .observe(frame, common.accumulation_mode.is_reset());

            let denoiser = &*denoiser;
            let constants =
                denoiser.view.constants(common, denoiser.render_size);

            let ctx = FrameContext::new(
                common,
                &constants,
                denoiser.render_size,
                &denoiser.settings,
            );

            // Startup clears cover every permanent texture already
            if common.accumulation_mode == AccumulationMode::ClearAndRestart
                && !clear_all
            {
                emitter.dispatches.extend(denoiser.clears.iter().cloned());
            }

            let split_screen = denoiser
                .passes
                .iter()
                .position(|pass| pass.kind() == PassKind::SplitScreen);

            if common.is_split_screen_only() {
                if let Some(pass) = split_screen {
                    let permutation = Permutation::default();

                    emitter.emit(idx, denoiser, &ctx, pass, &permutation);
                } else {
                    warn!(
                        "Denoiser #{} ({}) has no split-screen pass; skipping \
                         it",
                        denoiser.identifier.0,
                        denoiser.family.name(),
                    );
                }

                continue;
            }

            let permutation = denoiser.family.permutation(&ctx);

            for (pass_idx, pass) in denoiser.passes.iter().enumerate() {
                let skip = match pass.kind() {
                    PassKind::Regular | PassKind::TileClassification => false,
                    PassKind::SplitScreen => true,
                    PassKind::Validation => !common.enable_validation,
                };

                if !skip {
                    emitter.emit(idx, denoiser, &ctx, pass_idx, &permutation);
                }
            }

            if common.is_split_screen() {
                if let Some(pass) = split_screen {
                    emitter.emit(idx, denoiser, &ctx, pass, &permutation);
                }
            }
        }

        for denoiser in &mut self.denoisers {
            denoiser.view.advance(common, denoiser.render_size);
        }

        trace!(
            "Frame {}: assembled {} dispatch(es)",
            frame.get(),
            self.dispatches.len()
        );
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        info!("Deleting instance ({} denoiser(s))", self.denoisers.len());
    }
}

/// Turns passes into dispatches.
struct Emitter<'a> {
    bindings: &'a [ShaderBinding],
    constants: &'a mut ConstantWriter,
    arena: &'a mut TransientArena,
    dispatches: &'a mut Vec<Dispatch>,
}

impl Emitter<'_> {
    fn emit(
        &mut self,
        idx: usize,
        denoiser: &DenoiserInstance,
        ctx: &FrameContext<'_>,
        pass_idx: usize,
        permutation: &Permutation,
    ) {
        let pass = &denoiser.passes[pass_idx];
        let name = &denoiser.names[pass_idx];
        let binding = self.bindings[pass.resolve(permutation)];
        let repeat = denoiser.family.repeat(pass, ctx);

        let count = if repeat.count > binding.max_repeat {
            warn!(
                "Pass `{}` asked to run {} times, but supports at most {}",
                name, repeat.count, binding.max_repeat
            );

            binding.max_repeat
        } else {
            repeat.count
        };

        let grid = binding.grid(ctx.rect_size);

        for iteration in 0..count {
            let odd = repeat.is_odd(iteration);

            let mut resources = Vec::with_capacity(
                pass.inputs().len() + pass.outputs().len(),
            );

            for input in pass.inputs() {
                let resource = denoiser.resolve(input.get(odd));

                if let Resource::Transient(slot) = resource {
                    self.arena.read(slot, idx, name);
                }

                resources.push(ResourceDesc {
                    kind: DescriptorKind::Texture,
                    resource,
                    mip_offset: input.mip_offset,
                    mip_num: input.mip_num,
                });
            }

            for output in pass.outputs() {
                let resource = denoiser.resolve(output.get(odd));

                if let Resource::Transient(slot) = resource {
                    self.arena.write(slot, idx);
                }

                resources.push(ResourceDesc {
                    kind: DescriptorKind::StorageTexture,
                    resource,
                    mip_offset: output.mip_offset,
                    mip_num: output.mip_num,
                });
            }

            denoiser.family.pack(pass, iteration, ctx, self.constants);

            let constants = self.constants.finish();

            debug_assert_eq!(
                binding.constant_size,
                constants.len(),
                "pass `{name}` wrote unexpected amount of constants",
            );

            self.dispatches.push(Dispatch {
                name: name.clone(),
                identifier: Some(denoiser.identifier),
                pipeline: binding.pipeline,
                resources,
                grid,
                constants,
            });
        }
    }
}
