use std::mem;

use bytemuck::Pod;
use glam::{uvec2, UVec2};
use hush_gpu::GROUP_SIZE;
use log::debug;

use crate::{
    Axis, ConstantWriter, DoubleBuffered, Error, Permutation, PingPong,
    PipelineDesc, PipelineId, Pipelines, ResourceBinding, ResourceRef,
    Result, TextureDesc,
};

/// Kernel variant registered for a pass, before it gets a pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shader {
    kernel: String,
    constant_size: usize,
    group_size: UVec2,
    downsample: u32,
    max_repeat: u32,
}

impl Shader {
    pub fn new(kernel: impl Into<String>) -> Self {
        Self {
            kernel: kernel.into(),
            constant_size: 0,
            group_size: UVec2::splat(GROUP_SIZE),
            downsample: 1,
            max_repeat: 1,
        }
    }

    /// Reserves space for a `T` in the dispatch's constant data; call once
    /// per value the pass writes, in any order.
    pub fn with_constants<T>(self) -> Self
    where
        T: Pod,
    {
        self.with_constant_size(mem::size_of::<T>())
    }

    pub fn with_constant_size(mut self, size: usize) -> Self {
        self.constant_size += size;
        self
    }

    pub fn with_group_size(mut self, x: u32, y: u32) -> Self {
        self.group_size = uvec2(x.max(1), y.max(1));
        self
    }

    /// Makes the kernel process `1 / downsample` of the screen along each
    /// axis.
    pub fn with_downsample(mut self, downsample: u32) -> Self {
        self.downsample = downsample.max(1);
        self
    }

    /// Allows the pass to get dispatched up to `max_repeat` times per frame.
    pub fn with_max_repeat(mut self, max_repeat: u32) -> Self {
        self.max_repeat = max_repeat.max(1);
        self
    }

    pub fn kernel(&self) -> &str {
        &self.kernel
    }
}

/// Kernel variant of a pass, resolved into a pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShaderBinding {
    pub pipeline: PipelineId,
    pub constant_size: usize,
    pub group_size: UVec2,
    pub downsample: u32,
    pub max_repeat: u32,
}

impl ShaderBinding {
    /// Returns how many thread groups cover given rectangle.
    pub fn grid(&self, rect_size: UVec2) -> UVec2 {
        let size = (rect_size + UVec2::splat(self.downsample - 1))
            / self.downsample;

        (size + self.group_size - UVec2::ONE) / self.group_size
    }
}

/// Kernel variants, pipelines and constant-buffer size, shared by all the
/// denoisers of an instance.
#[derive(Debug, Default)]
pub(crate) struct ShaderTable {
    pub pipelines: Pipelines,
    pub bindings: Vec<ShaderBinding>,
    pub constants: ConstantWriter,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassKind {
    Regular,

    /// Flags tiles that need denoising; dispatched before every other pass
    TileClassification,

    /// Copies (or blends) the noisy input into the output; dispatched last
    /// and only when split-screen is enabled
    SplitScreen,

    /// Draws debug information; dispatched only when validation is enabled
    Validation,
}

/// Logical operation of a denoiser, declared once and resolved into a
/// dispatch each frame.
#[derive(Clone, Debug)]
pub struct Pass {
    name: String,
    kind: PassKind,
    axes: Vec<Axis>,
    inputs: Vec<ResourceBinding>,
    outputs: Vec<ResourceBinding>,
    base: usize,
    permutation_count: usize,
}

impl Pass {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PassKind {
        self.kind
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn inputs(&self) -> &[ResourceBinding] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ResourceBinding] {
        &self.outputs
    }

    pub fn permutation_count(&self) -> usize {
        self.permutation_count
    }

    /// Returns the index of the kernel variant matching given permutation,
    /// in the instance-wide table of variants.
    pub fn resolve(&self, permutation: &Permutation) -> usize {
        self.base + permutation.offset(&self.axes)
    }

    /// Returns all kernel variants of this pass, ordered by offset.
    pub(crate) fn bindings<'a>(
        &self,
        table: &'a [ShaderBinding],
    ) -> &'a [ShaderBinding] {
        &table[self.base..(self.base + self.permutation_count)]
    }
}

/// Pass graph and pools of a single denoiser, as declared.
#[derive(Debug)]
pub(crate) struct Graph {
    pub permanent: Vec<TextureDesc>,
    pub transient: Vec<TextureDesc>,
    pub ping_pong: PingPong,
    pub passes: Vec<Pass>,
}

/// Records the pools and passes of a single denoiser.
pub struct GraphBuilder<'a> {
    denoiser: &'static str,
    render_size: UVec2,
    permanent: Vec<Option<TextureDesc>>,
    transient: Vec<Option<TextureDesc>>,
    ping_pong: PingPong,
    passes: Vec<Pass>,
    shaders: &'a mut ShaderTable,
}

impl<'a> GraphBuilder<'a> {
    pub(crate) fn new(
        denoiser: &'static str,
        render_size: UVec2,
        shaders: &'a mut ShaderTable,
    ) -> Self {
        Self {
            denoiser,
            render_size,
            permanent: Default::default(),
            transient: Default::default(),
            ping_pong: Default::default(),
            passes: Default::default(),
            shaders,
        }
    }

    pub fn render_size(&self) -> UVec2 {
        self.render_size
    }

    /// Describes a texture covering `1 / downsample` of the render target.
    pub fn texture(
        &self,
        format: wgpu::TextureFormat,
        downsample: u16,
        mip_num: u16,
    ) -> TextureDesc {
        let downsample = downsample.max(1) as u32;
        let size =
            (self.render_size + UVec2::splat(downsample - 1)) / downsample;

        TextureDesc {
            format,
            width: size.x as u16,
            height: size.y as u16,
            mip_num: mip_num.max(1),
        }
    }

    /// Adds a texture that survives between frames.
    pub fn permanent(&mut self, desc: TextureDesc) -> ResourceRef {
        self.permanent.push(Some(desc));
        ResourceRef::Permanent((self.permanent.len() - 1) as u16)
    }

    /// Adds a scratch texture, valid only within this denoiser's passes of
    /// the current frame.
    pub fn transient(&mut self, desc: TextureDesc) -> ResourceRef {
        self.transient.push(Some(desc));
        ResourceRef::Transient((self.transient.len() - 1) as u16)
    }

    /// Adds two permanent textures that get swapped after each frame.
    pub fn permanent_pair(&mut self, desc: TextureDesc) -> DoubleBuffered {
        let a = self.permanent.len() as u16;

        self.permanent.push(Some(desc));
        self.permanent.push(Some(desc));
        self.ping_pong.add(a, a + 1)
    }

    /// Declares a pool slot at given index; slots past the end grow the pool
    /// and slots declared twice must agree on their descriptors.
    pub fn declare(
        &mut self,
        resource: ResourceRef,
        desc: TextureDesc,
    ) -> Result<ResourceRef> {
        let (pool, idx) = match resource {
            ResourceRef::Permanent(idx) => (&mut self.permanent, idx),
            ResourceRef::Transient(idx) => (&mut self.transient, idx),
            _ => return Err(Error::UndeclarableResource(resource)),
        };

        let idx = idx as usize;

        if idx >= pool.len() {
            pool.resize(idx + 1, None);
        }

        match pool[idx] {
            None => {
                pool[idx] = Some(desc);
            }

            Some(existing) if existing == desc => {
                //
            }

            Some(existing) => {
                return Err(Error::ResourceMismatch {
                    resource,
                    existing,
                    requested: desc,
                });
            }
        }

        Ok(resource)
    }

    pub fn pass<'g>(
        &'g mut self,
        name: impl Into<String>,
    ) -> PassBuilder<'g, 'a> {
        PassBuilder {
            graph: self,
            name: name.into(),
            kind: PassKind::Regular,
            axes: Default::default(),
            inputs: Default::default(),
            outputs: Default::default(),
            shaders: Default::default(),
        }
    }

    fn ensure_declared(&self, resource: ResourceRef) -> Result<()> {
        let declared = match resource {
            ResourceRef::Permanent(idx) => {
                (idx as usize) < self.permanent.len()
            }
            ResourceRef::Transient(idx) => {
                (idx as usize) < self.transient.len()
            }
            ResourceRef::History(pair, _) => self.ping_pong.contains(pair),
            ResourceRef::External(_) => true,
        };

        if declared {
            Ok(())
        } else {
            Err(Error::UndeclaredResource(resource))
        }
    }

    pub(crate) fn finish(self) -> Result<Graph> {
        fn collect(
            pool: Vec<Option<TextureDesc>>,
            resource: fn(u16) -> ResourceRef,
        ) -> Result<Vec<TextureDesc>> {
            pool.into_iter()
                .enumerate()
                .map(|(idx, desc)| {
                    desc.ok_or(Error::UndeclaredResource(resource(idx as u16)))
                })
                .collect()
        }

        let permanent = collect(self.permanent, ResourceRef::Permanent)?;
        let transient = collect(self.transient, ResourceRef::Transient)?;

        debug!(
            "Graph of `{}` ready: {} pass(es), {} permanent and {} transient \
             texture(s)",
            self.denoiser,
            self.passes.len(),
            permanent.len(),
            transient.len(),
        );

        Ok(Graph {
            permanent,
            transient,
            ping_pong: self.ping_pong,
            passes: self.passes,
        })
    }
}

pub struct PassBuilder<'g, 'a> {
    graph: &'g mut GraphBuilder<'a>,
    name: String,
    kind: PassKind,
    axes: Vec<Axis>,
    inputs: Vec<ResourceBinding>,
    outputs: Vec<ResourceBinding>,
    shaders: Vec<(Permutation, Shader)>,
}

impl<'g, 'a> PassBuilder<'g, 'a> {
    /// Declares the runtime choices this pass provides separate kernels for;
    /// the first axis is the most significant one when laying out
    /// permutations.
    pub fn axes(mut self, axes: impl IntoIterator<Item = Axis>) -> Self {
        for axis in axes {
            if !self.axes.contains(&axis) {
                self.axes.push(axis);
            }
        }

        self
    }

    /// Appends a read-only resource; binding slots follow call order.
    pub fn input(mut self, resource: impl Into<ResourceBinding>) -> Self {
        self.inputs.push(resource.into());
        self
    }

    /// Appends a writable resource; binding slots follow call order.
    pub fn output(mut self, resource: impl Into<ResourceBinding>) -> Self {
        self.outputs.push(resource.into());
        self
    }

    /// Appends a read-only resource that flips between `even` and `odd` on
    /// consecutive iterations.
    pub fn input_alternating(
        self,
        even: ResourceRef,
        odd: ResourceRef,
    ) -> Self {
        self.input(ResourceBinding {
            alternate: Some(odd),
            ..even.into()
        })
    }

    /// See: [`Self::input_alternating()`].
    pub fn output_alternating(
        self,
        even: ResourceRef,
        odd: ResourceRef,
    ) -> Self {
        self.output(ResourceBinding {
            alternate: Some(odd),
            ..even.into()
        })
    }

    pub fn classify_tiles(mut self) -> Self {
        self.kind = PassKind::TileClassification;
        self
    }

    pub fn split_screen(mut self) -> Self {
        self.kind = PassKind::SplitScreen;
        self
    }

    pub fn validation(mut self) -> Self {
        self.kind = PassKind::Validation;
        self
    }

    /// Registers the only kernel of a pass that has no permutation axes.
    pub fn dispatch(self, shader: Shader) -> Self {
        self.permutation(Permutation::default(), shader)
    }

    /// Registers the kernel used for given permutation.
    pub fn permutation(
        mut self,
        permutation: Permutation,
        shader: Shader,
    ) -> Self {
        self.shaders.push((permutation, shader));
        self
    }

    /// Registers a kernel for each permutation over this pass' axes.
    pub fn permutations(
        mut self,
        mut shader: impl FnMut(Permutation) -> Shader,
    ) -> Self {
        for permutation in Permutation::enumerate(&self.axes) {
            self.shaders.push((permutation, shader(permutation)));
        }

        self
    }

    pub fn build(self) -> Result<()> {
        let Self {
            graph,
            name,
            kind,
            axes,
            inputs,
            outputs,
            shaders,
        } = self;

        for binding in inputs.iter().chain(&outputs) {
            graph.ensure_declared(binding.resource)?;

            if let Some(alternate) = binding.alternate {
                graph.ensure_declared(alternate)?;
            }
        }

        match kind {
            PassKind::TileClassification => {
                if !axes.is_empty() {
                    return Err(Error::PermutedTileClassification {
                        pass: name,
                    });
                }

                let is_first = graph
                    .passes
                    .iter()
                    .all(|pass| pass.kind == PassKind::TileClassification);

                if !is_first {
                    return Err(Error::MisplacedTileClassification {
                        pass: name,
                    });
                }
            }

            PassKind::SplitScreen => {
                let has_split_screen = graph
                    .passes
                    .iter()
                    .any(|pass| pass.kind == PassKind::SplitScreen);

                if has_split_screen {
                    return Err(Error::DuplicateSplitScreen { pass: name });
                }
            }

            PassKind::Regular | PassKind::Validation => {
                //
            }
        }

        let permutation_count = Permutation::count(&axes);
        let mut table: Vec<Option<ShaderBinding>> =
            vec![None; permutation_count];

        for (permutation, shader) in shaders {
            if !permutation.is_projected(&axes) {
                return Err(Error::UnexpectedPermutation {
                    pass: name,
                    permutation,
                });
            }

            let slot = &mut table[permutation.offset(&axes)];

            if slot.is_some() {
                return Err(Error::DuplicatePermutation {
                    pass: name,
                    permutation,
                });
            }

            let pipeline = graph.shaders.pipelines.register(PipelineDesc::new(
                shader.kernel,
                inputs.len(),
                outputs.len(),
                shader.constant_size > 0,
            ))?;

            graph.shaders.constants.declare(shader.constant_size);

            *slot = Some(ShaderBinding {
                pipeline,
                constant_size: shader.constant_size,
                group_size: shader.group_size,
                downsample: shader.downsample,
                max_repeat: shader.max_repeat,
            });
        }

        let table: Vec<_> = table.into_iter().flatten().collect();

        if table.len() != permutation_count {
            return Err(Error::MissingPermutations {
                pass: name,
                expected: permutation_count,
                actual: table.len(),
            });
        }

        debug!(
            "Declared pass `{}:{}` ({:?}, {} permutation(s))",
            graph.denoiser, name, kind, permutation_count
        );

        let base = graph.shaders.bindings.len();

        graph.shaders.bindings.extend(table);

        graph.passes.push(Pass {
            name,
            kind,
            axes,
            inputs,
            outputs,
            base,
            permutation_count,
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use hush_gpu::CommonConstants;

    use super::*;
    use crate::{ExternalSlot, HitDistanceReconstruction};

    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

    fn builder(shaders: &mut ShaderTable) -> GraphBuilder<'_> {
        GraphBuilder::new("test", uvec2(64, 48), shaders)
    }

    #[test]
    fn pools() {
        let mut shaders = ShaderTable::default();
        let mut target = builder(&mut shaders);
        let desc = target.texture(FORMAT, 2, 1);

        assert_eq!(32, desc.width);
        assert_eq!(24, desc.height);

        assert_eq!(ResourceRef::Permanent(0), target.permanent(desc));
        assert_eq!(ResourceRef::Transient(0), target.transient(desc));
        assert_eq!(ResourceRef::Transient(1), target.transient(desc));

        let pair = target.permanent_pair(desc);

        assert_eq!(ResourceRef::Permanent(3), target.permanent(desc));

        let graph = target.finish().unwrap();

        assert_eq!(4, graph.permanent.len());
        assert_eq!(2, graph.transient.len());
        assert_eq!(1, graph.ping_pong.len());
        assert!(graph.ping_pong.contains(pair.id()));
    }

    #[test]
    fn declare() {
        let mut shaders = ShaderTable::default();
        let mut target = builder(&mut shaders);
        let desc = target.texture(FORMAT, 1, 1);
        let other = target.texture(wgpu::TextureFormat::R8Unorm, 1, 1);

        target.declare(ResourceRef::Transient(2), desc).unwrap();
        target.declare(ResourceRef::Transient(2), desc).unwrap();

        let err = target
            .declare(ResourceRef::Transient(2), other)
            .unwrap_err();

        assert!(matches!(err, Error::ResourceMismatch { .. }));

        let err = target
            .declare(ExternalSlot::InViewZ.into(), desc)
            .unwrap_err();

        assert!(matches!(err, Error::UndeclarableResource(_)));

        // Slots 0 and 1 are still missing
        let err = target.finish().unwrap_err();

        assert!(matches!(
            err,
            Error::UndeclaredResource(ResourceRef::Transient(0))
        ));
    }

    #[test]
    fn permutations_ignore_declaration_order() {
        let mut shaders = ShaderTable::default();
        let mut target = builder(&mut shaders);
        let axes = [Axis::PerformanceMode, Axis::HistoryReset];

        let mut pass = target
            .pass("a")
            .axes(axes)
            .input(ExternalSlot::InViewZ)
            .output(ExternalSlot::OutRadiance);

        for offset in (0..4).rev() {
            pass = pass.permutation(
                Permutation::from_offset(&axes, offset),
                Shader::new(format!("a{offset}")),
            );
        }

        pass.build().unwrap();

        let graph = target.finish().unwrap();
        let pass = &graph.passes[0];

        assert_eq!(4, pass.permutation_count());

        for (offset, permutation) in Permutation::enumerate(&axes).enumerate()
        {
            let binding = shaders.bindings[pass.resolve(&permutation)];

            assert_eq!(
                format!("a{offset}"),
                shaders.pipelines.get(binding.pipeline).kernel
            );
        }
    }

    #[test]
    fn missing_permutation() {
        let mut shaders = ShaderTable::default();
        let mut target = builder(&mut shaders);

        let err = target
            .pass("a")
            .axes([Axis::HitDistanceReconstruction])
            .permutation(Permutation::default(), Shader::new("a"))
            .build()
            .unwrap_err();

        assert!(matches!(
            err,
            Error::MissingPermutations {
                expected: 3,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn duplicate_permutation() {
        let mut shaders = ShaderTable::default();
        let mut target = builder(&mut shaders);

        let err = target
            .pass("a")
            .dispatch(Shader::new("a"))
            .dispatch(Shader::new("b"))
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::DuplicatePermutation { .. }));
    }

    #[test]
    fn unexpected_permutation() {
        let mut shaders = ShaderTable::default();
        let mut target = builder(&mut shaders);

        let permutation = Permutation {
            hit_distance_reconstruction: HitDistanceReconstruction::Area3x3,
            ..Default::default()
        };

        let err = target
            .pass("a")
            .axes([Axis::PerformanceMode])
            .permutation(permutation, Shader::new("a"))
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::UnexpectedPermutation { .. }));
    }

    #[test]
    fn undeclared_resource() {
        let mut shaders = ShaderTable::default();
        let mut target = builder(&mut shaders);

        let err = target
            .pass("a")
            .input(ResourceRef::Transient(0))
            .dispatch(Shader::new("a"))
            .build()
            .unwrap_err();

        assert!(matches!(
            err,
            Error::UndeclaredResource(ResourceRef::Transient(0))
        ));
    }

    #[test]
    fn pass_kinds() {
        let mut shaders = ShaderTable::default();
        let mut target = builder(&mut shaders);

        target
            .pass("classify")
            .classify_tiles()
            .dispatch(Shader::new("classify"))
            .build()
            .unwrap();

        target.pass("a").dispatch(Shader::new("a")).build().unwrap();

        let err = target
            .pass("classify_again")
            .classify_tiles()
            .dispatch(Shader::new("classify"))
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::MisplacedTileClassification { .. }));

        target
            .pass("split")
            .split_screen()
            .dispatch(Shader::new("split"))
            .build()
            .unwrap();

        let err = target
            .pass("split_again")
            .split_screen()
            .dispatch(Shader::new("split"))
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::DuplicateSplitScreen { .. }));

        let err = target
            .pass("classify_permuted")
            .classify_tiles()
            .axes([Axis::HistoryReset])
            .permutations(|_| Shader::new("classify"))
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::PermutedTileClassification { .. }));
    }

    #[test]
    fn constant_size_is_monotonic() {
        let mut shaders = ShaderTable::default();
        let mut target = builder(&mut shaders);
        let mut sizes = Vec::new();

        for (name, size) in [("a", 16), ("b", 64), ("c", 32)] {
            target
                .pass(name)
                .dispatch(Shader::new(name).with_constant_size(size))
                .build()
                .unwrap();

            sizes.push(target.shaders.constants.max_size());
        }

        target
            .pass("d")
            .dispatch(Shader::new("d").with_constants::<CommonConstants>())
            .build()
            .unwrap();

        sizes.push(target.shaders.constants.max_size());

        assert_eq!(vec![16, 64, 64, 336], sizes);
    }

    #[test]
    fn grid() {
        let target = ShaderBinding {
            pipeline: PipelineId::default(),
            constant_size: 0,
            group_size: uvec2(8, 4),
            downsample: 1,
            max_repeat: 1,
        };

        assert_eq!(uvec2(8, 16), target.grid(uvec2(64, 64)));
        assert_eq!(uvec2(9, 17), target.grid(uvec2(65, 65)));

        let target = ShaderBinding {
            downsample: 2,
            ..target
        };

        assert_eq!(uvec2(4, 8), target.grid(uvec2(64, 64)));
        assert_eq!(uvec2(5, 9), target.grid(uvec2(65, 65)));
    }
}
