use bytemuck::{Pod, Zeroable};
use derivative::Derivative;
use hush_gpu::{
    AtrousConstants, CommonConstants, RelaxConstants, SplitScreenConstants,
    TILE_SIZE,
};
use wgpu::TextureFormat;

use super::Signal;
use crate::{
    Axis, Checkerboard, ConstantWriter, DoubleBuffered, ExternalSlot, Family,
    FrameContext, GraphBuilder, HitDistanceReconstruction, Pass, Permutation,
    Repeat, ResourceRef, Result, Shader,
};

const CLASSIFY_TILES: &str = "classify_tiles";
const HIT_DISTANCE_RECONSTRUCTION: &str = "hit_distance_reconstruction";
const PREPASS: &str = "prepass";
const TEMPORAL_ACCUMULATION: &str = "temporal_accumulation";
const HISTORY_FIX: &str = "history_fix";
const HISTORY_CLAMPING: &str = "history_clamping";
const ATROUS_FIRST: &str = "atrous_first";
const ATROUS: &str = "atrous";
const ATROUS_LAST: &str = "atrous_last";
const SPLIT_SCREEN: &str = "split_screen";
const VALIDATION: &str = "validation";

const MAX_ACCUMULATED_FRAME_NUM: u32 = 63;
const MIN_ATROUS_ITERATION_NUM: u32 = 2;
const MAX_ATROUS_ITERATION_NUM: u32 = 8;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable, Derivative)]
#[derivative(Default)]
pub struct RelaxSettings {
    #[derivative(Default(value = "30"))]
    pub max_accumulated_frame_num: u32,

    #[derivative(Default(value = "6"))]
    pub max_fast_accumulated_frame_num: u32,

    #[derivative(Default(value = "3"))]
    pub history_fix_frame_num: u32,

    #[derivative(Default(value = "2.0"))]
    pub history_clamping_sigma_scale: f32,

    #[derivative(Default(value = "2.0"))]
    pub diffuse_phi_luminance: f32,

    #[derivative(Default(value = "1.0"))]
    pub specular_phi_luminance: f32,

    #[derivative(Default(value = "0.003"))]
    pub depth_threshold: f32,

    #[derivative(Default(value = "0.5"))]
    pub lobe_angle_fraction: f32,

    /// Number of A-trous wavelet iterations, in `2..=8`
    #[derivative(Default(value = "5"))]
    pub atrous_iteration_num: u32,

    /// See: [`Checkerboard`]
    pub checkerboard: u32,

    /// See: [`HitDistanceReconstruction`]
    pub hit_distance_reconstruction: u32,
}

impl RelaxSettings {
    pub fn checkerboard(&self) -> Checkerboard {
        Checkerboard::from_index(self.checkerboard as usize)
    }

    pub fn hit_distance_reconstruction(&self) -> HitDistanceReconstruction {
        HitDistanceReconstruction::from_index(
            self.hit_distance_reconstruction as usize,
        )
    }

    pub fn atrous_iteration_num(&self) -> u32 {
        super::clamp_setting(
            "atrous_iteration_num",
            self.atrous_iteration_num,
            MIN_ATROUS_ITERATION_NUM,
            MAX_ATROUS_ITERATION_NUM,
        )
    }
}

/// Edge-avoiding A-trous denoiser for diffuse and/or specular radiance.
///
/// The wavelet filter runs as a first pass, a middle pass repeated as many
/// times as the settings ask for, and a last pass writing the output; the
/// middle pass bounces between two scratch textures.
#[derive(Debug)]
pub struct Relax {
    signal: Signal,
    prefix: String,
}

struct Channel {
    this: super::Channel,
    reconstructed: ResourceRef,
    ping: ResourceRef,
    pong: ResourceRef,
    history: DoubleBuffered,
    fast_history: DoubleBuffered,
}

impl Relax {
    pub fn new(signal: Signal) -> Self {
        Self {
            signal,
            prefix: format!("relax_{}", signal.name()),
        }
    }

    fn shader(&self, pass: &str, permutation: Permutation) -> Shader {
        Shader::new(super::kernel_name(&self.prefix, pass, permutation))
            .with_constants::<CommonConstants>()
            .with_constants::<RelaxConstants>()
    }

    fn constants(&self, settings: &RelaxSettings) -> RelaxConstants {
        let max_accumulated_frame_num = super::clamp_setting(
            "max_accumulated_frame_num",
            settings.max_accumulated_frame_num,
            0,
            MAX_ACCUMULATED_FRAME_NUM,
        );

        let max_fast_accumulated_frame_num = super::clamp_setting(
            "max_fast_accumulated_frame_num",
            settings.max_fast_accumulated_frame_num,
            0,
            max_accumulated_frame_num,
        );

        RelaxConstants {
            max_accumulated_frame_num: max_accumulated_frame_num as f32,
            max_fast_accumulated_frame_num: max_fast_accumulated_frame_num
                as f32,
            history_fix_frame_num: settings.history_fix_frame_num as f32,
            history_clamping_sigma_scale: settings
                .history_clamping_sigma_scale,
            diffuse_phi_luminance: settings.diffuse_phi_luminance,
            specular_phi_luminance: settings.specular_phi_luminance,
            depth_threshold: settings.depth_threshold,
            lobe_angle_fraction: settings.lobe_angle_fraction,
            hit_distance_reconstruction: settings
                .hit_distance_reconstruction()
                .index() as u32,
            is_diffuse: self.signal.has_diffuse() as u32,
            is_specular: self.signal.has_specular() as u32,
            _pad: 0,
        }
    }

    /// Returns which A-trous iteration given dispatch performs, counting
    /// from the first pass.
    fn atrous_iteration(pass: &str, iteration: u32, iteration_num: u32) -> u32 {
        match pass {
            ATROUS_FIRST => 0,
            ATROUS => 1 + iteration,
            _ => iteration_num - 1,
        }
    }
}

impl Family for Relax {
    fn name(&self) -> &'static str {
        match self.signal {
            Signal::Diffuse => "relax_diffuse",
            Signal::Specular => "relax_specular",
            Signal::DiffuseSpecular => "relax_diffuse_specular",
        }
    }

    fn default_settings(&self) -> Vec<u8> {
        bytemuck::bytes_of(&RelaxSettings::default()).to_vec()
    }

    fn declare(&self, graph: &mut GraphBuilder<'_>) -> Result<()> {
        let radiance = graph.texture(TextureFormat::Rgba16Float, 1, 1);
        let fast = graph.texture(TextureFormat::Rgba16Float, 1, 1);
        let depth = graph.texture(TextureFormat::R32Float, 1, 1);
        let length = graph.texture(TextureFormat::R8Unorm, 1, 1);
        let tile =
            graph.texture(TextureFormat::R8Unorm, TILE_SIZE as u16, 1);

        let tiles = graph.transient(tile);
        let view_z = graph.permanent_pair(depth);
        let history_length = graph.permanent_pair(length);

        let channels: Vec<_> = self
            .signal
            .channels()
            .iter()
            .map(|&this| Channel {
                this,
                reconstructed: graph.transient(radiance),
                ping: graph.transient(radiance),
                pong: graph.transient(radiance),
                history: graph.permanent_pair(radiance),
                fast_history: graph.permanent_pair(fast),
            })
            .collect();

        graph
            .pass(CLASSIFY_TILES)
            .classify_tiles()
            .input(ExternalSlot::InViewZ)
            .output(tiles)
            .dispatch(
                self.shader(CLASSIFY_TILES, Permutation::default())
                    .with_group_size(TILE_SIZE, TILE_SIZE),
            )
            .build()?;

        let mut pass = graph
            .pass(HIT_DISTANCE_RECONSTRUCTION)
            .axes([Axis::HitDistanceReconstruction])
            .input(ExternalSlot::InNormalRoughness)
            .input(ExternalSlot::InViewZ)
            .input(tiles);

        for channel in &channels {
            pass = pass
                .input(channel.this.input())
                .output(channel.reconstructed);
        }

        pass.permutations(|permutation| {
            self.shader(HIT_DISTANCE_RECONSTRUCTION, permutation)
        })
        .build()?;

        let mut pass = graph
            .pass(PREPASS)
            .axes([Axis::Checkerboard])
            .input(ExternalSlot::InNormalRoughness)
            .input(ExternalSlot::InViewZ)
            .input(tiles);

        for channel in &channels {
            pass = pass.input(channel.reconstructed).output(channel.ping);
        }

        pass.permutations(|permutation| self.shader(PREPASS, permutation))
            .build()?;

        let mut pass = graph
            .pass(TEMPORAL_ACCUMULATION)
            .axes([
                Axis::Checkerboard,
                Axis::ConfidenceInputs,
                Axis::HistoryReset,
            ])
            .input(ExternalSlot::InMotionVectors)
            .input(ExternalSlot::InNormalRoughness)
            .input(ExternalSlot::InViewZ)
            .input(view_z.prev())
            .input(history_length.prev())
            .input(tiles)
            .output(view_z.curr())
            .output(history_length.curr());

        for channel in &channels {
            pass = pass
                .input(channel.this.confidence())
                .input(channel.ping)
                .input(channel.history.prev())
                .input(channel.fast_history.prev())
                .output(channel.pong)
                .output(channel.fast_history.curr());
        }

        pass.permutations(|permutation| {
            self.shader(TEMPORAL_ACCUMULATION, permutation)
        })
        .build()?;

        let mut pass = graph
            .pass(HISTORY_FIX)
            .input(ExternalSlot::InNormalRoughness)
            .input(ExternalSlot::InViewZ)
            .input(history_length.curr())
            .input(tiles);

        for channel in &channels {
            pass = pass.input(channel.pong).output(channel.ping);
        }

        pass.dispatch(self.shader(HISTORY_FIX, Permutation::default()))
            .build()?;

        let mut pass = graph
            .pass(HISTORY_CLAMPING)
            .input(history_length.curr())
            .input(tiles);

        for channel in &channels {
            pass = pass
                .input(channel.ping)
                .input(channel.fast_history.curr())
                .output(channel.history.curr());
        }

        pass.dispatch(self.shader(HISTORY_CLAMPING, Permutation::default()))
            .build()?;

        let mut pass = graph
            .pass(ATROUS_FIRST)
            .input(ExternalSlot::InNormalRoughness)
            .input(ExternalSlot::InViewZ)
            .input(history_length.curr())
            .input(tiles);

        for channel in &channels {
            pass = pass.input(channel.history.curr()).output(channel.ping);
        }

        pass.dispatch(
            self.shader(ATROUS_FIRST, Permutation::default())
                .with_constants::<AtrousConstants>(),
        )
        .build()?;

        let mut pass = graph
            .pass(ATROUS)
            .input(ExternalSlot::InNormalRoughness)
            .input(ExternalSlot::InViewZ)
            .input(history_length.curr())
            .input(tiles);

        for channel in &channels {
            pass = pass
                .input_alternating(channel.ping, channel.pong)
                .output_alternating(channel.pong, channel.ping);
        }

        pass.dispatch(
            self.shader(ATROUS, Permutation::default())
                .with_constants::<AtrousConstants>()
                .with_max_repeat(
                    MAX_ATROUS_ITERATION_NUM - MIN_ATROUS_ITERATION_NUM,
                ),
        )
        .build()?;

        let mut pass = graph
            .pass(ATROUS_LAST)
            .input(ExternalSlot::InNormalRoughness)
            .input(ExternalSlot::InViewZ)
            .input(history_length.curr())
            .input(tiles);

        for channel in &channels {
            pass = pass
                .input_alternating(channel.ping, channel.pong)
                .output(channel.this.output());
        }

        pass.dispatch(
            self.shader(ATROUS_LAST, Permutation::default())
                .with_constants::<AtrousConstants>(),
        )
        .build()?;

        let mut pass = graph.pass(SPLIT_SCREEN).split_screen();

        for channel in &channels {
            pass = pass
                .input(channel.this.input())
                .output(channel.this.output());
        }

        pass.dispatch(
            Shader::new(format!("{}_{}", self.prefix, SPLIT_SCREEN))
                .with_constants::<CommonConstants>()
                .with_constants::<SplitScreenConstants>(),
        )
        .build()?;

        graph
            .pass(VALIDATION)
            .validation()
            .input(ExternalSlot::InNormalRoughness)
            .input(ExternalSlot::InViewZ)
            .input(ExternalSlot::InMotionVectors)
            .input(history_length.curr())
            .output(ExternalSlot::OutValidation)
            .dispatch(
                Shader::new(format!("{}_{}", self.prefix, VALIDATION))
                    .with_constants::<CommonConstants>(),
            )
            .build()
    }

    fn permutation(&self, ctx: &FrameContext<'_>) -> Permutation {
        let settings: RelaxSettings = ctx.settings();

        Permutation {
            checkerboard: settings.checkerboard().is_on(),
            hit_distance_reconstruction: settings
                .hit_distance_reconstruction(),
            ..ctx.base_permutation()
        }
    }

    fn repeat(&self, pass: &Pass, ctx: &FrameContext<'_>) -> Repeat {
        let middle = || {
            let settings: RelaxSettings = ctx.settings();

            settings.atrous_iteration_num() - MIN_ATROUS_ITERATION_NUM
        };

        match pass.name() {
            ATROUS => Repeat::times(middle()),

            // Picks whichever scratch texture the middle pass wrote last
            ATROUS_LAST => Repeat::once().with_phase(middle()),

            _ => Repeat::once(),
        }
    }

    fn pack(
        &self,
        pass: &Pass,
        iteration: u32,
        ctx: &FrameContext<'_>,
        out: &mut ConstantWriter,
    ) {
        let settings: RelaxSettings = ctx.settings();

        out.add(ctx.common_constants(settings.checkerboard()));

        match pass.name() {
            SPLIT_SCREEN => {
                out.add(SplitScreenConstants {
                    split_screen: ctx.common.split_screen,
                    ..Default::default()
                });
            }

            VALIDATION => {
                //
            }

            name @ (ATROUS_FIRST | ATROUS | ATROUS_LAST) => {
                let iteration_num = settings.atrous_iteration_num();
                let iteration =
                    Self::atrous_iteration(name, iteration, iteration_num);

                out.add(self.constants(&settings)).add(AtrousConstants {
                    step_size: 1 << iteration,
                    iteration,
                    is_last: (name == ATROUS_LAST) as u32,
                    _pad: 0,
                });
            }

            _ => {
                out.add(self.constants(&settings));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::mem;

    use super::*;

    #[test]
    fn settings() {
        let target = Relax::new(Signal::Specular);

        assert_eq!(44, mem::size_of::<RelaxSettings>());
        assert_eq!(44, target.default_settings().len());
    }

    #[test]
    fn atrous_iteration_num_is_clamped() {
        let settings = |atrous_iteration_num| RelaxSettings {
            atrous_iteration_num,
            ..Default::default()
        };

        assert_eq!(2, settings(0).atrous_iteration_num());
        assert_eq!(5, settings(5).atrous_iteration_num());
        assert_eq!(8, settings(20).atrous_iteration_num());
    }

    #[test]
    fn atrous_iterations() {
        let iterations: Vec<_> = [(ATROUS_FIRST, 0), (ATROUS, 0), (ATROUS, 1)]
            .into_iter()
            .chain([(ATROUS, 2), (ATROUS_LAST, 0)])
            .map(|(pass, iteration)| {
                Relax::atrous_iteration(pass, iteration, 5)
            })
            .collect();

        assert_eq!(vec![0, 1, 2, 3, 4], iterations);
    }
}
