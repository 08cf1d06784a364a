use bytemuck::{Pod, Zeroable};
use derivative::Derivative;
use hush_gpu::{
    CommonConstants, ReblurConstants, SplitScreenConstants, TILE_SIZE,
};
use wgpu::TextureFormat;

use super::Signal;
use crate::{
    Axis, Checkerboard, ConstantWriter, DoubleBuffered, ExternalSlot, Family,
    FrameContext, GraphBuilder, HitDistanceReconstruction, Pass, Permutation,
    ResourceRef, Result, Shader,
};

const CLASSIFY_TILES: &str = "classify_tiles";
const HIT_DISTANCE_RECONSTRUCTION: &str = "hit_distance_reconstruction";
const PREPASS: &str = "prepass";
const TEMPORAL_ACCUMULATION: &str = "temporal_accumulation";
const HISTORY_FIX: &str = "history_fix";
const BLUR: &str = "blur";
const POST_BLUR: &str = "post_blur";
const TEMPORAL_STABILIZATION: &str = "temporal_stabilization";
const SPLIT_SCREEN: &str = "split_screen";
const VALIDATION: &str = "validation";

const MAX_ACCUMULATED_FRAME_NUM: u32 = 63;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable, Derivative)]
#[derivative(Default)]
pub struct ReblurSettings {
    #[derivative(Default(value = "30"))]
    pub max_accumulated_frame_num: u32,

    #[derivative(Default(value = "6"))]
    pub max_fast_accumulated_frame_num: u32,

    #[derivative(Default(value = "3"))]
    pub history_fix_frame_num: u32,

    /// In pixels
    #[derivative(Default(value = "15.0"))]
    pub blur_radius: f32,

    /// In pixels
    #[derivative(Default(value = "1.0"))]
    pub min_blur_radius: f32,

    #[derivative(Default(value = "0.15"))]
    pub lobe_angle_fraction: f32,

    #[derivative(Default(value = "0.005"))]
    pub plane_distance_sensitivity: f32,

    #[derivative(Default(value = "1.0"))]
    pub stabilization_strength: f32,

    /// See: [`Checkerboard`]
    pub checkerboard: u32,

    /// See: [`HitDistanceReconstruction`]
    pub hit_distance_reconstruction: u32,

    pub enable_performance_mode: u32,
}

impl ReblurSettings {
    pub fn checkerboard(&self) -> Checkerboard {
        Checkerboard::from_index(self.checkerboard as usize)
    }

    pub fn hit_distance_reconstruction(&self) -> HitDistanceReconstruction {
        HitDistanceReconstruction::from_index(
            self.hit_distance_reconstruction as usize,
        )
    }
}

/// Recurrent blur denoiser for diffuse and/or specular radiance.
#[derive(Debug)]
pub struct Reblur {
    signal: Signal,
    prefix: String,
}

/// Per-channel textures.
struct Channel {
    this: super::Channel,
    reconstructed: ResourceRef,
    temp1: ResourceRef,
    temp2: ResourceRef,
    history: DoubleBuffered,
    fast_history: DoubleBuffered,
    stabilized: DoubleBuffered,
}

impl Reblur {
    pub fn new(signal: Signal) -> Self {
        Self {
            signal,
            prefix: format!("reblur_{}", signal.name()),
        }
    }

    fn shader(&self, pass: &str, permutation: Permutation) -> Shader {
        Shader::new(super::kernel_name(&self.prefix, pass, permutation))
            .with_constants::<CommonConstants>()
            .with_constants::<ReblurConstants>()
    }

    fn constants(&self, settings: &ReblurSettings) -> ReblurConstants {
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

        ReblurConstants {
            max_accumulated_frame_num: max_accumulated_frame_num as f32,
            max_fast_accumulated_frame_num: max_fast_accumulated_frame_num
                as f32,
            history_fix_frame_num: settings.history_fix_frame_num as f32,
            blur_radius: settings.blur_radius,
            min_blur_radius: settings.min_blur_radius,
            lobe_angle_fraction: settings.lobe_angle_fraction,
            plane_distance_sensitivity: settings.plane_distance_sensitivity,
            stabilization_strength: settings.stabilization_strength,
            hit_distance_reconstruction: settings
                .hit_distance_reconstruction()
                .index() as u32,
            is_diffuse: self.signal.has_diffuse() as u32,
            is_specular: self.signal.has_specular() as u32,
            _pad: 0,
        }
    }
}

impl Family for Reblur {
    fn name(&self) -> &'static str {
        match self.signal {
            Signal::Diffuse => "reblur_diffuse",
            Signal::Specular => "reblur_specular",
            Signal::DiffuseSpecular => "reblur_diffuse_specular",
        }
    }

    fn default_settings(&self) -> Vec<u8> {
        bytemuck::bytes_of(&ReblurSettings::default()).to_vec()
    }

    fn declare(&self, graph: &mut GraphBuilder<'_>) -> Result<()> {
        let radiance = graph.texture(TextureFormat::Rgba16Float, 1, 1);
        let fast = graph.texture(TextureFormat::R16Float, 1, 1);
        let depth = graph.texture(TextureFormat::R32Float, 1, 1);
        let counters = graph.texture(TextureFormat::R32Uint, 1, 1);
        let tile =
            graph.texture(TextureFormat::R8Unorm, TILE_SIZE as u16, 1);

        let tiles = graph.transient(tile);
        let view_z = graph.permanent_pair(depth);
        let data = graph.permanent_pair(counters);

        let channels: Vec<_> = self
            .signal
            .channels()
            .iter()
            .map(|&this| Channel {
                this,
                reconstructed: graph.transient(radiance),
                temp1: graph.transient(radiance),
                temp2: graph.transient(radiance),
                history: graph.permanent_pair(radiance),
                fast_history: graph.permanent_pair(fast),
                stabilized: graph.permanent_pair(radiance),
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

        // Off is a plain copy, so that later passes always read the same
        // texture
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
            .axes([Axis::PerformanceMode, Axis::Checkerboard])
            .input(ExternalSlot::InNormalRoughness)
            .input(ExternalSlot::InViewZ)
            .input(tiles);

        for channel in &channels {
            pass = pass.input(channel.reconstructed).output(channel.temp1);
        }

        pass.permutations(|permutation| self.shader(PREPASS, permutation))
            .build()?;

        let mut pass = graph
            .pass(TEMPORAL_ACCUMULATION)
            .axes([
                Axis::PerformanceMode,
                Axis::Checkerboard,
                Axis::ConfidenceInputs,
                Axis::HistoryReset,
            ])
            .input(ExternalSlot::InMotionVectors)
            .input(ExternalSlot::InNormalRoughness)
            .input(ExternalSlot::InViewZ)
            .input(view_z.prev())
            .input(data.prev())
            .input(tiles)
            .output(view_z.curr())
            .output(data.curr());

        for channel in &channels {
            pass = pass
                .input(channel.this.confidence())
                .input(channel.temp1)
                .input(channel.history.prev())
                .input(channel.fast_history.prev())
                .output(channel.temp2)
                .output(channel.fast_history.curr());
        }

        pass.permutations(|permutation| {
            self.shader(TEMPORAL_ACCUMULATION, permutation)
        })
        .build()?;

        for (name, from, to) in [
            (HISTORY_FIX, Temp::Second, Temp::First),
            (BLUR, Temp::First, Temp::Second),
        ] {
            let mut pass = graph
                .pass(name)
                .axes([Axis::PerformanceMode])
                .input(ExternalSlot::InNormalRoughness)
                .input(ExternalSlot::InViewZ)
                .input(data.curr())
                .input(tiles);

            for channel in &channels {
                pass = pass.input(from.of(channel)).output(to.of(channel));

                if name == HISTORY_FIX {
                    pass = pass.input(channel.fast_history.curr());
                }
            }

            pass.permutations(|permutation| self.shader(name, permutation))
                .build()?;
        }

        let mut pass = graph
            .pass(POST_BLUR)
            .axes([Axis::PerformanceMode])
            .input(ExternalSlot::InNormalRoughness)
            .input(ExternalSlot::InViewZ)
            .input(data.curr())
            .input(tiles);

        for channel in &channels {
            pass = pass.input(channel.temp2).output(channel.history.curr());
        }

        pass.permutations(|permutation| self.shader(POST_BLUR, permutation))
            .build()?;

        let mut pass = graph
            .pass(TEMPORAL_STABILIZATION)
            .axes([Axis::PerformanceMode, Axis::HistoryReset])
            .input(ExternalSlot::InMotionVectors)
            .input(ExternalSlot::InViewZ)
            .input(data.curr())
            .input(tiles);

        for channel in &channels {
            pass = pass
                .input(channel.history.curr())
                .input(channel.stabilized.prev())
                .output(channel.stabilized.curr())
                .output(channel.this.output());
        }

        pass.permutations(|permutation| {
            self.shader(TEMPORAL_STABILIZATION, permutation)
        })
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
            .input(data.curr())
            .output(ExternalSlot::OutValidation)
            .dispatch(
                Shader::new(format!("{}_{}", self.prefix, VALIDATION))
                    .with_constants::<CommonConstants>(),
            )
            .build()
    }

    fn permutation(&self, ctx: &FrameContext<'_>) -> Permutation {
        let settings: ReblurSettings = ctx.settings();

        Permutation {
            performance_mode: settings.enable_performance_mode != 0,
            checkerboard: settings.checkerboard().is_on(),
            hit_distance_reconstruction: settings
                .hit_distance_reconstruction(),
            ..ctx.base_permutation()
        }
    }

    fn pack(
        &self,
        pass: &Pass,
        _: u32,
        ctx: &FrameContext<'_>,
        out: &mut ConstantWriter,
    ) {
        let settings: ReblurSettings = ctx.settings();

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

            _ => {
                out.add(self.constants(&settings));
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Temp {
    First,
    Second,
}

impl Temp {
    fn of(self, channel: &Channel) -> ResourceRef {
        match self {
            Self::First => channel.temp1,
            Self::Second => channel.temp2,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::mem;

    use super::*;

    #[test]
    fn settings() {
        let target = Reblur::new(Signal::Diffuse);

        assert_eq!(44, mem::size_of::<ReblurSettings>());
        assert_eq!(44, target.default_settings().len());
    }

    #[test]
    fn constants() {
        let target = Reblur::new(Signal::DiffuseSpecular);

        let settings = ReblurSettings {
            max_accumulated_frame_num: 100,
            max_fast_accumulated_frame_num: 80,
            hit_distance_reconstruction: 2,
            ..Default::default()
        };

        let constants = target.constants(&settings);

        assert_eq!(63.0, constants.max_accumulated_frame_num);
        assert_eq!(63.0, constants.max_fast_accumulated_frame_num);
        assert_eq!(2, constants.hit_distance_reconstruction);
        assert_eq!(1, constants.is_diffuse);
        assert_eq!(1, constants.is_specular);
    }
}
