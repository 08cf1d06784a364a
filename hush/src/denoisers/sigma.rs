use bytemuck::{Pod, Zeroable};
use derivative::Derivative;
use glam::Vec3;
use hush_gpu::{
    CommonConstants, SigmaConstants, SplitScreenConstants, TILE_SIZE,
};
use wgpu::TextureFormat;

use crate::{
    Axis, Checkerboard, ConstantWriter, ExternalSlot, Family, FrameContext,
    GraphBuilder, Pass, Permutation, Result, Shader,
};

const CLASSIFY_TILES: &str = "classify_tiles";
const SMOOTH_TILES: &str = "smooth_tiles";
const BLUR: &str = "blur";
const POST_BLUR: &str = "post_blur";
const TEMPORAL_STABILIZATION: &str = "temporal_stabilization";
const SPLIT_SCREEN: &str = "split_screen";

const MAX_STABILIZED_FRAME_NUM: u32 = 7;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable, Derivative)]
#[derivative(Default)]
pub struct SigmaSettings {
    /// Direction towards the light, in world-space; used to estimate
    /// penumbra size
    #[derivative(Default(value = "Vec3::Z"))]
    pub light_direction: Vec3,

    #[derivative(Default(value = "0.005"))]
    pub plane_distance_sensitivity: f32,

    /// Length of the temporal stabilization; `0` disables it
    #[derivative(Default(value = "5"))]
    pub max_stabilized_frame_num: u32,

    #[derivative(Default(value = "2.0"))]
    pub blur_radius_scale: f32,
}

/// Shadow denoiser: spatial blur guided by penumbra size, followed by
/// temporal stabilization.
#[derive(Debug)]
pub struct SigmaShadow;

impl SigmaShadow {
    fn shader(pass: &str, permutation: Permutation) -> Shader {
        Shader::new(super::kernel_name("sigma_shadow", pass, permutation))
            .with_constants::<CommonConstants>()
            .with_constants::<SigmaConstants>()
    }
}

impl Family for SigmaShadow {
    fn name(&self) -> &'static str {
        "sigma_shadow"
    }

    fn default_settings(&self) -> Vec<u8> {
        bytemuck::bytes_of(&SigmaSettings::default()).to_vec()
    }

    fn declare(&self, graph: &mut GraphBuilder<'_>) -> Result<()> {
        let tile_desc =
            graph.texture(TextureFormat::Rg8Unorm, TILE_SIZE as u16, 1);
        let data_desc = graph.texture(TextureFormat::Rg16Float, 1, 1);
        let history_desc = graph.texture(TextureFormat::R8Unorm, 1, 1);

        let tiles = graph.transient(tile_desc);
        let smooth_tiles = graph.transient(tile_desc);
        let blurred = graph.transient(data_desc);
        let post_blurred = graph.transient(data_desc);
        let history = graph.permanent_pair(history_desc);

        graph
            .pass(CLASSIFY_TILES)
            .classify_tiles()
            .input(ExternalSlot::InPenumbra)
            .input(ExternalSlot::InViewZ)
            .output(tiles)
            .dispatch(
                Self::shader(CLASSIFY_TILES, Permutation::default())
                    .with_group_size(TILE_SIZE, TILE_SIZE),
            )
            .build()?;

        graph
            .pass(SMOOTH_TILES)
            .input(tiles)
            .output(smooth_tiles)
            .dispatch(
                Self::shader(SMOOTH_TILES, Permutation::default())
                    .with_downsample(TILE_SIZE),
            )
            .build()?;

        graph
            .pass(BLUR)
            .input(ExternalSlot::InNormalRoughness)
            .input(ExternalSlot::InPenumbra)
            .input(ExternalSlot::InViewZ)
            .input(smooth_tiles)
            .output(blurred)
            .dispatch(Self::shader(BLUR, Permutation::default()))
            .build()?;

        graph
            .pass(POST_BLUR)
            .input(ExternalSlot::InNormalRoughness)
            .input(blurred)
            .input(ExternalSlot::InViewZ)
            .input(smooth_tiles)
            .output(post_blurred)
            .dispatch(Self::shader(POST_BLUR, Permutation::default()))
            .build()?;

        graph
            .pass(TEMPORAL_STABILIZATION)
            .axes([Axis::HistoryReset])
            .input(ExternalSlot::InMotionVectors)
            .input(ExternalSlot::InViewZ)
            .input(post_blurred)
            .input(history.prev())
            .input(smooth_tiles)
            .output(history.curr())
            .output(ExternalSlot::OutShadow)
            .permutations(|permutation| {
                Self::shader(TEMPORAL_STABILIZATION, permutation)
            })
            .build()?;

        graph
            .pass(SPLIT_SCREEN)
            .split_screen()
            .input(ExternalSlot::InPenumbra)
            .output(ExternalSlot::OutShadow)
            .dispatch(
                Shader::new("sigma_shadow_split_screen")
                    .with_constants::<CommonConstants>()
                    .with_constants::<SplitScreenConstants>(),
            )
            .build()
    }

    fn permutation(&self, ctx: &FrameContext<'_>) -> Permutation {
        ctx.base_permutation()
    }

    fn pack(
        &self,
        pass: &Pass,
        _: u32,
        ctx: &FrameContext<'_>,
        out: &mut ConstantWriter,
    ) {
        out.add(ctx.common_constants(Checkerboard::Off));

        if pass.name() == SPLIT_SCREEN {
            out.add(SplitScreenConstants {
                split_screen: ctx.common.split_screen,
                ..Default::default()
            });

            return;
        }

        let settings: SigmaSettings = ctx.settings();

        let max_stabilized_frame_num = super::clamp_setting(
            "max_stabilized_frame_num",
            settings.max_stabilized_frame_num,
            0,
            MAX_STABILIZED_FRAME_NUM,
        );

        let light_direction = settings.light_direction.normalize_or_zero();

        out.add(SigmaConstants {
            light_direction: light_direction.extend(0.0),
            plane_distance_sensitivity: settings.plane_distance_sensitivity,
            max_stabilized_frame_num: max_stabilized_frame_num as f32,
            blur_radius_scale: settings.blur_radius_scale,
            ..Default::default()
        });
    }
}

#[cfg(test)]
mod tests {
    use std::mem;

    use super::*;

    #[test]
    fn settings() {
        assert_eq!(24, mem::size_of::<SigmaSettings>());
        assert_eq!(24, SigmaShadow.default_settings().len());
    }
}
