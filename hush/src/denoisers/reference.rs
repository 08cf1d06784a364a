use bytemuck::{Pod, Zeroable};
use derivative::Derivative;
use hush_gpu::{CommonConstants, ReferenceConstants, SplitScreenConstants};

use crate::{
    Axis, Checkerboard, ConstantWriter, DoubleBuffered, ExternalSlot, Family,
    FrameContext, GraphBuilder, Pass, Permutation, Result, Shader,
};

const ACCUMULATE: &str = "accumulate";
const RESOLVE: &str = "resolve";
const SPLIT_SCREEN: &str = "split_screen";

const MAX_ACCUMULATED_FRAME_NUM: u32 = 65536;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable, Derivative)]
#[derivative(Default)]
pub struct ReferenceSettings {
    /// Frames after which the accumulation stops
    #[derivative(Default(value = "1024"))]
    pub max_accumulated_frame_num: u32,
}

/// Averages frames until the camera moves.
#[derive(Debug)]
pub struct Reference;

impl Reference {
    fn history(graph: &mut GraphBuilder<'_>) -> DoubleBuffered {
        let desc = graph.texture(wgpu::TextureFormat::Rgba32Float, 1, 1);

        graph.permanent_pair(desc)
    }
}

impl Family for Reference {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn default_settings(&self) -> Vec<u8> {
        bytemuck::bytes_of(&ReferenceSettings::default()).to_vec()
    }

    fn declare(&self, graph: &mut GraphBuilder<'_>) -> Result<()> {
        let history = Self::history(graph);

        graph
            .pass(ACCUMULATE)
            .axes([Axis::HistoryReset])
            .input(ExternalSlot::InRadiance)
            .input(history.prev())
            .output(history.curr())
            .permutations(|permutation| {
                Shader::new(super::kernel_name(
                    "reference",
                    ACCUMULATE,
                    permutation,
                ))
                .with_constants::<CommonConstants>()
                .with_constants::<ReferenceConstants>()
            })
            .build()?;

        graph
            .pass(RESOLVE)
            .input(history.curr())
            .output(ExternalSlot::OutRadiance)
            .dispatch(
                Shader::new("reference_resolve")
                    .with_constants::<CommonConstants>(),
            )
            .build()?;

        graph
            .pass(SPLIT_SCREEN)
            .split_screen()
            .input(ExternalSlot::InRadiance)
            .output(ExternalSlot::OutRadiance)
            .dispatch(
                Shader::new("reference_split_screen")
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

        match pass.name() {
            ACCUMULATE => {
                let settings: ReferenceSettings = ctx.settings();

                let max_accumulated_frame_num = super::clamp_setting(
                    "max_accumulated_frame_num",
                    settings.max_accumulated_frame_num,
                    0,
                    MAX_ACCUMULATED_FRAME_NUM,
                );

                out.add(ReferenceConstants {
                    max_accumulated_frame_num: max_accumulated_frame_num
                        as f32,
                    ..Default::default()
                });
            }

            SPLIT_SCREEN => {
                out.add(SplitScreenConstants {
                    split_screen: ctx.common.split_screen,
                    ..Default::default()
                });
            }

            _ => {
                //
            }
        }
    }
}
