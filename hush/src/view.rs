use glam::{Mat4, UVec2, Vec2};
use hush_gpu as gpu;
use hush_gpu::{CommonConstants, FrameIndex};

use crate::CommonSettings;

/// Frames after a reset past which checkerboard resolve speed stops
/// decreasing.
const CHECKERBOARD_RESOLVE_FRAME_NUM: u32 = 16;

/// Camera state a denoiser remembers from the previous frame.
#[derive(Clone, Copy, Debug, PartialEq)]
struct PrevView {
    view_to_clip: Mat4,
    world_to_view: Mat4,
    jitter: Vec2,
    resolution_scale: Vec2,
    rect_size: UVec2,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Snapshot {
    view: PrevView,
    frames_since_reset: u32,
}

/// Per-denoiser state carried from one frame into the next.
///
/// Read while a frame's dispatches are being assembled and advanced only
/// once every denoiser is done, so that all denoisers see the same previous
/// frame. Assembling the same frame index again reuses the history that
/// frame has seen the first time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewState {
    /// Frame that has produced `last`
    frame: Option<FrameIndex>,
    last: Option<Snapshot>,
    before_last: Option<Snapshot>,
}

impl ViewState {
    pub fn frames_since_reset(&self) -> u32 {
        self.last.map_or(0, |last| last.frames_since_reset)
    }

    /// Returns how quickly the checkerboard reconstruction converges; starts
    /// at `1.0` right after a reset and slows down over the following
    /// frames.
    pub fn checkerboard_resolve_speed(&self) -> f32 {
        resolve_speed(self.frames_since_reset())
    }

    fn history(&self, frame: FrameIndex) -> Option<Snapshot> {
        if self.frame == Some(frame) {
            self.before_last
        } else {
            self.last
        }
    }

    /// Derives constants shared by every pass of the current frame.
    ///
    /// Checkerboard mode is left off, since it's up to the denoiser.
    pub fn constants(
        &self,
        common: &CommonSettings,
        render_size: UVec2,
    ) -> CommonConstants {
        let reset = common.accumulation_mode.is_reset();
        let rect_size = gpu::rect_size(render_size, common.resolution_scale);

        let history = self
            .history(common.frame_index)
            .filter(|_| !reset);

        let prev = match history {
            Some(history) => history.view,

            // Without history, the previous frame is the current one
            _ => PrevView {
                view_to_clip: common.view_to_clip,
                world_to_view: common.world_to_view,
                jitter: common.camera_jitter,
                resolution_scale: common.resolution_scale,
                rect_size,
            },
        };

        CommonConstants {
            world_to_clip_prev: gpu::world_to_clip_prev(
                prev.view_to_clip,
                prev.world_to_view,
            ),
            view_to_world: common.world_to_view.inverse(),
            world_to_view_prev: prev.world_to_view,
            frustum: gpu::frustum(common.view_to_clip),
            frustum_prev: gpu::frustum(prev.view_to_clip),
            camera_delta: gpu::camera_delta(
                common.world_to_view,
                prev.world_to_view,
            )
            .extend(0.0),
            motion_vector_scale: common.motion_vector_scale.extend(
                if common.is_motion_vector_in_world_space {
                    1.0
                } else {
                    0.0
                },
            ),
            rect_size: rect_size.as_vec2(),
            rect_size_inv: 1.0 / rect_size.as_vec2(),
            rect_size_prev: prev.rect_size.as_vec2(),
            resolution_scale: common.resolution_scale,
            jitter: common.camera_jitter,
            jitter_delta: gpu::jitter_delta(common.camera_jitter, prev.jitter),
            denoising_range: common.denoising_range,
            disocclusion_threshold: common.disocclusion_threshold,
            framerate_scale: gpu::framerate_scale(
                common.time_delta_between_frames,
            ),
            checkerboard_resolve_speed: resolve_speed(
                history.map_or(0, |history| history.frames_since_reset),
            ),
            frame_index: common.frame_index,
            checkerboard: 0,
            is_orthographic: gpu::is_orthographic(common.view_to_clip) as u32,
            is_history_reset: reset as u32,
        }
    }

    /// Remembers the current frame as the previous one.
    pub fn advance(&mut self, common: &CommonSettings, render_size: UVec2) {
        let frame = common.frame_index;

        let frames_since_reset = self
            .history(frame)
            .filter(|_| !common.accumulation_mode.is_reset())
            .map_or(1, |history| history.frames_since_reset.saturating_add(1));

        if self.frame != Some(frame) {
            self.before_last = self.last;
            self.frame = Some(frame);
        }

        self.last = Some(Snapshot {
            view: PrevView {
                view_to_clip: common.view_to_clip,
                world_to_view: common.world_to_view,
                jitter: common.camera_jitter,
                resolution_scale: common.resolution_scale,
                rect_size: gpu::rect_size(render_size, common.resolution_scale),
            },
            frames_since_reset,
        });
    }
}

fn resolve_speed(frames_since_reset: u32) -> f32 {
    let frames = frames_since_reset.min(CHECKERBOARD_RESOLVE_FRAME_NUM);

    1.0 / (frames as f32 + 1.0)
}
