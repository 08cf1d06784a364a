use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec4};

use crate::FrameIndex;

/// Constants shared by every pass of every denoiser; always written first.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CommonConstants {
    pub world_to_clip_prev: Mat4,
    pub view_to_world: Mat4,
    pub world_to_view_prev: Mat4,
    pub frustum: Vec4,
    pub frustum_prev: Vec4,

    /// xyz - camera delta, w - unused
    pub camera_delta: Vec4,

    /// xyz - motion vector scale, w - whether motion vectors are in
    /// world-space (`1.0`) or screen-space (`0.0`)
    pub motion_vector_scale: Vec4,

    pub rect_size: Vec2,
    pub rect_size_inv: Vec2,
    pub rect_size_prev: Vec2,
    pub resolution_scale: Vec2,
    pub jitter: Vec2,
    pub jitter_delta: Vec2,
    pub denoising_range: f32,
    pub disocclusion_threshold: f32,
    pub framerate_scale: f32,
    pub checkerboard_resolve_speed: f32,
    pub frame_index: FrameIndex,

    /// 0 - off, 1 - black cells are valid, 2 - white cells are valid
    pub checkerboard: u32,

    pub is_orthographic: u32,
    pub is_history_reset: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ReferenceConstants {
    pub max_accumulated_frame_num: f32,
    pub _pad: [u32; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ReblurConstants {
    pub max_accumulated_frame_num: f32,
    pub max_fast_accumulated_frame_num: f32,
    pub history_fix_frame_num: f32,
    pub blur_radius: f32,
    pub min_blur_radius: f32,
    pub lobe_angle_fraction: f32,
    pub plane_distance_sensitivity: f32,
    pub stabilization_strength: f32,

    /// 0 - off, 1 - 3x3, 2 - 5x5
    pub hit_distance_reconstruction: u32,

    pub is_diffuse: u32,
    pub is_specular: u32,
    pub _pad: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct RelaxConstants {
    pub max_accumulated_frame_num: f32,
    pub max_fast_accumulated_frame_num: f32,
    pub history_fix_frame_num: f32,
    pub history_clamping_sigma_scale: f32,
    pub diffuse_phi_luminance: f32,
    pub specular_phi_luminance: f32,
    pub depth_threshold: f32,
    pub lobe_angle_fraction: f32,

    /// 0 - off, 1 - 3x3, 2 - 5x5
    pub hit_distance_reconstruction: u32,

    pub is_diffuse: u32,
    pub is_specular: u32,
    pub _pad: u32,
}

/// Per-iteration constants of the A-trous wavelet filter.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct AtrousConstants {
    pub step_size: u32,
    pub iteration: u32,
    pub is_last: u32,
    pub _pad: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SigmaConstants {
    /// xyz - direction towards the light, w - unused
    pub light_direction: Vec4,
    pub plane_distance_sensitivity: f32,
    pub max_stabilized_frame_num: f32,
    pub blur_radius_scale: f32,
    pub _pad: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SplitScreenConstants {
    /// Fraction of the screen (from the left) that shows the noisy input.
    pub split_screen: f32,
    pub _pad: [u32; 3],
}

#[cfg(test)]
mod tests {
    use std::mem;

    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(336, mem::size_of::<CommonConstants>());
        assert_eq!(16, mem::size_of::<ReferenceConstants>());
        assert_eq!(48, mem::size_of::<ReblurConstants>());
        assert_eq!(48, mem::size_of::<RelaxConstants>());
        assert_eq!(16, mem::size_of::<AtrousConstants>());
        assert_eq!(32, mem::size_of::<SigmaConstants>());
        assert_eq!(16, mem::size_of::<SplitScreenConstants>());
    }

    #[test]
    fn field_offsets() {
        let constants = CommonConstants {
            frame_index: FrameIndex::new(0xcafebabe),
            ..Default::default()
        };

        let bytes = bytemuck::bytes_of(&constants);

        assert_eq!(
            0xcafebabe,
            u32::from_ne_bytes(bytes[320..324].try_into().unwrap())
        );
    }
}
