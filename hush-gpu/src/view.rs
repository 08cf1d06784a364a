use glam::{vec2, vec4, Mat4, UVec2, Vec2, Vec3, Vec4, Vec4Swizzles};

/// Frame time the frame-rate scale is normalized to, in milliseconds.
pub const REFERENCE_FRAME_TIME_MS: f32 = 1000.0 / 60.0;

/// Returns whether given view-to-clip matrix is an orthographic projection.
pub fn is_orthographic(view_to_clip: Mat4) -> bool {
    (view_to_clip.w_axis.w - 1.0).abs() < 1e-6
}

/// Decomposes a view-to-clip matrix into the view-space rectangle visible at
/// unit distance from the camera, encoded as `(left, top, width, height)`.
///
/// Kernels use it to turn a screen position and a view-space depth back into
/// a view-space position without inverting the projection per pixel.
pub fn frustum(view_to_clip: Mat4) -> Vec4 {
    let scale = vec2(view_to_clip.x_axis.x, view_to_clip.y_axis.y);

    let offset = if is_orthographic(view_to_clip) {
        -vec2(view_to_clip.w_axis.x, view_to_clip.w_axis.y)
    } else {
        vec2(view_to_clip.z_axis.x, view_to_clip.z_axis.y)
    };

    let left = (offset.x - 1.0) / scale.x;
    let top = (offset.y + 1.0) / scale.y;

    vec4(left, top, 2.0 / scale.x, -2.0 / scale.y)
}

/// Returns the camera's position in world-space.
pub fn camera_position(world_to_view: Mat4) -> Vec3 {
    world_to_view.inverse().w_axis.xyz()
}

/// Returns by how much the camera has moved since the previous frame,
/// pointing from the current position towards the previous one.
pub fn camera_delta(world_to_view: Mat4, world_to_view_prev: Mat4) -> Vec3 {
    camera_position(world_to_view_prev) - camera_position(world_to_view)
}

/// Returns the matrix that projects world-space positions of the current
/// frame into the clip-space of the previous frame.
pub fn world_to_clip_prev(
    view_to_clip_prev: Mat4,
    world_to_view_prev: Mat4,
) -> Mat4 {
    view_to_clip_prev * world_to_view_prev
}

pub fn jitter_delta(jitter: Vec2, jitter_prev: Vec2) -> Vec2 {
    jitter - jitter_prev
}

/// Converts time between frames into a multiplier for accumulation speeds,
/// so that history length is roughly constant in seconds, not frames.
///
/// Unknown (non-positive) frame times map to `1.0`.
pub fn framerate_scale(time_delta_ms: f32) -> f32 {
    if time_delta_ms <= 0.0 {
        return 1.0;
    }

    (REFERENCE_FRAME_TIME_MS / time_delta_ms).clamp(0.25, 4.0)
}

/// Returns the part of the render target that actually contains pixels when
/// rendering with dynamic resolution.
pub fn rect_size(render_size: UVec2, resolution_scale: Vec2) -> UVec2 {
    (render_size.as_vec2() * resolution_scale)
        .round()
        .as_uvec2()
        .clamp(UVec2::ONE, render_size.max(UVec2::ONE))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{uvec2, vec3};

    use super::*;

    #[test]
    fn frustum_of_symmetric_perspective() {
        let proj = Mat4::perspective_rh(90f32.to_radians(), 1.0, 0.1, 100.0);
        let frustum = frustum(proj);

        assert!(!is_orthographic(proj));
        assert_relative_eq!(frustum.x, -1.0, epsilon = 1e-5);
        assert_relative_eq!(frustum.y, 1.0, epsilon = 1e-5);
        assert_relative_eq!(frustum.z, 2.0, epsilon = 1e-5);
        assert_relative_eq!(frustum.w, -2.0, epsilon = 1e-5);
    }

    #[test]
    fn frustum_of_wide_perspective() {
        let proj = Mat4::perspective_rh(90f32.to_radians(), 2.0, 0.1, 100.0);
        let frustum = frustum(proj);

        assert_relative_eq!(frustum.x, -2.0, epsilon = 1e-5);
        assert_relative_eq!(frustum.z, 4.0, epsilon = 1e-5);
        assert_relative_eq!(frustum.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn frustum_of_orthographic() {
        let proj = Mat4::orthographic_rh(-4.0, 4.0, -2.0, 2.0, 0.1, 100.0);
        let frustum = frustum(proj);

        assert!(is_orthographic(proj));
        assert_relative_eq!(frustum.x, -4.0, epsilon = 1e-5);
        assert_relative_eq!(frustum.y, 2.0, epsilon = 1e-5);
        assert_relative_eq!(frustum.z, 8.0, epsilon = 1e-5);
        assert_relative_eq!(frustum.w, -4.0, epsilon = 1e-5);
    }

    #[test]
    fn camera_moving() {
        let curr = Mat4::look_at_rh(
            vec3(1.0, 2.0, 3.0),
            vec3(1.0, 2.0, 0.0),
            Vec3::Y,
        );

        let prev = Mat4::look_at_rh(
            vec3(0.0, 2.0, 3.0),
            vec3(0.0, 2.0, 0.0),
            Vec3::Y,
        );

        let pos = camera_position(curr);

        assert_relative_eq!(pos.x, 1.0, epsilon = 1e-4);
        assert_relative_eq!(pos.y, 2.0, epsilon = 1e-4);
        assert_relative_eq!(pos.z, 3.0, epsilon = 1e-4);

        let delta = camera_delta(curr, prev);

        assert_relative_eq!(delta.x, -1.0, epsilon = 1e-4);
        assert_relative_eq!(delta.y, 0.0, epsilon = 1e-4);
        assert_relative_eq!(delta.z, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn framerate() {
        assert_relative_eq!(framerate_scale(REFERENCE_FRAME_TIME_MS), 1.0);
        assert_relative_eq!(framerate_scale(0.0), 1.0);
        assert_relative_eq!(framerate_scale(1000.0), 0.25);
        assert_relative_eq!(framerate_scale(1.0), 4.0);
    }

    #[test]
    fn dynamic_resolution() {
        assert_eq!(uvec2(64, 32), rect_size(uvec2(64, 32), Vec2::ONE));
        assert_eq!(uvec2(32, 16), rect_size(uvec2(64, 32), vec2(0.5, 0.5)));
        assert_eq!(uvec2(1, 1), rect_size(uvec2(64, 32), Vec2::ZERO));
        assert_eq!(uvec2(64, 32), rect_size(uvec2(64, 32), vec2(2.0, 2.0)));
    }
}
