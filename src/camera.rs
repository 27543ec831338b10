use glam::{Mat4, Vec2, Vec3};
use log::debug;

pub const DEFAULT_EYE: Vec3 = Vec3::new(0.0, 3.0, 10.0);
pub const DEFAULT_AT: Vec3 = Vec3::ZERO;
pub const DEFAULT_UP: Vec3 = Vec3::Y;
pub const DEFAULT_FOVY: f32 = 45.0;
pub const DEFAULT_NEAR: f32 = 0.1;
pub const DEFAULT_FAR: f32 = 20.0;

pub const CLIP_MARGIN: f32 = 0.5;
pub const MIN_NEAR: f32 = 0.01;
/// Distance covered by one first-person movement key press.
pub const STRAFE_STEP: f32 = 0.1;

const ORBIT_DEGREES_PER_PIXEL: f32 = 0.5;
const WHEEL_UNITS: f32 = 1000.0;
const ZOOM_FOVY_RANGE: (f32, f32) = (1.0, 100.0);
const FOVY_RANGE: (f32, f32) = (1.0, 179.0);
const MIN_EYE_DISTANCE: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipPlane {
    Near,
    Far,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrafeDirection {
    Forward,
    Back,
    Left,
    Right,
}

/// Camera frame and perspective projection parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub at: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fovy: f32,
    /// Width over height of the viewport; follows the window, not the user.
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: DEFAULT_EYE,
            at: DEFAULT_AT,
            up: DEFAULT_UP,
            fovy: DEFAULT_FOVY,
            aspect: 1.0,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores the default frame and projection. The aspect ratio is kept
    /// because it belongs to the viewport.
    pub fn reset(&mut self) {
        self.eye = DEFAULT_EYE;
        self.at = DEFAULT_AT;
        self.up = DEFAULT_UP;
        self.fovy = DEFAULT_FOVY;
        self.near = DEFAULT_NEAR;
        self.far = DEFAULT_FAR;
    }

    /// World-to-view transform. A degenerate frame looks down `-Z`, or uses
    /// any up vector orthogonal to the view direction, instead of producing
    /// NaNs.
    pub fn view_matrix(&self) -> Mat4 {
        let forward = (self.at - self.eye)
            .try_normalize()
            .unwrap_or(Vec3::NEG_Z);
        let up = if forward.cross(self.up).length_squared() > f32::EPSILON {
            self.up
        } else {
            forward.any_orthonormal_vector()
        };
        Mat4::look_at_rh(self.eye, self.eye + forward, up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fovy.to_radians(),
            self.aspect.max(0.01),
            self.near,
            self.far,
        )
    }

    pub fn has_valid_frame(&self) -> bool {
        let offset = self.at - self.eye;
        offset.length() > MIN_EYE_DISTANCE
            && offset.normalize().cross(self.up).length_squared() > f32::EPSILON
    }

    /// Updates the aspect ratio from a viewport size. Zero-height viewports
    /// are ignored.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    pub fn set_fovy(&mut self, degrees: f32) {
        self.fovy = degrees.clamp(FOVY_RANGE.0, FOVY_RANGE.1);
    }

    /// Rotates the eye about `at` following a pointer drag of `(dx, dy)`
    /// pixels, about an axis expressed in view space. Degenerate frames are
    /// left alone.
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        let drag = Vec2::new(dx, dy);
        let angle = ORBIT_DEGREES_PER_PIXEL * drag.length();
        if angle == 0.0 {
            return;
        }
        if !self.has_valid_frame() {
            debug!("orbit ignored: degenerate camera frame");
            return;
        }
        let axis = Vec3::new(-dy, -dx, 0.0).normalize();
        let view = self.view_matrix();
        let rotation = Mat4::from_axis_angle(axis, angle.to_radians());
        let in_world = view.inverse() * rotation * view;

        let offset = in_world.transform_vector3(self.eye - self.at);
        let up = in_world.transform_vector3(self.up);
        self.eye = self.at + offset;
        self.up = up;
    }

    /// Moves the eye along the view direction by `delta / 1000`. With
    /// `also_move_at` the target moves by the same offset, so the view
    /// direction is unchanged.
    pub fn dolly(&mut self, delta: f32, also_move_at: bool) {
        let Some(direction) = (self.at - self.eye).try_normalize() else {
            debug!("dolly ignored: eye and at coincide");
            return;
        };
        let offset = direction * (delta / WHEEL_UNITS);
        let eye = self.eye + offset;
        if !also_move_at && (self.at - eye).length() <= MIN_EYE_DISTANCE {
            debug!("dolly ignored: eye would reach the target");
            return;
        }
        self.eye = eye;
        if also_move_at {
            self.at += offset;
        }
    }

    pub fn zoom(&mut self, delta: f32) {
        let factor = 1.0 - delta / WHEEL_UNITS;
        self.fovy = (self.fovy * factor).clamp(ZOOM_FOVY_RANGE.0, ZOOM_FOVY_RANGE.1);
    }

    /// Sets one clipping plane while keeping `near + CLIP_MARGIN <= far`.
    pub fn adjust_clip(&mut self, plane: ClipPlane, value: f32) {
        match plane {
            ClipPlane::Near => {
                self.near = value.min(self.far - CLIP_MARGIN).max(MIN_NEAR);
            }
            ClipPlane::Far => {
                self.far = value.max(self.near + CLIP_MARGIN);
            }
        }
    }

    pub fn forward(&self) -> Vec3 {
        (self.at - self.eye).normalize_or_zero()
    }

    /// Unit lateral vector `cross(up, forward)`. For a camera looking down
    /// `-Z` with `+Y` up this points towards `-X`, the viewer's left.
    pub fn side(&self) -> Vec3 {
        self.up.cross(self.forward()).normalize_or_zero()
    }

    /// Moves `eye` and `at` together by one [`STRAFE_STEP`].
    pub fn strafe(&mut self, direction: StrafeDirection) {
        let movement = match direction {
            StrafeDirection::Forward => self.forward(),
            StrafeDirection::Back => -self.forward(),
            StrafeDirection::Left => self.side(),
            StrafeDirection::Right => -self.side(),
        } * STRAFE_STEP;
        self.eye += movement;
        self.at += movement;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn approx_eq_vec3(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < EPSILON
    }

    #[test]
    fn defaults_match_documented_values() {
        let camera = Camera::default();
        assert_eq!(camera.eye, Vec3::new(0.0, 3.0, 10.0));
        assert_eq!(camera.at, Vec3::ZERO);
        assert_eq!(camera.up, Vec3::Y);
        assert_eq!(camera.fovy, 45.0);
        assert_eq!(camera.near, 0.1);
        assert_eq!(camera.far, 20.0);
    }

    #[test]
    fn reset_restores_defaults_after_mutation() {
        let mut camera = Camera::default();
        camera.set_viewport(1600, 800);
        camera.orbit(35.0, -12.0);
        camera.dolly(250.0, true);
        camera.zoom(300.0);
        camera.adjust_clip(ClipPlane::Far, 3.0);
        camera.strafe(StrafeDirection::Left);
        camera.reset();

        let expected = Camera {
            aspect: 2.0,
            ..Camera::default()
        };
        assert_eq!(camera, expected);
    }

    #[test]
    fn zero_drag_is_a_no_op() {
        let mut camera = Camera::default();
        let before = camera.clone();
        camera.orbit(0.0, 0.0);
        assert_eq!(camera, before);
    }

    #[test]
    fn orbit_preserves_lengths() {
        let mut camera = Camera::default();
        let distance = (camera.eye - camera.at).length();
        for (dx, dy) in [(10.0, 0.0), (0.0, -25.0), (7.0, 3.0), (-40.0, 18.0)] {
            camera.orbit(dx, dy);
            assert!(((camera.eye - camera.at).length() - distance).abs() < EPSILON);
            assert!((camera.up.length() - 1.0).abs() < EPSILON);
        }
        assert!(camera.has_valid_frame());
    }

    #[test]
    fn orbit_leaves_a_degenerate_frame_untouched() {
        let mut camera = Camera {
            eye: Vec3::new(0.0, 5.0, 0.0),
            at: Vec3::ZERO,
            up: Vec3::Y,
            ..Camera::default()
        };
        let before = camera.clone();
        camera.orbit(30.0, -12.0);
        assert_eq!(camera, before);
    }

    #[test]
    fn horizontal_drag_rotates_about_view_up() {
        let mut camera = Camera {
            eye: Vec3::new(0.0, 0.0, 10.0),
            ..Camera::default()
        };
        // 180 px at 0.5 deg/px is a quarter turn around the camera's up axis.
        camera.orbit(180.0, 0.0);
        assert!(approx_eq_vec3(camera.eye, Vec3::new(-10.0, 0.0, 0.0)));
        assert!(approx_eq_vec3(camera.up, Vec3::Y));
    }

    #[test]
    fn dolly_with_modifier_translates_both_points() {
        let mut camera = Camera::default();
        let offset_before = camera.eye - camera.at;
        let eye_before = camera.eye;
        let at_before = camera.at;
        camera.dolly(500.0, true);
        assert!(approx_eq_vec3(camera.eye - eye_before, camera.at - at_before));
        assert!(approx_eq_vec3(camera.eye - camera.at, offset_before));
    }

    #[test]
    fn dolly_without_modifier_keeps_aim() {
        let mut camera = Camera::default();
        let direction = camera.forward();
        camera.dolly(1000.0, false);
        assert_eq!(camera.at, Vec3::ZERO);
        assert!(approx_eq_vec3(camera.forward(), direction));
        let expected = (Vec3::new(0.0, 3.0, 10.0).length() - 1.0) * -direction;
        assert!(approx_eq_vec3(camera.eye, expected));
    }

    #[test]
    fn dolly_never_reaches_the_target() {
        let mut camera = Camera {
            eye: Vec3::new(0.0, 0.0, 0.5),
            ..Camera::default()
        };
        camera.dolly(500.0, false);
        assert_eq!(camera.eye, Vec3::new(0.0, 0.0, 0.5));
    }

    #[test]
    fn zoom_is_multiplicative_and_clamped() {
        let mut camera = Camera::default();
        camera.zoom(100.0);
        assert!((camera.fovy - 40.5).abs() < EPSILON);
        camera.zoom(-5000.0);
        assert_eq!(camera.fovy, 100.0);
        camera.zoom(995.0);
        assert_eq!(camera.fovy, 1.0);
    }

    #[test]
    fn clip_planes_keep_their_margin() {
        let mut camera = Camera::default();
        let edits = [
            (ClipPlane::Near, 50.0),
            (ClipPlane::Far, -3.0),
            (ClipPlane::Near, -1.0),
            (ClipPlane::Far, 0.0),
            (ClipPlane::Near, 19.9),
            (ClipPlane::Far, 1e6),
            (ClipPlane::Near, 0.2),
        ];
        for (plane, value) in edits {
            camera.adjust_clip(plane, value);
            assert!(camera.near > 0.0);
            assert!(camera.near < camera.far, "{plane:?} = {value}");
            assert!(camera.far - camera.near >= CLIP_MARGIN - EPSILON);
        }
    }

    #[test]
    fn near_edit_saturates_below_far() {
        let mut camera = Camera::default();
        camera.adjust_clip(ClipPlane::Near, 25.0);
        assert_eq!(camera.near, 19.5);
        camera.adjust_clip(ClipPlane::Far, 1.0);
        assert_eq!(camera.far, 20.0);
    }

    #[test]
    fn strafe_moves_eye_and_at_together() {
        let mut camera = Camera {
            eye: Vec3::new(0.0, 0.0, 10.0),
            ..Camera::default()
        };
        camera.strafe(StrafeDirection::Left);
        assert!(approx_eq_vec3(camera.eye, Vec3::new(-0.1, 0.0, 10.0)));
        assert!(approx_eq_vec3(camera.at, Vec3::new(-0.1, 0.0, 0.0)));
        camera.strafe(StrafeDirection::Forward);
        assert!(approx_eq_vec3(camera.eye, Vec3::new(-0.1, 0.0, 9.9)));
        camera.strafe(StrafeDirection::Right);
        camera.strafe(StrafeDirection::Back);
        assert!(approx_eq_vec3(camera.eye, Vec3::new(0.0, 0.0, 10.0)));
    }

    #[test]
    fn view_matrix_is_orthonormal_look_at() {
        let camera = Camera::default();
        let view = camera.view_matrix();
        let eye_in_view = view.transform_point3(camera.eye);
        assert!(approx_eq_vec3(eye_in_view, Vec3::ZERO));
        let at_in_view = view.transform_point3(camera.at);
        assert!(at_in_view.x.abs() < EPSILON && at_in_view.y.abs() < EPSILON);
        assert!(at_in_view.z < 0.0);
        for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
            assert!((view.transform_vector3(axis).length() - 1.0).abs() < EPSILON);
        }
    }

    #[test]
    fn degenerate_frame_still_yields_finite_view() {
        let camera = Camera {
            eye: Vec3::new(0.0, 5.0, 0.0),
            at: Vec3::ZERO,
            up: Vec3::Y,
            ..Camera::default()
        };
        assert!(!camera.has_valid_frame());
        assert!(camera.view_matrix().is_finite());
    }

    #[test]
    fn viewport_sets_aspect() {
        let mut camera = Camera::default();
        camera.set_viewport(1280, 720);
        assert!((camera.aspect - 1280.0 / 720.0).abs() < EPSILON);
        camera.set_viewport(100, 0);
        assert!((camera.aspect - 1280.0 / 720.0).abs() < EPSILON);
    }
}
