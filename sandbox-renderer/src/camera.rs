//! Orbit camera driven by pointer drag and wheel input.

use std::f32::consts::{FRAC_PI_4, PI};

use crate::{
    host::PointerInput,
    spatial::{Mat4, Vec3},
};

/// Initial distance from the target.
pub const INITIAL_DISTANCE: f32 = 11.2;
/// Closest allowed zoom.
pub const MIN_DISTANCE: f32 = 2.0;
/// Farthest allowed zoom.
pub const MAX_DISTANCE: f32 = 50.0;
/// Lowest elevation, keeps the camera off the pole.
pub const MIN_ELEVATION: f32 = 0.01;
/// Highest elevation.
pub const MAX_ELEVATION: f32 = PI - 0.01;
/// Radians of rotation per dragged CSS pixel.
pub const DRAG_SPEED: f32 = 0.01;
/// Distance change per unit of wheel delta.
pub const ZOOM_SPEED: f32 = 0.05;
/// Fraction of the remaining zoom applied each frame.
pub const ZOOM_SMOOTHING: f32 = 0.1;

/// Camera orbiting a target on a sphere.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraController {
    target: Vec3,
    distance: f32,
    target_distance: f32,
    azimuth: f32,
    elevation: f32,
}

impl CameraController {
    /// Camera at the initial orbit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            target: Vec3::zero(),
            distance: INITIAL_DISTANCE,
            target_distance: INITIAL_DISTANCE,
            azimuth: FRAC_PI_4,
            elevation: FRAC_PI_4,
        }
    }

    /// Horizontal orbit angle.
    #[must_use]
    pub fn azimuth(&self) -> f32 {
        self.azimuth
    }

    /// Vertical orbit angle.
    #[must_use]
    pub fn elevation(&self) -> f32 {
        self.elevation
    }

    /// Current distance from the target.
    #[must_use]
    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Distance the camera is easing towards.
    #[must_use]
    pub fn target_distance(&self) -> f32 {
        self.target_distance
    }

    /// Apply pointer input.
    #[allow(clippy::cast_possible_truncation)]
    pub fn handle(&mut self, input: PointerInput) {
        match input {
            PointerInput::Drag { dx, dy } => self.drag(dx as f32, dy as f32),
            PointerInput::Wheel { delta_y } => self.zoom(delta_y as f32),
        }
    }

    /// Orbit by a pointer drag. Takes effect immediately.
    pub fn drag(&mut self, dx: f32, dy: f32) {
        self.azimuth -= dx * DRAG_SPEED;
        self.elevation = (self.elevation - dy * DRAG_SPEED).clamp(MIN_ELEVATION, MAX_ELEVATION);
    }

    /// Change the zoom target by a wheel delta.
    pub fn zoom(&mut self, delta_y: f32) {
        self.target_distance =
            (self.target_distance + delta_y * ZOOM_SPEED).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    /// Ease the distance towards the zoom target. Call once per frame.
    pub fn update(&mut self) {
        self.distance += (self.target_distance - self.distance) * ZOOM_SMOOTHING;
    }

    /// Eye position in world space.
    #[must_use]
    pub fn eye(&self) -> Vec3 {
        let (sin_el, cos_el) = self.elevation.sin_cos();
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        self.target
            + Vec3::new(
                self.distance * cos_el * sin_az,
                self.distance * sin_el,
                self.distance * cos_el * cos_az,
            )
    }

    /// View matrix for the current orbit.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.eye(), self.target, Vec3::up())
    }
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_initial_orbit() {
        let cam = CameraController::new();
        assert!(approx_eq(cam.distance(), 11.2));
        assert!(approx_eq(cam.azimuth(), FRAC_PI_4));
        assert!(approx_eq(cam.elevation(), FRAC_PI_4));
        assert!(approx_eq(cam.eye().length(), 11.2));
    }

    #[test]
    fn test_drag_rotates_immediately() {
        let mut cam = CameraController::new();
        cam.handle(PointerInput::Drag { dx: 10.0, dy: -20.0 });
        assert!(approx_eq(cam.azimuth(), FRAC_PI_4 - 0.1));
        assert!(approx_eq(cam.elevation(), FRAC_PI_4 + 0.2));
    }

    #[test]
    fn test_elevation_is_clamped() {
        let mut cam = CameraController::new();
        cam.drag(0.0, 10_000.0);
        assert!(approx_eq(cam.elevation(), MIN_ELEVATION));
        cam.drag(0.0, -10_000.0);
        assert!(approx_eq(cam.elevation(), MAX_ELEVATION));
    }

    #[test]
    fn test_wheel_sets_target_and_update_eases() {
        let mut cam = CameraController::new();
        cam.handle(PointerInput::Wheel { delta_y: 100.0 });
        assert!(approx_eq(cam.target_distance(), 16.2));
        assert!(approx_eq(cam.distance(), 11.2));
        cam.update();
        assert!(approx_eq(cam.distance(), 11.7));
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut cam = CameraController::new();
        cam.zoom(-10_000.0);
        assert!(approx_eq(cam.target_distance(), MIN_DISTANCE));
        cam.zoom(10_000.0);
        assert!(approx_eq(cam.target_distance(), MAX_DISTANCE));
    }

    #[test]
    fn test_view_matrix_places_target_at_distance() {
        let cam = CameraController::new();
        let t = cam.view_matrix().transform_point(Vec3::zero());
        assert!(approx_eq(t.z, -11.2));
    }
}
