use foundation::bounds::Aabb3;
use foundation::math::{Mat4, Vec2, Vec3};
use foundation::time::Time;
use runtime::tween::{Animation, AnimationStep, Easing};

use crate::picking::Ray;
use crate::pointer::screen_to_ndc;

const UP: Vec3 = Vec3 {
    x: 0.0,
    y: 1.0,
    z: 0.0,
};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraOptions {
    pub fov_y_deg: f64,
    pub near: f64,
    pub far: f64,
    /// Distance from the camera to its look target along -z.
    pub view_offset: f64,
    pub animation_ms: f64,
    /// Added above the highest framed point.
    pub frame_margin: f64,
    /// Added above `means` (or the centroid) for the first view.
    pub initial_distance: f64,
    pub pan_speed: f64,
    pub zoom_speed: f64,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            fov_y_deg: 75.0,
            near: 0.001,
            far: 1000.0,
            view_offset: 5.0,
            animation_ms: 1200.0,
            frame_margin: 2.0,
            initial_distance: 2.5,
            pan_speed: 0.5,
            zoom_speed: 0.25,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub target: Vec3,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self::looking_down(Vec3::ZERO, CameraOptions::default().view_offset)
    }
}

impl CameraPose {
    /// Pose at `position` looking straight down -z with +y up.
    pub fn looking_down(position: Vec3, view_offset: f64) -> Self {
        Self {
            position,
            target: position - Vec3::new(0.0, 0.0, view_offset),
        }
    }
}

/// Owns the camera pose and at most one position tween.
#[derive(Debug, Clone)]
pub struct CameraController {
    options: CameraOptions,
    pose: CameraPose,
    viewport: Vec2,
    animation: Animation<Vec3>,
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(CameraOptions::default())
    }
}

impl CameraController {
    pub fn new(options: CameraOptions) -> Self {
        Self {
            options,
            pose: CameraPose::looking_down(Vec3::ZERO, options.view_offset),
            viewport: Vec2::new(1.0, 1.0),
            animation: Animation::new(),
        }
    }

    pub fn options(&self) -> &CameraOptions {
        &self.options
    }

    pub fn pose(&self) -> CameraPose {
        self.pose
    }

    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    /// Canvas size in pixels. Non-positive sizes are ignored.
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        if width > 0.0 && height > 0.0 {
            self.viewport = Vec2::new(width, height);
        }
    }

    /// Changes the pan multiplier. Negative or non-finite speeds are ignored.
    pub fn set_pan_speed(&mut self, speed: f64) -> bool {
        if !speed.is_finite() || speed < 0.0 {
            return false;
        }
        self.options.pan_speed = speed;
        true
    }

    /// Changes the world units moved per wheel step. Negative or non-finite
    /// speeds are ignored.
    pub fn set_zoom_speed(&mut self, speed: f64) -> bool {
        if !speed.is_finite() || speed < 0.0 {
            return false;
        }
        self.options.zoom_speed = speed;
        true
    }

    pub fn aspect(&self) -> f64 {
        self.viewport.x / self.viewport.y
    }

    /// Instantly moves to `position`, looking down -z with no rotation.
    pub fn view_area(&mut self, position: Vec3) {
        self.pose = CameraPose::looking_down(position, self.options.view_offset);
    }

    /// Position for the first view: `means` when the document has one,
    /// otherwise the centroid, raised by the initial distance.
    pub fn initial_position(&self, means: Option<Vec3>, centroid: Option<Vec3>) -> Vec3 {
        let base = means.or(centroid).unwrap_or(Vec3::ZERO);
        base + Vec3::new(0.0, 0.0, self.options.initial_distance)
    }

    /// Camera position framing `points`: bounds center in x/y, above the
    /// highest point by the frame margin. `None` for no points.
    pub fn frame_target(&self, points: impl IntoIterator<Item = Vec3>) -> Option<Vec3> {
        let bounds = Aabb3::from_points(points);
        if bounds.is_empty() {
            return None;
        }
        let c = bounds.center();
        Some(Vec3::new(c.x, c.y, bounds.max.z + self.options.frame_margin))
    }

    /// Starts a fresh ease-out tween to `to`, replacing any tween in flight.
    pub fn animate_to(&mut self, to: Vec3, now: Time) {
        self.animation.start(
            self.pose.position,
            to,
            now,
            self.options.animation_ms,
            Easing::QuadraticOut,
        );
    }

    /// Sends a running tween to `to` from the live position.
    pub fn retarget(&mut self, to: Vec3, now: Time) {
        self.animation
            .retarget(self.pose.position, to, now, self.options.animation_ms);
    }

    pub fn cancel_animation(&mut self) -> bool {
        self.animation.cancel()
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_active()
    }

    pub fn animation_target(&self) -> Option<Vec3> {
        self.animation.target()
    }

    /// Advances the tween. Returns whether the pose changed.
    pub fn update(&mut self, now: Time) -> bool {
        match self.animation.update(now) {
            AnimationStep::Idle => false,
            AnimationStep::Running(p) | AnimationStep::Finished(p) => {
                let changed = p != self.pose.position;
                self.view_area(p);
                changed
            }
        }
    }

    /// Screen-space pan by a pointer delta in pixels. Ignored while animating.
    pub fn pan(&mut self, dx_px: f64, dy_px: f64) -> bool {
        if self.is_animating() {
            return false;
        }
        let distance = self.pose.position.distance(self.pose.target);
        let half_fov = self.options.fov_y_deg.to_radians() * 0.5;
        let world_per_px = 2.0 * distance * half_fov.tan() / self.viewport.y;
        let scale = world_per_px * self.options.pan_speed;
        let delta = Vec3::new(-dx_px * scale, dy_px * scale, 0.0);
        if delta == Vec3::ZERO {
            return false;
        }
        self.pose.position = self.pose.position + delta;
        self.pose.target = self.pose.target + delta;
        true
    }

    /// Moves along the view axis; positive `steps` move towards the scene.
    /// Ignored while animating.
    pub fn dolly(&mut self, steps: f64) -> bool {
        if self.is_animating() || steps == 0.0 {
            return false;
        }
        let Some(forward) = (self.pose.target - self.pose.position).normalized() else {
            return false;
        };
        let delta = forward * (steps * self.options.zoom_speed);
        self.pose.position = self.pose.position + delta;
        self.pose.target = self.pose.target + delta;
        true
    }

    pub fn view(&self) -> Option<Mat4> {
        Mat4::look_at_rh(self.pose.position, self.pose.target, UP)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh_z0(
            self.options.fov_y_deg.to_radians(),
            self.aspect(),
            self.options.near,
            self.options.far,
        )
    }

    pub fn view_proj(&self) -> Option<Mat4> {
        Some(self.projection().mul(&self.view()?))
    }

    /// World-space ray from the camera through `ndc`.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Option<Ray> {
        let inv = self.view_proj()?.inverse()?;
        let far = inv.project_point(Vec3::new(ndc.x, ndc.y, 1.0))?;
        let dir = (far - self.pose.position).normalized()?;
        Some(Ray::new(self.pose.position, dir))
    }

    /// World-space ray through a pixel of the current viewport.
    pub fn ray_from_screen(&self, px: Vec2) -> Option<Ray> {
        let ndc = screen_to_ndc(px, self.viewport.x, self.viewport.y)?;
        self.ray_from_ndc(ndc)
    }
}
