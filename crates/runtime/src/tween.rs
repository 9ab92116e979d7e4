//! Time-based interpolation with an explicit owner.
//!
//! [`Animation`] holds at most one [`Tween`]. Starting a new one replaces
//! the previous tween outright, so two interpolations never race on the
//! same value.

use foundation::math::Vec3;
use foundation::time::Time;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Easing {
    Linear,
    QuadraticIn,
    #[default]
    QuadraticOut,
    QuadraticInOut,
}

impl Easing {
    /// Maps normalized time `t` in `[0, 1]` to eased progress.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadraticIn => t * t,
            Easing::QuadraticOut => t * (2.0 - t),
            Easing::QuadraticInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
        }
    }
}

pub trait Interpolate: Copy {
    fn interpolate(self, to: Self, t: f64) -> Self;
}

impl Interpolate for f64 {
    fn interpolate(self, to: Self, t: f64) -> Self {
        self + (to - self) * t
    }
}

impl Interpolate for Vec3 {
    fn interpolate(self, to: Self, t: f64) -> Self {
        self.lerp(to, t)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Tween<T> {
    pub from: T,
    pub to: T,
    pub start: Time,
    pub duration_ms: f64,
    pub easing: Easing,
}

impl<T: Interpolate> Tween<T> {
    pub fn new(from: T, to: T, start: Time, duration_ms: f64, easing: Easing) -> Self {
        Self {
            from,
            to,
            start,
            duration_ms: duration_ms.max(0.0),
            easing,
        }
    }

    pub fn progress(&self, now: Time) -> f64 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        (now.since(self.start) / self.duration_ms).min(1.0)
    }

    pub fn sample(&self, now: Time) -> T {
        let t = self.progress(now);
        if t >= 1.0 {
            return self.to;
        }
        self.from.interpolate(self.to, self.easing.apply(t))
    }

    pub fn is_finished(&self, now: Time) -> bool {
        self.progress(now) >= 1.0
    }
}

/// Result of advancing an [`Animation`] by one frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum AnimationStep<T> {
    Idle,
    Running(T),
    Finished(T),
}

#[derive(Debug, Clone, Default)]
pub struct Animation<T> {
    active: Option<Tween<T>>,
}

impl<T: Interpolate> Animation<T> {
    pub fn new() -> Self {
        Self { active: None }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn target(&self) -> Option<T> {
        self.active.as_ref().map(|t| t.to)
    }

    /// Starts a tween from `current`, discarding any tween in flight.
    pub fn start(&mut self, current: T, to: T, now: Time, duration_ms: f64, easing: Easing) {
        self.active = Some(Tween::new(current, to, now, duration_ms, easing));
    }

    /// Points a running tween at a new destination.
    ///
    /// Restarts from `current` (the live value, not the tween's first `from`)
    /// with the same duration and easing. Without a running tween this
    /// behaves like `start` with the given fallback duration.
    pub fn retarget(&mut self, current: T, to: T, now: Time, fallback_duration_ms: f64) {
        let (duration, easing) = match &self.active {
            Some(t) => (t.duration_ms, t.easing),
            None => (fallback_duration_ms, Easing::default()),
        };
        self.start(current, to, now, duration, easing);
    }

    pub fn cancel(&mut self) -> bool {
        self.active.take().is_some()
    }

    pub fn update(&mut self, now: Time) -> AnimationStep<T> {
        let Some(tween) = self.active else {
            return AnimationStep::Idle;
        };
        let value = tween.sample(now);
        if tween.is_finished(now) {
            self.active = None;
            AnimationStep::Finished(value)
        } else {
            AnimationStep::Running(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Animation, AnimationStep, Easing, Tween};
    use foundation::math::Vec3;
    use foundation::time::Time;

    #[test]
    fn quadratic_out_is_front_loaded() {
        assert_eq!(Easing::QuadraticOut.apply(0.0), 0.0);
        assert_eq!(Easing::QuadraticOut.apply(0.5), 0.75);
        assert_eq!(Easing::QuadraticOut.apply(1.0), 1.0);
        assert_eq!(Easing::QuadraticOut.apply(2.0), 1.0);
    }

    #[test]
    fn tween_samples_endpoints() {
        let tw = Tween::new(0.0f64, 10.0, Time(100.0), 1000.0, Easing::Linear);
        assert_eq!(tw.sample(Time(50.0)), 0.0);
        assert_eq!(tw.sample(Time(600.0)), 5.0);
        assert_eq!(tw.sample(Time(5000.0)), 10.0);
        assert!(tw.is_finished(Time(1100.0)));
    }

    #[test]
    fn zero_duration_finishes_immediately() {
        let mut anim = Animation::new();
        anim.start(Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0), Time(0.0), 0.0, Easing::Linear);
        assert_eq!(
            anim.update(Time(0.0)),
            AnimationStep::Finished(Vec3::new(1.0, 1.0, 1.0))
        );
        assert!(!anim.is_active());
    }

    #[test]
    fn starting_again_replaces_running_tween() {
        let mut anim = Animation::new();
        anim.start(0.0f64, 100.0, Time(0.0), 1000.0, Easing::Linear);
        anim.start(50.0, -10.0, Time(500.0), 1000.0, Easing::Linear);
        assert_eq!(anim.target(), Some(-10.0));
        assert_eq!(anim.update(Time(1000.0)), AnimationStep::Running(20.0));
    }

    #[test]
    fn retarget_continues_from_live_value() {
        let mut anim = Animation::new();
        anim.start(0.0f64, 10.0, Time(0.0), 100.0, Easing::Linear);
        let AnimationStep::Running(live) = anim.update(Time(50.0)) else {
            panic!("expected running");
        };
        assert_eq!(live, 5.0);
        anim.retarget(live, 0.0, Time(50.0), 999.0);
        // Same 100ms duration, now heading back from 5.0.
        assert_eq!(anim.update(Time(100.0)), AnimationStep::Running(2.5));
        assert_eq!(anim.update(Time(150.0)), AnimationStep::Finished(0.0));
    }

    #[test]
    fn cancel_stops_animation() {
        let mut anim: Animation<f64> = Animation::new();
        assert!(!anim.cancel());
        anim.start(0.0, 1.0, Time(0.0), 10.0, Easing::Linear);
        assert!(anim.cancel());
        assert_eq!(anim.update(Time(5.0)), AnimationStep::Idle);
    }
}
