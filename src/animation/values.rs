use glam::{DQuat, DVec3};

pub trait Interpolatable: Copy + Sized {
    fn interpolate_linear(start: Self, end: Self, t: f64) -> Self;
}

impl Interpolatable for f64 {
    fn interpolate_linear(start: Self, end: Self, t: f64) -> Self {
        start + (end - start) * t
    }
}

impl Interpolatable for DVec3 {
    fn interpolate_linear(start: Self, end: Self, t: f64) -> Self {
        start.lerp(end, t)
    }
}

impl Interpolatable for DQuat {
    fn interpolate_linear(start: Self, end: Self, t: f64) -> Self {
        start.slerp(end, t)
    }
}
