//! Continuous force providers
//!
//! Fans, wind zones, magnetic fields and the magnet power-up all expose the
//! same query: the acceleration a ball of a given radius feels at a point.
//! The scheduler samples every provider once per substep.

use glam::Vec3;

use super::course::{CourseGeometry, Fan, MagneticField, WindZone};
use super::state::{ActiveEffects, MagnetPull};
use crate::horizontal;

/// Anything that pushes the ball while it moves
pub trait ForceProvider {
    /// Acceleration (units/s²) at `position`
    fn acceleration(&self, position: Vec3, radius: f32) -> Vec3;
}

/// Linear falloff pull toward `center`, zero outside `range`
fn radial_pull(position: Vec3, center: Vec3, range: f32, strength: f32) -> Vec3 {
    let to_center = horizontal(center - position);
    let dist = to_center.length();
    if dist >= range || dist < 1e-3 {
        return Vec3::ZERO;
    }
    to_center / dist * strength * (1.0 - dist / range)
}

impl ForceProvider for Fan {
    fn acceleration(&self, position: Vec3, radius: f32) -> Vec3 {
        if !self.is_valid() || self.push_range <= 0.0 {
            return Vec3::ZERO;
        }
        let offset = horizontal(position - self.center);
        let dist = (offset.length() - radius).max(0.0);
        if dist >= self.push_range || offset.length_squared() < 1e-6 {
            return Vec3::ZERO;
        }
        let facing = self.facing_direction();
        // Only inside the airflow cone in front of the fan
        if offset.normalize().dot(facing) < self.push_spread.cos() {
            return Vec3::ZERO;
        }
        facing * self.push_strength * (1.0 - dist / self.push_range)
    }
}

impl ForceProvider for WindZone {
    fn acceleration(&self, position: Vec3, _radius: f32) -> Vec3 {
        if self.region.contains(position) {
            self.acceleration
        } else {
            Vec3::ZERO
        }
    }
}

impl ForceProvider for MagneticField {
    fn acceleration(&self, position: Vec3, _radius: f32) -> Vec3 {
        radial_pull(position, self.center, self.range, self.strength)
    }
}

impl ForceProvider for MagnetPull {
    fn acceleration(&self, position: Vec3, _radius: f32) -> Vec3 {
        radial_pull(position, self.target, self.range, self.strength)
    }
}

/// Sum of every course and power-up force at a point
pub fn total_acceleration(
    course: &CourseGeometry,
    effects: &ActiveEffects,
    position: Vec3,
    radius: f32,
) -> Vec3 {
    let providers = course
        .fans
        .iter()
        .map(|f| f as &dyn ForceProvider)
        .chain(course.wind_zones.iter().map(|w| w as &dyn ForceProvider))
        .chain(course.fields.iter().map(|f| f as &dyn ForceProvider))
        .chain(effects.magnet.iter().map(|m| m as &dyn ForceProvider));

    providers.fold(Vec3::ZERO, |acc, p| acc + p.acceleration(position, radius))
}
