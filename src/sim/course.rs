//! Course geometry registry
//!
//! Immutable per-hole obstacle data. Everything here is produced by an
//! external level description, so each obstacle can report whether it is
//! well formed; malformed ones are skipped by collision rather than faulting.

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::{bearing_to_direction, horizontal_distance};

/// Rectangular playable area in the ground plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
}

impl PlayBounds {
    pub fn new(min_x: f32, max_x: f32, min_z: f32, max_z: f32) -> Self {
        Self {
            min_x,
            max_x,
            min_z,
            max_z,
        }
    }

    /// Whether a point lies inside the bounds grown by `margin`
    pub fn contains(&self, p: Vec3, margin: f32) -> bool {
        p.x > self.min_x - margin
            && p.x < self.max_x + margin
            && p.z > self.min_z - margin
            && p.z < self.max_z + margin
    }

    /// The four inward-facing bounding planes
    pub fn planes(&self) -> [PlaneBarrier; 4] {
        rect_planes(self.min_x, self.max_x, self.min_z, self.max_z)
    }
}

/// Vertical plane the ball must stay on the positive side of.
///
/// The surface is `dot(p, normal) == offset`; the allowed side is
/// `dot(p, normal) >= offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneBarrier {
    pub normal: Vec3,
    pub offset: f32,
}

impl PlaneBarrier {
    /// Signed distance from the plane, positive on the allowed side
    #[inline]
    pub fn distance(&self, p: Vec3) -> f32 {
        p.dot(self.normal) - self.offset
    }
}

fn rect_planes(min_x: f32, max_x: f32, min_z: f32, max_z: f32) -> [PlaneBarrier; 4] {
    [
        PlaneBarrier {
            normal: Vec3::X,
            offset: min_x,
        },
        PlaneBarrier {
            normal: Vec3::NEG_X,
            offset: -max_x,
        },
        PlaneBarrier {
            normal: Vec3::Z,
            offset: min_z,
        },
        PlaneBarrier {
            normal: Vec3::NEG_Z,
            offset: -max_z,
        },
    ]
}

/// Axis-aligned box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min.cmplt(self.max).all()
    }

    /// Box grown by `r` on every side (Minkowski sum with a sphere's bounding box)
    pub fn expanded(&self, r: f32) -> Self {
        Self {
            min: self.min - Vec3::splat(r),
            max: self.max + Vec3::splat(r),
        }
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpgt(self.min).all() && p.cmplt(self.max).all()
    }
}

/// Internal wall with arbitrary yaw, standing on its center point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientedWall {
    /// Base center (y is the bottom of the wall)
    pub center: Vec3,
    /// Rotation about +y (radians)
    pub yaw: f32,
    /// Extent along local x
    pub width: f32,
    /// Extent along local z
    pub length: f32,
    pub height: f32,
}

impl OrientedWall {
    pub fn is_valid(&self) -> bool {
        self.center.is_finite()
            && self.yaw.is_finite()
            && self.width > 0.0
            && self.length > 0.0
            && self.height > 0.0
    }

    #[inline]
    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw)
    }

    /// World point into the wall's local frame (origin at base center)
    #[inline]
    pub fn to_local(&self, p: Vec3) -> Vec3 {
        self.rotation().inverse() * (p - self.center)
    }

    /// Local direction back into world space
    #[inline]
    pub fn to_world_dir(&self, d: Vec3) -> Vec3 {
        self.rotation() * d
    }

    pub fn half_extents(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.length * 0.5)
    }
}

/// Axis-aligned wall, possibly part of a custom perimeter.
///
/// Bounds are optional because level descriptions can omit them; such
/// walls are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomWall {
    pub bounds: Option<Aabb>,
}

impl CustomWall {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            bounds: Some(Aabb::new(min, max)),
        }
    }

    /// Bounds if present and well formed
    pub fn valid_bounds(&self) -> Option<Aabb> {
        self.bounds.filter(Aabb::is_valid)
    }
}

/// Ring bumper (torus lying on the ground)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bumper {
    pub center: Vec3,
    pub outer_radius: f32,
    pub tube_radius: f32,
}

impl Bumper {
    pub fn is_valid(&self) -> bool {
        self.center.is_finite() && self.outer_radius > 0.0 && self.tube_radius > 0.0
    }

    /// Inner edge of the ring
    pub fn inner_radius(&self) -> f32 {
        (self.outer_radius - 2.0 * self.tube_radius).max(0.0)
    }

    pub fn height(&self) -> f32 {
        2.0 * self.tube_radius
    }
}

/// Rectangular pit the ball falls through
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    pub center: Vec3,
    /// Extent along x
    pub width: f32,
    /// Extent along z
    pub length: f32,
}

impl Hazard {
    pub fn is_valid(&self) -> bool {
        self.center.is_finite()
            && self.width > 2.0 * (BALL_RADIUS + HAZARD_EDGE_INSET)
            && self.length > 2.0 * (BALL_RADIUS + HAZARD_EDGE_INSET)
    }

    pub fn min_x(&self) -> f32 {
        self.center.x - self.width * 0.5
    }

    pub fn max_x(&self) -> f32 {
        self.center.x + self.width * 0.5
    }

    pub fn min_z(&self) -> f32 {
        self.center.z - self.length * 0.5
    }

    pub fn max_z(&self) -> f32 {
        self.center.z + self.length * 0.5
    }

    /// Whether a point is over the footprint grown by `margin`
    pub fn footprint_contains(&self, p: Vec3, margin: f32) -> bool {
        p.x > self.min_x() - margin
            && p.x < self.max_x() + margin
            && p.z > self.min_z() - margin
            && p.z < self.max_z() + margin
    }

    /// Shallow barriers just inside the mouth of the pit
    pub fn edge_barriers(&self) -> [PlaneBarrier; 4] {
        rect_planes(
            self.min_x() + HAZARD_EDGE_INSET,
            self.max_x() - HAZARD_EDGE_INSET,
            self.min_z() + HAZARD_EDGE_INSET,
            self.max_z() - HAZARD_EDGE_INSET,
        )
    }

    /// Deep walls on the true footprint
    pub fn containment_walls(&self) -> [PlaneBarrier; 4] {
        rect_planes(self.min_x(), self.max_x(), self.min_z(), self.max_z())
    }
}

/// Hole the ball is sunk into
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HoleTarget {
    pub position: Vec3,
    pub capture_radius: f32,
}

/// Rotating fan: blades are dynamic colliders, the airflow is a push force
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fan {
    pub center: Vec3,
    /// Bearing the airflow blows toward
    pub facing: f32,
    pub blade_count: u32,
    pub blade_length: f32,
    pub blade_thickness: f32,
    /// Blade angle at t = 0
    pub phase: f32,
    /// Radians per second
    pub angular_velocity: f32,
    /// Peak push acceleration at the fan
    pub push_strength: f32,
    pub push_range: f32,
    /// Half-angle of the push cone (radians)
    pub push_spread: f32,
}

impl Fan {
    pub fn is_valid(&self) -> bool {
        self.center.is_finite() && self.blade_length > 0.0 && self.blade_thickness > 0.0
    }

    pub fn facing_direction(&self) -> Vec3 {
        bearing_to_direction(self.facing)
    }

    /// Angle of blade `index` at simulation time `time`
    pub fn blade_angle(&self, index: u32, time: f32) -> f32 {
        let spacing = std::f32::consts::TAU / self.blade_count.max(1) as f32;
        self.phase + self.angular_velocity * time + index as f32 * spacing
    }

    /// Blade segments (hub to tip) in the ground plane at `time`
    pub fn blades(&self, time: f32) -> impl Iterator<Item = (Vec3, Vec3)> + '_ {
        (0..self.blade_count).map(move |i| {
            let dir = bearing_to_direction(self.blade_angle(i, time));
            (self.center, self.center + dir * self.blade_length)
        })
    }
}

/// Region with a constant push
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindZone {
    pub region: Aabb,
    pub acceleration: Vec3,
}

/// Attractor the ball is pulled toward within its range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MagneticField {
    pub center: Vec3,
    pub range: f32,
    pub strength: f32,
}

impl MagneticField {
    pub fn contains(&self, p: Vec3) -> bool {
        horizontal_distance(p, self.center) < self.range
    }
}

/// All static data for one hole
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseGeometry {
    pub ground_y: f32,
    pub bounds: PlayBounds,
    /// When true the perimeter is modelled by `custom_walls` and the
    /// bounding planes are not collided against
    #[serde(default)]
    pub custom_perimeter: bool,
    pub tee: Vec3,
    pub hole: HoleTarget,
    #[serde(default)]
    pub walls: Vec<OrientedWall>,
    #[serde(default)]
    pub custom_walls: Vec<CustomWall>,
    #[serde(default)]
    pub bumpers: Vec<Bumper>,
    #[serde(default)]
    pub hazards: Vec<Hazard>,
    #[serde(default)]
    pub fans: Vec<Fan>,
    #[serde(default)]
    pub wind_zones: Vec<WindZone>,
    #[serde(default)]
    pub fields: Vec<MagneticField>,
    /// Authored guide points for the planner
    #[serde(default)]
    pub waypoints: Vec<Vec3>,
}

impl CourseGeometry {
    /// Flat, empty course
    pub fn open(bounds: PlayBounds, tee: Vec3, hole: HoleTarget) -> Self {
        Self {
            ground_y: 0.0,
            bounds,
            custom_perimeter: false,
            tee,
            hole,
            walls: Vec::new(),
            custom_walls: Vec::new(),
            bumpers: Vec::new(),
            hazards: Vec::new(),
            fans: Vec::new(),
            wind_zones: Vec::new(),
            fields: Vec::new(),
            waypoints: Vec::new(),
        }
    }

    /// Parse a course. Call `validate` afterwards to report unusable obstacles.
    pub fn from_json(json: &str) -> Result<Self, crate::SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Report malformed obstacles. Returns how many will be ignored.
    pub fn validate(&self) -> usize {
        let mut skipped = 0;
        for (i, w) in self.walls.iter().enumerate() {
            if !w.is_valid() {
                log::warn!("Wall {} is malformed and will be ignored", i);
                skipped += 1;
            }
        }
        for (i, w) in self.custom_walls.iter().enumerate() {
            if w.valid_bounds().is_none() {
                log::warn!("Custom wall {} has missing or inverted bounds and will be ignored", i);
                skipped += 1;
            }
        }
        for (i, b) in self.bumpers.iter().enumerate() {
            if !b.is_valid() {
                log::warn!("Bumper {} is malformed and will be ignored", i);
                skipped += 1;
            }
        }
        for (i, h) in self.hazards.iter().enumerate() {
            if !h.is_valid() {
                log::warn!("Hazard {} is too small or malformed and will be ignored", i);
                skipped += 1;
            }
        }
        for (i, f) in self.fans.iter().enumerate() {
            if !f.is_valid() {
                log::warn!("Fan {} is malformed and will be ignored", i);
                skipped += 1;
            }
        }
        skipped
    }

    /// Whether a point is horizontally over the hole
    #[inline]
    pub fn over_hole(&self, p: Vec3) -> bool {
        horizontal_distance(p, self.hole.position) < self.hole.capture_radius
    }

    /// Hazard whose footprint contains the point, if any
    pub fn hazard_at(&self, p: Vec3, margin: f32) -> Option<&Hazard> {
        self.hazards
            .iter()
            .filter(|h| h.is_valid())
            .find(|h| h.footprint_contains(p, margin))
    }

    /// Surface height under a point. `None` means there is no ground (a hazard).
    pub fn terrain_height(&self, p: Vec3) -> Option<f32> {
        if self.hazard_at(p, 0.0).is_some() {
            None
        } else if self.over_hole(p) {
            Some(self.ground_y - HOLE_CUP_DEPTH)
        } else {
            Some(self.ground_y)
        }
    }

    /// Coarse occupancy query for planning: is a ball centred at `p`
    /// within `margin` of any solid obstacle?
    pub fn is_blocked(&self, p: Vec3, radius: f32, margin: f32) -> bool {
        let reach = radius + margin;
        if !self.custom_perimeter && !self.bounds.contains(p, -reach) {
            return true;
        }
        let wall_hit = self.walls.iter().filter(|w| w.is_valid()).any(|w| {
            let local = w.to_local(p);
            let half = w.half_extents();
            local.x.abs() < half.x + reach && local.z.abs() < half.y + reach
        });
        if wall_hit {
            return true;
        }
        let custom_hit = self
            .custom_walls
            .iter()
            .filter_map(CustomWall::valid_bounds)
            .any(|b| {
                p.x > b.min.x - reach
                    && p.x < b.max.x + reach
                    && p.z > b.min.z - reach
                    && p.z < b.max.z + reach
            });
        if custom_hit {
            return true;
        }
        let bumper_hit = self.bumpers.iter().filter(|b| b.is_valid()).any(|b| {
            let d = horizontal_distance(p, b.center);
            d < b.outer_radius + reach && d > b.inner_radius() - reach
        });
        if bumper_hit {
            return true;
        }
        // Blades sweep their whole disc over time
        self.fans.iter().filter(|f| f.is_valid()).any(|f| {
            horizontal_distance(p, f.center) < f.blade_length + f.blade_thickness + reach
        })
    }

    /// Magnetic field containing the point, if any
    pub fn field_at(&self, p: Vec3) -> Option<&MagneticField> {
        self.fields.iter().find(|f| f.contains(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course() -> CourseGeometry {
        CourseGeometry::open(
            PlayBounds::new(-20.0, 20.0, -20.0, 20.0),
            Vec3::new(0.0, BALL_RADIUS, 10.0),
            HoleTarget {
                position: Vec3::new(0.0, 0.0, -10.0),
                capture_radius: 1.0,
            },
        )
    }

    #[test]
    fn test_terrain_has_gaps_for_hazard_and_cup() {
        let mut c = course();
        c.hazards.push(Hazard {
            center: Vec3::new(8.0, 0.0, 0.0),
            width: 4.0,
            length: 4.0,
        });
        assert_eq!(c.terrain_height(Vec3::new(0.0, 0.5, 0.0)), Some(0.0));
        assert_eq!(c.terrain_height(Vec3::new(8.5, 0.5, 0.5)), None);
        assert_eq!(
            c.terrain_height(Vec3::new(0.0, 0.5, -10.2)),
            Some(-HOLE_CUP_DEPTH)
        );
    }

    #[test]
    fn test_oriented_wall_local_frame() {
        let wall = OrientedWall {
            center: Vec3::new(2.0, 0.0, 0.0),
            yaw: std::f32::consts::FRAC_PI_2,
            width: 4.0,
            length: 1.0,
            height: 1.0,
        };
        // A quarter turn about +y maps local +x onto world -z
        let world = wall.center + wall.to_world_dir(Vec3::X);
        assert!((world - Vec3::new(2.0, 0.0, -1.0)).length() < 1e-5);
        let local = wall.to_local(world);
        assert!((local - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn test_custom_wall_without_bounds_is_skipped() {
        let mut c = course();
        c.custom_walls.push(CustomWall { bounds: None });
        c.custom_walls.push(CustomWall::new(Vec3::ONE, Vec3::ZERO));
        assert_eq!(c.validate(), 2);
        assert!(c.custom_walls.iter().all(|w| w.valid_bounds().is_none()));
    }

    #[test]
    fn test_fan_blades_rotate_with_time() {
        let fan = Fan {
            center: Vec3::ZERO,
            facing: 0.0,
            blade_count: 2,
            blade_length: 2.0,
            blade_thickness: 0.2,
            phase: 0.0,
            angular_velocity: std::f32::consts::PI,
            push_strength: 0.0,
            push_range: 0.0,
            push_spread: 0.5,
        };
        let (_, tip) = fan.blades(0.5).next().unwrap();
        assert!((tip - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-4);
    }

    #[test]
    fn test_is_blocked_near_bumper() {
        let mut c = course();
        c.bumpers.push(Bumper {
            center: Vec3::ZERO,
            outer_radius: 1.0,
            tube_radius: 0.3,
        });
        assert!(c.is_blocked(Vec3::new(1.2, 0.5, 0.0), BALL_RADIUS, 0.1));
        assert!(!c.is_blocked(Vec3::new(4.0, 0.5, 0.0), BALL_RADIUS, 0.1));
    }

    #[test]
    fn test_course_json_round_trip() {
        let mut c = course();
        c.custom_walls.push(CustomWall { bounds: None });
        let json = serde_json::to_string(&c).unwrap();
        let back = CourseGeometry::from_json(&json).unwrap();
        assert_eq!(back.bounds, c.bounds);
        assert_eq!(back.custom_walls.len(), 1);
    }
}
