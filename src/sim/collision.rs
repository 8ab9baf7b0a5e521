//! Collision detection and response
//!
//! Every obstacle category is a `Collider` variant with its own contact
//! test. `resolve` walks them in a fixed priority order and applies the
//! first contact found, so each call corrects at most one penetration;
//! the scheduler calls it every substep and simultaneous contacts are
//! worked off over consecutive substeps.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::course::{
    Aabb, Bumper, CourseGeometry, CustomWall, Hazard, OrientedWall, PlaneBarrier, PlayBounds,
};
use super::integrator::MotionProfile;
use super::state::{BallState, Impact, ImpactSink};
use crate::consts::{HAZARD_CONTAIN_DEPTH, HAZARD_EDGE_DEPTH, SWEEP_EPSILON};
use crate::horizontal;

/// Obstacle category, reported with every impact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColliderKind {
    Perimeter,
    OrientedBox,
    SweptBox,
    Annulus,
    InsetBarrier,
    ContainmentWall,
    Blade,
}

/// A single obstacle as seen by the resolver
#[derive(Debug, Clone, Copy)]
pub enum Collider<'a> {
    Perimeter(&'a PlayBounds),
    OrientedBox(&'a OrientedWall),
    /// All axis-aligned walls together: the earliest crossing among them wins
    SweptBoxes(&'a [CustomWall]),
    Annulus(&'a Bumper),
    InsetBarrier(&'a Hazard),
    ContainmentWall(&'a Hazard),
}

/// Corrected state for one resolved contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub position: Vec3,
    pub velocity: Vec3,
    pub normal: Vec3,
}

/// Result of one resolution call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionOutcome {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Unit surface normal (zero when nothing was hit)
    pub normal: Vec3,
    pub collided: bool,
    pub kind: Option<ColliderKind>,
}

impl CollisionOutcome {
    pub fn miss(ball: &BallState) -> Self {
        Self {
            position: ball.position,
            velocity: ball.velocity,
            normal: Vec3::ZERO,
            collided: false,
            kind: None,
        }
    }
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec3, normal: Vec3) -> Vec3 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Reflect if moving into the surface, then scale by `factor`
#[inline]
fn bounce(velocity: Vec3, normal: Vec3, factor: f32) -> Vec3 {
    let v = if velocity.dot(normal) < 0.0 {
        reflect_velocity(velocity, normal)
    } else {
        velocity
    };
    v * factor
}

/// Push out of the most-violated plane of a set
fn plane_contact(
    planes: &[PlaneBarrier],
    ball: &BallState,
    restitution: f32,
) -> Option<Contact> {
    let r = ball.radius;
    let (plane, depth) = planes
        .iter()
        .map(|p| (p, r - p.distance(ball.position)))
        .filter(|(_, depth)| *depth > 0.0)
        .max_by(|a, b| a.1.total_cmp(&b.1))?;
    Some(Contact {
        position: ball.position + plane.normal * depth,
        velocity: bounce(ball.velocity, plane.normal, restitution),
        normal: plane.normal,
    })
}

fn oriented_box_contact(
    wall: &OrientedWall,
    ball: &BallState,
    restitution: f32,
) -> Option<Contact> {
    if !wall.is_valid() {
        return None;
    }
    let r = ball.radius;
    let local = wall.to_local(ball.position);
    if local.y < -r || local.y > wall.height + r {
        return None;
    }
    let half = wall.half_extents() + glam::Vec2::splat(r);
    if local.x.abs() >= half.x || local.z.abs() >= half.y {
        return None;
    }
    // Least-penetration axis
    let pen_x = half.x - local.x.abs();
    let pen_z = half.y - local.z.abs();
    let (local_normal, depth) = if pen_x < pen_z {
        (Vec3::new(local.x.signum(), 0.0, 0.0), pen_x)
    } else {
        (Vec3::new(0.0, 0.0, local.z.signum()), pen_z)
    };
    let normal = wall.to_world_dir(local_normal);
    Some(Contact {
        position: ball.position + normal * depth,
        velocity: bounce(ball.velocity, normal, restitution),
        normal,
    })
}

/// Earliest entry of segment `p0 → p1` into `b` through a vertical face or the top
fn segment_entry(p0: Vec3, p1: Vec3, b: &Aabb) -> Option<(f32, Vec3)> {
    let d = p1 - p0;
    let mut best: Option<(f32, Vec3)> = None;
    let mut consider = |t: f32, normal: Vec3| {
        if !(0.0..=1.0).contains(&t) {
            return;
        }
        let q = p0 + d * t;
        // Crossing point must lie on the face (ignore the face's own axis)
        let on_face = (normal.x != 0.0 || (q.x >= b.min.x && q.x <= b.max.x))
            && (normal.y != 0.0 || (q.y >= b.min.y && q.y <= b.max.y))
            && (normal.z != 0.0 || (q.z >= b.min.z && q.z <= b.max.z));
        if on_face && best.is_none_or(|(bt, _)| t < bt) {
            best = Some((t, normal));
        }
    };

    if p0.x <= b.min.x && p1.x > b.min.x {
        consider((b.min.x - p0.x) / d.x, Vec3::NEG_X);
    }
    if p0.x >= b.max.x && p1.x < b.max.x {
        consider((b.max.x - p0.x) / d.x, Vec3::X);
    }
    if p0.z <= b.min.z && p1.z > b.min.z {
        consider((b.min.z - p0.z) / d.z, Vec3::NEG_Z);
    }
    if p0.z >= b.max.z && p1.z < b.max.z {
        consider((b.max.z - p0.z) / d.z, Vec3::Z);
    }
    if p0.y >= b.max.y && p1.y < b.max.y {
        consider((b.max.y - p0.y) / d.y, Vec3::Y);
    }
    best
}

/// Nearest face of `b` to an interior point, as (normal, face coordinate along it)
fn nearest_face(p: Vec3, b: &Aabb) -> (Vec3, Vec3) {
    let faces = [
        (p.x - b.min.x, Vec3::NEG_X, Vec3::new(b.min.x, p.y, p.z)),
        (b.max.x - p.x, Vec3::X, Vec3::new(b.max.x, p.y, p.z)),
        (p.z - b.min.z, Vec3::NEG_Z, Vec3::new(p.x, p.y, b.min.z)),
        (b.max.z - p.z, Vec3::Z, Vec3::new(p.x, p.y, b.max.z)),
        (b.max.y - p.y, Vec3::Y, Vec3::new(p.x, b.max.y, p.z)),
    ];
    let (_, normal, point) = faces
        .into_iter()
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .unwrap_or((0.0, Vec3::Y, p));
    (normal, point)
}

fn swept_boxes_contact(
    walls: &[CustomWall],
    ball: &BallState,
    restitution: f32,
) -> Option<Contact> {
    let r = ball.radius;
    let p0 = ball.prev_position;
    let p1 = ball.position;
    let boxes = || walls.iter().filter_map(CustomWall::valid_bounds).map(|b| b.expanded(r));

    // Swept: earliest crossing among walls the ball started outside of
    let crossing = boxes()
        .filter(|b| !b.contains(p0))
        .filter_map(|b| segment_entry(p0, p1, &b))
        .min_by(|a, b| a.0.total_cmp(&b.0));
    if let Some((t, normal)) = crossing {
        return Some(Contact {
            position: p0 + (p1 - p0) * t + normal * SWEEP_EPSILON,
            velocity: bounce(ball.velocity, normal, restitution),
            normal,
        });
    }

    // Overlap: push toward the nearest face of the first wall found
    let b = boxes().find(|b| b.contains(p1))?;
    let (normal, face_point) = nearest_face(p1, &b);
    Some(Contact {
        position: face_point + normal * SWEEP_EPSILON,
        velocity: bounce(ball.velocity, normal, restitution),
        normal,
    })
}

fn annulus_contact(bumper: &Bumper, ball: &BallState, gain: f32) -> Option<Contact> {
    if !bumper.is_valid() {
        return None;
    }
    let r = ball.radius;
    let p = ball.position;
    if p.y < bumper.center.y - r || p.y > bumper.center.y + bumper.height() + r {
        return None;
    }
    let offset = horizontal(p - bumper.center);
    let dist = offset.length();
    let outer = bumper.outer_radius + r;
    let inner = (bumper.inner_radius() - r).max(0.0);
    if dist >= outer || dist < inner {
        return None;
    }
    // Push out through the nearer edge of the band: a ball coming from the
    // ring's open middle goes back inward
    let centerline = bumper.outer_radius - bumper.tube_radius;
    let (normal, position) = if dist <= 1e-5 {
        // Dead centre: push back along the incoming path
        let back = horizontal(-ball.velocity).try_normalize().unwrap_or(Vec3::X);
        (back, bumper.center + back * outer)
    } else if inner > 0.0 && dist < centerline {
        let radial = offset / dist;
        let edge = (inner - SWEEP_EPSILON).max(0.0);
        (-radial, bumper.center + radial * edge)
    } else {
        let radial = offset / dist;
        (radial, bumper.center + radial * outer)
    };
    let position = Vec3::new(position.x, p.y, position.z);
    Some(Contact {
        position,
        velocity: bounce(ball.velocity, normal, gain),
        normal,
    })
}

fn hazard_contact(
    hazard: &Hazard,
    planes: &[PlaneBarrier; 4],
    depth: f32,
    ball: &BallState,
    course: &CourseGeometry,
    restitution: f32,
) -> Option<Contact> {
    if !hazard.is_valid()
        || ball.position.y >= course.ground_y - depth
        || !hazard.footprint_contains(ball.position, ball.radius)
    {
        return None;
    }
    plane_contact(planes, ball, restitution)
}

impl<'a> Collider<'a> {
    pub fn kind(&self) -> ColliderKind {
        match self {
            Collider::Perimeter(_) => ColliderKind::Perimeter,
            Collider::OrientedBox(_) => ColliderKind::OrientedBox,
            Collider::SweptBoxes(_) => ColliderKind::SweptBox,
            Collider::Annulus(_) => ColliderKind::Annulus,
            Collider::InsetBarrier(_) => ColliderKind::InsetBarrier,
            Collider::ContainmentWall(_) => ColliderKind::ContainmentWall,
        }
    }

    /// Contact for this obstacle, if the ball currently violates it
    pub fn contact(
        &self,
        ball: &BallState,
        course: &CourseGeometry,
        profile: &MotionProfile,
    ) -> Option<Contact> {
        let bounce = profile.wall_bounce;
        match self {
            Collider::Perimeter(bounds) => plane_contact(&bounds.planes(), ball, bounce),
            Collider::OrientedBox(wall) => oriented_box_contact(wall, ball, bounce),
            Collider::SweptBoxes(walls) => swept_boxes_contact(walls, ball, bounce),
            Collider::Annulus(bumper) => annulus_contact(bumper, ball, profile.bumper_gain),
            Collider::InsetBarrier(h) => {
                hazard_contact(h, &h.edge_barriers(), HAZARD_EDGE_DEPTH, ball, course, bounce)
            }
            Collider::ContainmentWall(h) => hazard_contact(
                h,
                &h.containment_walls(),
                HAZARD_CONTAIN_DEPTH,
                ball,
                course,
                bounce,
            ),
        }
    }
}

/// Every collider of a course in resolution order
pub fn colliders(course: &CourseGeometry) -> impl Iterator<Item = Collider<'_>> {
    let perimeter = (!course.custom_perimeter).then_some(Collider::Perimeter(&course.bounds));
    perimeter
        .into_iter()
        .chain(course.walls.iter().map(Collider::OrientedBox))
        .chain(std::iter::once(Collider::SweptBoxes(&course.custom_walls)))
        .chain(course.bumpers.iter().map(Collider::Annulus))
        .chain(course.hazards.iter().map(Collider::InsetBarrier))
        .chain(course.hazards.iter().map(Collider::ContainmentWall))
}

fn apply_contact(
    ball: &mut BallState,
    contact: Contact,
    kind: ColliderKind,
    sink: &mut impl ImpactSink,
) -> CollisionOutcome {
    sink.impact(Impact {
        position: contact.position,
        normal: contact.normal,
        intensity: ball.speed(),
        kind,
    });
    ball.position = contact.position;
    ball.velocity = contact.velocity;
    CollisionOutcome {
        position: contact.position,
        velocity: contact.velocity,
        normal: contact.normal,
        collided: true,
        kind: Some(kind),
    }
}

/// Resolve the single highest-priority penetration, if any
pub fn resolve(
    ball: &mut BallState,
    course: &CourseGeometry,
    profile: &MotionProfile,
    sink: &mut impl ImpactSink,
) -> CollisionOutcome {
    let hit = colliders(course)
        .find_map(|c| c.contact(ball, course, profile).map(|ct| (c.kind(), ct)));
    match hit {
        Some((kind, contact)) => apply_contact(ball, contact, kind, sink),
        None => CollisionOutcome::miss(ball),
    }
}

/// Resolve contact with a rotating fan blade at simulation time `time`.
///
/// Blades move, so the bounce is computed in the blade's frame and the
/// blade's surface velocity is added back afterwards.
pub fn resolve_blades(
    ball: &mut BallState,
    course: &CourseGeometry,
    time: f32,
    profile: &MotionProfile,
    sink: &mut impl ImpactSink,
) -> CollisionOutcome {
    let r = ball.radius;
    let p = horizontal(ball.position);
    for fan in course.fans.iter().filter(|f| f.is_valid()) {
        let reach = r + fan.blade_thickness * 0.5;
        for (hub, tip) in fan.blades(time) {
            let (hub, tip) = (horizontal(hub), horizontal(tip));
            let seg = tip - hub;
            let t = ((p - hub).dot(seg) / seg.length_squared()).clamp(0.0, 1.0);
            let closest = hub + seg * t;
            let offset = p - closest;
            let dist = offset.length();
            if dist >= reach || dist < 1e-6 {
                continue;
            }
            let normal = offset / dist;
            let rel = closest - hub;
            let blade_velocity = Vec3::new(-rel.z, 0.0, rel.x) * fan.angular_velocity;
            let relative = ball.velocity - blade_velocity;
            let contact = Contact {
                position: ball.position + normal * (reach - dist),
                velocity: bounce(relative, normal, profile.blade_damping) + blade_velocity,
                normal,
            };
            return apply_contact(ball, contact, ColliderKind::Blade, sink);
        }
    }
    CollisionOutcome::miss(ball)
}
