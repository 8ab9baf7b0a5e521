//! Putt Sim entry point
//!
//! Headless host: loads settings and a course (or uses the built-in demo
//! course), then lets the shot planner play the hole frame by frame.
//!
//! Usage: `putt-sim [--settings FILE] [--course FILE] [--max-strokes N]`

use std::error::Error;

use glam::Vec3;

use putt_sim::ai::{AgentPhase, ShotPlanner};
use putt_sim::consts::*;
use putt_sim::sim::{
    Aabb, Bumper, CourseGeometry, CustomWall, Fan, Hazard, HolePhase, HoleState, HoleTarget,
    Impact, ImpactSink, MagneticField, OrientedWall, PlayBounds, SimEvent, TickInput, WindZone,
    tick,
};
use putt_sim::{Settings, SettingsError};

/// Give up after this much simulated time per hole
const MAX_HOLE_SECONDS: f32 = 600.0;

#[derive(Debug, Default)]
struct Args {
    settings: Option<String>,
    course: Option<String>,
    max_strokes: Option<u32>,
}

fn parse_args() -> Result<Args, Box<dyn Error>> {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = || iter.next().ok_or_else(|| format!("missing value for {}", arg));
        match arg.as_str() {
            "--settings" => args.settings = Some(value()?),
            "--course" => args.course = Some(value()?),
            "--max-strokes" => args.max_strokes = Some(value()?.parse()?),
            other => return Err(format!("unknown argument: {}", other).into()),
        }
    }
    Ok(args)
}

fn load_course(path: &str) -> Result<CourseGeometry, SettingsError> {
    let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_string(),
        source,
    })?;
    CourseGeometry::from_json(&json)
}

/// One of everything: walls, a box, a bumper, a pit, a fan, wind and a field
fn demo_course() -> CourseGeometry {
    let mut course = CourseGeometry::open(
        PlayBounds::new(-10.0, 10.0, -25.0, 25.0),
        Vec3::new(0.0, BALL_RADIUS, 20.0),
        HoleTarget {
            position: Vec3::new(0.0, 0.0, -20.0),
            capture_radius: 1.0,
        },
    );
    course.walls.push(OrientedWall {
        center: Vec3::new(-4.0, 0.0, 6.0),
        yaw: 0.4,
        width: 8.0,
        length: 0.5,
        height: 1.0,
    });
    course.custom_walls.push(CustomWall::new(
        Vec3::new(3.0, 0.0, -5.0),
        Vec3::new(8.0, 1.0, -4.5),
    ));
    course.bumpers.push(Bumper {
        center: Vec3::new(4.0, 0.0, 10.0),
        outer_radius: 1.5,
        tube_radius: 0.3,
    });
    course.hazards.push(Hazard {
        center: Vec3::new(-5.0, 0.0, -8.0),
        width: 4.0,
        length: 4.0,
    });
    course.fans.push(Fan {
        center: Vec3::new(7.0, 0.0, -12.0),
        facing: std::f32::consts::PI,
        blade_count: 3,
        blade_length: 1.2,
        blade_thickness: 0.2,
        phase: 0.0,
        angular_velocity: 2.0,
        push_strength: 6.0,
        push_range: 5.0,
        push_spread: 0.5,
    });
    course.wind_zones.push(WindZone {
        region: Aabb::new(Vec3::new(-10.0, -1.0, -2.0), Vec3::new(10.0, 3.0, 2.0)),
        acceleration: Vec3::new(1.5, 0.0, 0.0),
    });
    course.fields.push(MagneticField {
        center: Vec3::new(0.0, 0.0, -15.0),
        range: 3.0,
        strength: 5.0,
    });
    course
}

/// Tallies impacts for the end-of-hole summary
#[derive(Debug, Default)]
struct ImpactTally {
    count: u32,
    hardest: f32,
}

impl ImpactSink for ImpactTally {
    fn impact(&mut self, impact: Impact) {
        log::trace!("Impact {:?} at {:?} ({:.1})", impact.kind, impact.position, impact.intensity);
        self.count += 1;
        self.hardest = self.hardest.max(impact.intensity);
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    log::info!("Putt Sim starting...");

    let args = parse_args()?;
    let settings = match &args.settings {
        Some(path) => Settings::load(path)?,
        None => {
            log::info!("No settings file given, using defaults");
            Settings::default()
        }
    };
    let course = match &args.course {
        Some(path) => load_course(path)?,
        None => {
            log::info!("No course file given, using the demo course");
            demo_course()
        }
    };
    let skipped = course.validate();
    if skipped > 0 {
        log::warn!("{} malformed obstacles will be ignored", skipped);
    }
    let max_strokes = args.max_strokes.unwrap_or(12);

    let mut hole = HoleState::new(&course);
    let mut planner = ShotPlanner::new(&settings.planner);
    let mut impacts = ImpactTally::default();
    let mut strokes = 0u32;
    let max_frames = (MAX_HOLE_SECONDS / REFERENCE_DT) as u32;

    for _ in 0..max_frames {
        let shot = planner.update(&hole, &course, &settings, REFERENCE_DT);
        if let Some(shot) = &shot {
            strokes += 1;
            log::info!(
                "Stroke {}: bearing {:.1}°, power {:.2} ({:?})",
                strokes,
                shot.bearing().to_degrees(),
                shot.power,
                planner.last_source()
            );
        }

        let input = TickInput { shot };
        let events = tick(
            &mut hole,
            &course,
            &input,
            &settings,
            REFERENCE_DT,
            &mut impacts,
        );
        for event in &events {
            planner.observe(event);
            match event {
                SimEvent::Rested { position } => log::info!("Ball at rest at {:?}", position),
                SimEvent::Sank { .. } => {}
                SimEvent::LeftBounds { penalty_strokes, .. }
                | SimEvent::EnteredHazard { penalty_strokes, .. } => strokes += penalty_strokes,
            }
        }

        if planner.phase() == AgentPhase::Finished {
            break;
        }
        if strokes >= max_strokes && hole.phase == HolePhase::Aiming {
            log::warn!("Stroke limit reached");
            break;
        }
    }

    let result = if hole.phase == HolePhase::Sunk {
        "sunk"
    } else {
        "not sunk"
    };
    println!(
        "Hole {} in {} strokes after {:.1}s ({} impacts, hardest {:.1})",
        result, strokes, hole.time, impacts.count, impacts.hardest
    );
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // No headless host on the web
}
