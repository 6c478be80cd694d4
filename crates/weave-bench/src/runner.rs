//! Benchmark runner: steps scenarios and collects metrics.
//!
//! The integrator is a bare Verlet step with gravity and no cloth
//! constraints. It only exists to feed the collision pipeline moving
//! particles.

use std::time::Instant;

use glam::Vec3;
use tracing::{debug, info};
use weave_collision::{ClothCollider, CollisionStats, ParticleBuffers};
use weave_telemetry::{CollisionEvent, EventBus, EventKind};
use weave_types::{ClothId, WeaveResult};

use crate::metrics::BenchmarkMetrics;
use crate::scenarios::{Scenario, ScenarioKind};

/// Velocity retained per substep.
const DAMPING: f32 = 0.995;

/// Advances every movable particle by one Verlet step.
///
/// The previous buffer keeps its `w`, which holds the unscaled inverse
/// mass between substeps.
pub fn verlet_step(particles: &mut ParticleBuffers, displacement: Vec3) {
    let (current, previous) = particles.split_mut();
    for (cur, prev) in current.iter_mut().zip(previous.iter_mut()) {
        if cur.w <= 0.0 {
            continue;
        }
        let pos = cur.truncate();
        let next = pos + (pos - prev.truncate()) * DAMPING + displacement;
        *prev = pos.extend(prev.w);
        *cur = next.extend(cur.w);
    }
}

fn emit_substep(bus: &EventBus, frame: u32, cloth: ClothId, stats: &CollisionStats) {
    let kind = if stats.grid_built {
        EventKind::GridBuilt {
            cloth,
            occupied_words: stats.occupied_words as u32,
        }
    } else {
        EventKind::GridSkipped { cloth }
    };
    bus.emit(CollisionEvent::new(frame, kind));
    bus.emit(CollisionEvent::new(
        frame,
        EventKind::ContactsResolved {
            cloth,
            convex: stats.convex_contacts as u32,
            triangle: stats.triangle_contacts as u32,
            capsule: stats.capsule_contacts as u32,
            virtual_particles: stats.virtual_contacts as u32,
        },
    ));
}

/// Runs benchmark scenarios and collects metrics.
pub struct BenchmarkRunner;

impl BenchmarkRunner {
    /// Runs a scenario, returning its metrics.
    pub fn run(scenario: &Scenario, bus: &EventBus) -> WeaveResult<BenchmarkMetrics> {
        Self::simulate(scenario, bus).map(|(metrics, _)| metrics)
    }

    /// Runs a scenario, returning its metrics and the final particle state.
    pub fn simulate(scenario: &Scenario, bus: &EventBus) -> WeaveResult<(BenchmarkMetrics, ParticleBuffers)> {
        let cloth = ClothId(0);
        let mut collider = ClothCollider::new(cloth, scenario.config, scenario.shapes.clone())?;
        if let Some(virtual_particles) = &scenario.virtual_particles {
            collider = collider.with_virtual_particles(virtual_particles.clone());
        }

        let mut particles = scenario.particles.clone();
        let substeps = scenario.substeps.max(1);
        let sub_dt = scenario.dt / substeps as f32;
        let displacement = scenario.gravity * sub_dt * sub_dt;

        let mut frame_times = Vec::with_capacity(scenario.frames as usize);
        let mut totals = BenchmarkTotals::default();
        let total_start = Instant::now();

        for frame in 0..scenario.frames {
            let frame_start = Instant::now();
            if let Some(sweep) = &scenario.sweep {
                collider
                    .shapes_mut()
                    .advance_spheres(sweep.targets(frame, scenario.frames))?;
            }
            collider.begin_frame();

            for substep in 0..substeps {
                let alpha = (substep + 1) as f32 / substeps as f32;
                verlet_step(&mut particles, displacement);
                bus.emit(CollisionEvent::new(frame, EventKind::SubstepBegin { cloth, alpha }));
                let stats = collider.collide(&mut particles, alpha)?;
                emit_substep(bus, frame, cloth, &stats);
                totals.add(&stats);
            }

            let elapsed = frame_start.elapsed().as_secs_f64();
            frame_times.push(elapsed);
            bus.emit(CollisionEvent::new(
                frame,
                EventKind::FrameCompleted {
                    wall_time_ms: elapsed * 1000.0,
                },
            ));
            debug!(scenario = scenario.kind.name(), frame, "frame done");
        }

        let total_wall_time = total_start.elapsed().as_secs_f64();

        let max_displacement = particles
            .current()
            .iter()
            .zip(scenario.particles.current())
            .map(|(now, start)| now.truncate().distance(start.truncate()))
            .fold(0.0f32, f32::max);
        let min_height = particles
            .current()
            .iter()
            .map(|p| p.y)
            .fold(f32::INFINITY, f32::min);

        let avg_frame_time = if frame_times.is_empty() {
            0.0
        } else {
            frame_times.iter().sum::<f64>() / frame_times.len() as f64
        };
        let min_frame_time = frame_times.iter().copied().fold(f64::INFINITY, f64::min);
        let max_frame_time = frame_times.iter().copied().fold(0.0, f64::max);

        let metrics = BenchmarkMetrics {
            scenario: scenario.kind.name().to_string(),
            particle_count: scenario.particle_count(),
            frames: scenario.frames,
            substeps,
            total_wall_time,
            avg_frame_time,
            min_frame_time: if frame_times.is_empty() { 0.0 } else { min_frame_time },
            max_frame_time,
            convex_contacts: totals.convex,
            triangle_contacts: totals.triangle,
            capsule_contacts: totals.capsule,
            virtual_contacts: totals.virtual_particles,
            grid_skips: totals.grid_skips,
            max_displacement,
            min_height,
        };
        info!(
            scenario = %metrics.scenario,
            contacts = metrics.total_contacts(),
            wall_time_s = metrics.total_wall_time,
            "scenario complete"
        );
        Ok((metrics, particles))
    }

    /// Runs every scenario kind with its default setup.
    pub fn run_all(bus: &EventBus) -> WeaveResult<Vec<BenchmarkMetrics>> {
        ScenarioKind::all()
            .iter()
            .map(|&kind| Self::run(&Scenario::from_kind(kind)?, bus))
            .collect()
    }
}

#[derive(Debug, Default)]
struct BenchmarkTotals {
    convex: u64,
    triangle: u64,
    capsule: u64,
    virtual_particles: u64,
    grid_skips: u32,
}

impl BenchmarkTotals {
    fn add(&mut self, stats: &CollisionStats) {
        self.convex += stats.convex_contacts as u64;
        self.triangle += stats.triangle_contacts as u64;
        self.capsule += stats.capsule_contacts as u64;
        self.virtual_particles += stats.virtual_contacts as u64;
        if !stats.grid_built {
            self.grid_skips += 1;
        }
    }
}
