//! Integration tests for weave-collision.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use glam::{Vec3, Vec4};
use weave_collision::capsule::{CapsuleCollider, CapsuleFrame, Cone, Sphere, TimeOfImpact};
use weave_collision::convex::collide_convexes;
use weave_collision::interpolate::interpolate_spheres;
use weave_collision::triangle::collide_triangles;
use weave_collision::{
    collide_cloths, BroadPhase, ClothCollider, CollisionConfig, CollisionShapes,
    ExhaustiveBroadPhase, ImpulseAccumulator, ParticleBuffers, Plane, ResponseAggregator,
    ShapeBits, SpatialGrid, Triangle, VirtualParticles,
};
use weave_math::Bounds3;
use weave_types::constants::{EPSILON, MAX_SHAPES};
use weave_types::{ClothId, WeaveError};

fn particle(x: f32, y: f32, z: f32) -> Vec4 {
    Vec4::new(x, y, z, 1.0)
}

fn run_substep(
    shapes: CollisionShapes,
    config: CollisionConfig,
    particles: &mut ParticleBuffers,
) -> weave_collision::CollisionStats {
    let mut collider = ClothCollider::new(ClothId(0), config, shapes).unwrap();
    collider.begin_frame();
    collider.collide(particles, 1.0).unwrap()
}

fn unit_sphere_at(center: Vec3) -> CollisionShapes {
    CollisionShapes::new()
        .with_static_spheres(vec![center.extend(1.0)])
        .unwrap()
}

fn cylinder() -> CollisionShapes {
    CollisionShapes::new()
        .with_static_spheres(vec![Vec4::new(-1.0, 0.0, 0.0, 0.5), Vec4::new(1.0, 0.0, 0.0, 0.5)])
        .unwrap()
        .with_capsules(vec![[0, 1]])
        .unwrap()
}

/// Unit box centred at the origin, planes facing outwards.
fn unit_box_planes() -> Vec<Vec4> {
    vec![
        Vec4::new(1.0, 0.0, 0.0, -1.0),
        Vec4::new(-1.0, 0.0, 0.0, -1.0),
        Vec4::new(0.0, 1.0, 0.0, -1.0),
        Vec4::new(0.0, -1.0, 0.0, -1.0),
        Vec4::new(0.0, 0.0, 1.0, -1.0),
        Vec4::new(0.0, 0.0, -1.0, -1.0),
    ]
}

/// Two triangles covering `[-5, 5]²` at height `y`, normal `+y`.
fn floor_vertices(y: f32) -> Vec<Vec3> {
    vec![
        Vec3::new(-5.0, y, -5.0),
        Vec3::new(-5.0, y, 5.0),
        Vec3::new(5.0, y, -5.0),
        Vec3::new(5.0, y, 5.0),
        Vec3::new(5.0, y, -5.0),
        Vec3::new(-5.0, y, 5.0),
    ]
}

fn frame(spheres: &[Vec4], capsules: &[[u32; 2]]) -> CapsuleFrame {
    let shapes = CollisionShapes::new()
        .with_static_spheres(spheres.to_vec())
        .unwrap()
        .with_capsules(capsules.to_vec())
        .unwrap();
    shapes.capsules_at(0.0)
}

fn chain() -> CapsuleFrame {
    frame(
        &[
            Vec4::new(-1.0, 0.0, 0.0, 0.5),
            Vec4::new(0.0, 0.5, 0.0, 0.3),
            Vec4::new(1.0, 0.0, 0.2, 0.6),
            Vec4::new(2.0, 1.0, 0.0, 0.4),
        ],
        &[[0, 1], [1, 2], [2, 3]],
    )
}

/// Points on a sphere of the given radius, spread by the golden angle.
fn sphere_points(center: Vec3, radius: f32, n: usize) -> Vec<Vec3> {
    let golden = std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
    (0..n)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f32 + 0.5) / n as f32;
            let r = (1.0 - y * y).sqrt();
            let theta = golden * i as f32;
            center + Vec3::new(r * theta.cos(), y, r * theta.sin()) * radius
        })
        .collect()
}

// ─── Mask Tests ───────────────────────────────────────────────

#[test]
fn bits_iterate_ascending() {
    let bits = ShapeBits(0b1010_0001);
    assert_eq!(bits.iter().collect::<Vec<_>>(), vec![0, 5, 7]);
    assert_eq!(bits.count(), 3);
    assert!(bits.contains(5));
    assert!(!bits.contains(6));
}

#[test]
fn low_bits_cover_full_width() {
    assert_eq!(ShapeBits::low(0), ShapeBits::EMPTY);
    assert_eq!(ShapeBits::low(3), ShapeBits(0b111));
    assert_eq!(ShapeBits::low(MAX_SHAPES), ShapeBits::ALL);
    assert!(ShapeBits::bit(MAX_SHAPES).is_empty());
}

#[test]
fn bits_collect_from_indices() {
    let bits: ShapeBits = [1usize, 4, 31].into_iter().collect();
    assert_eq!(bits.0, (1 << 1) | (1 << 4) | (1 << 31));
}

// ─── Config Tests ─────────────────────────────────────────────

#[test]
fn default_config_disables_extras() {
    let config = CollisionConfig::default();
    assert!(!config.continuous_collision);
    assert!(!config.friction_enabled());
    assert!(!config.mass_scale_enabled());
    assert!(!config.needs_previous_shapes());
}

#[test]
fn friction_needs_previous_shapes() {
    assert!(CollisionConfig::default().with_friction(0.3).needs_previous_shapes());
    assert!(CollisionConfig::continuous().needs_previous_shapes());
}

#[test]
fn config_toml_roundtrip() {
    let config = CollisionConfig::high_quality();
    let text = toml::to_string(&config).unwrap();
    let restored: CollisionConfig = toml::from_str(&text).unwrap();
    assert_eq!(config, restored);
}

#[test]
fn config_json_roundtrip() {
    let config = CollisionConfig::continuous().with_mass_scale(2.0);
    let json = serde_json::to_string(&config).unwrap();
    let restored: CollisionConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(config, restored);
}

#[test]
fn config_rejects_negative_and_nan() {
    assert!(CollisionConfig::default().with_friction(-0.1).validate().is_err());
    assert!(CollisionConfig::default().with_mass_scale(f32::NAN).validate().is_err());
    assert!(CollisionConfig::high_quality().validate().is_ok());
}

#[test]
fn collider_rejects_invalid_config() {
    let result = ClothCollider::new(
        ClothId(1),
        CollisionConfig::default().with_friction(-1.0),
        CollisionShapes::new(),
    );
    assert!(matches!(result, Err(WeaveError::InvalidConfig(_))));
}

// ─── Shape Tests ──────────────────────────────────────────────

#[test]
fn too_many_spheres_rejected() {
    let spheres = vec![Vec4::new(0.0, 0.0, 0.0, 1.0); MAX_SHAPES + 1];
    let err = CollisionShapes::new().with_static_spheres(spheres).unwrap_err();
    assert!(matches!(err, WeaveError::CapacityExceeded { count: 33, .. }));
}

#[test]
fn full_width_sphere_set_accepted() {
    let spheres = vec![Vec4::new(0.0, 0.0, 0.0, 1.0); MAX_SHAPES];
    assert!(CollisionShapes::new().with_static_spheres(spheres).is_ok());
}

#[test]
fn capsule_must_reference_existing_spheres() {
    let shapes = unit_sphere_at(Vec3::ZERO);
    assert!(matches!(
        shapes.clone().with_capsules(vec![[0, 1]]),
        Err(WeaveError::InvalidShape(_))
    ));
    assert!(shapes.with_capsules(vec![[0, 0]]).is_err());
}

#[test]
fn shrinking_spheres_under_capsules_rejected() {
    let mut shapes = cylinder();
    let one = vec![Vec4::new(0.0, 0.0, 0.0, 1.0)];
    assert!(shapes.set_spheres(one.clone(), one).is_err());
    assert_eq!(shapes.sphere_count(), 2);
}

#[test]
fn convex_mask_must_reference_existing_planes() {
    let shapes = CollisionShapes::new()
        .with_static_planes(unit_box_planes())
        .unwrap();
    assert!(shapes.clone().with_convexes(vec![0b11_1111]).is_ok());
    assert!(shapes.clone().with_convexes(vec![0b111_1111]).is_err());
    assert!(shapes.with_convexes(vec![0]).is_err());
}

#[test]
fn triangle_vertices_come_in_threes() {
    let verts = vec![Vec3::ZERO; 4];
    assert!(CollisionShapes::new().with_static_triangles(verts).is_err());
    let shapes = CollisionShapes::new()
        .with_static_triangles(floor_vertices(0.0))
        .unwrap();
    assert_eq!(shapes.triangle_count(), 2);
}

#[test]
fn advance_spheres_shifts_keyframes() {
    let mut shapes = CollisionShapes::new()
        .with_spheres(
            vec![Vec4::new(0.0, 0.0, 0.0, 1.0)],
            vec![Vec4::new(1.0, 0.0, 0.0, 1.0)],
        )
        .unwrap();
    shapes
        .advance_spheres(vec![Vec4::new(2.0, 0.0, 0.0, 1.0)])
        .unwrap();
    assert_eq!(shapes.start_spheres()[0].x, 1.0);
    assert_eq!(shapes.target_spheres()[0].x, 2.0);
    assert!(shapes.advance_spheres(Vec::new()).is_err());
}

#[test]
fn shapes_serialization_roundtrip() {
    let shapes = cylinder()
        .with_static_planes(unit_box_planes())
        .unwrap()
        .with_convexes(vec![0b11_1111])
        .unwrap();
    let json = serde_json::to_string(&shapes).unwrap();
    let restored: CollisionShapes = serde_json::from_str(&json).unwrap();
    assert_eq!(shapes, restored);
}

// ─── Interpolation Tests ──────────────────────────────────────

#[test]
fn sphere_interpolation_is_linear() {
    let spheres = interpolate_spheres(
        &[Vec4::new(0.0, 0.0, 0.0, 1.0)],
        &[Vec4::new(2.0, 4.0, 0.0, 3.0)],
        0.25,
    );
    assert_relative_eq!(spheres[0].center.x, 0.5);
    assert_relative_eq!(spheres[0].center.y, 1.0);
    assert_relative_eq!(spheres[0].radius, 1.5);
}

#[test]
fn interpolated_radius_never_negative() {
    let spheres = interpolate_spheres(
        &[Vec4::new(0.0, 0.0, 0.0, 1.0)],
        &[Vec4::new(2.0, 0.0, 0.0, -3.0)],
        0.5,
    );
    assert_eq!(spheres[0].radius, 0.0);
}

#[test]
fn planes_and_triangles_interpolate() {
    let shapes = CollisionShapes::new()
        .with_planes(
            vec![Vec4::new(0.0, 1.0, 0.0, 0.0)],
            vec![Vec4::new(0.0, 1.0, 0.0, -2.0)],
        )
        .unwrap()
        .with_triangles(floor_vertices(0.0), floor_vertices(2.0))
        .unwrap();
    let planes = shapes.planes_at(0.5);
    assert_relative_eq!(planes[0].offset, -1.0);
    let triangles = shapes.triangles_at(0.5);
    assert_relative_eq!(triangles[0].base.y, 1.0);
    assert_relative_eq!(triangles[1].normal.y, 1.0);
}

#[test]
fn cylinder_cone_geometry() {
    let cone = cylinder().capsules_at(0.0).cones[0];
    assert_relative_eq!(cone.radius, 0.5);
    assert_relative_eq!(cone.half_length, 1.0);
    assert_relative_eq!(cone.slope, 0.0);
    assert_relative_eq!(cone.sqr_cosine, 1.0);
    assert_relative_eq!(cone.axis.x, 1.0);
    assert_eq!(cone.both_mask, ShapeBits(0b11));
    assert_eq!(cone.second_mask(), ShapeBits(0b10));
}

#[test]
fn tapered_cone_narrows_towards_small_sphere() {
    let spheres = [
        Sphere::new(Vec3::new(-2.0, 0.0, 0.0), 1.0),
        Sphere::new(Vec3::new(2.0, 0.0, 0.0), 0.5),
    ];
    let cone = Cone::between(&spheres, 0, 1);
    assert!(cone.slope < 0.0);
    assert!(cone.sqr_cosine < 1.0);
    assert_relative_eq!(cone.half_length, 2.0);
    assert!(!cone.is_degenerate());
}

#[test]
fn contained_sphere_gives_degenerate_cone() {
    let spheres = [
        Sphere::new(Vec3::ZERO, 2.0),
        Sphere::new(Vec3::new(0.5, 0.0, 0.0), 0.5),
    ];
    let cone = Cone::between(&spheres, 0, 1);
    assert!(cone.is_degenerate());
    assert!(cone.axis.is_finite());
    assert!(cone.slope.is_finite());
}

// ─── Grid Tests ───────────────────────────────────────────────

#[test]
fn grid_empty_when_particles_out_of_reach() {
    let capsules = chain();
    let far = Bounds3::new(Vec3::splat(50.0), Vec3::splat(60.0));
    assert!(SpatialGrid::build(far, &capsules, None).is_none());
}

#[test]
fn grid_never_culls_sphere_surface_points() {
    let capsules = chain();
    let reach = capsules.bounds();
    let grid = SpatialGrid::build(reach, &capsules, None).unwrap();
    for (i, sphere) in capsules.spheres.iter().enumerate() {
        for p in sphere_points(sphere.center, sphere.radius, 64) {
            assert!(
                grid.point_mask(p).spheres.contains(i),
                "sphere {i} culled at {p:?}"
            );
        }
    }
}

#[test]
fn grid_never_culls_cone_surface_points() {
    let capsules = frame(
        &[Vec4::new(-1.0, 0.0, 0.0, 0.5), Vec4::new(1.0, 0.0, 0.0, 0.5)],
        &[[0, 1]],
    );
    let grid = SpatialGrid::build(capsules.bounds(), &capsules, None).unwrap();
    for k in 0..=20 {
        let x = -1.0 + k as f32 * 0.1;
        for a in 0..16 {
            let theta = a as f32 * std::f32::consts::TAU / 16.0;
            let p = Vec3::new(x, 0.5 * theta.cos(), 0.5 * theta.sin());
            assert!(grid.point_mask(p).cones.contains(0), "cone culled at {p:?}");
        }
    }
}

#[test]
fn grid_masks_only_live_shapes() {
    let capsules = chain();
    let grid = SpatialGrid::build(capsules.bounds(), &capsules, None).unwrap();
    assert!(grid.occupied_words() > 0);
    let live = capsules.live_mask();
    for p in sphere_points(Vec3::new(0.5, 0.5, 0.0), 1.5, 100) {
        let mask = grid.point_mask(p);
        assert!((mask.spheres & !live.spheres).is_empty());
        assert!((mask.cones & !live.cones).is_empty());
    }
}

#[test]
fn point_outside_grid_has_no_candidates() {
    let capsules = chain();
    let grid = SpatialGrid::build(capsules.bounds(), &capsules, None).unwrap();
    assert!(grid.point_mask(Vec3::new(100.0, 0.0, 0.0)).is_empty());
    assert!(grid.point_mask(Vec3::splat(f32::NAN)).is_empty());
}

#[test]
fn swept_mask_covers_both_endpoints() {
    let capsules = chain();
    let grid = SpatialGrid::build(capsules.bounds(), &capsules, None).unwrap();
    let points = sphere_points(Vec3::new(0.5, 0.4, 0.1), 1.2, 40);
    for pair in points.windows(2) {
        let swept = grid.swept_mask(pair[0], pair[1]);
        for p in pair {
            let point = grid.point_mask(*p);
            assert_eq!(point.spheres & !swept.spheres, ShapeBits::EMPTY);
            assert_eq!(point.cones & !swept.cones, ShapeBits::EMPTY);
        }
    }
}

#[test]
fn grid_matches_exhaustive_broad_phase() {
    let capsules = chain();
    let reach = Bounds3::new(Vec3::new(-2.0, -1.0, -1.0), Vec3::new(3.0, 2.0, 1.0));
    let grid = SpatialGrid::build(reach, &capsules, None).unwrap();
    let exhaustive = ExhaustiveBroadPhase::new(&capsules);
    let collider = CapsuleCollider::new(&capsules, None, false);

    let mut contacts = 0;
    for ix in 0..=20 {
        for iy in 0..=12 {
            for iz in 0..=8 {
                let p = Vec3::new(
                    -2.0 + ix as f32 * 0.25,
                    -1.0 + iy as f32 * 0.25,
                    -1.0 + iz as f32 * 0.25,
                );
                let culled = collider.collide(p, grid.point_mask(p));
                let full = collider.collide(p, exhaustive.point_mask(p));
                assert_eq!(culled.count, full.count, "at {p:?}");
                assert_abs_diff_eq!(culled.delta.x, full.delta.x, epsilon = 1e-6);
                assert_abs_diff_eq!(culled.delta.y, full.delta.y, epsilon = 1e-6);
                assert_abs_diff_eq!(culled.delta.z, full.delta.z, epsilon = 1e-6);
                contacts += full.count;
            }
        }
    }
    assert!(contacts > 0);
    assert_eq!(grid.name(), "spatial_grid");
    assert_eq!(exhaustive.name(), "exhaustive");
}

// ─── Capsule Narrow Phase Tests ───────────────────────────────

#[test]
fn sphere_pushes_particle_to_surface() {
    let mut particles = ParticleBuffers::at_rest(vec![particle(0.3, 0.2, -0.1)]);
    let stats = run_substep(
        unit_sphere_at(Vec3::ZERO),
        CollisionConfig::default(),
        &mut particles,
    );
    assert_eq!(stats.capsule_contacts, 1);
    assert!(stats.grid_built);
    let p = particles.current()[0].truncate();
    assert_relative_eq!(p.length(), 1.0, epsilon = 1e-5);
    // Pushed radially.
    assert_relative_eq!(p.normalize().x, Vec3::new(0.3, 0.2, -0.1).normalize().x, epsilon = 1e-5);
}

#[test]
fn cylinder_pushes_particle_radially() {
    let capsules = cylinder().capsules_at(0.0);
    let collider = CapsuleCollider::new(&capsules, None, false);
    let pos = Vec3::new(0.2, 0.1, 0.2);
    let contacts = collider.collide(pos, ExhaustiveBroadPhase::new(&capsules).point_mask(pos));

    // The cone covers the particle, so the end spheres are culled.
    assert_eq!(contacts.count, 1);
    let resolved = pos + contacts.average();
    assert_relative_eq!(resolved.x, 0.2, epsilon = 1e-5);
    assert_relative_eq!(Vec3::new(0.0, resolved.y, resolved.z).length(), 0.5, epsilon = 1e-5);
}

#[test]
fn tapered_cone_resolves_onto_surface() {
    let capsules = frame(
        &[Vec4::new(-2.0, 0.0, 0.0, 1.0), Vec4::new(2.0, 0.0, 0.0, 0.5)],
        &[[0, 1]],
    );
    let cone = capsules.cones[0];
    let collider = CapsuleCollider::new(&capsules, None, false);

    for pos in [Vec3::new(0.0, 0.3, 0.0), Vec3::new(-1.0, 0.1, -0.4), Vec3::new(1.2, 0.0, 0.2)] {
        let contacts = collider.collide(pos, ExhaustiveBroadPhase::new(&capsules).point_mask(pos));
        assert_eq!(contacts.count, 1);

        let offset = pos + contacts.average() - cone.center;
        let dot = offset.dot(cone.axis);
        let surface_radius = dot * cone.slope + cone.radius;
        let radial = (offset.length_squared() - dot * dot).sqrt();
        assert_relative_eq!(radial, surface_radius, epsilon = 1e-4);
    }
}

#[test]
fn end_sphere_handles_particles_beyond_cap() {
    let capsules = cylinder().capsules_at(0.0);
    let collider = CapsuleCollider::new(&capsules, None, false);
    let pos = Vec3::new(1.3, 0.1, 0.0);
    let contacts = collider.collide(pos, ExhaustiveBroadPhase::new(&capsules).point_mask(pos));

    assert_eq!(contacts.count, 1);
    let resolved = pos + contacts.average();
    assert_relative_eq!(resolved.distance(Vec3::new(1.0, 0.0, 0.0)), 0.5, epsilon = 1e-5);
}

#[test]
fn particle_outside_capsule_is_untouched() {
    let capsules = chain();
    let collider = CapsuleCollider::new(&capsules, None, false);
    let pos = Vec3::new(0.0, -2.0, 0.0);
    let contacts = collider.collide(pos, ExhaustiveBroadPhase::new(&capsules).point_mask(pos));
    assert!(contacts.is_empty());
}

#[test]
fn mask_bits_beyond_shapes_are_ignored() {
    let capsules = cylinder().capsules_at(0.0);
    let collider = CapsuleCollider::new(&capsules, None, false);
    let pos = Vec3::new(0.2, 0.1, 0.2);
    let all = collider.collide(pos, weave_collision::ShapeMask::ALL);
    assert_eq!(all.count, 1);
}

#[test]
fn shape_order_does_not_change_result() {
    let a = Vec4::new(0.0, 0.0, 0.0, 1.0);
    let b = Vec4::new(0.5, 0.0, 0.0, 1.0);
    let start = particle(0.25, 0.1, 0.0);

    let mut forward = ParticleBuffers::at_rest(vec![start]);
    let mut reversed = ParticleBuffers::at_rest(vec![start]);
    let config = CollisionConfig::default().with_mass_scale(0.5);

    run_substep(
        CollisionShapes::new().with_static_spheres(vec![a, b]).unwrap(),
        config,
        &mut forward,
    );
    let stats = run_substep(
        CollisionShapes::new().with_static_spheres(vec![b, a]).unwrap(),
        config,
        &mut reversed,
    );

    assert_eq!(stats.capsule_contacts, 1);
    assert_eq!(forward.current()[0], reversed.current()[0]);
}

#[test]
fn no_collision_leaves_particles_unchanged() {
    let start = vec![particle(5.0, 5.0, 5.0), particle(-3.0, 0.0, 0.0)];
    let mut particles = ParticleBuffers::at_rest(start.clone());
    let shapes = cylinder()
        .with_static_planes(unit_box_planes())
        .unwrap()
        .with_convexes(vec![0b11_1111])
        .unwrap()
        .with_static_triangles(floor_vertices(-10.0))
        .unwrap();
    let stats = run_substep(shapes, CollisionConfig::high_quality(), &mut particles);

    assert_eq!(stats.total_contacts(), 0);
    assert_eq!(particles.current(), start.as_slice());
    assert_eq!(particles.previous(), start.as_slice());
}

#[test]
fn pinned_particles_never_move() {
    let pinned = Vec4::new(0.1, 0.0, 0.0, 0.0);
    let mut particles = ParticleBuffers::at_rest(vec![pinned]);
    let stats = run_substep(
        unit_sphere_at(Vec3::ZERO),
        CollisionConfig::high_quality(),
        &mut particles,
    );
    assert_eq!(stats.capsule_contacts, 0);
    assert_eq!(particles.current()[0], pinned);
}

#[test]
fn degenerate_capsule_stays_finite() {
    let shapes = CollisionShapes::new()
        .with_static_spheres(vec![Vec4::new(0.0, 0.0, 0.0, 2.0), Vec4::new(0.5, 0.0, 0.0, 0.5)])
        .unwrap()
        .with_capsules(vec![[0, 1]])
        .unwrap();
    let mut particles = ParticleBuffers::at_rest(vec![particle(0.5, 0.0, 0.0), particle(0.0, 1.0, 0.0)]);
    run_substep(shapes, CollisionConfig::default(), &mut particles);
    assert!(particles.current().iter().all(|p| p.is_finite()));
    // Only the big sphere reaches the second particle.
    assert_relative_eq!(particles.current()[1].y, 2.0, epsilon = 1e-5);
}

#[test]
fn zero_radius_sphere_never_collides() {
    let shapes = CollisionShapes::new()
        .with_static_spheres(vec![Vec4::new(0.0, 0.0, 0.0, 0.0)])
        .unwrap();
    let mut particles = ParticleBuffers::at_rest(vec![particle(0.0, 0.0, 0.0)]);
    let stats = run_substep(shapes, CollisionConfig::default(), &mut particles);
    assert_eq!(stats.capsule_contacts, 0);
    assert!(particles.current()[0].is_finite());
}

#[test]
fn spheres_out_of_reach_skip_grid() {
    let mut particles = ParticleBuffers::at_rest(vec![particle(0.0, 0.0, 0.0)]);
    let stats = run_substep(
        unit_sphere_at(Vec3::new(10.0, 0.0, 0.0)),
        CollisionConfig::default(),
        &mut particles,
    );
    assert!(!stats.grid_built);
    assert_eq!(stats.occupied_words, 0);
}

// ─── Continuous Collision Tests ───────────────────────────────

#[test]
fn time_of_impact_for_particle_starting_on_surface() {
    // Particle path (0,0,0) → (0,-2,0) against a unit sphere at (0,-1,0).
    let prev = Vec3::new(0.0, 1.0, 0.0);
    let cur = Vec3::new(0.0, -1.0, 0.0);
    let impact = TimeOfImpact::solve(
        prev.length_squared() - 1.0,
        prev.dot(cur) - 1.0,
        EPSILON + cur.length_squared() - 1.0,
        1.0,
        1.0,
    )
    .unwrap();
    assert_abs_diff_eq!(impact.toi, 0.0, epsilon = 1e-6);
    assert!(impact.rewind_fraction() > 0.0 && impact.rewind_fraction() <= 1.0);
}

#[test]
fn time_of_impact_rejects_missed_paths() {
    // Path passes two radii away from the sphere center.
    let prev = Vec3::new(-3.0, 2.0, 0.0);
    let cur = Vec3::new(3.0, 2.0, 0.0);
    let impact = TimeOfImpact::solve(
        prev.length_squared() - 1.0,
        prev.dot(cur) - 1.0,
        EPSILON + cur.length_squared() - 1.0,
        1.0,
        1.0,
    );
    assert!(impact.is_none());
}

#[test]
fn continuous_collision_catches_tunneling_particle() {
    let start = particle(0.0, 0.0, 0.0);
    let end = particle(0.0, -2.0, 0.0);
    let center = Vec3::new(0.0, -1.0, 0.0);

    let mut particles = ParticleBuffers::new(vec![end], vec![start]).unwrap();
    let stats = run_substep(unit_sphere_at(center), CollisionConfig::continuous(), &mut particles);

    assert_eq!(stats.capsule_contacts, 1);
    let p = particles.current()[0].truncate();
    assert!(p.distance(center) >= 1.0 - 1e-4);
    // Resolved on the side the particle came from.
    assert_abs_diff_eq!(p.y, 0.0, epsilon = 1e-4);
}

#[test]
fn discrete_collision_misses_tunneling_particle() {
    let mut particles =
        ParticleBuffers::new(vec![particle(0.0, -2.0, 0.0)], vec![particle(0.0, 0.0, 0.0)]).unwrap();
    let stats = run_substep(
        unit_sphere_at(Vec3::new(0.0, -1.0, 0.0)),
        CollisionConfig::default(),
        &mut particles,
    );
    assert_eq!(stats.capsule_contacts, 0);
    assert_eq!(particles.current()[0].y, -2.0);
}

#[test]
fn continuous_matches_discrete_for_resting_particles() {
    let resting = vec![
        particle(0.2, 0.1, 0.2),
        particle(-0.5, -0.3, 0.1),
        particle(1.2, 0.1, 0.0),
        particle(0.0, 2.0, 0.0),
    ];
    let mut discrete = ParticleBuffers::at_rest(resting.clone());
    let mut continuous = ParticleBuffers::at_rest(resting);

    let a = run_substep(cylinder(), CollisionConfig::default(), &mut discrete);
    let b = run_substep(cylinder(), CollisionConfig::continuous(), &mut continuous);

    assert_eq!(a.capsule_contacts, b.capsule_contacts);
    for (d, c) in discrete.current().iter().zip(continuous.current()) {
        assert_abs_diff_eq!(d.x, c.x, epsilon = 1e-5);
        assert_abs_diff_eq!(d.y, c.y, epsilon = 1e-5);
        assert_abs_diff_eq!(d.z, c.z, epsilon = 1e-5);
    }
}

#[test]
fn moving_sphere_sweeps_resting_particle_along() {
    let shapes = CollisionShapes::new()
        .with_spheres(
            vec![Vec4::new(-3.0, 0.0, 0.0, 1.0)],
            vec![Vec4::new(3.0, 0.0, 0.0, 1.0)],
        )
        .unwrap();
    let mut particles = ParticleBuffers::at_rest(vec![particle(0.0, 0.0, 0.0)]);
    let stats = run_substep(shapes, CollisionConfig::continuous(), &mut particles);

    assert_eq!(stats.capsule_contacts, 1);
    let p = particles.current()[0].truncate();
    assert_relative_eq!(p.x, 4.0, epsilon = 1e-4);
}

#[test]
fn moving_cone_sweeps_resting_particle_along() {
    // A horizontal bar falls through a particle resting below its middle.
    let shapes = CollisionShapes::new()
        .with_spheres(
            vec![Vec4::new(-2.0, 2.0, 0.0, 0.5), Vec4::new(2.0, 2.0, 0.0, 0.5)],
            vec![Vec4::new(-2.0, -2.0, 0.0, 0.5), Vec4::new(2.0, -2.0, 0.0, 0.5)],
        )
        .unwrap()
        .with_capsules(vec![[0, 1]])
        .unwrap();
    let mut particles = ParticleBuffers::at_rest(vec![particle(0.0, 0.0, 0.0)]);

    let mut discrete = particles.clone();
    run_substep(shapes.clone(), CollisionConfig::default(), &mut discrete);
    assert_eq!(discrete.current()[0].y, 0.0, "the bar jumps over the particle");

    run_substep(shapes, CollisionConfig::continuous(), &mut particles);
    let p = particles.current()[0].truncate();
    // Carried below the bar, outside its radius.
    assert!(p.y <= -2.5 + 1e-3, "particle left at {p:?}");
}

// ─── Convex Tests ─────────────────────────────────────────────

#[test]
fn box_pushes_particle_through_nearest_face() {
    let planes: Vec<Plane> = unit_box_planes().into_iter().map(Plane::from_vec4).collect();
    let contacts = collide_convexes(&planes, &[ShapeBits(0b11_1111)], Vec3::new(0.9, 0.2, -0.3));
    assert_eq!(contacts.count, 1);
    assert_relative_eq!(contacts.delta.x, 0.1, epsilon = 1e-6);
    assert_eq!(contacts.delta.y, 0.0);
}

#[test]
fn outside_any_plane_means_outside_convex() {
    let planes: Vec<Plane> = unit_box_planes().into_iter().map(Plane::from_vec4).collect();
    let contacts = collide_convexes(&planes, &[ShapeBits(0b11_1111)], Vec3::new(1.5, 0.0, 0.0));
    assert!(contacts.is_empty());
}

#[test]
fn convex_pass_through_pipeline() {
    let shapes = CollisionShapes::new()
        .with_static_planes(unit_box_planes())
        .unwrap()
        .with_convexes(vec![0b11_1111])
        .unwrap();
    let mut particles = ParticleBuffers::at_rest(vec![particle(0.0, -0.8, 0.1), particle(3.0, 0.0, 0.0)]);
    let stats = run_substep(shapes, CollisionConfig::default(), &mut particles);

    assert_eq!(stats.convex_contacts, 1);
    assert!(!stats.grid_built);
    assert_relative_eq!(particles.current()[0].y, -1.0, epsilon = 1e-6);
    assert_eq!(particles.current()[1], particle(3.0, 0.0, 0.0));
}

#[test]
fn overlapping_convexes_average() {
    let planes: Vec<Plane> = vec![
        Plane::new(Vec3::Y, -1.0),
        Plane::new(Vec3::NEG_Y, -1.0),
        Plane::new(Vec3::X, -1.0),
        Plane::new(Vec3::NEG_X, -1.0),
    ];
    // Slab in y and slab in x.
    let contacts = collide_convexes(&planes, &[ShapeBits(0b0011), ShapeBits(0b1100)], Vec3::new(0.5, 0.8, 0.0));
    assert_eq!(contacts.count, 2);
    assert_relative_eq!(contacts.average().y, 0.1, epsilon = 1e-6);
    assert_relative_eq!(contacts.average().x, 0.25, epsilon = 1e-6);
}

// ─── Triangle Tests ───────────────────────────────────────────

#[test]
fn particle_below_floor_is_lifted() {
    let triangles: Vec<Triangle> = floor_vertices(0.0)
        .chunks_exact(3)
        .map(|t| Triangle::new(t[0], t[1], t[2]))
        .collect();
    let correction = collide_triangles(&triangles, Vec3::new(1.0, -0.05, 2.0)).unwrap();
    assert_relative_eq!(correction.y, 0.05, epsilon = 1e-6);
    assert!(collide_triangles(&triangles, Vec3::new(1.0, 0.3, 2.0)).is_none());
}

#[test]
fn nearest_triangle_wins() {
    let mut verts = floor_vertices(0.0);
    verts.extend(floor_vertices(-1.0));
    let shapes = CollisionShapes::new().with_static_triangles(verts).unwrap();
    let mut particles = ParticleBuffers::at_rest(vec![particle(0.5, -0.4, 0.5)]);
    let stats = run_substep(shapes, CollisionConfig::default(), &mut particles);

    assert_eq!(stats.triangle_contacts, 1);
    // Only the upper floor responds; no sum over both.
    assert_relative_eq!(particles.current()[0].y, 0.0, epsilon = 1e-6);
}

#[test]
fn degenerate_triangle_gives_no_response() {
    let tri = Triangle::new(Vec3::ZERO, Vec3::X, Vec3::X * 2.0);
    assert_eq!(tri.normal, Vec3::ZERO);
    assert!(collide_triangles(&[tri], Vec3::new(0.5, -0.1, 0.0)).is_none());
    assert!(tri.closest(Vec3::new(0.5, -0.1, 0.0)).sqr_distance.is_finite());
}

#[test]
fn triangle_closest_point_regions() {
    let tri = Triangle::new(Vec3::ZERO, Vec3::X, Vec3::Z);
    // Interior, in front of the plane (normal is -y for this winding).
    let front = tri.closest(Vec3::new(0.2, -0.5, 0.2));
    assert_relative_eq!(front.sqr_distance, 0.25, epsilon = 1e-6);
    assert_relative_eq!(front.normal_distance, 0.5, epsilon = 1e-6);
    // Behind the plane the distance is penalized.
    assert!(tri.closest(Vec3::new(0.2, 0.5, 0.2)).sqr_distance > 0.25);
    // Vertex region beyond p1.
    assert_relative_eq!(tri.closest(Vec3::new(2.0, 0.0, -1.0)).sqr_distance, 2.0, epsilon = 1e-5);
    // Hypotenuse region.
    assert_relative_eq!(tri.closest(Vec3::new(1.0, 0.0, 1.0)).sqr_distance, 0.5, epsilon = 1e-5);
}

// ─── Response Tests ───────────────────────────────────────────

#[test]
fn friction_slows_tangential_motion() {
    let prev = particle(-0.2, 0.95, 0.0);
    let cur = particle(0.0, 0.95, 0.0);

    let mut frictionless = ParticleBuffers::new(vec![cur], vec![prev]).unwrap();
    run_substep(unit_sphere_at(Vec3::ZERO), CollisionConfig::default(), &mut frictionless);
    let mut rough = ParticleBuffers::new(vec![cur], vec![prev]).unwrap();
    run_substep(
        unit_sphere_at(Vec3::ZERO),
        CollisionConfig::default().with_friction(1.0),
        &mut rough,
    );

    let slide = |p: &ParticleBuffers| p.current()[0].x - p.previous()[0].x;
    assert_relative_eq!(slide(&frictionless), 0.2, epsilon = 1e-6);
    assert_relative_eq!(slide(&rough), 0.15, epsilon = 1e-4);
    // Friction changes velocity, not the resolved position.
    assert_relative_eq!(frictionless.current()[0].y, rough.current()[0].y);
}

#[test]
fn friction_never_reverses_motion() {
    let prev = particle(-0.001, 0.5, 0.0);
    let cur = particle(0.0, 0.5, 0.0);
    let mut particles = ParticleBuffers::new(vec![cur], vec![prev]).unwrap();
    run_substep(
        unit_sphere_at(Vec3::ZERO),
        CollisionConfig::default().with_friction(100.0),
        &mut particles,
    );
    let slide = particles.current()[0].x - particles.previous()[0].x;
    assert!(slide >= -1e-6);
    assert!(slide <= 0.001 + 1e-6);
}

#[test]
fn friction_follows_moving_sphere() {
    // Halfway through the frame the sphere sits at the origin, having
    // moved +0.4 in x since the start keyframe.
    let shapes = CollisionShapes::new()
        .with_spheres(
            vec![Vec4::new(-0.4, 0.0, 0.0, 1.0)],
            vec![Vec4::new(0.4, 0.0, 0.0, 1.0)],
        )
        .unwrap();
    let mut collider =
        ClothCollider::new(ClothId(0), CollisionConfig::default().with_friction(1.0), shapes)
            .unwrap();
    let mut particles = ParticleBuffers::at_rest(vec![particle(0.0, 0.9, 0.0)]);

    collider.begin_frame();
    let stats = collider.collide(&mut particles, 0.5).unwrap();
    assert_eq!(stats.capsule_contacts, 1);

    let cur = particles.current()[0].truncate();
    let velocity = cur - particles.previous()[0].truncate();
    assert_relative_eq!(cur.y, 1.0, epsilon = 1e-5);
    // Dragged a quarter of the way along with the surface.
    assert_abs_diff_eq!(velocity.x, 0.1, epsilon = 1e-5);
    assert_abs_diff_eq!(velocity.y, 0.1, epsilon = 1e-5);
    assert_abs_diff_eq!(velocity.z, 0.0, epsilon = 1e-6);
}

#[test]
fn friction_follows_moving_cone() {
    // Only the second end of the cylinder moves (+0.4 in z over the
    // frame). A contact three quarters along the axis sees 3/4 of that
    // end's motion.
    let shapes = CollisionShapes::new()
        .with_spheres(
            vec![Vec4::new(-1.0, 0.0, 0.0, 0.5), Vec4::new(1.0, 0.0, -0.2, 0.5)],
            vec![Vec4::new(-1.0, 0.0, 0.0, 0.5), Vec4::new(1.0, 0.0, 0.2, 0.5)],
        )
        .unwrap()
        .with_capsules(vec![[0, 1]])
        .unwrap();
    let mut collider =
        ClothCollider::new(ClothId(0), CollisionConfig::default().with_friction(1.0), shapes)
            .unwrap();
    let mut particles = ParticleBuffers::at_rest(vec![particle(0.5, 0.4, 0.0)]);

    collider.begin_frame();
    let stats = collider.collide(&mut particles, 0.5).unwrap();
    assert_eq!(stats.capsule_contacts, 1);

    let cur = particles.current()[0].truncate();
    let velocity = cur - particles.previous()[0].truncate();
    assert_relative_eq!(cur.y, 0.5, epsilon = 1e-5);
    assert_abs_diff_eq!(velocity.x, 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(velocity.y, 0.1, epsilon = 1e-5);
    assert_abs_diff_eq!(velocity.z, 0.1, epsilon = 1e-5);
}

#[test]
fn real_particle_mass_scale_uses_summed_correction() {
    let mut contacts = ImpulseAccumulator::default();
    contacts.record(Vec3::new(0.0, 0.1, 0.0), Vec3::ZERO);
    contacts.record(Vec3::new(0.0, 0.1, 0.0), Vec3::ZERO);

    let response = ResponseAggregator::new(&CollisionConfig::default().with_mass_scale(1.0));
    let mut cur = particle(0.0, 0.0, 0.0);
    let mut prev = cur;
    assert!(response.apply(&contacts, &mut cur, &mut prev));

    assert_relative_eq!(cur.y, 0.1, epsilon = 1e-6);
    assert_relative_eq!(cur.w, 1.0 / 1.04, epsilon = 1e-6);
    assert_eq!(prev, particle(0.0, 0.0, 0.0));
}

#[test]
fn mass_scale_is_monotonic_in_penetration() {
    let mut particles = ParticleBuffers::at_rest(vec![
        particle(0.0, 0.9, 0.0),
        particle(0.0, 0.5, 0.0),
        particle(0.0, 0.1, 0.0),
        particle(0.0, 3.0, 0.0),
    ]);
    run_substep(
        unit_sphere_at(Vec3::ZERO),
        CollisionConfig::default().with_mass_scale(1.0),
        &mut particles,
    );
    let w: Vec<f32> = particles.current().iter().map(|p| p.w).collect();
    assert_relative_eq!(w[0], 1.0 / (1.0 + 0.01), epsilon = 1e-4);
    assert!(w[0] >= w[1] && w[1] >= w[2]);
    assert!(w[2] > 0.0);
    assert_eq!(w[3], 1.0);
}

#[test]
fn inverse_mass_restored_next_substep() {
    let shapes = unit_sphere_at(Vec3::ZERO);
    let mut collider =
        ClothCollider::new(ClothId(3), CollisionConfig::default().with_mass_scale(1.0), shapes)
            .unwrap();
    let mut particles = ParticleBuffers::at_rest(vec![particle(0.0, 0.5, 0.0)]);

    collider.begin_frame();
    collider.collide(&mut particles, 0.5).unwrap();
    assert!(particles.current()[0].w < 1.0);

    // Resting on the surface now, so the mass comes back.
    collider.collide(&mut particles, 1.0).unwrap();
    assert_relative_eq!(particles.current()[0].w, 1.0, epsilon = 1e-6);
}

// ─── Virtual Particle Tests ───────────────────────────────────

#[test]
fn virtual_sets_never_share_particles() {
    let entries = [[0, 1, 2, 0], [2, 3, 4, 0], [5, 6, 7, 0], [8, 9, 10, 0], [7, 11, 12, 0]];
    let vps = VirtualParticles::new(&entries, &[Vec3::new(0.3, 0.3, 0.4)]).unwrap();
    assert_eq!(vps.len(), 5);
    assert_eq!(vps.set_count(), 2);
    assert_eq!(vps.particle_span(), 13);
    for set in vps.sets() {
        let mut seen = std::collections::HashSet::new();
        for vp in set {
            for p in vp.particles {
                assert!(seen.insert(p), "particle {p:?} shared within a set");
            }
        }
    }
}

#[test]
fn virtual_weights_validated() {
    assert!(VirtualParticles::new(&[[0, 1, 2, 1]], &[Vec3::ONE]).is_err());
    assert!(VirtualParticles::new(&[[0, 1, 2, 0]], &[Vec3::ZERO]).is_err());
}

#[test]
fn virtual_particle_scatters_correction() {
    let mut particles = ParticleBuffers::at_rest(vec![
        particle(-2.0, 0.5, 0.0),
        particle(2.0, 0.5, 0.0),
        particle(0.0, 0.5, 3.0),
    ]);
    let weights = Vec3::new(0.5, 0.5, 0.0);
    let vps = VirtualParticles::new(&[[0, 1, 2, 0]], &[weights]).unwrap();
    let mut collider =
        ClothCollider::new(ClothId(0), CollisionConfig::default(), unit_sphere_at(Vec3::ZERO))
            .unwrap()
            .with_virtual_particles(vps);
    collider.begin_frame();
    let stats = collider.collide(&mut particles, 1.0).unwrap();

    assert_eq!(stats.capsule_contacts, 0);
    assert_eq!(stats.virtual_contacts, 1);

    let cur = particles.current();
    let sample = cur[0].truncate() * weights.x + cur[1].truncate() * weights.y;
    assert_relative_eq!(sample.length(), 1.0, epsilon = 1e-5);
    // Zero weight, no share of the correction.
    assert_eq!(cur[2], particle(0.0, 0.5, 3.0));
}

#[test]
fn virtual_particle_scatters_friction_and_mass() {
    // Both weighted sources slide +0.1 in x; the sample they span sits
    // halfway into a static unit sphere.
    let current = vec![
        particle(-2.0, 0.5, 0.0),
        particle(2.0, 0.5, 0.0),
        particle(0.0, 0.5, 3.0),
    ];
    let previous = vec![
        particle(-2.1, 0.5, 0.0),
        particle(1.9, 0.5, 0.0),
        particle(-0.1, 0.5, 3.0),
    ];
    let mut particles = ParticleBuffers::new(current, previous).unwrap();
    let vps = VirtualParticles::new(&[[0, 1, 2, 0]], &[Vec3::new(0.5, 0.5, 0.0)]).unwrap();
    let config = CollisionConfig::default().with_friction(1.0).with_mass_scale(1.0);
    let mut collider = ClothCollider::new(ClothId(0), config, unit_sphere_at(Vec3::ZERO))
        .unwrap()
        .with_virtual_particles(vps);

    collider.begin_frame();
    let stats = collider.collide(&mut particles, 1.0).unwrap();
    assert_eq!(stats.capsule_contacts, 0);
    assert_eq!(stats.virtual_contacts, 1);

    let (cur, prev) = (particles.current(), particles.previous());
    for i in 0..2 {
        assert_relative_eq!(cur[i].y, 1.0, epsilon = 1e-5);
        // The 1/(1 + 0.5²) = 0.8 factor, split half and half.
        assert_relative_eq!(cur[i].w, 0.9, epsilon = 1e-5);
        // Tangential motion fully cancelled.
        assert_abs_diff_eq!(cur[i].x - prev[i].x, 0.0, epsilon = 1e-5);
    }
    assert_eq!(cur[2], particle(0.0, 0.5, 3.0));
    assert_eq!(prev[2], particle(-0.1, 0.5, 3.0));
}

#[test]
fn virtual_particles_need_matching_buffers() {
    let vps = VirtualParticles::new(&[[0, 1, 5, 0]], &[Vec3::ONE]).unwrap();
    let mut collider =
        ClothCollider::new(ClothId(0), CollisionConfig::default(), unit_sphere_at(Vec3::ZERO))
            .unwrap()
            .with_virtual_particles(vps);
    let start = vec![particle(0.0, 0.5, 0.0); 3];
    let mut particles = ParticleBuffers::at_rest(start.clone());
    let err = collider.collide(&mut particles, 1.0).unwrap_err();
    assert!(matches!(err, WeaveError::InvalidBuffer(_)));
    assert_eq!(particles.current(), start.as_slice());
}

// ─── Pipeline Tests ───────────────────────────────────────────

#[test]
fn mismatched_buffers_rejected() {
    let err = ParticleBuffers::new(vec![Vec4::ZERO; 2], vec![Vec4::ZERO; 3]).unwrap_err();
    assert!(matches!(err, WeaveError::InvalidBuffer(_)));
}

#[test]
fn cloths_collide_independently() {
    let mut cloths = vec![
        (
            ClothCollider::new(ClothId(0), CollisionConfig::default(), unit_sphere_at(Vec3::ZERO))
                .unwrap(),
            ParticleBuffers::at_rest(vec![particle(0.0, 0.5, 0.0)]),
        ),
        (
            ClothCollider::new(ClothId(1), CollisionConfig::continuous(), cylinder()).unwrap(),
            ParticleBuffers::at_rest(vec![particle(0.0, 0.1, 0.0), particle(0.0, 4.0, 0.0)]),
        ),
    ];
    for (collider, _) in cloths.iter_mut() {
        collider.begin_frame();
    }
    let stats = collide_cloths(&mut cloths, 1.0).unwrap();

    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].capsule_contacts, 1);
    assert_eq!(stats[1].capsule_contacts, 1);
    assert_relative_eq!(cloths[0].1.current()[0].y, 1.0, epsilon = 1e-5);
    assert_relative_eq!(cloths[1].1.current()[0].y, 0.5, epsilon = 1e-5);
}

#[test]
fn many_particles_across_chunks() {
    // Ring of particles inside a sphere, more than one parallel chunk.
    let n = 1000;
    let start: Vec<Vec4> = (0..n)
        .map(|i| {
            let a = i as f32 / n as f32 * std::f32::consts::TAU;
            particle(0.5 * a.cos(), 0.5 * a.sin(), 0.0)
        })
        .collect();
    let mut particles = ParticleBuffers::at_rest(start);
    let stats = run_substep(unit_sphere_at(Vec3::ZERO), CollisionConfig::default(), &mut particles);

    assert_eq!(stats.capsule_contacts, n);
    for p in particles.current() {
        assert_relative_eq!(p.truncate().length(), 1.0, epsilon = 1e-5);
    }
}

#[test]
fn stats_serialize() {
    let mut particles = ParticleBuffers::at_rest(vec![particle(0.0, 0.5, 0.0)]);
    let stats = run_substep(unit_sphere_at(Vec3::ZERO), CollisionConfig::default(), &mut particles);
    let json = serde_json::to_string(&stats).unwrap();
    let restored: weave_collision::CollisionStats = serde_json::from_str(&json).unwrap();
    assert_eq!(stats, restored);
}
