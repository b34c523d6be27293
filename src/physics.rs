// ==============================================================================
// physics.rs — RAPIER HOST (INTEGRATOR, GROUND, RAYCAST PROBE, FORCE SINK)
// ------------------------------------------------------------------------------
// The kart model never touches rapier. This file is the host side of the
// boundary in kart_model::kinematics:
//
//   kinematic_state()  rigid body pose + velocities -> KinematicState
//   probe()            QueryPipeline::cast_ray      -> GroundProbe
//   apply_forces()     add_force_at_point           <- AppliedForce list
//   step()             PhysicsPipeline::step at the model's fixed dt
//
// World:
// - flat ground slab with its top face at y = 0
// - seeded low bumps scattered along the -Z straight
// - one dynamic chassis box; mass and principal inertia from ChassisConfig
//
// Forces are cleared (reset_forces) before each tick's model output is added,
// so nothing accumulates across ticks.
// ==============================================================================

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rapier3d::prelude::*;
use tracing::{info, warn};

use crate::config::KartConfig;
use crate::kart_model::kinematics::{GroundProbe, KinematicState};
use crate::kart_model::types::{AppliedForce, Pt3, Vec3};

const GROUP_GROUND: Group = Group::GROUP_1;
const GROUP_CHASSIS: Group = Group::GROUP_2;

/// Runaway bodies beyond this distance from the origin are reset.
const WORLD_LIMIT: f32 = 1_000.0;
const BUMP_COUNT: usize = 24;

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub integration_parameters: IntegrationParameters,
    pub pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub ccd: CCDSolver,
    pub query_pipeline: QueryPipeline, // ground probes
    pub kart: RigidBodyHandle,
    spawn: Vector<Real>,
}

impl PhysicsWorld {
    pub fn new(config: &KartConfig, seed: u64) -> Self {
        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        // Ground slab: 1000 x 0.2 x 1000, top face at y = 0.
        let ground = bodies.insert(RigidBodyBuilder::fixed().translation(vector![0.0, -0.1, 0.0]));
        colliders.insert_with_parent(ground_collider(500.0, 0.1, 500.0), ground, &mut bodies);

        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..BUMP_COUNT {
            let x = rng.gen_range(-4.0..4.0);
            let z = rng.gen_range(-300.0..-15.0);
            let height = rng.gen_range(0.02..0.07);
            let half_len = rng.gen_range(0.3..1.2);
            let bump = bodies.insert(
                RigidBodyBuilder::fixed().translation(vector![x, height * 0.5, z]),
            );
            colliders.insert_with_parent(ground_collider(1.5, height * 0.5, half_len), bump, &mut bodies);
        }

        // Kart chassis. Spawned just above rest height so it settles onto its springs.
        let chassis = &config.chassis;
        let suspension = &config.suspension.front;
        let spawn = vector![0.0, suspension.rest_length + suspension.wheel_radius + 0.1, 0.0];
        let [hx, hy, hz] = chassis.half_extents;
        let [ix, iy, iz] = chassis.inertia;

        let kart = bodies.insert(
            RigidBodyBuilder::dynamic()
                .translation(spawn)
                .additional_mass_properties(MassProperties::new(
                    Point::origin(),
                    chassis.mass,
                    vector![ix, iy, iz],
                ))
                .ccd_enabled(true),
        );
        let body_collider = ColliderBuilder::cuboid(hx, hy, hz)
            .collision_groups(InteractionGroups::new(GROUP_CHASSIS, GROUP_GROUND))
            .density(0.0)
            .friction(0.0)
            .restitution(0.0);
        colliders.insert_with_parent(body_collider, kart, &mut bodies);

        let mut query_pipeline = QueryPipeline::new();
        query_pipeline.update(&colliders);

        info!(
            seed,
            bodies = bodies.len(),
            colliders = colliders.len(),
            "physics world built"
        );

        Self {
            gravity: vector![0.0, -config.simulation.gravity, 0.0],
            integration_parameters: IntegrationParameters {
                dt: config.simulation.fixed_dt,
                ..IntegrationParameters::default()
            },
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline,
            kart,
            spawn,
        }
    }

    /// Current kart state as the model expects it. None if the body is gone.
    pub fn kinematic_state(&self, config: &KartConfig) -> Option<KinematicState> {
        let body = self.bodies.get(self.kart)?;
        let pos = body.position();

        let mut state = KinematicState::from_rigid_pose(
            &config.chassis,
            Pt3::from(pos.translation.vector),
            &pos.rotation,
            *body.linvel(),
            *body.angvel(),
        );
        // Rapier knows the true center of mass; prefer its point velocities.
        for wheel in state.wheels.iter_mut() {
            wheel.point_velocity = body.velocity_at_point(&wheel.mount.position);
        }
        Some(state)
    }

    pub fn probe(&self) -> RapierProbe<'_> {
        RapierProbe {
            bodies: &self.bodies,
            colliders: &self.colliders,
            query_pipeline: &self.query_pipeline,
            exclude: self.kart,
        }
    }

    /// Replace the kart's external forces with this tick's model output.
    pub fn apply_forces(&mut self, forces: &[AppliedForce]) {
        let Some(body) = self.bodies.get_mut(self.kart) else { return };
        body.reset_forces(true);
        for f in forces {
            body.add_force_at_point(f.force, f.point, true);
        }
    }

    pub fn step(&mut self) {
        let hooks = ();
        let events = ();

        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &hooks,
            &events,
        );

        // Safety: a body that left the world (or went NaN) is put back at spawn.
        for (handle, body) in self.bodies.iter_mut() {
            let pos = *body.translation();
            let bad = pos.iter().any(|c| !c.is_finite() || c.abs() > WORLD_LIMIT);
            if bad {
                body.set_translation(self.spawn, true);
                body.set_rotation(Rotation::identity(), true);
                body.set_linvel(Vector::zeros(), true);
                body.set_angvel(Vector::zeros(), true);
                warn!(?handle, x = pos.x, y = pos.y, z = pos.z, "reset runaway body to spawn");
            }
        }
    }

    pub fn kart_position(&self) -> Option<Vec3> {
        self.bodies.get(self.kart).map(|b| *b.translation())
    }

    pub fn kart_velocity(&self) -> Option<Vec3> {
        self.bodies.get(self.kart).map(|b| *b.linvel())
    }
}

fn ground_collider(hx: f32, hy: f32, hz: f32) -> ColliderBuilder {
    ColliderBuilder::cuboid(hx, hy, hz)
        .collision_groups(InteractionGroups::new(GROUP_GROUND, GROUP_CHASSIS))
        .friction(1.2)
        .restitution(0.0)
}

/// Ray-cast ground probe that ignores the kart's own collider.
pub struct RapierProbe<'a> {
    bodies: &'a RigidBodySet,
    colliders: &'a ColliderSet,
    query_pipeline: &'a QueryPipeline,
    exclude: RigidBodyHandle,
}

impl GroundProbe for RapierProbe<'_> {
    fn cast_down(&self, origin: &Pt3, down: &Vec3, max_distance: f32) -> Option<f32> {
        let ray = Ray::new(*origin, *down);
        let filter = QueryFilter::default()
            .groups(InteractionGroups::new(GROUP_CHASSIS, GROUP_GROUND))
            .exclude_rigid_body(self.exclude);

        self.query_pipeline
            .cast_ray(self.bodies, self.colliders, &ray, max_distance, true, filter)
            .map(|(_collider, toi)| toi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn probe_hits_flat_ground() {
        let world = PhysicsWorld::new(&KartConfig::default(), 7);
        let probe = world.probe();
        let down = -Vec3::y();

        let d = probe.cast_down(&Pt3::new(2.0, 1.5, 6.0), &down, 3.0).unwrap();
        assert_relative_eq!(d, 1.5, epsilon = 1e-4);
        assert!(probe.cast_down(&Pt3::new(2.0, 1.5, 6.0), &down, 1.0).is_none());
    }

    #[test]
    fn probe_ignores_the_kart_itself() {
        let world = PhysicsWorld::new(&KartConfig::default(), 7);
        let top = world.kart_position().unwrap() + Vec3::new(0.0, 2.0, 0.0);
        let d = world.probe().cast_down(&Pt3::from(top), &-Vec3::y(), 10.0).unwrap();
        assert_relative_eq!(d, top.y, epsilon = 1e-4);
    }

    #[test]
    fn forces_replace_previous_tick() {
        let config = KartConfig::default();
        let mut world = PhysicsWorld::new(&config, 1);
        let at = Pt3::from(world.kart_position().unwrap());
        let push = AppliedForce {
            source: crate::kart_model::types::ForceSource::Drag,
            force: Vec3::new(10.0, 0.0, 0.0),
            point: at,
        };

        world.apply_forces(&[push, push]);
        world.apply_forces(&[push]);
        world.step();

        // Only the last list acts: dv = F / m * dt.
        let v = world.kart_velocity().unwrap();
        let expected = 10.0 / config.chassis.mass * config.simulation.fixed_dt;
        assert_relative_eq!(v.x, expected, epsilon = 1e-5);
        assert!(world.kinematic_state(&config).is_some());
    }
}
