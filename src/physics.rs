// src/physics.rs

use rapier3d::na::{DMatrix, UnitQuaternion};
use rapier3d::prelude::*;
use rapier3d::prelude::{Group, InteractionGroups};
use tracing::{info, warn};

use crate::terrain::HeightfieldData;

const GROUP_GROUND: Group = Group::from_bits_truncate(0b0001);
const GROUP_CHASSIS: Group = Group::from_bits_truncate(0b0010);

/// Bodies drifting past this distance (or going non-finite) are parked back at the origin.
const WORLD_BOUNDS: Real = 10_000.0;

pub const FIXED_DT: Real = 1.0 / 60.0;

/// Result of a ray cast against the world.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    pub collider: ColliderHandle,
    pub body: Option<RigidBodyHandle>, // parent body of the hit collider
    pub toi: Real,                     // distance along the (unit) ray direction
    pub point: Point<Real>,
    pub normal: Vector<Real>,
}

/// Everything needed to create a car chassis body.
#[derive(Debug, Clone, Copy)]
pub struct ChassisDesc {
    pub half_extents: [Real; 3], // [hx, hy, hz] meters
    pub mass: Real,              // kg
    pub translation: Vector<Real>,
    pub angular_damping: Real,
}

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,                // gravity vector
    pub dt: Real,                             // fixed step
    pub pipeline: PhysicsPipeline,            // physics pipeline
    pub island_manager: IslandManager,        // manages islands of bodies
    pub broad_phase: DefaultBroadPhase,       // broad-phase collision detection
    pub narrow_phase: NarrowPhase,            // collision detection
    pub bodies: RigidBodySet,                 // for rigid bodies
    pub colliders: ColliderSet,               // for collision shapes
    pub joints: ImpulseJointSet,              // for constraints
    pub multibody_joints: MultibodyJointSet,  // for articulated bodies
    pub ccd: CCDSolver,                       // continuous collision detection
    pub query_pipeline: QueryPipeline,        // for raycasting
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        let gravity = vector![0.0, -9.81, 0.0];

        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        // === Big static ground box ===
        //
        // Size: 1000 x 2 x 1000, centered at (0, -1, 0), so its top surface is exactly at y = 0.
        let ground_rb = RigidBodyBuilder::fixed()
            .translation(vector![0.0, -1.0, 0.0])
            .build();

        let ground_handle = bodies.insert(ground_rb);

        let ground_collider = ColliderBuilder::cuboid(500.0, 1.0, 500.0)
            .collision_groups(InteractionGroups::new(GROUP_GROUND, GROUP_CHASSIS))
            .friction(1.2)
            .restitution(0.0)
            .build();

        colliders.insert_with_parent(ground_collider, ground_handle, &mut bodies);

        info!(bodies = bodies.len(), colliders = colliders.len(), "ground inserted");

        let mut world = Self {
            gravity,
            dt: FIXED_DT,
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        };
        world.refresh_queries();
        world
    }

    /// Make freshly inserted colliders visible to ray casts before the next step.
    fn refresh_queries(&mut self) {
        self.query_pipeline.update(&self.colliders);
    }

    /// Dynamic chassis body with a box collider. Density is derived from the
    /// requested mass so the body ends up with exactly that mass.
    pub fn create_chassis(&mut self, desc: &ChassisDesc) -> RigidBodyHandle {
        let [hx, hy, hz] = desc.half_extents;
        let volume = 8.0 * hx * hy * hz; // box size
        let density = desc.mass / volume; // rho = m / V

        let rb = RigidBodyBuilder::dynamic()
            .translation(desc.translation)
            .angular_damping(desc.angular_damping)
            .ccd_enabled(true)
            .can_sleep(false)
            .build();

        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .collision_groups(InteractionGroups::new(GROUP_CHASSIS, GROUP_GROUND))
            .active_events(ActiveEvents::empty())
            .density(density)
            .friction(0.0)
            .restitution(0.0)
            .build();

        let handle = self.bodies.insert(rb);
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        self.refresh_queries();

        info!(?handle, mass = desc.mass, "chassis body created");
        handle
    }

    /// Static heightfield collider (column-major heights, one fixed body).
    pub fn insert_heightfield(&mut self, data: &HeightfieldData) -> ColliderHandle {
        let heights = DMatrix::from_column_slice(data.rows, data.cols, &data.heights);
        let [sx, sy, sz] = data.scale;
        let [tx, ty, tz] = data.translation;

        let body = self.bodies.insert(
            RigidBodyBuilder::fixed().translation(vector![tx, ty, tz]).build(),
        );
        let collider = ColliderBuilder::heightfield(heights, vector![sx, sy, sz])
            .collision_groups(InteractionGroups::new(GROUP_GROUND, GROUP_CHASSIS))
            .friction(1.2)
            .restitution(0.0)
            .build();

        let handle = self.colliders.insert_with_parent(collider, body, &mut self.bodies);
        self.refresh_queries();
        handle
    }

    /// Cast a ray (direction need not be normalized) and report the first hit,
    /// optionally ignoring every collider attached to `exclude`.
    pub fn cast_ray(
        &self,
        origin: Point<Real>,
        dir: Vector<Real>,
        max_dist: Real,
        exclude: Option<RigidBodyHandle>,
    ) -> Option<RayHit> {
        let dir = dir.try_normalize(1e-6)?;
        let ray = Ray::new(origin, dir);

        let mut filter = QueryFilter::default();
        if let Some(body) = exclude {
            filter = filter.exclude_rigid_body(body);
        }

        let (collider, hit) = self.query_pipeline.cast_ray_and_get_normal(
            &self.bodies,
            &self.colliders,
            &ray,
            max_dist,
            true,
            filter,
        )?;

        Some(RayHit {
            collider,
            body: self.colliders.get(collider).and_then(|c| c.parent()),
            toi: hit.time_of_impact,
            point: ray.point_at(hit.time_of_impact),
            normal: hit.normal,
        })
    }

    pub fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    /// Velocity of the world point `p` rigidly attached to the body.
    pub fn velocity_at_point(&self, handle: RigidBodyHandle, p: &Point<Real>) -> Vector<Real> {
        self.bodies
            .get(handle)
            .map(|b| b.velocity_at_point(p))
            .unwrap_or_else(Vector::zeros)
    }

    pub fn reset_forces(&mut self, handle: RigidBodyHandle) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.reset_forces(true);
            body.reset_torques(true);
        }
    }

    pub fn add_force(&mut self, handle: RigidBodyHandle, force: Vector<Real>) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.add_force(force, true);
        }
    }

    pub fn add_force_at_point(&mut self, handle: RigidBodyHandle, force: Vector<Real>, point: Point<Real>) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.add_force_at_point(force, point, true);
        }
    }

    /// Move a body and clear all of its motion and accumulated forces.
    pub fn teleport(&mut self, handle: RigidBodyHandle, translation: Vector<Real>, rotation: UnitQuaternion<Real>) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_translation(translation, true);
            body.set_rotation(rotation, true);
            body.set_linvel(Vector::zeros(), true);
            body.set_angvel(Vector::zeros(), true);
            body.reset_forces(true);
            body.reset_torques(true);
        }
    }

    pub fn step(&mut self) {
        let hooks = ();
        let events = ();

        self.pipeline.step(
            &self.gravity,
            &IntegrationParameters {
                dt: self.dt,
                ..IntegrationParameters::default()
            },
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

        // Safety: prevent bodies from exploding to insane coordinates
        for (handle, body) in self.bodies.iter_mut() {
            let pos = *body.translation();

            let bad = !pos.x.is_finite()
                || !pos.y.is_finite()
                || !pos.z.is_finite()
                || pos.x.abs() > WORLD_BOUNDS
                || pos.y.abs() > WORLD_BOUNDS
                || pos.z.abs() > WORLD_BOUNDS;

            if bad {
                body.set_translation(vector![0.0, 2.0, 0.0], true);
                body.set_linvel(Vector::zeros(), true);
                body.set_angvel(Vector::zeros(), true);

                warn!(?handle, "reset exploding body back to origin");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chassis() -> ChassisDesc {
        ChassisDesc {
            half_extents: [1.0, 0.5, 2.0],
            mass: 1000.0,
            translation: vector![0.0, 5.0, 0.0],
            angular_damping: 0.5,
        }
    }

    #[test]
    fn ray_hits_ground_plane() {
        let world = PhysicsWorld::new();
        let hit = world
            .cast_ray(point![0.0, 3.0, 0.0], vector![0.0, -1.0, 0.0], 10.0, None)
            .expect("ground below");
        assert!((hit.toi - 3.0).abs() < 1e-3);
        assert!(hit.point.y.abs() < 1e-3);
        assert!(hit.normal.y > 0.99);
    }

    #[test]
    fn ray_skips_excluded_body() {
        let mut world = PhysicsWorld::new();
        let car = world.create_chassis(&chassis());

        let down = vector![0.0, -1.0, 0.0];
        let hit = world.cast_ray(point![0.0, 7.0, 0.0], down, 20.0, None).expect("hits chassis");
        assert_eq!(hit.body, Some(car));

        let hit = world.cast_ray(point![0.0, 7.0, 0.0], down, 20.0, Some(car)).expect("hits ground");
        assert_ne!(hit.body, Some(car));
        assert!(hit.point.y.abs() < 1e-3);
    }

    #[test]
    fn chassis_mass_matches_request() {
        let mut world = PhysicsWorld::new();
        let car = world.create_chassis(&chassis());
        let mass = world.body(car).map(|b| b.mass()).unwrap_or_default();
        assert!((mass - 1000.0).abs() < 1.0);
    }

    #[test]
    fn teleport_clears_motion() {
        let mut world = PhysicsWorld::new();
        let car = world.create_chassis(&chassis());
        for _ in 0..30 {
            world.step();
        }
        world.teleport(car, vector![1.0, 2.0, 3.0], UnitQuaternion::identity());

        let body = world.body(car).expect("body");
        assert_eq!(*body.translation(), vector![1.0, 2.0, 3.0]);
        assert_eq!(*body.linvel(), Vector::zeros());
        assert_eq!(*body.angvel(), Vector::zeros());
    }
}
