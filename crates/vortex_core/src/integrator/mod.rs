//! Integrators
//!
//! An integrator advances every live entity by one step. Implementations are
//! interchangeable strategies picked from configuration:
//!
//! - [`ScalarVortex`]: one entity at a time, any layout
//! - [`SimdVortex`]: 8 entities per batch over planar columns
//! - [`Ballistic`]: constant velocity with reflective world edges
//!
//! The GPU-resident variant lives in `vortex_render`; on the CPU side it has no
//! integrator at all (see [`IntegratorKind::Gpu`]).

mod ballistic;
mod scalar;
mod simd;

pub use ballistic::Ballistic;
pub use scalar::ScalarVortex;
pub use simd::{SimdVortex, LANES};

use crate::bounds::WorldBounds;
use crate::field::VortexField;
use crate::store::ColumnsMut;
use serde::{Deserialize, Serialize};

/// Everything an integrator may read during a step.
#[derive(Debug, Copy, Clone)]
pub struct StepContext {
    /// Elapsed time in seconds.
    pub dt: f32,
    pub field: VortexField,
    pub world: WorldBounds,
}

pub trait Integrator {
    fn name(&self) -> &'static str;

    fn step(&self, columns: ColumnsMut<'_>, ctx: &StepContext);
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorKind {
    Scalar,
    Simd,
    Ballistic,
    /// Integration happens in a compute kernel on the GPU.
    Gpu,
}

/// Parameters of the ballistic integrator.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BallisticParams {
    pub speed: f32,
    pub border: f32,
}

/// CPU integrator for `kind`, or `None` when integration runs on the GPU.
pub fn integrator_for(kind: IntegratorKind, ballistic: BallisticParams) -> Option<Box<dyn Integrator>> {
    match kind {
        IntegratorKind::Scalar => Some(Box::new(ScalarVortex)),
        IntegratorKind::Simd => Some(Box::new(SimdVortex)),
        IntegratorKind::Ballistic => Some(Box::new(Ballistic::new(ballistic))),
        IntegratorKind::Gpu => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, EntityId};
    use crate::store::{AosStore, EntityStore, SoaStore};
    use glam::{Vec2, Vec3};

    fn ctx(dt: f32) -> StepContext {
        let world = WorldBounds::new(Vec2::new(100.0, 100.0));
        StepContext {
            dt,
            field: VortexField::for_world(&world, 100.0, 0.5),
            world,
        }
    }

    fn seeded(store: &mut dyn EntityStore, count: u32) {
        for i in 0..count {
            let t = i as f32 * 0.37;
            let position = Vec2::new(50.0 + 30.0 * t.cos(), 50.0 + 30.0 * (t * 1.3).sin());
            store.append(
                Entity::new(EntityId(i), position, Vec3::ONE).with_velocity(Vec2::new(0.3, -0.2)),
            );
        }
    }

    fn snapshot(store: &dyn EntityStore) -> Vec<Entity> {
        (0..store.len()).filter_map(|i| store.entity_at(i)).collect()
    }

    #[test]
    fn zero_dt_is_identity_for_every_integrator() {
        let params = BallisticParams {
            speed: 12.5,
            border: 0.5,
        };
        for kind in [IntegratorKind::Scalar, IntegratorKind::Simd, IntegratorKind::Ballistic] {
            let integrator = integrator_for(kind, params).unwrap();
            let mut aos = AosStore::new();
            let mut soa = SoaStore::new();
            seeded(&mut aos, 21);
            seeded(&mut soa, 21);
            let before_aos = snapshot(&aos);
            let before_soa = snapshot(&soa);

            integrator.step(aos.columns_mut(), &ctx(0.0));
            integrator.step(soa.columns_mut(), &ctx(0.0));

            assert_eq!(snapshot(&aos), before_aos, "{}", integrator.name());
            assert_eq!(snapshot(&soa), before_soa, "{}", integrator.name());
        }
    }

    #[test]
    fn gpu_kind_has_no_cpu_integrator() {
        let params = BallisticParams {
            speed: 1.0,
            border: 0.0,
        };
        assert!(integrator_for(IntegratorKind::Gpu, params).is_none());
    }

    #[test]
    fn scalar_and_simd_agree() {
        // 8 full batches plus a 5-entity tail.
        let mut scalar = SoaStore::new();
        let mut simd = SoaStore::new();
        seeded(&mut scalar, 69);
        seeded(&mut simd, 69);

        for _ in 0..50 {
            ScalarVortex.step(scalar.columns_mut(), &ctx(0.016));
            SimdVortex.step(simd.columns_mut(), &ctx(0.016));
        }

        for i in 0..scalar.len() {
            let a = scalar.entity_at(i).unwrap().position;
            let b = simd.entity_at(i).unwrap().position;
            let rel = (a - b).length() / a.length().max(1.0);
            assert!(rel < 1e-3, "entity {i}: {a} vs {b}");
        }
    }

    #[test]
    fn scalar_layouts_agree() {
        let mut aos = AosStore::new();
        let mut soa = SoaStore::new();
        seeded(&mut aos, 17);
        seeded(&mut soa, 17);
        for _ in 0..10 {
            ScalarVortex.step(aos.columns_mut(), &ctx(0.016));
            ScalarVortex.step(soa.columns_mut(), &ctx(0.016));
        }
        for i in 0..aos.len() {
            assert_eq!(aos.entity_at(i).unwrap().position, soa.entity_at(i).unwrap().position);
        }
    }
}
