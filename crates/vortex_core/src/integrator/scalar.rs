use super::{Integrator, StepContext};
use crate::field::VortexField;
use crate::store::ColumnsMut;
use glam::Vec2;

/// Portable vortex integrator.
///
/// The field fully determines the displacement, so stored velocities are left
/// alone. Pinned entities do not move.
#[derive(Debug, Default, Copy, Clone)]
pub struct ScalarVortex;

impl ScalarVortex {
    /// Advance planar columns in `range` (shared with the SIMD tail).
    pub(crate) fn step_planar_range(
        xs: &mut [f32],
        ys: &mut [f32],
        pinned: &[bool],
        field: &VortexField,
        dt: f32,
        range: std::ops::Range<usize>,
    ) {
        for i in range {
            if pinned[i] {
                continue;
            }
            let v = field.velocity_at(Vec2::new(xs[i], ys[i]), dt);
            xs[i] += v.x;
            ys[i] += v.y;
        }
    }
}

impl Integrator for ScalarVortex {
    fn name(&self) -> &'static str {
        "scalar"
    }

    fn step(&self, columns: ColumnsMut<'_>, ctx: &StepContext) {
        match columns {
            ColumnsMut::Interleaved(entities) => {
                for e in entities.iter_mut().filter(|e| !e.pinned) {
                    e.position += ctx.field.velocity_at(e.position, ctx.dt);
                }
            }
            ColumnsMut::Planar(p) => {
                let len = p.xs.len();
                Self::step_planar_range(p.xs, p.ys, p.pinned, &ctx.field, ctx.dt, 0..len);
            }
        }
    }
}
