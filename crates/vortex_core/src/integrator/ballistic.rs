use super::{BallisticParams, Integrator, StepContext};
use crate::bounds::Rect;
use crate::store::ColumnsMut;
use glam::Vec2;

/// Constant-velocity motion inside a reflective world rectangle.
///
/// A velocity component flips sign only while the entity is outside the inset
/// rectangle and still heading away from it, so entities never get stuck
/// flipping back and forth on the edge.
#[derive(Debug, Copy, Clone)]
pub struct Ballistic {
    params: BallisticParams,
}

impl Ballistic {
    pub fn new(params: BallisticParams) -> Self {
        Self { params }
    }

    #[inline]
    fn advance(position: &mut Vec2, velocity: &mut Vec2, gain: f32, area: &Rect) {
        *position += *velocity * gain;
        if (position.x < area.min.x && velocity.x < 0.0) || (position.x > area.max.x && velocity.x > 0.0) {
            velocity.x = -velocity.x;
        }
        if (position.y < area.min.y && velocity.y < 0.0) || (position.y > area.max.y && velocity.y > 0.0) {
            velocity.y = -velocity.y;
        }
    }
}

impl Integrator for Ballistic {
    fn name(&self) -> &'static str {
        "ballistic"
    }

    fn step(&self, columns: ColumnsMut<'_>, ctx: &StepContext) {
        if ctx.dt == 0.0 {
            return;
        }
        let gain = self.params.speed * ctx.dt;
        let area = ctx.world.inset(self.params.border);

        match columns {
            ColumnsMut::Interleaved(entities) => {
                for e in entities.iter_mut().filter(|e| !e.pinned) {
                    Self::advance(&mut e.position, &mut e.velocity, gain, &area);
                }
            }
            ColumnsMut::Planar(p) => {
                for i in 0..p.xs.len() {
                    if p.pinned[i] {
                        continue;
                    }
                    let mut position = Vec2::new(p.xs[i], p.ys[i]);
                    let mut velocity = Vec2::new(p.vxs[i], p.vys[i]);
                    Self::advance(&mut position, &mut velocity, gain, &area);
                    p.xs[i] = position.x;
                    p.ys[i] = position.y;
                    p.vxs[i] = velocity.x;
                    p.vys[i] = velocity.y;
                }
            }
        }
    }
}
