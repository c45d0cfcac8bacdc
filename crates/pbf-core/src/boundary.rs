use glam::Vec3;

/// Axis-aligned box that predicted positions are clamped into.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// The closed unit cube `[0, 1]^3`, the fluid container.
    pub const UNIT: Aabb = Aabb {
        min: Vec3::ZERO,
        max: Vec3::ONE,
    };

    /// Component-wise clamp. Idempotent, and a point already inside is
    /// returned unchanged. NaN components pass through untouched so a
    /// blown-up particle is still caught by the non-finite check.
    #[inline]
    pub fn clamp(&self, p: Vec3) -> Vec3 {
        Vec3::new(
            clamp_axis(p.x, self.min.x, self.max.x),
            clamp_axis(p.y, self.min.y, self.max.y),
            clamp_axis(p.z, self.min.z, self.max.z),
        )
    }

    #[inline]
    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }
}

#[inline]
fn clamp_axis(v: f32, lo: f32, hi: f32) -> f32 {
    if v < lo {
        lo
    } else if v > hi {
        hi
    } else {
        v
    }
}

/// Clamp every predicted position into `bounds`.
pub fn clamp_positions(predicted: &mut [Vec3], bounds: &Aabb) {
    for p in predicted.iter_mut() {
        *p = bounds.clamp(*p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_inside_is_noop() {
        let p = Vec3::new(0.25, 0.5, 1.0);
        assert_eq!(Aabb::UNIT.clamp(p), p);
    }

    #[test]
    fn test_clamp_per_axis() {
        let p = Vec3::new(-0.5, 0.4, 3.0);
        assert_eq!(Aabb::UNIT.clamp(p), Vec3::new(0.0, 0.4, 1.0));
    }

    #[test]
    fn test_clamp_keeps_nan_components() {
        let p = Aabb::UNIT.clamp(Vec3::new(f32::NAN, 2.0, -1.0));
        assert!(p.x.is_nan());
        assert_eq!((p.y, p.z), (1.0, 0.0));
    }

    #[test]
    fn test_clamp_positions_slice() {
        let mut ps = vec![Vec3::splat(2.0), Vec3::splat(-1.0), Vec3::splat(0.5)];
        clamp_positions(&mut ps, &Aabb::UNIT);
        assert_eq!(ps, vec![Vec3::ONE, Vec3::ZERO, Vec3::splat(0.5)]);
        assert!(ps.iter().all(|&p| Aabb::UNIT.contains(p)));
    }
}
