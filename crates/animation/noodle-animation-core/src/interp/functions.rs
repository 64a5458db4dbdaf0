//! Interpolation helpers:
//! - euler (degrees) to quaternion using the editor's Z, X, Y application order
//! - Catmull-Rom spline for vector3 points
//! - HSV-space color interpolation

use glam::{EulerRot, Quat, Vec3, Vec4};

/// Linear interpolation of scalars (unclamped).
#[inline]
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Convert euler angles in degrees into a quaternion.
///
/// Rotation applies Z first, then X, then Y, which is the intrinsic Y-X-Z order.
#[inline]
pub fn euler_deg_to_quat(e: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        e.y.to_radians(),
        e.x.to_radians(),
        e.z.to_radians(),
    )
}

/// Uniform Catmull-Rom (tension 0.5) between `p1` and `p2`.
#[inline]
pub fn catmull_rom_vec3(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (p2 - p0) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (3.0 * p1 - p0 - 3.0 * p2 + p3) * t3)
}

/// RGB (0..1) to HSV (0..1 each).
pub fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let v = max;
    let s = if max > 0.0 { delta / max } else { 0.0 };
    if delta <= 0.0 {
        return (0.0, s, v);
    }
    let sector = if max == r {
        (g - b) / delta
    } else if max == g {
        2.0 + (b - r) / delta
    } else {
        4.0 + (r - g) / delta
    };
    let mut h = sector / 6.0;
    if h < 0.0 {
        h += 1.0;
    }
    (h, s, v)
}

/// HSV (0..1 each, hue wraps) to RGB (0..1).
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    if s <= 0.0 {
        return (v, v, v);
    }
    let h = h.rem_euclid(1.0) * 6.0;
    let sector = h.floor();
    let f = h - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match sector as i32 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

/// Interpolate two RGBA colors through HSV space; alpha is lerped directly.
pub fn lerp_hsv(a: Vec4, b: Vec4, t: f32) -> Vec4 {
    let (h0, s0, v0) = rgb_to_hsv(a.x, a.y, a.z);
    let (h1, s1, v1) = rgb_to_hsv(b.x, b.y, b.z);
    let (r, g, bl) = hsv_to_rgb(
        lerp_f32(h0, h1, t),
        lerp_f32(s0, s1, t),
        lerp_f32(v0, v1, t),
    );
    Vec4::new(r, g, bl, lerp_f32(a.w, b.w, t))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-5, "left={a} right={b}");
    }

    #[test]
    fn yaw_only_euler_rotates_about_y() {
        let q = euler_deg_to_quat(Vec3::new(0.0, 90.0, 0.0));
        let v = q * Vec3::Z;
        approx(v.x, 1.0);
        approx(v.z, 0.0);
    }

    #[test]
    fn euler_order_applies_z_then_x_then_y() {
        let e = Vec3::new(30.0, 45.0, 60.0);
        let composed = Quat::from_rotation_y(45f32.to_radians())
            * Quat::from_rotation_x(30f32.to_radians())
            * Quat::from_rotation_z(60f32.to_radians());
        let q = euler_deg_to_quat(e);
        assert!(q.dot(composed).abs() > 0.99999);
    }

    #[test]
    fn catmull_rom_hits_control_points() {
        let p0 = Vec3::new(-1.0, 0.0, 0.0);
        let p1 = Vec3::ZERO;
        let p2 = Vec3::new(1.0, 1.0, 0.0);
        let p3 = Vec3::new(2.0, 1.0, 0.0);
        assert!(catmull_rom_vec3(p0, p1, p2, p3, 0.0).abs_diff_eq(p1, 1e-6));
        assert!(catmull_rom_vec3(p0, p1, p2, p3, 1.0).abs_diff_eq(p2, 1e-6));
    }

    #[test]
    fn hsv_round_trips_primary_colors() {
        for (r, g, b) in [(1.0, 0.0, 0.0), (0.0, 1.0, 0.0), (0.0, 0.0, 1.0), (0.2, 0.4, 0.6)] {
            let (h, s, v) = rgb_to_hsv(r, g, b);
            let (r2, g2, b2) = hsv_to_rgb(h, s, v);
            approx(r, r2);
            approx(g, g2);
            approx(b, b2);
        }
    }

    #[test]
    fn hsv_lerp_passes_through_hue_not_grey() {
        let red = Vec4::new(1.0, 0.0, 0.0, 1.0);
        let green = Vec4::new(0.0, 1.0, 0.0, 1.0);
        let mid = lerp_hsv(red, green, 0.5);
        // Halfway between red and green in hue is yellow, fully saturated.
        approx(mid.x, 1.0);
        approx(mid.y, 1.0);
        approx(mid.z, 0.0);
    }
}
