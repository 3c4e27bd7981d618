//! Orientation conversions used when placing static models

use glam::{Mat3, Quat, Vec3};

/// Converts a rotation matrix into a quaternion.
///
/// The matrix columns are the rotated X, Y and Z axes, which is how the game stores placement
/// axes (forward, left, up). The branch picks the largest of the trace and the diagonal
/// elements, so the divisor never gets close to zero.
pub fn quat_from_axes(axes: Mat3) -> Quat {
    // m(row, column)
    let m = |r: usize, c: usize| axes.col(c)[r];
    let trace = m(0, 0) + m(1, 1) + m(2, 2);

    if trace > 0.0 {
        let s = (trace + 1.0).sqrt() * 2.0;
        Quat::from_xyzw(
            (m(2, 1) - m(1, 2)) / s,
            (m(0, 2) - m(2, 0)) / s,
            (m(1, 0) - m(0, 1)) / s,
            0.25 * s,
        )
    } else if m(0, 0) > m(1, 1) && m(0, 0) > m(2, 2) {
        let s = (1.0 + m(0, 0) - m(1, 1) - m(2, 2)).sqrt() * 2.0;
        Quat::from_xyzw(
            0.25 * s,
            (m(0, 1) + m(1, 0)) / s,
            (m(0, 2) + m(2, 0)) / s,
            (m(2, 1) - m(1, 2)) / s,
        )
    } else if m(1, 1) > m(2, 2) {
        let s = (1.0 + m(1, 1) - m(0, 0) - m(2, 2)).sqrt() * 2.0;
        Quat::from_xyzw(
            (m(0, 1) + m(1, 0)) / s,
            0.25 * s,
            (m(1, 2) + m(2, 1)) / s,
            (m(0, 2) - m(2, 0)) / s,
        )
    } else {
        let s = (1.0 + m(2, 2) - m(0, 0) - m(1, 1)).sqrt() * 2.0;
        Quat::from_xyzw(
            (m(0, 2) + m(2, 0)) / s,
            (m(1, 2) + m(2, 1)) / s,
            0.25 * s,
            (m(1, 0) - m(0, 1)) / s,
        )
    }
}

/// Builds the axes matrix out of the three axis vectors stored in a placement record.
pub fn axes_from_rows(axes: [[f32; 3]; 3]) -> Mat3 {
    Mat3::from_cols(
        Vec3::from_array(axes[0]),
        Vec3::from_array(axes[1]),
        Vec3::from_array(axes[2]),
    )
}

/// Converts a quaternion into roll (X), pitch (Y) and yaw (Z) angles, in radians.
pub fn quat_to_euler(q: Quat) -> Vec3 {
    let roll = (2.0 * (q.w * q.x + q.y * q.z)).atan2(1.0 - 2.0 * (q.x * q.x + q.y * q.y));

    // Rounding can push the term slightly outside of asin's domain
    let pitch = (2.0 * (q.w * q.y - q.z * q.x)).clamp(-1.0, 1.0).asin();

    let yaw = (2.0 * (q.w * q.z + q.x * q.y)).atan2(1.0 - 2.0 * (q.y * q.y + q.z * q.z));

    Vec3::new(roll, pitch, yaw)
}

pub fn euler_to_degrees(euler: Vec3) -> Vec3 {
    Vec3::new(
        euler.x.to_degrees(),
        euler.y.to_degrees(),
        euler.z.to_degrees(),
    )
}

/// Shorthand for the whole matrix to degrees chain.
pub fn axes_to_degrees(axes: Mat3) -> Vec3 {
    euler_to_degrees(quat_to_euler(quat_from_axes(axes)))
}
