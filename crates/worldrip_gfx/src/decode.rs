//! Numeric decoders for packed vertex attributes
//!
//! All of these are pure functions over fixed-width inputs. Their output has to match the game's
//! own unpacking bit for bit, so the formulas are kept exactly as the game evaluates them, in
//! single precision, even where a "nicer" equivalent exists.

use glam::{Quat, Vec2, Vec3};
use std::f32::consts::FRAC_1_SQRT_2;

/// Unpacks a normal stored as 3 biased bytes and a shared scale byte ("method A").
///
/// The result is not guaranteed to be of unit length.
pub fn unpack_normal_a(packed: [u8; 4]) -> Vec3 {
    let [x, y, z, w] = packed;
    let scale = (w as f32 - -192.0) / 32385.0;
    Vec3::new(
        (x as f32 - 127.0) * scale,
        (y as f32 - 127.0) * scale,
        (z as f32 - 127.0) * scale,
    )
}

/// Unpacks a normal stored as three 10-bit unsigned fields in bits 0-29 ("method B").
pub fn unpack_normal_b(packed: u32) -> Vec3 {
    let field = |shift: u32| ((packed >> shift) & 0x3FF) as f32 / 1023.0 * 2.0 - 1.0;
    Vec3::new(field(0), field(10), field(20))
}

/// Tangent space basis, as decoded from a packed tangent frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TangentFrame {
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub normal: Vec3,
}

/// Unpacks a 32-bit tangent frame.
///
/// The frame is stored as a quaternion with its largest component dropped: bits 30-31 hold the
/// index of that component, and bits 0-29 the remaining three components (in `x y z w` order,
/// skipping the dropped one) as signed 10-bit values scaled to `[-1/sqrt(2), 1/sqrt(2)]`. The
/// dropped component is always positive.
pub fn unpack_tangent_frame(packed: u32) -> TangentFrame {
    let dropped = (packed >> 30) as usize;

    let mut stored = [0.0f32; 3];
    for (i, value) in stored.iter_mut().enumerate() {
        // Sign extend the 10-bit field
        let field = (((packed >> (i * 10)) & 0x3FF) << 22) as i32 >> 22;
        *value = field as f32 / 511.0 * FRAC_1_SQRT_2;
    }

    let mut components = [0.0f32; 4];
    let mut stored_iter = stored.iter();
    for (i, component) in components.iter_mut().enumerate() {
        if i != dropped {
            // Three stored values for three non-dropped slots
            *component = *stored_iter.next().unwrap_or(&0.0);
        }
    }

    let sum_of_squares: f32 = stored.iter().map(|c| c * c).sum();
    components[dropped] = (1.0 - sum_of_squares).max(0.0).sqrt();

    let [x, y, z, w] = components;
    TangentFrame {
        tangent: Vec3::new(
            1.0 - 2.0 * (y * y + z * z),
            2.0 * (x * y + w * z),
            2.0 * (x * z - w * y),
        ),
        bitangent: Vec3::new(
            2.0 * (x * y - w * z),
            1.0 - 2.0 * (x * x + z * z),
            2.0 * (y * z + w * x),
        ),
        normal: Vec3::new(
            2.0 * (x * z + w * y),
            2.0 * (y * z - w * x),
            1.0 - 2.0 * (x * x + y * y),
        ),
    }
}

/// Expands an IEEE 754 binary16 value into a binary32 one. The conversion is exact, including
/// subnormals, infinities and NaN payloads.
///
/// ## Example
/// ```
/// use worldrip_gfx::decode::half_to_f32;
/// assert_eq!(half_to_f32(0x3C00), 1.0);
/// assert_eq!(half_to_f32(0xC000), -2.0);
/// ```
pub fn half_to_f32(half: u16) -> f32 {
    let sign = ((half & 0x8000) as u32) << 16;
    let exponent = ((half >> 10) & 0x1F) as u32;
    let mantissa = (half & 0x3FF) as u32;

    let bits = match (exponent, mantissa) {
        (0, 0) => sign,
        (0, _) => {
            // Subnormal, normalize it into a regular single precision value
            let mut exponent = 127 - 15 + 1;
            let mut mantissa = mantissa;
            while mantissa & 0x400 == 0 {
                mantissa <<= 1;
                exponent -= 1;
            }
            sign | (exponent << 23) | ((mantissa & 0x3FF) << 13)
        }
        (0x1F, _) => sign | 0x7F80_0000 | (mantissa << 13),
        _ => sign | ((exponent + 127 - 15) << 23) | (mantissa << 13),
    };

    f32::from_bits(bits)
}

/// Expands a pair of half precision values, usually texture coordinates.
pub fn unpack_half2(packed: [u16; 2]) -> Vec2 {
    Vec2::new(half_to_f32(packed[0]), half_to_f32(packed[1]))
}

/// Dequantization parameters of a quantized position.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
pub struct Quantization {
    pub scale: f32,
    pub offset: [f32; 3],
}

impl Default for Quantization {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: [0.0; 3],
        }
    }
}

const QUANTIZED_MASK: u64 = (1 << 21) - 1;

/// Expands an 8-byte quantized position: three unsigned 21-bit components in bits 0-20, 21-41
/// and 42-62, with bit 63 left for auxiliary data. Each component is decoded as
/// `component * scale + offset[component]`.
///
/// With `swap_xy` the first two stored components are read as `y`, then `x`.
pub fn unpack_quantized_position(packed: u64, quantization: Quantization, swap_xy: bool) -> Vec3 {
    let first = (packed & QUANTIZED_MASK) as f32;
    let second = ((packed >> 21) & QUANTIZED_MASK) as f32;
    let third = ((packed >> 42) & QUANTIZED_MASK) as f32;

    let (x, y) = match swap_xy {
        true => (second, first),
        false => (first, second),
    };

    let Quantization { scale, offset } = quantization;
    Vec3::new(
        x * scale + offset[0],
        y * scale + offset[1],
        third * scale + offset[2],
    )
}

/// Unpacks a quaternion stored as four snorm16 components in `x y z w` order.
pub fn unpack_quaternion_i16(packed: [i16; 4]) -> Quat {
    let [x, y, z, w] = packed.map(|c| c as f32 / 32767.0);
    let quat = Quat::from_xyzw(x, y, z, w);
    match quat.length_squared() > 0.0 {
        true => quat.normalize(),
        false => Quat::IDENTITY,
    }
}
