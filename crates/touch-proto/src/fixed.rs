//! Fixed-point encodings used on the wire.
//!
//! Out-of-range inputs trip a debug assertion; release builds clamp them.

/// Encode `f` in `[0, 1]` as an unsigned 16-bit fraction.
///
/// `1.0` maps to `0xFFFF` since `0x10000` does not fit.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn u16fp(f: f32) -> u16 {
    debug_assert!((0.0..=1.0).contains(&f), "u16fp input out of range: {f}");
    let f = if f.is_nan() { 0.0 } else { f.clamp(0.0, 1.0) };
    let scaled = (f64::from(f) * 65_536.0).round() as u32;
    scaled.min(0xFFFF) as u16
}

/// Encode `f` in `[-1, 1]` as a signed 16-bit fraction.
///
/// `1.0` maps to `0x7FFF` since `0x8000` does not fit.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn i16fp(f: f32) -> i16 {
    debug_assert!((-1.0..=1.0).contains(&f), "i16fp input out of range: {f}");
    let f = if f.is_nan() { 0.0 } else { f.clamp(-1.0, 1.0) };
    let scaled = (f64::from(f) * 32_768.0).round() as i32;
    scaled.clamp(-0x8000, 0x7FFF) as i16
}

/// Inverse of [`u16fp`], exact for `0` and within one ulp otherwise.
#[must_use]
pub fn u16fp_to_f32(v: u16) -> f32 {
    if v == 0xFFFF {
        1.0
    } else {
        f32::from(v) / 65_536.0
    }
}

/// Inverse of [`i16fp`].
#[must_use]
pub fn i16fp_to_f32(v: i16) -> f32 {
    if v == 0x7FFF {
        1.0
    } else {
        f32::from(v) / 32_768.0
    }
}
