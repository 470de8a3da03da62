use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Milliseconds of game time. Timestamps and durations share this unit.
pub type Millis = u64;

/// One hundred percent.
pub const FULL_PERCENT: Fixed64 = Fixed64::const_from_int(100);

/// Convert an f64 to Fixed64. Use only for initialization, never in the poll loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// `part / whole` as a percentage clamped to `0..=100`, truncated to the
/// nearest representable value below.
///
/// A zero `whole` counts as complete.
pub fn percent_of(part: Millis, whole: Millis) -> Fixed64 {
    ratio_bits(part, whole, false)
}

/// Like [`percent_of`] but rounded up, so that `whole / part` steps of this
/// size always reach 100.
pub fn percent_of_ceil(part: Millis, whole: Millis) -> Fixed64 {
    ratio_bits(part, whole, true)
}

fn ratio_bits(part: Millis, whole: Millis, round_up: bool) -> Fixed64 {
    if whole == 0 || part >= whole {
        return FULL_PERCENT;
    }
    // part < whole, so the result is below 100 << 32 and fits the bits.
    let scaled = (part as u128 * 100) << Fixed64::FRAC_NBITS;
    let whole = whole as u128;
    let mut bits = scaled / whole;
    if round_up && scaled % whole != 0 {
        bits += 1;
    }
    Fixed64::from_bits(bits as i64).min(FULL_PERCENT)
}
