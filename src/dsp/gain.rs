/// Level below which decibel values map to silence
pub const MINUS_INFINITY_DB: f32 = -100.0;

/// Convert decibels to linear gain
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    if db <= MINUS_INFINITY_DB {
        0.0
    } else {
        10.0_f32.powf(db / 20.0)
    }
}

/// Convert linear gain to decibels
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        MINUS_INFINITY_DB
    } else {
        (20.0 * linear.log10()).max(MINUS_INFINITY_DB)
    }
}

/// Multiply every sample of every channel by `gain`
#[inline]
pub fn apply_gain(channels: &mut [&mut [f32]], gain: f32) {
    if gain == 1.0 {
        return;
    }
    for channel in channels.iter_mut() {
        for sample in channel.iter_mut() {
            *sample *= gain;
        }
    }
}
