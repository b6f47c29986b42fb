/// Volume arithmetic
///
/// Volumes are integer percentages in the state store and linear gains on the
/// resource side.

/// Upper bound of every percentage volume
pub const MAX_VOLUME: u8 = 100;

/// Clamp a percentage volume into 0-100
pub fn clamp_percent(volume: u8) -> u8 {
    volume.min(MAX_VOLUME)
}

/// Final linear gain for a sound: per-sound volume times master volume, both
/// in percent, clamped to [0, 1]
pub fn effective_gain(volume: u8, master_volume: u8) -> f32 {
    let gain = (f32::from(clamp_percent(volume)) / 100.0)
        * (f32::from(clamp_percent(master_volume)) / 100.0);
    gain.clamp(0.0, 1.0)
}

/// Gain actually sent to the output, taking global mute into account
pub fn output_gain(gain: f32, muted: bool) -> f32 {
    if muted {
        0.0
    } else {
        gain.clamp(0.0, 1.0)
    }
}
