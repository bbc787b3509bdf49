//! Tone synthesis.
//!
//! Each [`Sector`] has one row in a recipe table describing its voice
//! (additive partials, optional downward sweep and sub-bass), how distance
//! parameters are bent for it, and which effects follow. Rendering a cue is
//! a lookup plus one shared code path.

use std::f64::consts::PI;

use crate::effects::{apply_fade, chorus, darken, tremolo, vibrato};
use crate::geometry::Sector;
use crate::params::AudioParams;

/// Every generated tone fades in and out over this long.
pub const FADE_SECS: f64 = 0.05;

/// A pulsed sub-octave layered under a voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubBass {
    /// Sub frequency as a fraction of the fundamental
    pub ratio: f64,
    /// Amplitude relative to the fundamental
    pub level: f64,
    /// Rate of the 0..1 pulse envelope, Hz
    pub pulse_hz: f64,
}

/// The raw timbre of a sector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voice {
    /// `(harmonic number, weight)` pairs, fundamental included
    pub partials: &'static [(f64, f64)],
    /// Overall scale applied after summing partials
    pub level: f64,
    /// Fraction the pitch drops by over the tone, 0 for constant pitch
    pub sweep: f64,
    /// Optional pulsed sub-bass
    pub sub_bass: Option<SubBass>,
}

/// Warm: harmonics 2 and 3 at decreasing weight.
pub const WARM: Voice = Voice {
    partials: &[(1.0, 1.0), (2.0, 0.2 / 2.0), (3.0, 0.2 / 3.0)],
    level: 0.5,
    sweep: 0.0,
    sub_bass: None,
};

/// Metallic: odd harmonics 3 and 5.
pub const METALLIC: Voice = Voice {
    partials: &[(1.0, 1.0), (3.0, 0.25 / 3.0), (5.0, 0.25 / 5.0)],
    level: 0.4,
    sweep: 0.0,
    sub_bass: None,
};

/// Sparkle: harmonics 2 and 4, constant pitch.
pub const SPARKLE: Voice = Voice {
    partials: &[(1.0, 1.0), (2.0, 0.2), (4.0, 0.1)],
    level: 0.5,
    sweep: 0.0,
    sub_bass: None,
};

/// Descend: a 40% downward sweep over a quarter-frequency sub pulsing at 3 Hz.
pub const DESCEND: Voice = Voice {
    partials: &[(1.0, 1.0)],
    level: 0.4,
    sweep: 0.4,
    sub_bass: Some(SubBass {
        ratio: 0.25,
        level: 0.6,
        pulse_hz: 3.0,
    }),
};

/// Extra character added after the core recipe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Embellishment {
    /// See [`vibrato`]
    Vibrato {
        /// Hz
        rate: f32,
        /// Modulation depth
        depth: f32,
    },
    /// See [`chorus`]
    Chorus {
        /// Delay of the copy, ms
        delay_ms: f32,
        /// Level of the copy
        depth: f32,
    },
}

/// One row of the sector table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recipe {
    /// Human readable sector name
    pub long_name: &'static str,
    /// What the cue sounds like
    pub description: &'static str,
    /// Base timbre
    pub voice: Voice,
    /// Multiplier on the distance-derived frequency
    pub freq_scale: f32,
    /// Lowest frequency the voice may be played at, Hz
    pub freq_floor: f32,
    /// Multiplier on the distance-derived tremolo rate; `None` disables tremolo
    pub tremolo_scale: Option<f32>,
    /// Multiplier on the distance-derived gain
    pub gain_scale: f32,
    /// Low-pass cutoff for [`darken`], if the sector is behind the listener
    pub darken_cutoff: Option<f32>,
    /// Extra effect for modes that embellish
    pub embellishment: Option<Embellishment>,
}

/// One row per sector, indexed by [`Sector::index`].
pub const RECIPES: [Recipe; 6] = [
    Recipe {
        long_name: "Front-Left",
        description: "Warm harmonics + vibrato",
        voice: WARM,
        freq_scale: 1.0,
        freq_floor: 0.0,
        tremolo_scale: Some(1.0),
        gain_scale: 1.0,
        darken_cutoff: None,
        embellishment: Some(Embellishment::Vibrato {
            rate: 3.5,
            depth: 0.15,
        }),
    },
    Recipe {
        long_name: "Front-Right",
        description: "Metallic odd harmonics + chorus",
        voice: METALLIC,
        freq_scale: 1.0,
        freq_floor: 0.0,
        tremolo_scale: Some(1.0),
        gain_scale: 1.0,
        darken_cutoff: None,
        embellishment: Some(Embellishment::Chorus {
            delay_ms: 12.0,
            depth: 0.3,
        }),
    },
    Recipe {
        long_name: "Back-Left",
        description: "Dark warm + deep vibrato",
        voice: WARM,
        freq_scale: 0.9,
        freq_floor: 200.0,
        tremolo_scale: Some(0.7),
        gain_scale: 0.9,
        darken_cutoff: Some(800.0),
        embellishment: Some(Embellishment::Vibrato {
            rate: 2.5,
            depth: 0.25,
        }),
    },
    Recipe {
        long_name: "Back-Right",
        description: "Very dark metallic + long chorus",
        voice: METALLIC,
        freq_scale: 0.85,
        freq_floor: 180.0,
        tremolo_scale: Some(0.6),
        gain_scale: 0.85,
        darken_cutoff: Some(600.0),
        embellishment: Some(Embellishment::Chorus {
            delay_ms: 25.0,
            depth: 0.4,
        }),
    },
    Recipe {
        long_name: "Above",
        description: "Steady sparkling tone",
        voice: SPARKLE,
        freq_scale: 1.0,
        freq_floor: 500.0,
        tremolo_scale: None,
        gain_scale: 0.9,
        darken_cutoff: None,
        embellishment: None,
    },
    Recipe {
        long_name: "Below",
        description: "Descending pulse + sub-bass",
        voice: DESCEND,
        freq_scale: 0.8,
        freq_floor: 200.0,
        tremolo_scale: None,
        gain_scale: 0.85,
        darken_cutoff: None,
        embellishment: None,
    },
];

impl Sector {
    /// This sector's row of [`RECIPES`].
    pub fn recipe(self) -> &'static Recipe {
        &RECIPES[self.index()]
    }
}

/// Renders `voice` at `freq` Hz for `secs` seconds, faded at both ends.
pub fn synthesize(voice: &Voice, freq: f32, secs: f64, sample_rate: u32) -> Vec<f32> {
    let n = crate::audio_buffer::frames_for(sample_rate, secs);
    let fs = sample_rate as f64;
    let freq = freq as f64;
    let mut phase = 0.0;
    let tone = (0..n)
        .map(|i| {
            let t = i as f64 / fs;
            let mut s: f64 = voice
                .partials
                .iter()
                .map(|&(h, w)| w * (h * phase).sin())
                .sum();
            if let Some(sub) = voice.sub_bass {
                let pulse = 0.5 + 0.5 * (2.0 * PI * sub.pulse_hz * t).sin();
                s += sub.level * (2.0 * PI * freq * sub.ratio * t).sin() * pulse;
            }
            let inst = freq * (1.0 - voice.sweep * i as f64 / n as f64);
            phase += 2.0 * PI * inst / fs;
            (s * voice.level) as f32
        })
        .collect();
    apply_fade(tone, sample_rate, FADE_SECS)
}

/// How a render mode bends every recipe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CueStyle {
    /// Multiplier on every tremolo rate
    pub tremolo_rate_scale: f32,
    /// Multiplier on every gain
    pub gain: f32,
    /// Whether to apply the recipe's [`Embellishment`]
    pub embellish: bool,
}

impl Default for CueStyle {
    fn default() -> Self {
        Self {
            tremolo_rate_scale: 1.0,
            gain: 1.0,
            embellish: false,
        }
    }
}

/// The full mono cue for an obstacle in `sector`: voice, tremolo, gain,
/// darkening and embellishment, in that order.
pub fn render_cue(
    sector: Sector,
    params: &AudioParams,
    secs: f64,
    sample_rate: u32,
    style: &CueStyle,
) -> Vec<f32> {
    let recipe = sector.recipe();
    let freq = (params.frequency * recipe.freq_scale).max(recipe.freq_floor);
    let mut sig = synthesize(&recipe.voice, freq, secs, sample_rate);

    if let Some(scale) = recipe.tremolo_scale {
        let rate = params.tremolo_rate * scale * style.tremolo_rate_scale;
        sig = tremolo(sig, sample_rate, rate);
    }

    let gain = params.gain * recipe.gain_scale * style.gain;
    for s in sig.iter_mut() {
        *s *= gain;
    }

    if let Some(cutoff) = recipe.darken_cutoff {
        sig = darken(sig, sample_rate, cutoff);
    }

    match (style.embellish, recipe.embellishment) {
        (true, Some(Embellishment::Vibrato { rate, depth })) => vibrato(sig, sample_rate, rate, depth),
        (true, Some(Embellishment::Chorus { delay_ms, depth })) => {
            chorus(sig, sample_rate, delay_ms, depth)
        }
        _ => sig,
    }
}

/// `n` short taps announcing how many cues follow. One or zero cues need no
/// announcement and give an empty signal.
pub fn count_ping(n: usize, sample_rate: u32, gap_ms: f64) -> Vec<f32> {
    const PING_SECS: f64 = 0.08;
    const PING_HZ: f64 = 420.0;

    if n <= 1 {
        return Vec::new();
    }
    let fs = sample_rate as f64;
    let len = crate::audio_buffer::frames_for(sample_rate, PING_SECS);
    let mut tap: Vec<f32> = (0..len)
        .map(|i| (0.2 * (2.0 * PI * PING_HZ * i as f64 / fs).sin()) as f32)
        .collect();
    let attack = ((0.01 * fs) as usize).min(len);
    let release = ((0.02 * fs) as usize).min(len);
    ramp(&mut tap[..attack], false);
    let tail = len - release;
    ramp(&mut tap[tail..], true);

    let gap = crate::audio_buffer::frames_for(sample_rate, gap_ms / 1000.0);
    let mut out = Vec::with_capacity(n * (len + gap));
    for _ in 0..n {
        out.extend_from_slice(&tap);
        out.extend(std::iter::repeat(0.0).take(gap));
    }
    out
}

/// Linear 0..1 ramp over `seg` (or 1..0 when `down`).
fn ramp(seg: &mut [f32], down: bool) {
    let n = seg.len();
    for (i, s) in seg.iter_mut().enumerate() {
        let x = if n > 1 { i as f32 / (n - 1) as f32 } else { 1.0 };
        *s *= if down { 1.0 - x } else { x };
    }
}

/// A quiet background tone at `freq` Hz whose level wobbles at `mod_rate`
/// Hz, used to hint that more obstacles exist than the one in focus.
pub fn presence_tone(freq: f32, level: f32, mod_rate: f32, secs: f64, sample_rate: u32) -> Vec<f32> {
    let n = crate::audio_buffer::frames_for(sample_rate, secs);
    let fs = sample_rate as f64;
    let (freq, level, mod_rate) = (freq as f64, level as f64, mod_rate as f64);
    let tone = (0..n)
        .map(|i| {
            let t = i as f64 / fs;
            let wobble = 0.7 + 0.3 * (2.0 * PI * mod_rate * t).sin();
            (level * (2.0 * PI * freq * t).sin() * wobble) as f32
        })
        .collect();
    apply_fade(tone, sample_rate, FADE_SECS)
}
