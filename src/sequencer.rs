//! Arranging obstacle cues in time.
//!
//! A [`Sequencer`] turns a [`SectorMap`] into one stereo [`AudioBuffer`].
//! How cues share the time line is chosen by [`Mode`]; every mode goes
//! through the same cue synthesis and panning, and only the arrangement and
//! the [`CueStyle`] differ.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::audio_buffer::{frames_for, mix_and_limit, AudioBuffer};
use crate::error::{self, SenseNavError};
use crate::geometry::{Obstacle, Sector, SectorMap};
use crate::panner::{pan_stereo, PanConfig};
use crate::params::{distance_to_params_in, DistanceRange};
use crate::salience::{choose_targets, obstacle_score};
use crate::synth::{count_ping, presence_tone, render_cue, CueStyle};

/// Fixed sector importance used to break distance ties and to pick a focus
/// when nothing is very close.
pub const SECTOR_PRIORITY: [Sector; 6] = [
    Sector::UP,
    Sector::DOWN,
    Sector::FL,
    Sector::FR,
    Sector::BL,
    Sector::BR,
];

fn priority_index(sector: Sector) -> usize {
    SECTOR_PRIORITY
        .iter()
        .position(|&s| s == sector)
        .unwrap_or(SECTOR_PRIORITY.len())
}

/// How cues are arranged in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Top targets one after another, each in its own short segment
    Sequential,
    /// A single focus obstacle over a quiet background presence tone
    #[default]
    Priority,
    /// Every obstacle in its own slot of the requested duration
    Unified,
    /// Every obstacle at once, mixed and limited
    All,
}

impl Mode {
    /// Every mode.
    pub const ALL: [Mode; 4] = [Mode::Sequential, Mode::Priority, Mode::Unified, Mode::All];

    /// Lowercase name, as accepted by [`FromStr`].
    pub const fn name(self) -> &'static str {
        match self {
            Mode::Sequential => "sequential",
            Mode::Priority => "priority",
            Mode::Unified => "unified",
            Mode::All => "all",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown mode {s:?}, expected sequential, priority, unified or all"))
    }
}

/// Settings for [`Mode::Sequential`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequentialPolicy {
    /// Length of each target's cue, seconds
    pub segment_secs: f64,
    /// Silence after each cue, ms
    pub gap_ms: f64,
    /// Silence after each count-ping tap, ms
    pub ping_gap_ms: f64,
    /// Announce the number of targets before playing them
    pub announce_count: bool,
    /// At most this many targets are played
    pub max_targets: usize,
    /// Trim or pad the sweep to the requested duration
    pub fit_to_duration: bool,
    /// Peak ceiling for the finished sweep
    pub ceiling: f32,
}

impl Default for SequentialPolicy {
    fn default() -> Self {
        Self {
            segment_secs: 2.0,
            gap_ms: 300.0,
            ping_gap_ms: 120.0,
            announce_count: true,
            max_targets: 6,
            fit_to_duration: false,
            ceiling: 0.95,
        }
    }
}

/// Settings for [`Mode::Priority`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityPolicy {
    /// The closest obstacle is the focus whenever it is nearer than this, m
    pub near_threshold: f64,
    /// Gain multiplier on the focus cue
    pub gain_boost: f32,
    /// Level of the background presence tone
    pub presence_level: f32,
    /// Pitch of the background presence tone, Hz
    pub presence_freq: f32,
    /// Presence modulation rate added per other obstacle, Hz
    pub presence_rate_per_obstacle: f32,
}

impl Default for PriorityPolicy {
    fn default() -> Self {
        Self {
            near_threshold: 1.0,
            gain_boost: 1.2,
            presence_level: 0.15,
            presence_freq: 200.0,
            presence_rate_per_obstacle: 0.5,
        }
    }
}

/// How [`Mode::Unified`] splits the time line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SlotAllocation {
    /// Every obstacle gets the same share
    #[default]
    Even,
    /// Shares are proportional to salience score
    Salience,
}

/// Settings for [`Mode::Unified`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UnifiedPolicy {
    /// How slot lengths are chosen
    pub allocation: SlotAllocation,
}

/// Settings for [`Mode::All`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixPolicy {
    /// Peak ceiling of the mix, dBFS
    pub limit_db: f32,
    /// Tremolo is slowed down by this factor when everything plays at once
    pub tremolo_rate_scale: f32,
}

impl Default for MixPolicy {
    fn default() -> Self {
        Self {
            limit_db: -3.0,
            tremolo_rate_scale: 0.3,
        }
    }
}

/// Everything the renderer needs to know. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Output sample rate, Hz
    pub sample_rate: u32,
    /// Requested output length, seconds
    pub duration: f64,
    /// Arrangement
    pub mode: Mode,
    /// Listener geometry
    pub pan: PanConfig,
    /// Distance range over which cues change
    pub distance_range: DistanceRange,
    /// See [`SequentialPolicy`]
    pub sequential: SequentialPolicy,
    /// See [`PriorityPolicy`]
    pub priority: PriorityPolicy,
    /// See [`UnifiedPolicy`]
    pub unified: UnifiedPolicy,
    /// See [`MixPolicy`]
    pub mix: MixPolicy,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            duration: 8.0,
            mode: Mode::default(),
            pan: PanConfig::default(),
            distance_range: DistanceRange::default(),
            sequential: SequentialPolicy::default(),
            priority: PriorityPolicy::default(),
            unified: UnifiedPolicy::default(),
            mix: MixPolicy::default(),
        }
    }
}

impl RenderConfig {
    /// Rejects values the renderer cannot work with.
    pub fn validate(&self) -> error::Result<()> {
        let invalid = |why: String| Err(SenseNavError::InvalidConfig(why));
        if self.sample_rate == 0 {
            return invalid("sample rate must be positive".to_owned());
        }
        if !(self.duration.is_finite() && self.duration >= 0.0) {
            return invalid(format!("duration must be a non-negative number of seconds, got {}", self.duration));
        }
        if !self.distance_range.is_valid() {
            let DistanceRange { min, max } = self.distance_range;
            return invalid(format!("distance range {min}..{max} is not an ordered pair of distances"));
        }
        Ok(())
    }
}

/// Picks the obstacle [`Mode::Priority`] focuses on: the closest one if it
/// is within the near threshold, otherwise the first present sector in
/// [`SECTOR_PRIORITY`].
pub fn select_primary<'a>(picked: &'a SectorMap, policy: &PriorityPolicy) -> Option<&'a Obstacle> {
    let closest = picked.closest()?;
    if closest.distance < policy.near_threshold {
        return Some(closest);
    }
    SECTOR_PRIORITY
        .iter()
        .find_map(|&s| picked.get(s))
        .or(Some(closest))
}

/// Renders obstacle maps to stereo according to a [`RenderConfig`].
#[derive(Debug, Clone, Default)]
pub struct Sequencer {
    config: RenderConfig,
}

impl Sequencer {
    /// Creates a sequencer that renders with `config`.
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Renders `picked` in the configured mode.
    pub fn render(&self, picked: &SectorMap) -> AudioBuffer {
        self.render_mode(picked, self.config.mode)
    }

    /// Renders `picked` in `mode`, overriding the configured one. An empty
    /// map gives silence of the requested duration in every mode.
    pub fn render_mode(&self, picked: &SectorMap, mode: Mode) -> AudioBuffer {
        if picked.is_empty() {
            info!("{mode} : no obstacles in sectors, rendering silence.");
            return AudioBuffer::silence_secs(self.config.sample_rate, self.config.duration);
        }
        info!("{mode} : rendering {} obstacle(s).", picked.len());
        match mode {
            Mode::Sequential => self.sequential(picked),
            Mode::Priority => self.priority(picked),
            Mode::Unified => self.unified(picked),
            Mode::All => self.all(picked),
        }
    }

    fn mono_cue(&self, obstacle: &Obstacle, secs: f64, style: &CueStyle) -> Vec<f32> {
        let params = distance_to_params_in(obstacle.distance, &self.config.distance_range);
        debug!(
            "{:5} | r={:.2}m az={:+5.1}° el={:+5.1}° | {:.0}Hz, trem {:.1}Hz, gain {:.2}",
            obstacle.sector.name(),
            obstacle.distance,
            obstacle.azimuth.to_degrees(),
            obstacle.elevation.to_degrees(),
            params.frequency,
            params.tremolo_rate,
            params.gain,
        );
        render_cue(obstacle.sector, &params, secs, self.config.sample_rate, style)
    }

    /// Elevation is conveyed by the sector's timbre, so panning is
    /// horizontal only.
    fn pan(&self, mono: &[f32], obstacle: &Obstacle) -> AudioBuffer {
        pan_stereo(mono, obstacle.azimuth, 0.0, self.config.sample_rate, &self.config.pan)
    }

    fn sequential(&self, picked: &SectorMap) -> AudioBuffer {
        let policy = &self.config.sequential;
        let fs = self.config.sample_rate;
        let targets = choose_targets(picked, policy.max_targets);

        let mut sweep = AudioBuffer::silence(fs, 0);
        if policy.announce_count && targets.len() > 1 {
            sweep.append(AudioBuffer::dual_mono(
                fs,
                &count_ping(targets.len(), fs, policy.ping_gap_ms),
            ));
        }

        let style = CueStyle::default();
        for target in &targets {
            let mono = self.mono_cue(&target.obstacle, policy.segment_secs, &style);
            sweep.append(self.pan(&mono, &target.obstacle));
            sweep.append(AudioBuffer::silence_secs(fs, policy.gap_ms / 1000.0));
        }

        if policy.fit_to_duration {
            sweep.resize(frames_for(fs, self.config.duration));
        }
        sweep.limit_peak(policy.ceiling);
        sweep
    }

    fn priority(&self, picked: &SectorMap) -> AudioBuffer {
        let policy = &self.config.priority;
        let fs = self.config.sample_rate;
        let duration = self.config.duration;
        let Some(primary) = select_primary(picked, policy) else {
            return AudioBuffer::silence_secs(fs, duration);
        };
        info!("priority : focusing on {}", primary.sector);

        let style = CueStyle {
            gain: policy.gain_boost,
            embellish: true,
            ..CueStyle::default()
        };
        let mut mono = self.mono_cue(primary, duration, &style);

        let others = picked.len() - 1;
        if others > 0 {
            debug!("priority : background presence for {others} other obstacle(s)");
            let presence = presence_tone(
                policy.presence_freq,
                policy.presence_level,
                others as f32 * policy.presence_rate_per_obstacle,
                duration,
                fs,
            );
            if presence.len() > mono.len() {
                mono.resize(presence.len(), 0.0);
            }
            for (m, p) in mono.iter_mut().zip(&presence) {
                *m += p;
            }
        }

        self.pan(&mono, primary)
    }

    fn unified(&self, picked: &SectorMap) -> AudioBuffer {
        let fs = self.config.sample_rate;
        let total = frames_for(fs, self.config.duration);

        let mut ordered: Vec<&Obstacle> = picked.iter().collect();
        ordered.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(priority_index(a.sector).cmp(&priority_index(b.sector)))
        });

        let weights: Vec<f64> = match self.config.unified.allocation {
            SlotAllocation::Even => vec![1.0; ordered.len()],
            SlotAllocation::Salience => ordered
                .iter()
                .map(|o| obstacle_score(o.distance, o.azimuth, o.elevation))
                .collect(),
        };
        let sum: f64 = weights.iter().sum();

        let style = CueStyle {
            embellish: true,
            ..CueStyle::default()
        };
        let mut out = AudioBuffer::silence(fs, total);
        let mut acc = 0.0;
        for (obstacle, weight) in ordered.iter().zip(&weights) {
            let start = (total as f64 * acc / sum) as usize;
            acc += weight;
            let end = ((total as f64 * acc / sum) as usize).min(total);
            let frames = end.saturating_sub(start);
            if frames == 0 {
                continue;
            }
            debug!(
                "unified : {} in frames {start}..{end}",
                obstacle.sector
            );
            let mono = self.mono_cue(obstacle, frames as f64 / fs as f64, &style);
            let mut slot = self.pan(&mono, obstacle);
            slot.resize(frames);
            out.overwrite_at(start, &slot);
        }
        out
    }

    fn all(&self, picked: &SectorMap) -> AudioBuffer {
        let policy = &self.config.mix;
        let style = CueStyle {
            tremolo_rate_scale: policy.tremolo_rate_scale,
            embellish: true,
            ..CueStyle::default()
        };
        let stems: Vec<AudioBuffer> = picked
            .iter()
            .map(|o| self.pan(&self.mono_cue(o, self.config.duration, &style), o))
            .collect();
        let mut mix = mix_and_limit(self.config.sample_rate, &stems, policy.limit_db);
        mix.resize(frames_for(self.config.sample_rate, self.config.duration));
        mix
    }
}
