//! Weather system: Markov chain with smoothing, prequeue, and history.
//!
//! Conditions advance on a discrete-time Markov chain; each condition runs
//! for a sampled duration, then the next condition comes from the forced
//! prequeue (if any) or the transition matrix row. The effective speed
//! multiplier interpolates linearly between conditions over a configured
//! smoothing window so consumers never see a step change.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::data::WeatherData;
use crate::numbers::round3;

pub(crate) const INTENSITY_MIN: f64 = 0.25;
pub(crate) const INTENSITY_MAX: f64 = 1.0;

/// Weather conditions affecting courier movement speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherKind {
    #[default]
    Clear,
    Clouds,
    RainLight,
    Rain,
    Storm,
    Fog,
    Wind,
    Heat,
    Cold,
    Snow,
}

/// Fixed iteration order for sampling, so weighted walks are deterministic
/// for a given RNG stream.
pub const WEATHER_ORDER: [WeatherKind; 10] = [
    WeatherKind::Clear,
    WeatherKind::Clouds,
    WeatherKind::RainLight,
    WeatherKind::Rain,
    WeatherKind::Storm,
    WeatherKind::Fog,
    WeatherKind::Wind,
    WeatherKind::Heat,
    WeatherKind::Cold,
    WeatherKind::Snow,
];

impl WeatherKind {
    /// Base speed multiplier at full intensity.
    #[must_use]
    pub const fn base_multiplier(self) -> f64 {
        match self {
            Self::Clear => 1.0,
            Self::Clouds => 0.95,
            Self::RainLight => 0.85,
            Self::Rain => 0.75,
            Self::Storm => 0.5,
            Self::Fog => 0.8,
            Self::Wind => 0.85,
            Self::Heat => 0.8,
            Self::Cold => 0.85,
            Self::Snow => 0.6,
        }
    }

    /// Flat stamina surcharge per completed cell at full intensity.
    #[must_use]
    pub const fn stamina_penalty(self) -> f64 {
        match self {
            Self::Clear | Self::Clouds => 0.0,
            Self::RainLight | Self::Wind => 0.1,
            Self::Fog => 0.05,
            Self::Rain | Self::Heat => 0.2,
            Self::Cold => 0.15,
            Self::Snow => 0.25,
            Self::Storm => 0.3,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Clouds => "clouds",
            Self::RainLight => "rain_light",
            Self::Rain => "rain",
            Self::Storm => "storm",
            Self::Fog => "fog",
            Self::Wind => "wind",
            Self::Heat => "heat",
            Self::Cold => "cold",
            Self::Snow => "snow",
        }
    }
}

impl fmt::Display for WeatherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeatherKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clear" => Ok(Self::Clear),
            "clouds" => Ok(Self::Clouds),
            "rain_light" => Ok(Self::RainLight),
            "rain" => Ok(Self::Rain),
            "storm" => Ok(Self::Storm),
            "fog" => Ok(Self::Fog),
            "wind" => Ok(Self::Wind),
            "heat" => Ok(Self::Heat),
            "cold" => Ok(Self::Cold),
            "snow" => Ok(Self::Snow),
            _ => Err(()),
        }
    }
}

/// Configuration errors surfaced at load time.
#[derive(Debug, Error, PartialEq)]
pub enum WeatherConfigError {
    #[error("negative transition weight from {from} to {to}")]
    NegativeWeight { from: WeatherKind, to: WeatherKind },
    #[error("duration window is invalid: min {min}, max {max}")]
    InvalidDurations { min: f64, max: f64 },
    #[error("smoothing window must be finite and non-negative: {0}")]
    InvalidSmoothing(f64),
}

/// Weather system configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// condition -> (condition -> probability weight)
    #[serde(default)]
    pub transitions: HashMap<WeatherKind, HashMap<WeatherKind, f64>>,
    #[serde(default = "default_min_duration")]
    pub min_duration: f64,
    #[serde(default = "default_max_duration")]
    pub max_duration: f64,
    #[serde(default = "default_smooth_seconds")]
    pub transition_smooth_seconds: f64,
    /// Cap on the undo history; `None` keeps every transition.
    #[serde(default)]
    pub history_limit: Option<usize>,
}

const fn default_min_duration() -> f64 {
    45.0
}

const fn default_max_duration() -> f64 {
    120.0
}

const fn default_smooth_seconds() -> f64 {
    4.0
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            transitions: default_transitions(),
            min_duration: default_min_duration(),
            max_duration: default_max_duration(),
            transition_smooth_seconds: default_smooth_seconds(),
            history_limit: None,
        }
    }
}

fn default_transitions() -> HashMap<WeatherKind, HashMap<WeatherKind, f64>> {
    use WeatherKind::{Clear, Clouds, Cold, Fog, Heat, Rain, RainLight, Snow, Storm, Wind};
    let rows: [(WeatherKind, &[(WeatherKind, f64)]); 10] = [
        (Clear, &[(Clear, 5.0), (Clouds, 3.0), (Wind, 1.0), (Heat, 1.0)]),
        (Clouds, &[(Clear, 3.0), (Clouds, 3.0), (RainLight, 2.0), (Fog, 1.0)]),
        (RainLight, &[(Clouds, 3.0), (RainLight, 2.0), (Rain, 2.0)]),
        (Rain, &[(RainLight, 3.0), (Rain, 2.0), (Storm, 1.5), (Clouds, 1.0)]),
        (Storm, &[(Rain, 4.0), (Clouds, 2.0), (Storm, 1.0)]),
        (Fog, &[(Fog, 2.0), (Clouds, 3.0), (Clear, 2.0)]),
        (Wind, &[(Wind, 2.0), (Clear, 3.0), (Clouds, 2.0)]),
        (Heat, &[(Heat, 3.0), (Clear, 4.0), (Wind, 1.0)]),
        (Cold, &[(Cold, 3.0), (Snow, 2.0), (Clear, 2.0)]),
        (Snow, &[(Snow, 2.0), (Cold, 3.0), (Clouds, 1.0)]),
    ];
    rows.into_iter()
        .map(|(from, tos)| (from, tos.iter().copied().collect()))
        .collect()
}

impl WeatherConfig {
    /// Built-in defaults used when the feed omits weather data.
    #[must_use]
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or validation fails.
    pub fn from_json(json_str: &str) -> Result<Self, String> {
        let config: Self =
            serde_json::from_str(json_str).map_err(|e| format!("JSON parse error: {e}"))?;
        config.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }

    /// Build configuration from the raw weather feed payload. Unknown
    /// condition names and negative weights are dropped; an empty matrix
    /// falls back to the built-in defaults.
    #[must_use]
    pub fn from_data(data: &WeatherData) -> Self {
        let mut transitions: HashMap<WeatherKind, HashMap<WeatherKind, f64>> = HashMap::new();
        for (from_raw, row) in &data.transitions {
            let Ok(from) = WeatherKind::from_str(from_raw) else {
                continue;
            };
            let parsed: HashMap<WeatherKind, f64> = row
                .iter()
                .filter_map(|(to_raw, weight)| {
                    let to = WeatherKind::from_str(to_raw).ok()?;
                    (weight.is_finite() && *weight > 0.0).then_some((to, *weight))
                })
                .collect();
            if !parsed.is_empty() {
                transitions.insert(from, parsed);
            }
        }
        let mut cfg = Self::default();
        if !transitions.is_empty() {
            cfg.transitions = transitions;
        }
        cfg
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `WeatherConfigError` when any field violates the documented
    /// bounds.
    pub fn validate(&self) -> Result<(), WeatherConfigError> {
        for (from, row) in &self.transitions {
            for (to, weight) in row {
                if *weight < 0.0 {
                    return Err(WeatherConfigError::NegativeWeight {
                        from: *from,
                        to: *to,
                    });
                }
            }
        }
        if !(self.min_duration > 0.0 && self.max_duration >= self.min_duration) {
            return Err(WeatherConfigError::InvalidDurations {
                min: self.min_duration,
                max: self.max_duration,
            });
        }
        if !self.transition_smooth_seconds.is_finite() || self.transition_smooth_seconds < 0.0 {
            return Err(WeatherConfigError::InvalidSmoothing(
                self.transition_smooth_seconds,
            ));
        }
        Ok(())
    }
}

/// A forced upcoming condition, queued ahead of Markov sampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedWeather {
    pub kind: WeatherKind,
    #[serde(default)]
    pub intensity: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
}

/// The externally readable weather view. Rendering and speed calculations
/// read this; internal engine fields are not exposed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub condition: WeatherKind,
    pub intensity: f64,
    pub multiplier: f64,
    pub time_left: f64,
    pub transitioning: bool,
}

/// Markov weather engine. RNG is supplied by the caller per update, so the
/// engine itself serializes cleanly into snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherEngine {
    cfg: WeatherConfig,
    current: WeatherKind,
    intensity: f64,
    multiplier: f64,
    target_multiplier: f64,
    smooth_from: f64,
    smooth_elapsed: f64,
    transitioning: bool,
    elapsed: f64,
    duration: f64,
    history: Vec<(WeatherKind, f64)>,
    prequeue: VecDeque<QueuedWeather>,
}

impl Default for WeatherEngine {
    fn default() -> Self {
        Self::new(WeatherConfig::default())
    }
}

impl WeatherEngine {
    /// Start in clear weather at full intensity; the first elapsed duration
    /// triggers a sampled transition.
    #[must_use]
    pub fn new(cfg: WeatherConfig) -> Self {
        let start = WeatherKind::Clear;
        let multiplier = start.base_multiplier() * INTENSITY_MAX;
        let duration = cfg.min_duration;
        Self {
            cfg,
            current: start,
            intensity: INTENSITY_MAX,
            multiplier,
            target_multiplier: multiplier,
            smooth_from: multiplier,
            smooth_elapsed: 0.0,
            transitioning: false,
            elapsed: 0.0,
            duration,
            history: Vec::new(),
            prequeue: VecDeque::new(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &WeatherConfig {
        &self.cfg
    }

    #[must_use]
    pub const fn condition(&self) -> WeatherKind {
        self.current
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub fn prequeue_len(&self) -> usize {
        self.prequeue.len()
    }

    /// Queue a forced future condition (FIFO, ahead of Markov sampling).
    pub fn enqueue_forced(&mut self, queued: QueuedWeather) {
        self.prequeue.push_back(queued);
    }

    /// Load scripted bursts from the weather feed into the prequeue.
    /// Unknown condition names are skipped.
    pub fn load_bursts(&mut self, data: &WeatherData) {
        for burst in &data.bursts {
            if let Ok(kind) = WeatherKind::from_str(&burst.condition) {
                self.prequeue.push_back(QueuedWeather {
                    kind,
                    intensity: burst.intensity,
                    duration: burst.duration,
                });
            }
        }
    }

    /// Advance the weather clock by `dt` simulated seconds.
    pub fn update<R: Rng>(&mut self, dt: f64, rng: &mut R) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.elapsed += dt;
        if self.transitioning {
            self.advance_smoothing(dt);
        }
        if self.elapsed >= self.duration {
            self.transition(rng);
        }
    }

    fn advance_smoothing(&mut self, dt: f64) {
        self.smooth_elapsed += dt;
        let window = self.cfg.transition_smooth_seconds;
        if window <= 0.0 || self.smooth_elapsed >= window {
            self.multiplier = self.target_multiplier;
            self.transitioning = false;
            return;
        }
        let t = self.smooth_elapsed / window;
        self.multiplier = self.smooth_from + (self.target_multiplier - self.smooth_from) * t;
    }

    fn transition<R: Rng>(&mut self, rng: &mut R) {
        let forced = self.prequeue.pop_front();
        let next = forced
            .as_ref()
            .map_or_else(|| sample_next(self.current, &self.cfg, rng), |q| q.kind);

        self.push_history(self.current, self.intensity);

        let intensity = forced
            .as_ref()
            .and_then(|q| q.intensity)
            .map_or_else(
                || rng.gen_range(INTENSITY_MIN..=INTENSITY_MAX),
                |i| i.clamp(INTENSITY_MIN, INTENSITY_MAX),
            );
        let duration = forced
            .as_ref()
            .and_then(|q| q.duration)
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or_else(|| rng.gen_range(self.cfg.min_duration..=self.cfg.max_duration));

        self.smooth_from = self.multiplier;
        self.current = next;
        self.intensity = intensity;
        self.target_multiplier = next.base_multiplier() * intensity;
        self.smooth_elapsed = 0.0;
        self.elapsed = 0.0;
        self.duration = duration;
        if self.cfg.transition_smooth_seconds > 0.0 {
            self.transitioning = true;
        } else {
            self.multiplier = self.target_multiplier;
            self.transitioning = false;
        }
    }

    fn push_history(&mut self, kind: WeatherKind, intensity: f64) {
        self.history.push((kind, intensity));
        if let Some(limit) = self.cfg.history_limit
            && self.history.len() > limit
        {
            let overflow = self.history.len() - limit;
            self.history.drain(..overflow);
        }
    }

    /// Immediately set condition and intensity, bypassing smoothing and the
    /// matrix. Used for deterministic testing and for resuming a saved
    /// game's frozen weather.
    pub fn force_state(&mut self, kind: WeatherKind, intensity: Option<f64>, save_history: bool) {
        if save_history {
            self.push_history(self.current, self.intensity);
        }
        let intensity = intensity
            .map(|i| i.clamp(INTENSITY_MIN, INTENSITY_MAX))
            .unwrap_or(self.intensity);
        self.current = kind;
        self.intensity = intensity;
        self.multiplier = kind.base_multiplier() * intensity;
        self.target_multiplier = self.multiplier;
        self.smooth_from = self.multiplier;
        self.smooth_elapsed = 0.0;
        self.transitioning = false;
        self.elapsed = 0.0;
        if self.duration <= 0.0 {
            self.duration = self.cfg.min_duration;
        }
    }

    /// Pop the most recent history entry and restore it. Returns false when
    /// the history is empty.
    pub fn undo(&mut self) -> bool {
        let Some((kind, intensity)) = self.history.pop() else {
            return false;
        };
        self.force_state(kind, Some(intensity), false);
        true
    }

    /// The only data external consumers may read.
    #[must_use]
    pub fn report(&self) -> WeatherReport {
        WeatherReport {
            condition: self.current,
            intensity: round3(self.intensity),
            multiplier: round3(self.multiplier),
            time_left: (self.duration - self.elapsed).max(0.0),
            transitioning: self.transitioning,
        }
    }

    /// Flat stamina surcharge for movement under the current conditions,
    /// scaled by intensity.
    #[must_use]
    pub fn stamina_penalty(&self) -> f64 {
        self.current.stamina_penalty() * self.intensity
    }

    pub(crate) fn history(&self) -> &[(WeatherKind, f64)] {
        &self.history
    }

    pub(crate) fn prequeue(&self) -> &VecDeque<QueuedWeather> {
        &self.prequeue
    }

    pub(crate) fn restore_queues(
        &mut self,
        history: Vec<(WeatherKind, f64)>,
        prequeue: VecDeque<QueuedWeather>,
    ) {
        self.history = history;
        self.prequeue = prequeue;
    }
}

/// Sample the next condition from the matrix row for `current`.
///
/// A missing row, or a row whose weights are all zero or negative, falls
/// back to a uniform choice among all defined conditions so malformed
/// externally-supplied matrices never crash the engine.
pub fn sample_next<R: Rng>(current: WeatherKind, cfg: &WeatherConfig, rng: &mut R) -> WeatherKind {
    let Some(row) = cfg.transitions.get(&current) else {
        return uniform_pick(rng);
    };
    let total: f64 = WEATHER_ORDER
        .iter()
        .filter_map(|kind| row.get(kind))
        .filter(|w| **w > 0.0)
        .sum();
    if total <= 0.0 {
        return uniform_pick(rng);
    }
    let mut roll = rng.gen_range(0.0..total);
    for kind in WEATHER_ORDER {
        let weight = row.get(&kind).copied().unwrap_or(0.0);
        if weight <= 0.0 {
            continue;
        }
        if roll < weight {
            return kind;
        }
        roll -= weight;
    }
    // Floating-point edge: return the last weighted entry.
    WEATHER_ORDER
        .iter()
        .rev()
        .find(|kind| row.get(kind).copied().unwrap_or(0.0) > 0.0)
        .copied()
        .unwrap_or(current)
}

fn uniform_pick<R: Rng>(rng: &mut R) -> WeatherKind {
    WEATHER_ORDER[rng.gen_range(0..WEATHER_ORDER.len())]
}
