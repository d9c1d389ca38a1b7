// src/types.rs - Shared data model for the quad-stochastic signal core
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==================== CANDLES ====================

/// One OHLCV candle. Times are unix seconds, ascending, unique per series.
/// The core only reads candles; it never mutates caller data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// A candle with a non-finite field or high < low is a transient bad
    /// tick; computations skip it rather than erroring.
    pub fn is_well_formed(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
            && self.high >= self.low
    }

    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

// ==================== OSCILLATOR OUTPUT ====================

/// One %K/%D reading, time-aligned 1:1 with the input candle series.
/// `None` marks the warm-up positions before the band has enough history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OscillatorValue {
    pub time: i64,
    pub k: Option<f64>,
    pub d: Option<f64>,
}

impl OscillatorValue {
    pub fn undefined(time: i64) -> Self {
        Self {
            time,
            k: None,
            d: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.k.is_some() && self.d.is_some()
    }
}

/// The four stochastic bands tracked concurrently, ordered fast to slow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BandId {
    Fast,
    Standard,
    Medium,
    Slow,
}

impl BandId {
    pub const ALL: [BandId; 4] = [BandId::Fast, BandId::Standard, BandId::Medium, BandId::Slow];

    /// Slower bands carry more weight when divergences from several bands
    /// compete for the same signal.
    pub fn priority(&self) -> u8 {
        match self {
            BandId::Slow => 3,
            BandId::Medium => 2,
            BandId::Standard => 1,
            BandId::Fast => 0,
        }
    }
}

impl std::fmt::Display for BandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BandId::Fast => "FAST",
            BandId::Standard => "STANDARD",
            BandId::Medium => "MEDIUM",
            BandId::Slow => "SLOW",
        };
        write!(f, "{}", name)
    }
}

/// Latest valid (k, d) pair per band. Ephemeral: recomputed per evaluation,
/// persisted only as part of a Signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuadSnapshot {
    pub fast: BandReading,
    pub standard: BandReading,
    pub medium: BandReading,
    pub slow: BandReading,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandReading {
    pub k: f64,
    pub d: f64,
}

impl QuadSnapshot {
    pub fn get(&self, band: BandId) -> BandReading {
        match band {
            BandId::Fast => self.fast,
            BandId::Standard => self.standard,
            BandId::Medium => self.medium,
            BandId::Slow => self.slow,
        }
    }

    pub fn readings(&self) -> [(BandId, BandReading); 4] {
        [
            (BandId::Fast, self.fast),
            (BandId::Standard, self.standard),
            (BandId::Medium, self.medium),
            (BandId::Slow, self.slow),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OscillatorZone {
    Oversold,
    Neutral,
    Overbought,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RotationStrength {
    None,
    Moderate,
    Strong,
    Extreme,
}

/// Result of the quad-rotation test: all four bands deep in one zone and
/// starting to turn. The highest-conviction trigger in this design.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationResult {
    pub is_oversold_rotation: bool,
    pub is_overbought_rotation: bool,
    pub strength: RotationStrength,
}

impl RotationResult {
    pub fn none() -> Self {
        Self {
            is_oversold_rotation: false,
            is_overbought_rotation: false,
            strength: RotationStrength::None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_oversold_rotation || self.is_overbought_rotation
    }
}

// ==================== SWINGS / DIVERGENCE ====================

/// A local price extremum with the oscillator reading at the same index.
/// Internal to the detectors; never exposed outside the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwingPoint {
    pub index: usize,
    pub time: i64,
    pub price: f64,
    pub oscillator_k: f64,
    pub oscillator_d: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DivergenceKind {
    Bullish,
    Bearish,
    HiddenBullish,
    HiddenBearish,
}

impl DivergenceKind {
    pub fn is_hidden(&self) -> bool {
        matches!(
            self,
            DivergenceKind::HiddenBullish | DivergenceKind::HiddenBearish
        )
    }

    pub fn is_bullish(&self) -> bool {
        matches!(self, DivergenceKind::Bullish | DivergenceKind::HiddenBullish)
    }
}

/// A price-vs-oscillator mismatch across two swing points. Immutable once
/// detected; attached to at most one Signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Divergence {
    pub kind: DivergenceKind,
    pub angle_degrees: f64,
    /// (time, price) of the earlier and the recent swing point.
    pub price_points: [(i64, f64); 2],
    /// (time, %K) of the earlier and the recent swing point.
    pub oscillator_points: [(i64, f64); 2],
    pub candle_span: usize,
    pub band: BandId,
}

// ==================== CHANNEL ====================

/// Price channel derived from recent swing points. Recomputed each
/// evaluation cycle, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelBoundary {
    pub upper: f64,
    pub lower: f64,
    pub midline: f64,
    pub is_valid: bool,
    pub upper_touches: usize,
    pub lower_touches: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelPosition {
    Upper,
    Lower,
    Middle,
    Outside,
}

// ==================== CONFLUENCE ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SignalStrength {
    Weak,
    Moderate,
    Strong,
    Super,
}

impl std::fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SignalStrength::Weak => "WEAK",
            SignalStrength::Moderate => "MODERATE",
            SignalStrength::Strong => "STRONG",
            SignalStrength::Super => "SUPER",
        };
        write!(f, "{}", name)
    }
}

/// The seven independent confirmation conditions plus the derived score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfluenceFlags {
    pub quad_rotation: bool,
    pub channel_extreme: bool,
    pub flag_pattern: bool,
    pub vwap_confluence: bool,
    pub ma_confluence: bool,
    pub volume_spike: bool,
    pub htf_alignment: bool,
    pub score: i32,
    pub strength: SignalStrength,
}

// ==================== SIGNALS ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalStatus {
    Pending,
    Active,
    Partial,
    Target1Hit,
    Target2Hit,
    Target3Hit,
    Stopped,
    Expired,
}

impl SignalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SignalStatus::Stopped | SignalStatus::Target3Hit | SignalStatus::Expired
        )
    }

    /// Position along the target ladder. Transitions only ever move forward.
    pub fn progress(&self) -> u8 {
        match self {
            SignalStatus::Pending => 0,
            SignalStatus::Active | SignalStatus::Partial => 1,
            SignalStatus::Target1Hit => 2,
            SignalStatus::Target2Hit => 3,
            SignalStatus::Target3Hit | SignalStatus::Stopped | SignalStatus::Expired => 4,
        }
    }
}

/// The aggregate root. Created by the factory, mutated only by the
/// lifecycle, moved into the read-only history once closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub symbol: String,
    pub direction: Direction,
    pub strength: SignalStrength,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub target1: f64,
    pub target2: f64,
    pub target3: f64,
    pub divergence: Option<Divergence>,
    pub confluence: ConfluenceFlags,
    pub quad_snapshot: QuadSnapshot,
    pub status: SignalStatus,
    pub risk_reward: f64,
    pub position_size_percent: f64,
    /// Realized pnl in percent of entry; None while nothing has been closed.
    pub pnl_percent: Option<f64>,
    pub exit_price: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Signal {
    /// Price-ordering invariant: LONG stop < entry < t1 < t2 < t3,
    /// reversed for SHORT. A signal failing this must never be emitted.
    pub fn prices_are_ordered(&self) -> bool {
        match self.direction {
            Direction::Long => {
                self.stop_loss < self.entry_price
                    && self.entry_price < self.target1
                    && self.target1 < self.target2
                    && self.target2 < self.target3
            }
            Direction::Short => {
                self.stop_loss > self.entry_price
                    && self.entry_price > self.target1
                    && self.target1 > self.target2
                    && self.target2 > self.target3
            }
        }
    }
}

// ==================== SCANNER OUTPUT ====================

/// One scan-cycle result for one symbol. Fully replaced each cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerResult {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub signals: Vec<Signal>,
    pub has_signal: bool,
    pub best_strength: Option<SignalStrength>,
}

impl ScannerResult {
    pub fn new(symbol: String, signals: Vec<Signal>) -> Self {
        let best_strength = signals.iter().map(|s| s.strength).max();
        Self {
            symbol,
            timestamp: Utc::now(),
            has_signal: !signals.is_empty(),
            signals,
            best_strength,
        }
    }

    pub fn empty(symbol: String) -> Self {
        Self::new(symbol, Vec::new())
    }
}
