//! Discrete trading signal from indicator votes.
//!
//! [`classify`] is a pure function of [`SignalInputs`]: each indicator and
//! the short-term momentum cast at most one bullish or bearish vote, the
//! vote counts pick the [`SignalLabel`], and strength/confidence are fixed
//! formulas over the same counts and the RSI.

use std::fmt;

use serde::Serialize;

use crate::indicators::{IndicatorSnapshot, Macd, TrendDirection};

const RSI_OVERSOLD: f64 = 30.0;
const RSI_OVERBOUGHT: f64 = 70.0;
const MOMENTUM_24H_PCT: f64 = 3.0;
const MOMENTUM_7D_PCT: f64 = 5.0;

/// Votes available in total (RSI, MACD, trend, momentum).
const MAX_VOTES: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalLabel {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl SignalLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalLabel::StrongBuy => "STRONG_BUY",
            SignalLabel::Buy => "BUY",
            SignalLabel::Hold => "HOLD",
            SignalLabel::Sell => "SELL",
            SignalLabel::StrongSell => "STRONG_SELL",
        }
    }
}

impl fmt::Display for SignalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signal {
    pub label: SignalLabel,
    /// 0..=100
    pub strength: u8,
    /// 0..=100
    pub confidence: u8,
    pub reasoning: String,
    pub timeframe: String,
}

/// Everything the classifier looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalInputs {
    pub rsi: f64,
    pub macd: Macd,
    pub trend: TrendDirection,
    /// Percent change over 24 hours.
    pub change_24h: f64,
    /// Percent change over 7 days.
    pub change_7d: f64,
}

impl SignalInputs {
    pub fn new(indicators: &IndicatorSnapshot, change_24h: f64, change_7d: f64) -> Self {
        Self {
            rsi: indicators.rsi,
            macd: indicators.macd,
            trend: indicators.trend.direction,
            change_24h,
            change_7d,
        }
    }
}

/// Bullish and bearish vote tally with the reasons that produced it.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Votes {
    pub bullish: u8,
    pub bearish: u8,
    momentum: bool,
    reasons: Vec<String>,
}

impl Votes {
    fn bull(&mut self, reason: String) {
        self.bullish += 1;
        self.reasons.push(reason);
    }

    fn bear(&mut self, reason: String) {
        self.bearish += 1;
        self.reasons.push(reason);
    }
}

/// Tallies one vote per indicator.
pub fn tally(inputs: &SignalInputs) -> Votes {
    let mut votes = Votes::default();

    if inputs.rsi < RSI_OVERSOLD {
        votes.bull(format!("RSI oversold at {:.1}", inputs.rsi));
    } else if inputs.rsi > RSI_OVERBOUGHT {
        votes.bear(format!("RSI overbought at {:.1}", inputs.rsi));
    }

    let Macd {
        macd,
        signal,
        histogram,
    } = inputs.macd;
    if macd > signal && histogram > 0.0 {
        votes.bull("MACD above signal line".to_string());
    } else if macd < signal && histogram < 0.0 {
        votes.bear("MACD below signal line".to_string());
    }

    match inputs.trend {
        TrendDirection::Bullish => votes.bull("SAR trend bullish".to_string()),
        TrendDirection::Bearish => votes.bear("SAR trend bearish".to_string()),
        TrendDirection::Neutral => {}
    }

    if inputs.change_24h > MOMENTUM_24H_PCT && inputs.change_7d > MOMENTUM_7D_PCT {
        votes.momentum = true;
        votes.bull(format!(
            "momentum up {:+.1}% 24h / {:+.1}% 7d",
            inputs.change_24h, inputs.change_7d
        ));
    } else if inputs.change_24h < -MOMENTUM_24H_PCT && inputs.change_7d < -MOMENTUM_7D_PCT {
        votes.momentum = true;
        votes.bear(format!(
            "momentum down {:+.1}% 24h / {:+.1}% 7d",
            inputs.change_24h, inputs.change_7d
        ));
    }

    votes
}

/// Maps vote counts to a label. Bullish thresholds are checked first.
pub fn label_for(votes: &Votes) -> SignalLabel {
    if votes.bullish >= 3 {
        SignalLabel::StrongBuy
    } else if votes.bullish >= 2 {
        SignalLabel::Buy
    } else if votes.bearish >= 3 {
        SignalLabel::StrongSell
    } else if votes.bearish >= 2 {
        SignalLabel::Sell
    } else {
        SignalLabel::Hold
    }
}

/// Classifies indicator readings and momentum into a [`Signal`].
pub fn classify(inputs: &SignalInputs) -> Signal {
    let votes = tally(inputs);
    let label = label_for(&votes);

    let margin = f64::from(votes.bullish.abs_diff(votes.bearish));
    let rsi_distance = (inputs.rsi - 50.0).abs();
    let strength = (20.0 * margin + 0.4 * rsi_distance).min(100.0);

    let dominant = f64::from(votes.bullish.max(votes.bearish));
    let total = f64::from(votes.bullish + votes.bearish);
    let agreement = if total > 0.0 { dominant / total } else { 0.5 };
    let coverage = dominant / f64::from(MAX_VOTES);
    let confidence = 100.0 * (0.5 * agreement + 0.5 * coverage);

    let reasoning = if votes.reasons.is_empty() {
        format!("No indicator consensus; RSI neutral at {:.1}", inputs.rsi)
    } else {
        votes.reasons.join("; ")
    };

    let timeframe = if votes.momentum { "1D" } else { "4H" };

    Signal {
        label,
        strength: to_percent(strength),
        confidence: to_percent(confidence),
        reasoning,
        timeframe: timeframe.to_string(),
    }
}

fn to_percent(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}
