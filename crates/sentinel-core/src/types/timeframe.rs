//! Bar timeframes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Candle interval of the evaluated series. Also drives the live cycle period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "5m")]
    #[default]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "1d")]
    Daily,
}

impl Timeframe {
    pub const ALL: [Timeframe; 6] = [
        Timeframe::Minute1,
        Timeframe::Minute5,
        Timeframe::Minute15,
        Timeframe::Hour1,
        Timeframe::Hour4,
        Timeframe::Daily,
    ];

    /// Short label, identical to the serde name.
    pub fn label(self) -> &'static str {
        self.parts().0
    }

    pub fn as_secs(self) -> u64 {
        self.parts().1
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_secs(self.as_secs())
    }

    fn parts(self) -> (&'static str, u64) {
        const MINUTE: u64 = 60;
        match self {
            Timeframe::Minute1 => ("1m", MINUTE),
            Timeframe::Minute5 => ("5m", 5 * MINUTE),
            Timeframe::Minute15 => ("15m", 15 * MINUTE),
            Timeframe::Hour1 => ("1h", 60 * MINUTE),
            Timeframe::Hour4 => ("4h", 240 * MINUTE),
            Timeframe::Daily => ("1d", 1440 * MINUTE),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    /// Accepts the short labels plus a few spelled-out aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        let label = match key.as_str() {
            "1min" => "1m",
            "5min" => "5m",
            "15min" => "15m",
            "60m" | "60min" => "1h",
            "day" | "daily" | "24h" => "1d",
            other => other,
        };
        Self::ALL
            .into_iter()
            .find(|tf| tf.label() == label)
            .ok_or_else(|| format!("Unknown timeframe '{}'", s))
    }
}
