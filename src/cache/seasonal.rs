//! Seasonal TTL policy.
//!
//! Cache lifetimes follow the market calendar: a [`Season`] is derived from
//! the month and a [`SeasonalTtlPolicy`] turns it into a TTL. Two policies
//! exist and disagree on direction for the same season, so the active one
//! is a configuration choice (`cache.seasonal.policy`).

use std::fmt;
use std::str::FromStr;

use jiff::Zoned;
use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::cache::MAX_TTL_SECONDS;
use crate::config::settings::{SeasonMultipliers, SeasonTtls, SeasonalConfig, SeasonalPolicyKind};

/// Calendar season used to tune cache freshness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Spring, Season::Summer, Season::Fall, Season::Winter];

    /// Season for a calendar month (1 = January).
    ///
    /// Months outside `1..=12` are clamped to the nearest valid month.
    pub fn from_month(month: i8) -> Self {
        match month.clamp(1, 12) {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Fall,
            _ => Season::Winter,
        }
    }

    pub fn from_date(date: Date) -> Self {
        Self::from_month(date.month())
    }

    /// Season according to the server's local clock.
    pub fn current() -> Self {
        Self::from_date(Zoned::now().date())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
            Season::Winter => "winter",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "spring" => Ok(Season::Spring),
            "summer" => Ok(Season::Summer),
            "fall" | "autumn" => Ok(Season::Fall),
            "winter" => Ok(Season::Winter),
            _ => Err(format!(
                "Invalid season '{}'. Valid values are: spring, summer, fall, winter",
                s
            )),
        }
    }
}

/// Maps a season to a TTL in seconds.
#[derive(Debug, Clone, PartialEq)]
pub enum SeasonalTtlPolicy {
    /// One absolute TTL per season; the base TTL is ignored.
    Fixed(SeasonTtls),
    /// Base TTL scaled by a per-season factor.
    Multiplier(SeasonMultipliers),
}

impl SeasonalTtlPolicy {
    pub fn from_config(config: &SeasonalConfig) -> Self {
        match config.policy {
            SeasonalPolicyKind::Fixed => SeasonalTtlPolicy::Fixed(config.fixed.clone()),
            SeasonalPolicyKind::Multiplier => {
                SeasonalTtlPolicy::Multiplier(config.multipliers.clone())
            }
        }
    }

    /// TTL for `season`, always within `1..=MAX_TTL_SECONDS`.
    pub fn ttl_for(&self, season: Season, base_ttl: u64) -> u64 {
        let ttl = match self {
            SeasonalTtlPolicy::Fixed(table) => table.get(season),
            SeasonalTtlPolicy::Multiplier(table) => {
                let scaled = (base_ttl as f64 * table.get(season)).round();
                if scaled.is_finite() && scaled > 0.0 {
                    scaled as u64
                } else {
                    0
                }
            }
        };
        ttl.clamp(1, MAX_TTL_SECONDS)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SeasonalTtlPolicy::Fixed(_) => "fixed",
            SeasonalTtlPolicy::Multiplier(_) => "multiplier",
        }
    }
}

impl Default for SeasonalTtlPolicy {
    fn default() -> Self {
        Self::from_config(&SeasonalConfig::default())
    }
}

impl SeasonTtls {
    pub fn get(&self, season: Season) -> u64 {
        match season {
            Season::Spring => self.spring,
            Season::Summer => self.summer,
            Season::Fall => self.fall,
            Season::Winter => self.winter,
        }
    }
}

impl SeasonMultipliers {
    pub fn get(&self, season: Season) -> f64 {
        match season {
            Season::Spring => self.spring,
            Season::Summer => self.summer,
            Season::Fall => self.fall,
            Season::Winter => self.winter,
        }
    }
}
