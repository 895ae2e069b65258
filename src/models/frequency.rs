use std::{fmt, num::NonZeroU32, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

/// How often an alert polls its advertisement.
///
/// Stored either as a name (`"hourly"`, `"daily"`, `"weekly"`) or as a plain
/// number of minutes. Zero minutes cannot be represented, so every value maps
/// to a positive interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "FrequencyRepr", into = "FrequencyRepr")]
pub enum Frequency {
    Minutes(NonZeroU32),
    Hourly,
    Daily,
    Weekly,
}

impl Frequency {
    pub fn every_minutes(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(Frequency::Minutes)
    }

    pub fn label(&self) -> String {
        match self {
            Frequency::Minutes(n) if n.get() == 1 => "every minute".to_string(),
            Frequency::Minutes(n) => format!("every {n} minutes"),
            Frequency::Hourly => "hourly".to_string(),
            Frequency::Daily => "daily".to_string(),
            Frequency::Weekly => "weekly".to_string(),
        }
    }
}

/// Maps a frequency to the wait between two polls. Pure and always positive.
pub fn calculate_interval(frequency: Frequency) -> Duration {
    const MINUTE: u64 = 60;

    match frequency {
        Frequency::Minutes(n) => Duration::from_secs(u64::from(n.get()) * MINUTE),
        Frequency::Hourly => Duration::from_secs(60 * MINUTE),
        Frequency::Daily => Duration::from_secs(24 * 60 * MINUTE),
        Frequency::Weekly => Duration::from_secs(7 * 24 * 60 * MINUTE),
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Minutes(n) => write!(f, "{n}"),
            Frequency::Hourly => f.write_str("hourly"),
            Frequency::Daily => f.write_str("daily"),
            Frequency::Weekly => f.write_str("weekly"),
        }
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().to_lowercase();

        match raw.as_str() {
            "hourly" => return Ok(Frequency::Hourly),
            "daily" => return Ok(Frequency::Daily),
            "weekly" => return Ok(Frequency::Weekly),
            _ => {}
        }

        let minutes: u32 = raw
            .trim_end_matches('m')
            .parse()
            .map_err(|_| format!("unknown frequency '{s}'"))?;

        Frequency::every_minutes(minutes).ok_or_else(|| "frequency must be at least one minute".to_string())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum FrequencyRepr {
    Minutes(u32),
    Name(String),
}

impl TryFrom<FrequencyRepr> for Frequency {
    type Error = String;

    fn try_from(repr: FrequencyRepr) -> Result<Self, Self::Error> {
        match repr {
            FrequencyRepr::Minutes(n) => {
                Frequency::every_minutes(n).ok_or_else(|| "frequency must be at least one minute".to_string())
            }
            FrequencyRepr::Name(s) => s.parse(),
        }
    }
}

impl From<Frequency> for FrequencyRepr {
    fn from(f: Frequency) -> Self {
        match f {
            Frequency::Minutes(n) => FrequencyRepr::Minutes(n.get()),
            other => FrequencyRepr::Name(other.to_string()),
        }
    }
}
