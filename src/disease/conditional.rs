//! Probabilities and durations that may depend on a person's attributes.
//!
//! Both are read from short textual specifications, parsed once when the model is built:
//!
//! * probability: `"0.46"` or `"age{0-29: 0.02, 30-49: 0.1, 50-100: 0.3}"`
//! * duration (days): `"Triangular(2.5, 3.4, 3.8)"`, `"Uniform(1, 2)"`, `"Exponential(4)"`,
//!   `"Constant(3)"`, `"3"`, or an age map of any of those.
//!
//! Age bands are inclusive at both ends and tried in the order written, so with overlapping
//! bands the first one listed wins. A probability for an age outside every band is 0.0; a
//! duration for an age outside every band is zero.
use std::str::FromStr;

use rand::distr::{Distribution, Uniform};
use rand::Rng;
use rand_distr::{Exp, Triangular};
use serde::{Deserialize, Deserializer};

use crate::error::ContagionError;
use crate::people::PersonAttributes;

pub const HOURS_PER_DAY: f64 = 24.0;

/// A probability evaluated against a person.
pub trait ProbabilityFn {
    fn probability(&self, attributes: &PersonAttributes) -> f64;
}

/// A duration distribution selected for a person. Samples are in hours.
pub trait DurationFn {
    fn distribution(&self, attributes: &PersonAttributes) -> &DurationDistribution;
}

#[derive(Clone, Debug, PartialEq)]
pub struct AgeBand<T> {
    pub min_age: u8,
    pub max_age: u8,
    pub value: T,
}

impl<T> AgeBand<T> {
    fn contains(&self, age: u8) -> bool {
        (self.min_age..=self.max_age).contains(&age)
    }
}

fn find_band<T>(bands: &[AgeBand<T>], age: u8) -> Option<&T> {
    bands
        .iter()
        .find(|band| band.contains(age))
        .map(|band| &band.value)
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConditionalProbability {
    Constant(f64),
    AgeBanded(Vec<AgeBand<f64>>),
}

impl ProbabilityFn for ConditionalProbability {
    fn probability(&self, attributes: &PersonAttributes) -> f64 {
        match self {
            ConditionalProbability::Constant(p) => *p,
            ConditionalProbability::AgeBanded(bands) => {
                find_band(bands, attributes.age).copied().unwrap_or(0.0)
            }
        }
    }
}

fn parse_probability(text: &str) -> Result<f64, ContagionError> {
    let p = parse_number(text)?;
    if (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(ContagionError::ConfigError(format!(
            "probability {p} is outside [0, 1]"
        )))
    }
}

impl FromStr for ConditionalProbability {
    type Err = ContagionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_age_map(s)? {
            Some(bands) => Ok(ConditionalProbability::AgeBanded(
                bands
                    .into_iter()
                    .map(|(min_age, max_age, text)| {
                        Ok(AgeBand {
                            min_age,
                            max_age,
                            value: parse_probability(text)?,
                        })
                    })
                    .collect::<Result<_, ContagionError>>()?,
            )),
            None => Ok(ConditionalProbability::Constant(parse_probability(s)?)),
        }
    }
}

/// A distribution of non-negative durations, in hours.
#[derive(Clone, Debug)]
pub enum DurationDistribution {
    Constant(f64),
    Triangular(Triangular<f64>),
    Uniform(Uniform<f64>),
    Exponential(Exp<f64>),
}

impl DurationDistribution {
    /// Parses a single distribution whose parameters are given in days.
    ///
    /// # Errors
    /// Returns `ContagionError::ConfigError` for an unknown name, a wrong number of arguments,
    /// or parameters the distribution cannot be built from.
    pub fn parse_days(text: &str) -> Result<Self, ContagionError> {
        let text = text.trim();
        let Some(open) = text.find('(') else {
            return Self::constant(parse_number(text)?);
        };
        if !text.ends_with(')') {
            return Err(ContagionError::ConfigError(format!(
                "unbalanced parentheses in duration '{text}'"
            )));
        }
        let name = text[..open].trim();
        let args = text[open + 1..text.len() - 1]
            .split(',')
            .map(|arg| parse_number(arg).map(|days| days * HOURS_PER_DAY))
            .collect::<Result<Vec<f64>, _>>()?;
        let bad = |message: String| ContagionError::ConfigError(format!("{text}: {message}"));

        match (name.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("constant", [value]) => Self::constant(*value / HOURS_PER_DAY),
            ("triangular", [min, mode, max]) => {
                if *min < 0.0 {
                    return Err(bad("durations must be non-negative".to_string()));
                }
                Triangular::new(*min, *max, *mode)
                    .map(DurationDistribution::Triangular)
                    .map_err(|e| bad(e.to_string()))
            }
            ("uniform", [min, max]) => {
                if *min < 0.0 {
                    return Err(bad("durations must be non-negative".to_string()));
                }
                Uniform::new_inclusive(*min, *max)
                    .map(DurationDistribution::Uniform)
                    .map_err(|e| bad(e.to_string()))
            }
            ("exponential", [mean]) => {
                if *mean <= 0.0 {
                    return Err(bad("the mean must be positive".to_string()));
                }
                Exp::new(1.0 / *mean)
                    .map(DurationDistribution::Exponential)
                    .map_err(|e| bad(e.to_string()))
            }
            ("constant" | "triangular" | "uniform" | "exponential", _) => Err(bad(format!(
                "wrong number of arguments ({})",
                args.len()
            ))),
            _ => Err(bad(format!("unknown distribution '{name}'"))),
        }
    }

    fn constant(days: f64) -> Result<Self, ContagionError> {
        if days < 0.0 {
            return Err(ContagionError::ConfigError(format!(
                "durations must be non-negative, got {days}"
            )));
        }
        Ok(DurationDistribution::Constant(days * HOURS_PER_DAY))
    }
}

impl Distribution<f64> for DurationDistribution {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let hours = match self {
            DurationDistribution::Constant(hours) => *hours,
            DurationDistribution::Triangular(distribution) => distribution.sample(rng),
            DurationDistribution::Uniform(distribution) => distribution.sample(rng),
            DurationDistribution::Exponential(distribution) => distribution.sample(rng),
        };
        hours.max(0.0)
    }
}

static ZERO_DURATION: DurationDistribution = DurationDistribution::Constant(0.0);

#[derive(Clone, Debug)]
pub enum ConditionalDuration {
    Fixed(DurationDistribution),
    AgeBanded(Vec<AgeBand<DurationDistribution>>),
}

impl DurationFn for ConditionalDuration {
    fn distribution(&self, attributes: &PersonAttributes) -> &DurationDistribution {
        match self {
            ConditionalDuration::Fixed(distribution) => distribution,
            ConditionalDuration::AgeBanded(bands) => {
                find_band(bands, attributes.age).unwrap_or(&ZERO_DURATION)
            }
        }
    }
}

impl FromStr for ConditionalDuration {
    type Err = ContagionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_age_map(s)? {
            Some(bands) => Ok(ConditionalDuration::AgeBanded(
                bands
                    .into_iter()
                    .map(|(min_age, max_age, text)| {
                        Ok(AgeBand {
                            min_age,
                            max_age,
                            value: DurationDistribution::parse_days(text)?,
                        })
                    })
                    .collect::<Result<_, ContagionError>>()?,
            )),
            None => Ok(ConditionalDuration::Fixed(DurationDistribution::parse_days(
                s,
            )?)),
        }
    }
}

/// Reads a probability or duration specification as text. Bare JSON numbers are accepted and
/// converted, so `"fraction": 0.5` and `"fraction": "0.5"` are equivalent. Parsing into a
/// `ConditionalProbability` or `ConditionalDuration` happens when the model is built.
pub(crate) fn deserialize_spec_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Spec {
        Text(String),
        Number(f64),
    }

    Ok(match Spec::deserialize(deserializer)? {
        Spec::Text(text) => text,
        Spec::Number(number) => number.to_string(),
    })
}

fn parse_number(text: &str) -> Result<f64, ContagionError> {
    let text = text.trim();
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ContagionError::ConfigError(format!(
            "'{text}' is not a finite number"
        ))),
    }
}

/// Splits on `separator` where it is not nested inside parentheses.
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (index, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                parts.push(&text[start..index]);
                start = index + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Returns `None` if `text` is not an age map, otherwise its `(min, max, value)` bands.
fn parse_age_map(text: &str) -> Result<Option<Vec<(u8, u8, &str)>>, ContagionError> {
    let text = text.trim();
    let Some(body) = text.strip_prefix("age{") else {
        return Ok(None);
    };
    let body = body.strip_suffix('}').ok_or_else(|| {
        ContagionError::ConfigError(format!("age map '{text}' is missing its closing brace"))
    })?;

    let mut bands = Vec::new();
    for entry in split_top_level(body, ',') {
        let (range, value) = entry.split_once(':').ok_or_else(|| {
            ContagionError::ConfigError(format!("age band '{}' has no ':'", entry.trim()))
        })?;
        let (min, max) = range.split_once('-').ok_or_else(|| {
            ContagionError::ConfigError(format!("age range '{}' has no '-'", range.trim()))
        })?;
        let parse_age = |age: &str| {
            age.trim().parse::<u8>().map_err(|_| {
                ContagionError::ConfigError(format!("'{}' is not a valid age", age.trim()))
            })
        };
        let (min, max) = (parse_age(min)?, parse_age(max)?);
        if min > max {
            return Err(ContagionError::ConfigError(format!(
                "age range {min}-{max} is empty"
            )));
        }
        bands.push((min, max, value));
    }
    Ok(Some(bands))
}
