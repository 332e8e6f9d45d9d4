// Abstract melody model in Taneyev interval notation.
//
// A melody is stored only as its sequence of signed generic intervals
// between adjacent notes: 0 = unison, ±1 = second, ±2 = third, ±3 = fourth,
// and so on up to ±7 = octave. Nothing here knows about keys, letters, or
// semitones; the same interval sequence describes the melody in every mode.
//
// Every other view is derived from the intervals at construction time and
// never changes afterwards:
// - pitches: running sum from 0 (displacement from the first note)
// - degrees: pitches reduced mod 7 (scale-degree class, octave-agnostic)
// - extremes: first note, last note, and every strict turning point between
// - range: highest pitch minus lowest pitch
//
// Views are computed eagerly so that a `Melody` is a plain immutable value
// that rayon workers can read concurrently with no synchronization.
//
// See also: `rules.rs` which evaluates the counterpoint rules against these
// views, and `search.rs` which creates one `Melody` per candidate ordering.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Generic interval of a second.
pub const STEP: i32 = 1;

/// Smallest generic interval counted as a leap (a fourth).
pub const LEAP: i32 = 3;

/// Largest generic interval the model accepts in either direction (an octave).
pub const MAX_INTERVAL: i32 = 7;

/// Number of scale-degree classes in a diatonic octave.
pub const DEGREES_PER_OCTAVE: i32 = 7;

/// True for a melodic second in either direction.
pub fn is_step(interval: i32) -> bool {
    interval.abs() == STEP
}

/// True for a melodic fourth or larger in either direction.
pub fn is_leap(interval: i32) -> bool {
    interval.abs() >= LEAP
}

/// A melody as a sequence of generic intervals plus its derived views.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<i32>", into = "Vec<i32>")]
pub struct Melody {
    intervals: Vec<i32>,
    pitches: Vec<i32>,
    degrees: Vec<i32>,
    extremes: Vec<i32>,
    range: i32,
}

impl Melody {
    /// Build a melody from its interval sequence.
    ///
    /// No playability checks are made. An empty sequence is a one-note
    /// melody whose views all degrade to the single element `0`. The
    /// intervals must already be in range; use `try_new` for user input.
    pub fn new(intervals: Vec<i32>) -> Self {
        let pitches = pitches_from_intervals(&intervals);
        let degrees = pitches.iter().map(|&p| pitch_to_degree(p)).collect();
        let extremes = extremes_of(&pitches);
        let range = range_of(&pitches);
        Melody {
            intervals,
            pitches,
            degrees,
            extremes,
            range,
        }
    }

    /// Build a melody from input that has not been checked yet, rejecting
    /// any interval larger than `MAX_INTERVAL` in magnitude.
    pub fn try_new(intervals: Vec<i32>) -> Result<Self, IntervalRangeError> {
        check_interval_range(&intervals)?;
        Ok(Melody::new(intervals))
    }

    /// The interval sequence this melody was built from.
    pub fn intervals(&self) -> &[i32] {
        &self.intervals
    }

    /// Consume the melody, keeping only its intervals.
    pub fn into_intervals(self) -> Vec<i32> {
        self.intervals
    }

    /// Number of notes (intervals + 1).
    pub fn len(&self) -> usize {
        self.intervals.len() + 1
    }

    /// A melody always has at least one note.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Pitches relative to the first note. `pitches()[0] == 0`.
    pub fn pitches(&self) -> &[i32] {
        &self.pitches
    }

    /// Scale-degree classes (0-6) of each pitch.
    ///
    /// ```text
    /// pitch:  ... -7 -6 -5 -4 -3 -2 -1  0  1  2  3  4  5  6  7 ...
    /// degree: ...  0  1  2  3  4  5  6  0  1  2  3  4  5  6  0 ...
    /// ```
    pub fn degrees(&self) -> &[i32] {
        &self.degrees
    }

    /// First pitch, every strict local maximum or minimum, and the last pitch.
    pub fn extremes(&self) -> &[i32] {
        &self.extremes
    }

    /// Degree classes of the extremes.
    pub fn extreme_degrees(&self) -> Vec<i32> {
        self.extremes.iter().map(|&p| pitch_to_degree(p)).collect()
    }

    /// Distance between the highest and lowest pitch.
    pub fn range(&self) -> i32 {
        self.range
    }

    /// Sum of all intervals; zero when the melody ends where it began.
    pub fn interval_sum(&self) -> i32 {
        self.intervals.iter().sum()
    }

    /// Number of stepwise (±1) intervals.
    pub fn step_count(&self) -> usize {
        self.intervals.iter().filter(|&&iv| is_step(iv)).count()
    }

    /// Interval prefixes that end on a leap, read in both directions.
    ///
    /// For the forward interval order, every prefix that ends at (and
    /// includes) a leap is returned. The same is then done for the reversed
    /// interval order, so each leap is seen once with what precedes it and
    /// once with what follows it. Forward segments come first.
    pub fn segments_around_leaps(&self) -> Vec<Vec<i32>> {
        let mut segments = segments_until_leaps(self.intervals.iter().copied());
        segments.extend(segments_until_leaps(self.intervals.iter().rev().copied()));
        segments
    }
}

impl TryFrom<Vec<i32>> for Melody {
    type Error = IntervalRangeError;

    fn try_from(intervals: Vec<i32>) -> Result<Self, Self::Error> {
        Melody::try_new(intervals)
    }
}

impl From<Melody> for Vec<i32> {
    fn from(melody: Melody) -> Self {
        melody.intervals
    }
}

/// Comma-delimited intervals, e.g. `1,2,-1,3`. The persistence layer stores
/// melodies in exactly this form.
impl fmt::Display for Melody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, iv) in self.intervals.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{iv}")?;
        }
        Ok(())
    }
}

/// Error from parsing a comma-delimited interval list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid interval {token:?} in interval list")]
pub struct ParseIntervalsError {
    pub token: String,
}

impl FromStr for Melody {
    type Err = ParseIntervalsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_intervals(s).map(Melody::new)
    }
}

/// An interval outside the generic-interval model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("interval {interval} at position {position} is out of range (magnitude at most {max})", max = MAX_INTERVAL)]
pub struct IntervalRangeError {
    pub position: usize,
    pub interval: i32,
}

/// First interval whose magnitude exceeds `MAX_INTERVAL`, if any.
pub fn check_interval_range(intervals: &[i32]) -> Result<(), IntervalRangeError> {
    match intervals
        .iter()
        .position(|iv| iv.unsigned_abs() > MAX_INTERVAL.unsigned_abs())
    {
        Some(position) => Err(IntervalRangeError {
            position,
            interval: intervals[position],
        }),
        None => Ok(()),
    }
}

/// Parse `"1, 2,-1"` into `[1, 2, -1]`. An empty or blank string is the
/// empty interval list.
pub fn parse_intervals(s: &str) -> Result<Vec<i32>, ParseIntervalsError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Vec::new());
    }
    s.split(',')
        .map(|token| {
            let token = token.trim();
            token.parse::<i32>().map_err(|_| ParseIntervalsError {
                token: token.to_string(),
            })
        })
        .collect()
}

/// Render intervals as comma-delimited text without building a `Melody`.
pub fn format_intervals(intervals: &[i32]) -> String {
    intervals
        .iter()
        .map(|iv| iv.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Reduce a pitch to its degree class with a non-negative modulo.
pub fn pitch_to_degree(pitch: i32) -> i32 {
    pitch.rem_euclid(DEGREES_PER_OCTAVE)
}

fn pitches_from_intervals(intervals: &[i32]) -> Vec<i32> {
    let mut pitches = Vec::with_capacity(intervals.len() + 1);
    let mut current = 0;
    pitches.push(current);
    for &iv in intervals {
        current += iv;
        pitches.push(current);
    }
    pitches
}

fn extremes_of(pitches: &[i32]) -> Vec<i32> {
    let Some((&first, rest)) = pitches.split_first() else {
        return Vec::new();
    };
    let mut extremes = vec![first];
    if rest.is_empty() {
        return extremes;
    }
    for w in pitches.windows(3) {
        let (prev, current, next) = (w[0], w[1], w[2]);
        let is_max = current > prev && current > next;
        let is_min = current < prev && current < next;
        if is_max || is_min {
            extremes.push(current);
        }
    }
    extremes.push(pitches[pitches.len() - 1]);
    extremes
}

fn range_of(pitches: &[i32]) -> i32 {
    let max = pitches.iter().copied().max().unwrap_or(0);
    let min = pitches.iter().copied().min().unwrap_or(0);
    max - min
}

fn segments_until_leaps(intervals: impl Iterator<Item = i32>) -> Vec<Vec<i32>> {
    let mut prefix = Vec::new();
    let mut segments = Vec::new();
    for iv in intervals {
        prefix.push(iv);
        if is_leap(iv) {
            segments.push(prefix.clone());
        }
    }
    segments
}
