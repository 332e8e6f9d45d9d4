// Keys and church modes for realizing abstract melodies.
//
// The core crate thinks only in generic intervals; this module supplies the
// missing half: which letters and semitones a scale degree lands on in a
// given key. A `Key` is a spelled tonic (letter plus alteration) and a
// `Mode`. Spelling is letter-first, as in standard notation: scale degree n
// above the tonic always uses the letter n steps above the tonic letter, and
// the alteration is whatever makes the semitone count match the mode. So E
// flat major spells its fourth as A flat, never G sharp.
//
// This module provides:
// - Mode definitions with their semitone patterns
// - Key parsing from short identifiers ("C", "a", "e-", "Eb", "f#",
//   "d dorian")
// - Degree-to-MIDI mapping, and MIDI-to-degree mapping for parsing
// - Snapping out-of-key MIDI pitches to the nearest in-key pitch
//
// Used by notation.rs to turn interval sequences into notes, and by parse.rs
// to read MIDI input back into degrees.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The six church modes, each defined by their interval pattern from the final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// D Dorian: D E F G A B C D  (natural minor with raised 6th)
    Dorian,
    /// E Phrygian: E F G A B C D E  (half step from 1 to 2)
    Phrygian,
    /// F Lydian: F G A B C D E F  (raised 4th)
    Lydian,
    /// G Mixolydian: G A B C D E F G  (major with lowered 7th)
    Mixolydian,
    /// A Aeolian: A B C D E F G A  (natural minor)
    Aeolian,
    /// C Ionian: C D E F G A B C  (major)
    Ionian,
}

impl Mode {
    pub const ALL: [Mode; 6] = [
        Mode::Dorian,
        Mode::Phrygian,
        Mode::Lydian,
        Mode::Mixolydian,
        Mode::Aeolian,
        Mode::Ionian,
    ];

    /// Semitone intervals from the final to each scale degree.
    /// Returns 7 intervals representing degrees 1-7.
    pub fn intervals(self) -> [i32; 7] {
        match self {
            Mode::Dorian => [0, 2, 3, 5, 7, 9, 10],
            Mode::Phrygian => [0, 1, 3, 5, 7, 8, 10],
            Mode::Lydian => [0, 2, 4, 6, 7, 9, 11],
            Mode::Mixolydian => [0, 2, 4, 5, 7, 9, 10],
            Mode::Aeolian => [0, 2, 3, 5, 7, 8, 10],
            Mode::Ionian => [0, 2, 4, 5, 7, 9, 11],
        }
    }

    /// The 12 pitch classes that are in the mode, indexed by pitch class
    /// relative to the final.
    pub fn pitch_classes(self) -> [bool; 12] {
        let mut pcs = [false; 12];
        for interval in self.intervals() {
            pcs[interval as usize] = true;
        }
        pcs
    }

    pub fn name(self) -> &'static str {
        match self {
            Mode::Dorian => "dorian",
            Mode::Phrygian => "phrygian",
            Mode::Lydian => "lydian",
            Mode::Mixolydian => "mixolydian",
            Mode::Aeolian => "aeolian",
            Mode::Ionian => "ionian",
        }
    }

    /// Case-insensitive lookup. "major" and "minor" are accepted for Ionian
    /// and Aeolian.
    pub fn from_name(name: &str) -> Option<Mode> {
        let name = name.to_ascii_lowercase();
        match name.as_str() {
            "major" => Some(Mode::Ionian),
            "minor" => Some(Mode::Aeolian),
            _ => Mode::ALL.into_iter().find(|m| m.name() == name),
        }
    }
}

/// A note letter, independent of alteration and octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    pub const ALL: [Letter; 7] = [
        Letter::C,
        Letter::D,
        Letter::E,
        Letter::F,
        Letter::G,
        Letter::A,
        Letter::B,
    ];

    /// Position within the octave, C = 0 through B = 6.
    pub fn index(self) -> i32 {
        self as i32
    }

    /// Letter `index` steps above C, wrapping at the octave.
    pub fn from_index(index: i32) -> Letter {
        Letter::ALL[index.rem_euclid(7) as usize]
    }

    /// Pitch class of the unaltered letter (C = 0).
    pub fn natural_pitch_class(self) -> i32 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => 5,
            Letter::G => 7,
            Letter::A => 9,
            Letter::B => 11,
        }
    }

    /// Case-insensitive.
    pub fn from_char(c: char) -> Option<Letter> {
        match c.to_ascii_uppercase() {
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            'E' => Some(Letter::E),
            'F' => Some(Letter::F),
            'G' => Some(Letter::G),
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Letter::C => 'C',
            Letter::D => 'D',
            Letter::E => 'E',
            Letter::F => 'F',
            Letter::G => 'G',
            Letter::A => 'A',
            Letter::B => 'B',
        }
    }
}

/// Error from `Key::parse`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid key {input:?}: expected a tonic like \"C\", \"a\", \"e-\" or \"F#\", optionally followed by a mode name")]
pub struct ParseKeyError {
    pub input: String,
}

/// A tonic (letter plus alteration in semitones) and a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    pub tonic: Letter,
    /// +1 per sharp, -1 per flat.
    pub alter: i8,
    pub mode: Mode,
}

impl Default for Key {
    fn default() -> Self {
        Key::c_major()
    }
}

impl Key {
    pub fn new(tonic: Letter, alter: i8, mode: Mode) -> Self {
        Key { tonic, alter, mode }
    }

    pub fn c_major() -> Self {
        Key::new(Letter::C, 0, Mode::Ionian)
    }

    /// Parse a key identifier.
    ///
    /// The tonic letter's case picks the mode when none is named: uppercase
    /// is major (Ionian), lowercase is minor (Aeolian). Accidentals follow
    /// the letter: `#` for sharp, `-` or `b` for flat, repeatable. An
    /// explicit mode name may follow after whitespace and overrides the case.
    pub fn parse(input: &str) -> Result<Key, ParseKeyError> {
        let err = || ParseKeyError {
            input: input.to_string(),
        };
        let mut words = input.split_whitespace();
        let tonic_word = words.next().ok_or_else(err)?;
        let mode_word = words.next();
        if words.next().is_some() {
            return Err(err());
        }

        let mut chars = tonic_word.chars();
        let first = chars.next().ok_or_else(err)?;
        let tonic = Letter::from_char(first).ok_or_else(err)?;
        let mut alter: i8 = 0;
        for c in chars {
            match c {
                '#' => alter += 1,
                '-' | 'b' => alter -= 1,
                _ => return Err(err()),
            }
        }
        if alter.abs() > 2 {
            return Err(err());
        }

        let mode = match mode_word {
            Some(name) => Mode::from_name(name).ok_or_else(err)?,
            None if first.is_ascii_uppercase() => Mode::Ionian,
            None => Mode::Aeolian,
        };
        Ok(Key::new(tonic, alter, mode))
    }

    /// Tonic pitch class without wrapping, so C flat is -1 and B sharp is 12.
    fn tonic_semitone(&self) -> i32 {
        self.tonic.natural_pitch_class() + i32::from(self.alter)
    }

    /// Tonic pitch class in 0..12.
    pub fn tonic_pitch_class(&self) -> i32 {
        self.tonic_semitone().rem_euclid(12)
    }

    /// Check if a MIDI pitch is in this key.
    pub fn is_in_key(&self, midi: i32) -> bool {
        let pc = (midi - self.tonic_semitone()).rem_euclid(12);
        self.mode.pitch_classes()[pc as usize]
    }

    /// Get the scale degree (0-6) of a MIDI pitch, or None if not in key.
    pub fn scale_degree(&self, midi: i32) -> Option<u8> {
        let pc = (midi - self.tonic_semitone()).rem_euclid(12);
        self.mode
            .intervals()
            .iter()
            .position(|&iv| iv == pc)
            .map(|d| d as u8)
    }

    /// Snap a MIDI pitch to the nearest in-key pitch, preferring the lower
    /// neighbor on a tie.
    pub fn snap_to_key(&self, midi: i32) -> i32 {
        if self.is_in_key(midi) {
            return midi;
        }
        for offset in 1..=6 {
            if self.is_in_key(midi - offset) {
                return midi - offset;
            }
            if self.is_in_key(midi + offset) {
                return midi + offset;
            }
        }
        midi
    }

    /// Letter and alteration of a signed scale degree (0 = tonic, 7 = tonic
    /// an octave up, -1 = the degree below the tonic).
    pub fn spell(&self, degree: i32) -> (Letter, i8) {
        let class = degree.rem_euclid(7);
        let letter = Letter::from_index(self.tonic.index() + class);
        let semitone = self.tonic_semitone() + self.mode.intervals()[class as usize];
        let alter = (semitone - letter.natural_pitch_class() + 6).rem_euclid(12) - 6;
        (letter, alter as i8)
    }

    /// Octave (scientific, C4 = middle C) of `degree` when the tonic sits in
    /// `tonic_octave`. Follows the letter, so B sharp 3 stays in octave 3.
    pub fn octave_of(&self, degree: i32, tonic_octave: i32) -> i32 {
        tonic_octave + (self.tonic.index() + degree).div_euclid(7)
    }

    /// MIDI number of a signed scale degree with the tonic in `tonic_octave`.
    pub fn degree_to_midi(&self, degree: i32, tonic_octave: i32) -> i32 {
        let (letter, alter) = self.spell(degree);
        let octave = self.octave_of(degree, tonic_octave);
        12 * (octave + 1) + letter.natural_pitch_class() + i32::from(alter)
    }

    /// Inverse of `degree_to_midi`: the signed degree of an in-key MIDI
    /// pitch, counted from the tonic in `tonic_octave`.
    pub fn midi_to_degree(&self, midi: i32, tonic_octave: i32) -> Option<i32> {
        let degree = i32::from(self.scale_degree(midi)?);
        let tonic_midi = 12 * (tonic_octave + 1) + self.tonic_semitone();
        let octaves = (midi - tonic_midi - self.mode.intervals()[degree as usize]).div_euclid(12);
        Some(octaves * 7 + degree)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tonic.as_char())?;
        for _ in 0..self.alter.max(0) {
            f.write_str("#")?;
        }
        for _ in 0..(-self.alter).max(0) {
            f.write_str("b")?;
        }
        write!(f, " {}", self.mode.name())
    }
}

impl FromStr for Key {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Key::parse(s)
    }
}
