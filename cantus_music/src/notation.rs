// Notation adapter: from generic intervals to spelled notes and back.
//
// Two numbering systems meet here. Standard notation counts intervals
// inclusively (unison = 1, second = 2, third = 3, with a sign for direction),
// while the core uses Taneyev's exclusive count (unison = 0, second = 1).
// `standard_to_generic` shrinks a standard interval toward zero by one and
// `generic_to_standard` expands it back. The mapping is lossless except at
// the unison: standard 1 and -1 both shrink to 0, and 0 expands to 1.
//
// `realize` places an interval sequence in a key: it starts on the requested
// scale degree with the tonic in octave 4 and moves by scale steps, spelling
// each note from the key (see `Key::spell`).
//
// See also: `mode.rs` for keys and spelling, `parse.rs` for the reverse
// direction (notes to intervals), `lilypond.rs` and `midi.rs` which render
// realized notes.

use crate::mode::{Key, Letter};
use cantus_core::melody::Melody;
use std::fmt;
use thiserror::Error;

/// Octave (scientific pitch notation) in which the tonic of a realized
/// melody is placed.
pub const TONIC_OCTAVE: i32 = 4;

#[derive(Debug, Error)]
pub enum NotationError {
    #[error("start degree must be between 1 and 7, got {0}")]
    InvalidStartDegree(u8),

    #[error("note {name} (MIDI {midi}) is outside the MIDI range 0-127")]
    OutOfMidiRange { name: String, midi: i32 },

    #[error("failed to write {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}

/// Standard (inclusive) interval number to generic (Taneyev) interval.
pub fn standard_to_generic(n: i32) -> i32 {
    if n.abs() <= 1 { 0 } else { n - n.signum() }
}

/// Generic (Taneyev) interval to standard (inclusive) interval number.
/// A unison comes back as 1.
pub fn generic_to_standard(n: i32) -> i32 {
    if n == 0 { 1 } else { n + n.signum() }
}

/// A concrete note: letter, alteration, and octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpelledNote {
    pub letter: Letter,
    /// +1 per sharp, -1 per flat.
    pub alter: i8,
    /// Scientific octave number; C4 is middle C.
    pub octave: i32,
}

impl SpelledNote {
    pub fn new(letter: Letter, alter: i8, octave: i32) -> Self {
        SpelledNote { letter, alter, octave }
    }

    /// MIDI note number (C4 = 60). May fall outside 0..=127.
    pub fn midi(&self) -> i32 {
        12 * (self.octave + 1) + self.letter.natural_pitch_class() + i32::from(self.alter)
    }

    /// Diatonic staff position: seven per octave, C0 = 0. The distance
    /// between two positions is the generic interval between the notes.
    pub fn staff_position(&self) -> i32 {
        self.octave * 7 + self.letter.index()
    }

    /// Name with accidentals and octave, e.g. `C4`, `F#4`, `Bb3`.
    pub fn name_with_octave(&self) -> String {
        format!("{self}{}", self.octave)
    }
}

/// Letter and accidentals without the octave.
impl fmt::Display for SpelledNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter.as_char())?;
        let accidental = if self.alter > 0 { "#" } else { "b" };
        for _ in 0..self.alter.unsigned_abs() {
            f.write_str(accidental)?;
        }
        Ok(())
    }
}

/// The note for a signed scale degree of `key` (0 = tonic in
/// `tonic_octave`).
pub fn note_for_degree(key: &Key, degree: i32, tonic_octave: i32) -> SpelledNote {
    let (letter, alter) = key.spell(degree);
    SpelledNote::new(letter, alter, key.octave_of(degree, tonic_octave))
}

/// Realize an interval sequence in `key`, starting on `start_degree`
/// (1 = tonic, 7 = leading tone) in octave 4.
///
/// Every note must have a valid MIDI number, so the result can be written
/// to a MIDI file as-is.
pub fn realize(intervals: &[i32], key: &Key, start_degree: u8) -> Result<Vec<SpelledNote>, NotationError> {
    if !(1..=7).contains(&start_degree) {
        return Err(NotationError::InvalidStartDegree(start_degree));
    }
    let offset = i32::from(start_degree) - 1;
    let melody = Melody::new(intervals.to_vec());
    melody
        .pitches()
        .iter()
        .map(|&pitch| {
            let note = note_for_degree(key, offset + pitch, TONIC_OCTAVE);
            let midi = note.midi();
            if (0..=127).contains(&midi) {
                Ok(note)
            } else {
                Err(NotationError::OutOfMidiRange {
                    name: note.name_with_octave(),
                    midi,
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::Mode;

    fn names(notes: &[SpelledNote]) -> Vec<String> {
        notes.iter().map(SpelledNote::name_with_octave).collect()
    }

    #[test]
    fn test_standard_generic_mapping() {
        assert_eq!(standard_to_generic(2), 1);
        assert_eq!(standard_to_generic(-2), -1);
        assert_eq!(standard_to_generic(5), 4);
        assert_eq!(standard_to_generic(-8), -7);
        // Unison collapses from either direction.
        assert_eq!(standard_to_generic(1), 0);
        assert_eq!(standard_to_generic(-1), 0);
        assert_eq!(standard_to_generic(0), 0);

        assert_eq!(generic_to_standard(0), 1);
        assert_eq!(generic_to_standard(1), 2);
        assert_eq!(generic_to_standard(-3), -4);
    }

    #[test]
    fn test_expand_inverts_shrink_away_from_unison() {
        for n in (-9..=-2).chain(2..=9) {
            assert_eq!(generic_to_standard(standard_to_generic(n)), n);
        }
        for g in -8..=8 {
            assert_eq!(standard_to_generic(generic_to_standard(g)), g);
        }
    }

    #[test]
    fn test_name_with_octave() {
        assert_eq!(SpelledNote::new(Letter::C, 0, 4).name_with_octave(), "C4");
        assert_eq!(SpelledNote::new(Letter::F, 1, 4).name_with_octave(), "F#4");
        assert_eq!(SpelledNote::new(Letter::B, -1, 3).name_with_octave(), "Bb3");
        assert_eq!(SpelledNote::new(Letter::B, -1, 3).midi(), 58);
    }

    #[test]
    fn test_realize_reference_cantus_in_c() {
        let notes = realize(&[1, 2, -1, 3, -1, -1, -2, 1, -1, -1], &Key::c_major(), 1).unwrap();
        assert_eq!(
            names(&notes),
            vec!["C4", "D4", "F4", "E4", "A4", "G4", "F4", "D4", "E4", "D4", "C4"]
        );
    }

    #[test]
    fn test_realize_below_tonic() {
        let notes = realize(&[-7, 3, -1, 2, 1, 1, 1], &Key::c_major(), 1).unwrap();
        assert_eq!(names(&notes), vec!["C4", "C3", "F3", "E3", "G3", "A3", "B3", "C4"]);
    }

    #[test]
    fn test_realize_in_other_keys() {
        let a_minor = Key::parse("a").unwrap();
        let notes = realize(&[1, 1, 1], &a_minor, 1).unwrap();
        assert_eq!(names(&notes), vec!["A4", "B4", "C5", "D5"]);

        let e_flat = Key::parse("e-").unwrap();
        let notes = realize(&[2, -1, -1], &e_flat, 1).unwrap();
        assert_eq!(names(&notes), vec!["Eb4", "Gb4", "F4", "Eb4"]);

        let dorian = Key::new(Letter::D, 0, Mode::Dorian);
        let notes = realize(&[0, 1], &dorian, 5).unwrap();
        assert_eq!(names(&notes), vec!["A4", "A4", "B4"]);
    }

    #[test]
    fn test_realize_empty_is_single_note() {
        let notes = realize(&[], &Key::c_major(), 3).unwrap();
        assert_eq!(names(&notes), vec!["E4"]);
    }

    #[test]
    fn test_realize_rejects_bad_start_degree() {
        assert!(matches!(
            realize(&[1], &Key::c_major(), 0),
            Err(NotationError::InvalidStartDegree(0))
        ));
        assert!(matches!(
            realize(&[1], &Key::c_major(), 8),
            Err(NotationError::InvalidStartDegree(8))
        ));
    }

    #[test]
    fn test_realize_rejects_out_of_range() {
        let climb = vec![7; 10];
        assert!(matches!(
            realize(&climb, &Key::c_major(), 1),
            Err(NotationError::OutOfMidiRange { .. })
        ));
    }
}
