// LilyPond sheet music output for batches of melodies.
//
// Renders a list of interval sequences as one LilyPond (.ly) file that can be
// engraved into PDF/SVG with the LilyPond typesetter. Every melody is realized
// in the requested key (see `notation::realize`) as whole notes and fills one
// measure: the time signature is N/1 for N-note melodies, and each measure
// ends with a final barline so the melodies read as separate exercises.
//
// Clefs: each measure gets the clef that suits its notes (treble when the
// average staff position is above B3, bass otherwise), but a clef command is
// only written when it differs from the clef already in force.
//
// Uses absolute pitches (not \relative) for simplicity and correctness.

use crate::mode::{Key, Letter, Mode};
use crate::notation::{NotationError, SpelledNote, realize};
use std::fmt::Write;
use std::path::Path;

/// Tempo mark: half notes per minute.
pub const HALF_NOTES_PER_MINUTE: u32 = 140;

/// Staff position (C0 = 0) at or below which a measure reads in bass clef.
const BASS_CLEF_CEILING: i32 = 27; // B3

/// LilyPond note name (Dutch names, absolute octave).
///
/// LilyPond's `c` with no octave marks = C3.
/// Each `'` raises one octave, each `,` lowers one octave.
pub fn ly_note(note: &SpelledNote) -> String {
    let mut result = ly_pitch_name(note.letter, note.alter);
    let octave = note.octave - 3;
    let mark = if octave > 0 { '\'' } else { ',' };
    for _ in 0..octave.unsigned_abs() {
        result.push(mark);
    }
    result
}

/// Pitch name without octave: `c`, `fis`, `bes`, `eeses`.
fn ly_pitch_name(letter: Letter, alter: i8) -> String {
    let mut name = letter.as_char().to_ascii_lowercase().to_string();
    let suffix = if alter > 0 { "is" } else { "es" };
    for _ in 0..alter.unsigned_abs() {
        name.push_str(suffix);
    }
    name
}

/// Map a Key to a LilyPond \key command string.
///
/// Aeolian maps to \minor and Ionian to \major (LilyPond convention).
/// Other modes use their modal name.
pub fn key_to_ly_key(key: &Key) -> String {
    let mode_name = match key.mode {
        Mode::Dorian => "dorian",
        Mode::Phrygian => "phrygian",
        Mode::Lydian => "lydian",
        Mode::Mixolydian => "mixolydian",
        Mode::Aeolian => "minor",
        Mode::Ionian => "major",
    };
    format!("\\key {} \\{}", ly_pitch_name(key.tonic, key.alter), mode_name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clef {
    Treble,
    Bass,
}

impl Clef {
    /// The clef that keeps `notes` closest to the staff.
    pub fn best_for(notes: &[SpelledNote]) -> Clef {
        if notes.is_empty() {
            return Clef::Treble;
        }
        let total: i32 = notes.iter().map(SpelledNote::staff_position).sum();
        if total > BASS_CLEF_CEILING * notes.len() as i32 {
            Clef::Treble
        } else {
            Clef::Bass
        }
    }

    fn ly_name(self) -> &'static str {
        match self {
            Clef::Treble => "treble",
            Clef::Bass => "bass",
        }
    }
}

/// Render one measure per melody.
fn render_measures(melodies: &[Vec<i32>], key: &Key, start_degree: u8) -> Result<String, NotationError> {
    let mut out = String::new();
    let mut current_clef: Option<Clef> = None;

    for intervals in melodies {
        let notes = realize(intervals, key, start_degree)?;
        let clef = Clef::best_for(&notes);
        if current_clef != Some(clef) {
            let _ = writeln!(out, "  \\clef {}", clef.ly_name());
            current_clef = Some(clef);
        }
        out.push(' ');
        for note in &notes {
            let _ = write!(out, " {}1", ly_note(note));
        }
        out.push_str(" \\bar \"|.\"\n");
    }
    Ok(out)
}

/// Generate a complete LilyPond file for a batch of melodies.
///
/// All melodies should have the same number of notes; the time signature
/// is taken from the first.
pub fn melodies_to_lilypond(
    melodies: &[Vec<i32>],
    key: &Key,
    start_degree: u8,
    title: Option<&str>,
) -> Result<String, NotationError> {
    let notes_per_melody = melodies.first().map_or(1, |m| m.len() + 1);
    let mut ly = String::new();

    ly.push_str("\\version \"2.24.0\"\n\n");

    let title_text = title.unwrap_or("Cantus Firmus");
    let subtitle = format!("{} melodies of {} notes, {}", melodies.len(), notes_per_melody, key);
    let _ = write!(
        ly,
        "\\header {{\n  title = \"{}\"\n  subtitle = \"{}\"\n}}\n\n",
        title_text.replace('"', "\\\""),
        subtitle
    );

    let _ = write!(
        ly,
        "global = {{\n  {} \\time {}/1 \\tempo 2 = {}\n}}\n\n",
        key_to_ly_key(key),
        notes_per_melody,
        HALF_NOTES_PER_MINUTE
    );

    let music = render_measures(melodies, key, start_degree)?;
    let _ = write!(ly, "cantus = \\absolute {{\n  \\global\n{}}}\n\n", music);

    ly.push_str("\\score {\n  \\new Staff \\cantus\n  \\layout { }\n}\n");
    Ok(ly)
}

/// Write a LilyPond file for a batch of melodies.
pub fn write_lilypond(
    path: &Path,
    melodies: &[Vec<i32>],
    key: &Key,
    start_degree: u8,
) -> Result<(), NotationError> {
    let ly = melodies_to_lilypond(melodies, key, start_degree, None)?;
    std::fs::write(path, ly).map_err(|source| NotationError::Io {
        path: path.to_path_buf(),
        source,
    })
}
