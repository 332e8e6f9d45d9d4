// Score parser: read a single melodic line back into generic intervals.
//
// Three input forms are supported:
// - Note names, whitespace-separated: `C4 D4 F#4 Bb3`. Accidentals are `#`,
//   `b` or `-`; the octave is required. The generic interval between two
//   notes comes from their letters and octaves (staff positions), so
//   accidentals never change it: C4 to F#4 is a fourth.
// - MusicXML (uncompressed `score-partwise`). Pitched notes of the first
//   part in document order; rests and chords are skipped.
// - Standard MIDI files. Notes are taken from the first track that has any,
//   in note-on order. MIDI carries no spelling, so each pitch is snapped into
//   the given key and read as a scale degree of that key.
//
// Either way the directed standard interval between neighbors is converted
// with `standard_to_generic`, so a repeated note is 0 and a second is ±1.

use crate::mode::{Key, Letter};
use crate::notation::{SpelledNote, generic_to_standard, note_for_degree, standard_to_generic};
use midly::{MidiMessage, Smf, TrackEventKind};
use roxmltree::{Document, Node, ParsingOptions};
use std::ops::RangeInclusive;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid note name {0:?} (expected a letter, optional accidentals, and an octave, like C4 or Bb3)")]
    InvalidNote(String),

    #[error("failed to decode MIDI data: {0}")]
    Midi(#[from] midly::Error),

    #[error("malformed MusicXML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("unsupported MusicXML root element <{0}> (expected <score-partwise>)")]
    UnsupportedScore(String),

    #[error("no notes found")]
    NoNotes,

    #[error("failed to read {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}

/// Octaves a note may be written in; covers the whole MIDI range.
pub const OCTAVES: RangeInclusive<i32> = 0..=10;

/// Most sharps or flats on one note.
pub const MAX_ALTER: i8 = 2;

/// Parse one note name such as `C4`, `f#5`, `Bb3` or `e-2`. A `-` is always
/// a flat, so octaves are non-negative.
pub fn parse_note_name(token: &str) -> Result<SpelledNote, ParseError> {
    let err = || ParseError::InvalidNote(token.to_string());
    let mut chars = token.chars();
    let letter = chars.next().and_then(Letter::from_char).ok_or_else(err)?;
    let rest = chars.as_str();
    let octave_start = rest.find(|c: char| c.is_ascii_digit()).ok_or_else(err)?;
    let (accidentals, octave) = rest.split_at(octave_start);

    let mut alter: i8 = 0;
    for c in accidentals.chars() {
        alter += match c {
            '#' => 1,
            'b' | '-' => -1,
            _ => return Err(err()),
        };
        if alter.abs() > MAX_ALTER {
            return Err(err());
        }
    }
    let octave: i32 = octave.parse().map_err(|_| err())?;
    if !OCTAVES.contains(&octave) {
        return Err(err());
    }
    Ok(SpelledNote::new(letter, alter, octave))
}

/// Parse a whitespace-separated list of note names.
pub fn parse_notes(text: &str) -> Result<Vec<SpelledNote>, ParseError> {
    let notes = text
        .split_whitespace()
        .map(parse_note_name)
        .collect::<Result<Vec<_>, _>>()?;
    if notes.is_empty() {
        return Err(ParseError::NoNotes);
    }
    Ok(notes)
}

/// Generic interval from one note to the next.
pub fn generic_interval(from: &SpelledNote, to: &SpelledNote) -> i32 {
    let steps = to.staff_position() - from.staff_position();
    // Directed standard interval, as a score reports it.
    let standard = generic_to_standard(steps);
    standard_to_generic(standard)
}

/// Generic intervals between consecutive notes.
pub fn intervals_of(notes: &[SpelledNote]) -> Vec<i32> {
    notes.windows(2).map(|w| generic_interval(&w[0], &w[1])).collect()
}

/// Interval sequence of a line written as note names.
pub fn parse_note_names(text: &str) -> Result<Vec<i32>, ParseError> {
    Ok(intervals_of(&parse_notes(text)?))
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.has_tag_name(name))
}

fn child_text<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    child(node, name).and_then(|c| c.text()).map(str::trim)
}

/// Spelled note of a MusicXML `<pitch>` element.
fn pitch_note(pitch: Node) -> Result<SpelledNote, ParseError> {
    let step = child_text(pitch, "step").unwrap_or_default();
    let octave = child_text(pitch, "octave").unwrap_or_default();
    let alter = child_text(pitch, "alter").unwrap_or("0");
    let err = || ParseError::InvalidNote(format!("step {step:?} alter {alter:?} octave {octave:?}"));

    let mut chars = step.chars();
    let letter = match (chars.next().and_then(Letter::from_char), chars.next()) {
        (Some(letter), None) => letter,
        _ => return Err(err()),
    };
    // Microtonal alterations are fractional; only whole semitones spell a note.
    let alter: f64 = alter.parse().map_err(|_| err())?;
    if alter.fract() != 0.0 || alter.abs() > f64::from(MAX_ALTER) {
        return Err(err());
    }
    let octave: i32 = octave.parse().map_err(|_| err())?;
    if !OCTAVES.contains(&octave) {
        return Err(err());
    }
    Ok(SpelledNote::new(letter, alter as i8, octave))
}

/// Notes of the first part of a MusicXML score, in document order.
///
/// A chord is written as a note followed by notes marked `<chord/>`; every
/// note of a chord is skipped, so only the single melodic line remains.
pub fn musicxml_notes(xml: &str) -> Result<Vec<SpelledNote>, ParseError> {
    // Exported scores carry a DOCTYPE; the external DTD itself is never fetched.
    let mut options = ParsingOptions::default();
    options.allow_dtd = true;
    let doc = Document::parse_with_options(xml, options)?;
    let root = doc.root_element();
    if !root.has_tag_name("score-partwise") {
        return Err(ParseError::UnsupportedScore(root.tag_name().name().to_string()));
    }
    let part = child(root, "part").ok_or(ParseError::NoNotes)?;

    let mut pitched = Vec::new();
    for note in part.descendants().filter(|n| n.has_tag_name("note")) {
        let Some(pitch) = child(note, "pitch") else {
            continue;
        };
        pitched.push((pitch_note(pitch)?, child(note, "chord").is_some()));
    }

    let notes: Vec<SpelledNote> = pitched
        .iter()
        .enumerate()
        .filter(|&(i, &(_, in_chord))| {
            !in_chord && !pitched.get(i + 1).is_some_and(|&(_, next)| next)
        })
        .map(|(_, &(note, _))| note)
        .collect();
    if notes.is_empty() {
        return Err(ParseError::NoNotes);
    }
    debug!(notes = notes.len(), "read MusicXML melody");
    Ok(notes)
}

/// Interval sequence of the melody in a MusicXML document.
pub fn parse_musicxml(xml: &str) -> Result<Vec<i32>, ParseError> {
    Ok(intervals_of(&musicxml_notes(xml)?))
}

pub fn read_musicxml(path: &Path) -> Result<Vec<i32>, ParseError> {
    let xml = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_musicxml(&xml)
}

/// MIDI note numbers of the first track with notes, in note-on order.
fn midi_note_numbers(smf: &Smf) -> Vec<u8> {
    for track in &smf.tracks {
        let keys: Vec<u8> = track
            .iter()
            .filter_map(|event| match event.kind {
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOn { key, vel },
                    ..
                } if vel.as_int() > 0 => Some(key.as_int()),
                _ => None,
            })
            .collect();
        if !keys.is_empty() {
            return keys;
        }
    }
    Vec::new()
}

/// Notes of a MIDI file, snapped into `key` and spelled from it.
pub fn midi_notes(bytes: &[u8], key: &Key) -> Result<Vec<SpelledNote>, ParseError> {
    let smf = Smf::parse(bytes)?;
    let keys = midi_note_numbers(&smf);
    if keys.is_empty() {
        return Err(ParseError::NoNotes);
    }
    debug!(notes = keys.len(), tracks = smf.tracks.len(), "read MIDI melody");

    let tonic_octave = 4;
    let notes = keys
        .into_iter()
        .filter_map(|k| {
            let snapped = key.snap_to_key(i32::from(k));
            key.midi_to_degree(snapped, tonic_octave)
                .map(|degree| note_for_degree(key, degree, tonic_octave))
        })
        .collect();
    Ok(notes)
}

/// Interval sequence of the melody in a MIDI file.
pub fn parse_midi(bytes: &[u8], key: &Key) -> Result<Vec<i32>, ParseError> {
    Ok(intervals_of(&midi_notes(bytes, key)?))
}

pub fn read_midi(path: &Path, key: &Key) -> Result<Vec<i32>, ParseError> {
    let bytes = std::fs::read(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_midi(&bytes, key)
}
