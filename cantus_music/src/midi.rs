// MIDI output for batches of melodies.
//
// Converts a list of interval sequences into a Standard MIDI File (SMF) for
// playback. Track 0 carries tempo and time signature; track 1 carries every
// melody in turn, realized in the requested key as whole notes, with one
// whole rest between consecutive melodies. The tempo matches the LilyPond
// output (140 half notes per minute).
//
// Uses the `midly` crate for MIDI writing. Output is SMF Format 1 (multi-track).

use crate::lilypond::HALF_NOTES_PER_MINUTE;
use crate::mode::Key;
use crate::notation::{NotationError, realize};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::path::Path;

/// Ticks per quarter note in MIDI output.
const TICKS_PER_QUARTER: u16 = 480;

/// Ticks per whole note.
const TICKS_PER_WHOLE: u32 = TICKS_PER_QUARTER as u32 * 4;

const CHANNEL: u8 = 0;

/// Choir aahs.
const PROGRAM: u8 = 52;

const VELOCITY: u8 = 80;

/// Convert melodies to MIDI and write to a file.
pub fn write_midi(
    path: &Path,
    melodies: &[Vec<i32>],
    key: &Key,
    start_degree: u8,
) -> Result<(), NotationError> {
    let smf = melodies_to_smf(melodies, key, start_degree)?;
    let io_err = |source| NotationError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut buf = Vec::new();
    smf.write_std(&mut buf).map_err(io_err)?;
    std::fs::write(path, &buf).map_err(io_err)?;
    Ok(())
}

fn event(delta: u32, kind: TrackEventKind<'static>) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind,
    }
}

fn note_event(delta: u32, message: MidiMessage) -> TrackEvent<'static> {
    event(
        delta,
        TrackEventKind::Midi {
            channel: u4::new(CHANNEL),
            message,
        },
    )
}

/// Convert melodies to an in-memory SMF.
pub fn melodies_to_smf(
    melodies: &[Vec<i32>],
    key: &Key,
    start_degree: u8,
) -> Result<Smf<'static>, NotationError> {
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    // Track 0: tempo and meter
    let notes_per_melody = melodies.first().map_or(1, |m| m.len() + 1);
    let quarters_per_minute = HALF_NOTES_PER_MINUTE * 2;
    let tempo_microseconds = 60_000_000 / quarters_per_minute;
    let tempo_track: Track<'static> = vec![
        event(0, TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_microseconds)))),
        // N/1: numerator N, denominator 2^0, 96 clocks per click, 8 32nds per quarter.
        event(
            0,
            TrackEventKind::Meta(MetaMessage::TimeSignature(
                notes_per_melody.min(255) as u8,
                0,
                96,
                8,
            )),
        ),
        event(0, TrackEventKind::Meta(MetaMessage::EndOfTrack)),
    ];
    smf.tracks.push(tempo_track);

    // Track 1: every melody in sequence
    let mut track: Track<'static> = vec![
        event(0, TrackEventKind::Meta(MetaMessage::TrackName(b"Cantus firmus"))),
        note_event(
            0,
            MidiMessage::ProgramChange {
                program: u7::new(PROGRAM),
            },
        ),
    ];

    let mut pending_rest: u32 = 0;
    for intervals in melodies {
        let notes = realize(intervals, key, start_degree)?;
        for note in &notes {
            // realize() guarantees 0..=127.
            let pitch = u7::new(note.midi() as u8);
            track.push(note_event(
                pending_rest,
                MidiMessage::NoteOn {
                    key: pitch,
                    vel: u7::new(VELOCITY),
                },
            ));
            track.push(note_event(
                TICKS_PER_WHOLE,
                MidiMessage::NoteOff {
                    key: pitch,
                    vel: u7::new(0),
                },
            ));
            pending_rest = 0;
        }
        pending_rest = TICKS_PER_WHOLE;
    }

    track.push(event(0, TrackEventKind::Meta(MetaMessage::EndOfTrack)));
    smf.tracks.push(track);

    Ok(smf)
}
