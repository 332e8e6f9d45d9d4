// Cantus Music: notation, rendering, and storage for generated melodies.
//
// The core crate produces bare interval sequences. This crate turns them into
// something a musician can read or hear, reads existing melodies back into
// interval form, and persists search results.
//
// Architecture:
// - mode.rs: Church modes and spelled keys ("C", "a", "e-", "d dorian"),
//   degree/MIDI mapping + snapping
// - notation.rs: Standard <-> generic interval mapping and realization of
//   interval sequences as spelled notes
// - parse.rs: Note-name, MusicXML, and MIDI input back to interval sequences
// - lilypond.rs: LilyPond sheet music output, one measure per melody
// - midi.rs: MIDI file output of a batch of melodies
// - store.rs: SQLite table of accepted melodies
//
// The `cantus` binary (main.rs) wires these to the search in `cantus_core`.

pub mod lilypond;
pub mod midi;
pub mod mode;
pub mod notation;
pub mod parse;
pub mod store;
