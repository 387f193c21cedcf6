//! Incremental watching of append-only telemetry directories.
//!
//! Every producer on the station writes its records into a directory of
//! append-only files, following a staged-publish convention: the file
//! currently being written carries a leading-dot name (`.host-123.json`)
//! and is atomically renamed to its plain name once complete. A plain-named
//! file is never written to again.
//!
//! [`DirCursor`] tracks one such directory and answers, per poll, whether
//! anything new has appeared since the last poll - without re-reading file
//! contents beyond a cheap line or byte count of the single active file.

mod cursor;

pub use cursor::{CountKind, DirCursor, Signal};
