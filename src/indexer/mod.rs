//! Note discovery
//!
//! Walks the data root for Markdown notes, honouring `.gitignore` and
//! configured exclude globs, and reads them as UTF-8.

mod file_walker;

pub use file_walker::{FileWalker, NOTE_EXTENSIONS, NoteFile, is_note, read_note};
