//! Per-directory change detection over append-only files.

use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};

/// Filename prefix marking a file that is still being written.
///
/// Producers write the current cycle's records under this prefix and rename
/// to the plain name once the file is complete, so a staged file is always
/// the most recently active entry in its directory.
const STAGED_PREFIX: char = '.';

/// Result of a single [`DirCursor::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// New activity since the previous poll.
    NewData,
    /// Nothing new, or the source degraded to "nothing new" (missing
    /// directory, unreadable file).
    NoData,
}

/// How growth of the active file is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountKind {
    /// Newline-delimited record files: count lines.
    Lines,
    /// Continuously appended stream files: count bytes.
    Bytes,
}

/// Tracks the active file and its growth baseline for one source directory.
///
/// The cursor lives for the life of the process and is mutated only by its
/// own [`poll`](DirCursor::poll). The baseline never decreases while the
/// active file is unchanged; switching to a different active file always
/// replaces the baseline outright.
#[derive(Debug)]
pub struct DirCursor {
    dir: PathBuf,
    kind: CountKind,
    active_file: Option<PathBuf>,
    baseline: u64,
}

impl DirCursor {
    /// Create a cursor over `dir`, measuring growth per `kind`.
    pub fn new<P: AsRef<Path>>(dir: P, kind: CountKind) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            kind,
            active_file: None,
            baseline: 0,
        }
    }

    /// The file most recently identified as active, if any.
    pub fn active_file(&self) -> Option<&Path> {
        self.active_file.as_deref()
    }

    /// The current growth baseline (lines or bytes of the active file).
    pub fn baseline(&self) -> u64 {
        self.baseline
    }

    /// Check the directory for new activity.
    ///
    /// The newest entry is the lexically-last staged file if any staged file
    /// exists, otherwise the lexically-last published file. A change of
    /// active file always signals [`Signal::NewData`], even if the new file
    /// is momentarily empty; an unchanged active file signals only when its
    /// measure exceeds the baseline.
    pub fn poll(&mut self) -> Signal {
        let newest = match self.newest_entry() {
            Ok(newest) => newest,
            // Listing failures other than a missing directory leave the
            // cursor untouched.
            Err(err) => {
                warn!(dir = %self.dir.display(), %err, "source listing failed");
                return Signal::NoData;
            }
        };

        let Some(newest) = newest else {
            self.active_file = None;
            self.baseline = 0;
            return Signal::NoData;
        };

        if self.active_file.as_deref() != Some(newest.as_path()) {
            let baseline = match self.measure(&newest) {
                Ok(value) => value,
                Err(err) => {
                    debug!(file = %newest.display(), %err, "new active file unreadable");
                    0
                }
            };
            self.active_file = Some(newest);
            self.baseline = baseline;
            return Signal::NewData;
        }

        match self.measure(&newest) {
            Ok(value) if value > self.baseline => {
                self.baseline = value;
                Signal::NewData
            }
            Ok(value) => {
                if value < self.baseline {
                    // Append-only sources must not shrink in place.
                    error!(
                        file = %newest.display(),
                        baseline = self.baseline,
                        measured = value,
                        "active file shrank below baseline"
                    );
                }
                Signal::NoData
            }
            Err(err) => {
                debug!(file = %newest.display(), %err, "active file unreadable");
                Signal::NoData
            }
        }
    }

    /// Pick the newest entry: staged files win over published ones, and
    /// within each group the lexically-last name wins.
    fn newest_entry(&self) -> io::Result<Option<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            // A directory that does not exist yet is an empty source.
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };

        let mut staged: Vec<String> = Vec::new();
        let mut published: Vec<String> = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(dir = %self.dir.display(), %err, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with(STAGED_PREFIX) {
                staged.push(name);
            } else {
                published.push(name);
            }
        }
        staged.sort();
        published.sort();

        let newest = staged.pop().or_else(|| published.pop());
        Ok(newest.map(|name| self.dir.join(name)))
    }

    fn measure(&self, path: &Path) -> io::Result<u64> {
        match self.kind {
            CountKind::Lines => {
                let file = fs::File::open(path)?;
                let reader = BufReader::new(file);
                Ok(reader.split(b'\n').count() as u64)
            }
            CountKind::Bytes => Ok(fs::metadata(path)?.len()),
        }
    }
}
