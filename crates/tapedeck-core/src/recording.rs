use std::path::PathBuf;
use std::time::Duration;

/// A persisted audio clip in the recordings catalog.
///
/// Identity is the `path`: two values with equal paths denote the same
/// physical file.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    /// Filesystem path of the clip.
    pub path: PathBuf,
    /// Human-readable name derived from the file stem.
    pub display_name: String,
    /// Clip length. Unknown (`None`) until a playback of this clip has
    /// completed; may stay unset for clips that are never played.
    pub duration: Option<Duration>,
}

impl Recording {
    /// Build a catalog entry for `path` with the display name derived
    /// from its file stem and an unknown duration.
    pub fn new(path: PathBuf) -> Self {
        let display_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        Self {
            path,
            display_name,
            duration: None,
        }
    }

    /// Whether `other` refers to the same physical file.
    pub fn same_clip(&self, other: &Recording) -> bool {
        self.path == other.path
    }
}
