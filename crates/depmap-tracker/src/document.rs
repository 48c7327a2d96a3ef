use std::collections::HashMap;

/// In-memory form of a tracker file: key definitions, the compressed grid,
/// and the two metadata lines. Mirrors the structure
/// `read_tracker_file`/`write_tracker_file` pass around in
/// `tracker_io.py`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerDocument {
    pub key_defs: HashMap<String, String>,
    pub grid: HashMap<String, String>,
    pub last_key_edit: String,
    pub last_grid_edit: String,
    /// Everything up to and including the `---mini_tracker_start---` line,
    /// verbatim, for mini-trackers that carry a human-authored template
    /// ahead of the machine-managed section. `None` for trackers that don't
    /// use the markers.
    pub template_prefix: Option<String>,
    /// Everything from the `---mini_tracker_end---` line to EOF, verbatim.
    pub template_suffix: Option<String>,
}

impl TrackerDocument {
    pub fn is_empty(&self) -> bool {
        self.key_defs.is_empty() && self.grid.is_empty()
    }
}
