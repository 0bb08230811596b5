use crate::editor::EditorId;

/// In-memory record for one key.
///
/// Invariant: if `readable` is true, the `lengths.len()` clean files exist
/// on disk and their sizes equal `lengths`.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub(crate) lengths: Vec<u64>,
    pub(crate) readable: bool,
    pub(crate) current_editor: Option<EditorId>,
}

impl Entry {
    pub(crate) fn new(value_count: usize) -> Self {
        Entry {
            lengths: vec![0; value_count],
            readable: false,
            current_editor: None,
        }
    }
}
