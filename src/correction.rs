/// Replace byte range [start..end) of a file with `replacement`.
#[derive(Debug, Clone)]
pub struct Edit {
    /// Byte offset, inclusive.
    pub start: usize,
    /// Byte offset, exclusive.
    pub end: usize,
    pub replacement: String,
    /// Position of the producing rule in the rule set (lower wins).
    pub rule_index: usize,
}

/// Non-overlapping edits for one file, sorted by start offset.
///
/// When edits overlap the later one is dropped; at equal starts the edit
/// from the earlier rule wins.
pub struct EditSet {
    edits: Vec<Edit>,
}

impl EditSet {
    pub fn from_vec(mut raw: Vec<Edit>) -> Self {
        raw.sort_by(|a, b| a.start.cmp(&b.start).then(a.rule_index.cmp(&b.rule_index)));

        let mut accepted: Vec<Edit> = Vec::with_capacity(raw.len());
        for edit in raw {
            if accepted.last().is_some_and(|last| edit.start < last.end) {
                log::debug!(
                    "dropping overlapping edit at {}..{} from rule #{}",
                    edit.start,
                    edit.end,
                    edit.rule_index
                );
                continue;
            }
            accepted.push(edit);
        }

        Self { edits: accepted }
    }

    /// Single linear copy: unchanged bytes between edits, then each replacement.
    pub fn apply(&self, source: &[u8]) -> Vec<u8> {
        let mut result = Vec::with_capacity(source.len());
        let mut cursor = 0;

        for edit in &self.edits {
            if edit.start > cursor {
                result.extend_from_slice(&source[cursor..edit.start]);
            }
            result.extend_from_slice(edit.replacement.as_bytes());
            cursor = edit.end;
        }

        if cursor < source.len() {
            result.extend_from_slice(&source[cursor..]);
        }

        result
    }

    /// Whether the edit for (`start`, `rule_index`) survived overlap resolution.
    pub fn contains(&self, start: usize, rule_index: usize) -> bool {
        self.edits
            .binary_search_by(|e| e.start.cmp(&start).then(e.rule_index.cmp(&rule_index)))
            .is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Edit> {
        self.edits.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }
}
