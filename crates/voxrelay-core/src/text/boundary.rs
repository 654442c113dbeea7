//! Chunk boundary detection.
//!
//! Model output arrives as small deltas. [`ChunkAccumulator`] collects them
//! and releases a chunk as soon as [`ChunkPolicy::is_ready`] judges the
//! buffered text complete enough to speak.

use serde::{Deserialize, Serialize};

/// Characters that end a chunk when they are the last non-whitespace char.
const TERMINATORS: [char; 5] = ['.', '!', '?', ':', ';'];

/// Delimiters that open a clause.
const CLAUSE_DELIMITERS: [char; 2] = [',', ';'];

/// Thresholds for cutting accumulated text into speakable chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPolicy {
    /// Force a cut once the buffer holds more than this many characters.
    pub max_chunk_chars: usize,
    /// Cut after a clause delimiter once the trailing clause holds more
    /// than this many non-whitespace characters.
    pub min_clause_chars: usize,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            max_chunk_chars: 100,
            min_clause_chars: 10,
        }
    }
}

impl ChunkPolicy {
    /// Decide whether `text` should be cut now.
    ///
    /// Rules, first match wins:
    /// 1. the right-trimmed text ends in `.`, `!`, `?`, `:` or `;`
    /// 2. the text after the last `,` or `;` has more than
    ///    `min_clause_chars` non-whitespace characters
    /// 3. the text is longer than `max_chunk_chars` characters
    #[must_use]
    pub fn is_ready(&self, text: &str) -> bool {
        if text.trim_end().ends_with(TERMINATORS) {
            return true;
        }

        if let Some(pos) = text.rfind(CLAUSE_DELIMITERS) {
            // Both delimiters are one byte wide.
            let clause = &text[pos + 1..];
            let visible = clause.chars().filter(|c| !c.is_whitespace()).count();
            if visible > self.min_clause_chars {
                return true;
            }
        }

        text.chars().count() > self.max_chunk_chars
    }
}

/// Owns the text buffered since the last cut.
#[derive(Debug, Default)]
pub struct ChunkAccumulator {
    policy: ChunkPolicy,
    buffer: String,
}

impl ChunkAccumulator {
    pub fn new(policy: ChunkPolicy) -> Self {
        Self {
            policy,
            buffer: String::new(),
        }
    }

    /// Append a delta. Returns the whole buffer when it became ready.
    pub fn push(&mut self, delta: &str) -> Option<String> {
        self.buffer.push_str(delta);
        if self.policy.is_ready(&self.buffer) {
            Some(std::mem::take(&mut self.buffer))
        } else {
            None
        }
    }

    /// Release whatever is left once upstream is done.
    ///
    /// Whitespace-only remainders are discarded.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        if rest.trim().is_empty() {
            None
        } else {
            Some(rest)
        }
    }
}
