//! Character-window chunker with overlap and structural break preference.
//!
//! Windows are measured in Unicode scalar values. Each window is at most
//! `chunk_size` characters. When a window would end mid-text, the cut moves
//! back (at most `tolerance` characters) to the last paragraph break, else
//! the last sentence end, else the last whitespace. The next window starts
//! `overlap` characters before the cut, so consecutive windows always share
//! exactly `overlap` characters and nothing is skipped.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
    tolerance: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be positive".into()));
        }
        if overlap >= chunk_size {
            return Err(Error::InvalidConfig(format!(
                "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, overlap, tolerance: chunk_size / 10 })
    }

    /// How far back from the hard cut a structural boundary may be taken.
    pub fn with_tolerance(mut self, tolerance: usize) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn chunk_size(&self) -> usize { self.chunk_size }
    pub fn overlap(&self) -> usize { self.overlap }

    /// Lazily split `text`. The returned iterator is `Clone` and holds only
    /// a cursor, so it can be restarted from any point.
    pub fn chunks<'a>(&self, text: &'a str) -> Chunks<'a> {
        Chunks { text, config: *self, start: 0, byte: 0, done: text.is_empty() }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        self.chunks(text).map(|s| s.text.to_string()).collect()
    }
}

/// One window of the source text. `start`/`end` are character positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    config: Chunker,
    // char position and byte offset of the next window
    start: usize,
    byte: usize,
    done: bool,
}

/// Byte offsets of at most `chunk_size + 1` chars from the cursor, so
/// `offsets[i]` is where window char `i` starts.
struct Window<'a> {
    rest: &'a str,
    offsets: Vec<usize>,
    before: Option<char>,
}

impl<'a> Window<'a> {
    fn char_at(&self, pos: usize) -> Option<char> {
        self.offsets.get(pos).and_then(|&b| self.rest[b..].chars().next())
    }

    /// Char ending right before local cut `pos`; `pos == 0` looks behind the window.
    fn prev(&self, pos: usize) -> Option<char> {
        if pos == 0 { self.before } else { self.char_at(pos - 1) }
    }

    /// Best cut position in `(floor, hard_end]`, or `hard_end` if none.
    fn cut(&self, floor: usize, hard_end: usize) -> usize {
        let mut sentence = None;
        let mut word = None;
        // a cut at `pos` means the window ends right before char `pos`
        for pos in (floor + 1..=hard_end).rev() {
            let prev = self.prev(pos);
            let prev2 = self.prev(pos - 1);
            if prev == Some('\n') && prev2 == Some('\n') {
                return pos;
            }
            let Some(prev) = prev else { continue };
            if sentence.is_none() {
                if prev == '\n' {
                    sentence = Some(pos);
                } else if prev.is_whitespace() && matches!(prev2, Some('.' | '!' | '?')) {
                    sentence = Some(pos);
                }
            }
            if word.is_none() && prev.is_whitespace() {
                word = Some(pos);
            }
        }
        sentence.or(word).unwrap_or(hard_end)
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let Chunker { chunk_size, overlap, tolerance } = self.config;
        while !self.done {
            let rest = &self.text[self.byte..];
            let mut window = Window {
                rest,
                offsets: rest.char_indices().map(|(i, _)| i).take(chunk_size + 1).collect(),
                before: self.text[..self.byte].chars().next_back(),
            };
            let start = self.start;
            let end = if window.offsets.len() <= chunk_size {
                self.done = true;
                window.offsets.push(rest.len());
                window.offsets.len() - 1
            } else {
                // never cut so early that the next window would not advance
                let floor = chunk_size.saturating_sub(tolerance).max(overlap);
                let end = window.cut(floor, chunk_size);
                self.start = start + end - overlap;
                self.byte += window.offsets[end - overlap];
                end
            };
            let text = &rest[..window.offsets[end]];
            if text.trim().is_empty() {
                continue;
            }
            return Some(Segment { text, start, end: start + end });
        }
        None
    }
}
