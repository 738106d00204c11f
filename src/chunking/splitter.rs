//! Recursive character splitter.
//!
//! Text is broken on the strongest separator it contains (paragraph, line,
//! sentence terminator, word, then character), recursing into pieces that
//! are still too long, and the pieces are packed back together up to the
//! target size. Separators stay attached to the end of the piece they
//! terminate, and the returned parts always concatenate back to the input.

/// Default separators in priority order.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ".", "।", "?", "!", " ", ""];

/// A contiguous byte range of the input plus the strength of the boundary
/// at its start (lower is stronger).
#[derive(Debug, Clone, Copy)]
struct Piece {
    start: usize,
    end: usize,
    chars: usize,
    rank: usize,
}

/// Splits text into parts of roughly `chunk_size` characters.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    overlap: usize,
    separators: Vec<String>,
    /// Boundaries ranked below this are sentence-or-stronger.
    weak_rank: usize,
}

impl RecursiveSplitter {
    /// Splitter with the default separators.
    ///
    /// `overlap` is a look-back budget: when a part would end at a word or
    /// character boundary, a sentence boundary within the last `overlap`
    /// characters is used instead.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self::with_separators(chunk_size, overlap, DEFAULT_SEPARATORS)
    }

    pub fn with_separators(chunk_size: usize, overlap: usize, separators: &[&str]) -> Self {
        let separators: Vec<String> = separators.iter().map(|s| s.to_string()).collect();
        let weak_rank = separators
            .iter()
            .position(|s| s == " " || s.is_empty())
            .unwrap_or(separators.len());

        Self {
            chunk_size: chunk_size.max(1),
            overlap,
            separators,
            weak_rank,
        }
    }

    /// Split `text` into consecutive parts. Empty text yields no parts.
    pub fn split_text<'a>(&self, text: &'a str) -> Vec<&'a str> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut pieces = Vec::new();
        self.collect_pieces(text, 0, 0, 0, &mut pieces);

        self.pack(&pieces)
            .into_iter()
            .map(|(start, end)| &text[start..end])
            .collect()
    }

    /// Break `text` (located at `base` in the input) into pieces shorter than
    /// the chunk size, starting the separator search at `level`.
    fn collect_pieces(&self, text: &str, base: usize, level: usize, lead_rank: usize, out: &mut Vec<Piece>) {
        let chosen = self.separators[level.min(self.separators.len())..]
            .iter()
            .enumerate()
            .map(|(i, sep)| (level + i, sep.as_str()))
            .find(|(_, sep)| sep.is_empty() || text.contains(sep));

        let Some((rank, separator)) = chosen else {
            out.push(Piece {
                start: base,
                end: base + text.len(),
                chars: text.chars().count(),
                rank: lead_rank,
            });
            return;
        };

        if separator.is_empty() {
            for (i, (offset, ch)) in text.char_indices().enumerate() {
                out.push(Piece {
                    start: base + offset,
                    end: base + offset + ch.len_utf8(),
                    chars: 1,
                    rank: if i == 0 { lead_rank } else { rank },
                });
            }
            return;
        }

        let mut cuts: Vec<usize> = text
            .match_indices(separator)
            .map(|(offset, sep)| offset + sep.len())
            .collect();
        cuts.push(text.len());

        let mut from = 0;
        for to in cuts {
            if to <= from {
                continue;
            }
            let slice = &text[from..to];
            let piece_rank = if from == 0 { lead_rank } else { rank };
            let chars = slice.chars().count();

            if chars < self.chunk_size || rank + 1 >= self.separators.len() {
                out.push(Piece {
                    start: base + from,
                    end: base + to,
                    chars,
                    rank: piece_rank,
                });
            } else {
                self.collect_pieces(slice, base + from, rank + 1, piece_rank, out);
            }
            from = to;
        }
    }

    /// Greedily pack pieces into parts, returning their byte ranges.
    fn pack(&self, pieces: &[Piece]) -> Vec<(usize, usize)> {
        let mut parts = Vec::new();
        let mut current: Vec<Piece> = Vec::new();
        let mut current_len = 0;

        for &piece in pieces {
            if !current.is_empty() && current_len + piece.chars > self.chunk_size {
                let keep = self.break_point(&current, &piece);
                let carried = current.split_off(keep);
                parts.push(range_of(&current));

                current = carried;
                current_len = current.iter().map(|p| p.chars).sum();
            }
            current_len += piece.chars;
            current.push(piece);
        }

        if !current.is_empty() {
            parts.push(range_of(&current));
        }

        parts
    }

    /// Index at which to close the current part before `next`.
    fn break_point(&self, current: &[Piece], next: &Piece) -> usize {
        if next.rank < self.weak_rank || self.overlap == 0 {
            return current.len();
        }

        let mut tail = 0;
        for j in (1..current.len()).rev() {
            tail += current[j].chars;
            if tail > self.overlap {
                break;
            }
            if current[j].rank < self.weak_rank && tail + next.chars <= self.chunk_size {
                return j;
            }
        }

        current.len()
    }
}

fn range_of(pieces: &[Piece]) -> (usize, usize) {
    match (pieces.first(), pieces.last()) {
        (Some(first), Some(last)) => (first.start, last.end),
        _ => (0, 0),
    }
}
