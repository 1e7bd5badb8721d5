//! Pagination of accumulated output lines into size-bounded report blocks.
//!
//! A block is the fenced body of one chat message. Lines are appended to the
//! open block until its formatted content would exceed the ceiling; the block
//! is then sealed without the overflowing line and a fresh block starts with
//! it. Formatting is a pure function of the accumulated lines, so updating a
//! message twice with the same line set yields identical content.

/// Result of appending one line to the open block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Append {
    /// The line fit; the current message should be updated to this content.
    Updated(String),
    /// The line did not fit. `sealed` is the final content for the current
    /// message; `fresh` is the content for a brand-new successor message
    /// whose first line is the overflowing one.
    Rolled { sealed: String, fresh: String },
}

/// Folds an ordered sequence of text lines into bounded fenced blocks.
#[derive(Debug, Clone)]
pub struct Chunker {
    ceiling: usize,
    lines: Vec<String>,
}

impl Chunker {
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling,
            lines: Vec::new(),
        }
    }

    /// Lines of the open block, in arrival order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Formatted content of the open block.
    pub fn format(&self) -> String {
        format_block(&self.lines)
    }

    /// Append a line, rolling over to a new block when the formatted content
    /// would exceed the ceiling.
    ///
    /// The check is strictly greater-than: a block exactly at the ceiling is
    /// accepted as-is. A single line whose own formatted form exceeds the
    /// ceiling is passed through oversized rather than split; callers must
    /// not assume individual lines are bounded.
    pub fn push(&mut self, line: String) -> Append {
        self.lines.push(line);
        let content = format_block(&self.lines);
        if content.len() <= self.ceiling || self.lines.len() == 1 {
            return Append::Updated(content);
        }
        let Some(overflow) = self.lines.pop() else {
            return Append::Updated(content);
        };
        let sealed = format_block(&self.lines);
        self.lines = vec![overflow];
        Append::Rolled {
            sealed,
            fresh: format_block(&self.lines),
        }
    }
}

/// Wrap lines in a fixed-width fenced block. Bit-exact report format:
/// three backticks, newline, newline-joined lines, newline, three backticks.
pub fn format_block(lines: &[String]) -> String {
    format!("```\n{}\n```", lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fence overhead: "```\n" before and "\n```" after.
    const FENCE: usize = 8;

    fn line(len: usize) -> String {
        "x".repeat(len)
    }

    #[test]
    fn test_lines_accumulate_in_place() {
        let mut chunker = Chunker::new(100);
        assert_eq!(
            chunker.push("one".to_string()),
            Append::Updated("```\none\n```".to_string())
        );
        assert_eq!(
            chunker.push("two".to_string()),
            Append::Updated("```\none\ntwo\n```".to_string())
        );
        assert_eq!(chunker.format(), "```\none\ntwo\n```");
    }

    #[test]
    fn test_block_exactly_at_ceiling_is_accepted() {
        // two 10-char lines: 10 + 1 + 10 + FENCE = 29
        let mut chunker = Chunker::new(21 + FENCE);
        chunker.push(line(10));
        match chunker.push(line(10)) {
            Append::Updated(content) => assert_eq!(content.len(), 21 + FENCE),
            other => panic!("expected in-place update, got {other:?}"),
        }
    }

    #[test]
    fn test_one_past_ceiling_rolls_over() {
        let mut chunker = Chunker::new(21 + FENCE - 1);
        chunker.push(line(10));
        match chunker.push(line(10)) {
            Append::Rolled { sealed, fresh } => {
                assert_eq!(sealed, format_block(&[line(10)]));
                assert_eq!(fresh, format_block(&[line(10)]));
                assert_eq!(chunker.lines(), &[line(10)]);
            }
            other => panic!("expected roll-over, got {other:?}"),
        }
    }

    #[test]
    fn test_single_oversized_line_passes_through() {
        let mut chunker = Chunker::new(50);
        match chunker.push(line(100)) {
            Append::Updated(content) => assert_eq!(content.len(), 100 + FENCE),
            other => panic!("expected oversized pass-through, got {other:?}"),
        }
        // the next line still rolls the oversized block away
        match chunker.push(line(5)) {
            Append::Rolled { sealed, .. } => assert_eq!(sealed, format_block(&[line(100)])),
            other => panic!("expected roll-over, got {other:?}"),
        }
    }

    #[test]
    fn test_oversized_line_after_roll_starts_its_own_block() {
        let mut chunker = Chunker::new(30);
        chunker.push(line(10));
        match chunker.push(line(200)) {
            Append::Rolled { sealed, fresh } => {
                assert_eq!(sealed, format_block(&[line(10)]));
                assert_eq!(fresh.len(), 200 + FENCE);
            }
            other => panic!("expected roll-over, got {other:?}"),
        }
    }

    #[test]
    fn test_format_is_idempotent() {
        let mut chunker = Chunker::new(4000);
        for i in 0..10 {
            chunker.push(format!("line {i}"));
        }
        assert_eq!(chunker.format(), chunker.format());
        assert_eq!(chunker.format(), format_block(chunker.lines()));
    }

    /// 500 lines of 20 characters is 10000 raw characters, well past one
    /// 4000-character block: at least three blocks come out, every sealed
    /// block stays within the ceiling, and no line is lost or duplicated.
    #[test]
    fn test_bulk_output_chunks_within_ceiling() {
        let mut chunker = Chunker::new(4000);
        let mut sealed_blocks = Vec::new();
        for i in 0..500 {
            let text = format!("{i:020}");
            if let Append::Rolled { sealed, .. } = chunker.push(text) {
                sealed_blocks.push(sealed);
            }
        }
        assert!(sealed_blocks.len() >= 2);
        for block in &sealed_blocks {
            assert!(block.len() <= 4000, "sealed block of {} chars", block.len());
        }

        let mut replayed: Vec<String> = Vec::new();
        for block in sealed_blocks.iter().chain(std::iter::once(&chunker.format())) {
            let body = block
                .strip_prefix("```\n")
                .and_then(|b| b.strip_suffix("\n```"))
                .unwrap();
            replayed.extend(body.split('\n').map(str::to_string));
        }
        assert_eq!(replayed.len(), 500);
        for (i, text) in replayed.iter().enumerate() {
            assert_eq!(*text, format!("{i:020}"));
        }
    }
}
