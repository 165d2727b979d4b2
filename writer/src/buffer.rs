//! CTM output buffer.
//!
//! A topic block is a head followed by statements separated by `;` and closed
//! by `.`. The buffer tracks whether a block is open and whether its last
//! statement still needs a separator, so callers only push statements.

/// Indentation of statements inside a block.
pub const INDENT: &str = "    ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockState {
    Closed,
    /// Head written, no statement yet.
    Opened,
    /// At least one statement written; the last one is unterminated.
    Statement,
}

/// Accumulates CTM text.
#[derive(Debug, Clone)]
pub struct CtmBuffer {
    buf: String,
    state: BlockState,
}

impl Default for CtmBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl CtmBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: String::new(),
            state: BlockState::Closed,
        }
    }

    /// Appends a full line. Closes an open block first.
    pub fn line(&mut self, text: &str) {
        self.end_block();
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    /// Appends pre-rendered text verbatim. Closes an open block first.
    pub fn append(&mut self, text: &str) {
        self.end_block();
        self.buf.push_str(text);
    }

    /// Appends an empty line.
    pub fn blank(&mut self) {
        self.line("");
    }

    /// Appends a `#` comment line.
    pub fn comment(&mut self, text: &str) {
        self.line(&format!("# {text}"));
    }

    /// Starts a topic block with the given head (a topic reference).
    pub fn begin_block(&mut self, head: &str) {
        self.end_block();
        self.buf.push_str(head);
        self.state = BlockState::Opened;
    }

    /// Appends a statement to the open block.
    ///
    /// The previous statement, if any, is terminated with `;`.
    pub fn statement(&mut self, text: &str) {
        if self.state == BlockState::Closed {
            // A statement outside a block is a standalone line.
            self.line(text);
            return;
        }
        if self.state == BlockState::Statement {
            self.buf.push(';');
        }
        self.buf.push('\n');
        self.buf.push_str(INDENT);
        self.buf.push_str(text);
        self.state = BlockState::Statement;
    }

    /// Terminates the open block with `.`. Does nothing if no block is open.
    pub fn end_block(&mut self) {
        if self.state != BlockState::Closed {
            self.buf.push_str(" .\n");
            self.state = BlockState::Closed;
        }
    }

    /// Returns true if a block is open.
    #[must_use]
    pub fn is_block_open(&self) -> bool {
        self.state != BlockState::Closed
    }

    /// Returns the text written so far (an open block is not terminated).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Returns true if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Closes any open block and drains the accumulated text, leaving the
    /// buffer empty.
    pub fn take(&mut self) -> String {
        self.end_block();
        std::mem::take(&mut self.buf)
    }

    /// Closes any open block and returns the accumulated text.
    #[must_use]
    pub fn finish(mut self) -> String {
        self.take()
    }
}

/// Prefixes every non-empty line of `text` with `indent`.
#[must_use]
pub fn indent_lines(text: &str, indent: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    for line in text.lines() {
        if !line.is_empty() {
            out.push_str(indent);
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statements_are_separated_and_block_terminated() {
        let mut b = CtmBuffer::new();
        b.begin_block("ex:alice");
        b.statement("isa ex:Person");
        b.statement("- \"Alice\"");
        b.end_block();
        assert_eq!(
            b.as_str(),
            "ex:alice\n    isa ex:Person;\n    - \"Alice\" .\n"
        );
    }

    #[test]
    fn empty_block_is_terminated() {
        let mut b = CtmBuffer::new();
        b.begin_block("ex:alice");
        assert!(b.is_block_open());
        assert_eq!(b.finish(), "ex:alice .\n");
    }

    #[test]
    fn line_closes_open_block() {
        let mut b = CtmBuffer::new();
        b.begin_block("ex:a");
        b.statement("- \"A\"");
        b.line("ex:assoc(ex:r : ex:a)");
        assert_eq!(b.as_str(), "ex:a\n    - \"A\" .\nex:assoc(ex:r : ex:a)\n");
    }

    #[test]
    fn take_drains() {
        let mut b = CtmBuffer::new();
        b.comment("hello");
        assert_eq!(b.take(), "# hello\n");
        assert!(b.is_empty());
    }

    #[test]
    fn indents_non_empty_lines() {
        assert_eq!(indent_lines("a\n\nb\n", "  "), "  a\n\n  b\n");
    }
}
