//! Rust-compiler-style diagnostic rendering: a source span plus a message
//! renders as a snippet with a caret underline, optional notes, and help.

use std::fmt;

/// A half-open byte range into the original source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn point(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos + 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Label {
    pub span: Span,
    pub message: String,
    pub is_primary: bool,
}

impl Label {
    pub fn primary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            is_primary: true,
        }
    }

    pub fn secondary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            is_primary: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub source: Option<String>,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub help: Vec<String>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
            labels: Vec::new(),
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    pub fn with_secondary_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::secondary(span, message));
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }

    fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
        let mut line = 1;
        let mut col = 1;
        for (i, ch) in source.char_indices() {
            if i >= offset {
                break;
            }
            if ch == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        (line, col)
    }

    fn get_line(source: &str, line_number: usize) -> &str {
        source.lines().nth(line_number - 1).unwrap_or("")
    }

    fn line_number_width(line: usize) -> usize {
        line.to_string().len()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.message)?;

        if let Some(source) = &self.source {
            for label in &self.labels {
                let (line, col) = Self::offset_to_line_col(source, label.span.start);
                let width = Self::line_number_width(line);
                writeln!(f, "{:width$} --> line {}, column {}", "", line, col, width = width)?;
                writeln!(f, "{:width$} |", "", width = width)?;
                writeln!(f, "{line:width$} | {}", Self::get_line(source, line), width = width)?;
                let underline_len = label
                    .span
                    .end
                    .saturating_sub(label.span.start)
                    .max(1)
                    .min(80);
                let marker = if label.is_primary { '^' } else { '-' };
                writeln!(
                    f,
                    "{:width$} | {}{} {}",
                    "",
                    " ".repeat(col.saturating_sub(1)),
                    marker.to_string().repeat(underline_len),
                    label.message,
                    width = width
                )?;
            }
        }

        for note in &self.notes {
            writeln!(f, "note: {note}")?;
        }
        for help in &self.help {
            writeln!(f, "help: {help}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_message_and_source_snippet() {
        let source = "int x = true;";
        let diag = Diagnostic::new("type mismatch")
            .with_source(source)
            .with_label(Label::primary(Span::new(8, 12), "expected `int`, found `bool`"));
        let rendered = diag.to_string();
        assert!(rendered.contains("type mismatch"));
        assert!(rendered.contains("int x = true;"));
        assert!(rendered.contains("expected `int`, found `bool`"));
    }

    #[test]
    fn notes_and_help_are_appended() {
        let diag = Diagnostic::new("undefined function 'foo'")
            .with_note("did you forget to declare it?")
            .with_help("check for a typo");
        let rendered = diag.to_string();
        assert!(rendered.contains("note: did you forget to declare it?"));
        assert!(rendered.contains("help: check for a typo"));
    }

    #[test]
    fn line_col_tracks_across_newlines() {
        let source = "fn main() -> int {\n    return x;\n}";
        let (line, col) = Diagnostic::offset_to_line_col(source, 27);
        assert_eq!(line, 2);
        assert_eq!(col, 12);
    }
}
