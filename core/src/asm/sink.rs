use std::io::{self, Write};

use super::{Instruction, Line};
use crate::ast::Span;
use crate::target::Register;

/// Destination of generated assembly.
///
/// Every line is paired with the span of the node that produced it, for
/// diagnostics only. Sinks do not validate what they are given.
pub trait InstructionSink {
    fn emit(&mut self, span: &Span, line: Line);

    /// Called exactly once, after the last line of a program.
    fn flush(&mut self) -> io::Result<()>;
}

impl<S: InstructionSink + ?Sized> InstructionSink for &mut S {
    fn emit(&mut self, span: &Span, line: Line) {
        (**self).emit(span, line)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Lay out one listing line: labels start in column 0, the rest is indented.
fn listing_line(line: &Line) -> String {
    match line {
        Line::Label(_) => line.to_string(),
        _ => format!("\t{}", line),
    }
}

/// Sink that writes an assembly listing to any `io::Write`.
///
/// Lines are buffered and written out on [`flush`](InstructionSink::flush),
/// so an I/O failure surfaces once, at the end of generation.
pub struct CodeStream<W: Write> {
    out: W,
    pending: Vec<String>,
    annotate: bool,
}

impl<W: Write> CodeStream<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            pending: Vec::new(),
            annotate: false,
        }
    }

    /// Append the originating source span to every line as a comment.
    pub fn with_source_positions(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> InstructionSink for CodeStream<W> {
    fn emit(&mut self, span: &Span, line: Line) {
        let mut text = listing_line(&line);
        if self.annotate && !matches!(line, Line::Comment(_)) {
            text.push_str(&format!("\t# @{}", span));
        }
        self.pending.push(text);
    }

    fn flush(&mut self) -> io::Result<()> {
        for line in self.pending.drain(..) {
            writeln!(self.out, "{}", line)?;
        }
        self.out.flush()
    }
}

/// A line together with the span it is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emitted {
    pub span: Span,
    pub line: Line,
}

/// In-memory sink that keeps lines typed.
#[derive(Debug, Default)]
pub struct AsmBuffer {
    lines: Vec<Emitted>,
    flushed: bool,
}

impl AsmBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[Emitted] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.lines.iter().filter_map(|e| e.line.as_instruction())
    }

    /// Net bytes pushed by the `sp` adjustments emitted from `start` on.
    pub fn stack_growth_since(&self, start: usize, sp: Register) -> i32 {
        self.lines[start..]
            .iter()
            .filter_map(|e| e.line.as_instruction())
            .map(|instr| instr.stack_growth(sp))
            .sum()
    }

    /// Lines rendered without indentation, one string per line.
    pub fn texts(&self) -> Vec<String> {
        self.lines.iter().map(|e| e.line.to_string()).collect()
    }

    /// The same listing a [`CodeStream`] would write.
    pub fn to_listing(&self) -> String {
        let mut out = String::new();
        for emitted in &self.lines {
            out.push_str(&listing_line(&emitted.line));
            out.push('\n');
        }
        out
    }
}

impl InstructionSink for AsmBuffer {
    fn emit(&mut self, span: &Span, line: Line) {
        self.lines.push(Emitted {
            span: span.clone(),
            line,
        });
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::{Directive, Operand};
    use pretty_assertions::assert_eq;

    fn sample(sink: &mut impl InstructionSink) {
        let span = Span::new(3, 8);
        sink.emit(&span, Directive::Text.into());
        sink.emit(&span, Line::Label("main".into()));
        sink.emit(
            &span,
            Instruction::Subu {
                rd: Register::Sp,
                rs: Register::Sp,
                rt: Operand::Imm(4),
            }
            .into(),
        );
        sink.emit(&span, Line::Comment("done".into()));
    }

    #[test]
    fn test_code_stream_writes_on_flush() {
        let mut stream = CodeStream::new(Vec::new());
        sample(&mut stream);
        stream.flush().unwrap();
        let text = String::from_utf8(stream.into_inner()).unwrap();
        assert_eq!(text, "\t.text\nmain:\n\tsubu $sp,$sp,4\n\t# done\n");
    }

    #[test]
    fn test_code_stream_annotates_spans() {
        let mut stream = CodeStream::new(Vec::new()).with_source_positions(true);
        sample(&mut stream);
        stream.flush().unwrap();
        let text = String::from_utf8(stream.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "main:\t# @3..8");
        assert_eq!(lines[2], "\tsubu $sp,$sp,4\t# @3..8");
        assert_eq!(lines[3], "\t# done");
    }

    #[test]
    fn test_buffer_keeps_spans_and_growth() {
        let mut buffer = AsmBuffer::new();
        sample(&mut buffer);
        assert!(!buffer.is_flushed());
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.lines()[2].span, Span::new(3, 8));
        assert_eq!(buffer.stack_growth_since(0, Register::Sp), 4);
        assert_eq!(buffer.instructions().count(), 1);
        buffer.flush().unwrap();
        assert!(buffer.is_flushed());
        assert_eq!(buffer.to_listing(), "\t.text\nmain:\n\tsubu $sp,$sp,4\n\t# done\n");
    }
}
