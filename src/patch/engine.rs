//! Pure patch engine over an in-memory line sequence.
//!
//! Lines keep their own terminator so that joining the sequence back gives
//! the original bytes for every untouched line. Insertion never mutates the
//! input; it builds a new sequence.

use crate::patch::error::{Marker, PatchError};

/// Line terminator as it appeared in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eol {
    Lf,
    CrLf,
    /// Final line without a terminator.
    None,
}

impl Eol {
    pub fn as_str(self) -> &'static str {
        match self {
            Eol::Lf => "\n",
            Eol::CrLf => "\r\n",
            Eol::None => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub eol: Eol,
}

impl Line {
    pub fn new(text: impl Into<String>, eol: Eol) -> Self {
        Self {
            text: text.into(),
            eol,
        }
    }
}

/// Result of a successful insertion.
#[derive(Debug, Clone)]
pub struct Insertion {
    pub lines: Vec<Line>,
    /// Zero-based index of the start marker line.
    pub marker_index: usize,
}

/// Split text into lines, keeping `\n` / `\r\n` per line.
pub fn split_lines(input: &str) -> Vec<Line> {
    let mut out = Vec::new();
    let mut rest = input;
    while !rest.is_empty() {
        match rest.find('\n') {
            Some(idx) => {
                let raw = &rest[..idx];
                let line = match raw.strip_suffix('\r') {
                    Some(text) => Line::new(text, Eol::CrLf),
                    None => Line::new(raw, Eol::Lf),
                };
                out.push(line);
                rest = &rest[idx + 1..];
            }
            None => {
                out.push(Line::new(rest, Eol::None));
                break;
            }
        }
    }
    out
}

pub fn join_lines(lines: &[Line]) -> String {
    let mut out = String::with_capacity(lines.iter().map(|l| l.text.len() + 2).sum());
    for line in lines {
        out.push_str(&line.text);
        out.push_str(line.eol.as_str());
    }
    out
}

fn find_start(lines: &[Line], start: &str) -> Result<usize, PatchError> {
    lines
        .iter()
        .position(|l| l.text == start)
        .ok_or_else(|| PatchError::MarkerNotFound {
            marker: Marker::Start,
            text: start.to_string(),
        })
}

/// Insert `block` directly after the first line equal to `start`.
///
/// A line equal to `end` must follow the start marker. Inserted lines take the
/// start marker's terminator, which is never `Eol::None` here because at least
/// the end marker follows it.
pub fn insert_after_marker(
    lines: &[Line],
    start: &str,
    end: &str,
    block: &[String],
) -> Result<Insertion, PatchError> {
    let marker_index = find_start(lines, start)?;

    if !lines[marker_index + 1..].iter().any(|l| l.text == end) {
        return Err(PatchError::MarkerNotFound {
            marker: Marker::End,
            text: end.to_string(),
        });
    }

    let eol = lines[marker_index].eol;
    let mut out = Vec::with_capacity(lines.len() + block.len());
    out.extend_from_slice(&lines[..=marker_index]);
    out.extend(block.iter().map(|text| Line::new(text.as_str(), eol)));
    out.extend_from_slice(&lines[marker_index + 1..]);

    Ok(Insertion {
        lines: out,
        marker_index,
    })
}

/// True if the lines right after the start marker already equal `block`.
///
/// Only used when the caller opts in; a plain patch inserts unconditionally.
pub fn is_applied(lines: &[Line], start: &str, block: &[String]) -> bool {
    let Ok(idx) = find_start(lines, start) else {
        return false;
    };
    let after = &lines[idx + 1..];
    !block.is_empty()
        && after.len() >= block.len()
        && after.iter().zip(block).all(|(line, want)| &line.text == want)
}
