//! Patch description: target file, marker lines, and the block to insert.

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// One level of indentation. Must match the host file's convention since the
/// insertion is purely textual.
///
/// Textual form: `tab`, `spaces` (four), or `spaces:N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IndentUnit {
    Spaces(usize),
    Tab,
}

impl Default for IndentUnit {
    fn default() -> Self {
        IndentUnit::Spaces(4)
    }
}

impl IndentUnit {
    /// Prefix for `level` indentation units.
    pub fn render(&self, level: usize) -> String {
        match self {
            IndentUnit::Spaces(n) => " ".repeat(n * level),
            IndentUnit::Tab => "\t".repeat(level),
        }
    }
}

impl FromStr for IndentUnit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("tab") {
            return Ok(IndentUnit::Tab);
        }
        if s == "spaces" {
            return Ok(IndentUnit::default());
        }
        let Some(count) = s.strip_prefix("spaces:") else {
            bail!("indent unit must be `tab`, `spaces` or `spaces:N`, got {:?}", s);
        };
        let n: usize = count
            .parse()
            .with_context(|| format!("bad space count in indent unit {:?}", s))?;
        if n == 0 {
            bail!("indent unit needs at least one space: {:?}", s);
        }
        Ok(IndentUnit::Spaces(n))
    }
}

impl fmt::Display for IndentUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndentUnit::Spaces(n) => write!(f, "spaces:{}", n),
            IndentUnit::Tab => f.write_str("tab"),
        }
    }
}

impl TryFrom<String> for IndentUnit {
    type Error = anyhow::Error;

    fn try_from(s: String) -> anyhow::Result<Self> {
        s.parse()
    }
}

impl From<IndentUnit> for String {
    fn from(unit: IndentUnit) -> String {
        unit.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct PatchSpec {
    pub target: PathBuf,
    /// Matched as exact full-line equality (line terminator excluded).
    pub start_marker: String,
    pub end_marker: String,
    pub indent_level: usize,
    pub indent_unit: IndentUnit,
    pub content: Vec<String>,
}

impl PatchSpec {
    /// Content lines with the indentation prefix applied, in insertion order.
    pub fn indented_block(&self) -> Vec<String> {
        let prefix = self.indent_unit.render(self.indent_level);
        self.content
            .iter()
            .map(|line| format!("{}{}", prefix, line))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_indent_units() {
        assert_eq!("tab".parse::<IndentUnit>().unwrap(), IndentUnit::Tab);
        assert_eq!("spaces".parse::<IndentUnit>().unwrap(), IndentUnit::Spaces(4));
        assert_eq!("spaces:2".parse::<IndentUnit>().unwrap(), IndentUnit::Spaces(2));
        assert!("spaces:0".parse::<IndentUnit>().is_err());
        assert!("spaces:x".parse::<IndentUnit>().is_err());
        assert!("tabs:2".parse::<IndentUnit>().is_err());
    }

    #[test]
    fn display_parses_back() {
        for unit in [IndentUnit::Tab, IndentUnit::Spaces(3)] {
            assert_eq!(unit.to_string().parse::<IndentUnit>().unwrap(), unit);
        }
    }

    #[test]
    fn indented_block_prefixes_every_line() {
        let spec = PatchSpec {
            target: PathBuf::from("x.py"),
            start_marker: "a".to_string(),
            end_marker: "b".to_string(),
            indent_level: 2,
            indent_unit: IndentUnit::Spaces(4),
            content: vec!["x = 1".to_string(), "".to_string()],
        };
        assert_eq!(
            spec.indented_block(),
            vec!["        x = 1".to_string(), "        ".to_string()]
        );
    }

    #[test]
    fn tab_unit_repeats_per_level() {
        assert_eq!(IndentUnit::Tab.render(3), "\t\t\t");
        assert_eq!(IndentUnit::Tab.render(0), "");
    }
}
