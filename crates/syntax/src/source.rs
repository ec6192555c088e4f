//! Ruby source lines, used to annotate generated code with the statement
//! each block came from.

/// Source text indexed by 1-based line number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLines {
    lines: Vec<String>,
}

impl SourceLines {
    pub fn new(source: &str) -> Self {
        Self { lines: source.lines().map(str::to_string).collect() }
    }

    /// Text of `line`, without its terminator.
    pub fn get(&self, line: u32) -> Option<&str> {
        let index = usize::try_from(line).ok()?.checked_sub(1)?;
        self.lines.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl From<&str> for SourceLines {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_are_one_based() {
        let src = SourceLines::new("x = 1\r\nputs x\n");
        assert_eq!(src.len(), 2);
        assert_eq!(src.get(0), None);
        assert_eq!(src.get(1), Some("x = 1"));
        assert_eq!(src.get(2), Some("puts x"));
        assert_eq!(src.get(3), None);
    }
}
