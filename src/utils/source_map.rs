/// Maps byte offsets of the source text to 1-based line and column numbers.
#[derive(Debug, Clone)]
pub struct SourceMap {
    line_starts: Vec<usize>,
}

impl SourceMap {
    pub fn new(input: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(input.match_indices('\n').map(|(idx, _)| idx + 1))
            .collect();
        Self { line_starts }
    }

    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        (line + 1, offset - self.line_starts[line] + 1)
    }

    pub fn format_location(&self, offset: usize) -> String {
        let (line, col) = self.line_col(offset);
        format!("line {}, column {}", line, col)
    }
}

#[cfg(test)]
mod tests {
    use super::SourceMap;

    #[test]
    fn line_and_column() {
        let map = SourceMap::new("int main() {\n  return x;\n}\n");
        assert_eq!(map.line_col(0), (1, 1));
        assert_eq!(map.line_col(4), (1, 5));
        assert_eq!(map.line_col(13), (2, 1));
        assert_eq!(map.line_col(22), (2, 10));
        assert_eq!(map.format_location(25), "line 3, column 1");
    }
}
