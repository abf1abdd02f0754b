use glam::DVec3;

/// Splits a line into tokens. Parentheses and commas separate tokens like whitespace does, so
/// `(-160.0 20.0)` yields `-160.0` and `20.0`.
fn split_line(line: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut token_start: Option<usize> = None;

    for (i, ch) in line.char_indices() {
        if ch.is_whitespace() || matches!(ch, '(' | ')' | ',') {
            if let Some(start) = token_start.take() {
                result.push(&line[start..i]);
            }
        } else if token_start.is_none() {
            token_start = Some(i);
        }
    }

    // Handle final token
    if let Some(start) = token_start {
        result.push(&line[start..]);
    }

    result
}

/// A single non-empty, non-comment line of an Acclaim file.
#[derive(Clone, Debug, PartialEq)]
pub struct Line<'a> {
    /// 1-based line number in the source text.
    pub number: usize,
    /// The line with surrounding whitespace removed.
    pub raw: &'a str,
    pub tokens: Vec<&'a str>,
}

impl<'a> Line<'a> {
    pub fn key(&self) -> &'a str {
        self.tokens[0]
    }

    pub fn params(&self) -> &[&'a str] {
        &self.tokens[1..]
    }

    /// Section headers start with a colon, e.g. `:bonedata`.
    pub fn is_section(&self) -> bool {
        self.key().starts_with(':')
    }

    pub fn float(&self, index: usize) -> Option<f64> {
        self.tokens.get(index)?.parse().ok()
    }

    pub fn vec3(&self, start: usize) -> Option<DVec3> {
        Some(DVec3::new(
            self.float(start)?,
            self.float(start + 1)?,
            self.float(start + 2)?,
        ))
    }
}

/// Cursor over the meaningful lines of a text file with one line of look-ahead.
pub struct LineReader<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    peeked: Option<Line<'a>>,
}

impl<'a> LineReader<'a> {
    pub fn new(data: &'a str) -> Self {
        Self {
            lines: data.lines().enumerate(),
            peeked: None,
        }
    }

    fn read(&mut self) -> Option<Line<'a>> {
        for (index, raw) in self.lines.by_ref() {
            let tokens = split_line(raw);
            if tokens.is_empty() || tokens[0].starts_with('#') {
                continue;
            }
            return Some(Line {
                number: index + 1,
                raw: raw.trim(),
                tokens,
            });
        }
        None
    }

    pub fn peek(&mut self) -> Option<&Line<'a>> {
        if self.peeked.is_none() {
            self.peeked = self.read();
        }
        self.peeked.as_ref()
    }

    /// Returns the next line, unless it starts a new section.
    pub fn next_in_section(&mut self) -> Option<Line<'a>> {
        if self.peek()?.is_section() {
            None
        } else {
            self.next()
        }
    }

    /// Returns the next line if it satisfies `predicate`.
    pub fn next_if(&mut self, predicate: impl FnOnce(&Line<'a>) -> bool) -> Option<Line<'a>> {
        if predicate(self.peek()?) {
            self.next()
        } else {
            None
        }
    }
}

impl<'a> Iterator for LineReader<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.peeked.take().or_else(|| self.read())
    }
}
