//! Ant-style path patterns.
//!
//! Supported syntax per separator-delimited segment:
//! - `?` one character, `*` zero or more characters
//! - `**` as a whole segment: zero or more segments
//! - `{name}` / `{name:regex}`: one segment (the regex is not enforced)

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    AnySegments,
    Glob(Vec<char>),
}

/// A compiled pattern for one separator (`/` for paths, `.` for hosts).
#[derive(Clone, PartialEq)]
pub struct AntPattern {
    raw: String,
    separator: char,
    segments: Vec<Segment>,
}

impl AntPattern {
    pub fn new(pattern: &str, separator: char) -> Self {
        let segments = pattern
            .split(separator)
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s == "**" {
                    Segment::AnySegments
                } else {
                    Segment::Glob(replace_variables(s).chars().collect())
                }
            })
            .collect();

        Self {
            raw: pattern.to_string(),
            separator,
            segments,
        }
    }

    /// Path pattern (`/` separated).
    pub fn path(pattern: &str) -> Self {
        Self::new(pattern, '/')
    }

    /// Host pattern (`.` separated, case-insensitive).
    pub fn host(pattern: &str) -> Self {
        Self::new(&pattern.to_ascii_lowercase(), '.')
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, input: &str) -> bool {
        let lowered;
        let input = if self.separator == '.' {
            lowered = input.to_ascii_lowercase();
            lowered.as_str()
        } else {
            input
        };

        let parts: Vec<Vec<char>> = input
            .split(self.separator)
            .filter(|s| !s.is_empty())
            .map(|s| s.chars().collect())
            .collect();
        match_segments(&self.segments, &parts)
    }
}

impl fmt::Debug for AntPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.raw)
    }
}

/// `{var}` and `{var:regex}` both become `*`.
fn replace_variables(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut depth = 0usize;
    for c in segment.chars() {
        match c {
            '{' => {
                if depth == 0 {
                    out.push('*');
                }
                depth += 1;
            }
            '}' if depth > 0 => depth -= 1,
            _ if depth > 0 => {}
            c => out.push(c),
        }
    }
    out
}

/// Two-pointer match over segments; `**` backtracks to the most recent one
/// only, so several `**` never blow up.
fn match_segments(pattern: &[Segment], parts: &[Vec<char>]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut any: Option<(usize, usize)> = None;

    while t < parts.len() {
        match pattern.get(p) {
            Some(Segment::Glob(glob)) if glob_matches(glob, &parts[t]) => {
                p += 1;
                t += 1;
            }
            Some(Segment::AnySegments) => {
                any = Some((p, t));
                p += 1;
            }
            _ => match any {
                Some((ap, at)) => {
                    p = ap + 1;
                    t = at + 1;
                    any = Some((ap, at + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|s| *s == Segment::AnySegments)
}

/// Iterative wildcard match with single-star backtracking.
fn glob_matches(glob: &[char], text: &[char]) -> bool {
    let (mut g, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if g < glob.len() && (glob[g] == '?' || glob[g] == text[t]) {
            g += 1;
            t += 1;
        } else if g < glob.len() && glob[g] == '*' {
            star = Some((g, t));
            g += 1;
        } else if let Some((sg, st)) = star {
            g = sg + 1;
            t = st + 1;
            star = Some((sg, st + 1));
        } else {
            return false;
        }
    }

    glob[g..].iter().all(|&c| c == '*')
}
