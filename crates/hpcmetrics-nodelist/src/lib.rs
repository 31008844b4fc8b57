// SPDX-License-Identifier: Apache-2.0

//! Parser and matcher for compact cluster node-list expressions.
//!
//! A node-list expression is a comma-separated disjunction of terms, where each term is a
//! concatenation of literal segments and bracketed numeric ranges, e.g.
//! `alex[01-99],fritz[005-500],woody[100-200]`. [`NodeList::contains`] checks whether a hostname
//! is represented by the expression; [`NodeList::enumerate`] materialises every hostname the
//! expression represents.

use std::fmt;

/// Errors produced while parsing a node-list expression.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A `[` was never matched by a closing `]`.
    #[error("unclosed '[' starting at byte {pos}")]
    UnclosedBracket {
        /// Byte offset of the unmatched `[`.
        pos: usize,
    },
    /// A range inside brackets did not contain a `-` separator.
    #[error("missing '-' in range at byte {pos}")]
    MissingDash {
        /// Byte offset where a range was expected.
        pos: usize,
    },
    /// The two sides of a range had a different number of digits.
    #[error("mismatched digit widths in range '{lhs}-{rhs}' at byte {pos}")]
    MismatchedWidth {
        /// Left-hand side of the range.
        lhs: String,
        /// Right-hand side of the range.
        rhs: String,
        /// Byte offset of the range.
        pos: usize,
    },
    /// The lower bound of a range was greater than the upper bound.
    #[error("range lower bound exceeds upper bound in '{lhs}-{rhs}' at byte {pos}")]
    DescendingRange {
        /// Left-hand side of the range.
        lhs: String,
        /// Right-hand side of the range.
        rhs: String,
        /// Byte offset of the range.
        pos: usize,
    },
    /// A character outside `[a-zA-Z0-9,\[\]-]` was encountered where a literal or digit was
    /// expected.
    #[error("invalid character '{ch}' at byte {pos}")]
    InvalidChar {
        /// The offending character.
        ch: char,
        /// Byte offset of the character.
        pos: usize,
    },
    /// A term or range was empty (e.g. `alex[]` or two consecutive commas).
    #[error("empty term or range at byte {pos}")]
    Empty {
        /// Byte offset of the empty element.
        pos: usize,
    },
}

/// A single matcher within a term: either a literal substring or a bracketed set of numeric
/// ranges, any of which may match at that position.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Matcher {
    Literal(String),
    Ranges(Vec<DigitRange>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DigitRange {
    digits: usize,
    lo: u64,
    hi: u64,
}

/// One alternative in the top-level disjunction: a sequence of matchers consumed in order.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Term {
    matchers: Vec<Matcher>,
}

/// A parsed node-list expression.
///
/// Cheap to clone (terms are plain data); construct once per cluster/subcluster and keep it
/// around for repeated `contains` checks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeList {
    terms: Vec<Term>,
}

impl fmt::Display for NodeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeList({} term(s))", self.terms.len())
    }
}

impl NodeList {
    /// Parses a node-list expression.
    pub fn parse(expr: &str) -> Result<Self, ParseError> {
        let mut terms = Vec::new();
        for (term_start, term_src) in split_top_level(expr, ',') {
            if term_src.is_empty() {
                return Err(ParseError::Empty { pos: term_start });
            }
            terms.push(parse_term(term_src, term_start)?);
        }
        Ok(NodeList { terms })
    }

    /// Returns `true` iff `hostname` is matched, left-to-right in full, by at least one term.
    #[must_use]
    pub fn contains(&self, hostname: &str) -> bool {
        self.terms
            .iter()
            .any(|term| match_term(&term.matchers, hostname))
    }

    /// Materialises every hostname represented by this expression.
    ///
    /// Used by cluster bootstrapping to size per-subcluster host sets. Callers should avoid this
    /// for expressions with astronomically large ranges; it allocates one `String` per host.
    #[must_use]
    pub fn enumerate(&self) -> Vec<String> {
        let mut out = Vec::new();
        for term in &self.terms {
            enumerate_term(&term.matchers, String::new(), &mut out);
        }
        out
    }
}

fn enumerate_term(matchers: &[Matcher], prefix: String, out: &mut Vec<String>) {
    let Some((head, rest)) = matchers.split_first() else {
        out.push(prefix);
        return;
    };
    match head {
        Matcher::Literal(lit) => {
            let mut next = prefix;
            next.push_str(lit);
            enumerate_term(rest, next, out);
        }
        Matcher::Ranges(ranges) => {
            for range in ranges {
                for v in range.lo..=range.hi {
                    let mut next = prefix.clone();
                    next.push_str(&format!("{v:0width$}", width = range.digits));
                    enumerate_term(rest, next, out);
                }
            }
        }
    }
}

fn match_term(matchers: &[Matcher], remaining: &str) -> bool {
    let Some((head, rest)) = matchers.split_first() else {
        return remaining.is_empty();
    };
    match head {
        Matcher::Literal(lit) => remaining
            .strip_prefix(lit.as_str())
            .is_some_and(|tail| match_term(rest, tail)),
        Matcher::Ranges(ranges) => ranges.iter().any(|range| {
            if remaining.len() < range.digits || !remaining.is_char_boundary(range.digits) {
                return false;
            }
            let (head_digits, tail) = remaining.split_at(range.digits);
            if head_digits.len() != range.digits || !head_digits.bytes().all(|b| b.is_ascii_digit())
            {
                return false;
            }
            match head_digits.parse::<u64>() {
                Ok(v) if v >= range.lo && v <= range.hi => match_term(rest, tail),
                _ => false,
            }
        }),
    }
}

/// Splits `s` on `sep` at the top syntactic level only (not inside `[...]`), returning each
/// segment paired with its byte offset in the original string.
fn split_top_level(s: &str, sep: char) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, ch) in s.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                out.push((start, &s[start..i]));
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    out.push((start, &s[start..]));
    out
}

fn parse_term(src: &str, base: usize) -> Result<Term, ParseError> {
    let mut matchers = Vec::new();
    let mut chars = src.char_indices().peekable();
    let mut literal = String::new();

    while let Some(&(i, ch)) = chars.peek() {
        if ch == '[' {
            if !literal.is_empty() {
                matchers.push(Matcher::Literal(std::mem::take(&mut literal)));
            }
            let close = find_matching_bracket(src, i)
                .ok_or(ParseError::UnclosedBracket { pos: base + i })?;
            let inner = &src[i + 1..close];
            let ranges = parse_ranges(inner, base + i + 1)?;
            matchers.push(Matcher::Ranges(ranges));
            // advance iterator past the closing bracket
            while let Some(&(j, _)) = chars.peek() {
                if j > close {
                    break;
                }
                let _ = chars.next();
            }
        } else if ch.is_ascii_alphanumeric() {
            literal.push(ch);
            let _ = chars.next();
        } else {
            return Err(ParseError::InvalidChar {
                ch,
                pos: base + i,
            });
        }
    }
    if !literal.is_empty() {
        matchers.push(Matcher::Literal(literal));
    }
    if matchers.is_empty() {
        return Err(ParseError::Empty { pos: base });
    }
    Ok(Term { matchers })
}

fn find_matching_bracket(src: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, ch) in src.char_indices().skip_while(|&(i, _)| i < open) {
        match ch {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_ranges(inner: &str, base: usize) -> Result<Vec<DigitRange>, ParseError> {
    let mut ranges = Vec::new();
    for (start, piece) in split_top_level(inner, ',') {
        let pos = base + start;
        if piece.is_empty() {
            return Err(ParseError::Empty { pos });
        }
        let Some(dash) = piece.find('-') else {
            return Err(ParseError::MissingDash { pos });
        };
        let lhs = &piece[..dash];
        let rhs = &piece[dash + 1..];
        if lhs.is_empty() || rhs.is_empty() {
            return Err(ParseError::MissingDash { pos });
        }
        if !lhs.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::InvalidChar {
                ch: lhs.chars().find(|c| !c.is_ascii_digit()).unwrap_or('?'),
                pos,
            });
        }
        if !rhs.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::InvalidChar {
                ch: rhs.chars().find(|c| !c.is_ascii_digit()).unwrap_or('?'),
                pos: pos + dash + 1,
            });
        }
        if lhs.len() != rhs.len() {
            return Err(ParseError::MismatchedWidth {
                lhs: lhs.to_string(),
                rhs: rhs.to_string(),
                pos,
            });
        }
        let lo: u64 = lhs.parse().map_err(|_| ParseError::Empty { pos })?;
        let hi: u64 = rhs.parse().map_err(|_| ParseError::Empty { pos })?;
        if lo > hi {
            return Err(ParseError::DescendingRange {
                lhs: lhs.to_string(),
                rhs: rhs.to_string(),
                pos,
            });
        }
        ranges.push(DigitRange {
            digits: lhs.len(),
            lo,
            hi,
        });
    }
    if ranges.is_empty() {
        return Err(ParseError::Empty { pos: base });
    }
    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_matches_mixed_terms() {
        let list =
            NodeList::parse("hallo,wel123t,emmy[01-99],fritz[005-500],woody[100-200]").unwrap();
        for host in ["emmy42", "fritz123", "woody199", "hallo"] {
            assert!(list.contains(host), "expected {host} to match");
        }
        for host in ["hello", "fritz1", "fritz9", "fritz004", "woody201", "woody"] {
            assert!(!list.contains(host), "expected {host} to be rejected");
        }
    }

    #[test]
    fn rejects_unclosed_bracket() {
        let err = NodeList::parse("alex[01-99").unwrap_err();
        assert!(matches!(err, ParseError::UnclosedBracket { .. }));
    }

    #[test]
    fn rejects_missing_dash() {
        let err = NodeList::parse("alex[0199]").unwrap_err();
        assert!(matches!(err, ParseError::MissingDash { .. }));
    }

    #[test]
    fn rejects_mismatched_width() {
        let err = NodeList::parse("alex[1-100]").unwrap_err();
        assert!(matches!(err, ParseError::MismatchedWidth { .. }));
    }

    #[test]
    fn rejects_invalid_char() {
        let err = NodeList::parse("alex_01").unwrap_err();
        assert!(matches!(err, ParseError::InvalidChar { .. }));
    }

    #[test]
    fn enumeration_round_trips_into_contains() {
        let list = NodeList::parse("alex[01-05],fritz[010-012]").unwrap();
        let hosts = list.enumerate();
        assert_eq!(hosts.len(), 5 + 3);
        for host in &hosts {
            assert!(list.contains(host));
        }
        assert!(!list.contains("alex06"));
        assert!(!list.contains("fritz013"));
    }

    #[test]
    fn leading_zeros_fix_field_width() {
        let list = NodeList::parse("n[005-010]").unwrap();
        assert!(list.contains("n005"));
        assert!(!list.contains("n5"));
        assert!(!list.contains("n0005"));
    }

    #[test]
    fn multiple_ranges_in_one_bracket_are_a_disjunction() {
        let list = NodeList::parse("a[01-03,10-12]").unwrap();
        for host in ["a01", "a03", "a10", "a12"] {
            assert!(list.contains(host));
        }
        for host in ["a04", "a09", "a13"] {
            assert!(!list.contains(host));
        }
    }

    #[test]
    fn property_every_enumerated_host_is_contained_and_prefix_variants_are_not() {
        let list = NodeList::parse("gpu[001-050]").unwrap();
        for host in list.enumerate() {
            assert!(list.contains(&host));
        }
        // Same prefix, wrong width or out of range.
        assert!(!list.contains("gpu51"));
        assert!(!list.contains("gpu0051"));
        assert!(!list.contains("gpu000"));
    }
}
