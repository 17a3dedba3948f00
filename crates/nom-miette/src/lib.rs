//! Glue between `nom` parsers and `miette` diagnostics
//!
//! Parsers are written against [`LabeledParseError`], which remembers where in the input each failure happened and
//! which alternatives were attempted. Wrapping the top-level parser in [`final_parser`] turns that into a
//! [`LabeledError`]: a self-contained diagnostic that owns a copy of the input and points at the offending spans.

use std::fmt;

use ahash::{HashMap, HashMapExt};
use miette::{Diagnostic, LabeledSpan, SourceSpan};
use nom::{
    combinator::{all_consuming, complete},
    error::{ErrorKind, ParseError},
    Err, Finish, IResult, Parser,
};
use thiserror::Error;

// Public API ==========================================================================================================

/// Error kinds that can be attached to a [`LabeledParseError`]
///
/// The optional `label` is the short text that miette will print underneath the span where the error occurred.
pub trait LabeledErrorKind: Diagnostic + Clone + Eq + From<ErrorKind> + 'static {
    fn label(&self) -> Option<&'static str> {
        None
    }
}

/// Converts errors raised by [`map_res`] callbacks into parse errors
///
/// Set `FATAL` when the failure should stop `nom` from backtracking into other alternatives.
pub trait FromExternalError<'a, E>: Sized {
    const FATAL: bool = false;

    fn from_external_error(input: &'a str, error: E) -> LabeledParseError<'a, Self>;
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("{error}")]
pub struct LabeledError<E: LabeledErrorKind> {
    full_input: String,
    labels: Vec<LabeledSpan>,
    error: ErrorTree<E>,
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ErrorTree<E: LabeledErrorKind> {
    #[error("{kind}")]
    Node {
        kind: E,
        #[source]
        source: Option<Box<LabeledError<E>>>,
    },
    #[error("attempted {} parse branches unsuccessfully", .0.len())]
    Branch(Vec<LabeledError<E>>),
}

impl<E: LabeledErrorKind> LabeledError<E> {
    /// The innermost error kind along the first chain of sources
    pub fn kind(&self) -> Option<&E> {
        match &self.error {
            ErrorTree::Node {
                source: Some(source),
                ..
            } => source.kind(),
            ErrorTree::Node { kind, .. } => Some(kind),
            ErrorTree::Branch(_) => None,
        }
    }
}

/// Errors produced while a parser is running
///
/// Unlike [`LabeledError`], this borrows the input so that it's cheap to build and throw away while backtracking.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum LabeledParseError<'a, E> {
    Node {
        input: &'a str,
        length: usize,
        kind: E,
        source: Option<Box<LabeledParseError<'a, E>>>,
    },
    Branch(Vec<LabeledParseError<'a, E>>),
}

impl<'a, E> LabeledParseError<'a, E> {
    pub fn new(input: &'a str, kind: E) -> Self {
        Self::Node {
            input,
            length: 0,
            kind,
            source: None,
        }
    }

    pub fn with_source(input: &'a str, kind: E, source: Self) -> Self {
        Self::Node {
            input,
            length: 0,
            kind,
            source: Some(Box::new(source)),
        }
    }

    #[must_use]
    fn spanning(self, new_length: usize) -> Self {
        match self {
            Self::Node {
                input, kind, source, ..
            } => Self::Node {
                input,
                length: new_length,
                kind,
                source,
            },
            branch => branch,
        }
    }
}

// Combinators =========================================================================================================

/// Runs `parser` to completion, requiring that the entire input is consumed
pub fn final_parser<'a, O, P, E>(parser: P) -> impl FnMut(&'a str) -> Result<O, LabeledError<E>>
where
    E: LabeledErrorKind,
    P: Parser<&'a str, O, LabeledParseError<'a, E>>,
{
    let mut parser = all_consuming(complete(parser));
    move |input| {
        parser
            .parse(input)
            .finish()
            .map(|(_, output)| output)
            .map_err(|e| {
                let mut error = e.into_final_error(input);
                error.bubble_labels();
                error
            })
    }
}

/// Like `nom::combinator::map_res`, but the error from `f` is kept and labels everything `parser` consumed
pub fn map_res<'a, O1, O2, E1, E2, P, F>(
    mut parser: P,
    mut f: F,
) -> impl FnMut(&'a str) -> IResult<&'a str, O2, LabeledParseError<'a, E1>>
where
    E1: LabeledErrorKind + FromExternalError<'a, E2>,
    P: Parser<&'a str, O1, LabeledParseError<'a, E1>>,
    F: FnMut(O1) -> Result<O2, E2>,
{
    move |input| {
        let (rest, output) = parser.parse(input)?;
        f(output).map(|o| (rest, o)).map_err(|e| {
            let consumed = input.len() - rest.len();
            let error = E1::from_external_error(input, e).spanning(consumed);
            if E1::FATAL {
                Err::Failure(error)
            } else {
                Err::Error(error)
            }
        })
    }
}

/// Adds `kind` as context on top of any error returned by `parser`
pub fn wrap_err<'a, O, P, E>(
    mut parser: P,
    kind: E,
) -> impl FnMut(&'a str) -> IResult<&'a str, O, LabeledParseError<'a, E>>
where
    E: LabeledErrorKind,
    P: Parser<&'a str, O, LabeledParseError<'a, E>>,
{
    move |i| {
        parser
            .parse(i)
            .map_err(|e| e.map(|e| LabeledParseError::with_source(i, kind.clone(), e)))
    }
}

/// Replaces any error returned by `parser` with `kind`
pub fn expect<'a, O, P, E>(
    mut parser: P,
    kind: E,
) -> impl FnMut(&'a str) -> IResult<&'a str, O, LabeledParseError<'a, E>>
where
    E: LabeledErrorKind,
    P: Parser<&'a str, O, LabeledParseError<'a, E>>,
{
    move |i| {
        parser
            .parse(i)
            .map_err(|e| e.map(|_| LabeledParseError::new(i, kind.clone())))
    }
}

// Parse Error Finalization ============================================================================================

impl<'a, E: LabeledErrorKind> LabeledParseError<'a, E> {
    fn into_final_error(self, full_input: &str) -> LabeledError<E> {
        // NOTE: The trailing space gives labels somewhere to point when an error happens at the very end of the input
        let owned_input = format!("{full_input} ");
        match self {
            Self::Node {
                input,
                length,
                kind,
                source,
            } => {
                let span = span_within(full_input, input, length);
                let labels = kind
                    .label()
                    .map(|label| LabeledSpan::new_with_span(Some(label.to_owned()), span))
                    .into_iter()
                    .collect();
                let source = source.map(|e| Box::new(e.into_final_error(full_input)));
                LabeledError {
                    full_input: owned_input,
                    labels,
                    error: ErrorTree::Node { kind, source },
                }
            }
            Self::Branch(alternatives) => LabeledError {
                full_input: owned_input,
                labels: Vec::new(),
                error: ErrorTree::Branch(
                    alternatives
                        .into_iter()
                        .map(|e| e.into_final_error(full_input))
                        .collect(),
                ),
            },
        }
    }
}

fn span_within(full_input: &str, input: &str, length: usize) -> SourceSpan {
    let base_addr = full_input.as_ptr() as usize;
    let substr_addr = input.as_ptr() as usize;
    assert!(
        (base_addr..=base_addr + full_input.len()).contains(&substr_addr),
        "tried to get the span of a non-substring!"
    );
    let start = substr_addr - base_addr;
    SourceSpan::from(start..start + length)
}

impl<E: LabeledErrorKind> LabeledError<E> {
    // Errors without labels of their own borrow the labels of their sources, so that miette always has something to
    // point at in the input
    fn bubble_labels(&mut self) {
        if !self.labels.is_empty() {
            return;
        }
        match &mut self.error {
            ErrorTree::Node {
                source: Some(child),
                ..
            } => {
                child.bubble_labels();
                self.labels = child.labels.drain(..).collect();
            }
            ErrorTree::Branch(alternatives) => {
                let labels = alternatives.iter_mut().flat_map(|child| {
                    child.bubble_labels();
                    child.labels.drain(..)
                });
                self.labels = merge_labels(labels);
            }
            ErrorTree::Node { source: None, .. } => (),
        }
    }
}

// Alternatives often fail at the same place, so their labels are joined into one
fn merge_labels(labels: impl Iterator<Item = LabeledSpan>) -> Vec<LabeledSpan> {
    let mut order = Vec::new();
    let mut by_span: HashMap<SourceSpan, Vec<String>> = HashMap::new();
    for labeled_span in labels {
        let span = *labeled_span.inner();
        let text = labeled_span.label().unwrap_or_default().to_owned();
        by_span
            .entry(span)
            .or_insert_with(|| {
                order.push(span);
                Vec::new()
            })
            .push(text);
    }
    order
        .into_iter()
        .map(|span| {
            let label = by_span.remove(&span).unwrap_or_default().join(" or ");
            LabeledSpan::new_with_span(Some(label), span)
        })
        .collect()
}

// Trait Implementations ===============================================================================================

impl<E: LabeledErrorKind> Diagnostic for LabeledError<E> {
    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.full_input)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match &self.error {
            ErrorTree::Node { kind, .. } => kind.help(),
            ErrorTree::Branch(_) => None,
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(self.labels.iter().cloned()))
    }

    fn related<'a>(&'a self) -> Option<Box<dyn Iterator<Item = &'a dyn Diagnostic> + 'a>> {
        match &self.error {
            ErrorTree::Branch(related) => {
                Some(Box::new(related.iter().map(|e| e as &dyn Diagnostic)))
            }
            ErrorTree::Node { .. } => None,
        }
    }

    fn diagnostic_source(&self) -> Option<&dyn Diagnostic> {
        match &self.error {
            ErrorTree::Node {
                source: Some(source),
                ..
            } => Some(&**source),
            _ => None,
        }
    }
}

impl<'a, E: LabeledErrorKind> ParseError<&'a str> for LabeledParseError<'a, E> {
    fn from_error_kind(input: &'a str, kind: ErrorKind) -> Self {
        Self::new(input, kind.into())
    }

    fn append(_input: &str, _kind: ErrorKind, other: Self) -> Self {
        other
    }

    fn or(self, other: Self) -> Self {
        let alternatives = match self {
            Self::Branch(mut alternatives) => {
                alternatives.push(other);
                alternatives
            }
            node => vec![node, other],
        };
        Self::Branch(alternatives)
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use nom::{
        branch::alt,
        character::complete::{char, digit1},
        combinator::recognize,
        sequence::preceded,
    };

    use super::*;

    #[derive(Clone, Eq, PartialEq, Debug, Diagnostic, Error)]
    enum TestKind {
        #[error("expected a dollar sign")]
        ExpectedDollar,
        #[error("expected a pound sign")]
        ExpectedPound,
        #[diagnostic(help("prices need a currency"))]
        #[error("expected a price")]
        ExpectedPrice,
        #[error("prices must be less than 100")]
        TooExpensive,
        #[error("internal `nom` error: {0:?}")]
        NomError(ErrorKind),
        #[error("could not interpret the full input as a price")]
        Incomplete,
    }

    impl LabeledErrorKind for TestKind {
        fn label(&self) -> Option<&'static str> {
            Some(match self {
                Self::ExpectedDollar => "expected '$'",
                Self::ExpectedPound => "expected '£'",
                Self::TooExpensive => "too expensive",
                Self::Incomplete => "input was valid up until this point",
                _ => return None,
            })
        }
    }

    impl From<ErrorKind> for TestKind {
        fn from(value: ErrorKind) -> Self {
            match value {
                ErrorKind::Eof => Self::Incomplete,
                kind => Self::NomError(kind),
            }
        }
    }

    impl<'a> FromExternalError<'a, TestKind> for TestKind {
        const FATAL: bool = true;

        fn from_external_error(input: &'a str, error: TestKind) -> LabeledParseError<'a, Self> {
            LabeledParseError::new(input, error)
        }
    }

    type TestResult<'a, O> = IResult<&'a str, O, LabeledParseError<'a, TestKind>>;

    fn price(i: &str) -> TestResult<&str> {
        let dollars = preceded(expect(char('$'), TestKind::ExpectedDollar), digit1);
        let pounds = preceded(expect(char('£'), TestKind::ExpectedPound), digit1);
        let checked = map_res(recognize(alt((dollars, pounds))), |p: &str| {
            if p.len() > 3 {
                Err(TestKind::TooExpensive)
            } else {
                Ok(p)
            }
        });
        wrap_err(checked, TestKind::ExpectedPrice)(i)
    }

    fn labels(error: &LabeledError<TestKind>) -> Vec<(Option<String>, usize, usize)> {
        error
            .labels()
            .into_iter()
            .flatten()
            .map(|l| (l.label().map(str::to_owned), l.offset(), l.len()))
            .collect()
    }

    #[test]
    fn accepts_complete_input() {
        let mut parser = final_parser(price);
        assert_eq!(parser("$42"), Ok("$42"));
        assert_eq!(parser("£7"), Ok("£7"));
    }

    #[test]
    fn merges_alternative_labels() {
        let error = final_parser(price)("€42").unwrap_err();
        assert_eq!(error.to_string(), "expected a price");
        assert_eq!(
            labels(&error),
            vec![(Some("expected '$' or expected '£'".to_owned()), 0, 0)]
        );
        assert!(matches!(
            error.diagnostic_source().map(ToString::to_string).as_deref(),
            Some("attempted 2 parse branches unsuccessfully")
        ));
        assert_eq!(error.help().map(|h| h.to_string()).as_deref(), Some("prices need a currency"));
    }

    #[test]
    fn external_errors_span_consumed_input() {
        let error = final_parser(price)("$1234").unwrap_err();
        assert_eq!(error.kind(), Some(&TestKind::TooExpensive));
        assert_eq!(labels(&error), vec![(Some("too expensive".to_owned()), 0, 5)]);
    }

    #[test]
    fn trailing_input_is_incomplete() {
        let error = final_parser(price)("$12 and change").unwrap_err();
        assert_eq!(error.kind(), Some(&TestKind::Incomplete));
        assert_eq!(
            labels(&error),
            vec![(Some("input was valid up until this point".to_owned()), 3, 0)]
        );
        assert!(error.source_code().is_some());
    }
}
