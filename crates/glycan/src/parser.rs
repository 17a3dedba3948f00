//! Bracket notation for glycans
//!
//! Each residue is followed by its children, each in their own pair of parentheses. A child may start with a
//! `parent-child` linkage token, in which case its bond is taken as written instead of being looked up later.

use nom::{
    character::complete::{char, multispace0, satisfy, u8},
    combinator::{cut, map, opt, peek, recognize},
    multi::many0,
    sequence::{delimited, pair, preceded, separated_pair, terminated},
    IResult,
};
use nom_miette::{expect, final_parser, map_res, wrap_err, LabeledParseError};

use crate::{
    errors::{GlycanErrorKind, MalformedTopologyError},
    ParentAtom,
};

pub type ParseResult<'a, O> = IResult<&'a str, O, LabeledParseError<'a, GlycanErrorKind>>;

/// A glycan exactly as it was written, before any numbering or linkage inference
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct GlycanTree<'s> {
    pub residue: &'s str,
    pub linkage: Option<Linkage>,
    pub branches: Vec<GlycanTree<'s>>,
}

/// A `parent-child` linkage token, like the `4-1` in `NAG(4-1 NAG)`
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Linkage {
    pub parent_atom: ParentAtom,
}

impl Linkage {
    fn new(parent: u8, child: u8) -> Result<Self, GlycanErrorKind> {
        let parent_atom = ParentAtom::from_position(parent)
            .ok_or(GlycanErrorKind::InvalidParentPosition(parent))?;
        if child != 1 {
            return Err(GlycanErrorKind::InvalidChildPosition(child));
        }
        Ok(Self { parent_atom })
    }
}

/// The deepest that branches can be nested inside one another
pub const MAX_DEPTH: usize = 128;

/// Parses a complete glycan, ignoring any whitespace between tokens
///
/// # Errors
///
/// Fails with a labeled diagnostic if `input` isn't a single, well-bracketed glycan, or if its branches are nested
/// more than [`MAX_DEPTH`] levels deep
pub fn parse(input: &str) -> Result<GlycanTree<'_>, MalformedTopologyError> {
    final_parser(delimited(multispace0, |i| glycan(0, i), multispace0))(input)
}

/// Glycan = Residue , { Branch } ;
fn glycan(depth: usize, i: &str) -> ParseResult<GlycanTree> {
    let branches = many0(preceded(multispace0, |i| branch(depth + 1, i)));
    map(pair(residue, branches), |(residue, branches)| GlycanTree {
        residue,
        linkage: None,
        branches,
    })(i)
}

/// Branch = "(" , [ Linkage ] , Glycan , ")" ;
fn branch(depth: usize, i: &str) -> ParseResult<GlycanTree> {
    let within_limit = |_: char| {
        if depth <= MAX_DEPTH {
            Ok(())
        } else {
            Err(GlycanErrorKind::TooDeep(MAX_DEPTH))
        }
    };
    let open = terminated(map_res(char('('), within_limit), multispace0);
    // NOTE: Residue codes can't start with a digit, so a leading digit commits us to parsing a linkage
    let explicit = preceded(
        peek(satisfy(|c| c.is_ascii_digit())),
        cut(wrap_err(linkage, GlycanErrorKind::ExpectedLinkage)),
    );
    let child = map(
        pair(opt(terminated(explicit, multispace0)), |i| glycan(depth, i)),
        |(linkage, tree)| GlycanTree { linkage, ..tree },
    );
    let close = expect(preceded(multispace0, char(')')), GlycanErrorKind::ExpectedBranchEnd);
    preceded(open, cut(terminated(child, close)))(i)
}

/// Linkage = Position , "-" , Position ;
fn linkage(i: &str) -> ParseResult<Linkage> {
    let dash = expect(char('-'), GlycanErrorKind::ExpectedLinkageDash);
    let parser = separated_pair(position, dash, position);
    map_res(parser, |(parent, child)| Linkage::new(parent, child))(i)
}

/// Position = digit , { digit } ;
fn position(i: &str) -> ParseResult<u8> {
    expect(u8, GlycanErrorKind::ExpectedPosition)(i)
}

/// Residue = letter , { letter | digit | "_" | "-" } ;
fn residue(i: &str) -> ParseResult<&str> {
    let head = satisfy(|c| c.is_ascii_alphabetic());
    let tail = many0(satisfy(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
    expect(recognize(pair(head, tail)), GlycanErrorKind::ExpectedResidue)(i)
}
