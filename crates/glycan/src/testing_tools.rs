use std::ops::Range;

use miette::Diagnostic;

/// The text and byte range of every label attached to `diagnostic`
pub fn labels(diagnostic: &dyn Diagnostic) -> Vec<(String, Range<usize>)> {
    diagnostic
        .labels()
        .into_iter()
        .flatten()
        .map(|l| {
            let text = l.label().unwrap_or_default().to_owned();
            (text, l.offset()..l.offset() + l.len())
        })
        .collect()
}
