//! Spreadsheet-style chain labels: `A` to `Z`, then `AA`, `AB`, and so on

use glycan::Anchor;

const ALPHABET: usize = 26;

/// The first `count` chain labels
#[must_use]
pub fn spreadsheet_ids(count: usize) -> Vec<String> {
    (0..count).map(spreadsheet_id).collect()
}

/// The chain label at a 0-based `index`
#[must_use]
pub fn spreadsheet_id(index: usize) -> String {
    // NOTE: Bijective base-26 has no zero digit, so every step shifts down by one before taking the remainder
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % ALPHABET) as u8);
        n /= ALPHABET;
    }
    letters.iter().rev().map(|&b| char::from(b)).collect()
}

/// The 1-based position of `label` among all chain labels, so that `A` is 1 and `AA` is 27
///
/// Returns `None` for anything that isn't a run of ASCII letters.
#[must_use]
pub fn spreadsheet_index(label: &str) -> Option<usize> {
    if label.is_empty() {
        return None;
    }
    label.chars().try_fold(0_usize, |acc, c| {
        let digit = c.is_ascii_alphabetic().then(|| c.to_ascii_uppercase() as usize - 'A' as usize + 1)?;
        acc.checked_mul(ALPHABET)?.checked_add(digit)
    })
}

/// Labels for `count` glycan chains, skipping the chain the glycan is anchored to
pub(crate) fn glycan_chains(count: usize, anchor: Option<&Anchor>) -> Vec<String> {
    let taken = anchor.map(|a| a.site.chain.as_str());
    (0..)
        .map(spreadsheet_id)
        .filter(|id| Some(id.as_str()) != taken)
        .take(count)
        .collect()
}

/// The label for a glycan written as a single chain
pub(crate) fn glycan_chain(anchor: Option<&Anchor>) -> String {
    let first = spreadsheet_id(0);
    if anchor.is_some_and(|a| a.site.chain == first) {
        spreadsheet_id(1)
    } else {
        first
    }
}
