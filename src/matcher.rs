//! Single-candidate signature scanner.
//!
//! The scanner keeps exactly one open candidate per alternative. On a
//! mismatch the candidate is dropped and scanning resumes at the next byte;
//! the mismatching byte is not retried as a fresh start. Self-overlapping
//! patterns can therefore be missed (`AAB` is not found in `AAAB`). Callers
//! depend on this exact behavior, so it is kept as is.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::signatures::{Format, Signature, SignatureRegistry};

/// Outcome of scanning one window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    /// A full signature starts at `position`
    Complete { position: usize, alternative: usize },
    /// A prefix of a signature starting at `position` was still open when
    /// the window ended
    Partial { position: usize, alternative: usize },
    NoMatch,
}

impl MatchResult {
    pub fn position(&self) -> Option<usize> {
        match *self {
            MatchResult::Complete { position, .. } | MatchResult::Partial { position, .. } => {
                Some(position)
            }
            MatchResult::NoMatch => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, MatchResult::Complete { .. })
    }

    /// Index of the alternative that produced this result
    pub fn alternative(&self) -> Option<usize> {
        match *self {
            MatchResult::Complete { alternative, .. }
            | MatchResult::Partial { alternative, .. } => Some(alternative),
            MatchResult::NoMatch => None,
        }
    }

    fn with_alternative(self, index: usize) -> Self {
        match self {
            MatchResult::Complete { position, .. } => MatchResult::Complete {
                position,
                alternative: index,
            },
            MatchResult::Partial { position, .. } => MatchResult::Partial {
                position,
                alternative: index,
            },
            MatchResult::NoMatch => MatchResult::NoMatch,
        }
    }
}

/// How results from several alternatives of one format are resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    /// Smallest start position wins; registration order breaks ties
    #[default]
    Earliest,
    /// The first alternative, in registration order, that yields any match
    /// wins even if a later alternative matches earlier in the window
    FirstRegistered,
}

/// Resumable scan state of one alternative.
///
/// Positions are absolute stream offsets, so a cursor can be advanced over
/// consecutive reads and ends up exactly where one pass over the joined
/// bytes would.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    next: u64,
    candidate: Option<u64>,
    offset: usize,
    found: Option<u64>,
}

impl Cursor {
    /// Fresh cursor whose first examined byte is at `position`
    pub fn at(position: u64) -> Self {
        Self {
            next: position,
            candidate: None,
            offset: 0,
            found: None,
        }
    }

    /// Examine `data[self.next - base..]`, where `data[0]` sits at stream
    /// offset `base`. Stops at the first complete match.
    pub fn advance(&mut self, signature: &Signature, data: &[u8], base: u64) {
        if self.found.is_some() || signature.is_empty() {
            return;
        }
        let last = signature.len() - 1;
        let from = self.next.saturating_sub(base) as usize;

        for (i, &byte) in data.iter().enumerate().skip(from) {
            let position = base + i as u64;
            if signature.accepts(self.offset, byte) {
                let start = *self.candidate.get_or_insert(position);
                if self.offset == last {
                    self.found = Some(start);
                    self.next = position + 1;
                    return;
                }
                self.offset += 1;
            } else {
                self.candidate = None;
                self.offset = 0;
            }
        }
        self.next = self.next.max(base + data.len() as u64);
    }

    /// Start of the complete match, once seen
    pub fn found(&self) -> Option<u64> {
        self.found
    }

    /// Start of the candidate still open at the last examined byte
    pub fn candidate(&self) -> Option<u64> {
        self.candidate.filter(|_| self.found.is_none())
    }

    /// No complete match reported later can start before this offset
    pub fn lower_bound(&self) -> u64 {
        self.found.or(self.candidate).unwrap_or(self.next)
    }
}

/// Scan `window[range]` for one signature.
///
/// Positions in the result are absolute indexes into `window`. An empty
/// signature never matches.
pub fn scan_alternative(window: &[u8], range: Range<usize>, signature: &Signature) -> MatchResult {
    let mut cursor = Cursor::at(range.start as u64);
    cursor.advance(signature, &window[..range.end], 0);

    match (cursor.found(), cursor.candidate()) {
        (Some(position), _) => MatchResult::Complete {
            position: position as usize,
            alternative: 0,
        },
        (None, Some(position)) => MatchResult::Partial {
            position: position as usize,
            alternative: 0,
        },
        (None, None) => MatchResult::NoMatch,
    }
}

/// Stateless scanner over the alternatives registered for one format
#[derive(Debug, Clone, Copy)]
pub struct PatternMatcher<'a> {
    signatures: &'a [Signature],
    policy: MatchPolicy,
}

impl<'a> PatternMatcher<'a> {
    /// Callers guarantee a validated, uniform-length alternative list
    pub(crate) fn new(signatures: &'a [Signature], policy: MatchPolicy) -> Self {
        Self { signatures, policy }
    }

    /// Matcher over the validated alternatives of `format`
    pub fn for_format(
        registry: &SignatureRegistry,
        format: Format,
        policy: MatchPolicy,
    ) -> Result<PatternMatcher<'static>> {
        Ok(PatternMatcher::new(registry.get_signatures(format)?, policy))
    }

    pub fn signatures(&self) -> &'a [Signature] {
        self.signatures
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Find the next signature occurrence in `window[range]`
    pub fn find(&self, window: &[u8], range: Range<usize>) -> MatchResult {
        match self.policy {
            MatchPolicy::FirstRegistered => self
                .signatures
                .iter()
                .enumerate()
                .map(|(index, sig)| {
                    scan_alternative(window, range.clone(), sig).with_alternative(index)
                })
                .find(|result| result.position().is_some())
                .unwrap_or(MatchResult::NoMatch),
            MatchPolicy::Earliest => {
                let mut best = MatchResult::NoMatch;
                for (index, sig) in self.signatures.iter().enumerate() {
                    let result =
                        scan_alternative(window, range.clone(), sig).with_alternative(index);
                    let Some(position) = result.position() else {
                        continue;
                    };
                    // strict comparison keeps the earlier-registered alternative on ties
                    if best.position().map_or(true, |current| position < current) {
                        best = result;
                    }
                }
                best
            }
        }
    }
}
