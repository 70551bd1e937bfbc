/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

/// Knuth-Morris-Pratt matcher for a multi-byte delimiter.
///
/// The matcher itself is stateless, callers keep the current match length and
/// feed it back with every new byte, which makes it usable across chunk
/// boundaries.
#[derive(Clone, Debug)]
pub struct DelimiterMatcher {
    delim: Box<[u8]>,
    // lps[i]: length of the longest proper prefix of delim[..=i] which is
    // also a suffix of it
    lps: Box<[usize]>,
}

impl DelimiterMatcher {
    /// Returns `None` if `delim` is empty.
    pub fn new(delim: &[u8]) -> Option<Self> {
        if delim.is_empty() {
            return None;
        }

        let mut lps = vec![0usize; delim.len()];
        let mut prefix_end = 0;
        let mut i = 1;
        while i < delim.len() {
            if delim[i] == delim[prefix_end] {
                prefix_end += 1;
                lps[i] = prefix_end;
                i += 1;
            } else if prefix_end == 0 {
                lps[i] = 0;
                i += 1;
            } else {
                prefix_end = lps[prefix_end - 1];
            }
        }

        Some(DelimiterMatcher {
            delim: delim.into(),
            lps: lps.into_boxed_slice(),
        })
    }

    #[allow(clippy::len_without_is_empty)]
    #[inline]
    pub fn len(&self) -> usize {
        self.delim.len()
    }

    #[inline]
    pub fn delimiter(&self) -> &[u8] {
        &self.delim
    }

    /// The match length to continue with after a mismatch at `matched`.
    #[inline]
    pub fn fallback(&self, matched: usize) -> usize {
        if matched == 0 {
            0
        } else {
            self.lps[matched - 1]
        }
    }

    /// Feed the next input byte given the current match length.
    ///
    /// Returns the new match length, which equals [`len`](Self::len) on a
    /// full match. Passing a full match length in continues with the longest
    /// overlapping prefix, so matches may overlap unless the caller restarts
    /// from 0.
    pub fn advance(&self, byte: u8, mut matched: usize) -> usize {
        if matched >= self.delim.len() {
            matched = self.fallback(self.delim.len());
        }
        loop {
            if byte == self.delim[matched] {
                return matched + 1;
            }
            if matched == 0 {
                return 0;
            }
            matched = self.fallback(matched);
        }
    }

    /// Find the start offset of the first delimiter in `haystack`.
    pub fn find(&self, haystack: &[u8]) -> Option<usize> {
        let mut matched = 0;
        for (i, b) in haystack.iter().enumerate() {
            matched = self.advance(*b, matched);
            if matched == self.delim.len() {
                return Some(i + 1 - matched);
            }
        }
        None
    }
}
