// Copyright 2023 Viktor Reusch
//
// This file is part of kml_fixup.
//
// kml_fixup is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// kml_fixup is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License
// for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with kml_fixup. If not, see <https://www.gnu.org/licenses/>.

//! Helpers for the text content of `<coordinates>` elements.
//!
//! A coordinate sequence is a whitespace-separated list of `lon,lat[,alt]`
//! tuples. Both components of this library rejoin sequences with newlines.

/// Remove empty components from a single coordinate tuple.
///
/// An export without recorded altitudes leaves a trailing comma on every
/// tuple (`"7.1,50.7,"`), which chokes stricter KML parsers.
pub(crate) fn repair_tuple(tuple: &str) -> String {
    tuple
        .split(',')
        .filter(|component| !component.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// Repair every tuple of a coordinate sequence.
pub(crate) fn repair_sequence(text: &str) -> String {
    text.split_whitespace()
        .map(repair_tuple)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Keep only every `rate`-th tuple of a coordinate sequence.
///
/// The tuple at position `i` survives exactly when `i % rate == 0`, so the
/// first tuple is always kept. `rate` must not be zero.
pub(crate) fn subsample(text: &str, rate: usize) -> String {
    text.split_whitespace()
        .step_by(rate)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_comma_is_dropped() {
        assert_eq!(repair_tuple("-122.4,37.8,"), "-122.4,37.8");
    }

    #[test]
    fn well_formed_tuples_are_unchanged() {
        assert_eq!(repair_tuple("-122.4,37.8"), "-122.4,37.8");
        assert_eq!(repair_tuple("-122.4,37.8,12.5"), "-122.4,37.8,12.5");
    }

    #[test]
    fn sequences_are_rejoined_with_newlines() {
        assert_eq!(repair_sequence("1,2, 3,4,\n5,6,7"), "1,2\n3,4\n5,6,7");
    }

    #[test]
    fn repair_is_idempotent() {
        let once = repair_sequence("1,2,\n3,4,");
        assert_eq!(repair_sequence(&once), once);
    }

    #[test]
    fn empty_sequence_repairs_to_empty() {
        assert_eq!(repair_sequence(""), "");
        assert_eq!(repair_sequence(" \n "), "");
    }

    #[test]
    fn subsample_keeps_every_nth_tuple() {
        let tuples: Vec<String> = (0..10).map(|i| format!("{i},{i}")).collect();
        let text = tuples.join(" ");
        assert_eq!(subsample(&text, 5), "0,0\n5,5");
    }

    #[test]
    fn subsample_rate_one_keeps_all_tuples() {
        assert_eq!(subsample("1,2 3,4 5,6", 1), "1,2\n3,4\n5,6");
    }
}
