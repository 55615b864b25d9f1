//! Parsing of weighted preference lists, as used by `Accept-*` request headers.
//!
//! A preference list is a comma separated sequence of items, each optionally followed by
//! `;`-separated parameters. The `q` parameter carries the item's [`Quality`]; parameters before
//! it are part of the item's identity ([`params`](PrecedenceValue::params)) while those after it
//! are accept-extensions ([`extensions`](PrecedenceValue::extensions)).
//!
//! Parsing never fails. Malformed quality literals fall back to the default quality and empty
//! items are skipped, so a sloppy header can never abort negotiation.

use std::{cmp::Ordering, fmt};

use crate::quality::Quality;

/// A `key=value` parameter attached to a header item.
///
/// Parameters without an `=` are kept with an empty value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Param {
    /// Parameter name, whitespace trimmed, case preserved.
    pub key: String,

    /// Parameter value, whitespace trimmed, case preserved.
    pub value: String,
}

impl Param {
    /// Constructs a new parameter.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Param {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_empty() {
            f.write_str(&self.key)
        } else {
            write!(f, "{}={}", self.key, self.value)
        }
    }
}

/// A parsed preference list item together with its quality.
///
/// # Examples
/// ```
/// use actix_negotiate::{parse_accept_language, q, PrecedenceValue};
///
/// let langs = parse_accept_language("en;q=0.5, fr-CH");
/// assert_eq!(langs[0].value, "fr-CH");
/// assert_eq!(langs[1], PrecedenceValue::new("en").with_quality(q(0.5)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecedenceValue {
    /// The item itself, e.g. `en-GB` or `utf-8`.
    pub value: String,

    /// The item's weight.
    pub quality: Quality,

    /// Parameters that appeared before the `q` parameter.
    pub params: Vec<Param>,

    /// Accept-extensions, i.e. parameters that appeared after the `q` parameter.
    pub extensions: Vec<Param>,
}

impl PrecedenceValue {
    /// Constructs an item with the maximum quality and no parameters.
    pub fn new(value: impl Into<String>) -> Self {
        PrecedenceValue {
            value: value.into(),
            quality: Quality::MAX,
            params: Vec::new(),
            extensions: Vec::new(),
        }
    }

    /// Constructs the wildcard item `*` with the maximum quality.
    ///
    /// This is what an absent header means: "anything is acceptable".
    pub fn any() -> Self {
        PrecedenceValue::new("*")
    }

    /// Sets the quality.
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Appends a parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push(Param::new(key, value));
        self
    }

    /// Returns true if this item is the wildcard `*`.
    pub fn is_any(&self) -> bool {
        self.value == "*"
    }
}

impl fmt::Display for PrecedenceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)?;
        write_params(f, &self.params, self.quality, Quality::MAX, &self.extensions)
    }
}

/// Writes `;params;q=..;extensions`, eliding the quality when it is implied.
pub(crate) fn write_params(
    f: &mut fmt::Formatter<'_>,
    params: &[Param],
    quality: Quality,
    implied: Quality,
    extensions: &[Param],
) -> fmt::Result {
    for param in params {
        write!(f, ";{}", param)?;
    }

    // extensions are only recognised as such after a q parameter
    if quality != implied || !extensions.is_empty() {
        write!(f, ";q={}", quality)?;
    }

    for ext in extensions {
        write!(f, ";{}", ext)?;
    }

    Ok(())
}

/// A header item before its default quality has been decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawItem {
    pub(crate) value: String,
    pub(crate) quality: Option<Quality>,
    pub(crate) params: Vec<Param>,
    pub(crate) extensions: Vec<Param>,
}

/// Splits a header into its items, in order of appearance.
pub(crate) fn split_items(header: &str) -> Vec<RawItem> {
    let mut items = Vec::new();

    for part in header.split(',') {
        let mut segments = part.split(';');

        let value = match segments.next().map(str::trim) {
            Some(value) if !value.is_empty() => value,
            _ => continue,
        };

        let mut item = RawItem {
            value: value.to_owned(),
            quality: None,
            params: Vec::new(),
            extensions: Vec::new(),
        };
        let mut seen_quality = false;

        for segment in segments {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }

            let (key, val) = match segment.split_once('=') {
                Some((key, val)) => (key.trim(), val.trim()),
                None => (segment, ""),
            };

            if !seen_quality && key.eq_ignore_ascii_case("q") {
                // a malformed literal is consumed but leaves the default quality in place
                item.quality = val.parse().ok();
                seen_quality = true;
            } else if seen_quality {
                item.extensions.push(Param::new(key, val));
            } else {
                item.params.push(Param::new(key, val));
            }
        }

        items.push(item);
    }

    items
}

/// Parses a preference list without ranking it.
///
/// Items are returned in order of appearance. Items without a `q` parameter get
/// [`Quality::MAX`]. An empty header yields an empty list.
///
/// # Examples
/// ```
/// use actix_negotiate::{parse, q};
///
/// let items = parse("gzip;q=0.5, br");
/// assert_eq!(items[0].value, "gzip");
/// assert_eq!(items[0].quality, q(0.5));
/// assert_eq!(items[1].value, "br");
/// ```
pub fn parse(header: &str) -> Vec<PrecedenceValue> {
    split_items(header)
        .into_iter()
        .map(|item| PrecedenceValue {
            value: item.value,
            quality: item.quality.unwrap_or(Quality::MAX),
            params: item.params,
            extensions: item.extensions,
        })
        .collect()
}

/// Parses and ranks a flat preference list, most preferred first.
///
/// Items are ordered by quality, descending. Items with equal quality and equal value are
/// ordered by parameter count, descending; everything else keeps its order of appearance.
///
/// An empty or absent header yields the single wildcard item `*`, since the absence of a
/// preference means anything is acceptable.
pub fn parse_list(header: &str) -> Vec<PrecedenceValue> {
    let mut values = parse(header);

    if values.is_empty() {
        values.push(PrecedenceValue::any());
        return values;
    }

    sort_by_precedence(
        &mut values,
        |a, b| b.quality.cmp(&a.quality),
        |a, b| a.value == b.value,
        |v| v.params.len(),
    );

    values
}

/// Parses an `Accept-Language` header value, most preferred first.
pub fn parse_accept_language(header: &str) -> Vec<PrecedenceValue> {
    parse_list(header)
}

/// Parses an `Accept-Charset` header value, most preferred first.
pub fn parse_accept_charset(header: &str) -> Vec<PrecedenceValue> {
    parse_list(header)
}

/// Parses an `Accept-Encoding` header value, most preferred first.
///
/// Only the ranking is provided; choosing a content-coding is left to the transport layer.
pub fn parse_accept_encoding(header: &str) -> Vec<PrecedenceValue> {
    parse_list(header)
}

/// Stable precedence sort shared by all preference lists.
///
/// `primary` must be a consistent ordering (it is used for a regular stable sort). Within each
/// run of primary-equal items, members of the same `group` are then reordered amongst the slots
/// they already occupy so that more parameters come first. Doing this as a second step keeps
/// the overall ordering well defined even though "more parameters wins" only relates items of
/// the same group.
pub(crate) fn sort_by_precedence<T: Clone>(
    items: &mut [T],
    primary: impl Fn(&T, &T) -> Ordering,
    group: impl Fn(&T, &T) -> bool,
    param_count: impl Fn(&T) -> usize,
) {
    items.sort_by(&primary);

    let mut start = 0;
    while start < items.len() {
        let mut end = start + 1;
        while end < items.len() && primary(&items[start], &items[end]) == Ordering::Equal {
            end += 1;
        }

        let mut placed = vec![false; end - start];

        for i in start..end {
            if placed[i - start] {
                continue;
            }

            let slots = (i..end)
                .filter(|&j| !placed[j - start] && group(&items[i], &items[j]))
                .collect::<Vec<_>>();

            for &slot in &slots {
                placed[slot - start] = true;
            }

            if slots.len() > 1 {
                let mut members = slots.iter().map(|&j| items[j].clone()).collect::<Vec<_>>();
                members.sort_by(|a, b| param_count(b).cmp(&param_count(a)));

                for (slot, member) in slots.into_iter().zip(members) {
                    items[slot] = member;
                }
            }
        }

        start = end;
    }
}

/// Matches an accepted language range against an offered language tag.
///
/// Tags match when they are equal (ignoring ASCII case) or when one is a prefix of the other at
/// a subtag boundary, so `en` matches `en-GB` and vice versa. `*` on either side matches
/// anything.
pub(crate) fn language_matches(accepted: &str, offered: &str) -> bool {
    if accepted == "*" || offered == "*" {
        return true;
    }

    accepted.eq_ignore_ascii_case(offered)
        || is_subtag_prefix(accepted, offered)
        || is_subtag_prefix(offered, accepted)
}

fn is_subtag_prefix(prefix: &str, tag: &str) -> bool {
    tag.as_bytes().get(prefix.len()) == Some(&b'-')
        && tag
            .get(..prefix.len())
            .map_or(false, |head| head.eq_ignore_ascii_case(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::q;

    #[test]
    fn parse_empty() {
        assert!(parse("").is_empty());
        assert!(parse(" , ,").is_empty());
    }

    #[test]
    fn parse_preserves_order_and_defaults_quality() {
        let items = parse("utf-8, iso-8859-1;q=0.5, *;q=0.1");
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], PrecedenceValue::new("utf-8"));
        assert_eq!(items[1], PrecedenceValue::new("iso-8859-1").with_quality(q(0.5)));
        assert_eq!(items[2], PrecedenceValue::any().with_quality(q(0.1)));
    }

    #[test]
    fn parse_trims_whitespace_and_ignores_case_of_q() {
        let items = parse(" da ;  Q = 0.3 ,en-gb ; q=0.8 ");
        assert_eq!(items[0].value, "da");
        assert_eq!(items[0].quality, q(0.3));
        assert!(items[0].params.is_empty());
        assert_eq!(items[1].value, "en-gb");
        assert_eq!(items[1].quality, q(0.8));
    }

    #[test]
    fn invalid_quality_falls_back_to_default() {
        let items = parse("en;q=blah");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].value, "en");
        assert_eq!(items[0].quality, Quality::MAX);
        assert!(items[0].params.is_empty());

        let items = parse("en;q=1.5");
        assert_eq!(items[0].quality, Quality::MAX);
    }

    #[test]
    fn params_before_quality_extensions_after() {
        let items = parse("text;a=1;b;q=0.5;c=3;d=4");
        let item = &items[0];
        assert_eq!(item.params, vec![Param::new("a", "1"), Param::new("b", "")]);
        assert_eq!(item.extensions, vec![Param::new("c", "3"), Param::new("d", "4")]);
        assert_eq!(item.quality, q(0.5));
    }

    #[test]
    fn duplicate_params_are_kept() {
        let items = parse("x;a=1;a=2");
        assert_eq!(items[0].params, vec![Param::new("a", "1"), Param::new("a", "2")]);
    }

    #[test]
    fn list_defaults_to_wildcard() {
        assert_eq!(parse_list(""), vec![PrecedenceValue::any()]);
        assert_eq!(parse_accept_language("  "), vec![PrecedenceValue::any()]);
    }

    #[test]
    fn list_sorts_by_quality_stably() {
        let langs = parse_accept_language("da, en-gb;q=0.8, en;q=0.7, fr, de;q=0.8");
        let order = langs.iter().map(|l| l.value.as_str()).collect::<Vec<_>>();
        assert_eq!(order, vec!["da", "fr", "en-gb", "de", "en"]);
    }

    #[test]
    fn list_prefers_more_params_for_same_value() {
        let items = parse_list("a;q=0.4, b;q=0.4, a;x=1;q=0.4");
        assert_eq!(items[0].value, "a");
        assert_eq!(items[0].params.len(), 1);
        assert_eq!(items[1].value, "b");
        assert_eq!(items[2].value, "a");
        assert!(items[2].params.is_empty());
    }

    #[test]
    fn charset_and_encoding_lists() {
        let charsets = parse_accept_charset("iso-8859-5, unicode-1-1;q=0.8");
        assert_eq!(charsets[0].value, "iso-8859-5");
        assert_eq!(charsets[1].quality, q(0.8));

        let encodings = parse_accept_encoding("gzip;q=0.5, identity;q=0, br");
        let order = encodings.iter().map(|e| e.value.as_str()).collect::<Vec<_>>();
        assert_eq!(order, vec!["br", "gzip", "identity"]);
        assert!(encodings[2].quality.is_zero());
    }

    #[test]
    fn display_round_trip() {
        let header = "en-GB;x=1;q=0.5;ext=2, fr, de;q=0";
        let parsed = parse_list(header);
        let printed = parsed
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        assert_eq!(printed, "fr, en-GB;x=1;q=0.5;ext=2, de;q=0");
        assert_eq!(parse_list(&printed), parsed);
    }

    #[test]
    fn language_matching() {
        assert!(language_matches("en", "en"));
        assert!(language_matches("EN", "en"));
        assert!(language_matches("en", "en-GB"));
        assert!(language_matches("en-GB", "en"));
        assert!(!language_matches("en", "eng"));
        assert!(!language_matches("en-GB", "en-US"));
        assert!(language_matches("*", "en"));
        assert!(language_matches("fr", "*"));
    }
}
