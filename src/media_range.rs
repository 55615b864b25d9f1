//! `Accept` header media ranges and their precedence rules.

use std::{cmp::Ordering, fmt};

use crate::{
    precedence::{sort_by_precedence, split_items, write_params, Param},
    quality::Quality,
};

/// Default quality of a media range with type, subtype and accept-params, e.g. `text/html;level=1`.
pub const PARAMETERED_RANGE_QUALITY: Quality = Quality(1000);

/// Default quality of a media range with type and subtype, e.g. `text/html`.
pub const TYPE_SUBTYPE_RANGE_QUALITY: Quality = Quality(900);

/// Default quality of a media range with a type and a wildcard subtype, e.g. `text/*`.
pub const TYPE_STAR_RANGE_QUALITY: Quality = Quality(800);

/// Default quality of the media range `*/*`.
pub const STAR_STAR_RANGE_QUALITY: Quality = Quality(700);

/// A media range from an `Accept` header, defined in [RFC 7231 §5.3.2].
///
/// Type and subtype keep the case they were sent in.
///
/// # Default quality
/// A range without a `q` parameter is weighted by how specific it is, so that the most specific
/// range wins when the client did not say otherwise:
///
/// | range              | default quality |
/// |--------------------|-----------------|
/// | `text/html;level=1`| 1.0             |
/// | `text/html`        | 0.9             |
/// | `text/*`           | 0.8             |
/// | `*/*`              | 0.7             |
///
/// [RFC 7231 §5.3.2]: https://datatracker.ietf.org/doc/html/rfc7231#section-5.3.2
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRange {
    /// Top-level type, e.g. `text` or `*`.
    pub type_: String,

    /// Subtype, e.g. `html` or `*`. Empty if the range had no `/`.
    pub subtype: String,

    /// The range's weight.
    pub quality: Quality,

    /// Accept-params that appeared before the `q` parameter.
    pub params: Vec<Param>,

    /// Accept-extensions that appeared after the `q` parameter.
    pub extensions: Vec<Param>,
}

impl MediaRange {
    /// Constructs a media range from a `type/subtype` string, with its default quality.
    ///
    /// Parameters in `media_type` are ignored; use [`with_param`](Self::with_param).
    pub fn new(media_type: &str) -> Self {
        let (type_, subtype) = split_media_type(media_type);
        let mut range = MediaRange {
            type_,
            subtype,
            quality: Quality::MAX,
            params: Vec::new(),
            extensions: Vec::new(),
        };
        range.quality = range.default_quality();
        range
    }

    /// The range `*/*` with maximum quality, used when a request has no `Accept` header.
    pub fn any() -> Self {
        MediaRange::new("*/*").with_quality(Quality::MAX)
    }

    /// Sets the quality.
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Appends an accept-param.
    ///
    /// The quality is not adjusted; call [`with_quality`](Self::with_quality) afterwards if
    /// needed.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push(Param::new(key, value));
        self
    }

    /// Returns `type/subtype` without parameters.
    pub fn essence(&self) -> String {
        if self.subtype.is_empty() {
            self.type_.clone()
        } else {
            format!("{}/{}", self.type_, self.subtype)
        }
    }

    /// Returns true if neither type nor subtype is a wildcard.
    pub fn is_exact(&self) -> bool {
        self.type_ != "*" && self.subtype != "*"
    }

    /// The quality this range has when no `q` parameter is given.
    pub fn default_quality(&self) -> Quality {
        if self.type_ == "*" {
            // a star type with a concrete subtype is invalid; treat it as */*
            STAR_STAR_RANGE_QUALITY
        } else if self.subtype == "*" {
            TYPE_STAR_RANGE_QUALITY
        } else if !self.params.is_empty() {
            PARAMETERED_RANGE_QUALITY
        } else {
            TYPE_SUBTYPE_RANGE_QUALITY
        }
    }

    /// Returns true if this range names exactly the given type and subtype.
    pub(crate) fn matches_exactly(&self, type_: &str, subtype: &str) -> bool {
        self.type_ == type_ && self.subtype == subtype
    }

    /// Returns true if this range and the given type and subtype overlap, allowing `*` on
    /// either side.
    pub(crate) fn matches(&self, type_: &str, subtype: &str) -> bool {
        let type_ok = self.type_ == "*" || type_ == "*" || self.type_ == type_;
        let subtype_ok = self.subtype == "*" || subtype == "*" || self.subtype == subtype;
        type_ok && subtype_ok
    }

    /// Precedence of two ranges by quality, then by type and subtype specificity.
    fn cmp_precedence(&self, other: &MediaRange) -> Ordering {
        other
            .quality
            .cmp(&self.quality)
            .then_with(|| (self.type_ == "*").cmp(&(other.type_ == "*")))
            .then_with(|| (self.subtype == "*").cmp(&(other.subtype == "*")))
    }
}

impl fmt::Display for MediaRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.essence())?;
        write_params(
            f,
            &self.params,
            self.quality,
            self.default_quality(),
            &self.extensions,
        )
    }
}

/// Splits `type/subtype[;params]` into its type and subtype.
///
/// A blank media type means "anything" and yields `*/*`.
pub(crate) fn split_media_type(media_type: &str) -> (String, String) {
    let essence = media_type.split(';').next().unwrap_or_default().trim();

    if essence.is_empty() {
        return ("*".to_owned(), "*".to_owned());
    }

    match essence.split_once('/') {
        Some((type_, subtype)) => (type_.trim().to_owned(), subtype.trim().to_owned()),
        None => (essence.to_owned(), String::new()),
    }
}

/// Parses an `Accept` header value into media ranges, most preferred first.
///
/// Ranges are ordered by quality, descending. Among ranges of equal quality, a concrete type
/// ranks before a wildcard type and a concrete subtype before a wildcard subtype. Ranges with
/// equal quality, type and subtype rank by number of accept-params, descending. Anything still
/// tied keeps its order of appearance.
///
/// An empty header yields an empty list.
///
/// # Examples
/// ```
/// use actix_negotiate::parse_accept;
///
/// let ranges = parse_accept("text/*, text/html, text/html;level=1, */*");
/// let ranked = ranges.iter().map(ToString::to_string).collect::<Vec<_>>();
/// assert_eq!(ranked, ["text/html;level=1", "text/html", "text/*", "*/*"]);
/// ```
pub fn parse_accept(header: &str) -> Vec<MediaRange> {
    let mut ranges = split_items(header)
        .into_iter()
        .map(|item| {
            let (type_, subtype) = split_media_type(&item.value);
            let mut range = MediaRange {
                type_,
                subtype,
                quality: Quality::MAX,
                params: item.params,
                extensions: item.extensions,
            };
            range.quality = item.quality.unwrap_or_else(|| range.default_quality());
            range
        })
        .collect::<Vec<_>>();

    sort_by_precedence(
        &mut ranges,
        MediaRange::cmp_precedence,
        |a, b| a.type_ == b.type_ && a.subtype == b.subtype,
        |r| r.params.len(),
    );

    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::q;

    fn essences(ranges: &[MediaRange]) -> Vec<String> {
        ranges.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn parses_single() {
        let mr = parse_accept("application/json");
        assert_eq!(mr.len(), 1);
        assert_eq!(mr[0].type_, "application");
        assert_eq!(mr[0].subtype, "json");
        assert_eq!(mr[0].quality, TYPE_SUBTYPE_RANGE_QUALITY);
    }

    #[test]
    fn preserves_case() {
        let mr = parse_accept("application/CEA");
        assert_eq!(mr[0].subtype, "CEA");
    }

    #[test]
    fn empty_header() {
        assert!(parse_accept("").is_empty());
    }

    #[test]
    fn default_quality_by_specificity() {
        let html = &parse_accept("text/html")[0];
        let text = &parse_accept("text/*")[0];
        let any = &parse_accept("*/*")[0];
        let level = &parse_accept("text/html;level=1")[0];

        assert!(level.quality > html.quality);
        assert!(html.quality > text.quality);
        assert!(text.quality > any.quality);
    }

    #[test]
    fn explicit_quality_overrides_default() {
        let mr = parse_accept("text/html;q=0.5, application/xml");
        assert_eq!(essences(&mr), vec!["application/xml", "text/html;q=0.5"]);
    }

    #[test]
    fn sorts_by_descending_quality() {
        let mr = parse_accept("application/json;q=0.8, application/xml;q=1, application/*;q=0.1");
        assert_eq!(mr[0].subtype, "xml");
        assert_eq!(mr[0].quality, Quality::MAX);
        assert_eq!(mr[1].subtype, "json");
        assert_eq!(mr[1].quality, q(0.8));
        assert_eq!(mr[2].subtype, "*");
        assert_eq!(mr[2].quality, q(0.1));
    }

    #[test]
    fn invalid_quality_uses_default_tier() {
        let mr = parse_accept("text/html;q=blah");
        assert_eq!(mr.len(), 1);
        assert_eq!(mr[0].quality, TYPE_SUBTYPE_RANGE_QUALITY);
        assert!(mr[0].params.is_empty());
    }

    #[test]
    fn keeps_accept_extensions() {
        let mr = parse_accept("text/html;q=0.5;a=1;b=2");
        assert_eq!(mr[0].quality, q(0.5));
        assert!(mr[0].params.is_empty());
        assert_eq!(mr[0].extensions, vec![Param::new("a", "1"), Param::new("b", "2")]);
    }

    #[test]
    fn specificity_precedence() {
        // https://tools.ietf.org/html/rfc7231#section-5.3.2
        let mr = parse_accept("text/*, text/plain, text/plain;format=flowed, */*");
        assert_eq!(
            essences(&mr),
            vec!["text/plain;format=flowed", "text/plain", "text/*", "*/*"]
        );
    }

    #[test]
    fn quality_precedence_regardless_of_order() {
        let cases = [
            "text/*;q=0.3, text/html;q=0.7, text/html;level=1, text/html;level=2;q=0.4, */*;q=0.5",
            "text/html;q=0.7, text/html;level=1, text/html;level=2;q=0.4, */*;q=0.5, text/*;q=0.3",
            "text/html;level=1, text/html;level=2;q=0.4, */*;q=0.5, text/*;q=0.3, text/html;q=0.7",
            "text/html;level=2;q=0.4, */*;q=0.5, text/*;q=0.3, text/html;q=0.7, text/html;level=1",
        ];

        for case in cases {
            let mr = parse_accept(case);
            assert_eq!(
                essences(&mr),
                vec![
                    "text/html;level=1",
                    "text/html;q=0.7",
                    "*/*;q=0.5",
                    "text/html;level=2;q=0.4",
                    "text/*;q=0.3",
                ],
                "{}",
                case
            );
        }
    }

    #[test]
    fn equal_quality_prefers_more_params() {
        let mr = parse_accept("text/html;q=0.4, text/html;level=2;q=0.4");
        assert_eq!(mr[0].params, vec![Param::new("level", "2")]);
        assert!(mr[1].params.is_empty());
    }

    #[test]
    fn equal_quality_prefers_concrete_types() {
        let mr = parse_accept("*/*;q=0.5, image/*;q=0.5, image/png;q=0.5, text/plain;q=0.5");
        assert_eq!(
            essences(&mr),
            vec!["image/png;q=0.5", "text/plain;q=0.5", "image/*;q=0.5", "*/*;q=0.5"]
        );
    }

    #[test]
    fn whitespace_and_upper_case_q() {
        let mr = parse_accept(
            "text/* ; q=0.3, text/html ; Q=0.7, text/html;level=2; q=0.4, */*; q=0.5",
        );
        assert_eq!(
            essences(&mr),
            vec!["text/html;q=0.7", "*/*;q=0.5", "text/html;level=2;q=0.4", "text/*;q=0.3"]
        );
    }

    #[test]
    fn round_trip_through_display() {
        let header = "text/*;q=0.3, text/html;q=0.7, text/html;level=1, */*;q=0.5;ext=1, image/png";
        let parsed = parse_accept(header);
        let printed = essences(&parsed).join(", ");
        assert_eq!(parse_accept(&printed), parsed);
    }

    #[test]
    fn matching() {
        let html = MediaRange::new("text/html");
        assert!(html.matches_exactly("text", "html"));
        assert!(!html.matches_exactly("text", "plain"));
        assert!(html.matches("text", "*"));
        assert!(html.matches("*", "*"));
        assert!(!html.matches("image", "*"));

        let text = MediaRange::new("text/*");
        assert!(text.matches("text", "csv"));
        assert!(!text.matches("application", "json"));
        assert!(!text.is_exact());
    }

    #[test]
    fn split_blank_is_wildcard() {
        assert_eq!(split_media_type(""), ("*".to_owned(), "*".to_owned()));
        assert_eq!(
            split_media_type("text/html; charset=utf-8"),
            ("text".to_owned(), "html".to_owned())
        );
        assert_eq!(split_media_type("text"), ("text".to_owned(), String::new()));
    }
}
