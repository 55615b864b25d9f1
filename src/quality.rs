use std::{fmt, str};

use derive_more::{Display, Error};

const MAX_QUALITY_INT: u16 = 1000;
const MAX_QUALITY_FLOAT: f32 = 1.0;

/// Represents a q-factor, the weight a client attaches to one item of a preference list.
///
/// The default value is equivalent to `q=1.0` (the [max](Self::MAX) value).
///
/// # Implementation notes
/// Quality values are defined as numbers between 0.0 and 1.0 with at most three decimal places,
/// so they are stored as thousandths in a `u16`. This keeps equality and ordering exact, which
/// matters because precedence ranking compares qualities for equality before falling back to
/// specificity. Inputs with more precision are rounded to the nearest thousandth, except that a
/// non-zero input never rounds down to zero.
///
/// [RFC 7231 §5.3.1] gives more information on quality values in HTTP header fields.
///
/// # Examples
/// ```
/// use actix_negotiate::{q, Quality};
/// assert_eq!(q(1.0), Quality::MAX);
///
/// assert_eq!(q(0.42).to_string(), "0.42");
/// assert_eq!(q(1.0).to_string(), "1");
/// assert_eq!(Quality::MIN.to_string(), "0.001");
/// assert_eq!(Quality::ZERO.to_string(), "0");
/// ```
///
/// [RFC 7231 §5.3.1]: https://datatracker.ietf.org/doc/html/rfc7231#section-5.3.1
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality(pub(crate) u16);

impl Quality {
    /// The maximum quality value, equivalent to `q=1.0`.
    pub const MAX: Quality = Quality(MAX_QUALITY_INT);

    /// The minimum, non-zero quality value, equivalent to `q=0.001`.
    pub const MIN: Quality = Quality(1);

    /// The zero quality value, equivalent to `q=0.0`. Marks an explicit exclusion.
    pub const ZERO: Quality = Quality(0);

    /// Converts a float in the range 0.0–1.0 to a `Quality`.
    ///
    /// Range checks must be done by the caller.
    fn from_f32(value: f32) -> Self {
        debug_assert!(
            (0.0..=MAX_QUALITY_FLOAT).contains(&value),
            "q value must be between 0.0 and 1.0"
        );

        let thousandths = (value * MAX_QUALITY_INT as f32).round() as u16;

        // a non-zero weight never becomes a refusal
        if thousandths == 0 && value > 0.0 {
            Quality::MIN
        } else {
            Quality(thousandths)
        }
    }

    /// Returns true if this is the zero quality, i.e. "not acceptable".
    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns the quality as a float in the range 0.0–1.0.
    pub fn as_f32(self) -> f32 {
        f32::from(self.0) / MAX_QUALITY_INT as f32
    }
}

/// The default value is [`Quality::MAX`].
impl Default for Quality {
    fn default() -> Quality {
        Quality::MAX
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => f.write_str("0"),
            MAX_QUALITY_INT => f.write_str("1"),

            // some number in the range 1–999, written without trailing zeroes
            x => {
                f.write_str("0.")?;

                if x < 10 {
                    f.write_str("00")?;
                    itoa_fmt(f, x)
                } else if x < 100 {
                    f.write_str("0")?;

                    if x % 10 == 0 {
                        itoa_fmt(f, x / 10)
                    } else {
                        itoa_fmt(f, x)
                    }
                } else if x % 100 == 0 {
                    itoa_fmt(f, x / 100)
                } else if x % 10 == 0 {
                    itoa_fmt(f, x / 10)
                } else {
                    itoa_fmt(f, x)
                }
            }
        }
    }
}

/// Write integer to a `fmt::Write`.
fn itoa_fmt<W: fmt::Write, V: itoa::Integer>(mut wr: W, value: V) -> fmt::Result {
    let mut buf = itoa::Buffer::new();
    wr.write_str(buf.format(value))
}

/// Error returned when a float outside 0.0–1.0 is converted to a [`Quality`].
#[derive(Debug, Clone, Display, Error)]
#[display("quality out of bounds")]
#[non_exhaustive]
pub struct QualityOutOfBounds;

/// Error returned when a q-value literal cannot be parsed.
#[derive(Debug, Clone, Display, Error)]
#[display("invalid q-value")]
#[non_exhaustive]
pub struct InvalidQuality;

impl TryFrom<f32> for Quality {
    type Error = QualityOutOfBounds;

    #[inline]
    fn try_from(value: f32) -> Result<Self, Self::Error> {
        if (0.0..=MAX_QUALITY_FLOAT).contains(&value) {
            Ok(Quality::from_f32(value))
        } else {
            Err(QualityOutOfBounds)
        }
    }
}

impl TryFrom<f64> for Quality {
    type Error = QualityOutOfBounds;

    #[inline]
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if (0.0..=f64::from(MAX_QUALITY_FLOAT)).contains(&value) {
            Ok(Quality::from_f32(value as f32))
        } else {
            Err(QualityOutOfBounds)
        }
    }
}

impl str::FromStr for Quality {
    type Err = InvalidQuality;

    /// Parses the value part of a `q=` parameter, e.g. `0.5`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().parse::<f32>().map_err(|_| InvalidQuality)?;
        Quality::try_from(value).map_err(|_| InvalidQuality)
    }
}

/// Convenience function to create a [`Quality`] from an `f32` (0.0–1.0).
///
/// Not recommended for use with user input. Header parsing in this crate never panics; it falls
/// back to default qualities instead.
///
/// # Panics
/// Panics if value is out of range.
///
/// # Examples
/// ```
/// # use actix_negotiate::{q, Quality};
/// assert_eq!(q(0.001), Quality::MIN);
/// assert_eq!(q(0.0), Quality::ZERO);
/// ```
///
/// ```should_panic
/// # use actix_negotiate::q;
/// let _q = q(1.42);
/// ```
#[inline]
pub fn q<T>(quality: T) -> Quality
where
    T: TryInto<Quality>,
    T::Error: fmt::Debug,
{
    quality.try_into().expect("quality value was out of bounds")
}
