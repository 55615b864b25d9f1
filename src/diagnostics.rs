//! Injected diagnostics sink.

use std::fmt;

/// Log target used by [`LogDiagnostics`].
pub const LOG_TARGET: &str = "actix_negotiate";

/// Receives structured diagnostics from a [`Negotiator`](crate::Negotiator).
///
/// Diagnostics never affect negotiation results. Closures of the form
/// `Fn(log::Level, &str, &[(&str, &str)])` implement this trait.
///
/// # Examples
/// ```
/// use actix_negotiate::Negotiator;
///
/// let negotiator = Negotiator::default().with_diagnostics(
///     |level: log::Level, msg: &str, ctx: &[(&str, &str)]| eprintln!("{level} {msg} {ctx:?}"),
/// );
/// # drop(negotiator);
/// ```
pub trait Diagnostics: Send + Sync {
    /// Records one event with its key-value context.
    fn log(&self, level: log::Level, message: &str, context: &[(&str, &str)]);
}

impl<F> Diagnostics for F
where
    F: Fn(log::Level, &str, &[(&str, &str)]) + Send + Sync,
{
    fn log(&self, level: log::Level, message: &str, context: &[(&str, &str)]) {
        (self)(level, message, context)
    }
}

/// Forwards diagnostics to the [`log`] facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn log(&self, level: log::Level, message: &str, context: &[(&str, &str)]) {
        if log::log_enabled!(target: LOG_TARGET, level) {
            log::log!(target: LOG_TARGET, level, "{}{}", message, Context(context));
        }
    }
}

/// Renders context pairs as ` key=value`.
struct Context<'a>(&'a [(&'a str, &'a str)]);

impl fmt::Display for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self.0 {
            write!(f, " {}={:?}", key, value)?;
        }

        Ok(())
    }
}
