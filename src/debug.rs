//! Diagnostic printing, gated by the `debug-print` feature.
//!
//! Mirrors the source crate's `debug!`/`_debug!` macro pair (`src/debug.rs`),
//! which formats into a `Console` wrapping a single write primitive. We
//! have no UART here, so the host supplies the sink by
//! implementing [`DebugSink`]; with `debug-print` off every `debug!`
//! call site compiles to nothing, matching §7's "a production build may
//! compile them out without affecting semantics."

/// Host-supplied diagnostic sink. Distinct from any recovery-reason or
/// `VbError` reporting: this is text for a developer, never control flow.
pub trait DebugSink {
    fn write_str(&mut self, s: &str);
}

#[cfg(feature = "debug-print")]
macro_rules! _debug {
    ($sink:expr, $($args:tt)+) => ({
        use core::fmt::Write;
        struct Adapter<'a>(&'a mut dyn $crate::debug::DebugSink);
        impl core::fmt::Write for Adapter<'_> {
            fn write_str(&mut self, s: &str) -> core::fmt::Result {
                self.0.write_str(s);
                Ok(())
            }
        }
        let _ = write!(Adapter($sink), $($args)+);
    });
}

#[cfg(feature = "debug-print")]
macro_rules! debug {
    ($sink:expr) => ({
        $crate::debug::_debug!($sink, "\r\n")
    });
    ($sink:expr, $fmt:expr) => ({
        $crate::debug::_debug!($sink, concat!("[vb2]: ", $fmt, "\r\n"))
    });
    ($sink:expr, $fmt:expr, $($args:tt)+) => ({
        $crate::debug::_debug!($sink, concat!("[vb2]: ", $fmt, "\r\n"), $($args)+)
    });
}

#[cfg(not(feature = "debug-print"))]
macro_rules! debug {
    ($sink:expr) => {{
        let _ = $sink;
    }};
    ($sink:expr, $fmt:expr) => {{
        let _ = $sink;
    }};
    ($sink:expr, $fmt:expr, $($args:tt)+) => {{
        let _ = ($sink, $($args)+);
    }};
}

#[cfg(feature = "debug-print")]
pub(crate) use _debug;
pub(crate) use debug;
