//! Debug text channel.
//!
//! Progress messages go to any [`ufmt::uWrite`] sink, typically a UART.
//! The channel is advisory: write errors are dropped.

use core::convert::Infallible;

use ufmt::{uDisplay, uWrite, Formatter};

/// Writes one line to a trace sink, discarding any write error. `$w` must be
/// a `&mut` reference to the sink.
#[doc(hidden)]
#[macro_export]
macro_rules! trace {
    ($w:expr, $($arg:tt)*) => {{
        let _ = ufmt::uwriteln!(&mut *$w, $($arg)*);
    }};
}

/// Sink that discards everything written to it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTrace;

impl uWrite for NoTrace {
    type Error = Infallible;

    #[inline]
    fn write_str(&mut self, _s: &str) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Displays a byte as `0x` followed by two upper-case hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hex(pub u8);

impl uDisplay for Hex {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
        f.write_str("0x")?;
        f.write_char(DIGITS[(self.0 >> 4) as usize] as char)?;
        f.write_char(DIGITS[(self.0 & 0xF) as usize] as char)
    }
}
