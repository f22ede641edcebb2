use ufmt::derive::uDebug;

/// Result type used throughout the crate, generic over the SPI error `SPIE`
/// and chip-select pin error `CSE` of the downstream HAL.
pub type Result<T, SPIE, CSE> = core::result::Result<T, Error<SPIE, CSE>>;

#[derive(uDebug, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<SPIE, CSE> {
    /// SPI transfer failed.
    Spi(SPIE),
    /// Driving the chip-select pin failed.
    Hal(CSE),
}
