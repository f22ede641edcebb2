//! Byte-level SPI transport with per-device chip-select handling.
//!
//! The transport owns the SPI peripheral, the device descriptor and a delay
//! provider. Every exchange with the device happens inside
//! [`Transport::transaction`], which brackets the exchanges between a single
//! chip-select assertion and de-assertion.

use core::{fmt::Debug, marker::PhantomData};

use embedded_hal::{
    blocking::{delay::DelayUs, spi::Transfer},
    digital::v2::OutputPin,
};

use crate::error::{Error, Result};

/// Describes one peer on the SPI bus.
#[derive(Debug)]
pub struct SpiDevice<CS> {
    /// Chip-select pin, active low.
    cs: CS,
    /// Settling time after asserting chip-select, in microseconds.
    select_delay_us: u16,
    /// Settling time before de-asserting chip-select, in microseconds.
    deselect_delay_us: u16,
}

impl<CS> SpiDevice<CS> {
    /// Creates a new device descriptor.
    ///
    /// # Parameters
    ///
    /// * `cs` - Chip-select pin for the device.
    /// * `select_delay_us` - Delay after selecting the device.
    /// * `deselect_delay_us` - Delay before deselecting the device.
    pub const fn new(cs: CS, select_delay_us: u16, deselect_delay_us: u16) -> Self {
        Self {
            cs,
            select_delay_us,
            deselect_delay_us,
        }
    }
}

/// Handle to a selected device. Only obtainable inside
/// [`Transport::transaction`].
pub struct Bus<'a, SPI, CSE> {
    spi: &'a mut SPI,
    _cs: PhantomData<CSE>,
}

impl<'a, SPI, SPIE, CSE> Bus<'a, SPI, CSE>
where
    SPI: Transfer<u8, Error = SPIE>,
    SPIE: Debug,
    CSE: Debug,
{
    /// Shifts `byte` out and returns the byte shifted in at the same time.
    pub fn exchange(&mut self, byte: u8) -> Result<u8, SPIE, CSE> {
        let mut buf = [byte];
        self.spi.transfer(&mut buf).map_err(Error::Spi)?;
        Ok(buf[0])
    }

    /// Sends every byte in `bytes`, discarding whatever the device returns.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), SPIE, CSE> {
        for b in bytes {
            self.exchange(*b)?;
        }
        Ok(())
    }

    /// Clocks in `ret.len()` bytes, sending zeros.
    pub fn read(&mut self, ret: &mut [u8]) -> Result<(), SPIE, CSE> {
        for r in ret.iter_mut() {
            *r = self.exchange(0)?;
        }
        Ok(())
    }
}

/// SPI transport bound to a single device.
pub struct Transport<SPI, CS, D> {
    spi: SPI,
    device: SpiDevice<CS>,
    delay: D,
}

impl<SPI, CS, D, SPIE, CSE> Transport<SPI, CS, D>
where
    SPI: Transfer<u8, Error = SPIE>,
    CS: OutputPin<Error = CSE>,
    D: DelayUs<u16>,
    SPIE: Debug,
    CSE: Debug,
{
    /// Creates a new transport. The device is deselected in the process.
    ///
    /// The SPI interface must already be configured for the device (the
    /// MCP2515 wants mode 0, MSB first).
    ///
    /// # Parameters
    ///
    /// * `spi` - SPI interface.
    /// * `device` - Descriptor of the device on the other end.
    /// * `delay` - Delay provider used for the settling delays.
    pub fn new(spi: SPI, mut device: SpiDevice<CS>, delay: D) -> Result<Self, SPIE, CSE> {
        device.cs.set_high().map_err(Error::Hal)?;
        Ok(Self { spi, device, delay })
    }

    /// Asserts chip-select, then waits for the select delay.
    pub(crate) fn select(&mut self) -> Result<(), SPIE, CSE> {
        self.device.cs.set_low().map_err(Error::Hal)?;
        self.delay.delay_us(self.device.select_delay_us);
        Ok(())
    }

    /// Waits for the deselect delay, then de-asserts chip-select.
    pub(crate) fn deselect(&mut self) -> Result<(), SPIE, CSE> {
        self.delay.delay_us(self.device.deselect_delay_us);
        self.device.cs.set_high().map_err(Error::Hal)
    }

    /// Runs `f` with the device selected, deselecting it afterwards even if
    /// `f` fails.
    pub fn transaction<T>(
        &mut self,
        f: impl FnOnce(&mut Bus<'_, SPI, CSE>) -> Result<T, SPIE, CSE>,
    ) -> Result<T, SPIE, CSE> {
        self.select()?;
        let result = f(&mut Bus {
            spi: &mut self.spi,
            _cs: PhantomData,
        });
        self.deselect()?;
        result
    }

    /// Blocks for `us` microseconds using the transport's delay provider.
    pub fn delay_us(&mut self, us: u16) {
        self.delay.delay_us(us);
    }

    /// Releases the underlying peripherals.
    pub fn release(self) -> (SPI, SpiDevice<CS>, D) {
        (self.spi, self.device, self.delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{Event, MockError, SimBus};

    #[test]
    fn transaction_brackets_exchanges() {
        let sim = SimBus::new();
        let mut transport = sim.transport(10, 20);
        let got = transport
            .transaction(|bus| {
                bus.exchange(0xA0)?;
                bus.exchange(0x00)
            })
            .unwrap();
        assert_eq!(got, 0);
        assert_eq!(
            sim.events(),
            vec![
                Event::Select,
                Event::Delay(10),
                Event::Byte(0xA0),
                Event::Byte(0x00),
                Event::Delay(20),
                Event::Deselect,
            ]
        );
    }

    #[test]
    fn failing_closure_still_deselects() {
        let sim = SimBus::new();
        let mut transport = sim.transport(0, 0);
        let result: Result<(), _, _> = transport.transaction(|bus| {
            bus.exchange(0x03)?;
            Err(Error::Spi(MockError))
        });
        assert_eq!(result, Err(Error::Spi(MockError)));
        assert!(sim.is_idle());
    }

    #[test]
    fn spi_error_is_propagated() {
        let sim = SimBus::new();
        let mut transport = sim.transport(0, 0);
        sim.fail_transfers();
        let result = transport.transaction(|bus| bus.exchange(0xA0));
        assert_eq!(result, Err(Error::Spi(MockError)));
        assert!(sim.is_idle());
    }
}
