//! One-shot controller configuration.

use core::fmt::Debug;

use embedded_hal::{
    blocking::{delay::DelayUs, spi::Transfer},
    can::StandardId,
    digital::v2::OutputPin,
};
use ufmt::{uDebug, uWrite, Formatter};

use crate::{
    error::Result,
    regs::{
        CanCtrl, CanInte, Cnf1, Cnf2, Cnf3, OpMode, RecvBufOpMode, Register, Rxb0Ctrl,
        SyncJumpWidth,
    },
    responder::default_reply_id,
    transport::SpiDevice,
    Mcp2515,
};

/// Contents of the `CNF1`..`CNF3` bit timing registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitTiming {
    pub cnf1: Cnf1,
    pub cnf2: Cnf2,
    pub cnf3: Cnf3,
}

impl BitTiming {
    /// Register values in address order (`CNF3`, `CNF2`, `CNF1`), ready for a
    /// sequential write starting at `CNF3`.
    pub fn into_bytes(self) -> [u8; 3] {
        [
            self.cnf3.into_bytes()[0],
            self.cnf2.into_bytes()[0],
            self.cnf1.into_bytes()[0],
        ]
    }
}

impl Default for BitTiming {
    /// 16 TQ per bit on a 16 MHz oscillator: 7 TQ propagation, 4 TQ phase 1,
    /// 4 TQ phase 2, 1 TQ SJW. Register fields hold the TQ count minus one.
    fn default() -> Self {
        Self {
            cnf1: Cnf1::new().with_brp(8).with_sjw(SyncJumpWidth::Tq1),
            cnf2: Cnf2::new()
                .with_prseg(6)
                .with_phseg1(3)
                .with_sam(false)
                .with_btlmode(true),
            cnf3: Cnf3::new().with_phseg2(3),
        }
    }
}

/// Settings used to bring up the responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Bit timing register values.
    pub timing: BitTiming,
    /// Identifier every reply is sent to.
    pub reply_id: StandardId,
    /// Settling time after asserting chip-select, in microseconds.
    pub select_delay_us: u16,
    /// Settling time before de-asserting chip-select, in microseconds.
    pub deselect_delay_us: u16,
}

impl Settings {
    /// Builds the device descriptor for the MCP2515 from these settings.
    pub fn device<CS>(&self, cs: CS) -> SpiDevice<CS> {
        SpiDevice::new(cs, self.select_delay_us, self.deselect_delay_us)
    }
}

impl uDebug for Settings {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> core::result::Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        let [cnf3, cnf2, cnf1] = self.timing.into_bytes();
        f.debug_struct("Settings")?
            .field("cnf1", &cnf1)?
            .field("cnf2", &cnf2)?
            .field("cnf3", &cnf3)?
            .field("reply_id", &self.reply_id.as_raw())?
            .field("select_delay_us", &self.select_delay_us)?
            .field("deselect_delay_us", &self.deselect_delay_us)?
            .finish()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timing: BitTiming::default(),
            reply_id: default_reply_id(),
            select_delay_us: 500,
            deselect_delay_us: 500,
        }
    }
}

/// Configures the MCP2515 to accept every frame, raise INT on reception into
/// RXB0 and join the bus.
///
/// Issues exactly five instructions, in order: reset, bit timing write,
/// interrupt enable write, receive filter write and mode write. Nothing is
/// read back.
///
/// # Parameters
///
/// * `mcp` - Driver for the controller.
/// * `settings` - See [`Settings`].
/// * `trace` - Debug text sink.
pub fn configure<SPI, CS, D, W, SPIE, CSE>(
    mcp: &mut Mcp2515<SPI, CS, D>,
    settings: &Settings,
    trace: &mut W,
) -> Result<(), SPIE, CSE>
where
    SPI: Transfer<u8, Error = SPIE>,
    CS: OutputPin<Error = CSE>,
    D: DelayUs<u16>,
    W: uWrite,
    SPIE: Debug,
    CSE: Debug,
{
    crate::trace!(trace, "startup: configuring MCP2515");

    mcp.reset()?;
    mcp.write_registers(Register::CNF3, &settings.timing.into_bytes())?;
    mcp.write_register(CanInte::new().with_rx0ie(true))?;
    mcp.write_register(Rxb0Ctrl::new().with_rxm(RecvBufOpMode::FilterOff))?;
    mcp.write_register(CanCtrl::new().with_reqop(OpMode::Normal))?;

    crate::trace!(trace, "startup: done");
    Ok(())
}
