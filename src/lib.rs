#![cfg_attr(not(test), no_std)]

//! MCP2515 CAN responder.
//!
//! On every received frame, the responder reads the first data byte,
//! increments it and sends it back to a fixed standard identifier.
//!
//! The crate is split the same way the data flows:
//!
//! * [`transport`] - chip-select bracketed byte exchanges over SPI.
//! * [`Mcp2515`] - the controller's SPI instruction set.
//! * [`startup`] - the one-shot configuration sequence.
//! * [`responder`] - the reception handler and the interrupt-shared slot it
//!   lives in.

pub mod buffer;
pub mod error;
pub mod frame;
pub mod regs;
pub mod responder;
pub mod startup;
pub mod stat;
pub mod trace;
pub mod transport;

#[cfg(test)]
pub(crate) mod mocks;

use core::fmt::Debug;

use embedded_hal::{
    blocking::{delay::DelayUs, spi::Transfer},
    digital::v2::OutputPin,
};

use crate::{
    buffer::{RxBufPointer, TxBufPointer, TxBufs},
    error::Result,
    regs::{CanStat, OpMode, Reg, Register},
    stat::{RxStatus, Status},
    transport::Transport,
};

pub use crate::{
    responder::{Handler, Responder},
    startup::Settings,
    trace::NoTrace,
};

#[repr(u8)]
enum Instruction {
    Write = 0x02,
    Read = 0x03,
    Bitmod = 0x05,
    LoadTx = 0x40,
    Rts = 0x80,
    ReadRx = 0x90,
    ReadStatus = 0xA0,
    RxStatus = 0xB0,
    Reset = 0xC0,
}

/// Oscillator start-up time after a reset.
const RESET_DELAY_US: u16 = 5_000;

/// MCP2515 instruction set over a [`Transport`].
///
/// Each method issues exactly one instruction, in its own chip-select
/// bracket.
pub struct Mcp2515<SPI, CS, D> {
    transport: Transport<SPI, CS, D>,
}

impl<SPI, CS, D, SPIE, CSE> Mcp2515<SPI, CS, D>
where
    SPI: Transfer<u8, Error = SPIE>,
    CS: OutputPin<Error = CSE>,
    D: DelayUs<u16>,
    SPIE: Debug,
    CSE: Debug,
{
    /// Creates a new driver. Nothing is sent to the chip.
    ///
    /// # Parameters
    ///
    /// * `transport` - Transport bound to the MCP2515's chip-select line.
    pub fn new(transport: Transport<SPI, CS, D>) -> Self {
        Self { transport }
    }

    /// Resets the MCP2515 to its power-on state (configuration mode), then
    /// waits for the oscillator to settle.
    pub fn reset(&mut self) -> Result<(), SPIE, CSE> {
        self.transport
            .transaction(|bus| bus.write(&[Instruction::Reset as u8]))?;
        self.transport.delay_us(RESET_DELAY_US);
        Ok(())
    }

    /// Reads registers starting from `reg` sequentially until `ret` is full.
    ///
    /// # Parameters
    ///
    /// * `reg` - Register to start reading from.
    /// * `ret` - Return slice to write into.
    pub fn read_registers(&mut self, reg: Register, ret: &mut [u8]) -> Result<(), SPIE, CSE> {
        self.transport.transaction(|bus| {
            bus.write(&[Instruction::Read as u8, reg as u8])?;
            bus.read(ret)
        })
    }

    /// Read a register via a register object.
    #[inline]
    pub fn read_register<R: Reg>(&mut self) -> Result<R, SPIE, CSE> {
        let mut ret = [0u8; 1];
        self.read_registers(R::ADDRESS, &mut ret)?;
        Ok(R::from_byte(ret[0]))
    }

    /// Writes to sequential registers. Writing starts at `reg` and continues
    /// until `data` is empty.
    ///
    /// # Parameters
    ///
    /// * `reg` - First register to write.
    /// * `data` - Values for `reg` and the registers following it.
    pub fn write_registers(&mut self, reg: Register, data: &[u8]) -> Result<(), SPIE, CSE> {
        self.transport.transaction(|bus| {
            bus.write(&[Instruction::Write as u8, reg as u8])?;
            bus.write(data)
        })
    }

    /// Write to a register using a register object.
    #[inline]
    pub fn write_register<R: Reg>(&mut self, reg: R) -> Result<(), SPIE, CSE> {
        self.write_registers(R::ADDRESS, &[reg.to_byte()])
    }

    /// Changes the bits of `reg` selected by `mask` to the matching bits of
    /// `value`. Other bits are left untouched.
    ///
    /// Only some registers support this; see the datasheet's register map.
    pub fn bit_modify(&mut self, reg: Register, mask: u8, value: u8) -> Result<(), SPIE, CSE> {
        self.transport.transaction(|bus| {
            bus.write(&[Instruction::Bitmod as u8, reg as u8, mask, value])
        })
    }

    /// Modifies a register.
    ///
    /// # Parameters
    ///
    /// * `reg` - New register content.
    /// * `mask` - Mask register. The bits must be 1 in the positions you want
    ///   to modify.
    #[inline]
    pub fn modify_register<R: Reg>(&mut self, reg: R, mask: R) -> Result<(), SPIE, CSE> {
        self.bit_modify(R::ADDRESS, mask.to_byte(), reg.to_byte())
    }

    /// Reads a receive buffer starting at `ptr` until `ret` is full.
    ///
    /// Raising chip-select at the end of this instruction clears the
    /// buffer's `RXnIF` flag, which releases the INT line.
    pub fn read_rx_buffer(&mut self, ptr: RxBufPointer, ret: &mut [u8]) -> Result<(), SPIE, CSE> {
        self.transport.transaction(|bus| {
            bus.write(&[Instruction::ReadRx as u8 | ((ptr as u8) << 1)])?;
            bus.read(ret)
        })
    }

    /// Writes `data` into a transmit buffer starting at `ptr`.
    pub fn load_tx_buffer(&mut self, ptr: TxBufPointer, data: &[u8]) -> Result<(), SPIE, CSE> {
        self.transport.transaction(|bus| {
            bus.write(&[Instruction::LoadTx as u8 | ptr as u8])?;
            bus.write(data)
        })
    }

    /// Requests transmission of the given buffers.
    pub fn request_to_send(&mut self, bufs: TxBufs) -> Result<(), SPIE, CSE> {
        self.transport
            .transaction(|bus| bus.write(&[Instruction::Rts as u8 | bufs.bits()]))
    }

    /// Reads the quick status flags.
    pub fn read_status(&mut self) -> Result<Status, SPIE, CSE> {
        self.transport.transaction(|bus| {
            bus.write(&[Instruction::ReadStatus as u8])?;
            bus.exchange(0).map(Status::from_bits_truncate)
        })
    }

    /// Reads which receive buffer holds a message and how it was matched.
    pub fn rx_status(&mut self) -> Result<RxStatus, SPIE, CSE> {
        self.transport.transaction(|bus| {
            bus.write(&[Instruction::RxStatus as u8])?;
            bus.exchange(0).map(RxStatus::from_bits_truncate)
        })
    }

    /// Current operation mode as reported by `CANSTAT`, or `None` if the
    /// register holds a reserved mode.
    pub fn op_mode(&mut self) -> Result<Option<OpMode>, SPIE, CSE> {
        let stat: CanStat = self.read_register()?;
        Ok(stat.opmod_or_err().ok())
    }

    /// Releases the transport.
    pub fn release(self) -> Transport<SPI, CS, D> {
        self.transport
    }
}
