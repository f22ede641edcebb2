use bitflags::bitflags;

use crate::regs::Register;

/// Transmit buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxBuf {
    B0,
    B1,
    B2,
}

impl TxBuf {
    /// Returns the `CTRL` register for the selected Tx buffer.
    pub const fn ctrl(self) -> Register {
        match self {
            TxBuf::B0 => Register::TXB0CTRL,
            TxBuf::B1 => Register::TXB1CTRL,
            TxBuf::B2 => Register::TXB2CTRL,
        }
    }

    /// `LOAD TX BUFFER` pointer starting at this buffer's `SIDH` register.
    pub const fn header(self) -> TxBufPointer {
        match self {
            TxBuf::B0 => TxBufPointer::B0Sidh,
            TxBuf::B1 => TxBufPointer::B1Sidh,
            TxBuf::B2 => TxBufPointer::B2Sidh,
        }
    }

    /// `RTS` bit for this buffer.
    pub const fn rts(self) -> TxBufs {
        match self {
            TxBuf::B0 => TxBufs::TXB0,
            TxBuf::B1 => TxBufs::TXB1,
            TxBuf::B2 => TxBufs::TXB2,
        }
    }
}

/// Start address for the `READ RX BUFFER` instruction. The discriminant is
/// the `nm` field of the opcode.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxBufPointer {
    /// `RXB0SIDH`
    B0Sidh = 0b00,
    /// `RXB0D0`
    B0Data = 0b01,
    /// `RXB1SIDH`
    B1Sidh = 0b10,
    /// `RXB1D0`
    B1Data = 0b11,
}

/// Start address for the `LOAD TX BUFFER` instruction. The discriminant is
/// the `abc` field of the opcode.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxBufPointer {
    /// `TXB0SIDH`
    B0Sidh = 0b000,
    /// `TXB0D0`
    B0Data = 0b001,
    /// `TXB1SIDH`
    B1Sidh = 0b010,
    /// `TXB1D0`
    B1Data = 0b011,
    /// `TXB2SIDH`
    B2Sidh = 0b100,
    /// `TXB2D0`
    B2Data = 0b101,
}

bitflags! {
    /// Buffers flagged by a `RTS` (request-to-send) instruction.
    pub struct TxBufs: u8 {
        const TXB0 = 0b001;
        const TXB1 = 0b010;
        const TXB2 = 0b100;
    }
}
