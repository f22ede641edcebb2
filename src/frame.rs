use embedded_hal::can::StandardId;
use ufmt::derive::uDebug;

use crate::regs::{TxbDlc, TxbSidl};

/// The single byte of application data carried in a frame's first data slot.
#[derive(uDebug, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Payload(pub u8);

impl Payload {
    /// Payload to send back for this one: the value plus one, wrapping at 256.
    #[inline]
    pub const fn reply(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Identifier and length registers of a Tx buffer, in the order `LOAD TX
/// BUFFER` writes them: `SIDH`, `SIDL`, `EID8`, `EID0`, `DLC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxHeader {
    sidh: u8,
    sidl: TxbSidl,
    dlc: TxbDlc,
}

impl TxHeader {
    /// Header for a data frame with a standard identifier.
    ///
    /// # Parameters
    ///
    /// * `id` - Standard identifier to send to.
    /// * `dlc` - Data length code, 0-8. Clamped to 8.
    pub fn standard(id: StandardId, dlc: u8) -> Self {
        let sid = id.as_raw();
        Self {
            sidh: (sid >> 3) as u8,
            sidl: TxbSidl::new().with_exide(false).with_sid_lo((sid & 0x7) as u8),
            dlc: TxbDlc::new().with_rtr(false).with_dlc(dlc.min(8)),
        }
    }

    /// Standard identifier encoded in this header.
    pub fn sid(&self) -> u16 {
        (u16::from(self.sidh) << 3) | u16::from(self.sidl.sid_lo())
    }

    pub fn dlc(&self) -> u8 {
        self.dlc.dlc()
    }

    pub fn into_bytes(self) -> [u8; 5] {
        // Extended identifier bytes stay zero for standard frames.
        [
            self.sidh,
            self.sidl.into_bytes()[0],
            0,
            0,
            self.dlc.into_bytes()[0],
        ]
    }
}
