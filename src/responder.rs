//! Reception handler.
//!
//! [`Responder`] owns the driver and answers one received frame per call to
//! [`Responder::on_frame_received`]. Firmware moves it into a static
//! [`Handler`] after startup and calls [`Handler::run`] from the interrupt
//! wired to the MCP2515's INT pin:
//!
//! ```ignore
//! static HANDLER: Handler<Responder<Spi, Cs, Delay, Serial>> = Handler::new();
//!
//! #[interrupt]
//! fn INT0() {
//!     HANDLER.run(|r| r.on_frame_received());
//! }
//! ```

use core::{
    cell::{Cell, RefCell},
    fmt::Debug,
};

use critical_section::Mutex;
use embedded_hal::{
    blocking::{delay::DelayUs, spi::Transfer},
    can::StandardId,
    digital::v2::OutputPin,
};
use ufmt::uWrite;

use crate::{
    buffer::{RxBufPointer, TxBuf},
    error::Result,
    frame::{Payload, TxHeader},
    regs::TxbCtrl,
    startup::{self, Settings},
    trace::Hex,
    Mcp2515,
};

/// Raw standard identifier replies are sent to by default.
pub const REPLY_SID: u16 = 0x07;

/// [`REPLY_SID`] as a [`StandardId`].
pub fn default_reply_id() -> StandardId {
    StandardId::new(REPLY_SID).unwrap_or(StandardId::ZERO)
}

/// Tx buffer every reply is loaded into.
const REPLY_BUF: TxBuf = TxBuf::B0;

/// Replies to every received frame with its first data byte plus one.
pub struct Responder<SPI, CS, D, W> {
    mcp: Mcp2515<SPI, CS, D>,
    reply_id: StandardId,
    trace: W,
}

impl<SPI, CS, D, W, SPIE, CSE> Responder<SPI, CS, D, W>
where
    SPI: Transfer<u8, Error = SPIE>,
    CS: OutputPin<Error = CSE>,
    D: DelayUs<u16>,
    W: uWrite,
    SPIE: Debug,
    CSE: Debug,
{
    /// Wraps an already configured driver.
    ///
    /// # Parameters
    ///
    /// * `mcp` - Configured MCP2515 driver.
    /// * `reply_id` - Identifier replies are sent to.
    /// * `trace` - Debug text sink.
    pub fn new(mcp: Mcp2515<SPI, CS, D>, reply_id: StandardId, trace: W) -> Self {
        Self {
            mcp,
            reply_id,
            trace,
        }
    }

    /// Runs the startup sequence on `mcp` and wraps it.
    pub fn start(
        mut mcp: Mcp2515<SPI, CS, D>,
        settings: &Settings,
        mut trace: W,
    ) -> Result<Self, SPIE, CSE> {
        startup::configure(&mut mcp, settings, &mut trace)?;
        Ok(Self::new(mcp, settings.reply_id, trace))
    }

    /// Handles one "frame received" notification.
    ///
    /// Reads the first data byte of RXB0, then loads the incremented byte
    /// into TXB0 and flags it for transmission. The receive interrupt flag is
    /// not cleared explicitly: `READ RX BUFFER` clears it when chip-select
    /// rises.
    pub fn on_frame_received(&mut self) -> Result<(), SPIE, CSE> {
        crate::trace!(&mut self.trace, "rx: frame received");

        let mut data = [0u8; 1];
        self.mcp.read_rx_buffer(RxBufPointer::B0Data, &mut data)?;
        let received = Payload(data[0]);
        crate::trace!(&mut self.trace, "rx: data {}", Hex(received.0));

        let reply = received.reply();
        self.send(reply)?;
        crate::trace!(&mut self.trace, "rx: replied with {}", Hex(reply.0));
        crate::trace!(&mut self.trace, "rx: done");

        Ok(())
    }

    /// Loads `payload` into the reply buffer and sets its `TXREQ` bit.
    fn send(&mut self, payload: Payload) -> Result<(), SPIE, CSE> {
        let mut buf = [0u8; 6];
        buf[..5].copy_from_slice(&TxHeader::standard(self.reply_id, 1).into_bytes());
        buf[5] = payload.0;
        self.mcp.load_tx_buffer(REPLY_BUF.header(), &buf)?;

        self.mcp.bit_modify(
            REPLY_BUF.ctrl(),
            TxbCtrl::MASK_TXREQ.into_bytes()[0],
            TxbCtrl::new().with_txreq(true).into_bytes()[0],
        )
    }

    pub fn reply_id(&self) -> StandardId {
        self.reply_id
    }

    /// Debug text sink, for firmware that wants to add its own lines.
    pub fn trace(&mut self) -> &mut W {
        &mut self.trace
    }

    pub fn release(self) -> (Mcp2515<SPI, CS, D>, W) {
        (self.mcp, self.trace)
    }
}

/// Slot sharing a value between the main program and an interrupt.
///
/// The value is only reachable through [`Handler::run`], which holds a
/// critical section (interrupts masked) for the whole call and refuses to
/// enter if the value is already borrowed.
pub struct Handler<T> {
    slot: Mutex<RefCell<Option<T>>>,
    pending: Mutex<Cell<bool>>,
}

impl<T> Handler<T> {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(RefCell::new(None)),
            pending: Mutex::new(Cell::new(false)),
        }
    }

    /// Moves `value` into the slot, returning whatever was there before.
    pub fn install(&self, value: T) -> Option<T> {
        critical_section::with(|cs| self.slot.borrow(cs).replace(Some(value)))
    }

    /// Moves the value out of the slot.
    pub fn take(&self) -> Option<T> {
        critical_section::with(|cs| self.slot.borrow(cs).take())
    }

    /// Runs `f` on the installed value with interrupts masked.
    ///
    /// Returns `None` if nothing is installed or if called from inside
    /// another `run` on the same slot.
    pub fn run<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        critical_section::with(|cs| {
            let mut slot = self.slot.borrow(cs).try_borrow_mut().ok()?;
            slot.as_mut().map(f)
        })
    }

    /// Records a notification for later handling in the main loop.
    pub fn notify(&self) {
        critical_section::with(|cs| self.pending.borrow(cs).set(true));
    }

    /// Clears and returns the pending notification flag.
    pub fn take_pending(&self) -> bool {
        critical_section::with(|cs| self.pending.borrow(cs).replace(false))
    }

    /// Runs `f` if a notification is pending. Notifications arriving while
    /// `f` runs stay pending.
    pub fn poll<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        if self.take_pending() {
            self.run(f)
        } else {
            None
        }
    }
}

impl<T> Default for Handler<T> {
    fn default() -> Self {
        Self::new()
    }
}
