//! Simulated MCP2515 on a recording SPI bus.
//!
//! The SPI, chip-select and delay mocks share one [`SimBus`]. Every pin
//! change, delay and byte is logged, and every completed chip-select bracket
//! is decoded and applied to a 128-byte register file the way the controller
//! would.

use std::{cell::RefCell, convert::Infallible, rc::Rc};

use embedded_hal::{
    blocking::{delay::DelayUs, spi::Transfer},
    digital::v2::OutputPin,
};
use ufmt::uWrite;

use crate::{regs::Register, startup::Settings, transport::SpiDevice, transport::Transport, Mcp2515};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Select,
    Deselect,
    Delay(u16),
    Byte(u8),
}

const CANSTAT: usize = 0x0E;
const CANCTRL: usize = 0x0F;
const CANINTF: usize = 0x2C;
const TXB_CTRL: [usize; 3] = [0x30, 0x40, 0x50];
const TXREQ: u8 = 0x08;

struct State {
    events: Vec<Event>,
    regs: [u8; 128],
    selected: bool,
    command: Vec<u8>,
    fail: bool,
}

impl State {
    fn reset(&mut self) {
        self.regs = [0; 128];
        self.regs[CANCTRL] = 0x87;
        self.regs[CANSTAT] = 0x80;
    }

    fn status(&self) -> u8 {
        let intf = self.regs[CANINTF];
        let mut stat = intf & 0b11;
        for (i, ctrl) in TXB_CTRL.iter().enumerate() {
            if self.regs[*ctrl] & TXREQ != 0 {
                stat |= 0b100 << (2 * i);
            }
            if intf & (0b100 << i) != 0 {
                stat |= 0b1000 << (2 * i);
            }
        }
        stat
    }

    /// Byte the controller shifts out while receiving command byte `idx`.
    fn respond(&self, idx: usize) -> u8 {
        let Some(&op) = self.command.first() else {
            return 0;
        };
        match op {
            0x03 if idx >= 2 => {
                let addr = self.command[1] as usize + idx - 2;
                self.regs[addr & 0x7F]
            }
            0x90..=0x96 if idx >= 1 => {
                let start = [0x61, 0x66, 0x71, 0x76][((op >> 1) & 0b11) as usize];
                self.regs[(start + idx - 1) & 0x7F]
            }
            0xA0 if idx >= 1 => self.status(),
            0xB0 if idx >= 1 => {
                let intf = self.regs[CANINTF];
                ((intf & 0b01) << 6) | ((intf & 0b10) << 6)
            }
            _ => 0,
        }
    }

    fn write(&mut self, start: usize, data: &[u8]) {
        for (i, b) in data.iter().enumerate() {
            self.regs[(start + i) & 0x7F] = *b;
        }
        self.sync_opmode();
    }

    fn sync_opmode(&mut self) {
        self.regs[CANSTAT] = (self.regs[CANSTAT] & 0x1F) | (self.regs[CANCTRL] & 0xE0);
    }

    /// Applies a completed command.
    fn apply(&mut self) {
        let cmd = std::mem::take(&mut self.command);
        match cmd.as_slice() {
            [0xC0] => self.reset(),
            [0x02, addr, data @ ..] => self.write(*addr as usize, data),
            [0x05, addr, mask, value] => {
                let r = &mut self.regs[*addr as usize & 0x7F];
                *r = (*r & !mask) | (value & mask);
                self.sync_opmode();
            }
            [op @ 0x40..=0x45, data @ ..] => {
                let start = [0x31, 0x36, 0x41, 0x46, 0x51, 0x56][*op as usize & 0x7];
                self.write(start, data);
            }
            [op @ 0x81..=0x87] => {
                for (i, ctrl) in TXB_CTRL.iter().enumerate() {
                    if op & (1 << i) != 0 {
                        self.regs[*ctrl] |= TXREQ;
                    }
                }
            }
            [op @ 0x90..=0x96, ..] => {
                let flag = if op & 0b100 == 0 { 0b01 } else { 0b10 };
                self.regs[CANINTF] &= !flag;
            }
            _ => {}
        }
        self.command = cmd;
    }
}

/// Shared simulated bus. Clones refer to the same state.
#[derive(Clone)]
pub struct SimBus(Rc<RefCell<State>>);

impl SimBus {
    pub fn new() -> Self {
        let mut state = State {
            events: Vec::new(),
            regs: [0; 128],
            selected: false,
            command: Vec::new(),
            fail: false,
        };
        state.reset();
        Self(Rc::new(RefCell::new(state)))
    }

    /// Transport with the given settling delays. Construction events are
    /// dropped from the log.
    pub fn transport(&self, select_us: u16, deselect_us: u16) -> Transport<MockSpi, MockPin, MockDelay> {
        let device = SpiDevice::new(MockPin(self.clone()), select_us, deselect_us);
        let transport = Transport::new(MockSpi(self.clone()), device, MockDelay(self.clone())).unwrap();
        self.0.borrow_mut().events.clear();
        transport
    }

    pub fn controller(&self) -> Mcp2515<MockSpi, MockPin, MockDelay> {
        Mcp2515::new(self.transport(0, 0))
    }

    pub fn controller_with(&self, settings: &Settings) -> Mcp2515<MockSpi, MockPin, MockDelay> {
        Mcp2515::new(self.transport(settings.select_delay_us, settings.deselect_delay_us))
    }

    /// Latches a standard frame into RXB0 and raises `RX0IF`.
    pub fn receive(&self, sid: u16, data: &[u8]) {
        let mut s = self.0.borrow_mut();
        s.regs[0x61] = (sid >> 3) as u8;
        s.regs[0x62] = ((sid & 0x7) << 5) as u8;
        s.regs[0x65] = data.len() as u8;
        for (i, b) in data.iter().enumerate() {
            s.regs[0x66 + i] = *b;
        }
        s.regs[CANINTF] |= 0b01;
    }

    pub fn reg(&self, reg: Register) -> u8 {
        self.0.borrow().regs[reg as usize]
    }

    pub fn set_reg(&self, reg: Register, value: u8) {
        let mut s = self.0.borrow_mut();
        s.regs[reg as usize] = value;
        s.sync_opmode();
    }

    /// Standard identifier currently loaded into TXB0.
    pub fn tx0_sid(&self) -> u16 {
        let s = self.0.borrow();
        (u16::from(s.regs[0x31]) << 3) | u16::from(s.regs[0x32] >> 5)
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().events.clone()
    }

    pub fn is_idle(&self) -> bool {
        !self.0.borrow().selected
    }

    /// Makes every following SPI transfer fail.
    pub fn fail_transfers(&self) {
        self.0.borrow_mut().fail = true;
    }

    /// Bytes of every chip-select bracket so far.
    ///
    /// Panics if a select is nested, a deselect is unpaired, a byte is sent
    /// outside a bracket or a bracket is still open.
    pub fn commands(&self) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        let mut current: Option<Vec<u8>> = None;
        for event in self.events() {
            match event {
                Event::Select => {
                    assert!(current.is_none(), "nested chip-select");
                    current = Some(Vec::new());
                }
                Event::Deselect => {
                    out.push(current.take().expect("deselect without select"));
                }
                Event::Byte(b) => current.as_mut().expect("byte outside bracket").push(b),
                Event::Delay(_) => {}
            }
        }
        assert!(current.is_none(), "bracket left open");
        out
    }
}

pub struct MockSpi(SimBus);

impl Transfer<u8> for MockSpi {
    type Error = MockError;

    fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], Self::Error> {
        let mut s = (self.0).0.borrow_mut();
        if s.fail {
            return Err(MockError);
        }
        for w in words.iter_mut() {
            let idx = s.command.len();
            let out = *w;
            s.events.push(Event::Byte(out));
            s.command.push(out);
            *w = if s.selected { s.respond(idx) } else { 0xFF };
        }
        Ok(words)
    }
}

pub struct MockPin(SimBus);

impl OutputPin for MockPin {
    type Error = MockError;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        let mut s = (self.0).0.borrow_mut();
        s.events.push(Event::Select);
        s.selected = true;
        s.command.clear();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut s = (self.0).0.borrow_mut();
        s.events.push(Event::Deselect);
        if s.selected {
            s.apply();
        }
        s.selected = false;
        Ok(())
    }
}

pub struct MockDelay(SimBus);

impl DelayUs<u16> for MockDelay {
    fn delay_us(&mut self, us: u16) {
        (self.0).0.borrow_mut().events.push(Event::Delay(us));
    }
}

/// Trace sink collecting everything into a string.
#[derive(Debug, Default)]
pub struct StringTrace(pub String);

impl uWrite for StringTrace {
    type Error = Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        self.0.push_str(s);
        Ok(())
    }
}
