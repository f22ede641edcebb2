#![no_std]
#![no_main]
#![feature(abi_avr_interrupt)]

use panic_halt as _;

use arduino_hal::{
    hal::{port::PB2, usart::Usart0},
    spi::{ChipSelectPin, Settings as SpiSettings},
    DefaultClock, Delay, Spi,
};
use canping::{transport::Transport, Handler, Mcp2515, Responder, Settings};

type Can = Responder<Spi, ChipSelectPin<PB2>, Delay, Usart0<DefaultClock>>;

static HANDLER: Handler<Can> = Handler::new();

// The MCP2515 pulls INT low while RX0IF is set. INT0 is level triggered, so
// it fires again until the handler has read the buffer.
#[avr_device::interrupt(atmega168)]
fn INT0() {
    HANDLER.run(|can| {
        let _ = can.on_frame_received();
    });
}

#[arduino_hal::entry]
fn main() -> ! {
    let dp = arduino_hal::Peripherals::take().unwrap();
    let pins = arduino_hal::pins!(dp);

    let mut serial = arduino_hal::default_serial!(dp, pins, 57600);
    ufmt::uwriteln!(&mut serial, "main: hello").unwrap();
    ufmt::uwrite!(&mut serial, "main: configuring MCU...").unwrap();

    let (spi, cs) = Spi::new(
        dp.SPI,
        pins.d13.into_output(),
        pins.d11.into_output(),
        pins.d12.into_pull_up_input(),
        pins.d10.into_output(),
        SpiSettings {
            data_order: arduino_hal::spi::DataOrder::MostSignificantFirst,
            clock: arduino_hal::spi::SerialClockRate::OscfOver16,
            mode: embedded_hal::spi::MODE_0,
        },
    );
    ufmt::uwriteln!(&mut serial, " done").unwrap();

    let settings = Settings::default();
    let transport = Transport::new(spi, settings.device(cs), Delay::new()).unwrap();
    let can = Responder::start(Mcp2515::new(transport), &settings, serial).unwrap();
    HANDLER.install(can);

    // Listen for the MCP2515 interrupt.
    dp.EXINT.eimsk.write(|w| unsafe { w.bits(0b01) });
    unsafe { avr_device::interrupt::enable() };

    HANDLER.run(|can| canping::trace!(can.trace(), "main: entering main wait loop"));

    loop {}
}
