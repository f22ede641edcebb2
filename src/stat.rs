use bitflags::bitflags;

bitflags! {
    /// Result of the `READ STATUS` instruction.
    pub struct Status: u8 {
        const RX0IF = 0b0000_0001;
        const RX1IF = 0b0000_0010;
        const TX0REQ = 0b0000_0100;
        const TX0IF = 0b0000_1000;
        const TX1REQ = 0b0001_0000;
        const TX1IF = 0b0010_0000;
        const TX2REQ = 0b0100_0000;
        const TX2IF = 0b1000_0000;
    }
}

bitflags! {
    /// Result of the `RX STATUS` instruction. Only the buffer and frame type
    /// bits are exposed as flags; see [`RxStatus::filter_hit`].
    pub struct RxStatus: u8 {
        const FILTER = 0b0000_0111;
        const RTR = 0b0000_1000;
        const EXTENDED = 0b0001_0000;
        const RXB0 = 0b0100_0000;
        const RXB1 = 0b1000_0000;
    }
}

impl RxStatus {
    /// Index of the filter that accepted the message (0-5). Values 6 and 7
    /// mean RXF0 or RXF1 rolled over into RXB1.
    pub fn filter_hit(self) -> u8 {
        (self & Self::FILTER).bits()
    }
}
