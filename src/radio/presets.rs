//! Modulation presets
//!
//! A preset is a named CC1101 configuration: a register table plus a PA
//! ramp. Presets are immutable once loaded into the chip; whichever
//! session configured them owns them for the duration of that session.

use crate::drivers::cc1101::reg;

/// Capacity of a custom preset's register table, in (addr, value) pairs
pub const CUSTOM_PRESET_PAIRS: usize = 48;

/// A named radio configuration
#[derive(Clone, Debug)]
pub enum RadioPreset {
    /// OOK, 270 kHz RX bandwidth, async bit-bang
    Ook270Async,
    /// OOK, 650 kHz RX bandwidth, async bit-bang
    Ook650Async,
    /// 2-FSK, 2.38 kHz deviation, async bit-bang
    TwoFskDev238Async,
    /// 2-FSK, 47.6 kHz deviation, async bit-bang
    TwoFskDev476Async,
    /// GFSK, 9.99 kb/s, packet mode (the chat preset)
    Gfsk9_99Kb,
    /// MSK, 99.97 kb/s, packet mode
    Msk99_97Kb,
    /// Raw register table loaded from a capture file
    Custom {
        /// (addr, value) pairs, in programming order
        registers: heapless::Vec<(u8, u8), CUSTOM_PRESET_PAIRS>,
        /// PA ramp table
        pa_table: [u8; 8],
    },
}

impl RadioPreset {
    /// Preset name as persisted in capture files
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ook270Async => "Ook270Async",
            Self::Ook650Async => "Ook650Async",
            Self::TwoFskDev238Async => "2FskDev238Async",
            Self::TwoFskDev476Async => "2FskDev476Async",
            Self::Gfsk9_99Kb => "Gfsk9_99Kb",
            Self::Msk99_97Kb => "Msk99_97Kb",
            Self::Custom { .. } => "Custom",
        }
    }

    /// Look a built-in preset up by its persisted name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Ook270Async" => Some(Self::Ook270Async),
            "Ook650Async" => Some(Self::Ook650Async),
            "2FskDev238Async" => Some(Self::TwoFskDev238Async),
            "2FskDev476Async" => Some(Self::TwoFskDev476Async),
            "Gfsk9_99Kb" => Some(Self::Gfsk9_99Kb),
            "Msk99_97Kb" => Some(Self::Msk99_97Kb),
            _ => None,
        }
    }

    /// Register table in programming order
    #[must_use]
    pub fn registers(&self) -> &[(u8, u8)] {
        match self {
            Self::Ook270Async => tables::OOK_270_ASYNC,
            Self::Ook650Async => tables::OOK_650_ASYNC,
            Self::TwoFskDev238Async => tables::TWO_FSK_DEV238_ASYNC,
            Self::TwoFskDev476Async => tables::TWO_FSK_DEV476_ASYNC,
            Self::Gfsk9_99Kb => tables::GFSK_9_99KB,
            Self::Msk99_97Kb => tables::MSK_99_97KB,
            Self::Custom { registers, .. } => registers,
        }
    }

    /// PA ramp table
    #[must_use]
    pub fn pa_table(&self) -> &[u8; 8] {
        match self {
            Self::Ook270Async
            | Self::Ook650Async => &tables::PA_TABLE_OOK,
            Self::TwoFskDev238Async
            | Self::TwoFskDev476Async
            | Self::Gfsk9_99Kb
            | Self::Msk99_97Kb => &tables::PA_TABLE_FSK,
            Self::Custom { pa_table, .. } => pa_table,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for RadioPreset {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", self.name());
    }
}

mod tables {
    //! Register tables for the built-in presets
    //!
    //! Async presets route the demodulated bit stream to GDO0 and bypass
    //! the packet engine; packet-mode presets enable CRC autoflush and a
    //! variable-length FIFO format.

    use super::reg;

    /// PA ramp for OOK presets (off / full power alternation)
    pub const PA_TABLE_OOK: [u8; 8] = [0x00, 0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

    /// PA ramp for FSK-family presets
    pub const PA_TABLE_FSK: [u8; 8] = [0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

    pub const OOK_270_ASYNC: &[(u8, u8)] = &[
        (reg::IOCFG0, 0x0D),   // GDO0: async serial data
        (reg::FIFOTHR, 0x47),
        (reg::PKTCTRL0, 0x32), // async serial, infinite packet
        (reg::FSCTRL1, 0x06),
        (reg::MDMCFG4, 0x67),  // 270 kHz bandwidth
        (reg::MDMCFG3, 0x32),
        (reg::MDMCFG2, 0x30),  // OOK, no sync
        (reg::FREND0, 0x11),   // PA index follows data
        (reg::MCSM0, 0x18),
        (reg::FOCCFG, 0x18),
        (reg::AGCCTRL2, 0x07),
        (reg::AGCCTRL1, 0x00),
        (reg::AGCCTRL0, 0x91),
        (reg::TEST2, 0x88),
        (reg::TEST1, 0x31),
        (reg::TEST0, 0x09),
    ];

    pub const OOK_650_ASYNC: &[(u8, u8)] = &[
        (reg::IOCFG0, 0x0D),
        (reg::FIFOTHR, 0x07),
        (reg::PKTCTRL0, 0x32),
        (reg::FSCTRL1, 0x06),
        (reg::MDMCFG4, 0x17),  // 650 kHz bandwidth
        (reg::MDMCFG3, 0x32),
        (reg::MDMCFG2, 0x30),
        (reg::FREND0, 0x11),
        (reg::MCSM0, 0x18),
        (reg::FOCCFG, 0x18),
        (reg::AGCCTRL2, 0x07),
        (reg::AGCCTRL1, 0x00),
        (reg::AGCCTRL0, 0x91),
        (reg::TEST2, 0x88),
        (reg::TEST1, 0x31),
        (reg::TEST0, 0x09),
    ];

    pub const TWO_FSK_DEV238_ASYNC: &[(u8, u8)] = &[
        (reg::IOCFG0, 0x0D),
        (reg::FIFOTHR, 0x47),
        (reg::PKTCTRL0, 0x32),
        (reg::FSCTRL1, 0x06),
        (reg::MDMCFG4, 0x67),
        (reg::MDMCFG3, 0x32),
        (reg::MDMCFG2, 0x04),  // 2-FSK, no sync
        (reg::DEVIATN, 0x04),  // 2.38 kHz
        (reg::FREND0, 0x10),
        (reg::MCSM0, 0x18),
        (reg::FOCCFG, 0x16),
        (reg::AGCCTRL2, 0x07),
        (reg::AGCCTRL1, 0x00),
        (reg::AGCCTRL0, 0x91),
        (reg::TEST2, 0x88),
        (reg::TEST1, 0x31),
        (reg::TEST0, 0x09),
    ];

    pub const TWO_FSK_DEV476_ASYNC: &[(u8, u8)] = &[
        (reg::IOCFG0, 0x0D),
        (reg::FIFOTHR, 0x47),
        (reg::PKTCTRL0, 0x32),
        (reg::FSCTRL1, 0x06),
        (reg::MDMCFG4, 0x67),
        (reg::MDMCFG3, 0x32),
        (reg::MDMCFG2, 0x04),
        (reg::DEVIATN, 0x47),  // 47.6 kHz
        (reg::FREND0, 0x10),
        (reg::MCSM0, 0x18),
        (reg::FOCCFG, 0x16),
        (reg::AGCCTRL2, 0x07),
        (reg::AGCCTRL1, 0x00),
        (reg::AGCCTRL0, 0x91),
        (reg::TEST2, 0x88),
        (reg::TEST1, 0x31),
        (reg::TEST0, 0x09),
    ];

    pub const GFSK_9_99KB: &[(u8, u8)] = &[
        (reg::IOCFG0, 0x06),   // GDO0: sync word / end of packet
        (reg::FIFOTHR, 0x07),
        (reg::SYNC1, 0x46),
        (reg::SYNC0, 0x4C),
        (reg::PKTCTRL1, 0x04), // append status, no addr check
        (reg::PKTCTRL0, 0x05), // variable length, CRC on
        (reg::FSCTRL1, 0x06),
        (reg::MDMCFG4, 0xC8),  // 9.99 kb/s
        (reg::MDMCFG3, 0x93),
        (reg::MDMCFG2, 0x12),  // GFSK, 16/16 sync
        (reg::MDMCFG1, 0x22),
        (reg::DEVIATN, 0x34),
        (reg::MCSM0, 0x18),
        (reg::FOCCFG, 0x16),
        (reg::AGCCTRL2, 0x43),
        (reg::AGCCTRL1, 0x40),
        (reg::AGCCTRL0, 0x91),
        (reg::FSCAL3, 0xE9),
        (reg::FSCAL2, 0x2A),
        (reg::FSCAL1, 0x00),
        (reg::FSCAL0, 0x1F),
        (reg::TEST2, 0x81),
        (reg::TEST1, 0x35),
        (reg::TEST0, 0x09),
    ];

    pub const MSK_99_97KB: &[(u8, u8)] = &[
        (reg::IOCFG0, 0x06),
        (reg::FIFOTHR, 0x07),
        (reg::SYNC1, 0x46),
        (reg::SYNC0, 0x4C),
        (reg::PKTCTRL1, 0x04),
        (reg::PKTCTRL0, 0x05),
        (reg::FSCTRL1, 0x0C),
        (reg::MDMCFG4, 0x5B),  // 99.97 kb/s
        (reg::MDMCFG3, 0xF8),
        (reg::MDMCFG2, 0x72),  // MSK, 16/16 sync
        (reg::MDMCFG1, 0x22),
        (reg::DEVIATN, 0x47),
        (reg::MCSM0, 0x18),
        (reg::FOCCFG, 0x1D),
        (reg::AGCCTRL2, 0xC7),
        (reg::AGCCTRL1, 0x00),
        (reg::AGCCTRL0, 0xB2),
        (reg::FSCAL3, 0xEA),
        (reg::FSCAL2, 0x2A),
        (reg::FSCAL1, 0x00),
        (reg::FSCAL0, 0x1F),
        (reg::TEST2, 0x81),
        (reg::TEST1, 0x35),
        (reg::TEST0, 0x09),
    ];
}
