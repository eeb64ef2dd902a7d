//! System clock frequencies supported by the flash timing logic

/// Clock frequencies accepted by [`crate::FlashController::initialize`]
///
/// The position in [`ClockFrequency::ALL`] is the value programmed into
/// the DELAY_CTRL.SYSCLK_FREQ field, so frequencies are listed in
/// increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClockFrequency {
    /// 3 MHz
    Mhz3,
    /// 4 MHz
    Mhz4,
    /// 5 MHz
    Mhz5,
    /// 8 MHz
    Mhz8,
    /// 10 MHz
    Mhz10,
    /// 12 MHz
    Mhz12,
    /// 16 MHz
    Mhz16,
    /// 20 MHz
    Mhz20,
    /// 24 MHz
    Mhz24,
    /// 48 MHz
    Mhz48,
}

impl ClockFrequency {
    /// Every supported frequency, indexed by its SYSCLK_FREQ encoding
    pub const ALL: [ClockFrequency; 10] = [
        Self::Mhz3,
        Self::Mhz4,
        Self::Mhz5,
        Self::Mhz8,
        Self::Mhz10,
        Self::Mhz12,
        Self::Mhz16,
        Self::Mhz20,
        Self::Mhz24,
        Self::Mhz48,
    ];

    /// Frequency in Hz
    pub const fn hz(self) -> u32 {
        match self {
            Self::Mhz3 => 3_000_000,
            Self::Mhz4 => 4_000_000,
            Self::Mhz5 => 5_000_000,
            Self::Mhz8 => 8_000_000,
            Self::Mhz10 => 10_000_000,
            Self::Mhz12 => 12_000_000,
            Self::Mhz16 => 16_000_000,
            Self::Mhz20 => 20_000_000,
            Self::Mhz24 => 24_000_000,
            Self::Mhz48 => 48_000_000,
        }
    }

    /// Look up a frequency given in Hz
    pub fn from_hz(hz: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.hz() == hz)
    }

    /// SYSCLK_FREQ field encoding
    pub fn delay_index(self) -> u32 {
        Self::ALL.iter().position(|&f| f == self).unwrap_or(0) as u32
    }

    /// Internal timing trim selection, if this frequency needs one
    pub const fn timing_trim(self) -> Option<u32> {
        match self {
            Self::Mhz24 => Some(1),
            Self::Mhz48 => Some(2),
            _ => None,
        }
    }
}

impl core::fmt::Display for ClockFrequency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} MHz", self.hz() / 1_000_000)
    }
}
