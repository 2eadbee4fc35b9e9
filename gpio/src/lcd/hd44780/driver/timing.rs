/// Blocking waits used by [GpioHD44780Driver](super::GpioHD44780Driver).
///
/// The driver never reads the busy flag, so every command is followed by a fixed worst-case wait.
/// The datasheet values depend on the oscillator frequency of the specific module, so two presets
/// are provided. [Timing::CONSERVATIVE] is the default.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Timing {
    /// How long E is held high on every pulse, in microseconds. This is also the minimum time
    /// a regular command takes to execute.
    pub busy_delay_us: u32,
    /// Total time the clear display and return home commands take to execute, in microseconds.
    pub extended_delay_us: u32,
    /// Wait after power-on before the first reset nibble, in milliseconds. Has to be over 40 ms.
    pub power_on_delay_ms: u32,
    /// Wait after the first reset nibble, in microseconds. Has to be over 4.1 ms.
    pub sync_first_delay_us: u32,
    /// Wait after the second reset nibble, in microseconds. Has to be over 100 µs.
    pub sync_second_delay_us: u32,
}

impl Timing {
    /// 60 µs per command, 2.3 ms for clear and return home.
    pub const CONSERVATIVE: Timing = Timing {
        busy_delay_us: 60,
        extended_delay_us: 2300,
        power_on_delay_ms: 60,
        sync_first_delay_us: 6000,
        sync_second_delay_us: 150,
    };

    /// 40 µs per command, 1.6 ms for clear and return home.
    pub const FAST: Timing = Timing {
        busy_delay_us: 40,
        extended_delay_us: 1600,
        ..Timing::CONSERVATIVE
    };
}

impl Default for Timing {
    fn default() -> Self {
        Timing::CONSERVATIVE
    }
}
