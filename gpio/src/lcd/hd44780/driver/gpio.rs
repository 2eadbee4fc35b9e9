use crate::delay::Delay;
use crate::lcd::hd44780::driver::{
    CLEAR_DISPLAY, DisplayControl, EntryMode, HD44780Driver, RETURN_HOME, Timing, TransferMode,
};
use crate::{GpioBusOutput, GpioOutput, GpioResult};
use log::{debug, trace};

/// Initialization progress of a [GpioHD44780Driver].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InitState {
    /// Nothing has been sent yet.
    Uninitialized,
    /// Lines are driven low and the controller is being forced through the 8-bit reset sequence.
    ResetSequencing,
    /// The controller is in 4-bit mode and is being sent the function set.
    FunctionSet,
    /// Fully configured, every command can be used.
    Ready,
}

/// HD44780U controller driven through GPIO pins, with a 4-bit data bus.
///
/// The R/W line isn't used and has to be tied to GND, so the driver is write-only and waits fixed
/// durations from [Timing] instead of polling the busy flag. E is held high for
/// [Timing::busy_delay_us] on every pulse, which gives every regular command enough time to
/// execute before the next one is latched.
#[derive(Debug)]
pub struct GpioHD44780Driver<'a> {
    pin_e: &'a dyn GpioOutput,
    pin_rs: &'a dyn GpioOutput,
    data_bus: &'a dyn GpioBusOutput<4>,
    delay: &'a mut dyn Delay,
    timing: Timing,

    state: InitState,
    display_control: DisplayControl,
    entry_mode: EntryMode,
}

impl<'a> GpioHD44780Driver<'a> {
    /// Creates a new GpioHD44780Driver instance using 4-bit data bus and [Timing::CONSERVATIVE].
    ///
    /// # Parameters
    ///
    /// - `pin_e`: Enable output pin.
    /// - `pin_rs`: Register select output pin.
    /// - `data_bus`: D4–D7 output pins, in this order.
    /// - `delay`: The delay provider used for all the waits.
    pub fn new_4bit(
        pin_e: &'a dyn GpioOutput,
        pin_rs: &'a dyn GpioOutput,
        data_bus: &'a dyn GpioBusOutput<4>,
        delay: &'a mut dyn Delay,
    ) -> Self {
        GpioHD44780Driver {
            pin_e,
            pin_rs,
            data_bus,
            delay,
            timing: Timing::default(),
            state: InitState::Uninitialized,
            display_control: DisplayControl::default(),
            entry_mode: EntryMode::default(),
        }
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn state(&self) -> InitState {
        self.state
    }

    fn enter_state(&mut self, state: InitState) {
        debug!("HD44780 {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn pulse_e(&mut self) -> GpioResult<()> {
        // Set E pin to high
        self.pin_e.write(true)?;
        self.delay.delay_us(self.timing.busy_delay_us);
        // Set E pin to low, latching the nibble
        self.pin_e.write(false)?;
        Ok(())
    }

    fn send(&mut self, data: u8, mode: TransferMode) -> GpioResult<()> {
        trace!("Sending data: {:08b}, mode: {:?}", data, mode);

        // Set RS pin
        self.pin_rs.write(mode.rs())?;

        let high_nibble = (data >> 4) & 0x0F;
        let low_nibble = data & 0x0F;

        trace!("Writing HN: {:04b}", high_nibble);
        self.data_bus.write_nibble(high_nibble)?;
        self.pulse_e()?;

        trace!("Writing LN: {:04b}", low_nibble);
        self.data_bus.write_nibble(low_nibble)?;
        self.pulse_e()
    }
}

impl HD44780Driver for GpioHD44780Driver<'_> {
    /// Initializes the HD44780U controller with the "initializing by instruction" sequence from
    /// the datasheet, which works no matter what state the controller was left in.
    ///
    /// All the lines are driven low first, and the controller gets [Timing::power_on_delay_ms]
    /// to finish its own power-on reset. Then `0011` is latched three times, with decreasing
    /// waits in between, to put the controller into 8-bit mode. `0010` then switches it into
    /// 4-bit mode, and every following byte is sent as two nibbles.
    ///
    /// After that, the function set (4-bit, 2 lines, 5x8 font) is sent, followed by the default
    /// display control (display on, cursor off, blinking off) and entry mode (increment, no
    /// shift), and the display is cleared.
    fn init(&mut self) -> GpioResult<()> {
        self.enter_state(InitState::ResetSequencing);

        self.display_control = DisplayControl::default();
        self.entry_mode = EntryMode::default();

        self.pin_rs.write(false)?;
        self.pin_e.write(false)?;
        self.data_bus.write_nibble(0b0000)?;
        self.delay.delay_ms(self.timing.power_on_delay_ms);

        // Synchronize
        self.data_bus.write_nibble(0b0011)?;
        self.pulse_e()?;
        self.delay.delay_us(self.timing.sync_first_delay_us);
        self.pulse_e()?;
        self.delay.delay_us(self.timing.sync_second_delay_us);
        self.pulse_e()?;
        // 4-bit mode from now on
        self.data_bus.write_nibble(0b0010)?;
        self.pulse_e()?;

        self.enter_state(InitState::FunctionSet);
        self.function_set(false, true, false)?;

        self.enter_state(InitState::Ready);
        self.set_display_control(self.display_control)?;
        self.set_entry_mode(self.entry_mode)?;
        self.clear_display()?;

        Ok(())
    }

    fn display_control(&self) -> DisplayControl {
        self.display_control
    }

    fn entry_mode(&self) -> EntryMode {
        self.entry_mode
    }

    fn set_display_control(&mut self, control: DisplayControl) -> GpioResult<()> {
        self.display_control = control;
        self.send_command(control.to_command())
    }

    fn set_entry_mode(&mut self, mode: EntryMode) -> GpioResult<()> {
        self.entry_mode = mode;
        self.send_command(mode.to_command())
    }

    /// Sends the command with RS set to 0.
    ///
    /// Clear display and return home rewrite the whole DDRAM, so those get the rest of
    /// [Timing::extended_delay_us] on top of the regular wait.
    fn send_command(&mut self, command: u8) -> GpioResult<()> {
        self.send(command, TransferMode::Command)?;

        if command == CLEAR_DISPLAY || command == RETURN_HOME {
            let remaining = self
                .timing
                .extended_delay_us
                .saturating_sub(self.timing.busy_delay_us);
            self.delay.delay_us(remaining);
        }

        Ok(())
    }

    /// Sends the data with RS set to 1.
    fn send_data(&mut self, data: u8) -> GpioResult<()> {
        self.send(data, TransferMode::Data)
    }
}
