//! HD44780U driver module.
//!
//! See [HD44780Driver] for the command set, and [GpioHD44780Driver] for the implementation using
//! GPIO pins in the 4-bit bus mode.

mod gpio;
mod timing;

use crate::{GpioError, GpioResult};
pub use gpio::*;
use std::fmt::Debug;
pub use timing::*;

/// Clear display command. Also resets the entry mode to increment on the controller side.
pub const CLEAR_DISPLAY: u8 = 0b00000001;
/// Return home command. Sets the cursor to `(1, 1)` and undoes any display shift.
pub const RETURN_HOME: u8 = 0b00000010;

/// The `HD44780Driver` trait defines a low-level, write-only interface for the HD44780U controller.
///
/// The controller configuration can't be read back without an R/W line, so the implementation
/// keeps shadow copies of the display control and entry mode registers. Every method changing
/// one of them has to go through [HD44780Driver::set_display_control] or
/// [HD44780Driver::set_entry_mode], so the shadow values always match what the controller has
/// last been sent.
///
/// # Sources
///
/// - Hitachi, [“HD44780U (LCD-II) Dot Matrix Liquid Crystal Display Controller/Driver,”](https://www.sparkfun.com/datasheets/LCD/HD44780.pdf)
///   Rev. 0.0, 1998.
pub trait HD44780Driver: Debug {
    /// Runs the power-on initialization sequence, and configures the controller with the default
    /// settings. See [GpioHD44780Driver::init] for more information.
    fn init(&mut self) -> GpioResult<()>;

    /// Gets the display control value last sent to the controller.
    fn display_control(&self) -> DisplayControl;

    /// Gets the entry mode value last sent to the controller.
    fn entry_mode(&self) -> EntryMode;

    /// Sends the display control command and remembers it as the current value.
    ///
    /// Command: `00001DCB`.
    /// `D` is `1` for display on, `0` for display off.
    /// `C` is `1` for cursor (underline) on, `0` for cursor off.
    /// `B` is `1` for cursor blinking, `0` for cursor not blinking.
    fn set_display_control(&mut self, control: DisplayControl) -> GpioResult<()>;

    /// Sends the entry mode command and remembers it as the current value.
    ///
    /// Command: `000001IS`.
    /// `I` is `1` for incrementing the address (cursor moves right), `0` for decrementing it.
    /// `S` is `1` for shifting the display on write, `0` for no display shift.
    fn set_entry_mode(&mut self, mode: EntryMode) -> GpioResult<()>;

    /// Clears the display and sets the cursor to the home position.
    ///
    /// The controller silently resets the entry mode to increment while clearing, so the current
    /// entry mode is sent again afterward.
    ///
    /// Command: `00000001`.
    fn clear_display(&mut self) -> GpioResult<()> {
        self.send_command(CLEAR_DISPLAY)?;
        let entry_mode = self.entry_mode();
        self.send_command(entry_mode.to_command())
    }

    /// Sets the cursor to the home position and undoes the display shift.
    ///
    /// Command: `0000001?`.
    fn return_home(&mut self) -> GpioResult<()> {
        self.send_command(RETURN_HOME)
    }

    /// Moves the cursor or shifts the display by one in the specified direction.
    ///
    /// Command: `0001DR??`.
    /// `D` is `1` for display shift, `0` for cursor shift.
    /// `R` is `1` for right shift, `0` for left shift.
    fn cursor_shift(&mut self, display_shift: bool, direction: CursorDirection) -> GpioResult<()> {
        let mut command = 0b00010000;
        if display_shift {
            command |= 0b00001000;
        }
        if direction == CursorDirection::Right {
            command |= 0b00000100;
        }
        self.send_command(command)
    }

    /// Sets the function set.
    ///
    /// Command: `001DNF??`.
    /// `D` is `1` for 8-bit data length, `0` for 4-bit.
    /// `N` is `1` for 2 lines, `0` for 1 line.
    /// `F` is `1` for the 5x10 font, `0` for 5x8.
    fn function_set(&mut self, data_length: bool, two_lines: bool, font: bool) -> GpioResult<()> {
        let mut command = 0b00100000;
        if data_length {
            command |= 0b00010000;
        }
        if two_lines {
            command |= 0b00001000;
        }
        if font {
            command |= 0b00000100;
        }
        self.send_command(command)
    }

    /// Sets the CGRAM address (custom character memory).
    ///
    /// The address is a 6-bit value. If out of bounds, it will return [GpioError::InvalidArgument].
    ///
    /// Command: `01AAAAAA`.
    fn set_cgram_address(&mut self, address: u8) -> GpioResult<()> {
        if address > 0b00111111 {
            return Err(GpioError::InvalidArgument);
        }
        let command = 0b01000000 | address;
        self.send_command(command)
    }

    /// Sets the DDRAM address, which is used to set the cursor position.
    ///
    /// The address is a 7-bit value. If out of bounds, it will return [GpioError::InvalidArgument].
    ///
    /// Command: `1AAAAAAA`.
    fn set_ddram_address(&mut self, address: u8) -> GpioResult<()> {
        if address > 0b01111111 {
            return Err(GpioError::InvalidArgument);
        }
        let command = 0b10000000 | address;
        self.send_command(command)
    }

    // Low-level commands
    // These raw commands are used by the high-level functions above.

    /// Sends a command to the HD44780 controller and waits until it's processed.
    /// Sets the RS pin to 0 (command).
    fn send_command(&mut self, command: u8) -> GpioResult<()>;

    /// Sends data to the HD44780 controller and waits until it's processed.
    /// Sets the RS pin to 1 (data).
    fn send_data(&mut self, data: u8) -> GpioResult<()>;
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CursorDirection {
    /// Moves the cursor to the left after writing data.
    Left,
    /// Moves the cursor to the right after writing data.
    Right,
}

/// Register selected for a single byte transfer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TransferMode {
    /// RS low, the byte is an instruction.
    Command,
    /// RS high, the byte is written to CGRAM or DDRAM.
    Data,
}

impl TransferMode {
    /// Gets the level of the RS pin for this mode.
    pub fn rs(self) -> bool {
        self == TransferMode::Data
    }
}

fn with_flag(bits: u8, flag: u8, on: bool) -> u8 {
    if on { bits | flag } else { bits & !flag }
}

/// Shadow copy of the display control register.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DisplayControl(u8);

impl DisplayControl {
    const COMMAND: u8 = 0b00001000;
    const DISPLAY_ON: u8 = 0b00000100;
    const CURSOR_ON: u8 = 0b00000010;
    const BLINK_ON: u8 = 0b00000001;

    pub const fn new(display_on: bool, cursor_on: bool, blink_on: bool) -> Self {
        let mut bits = Self::COMMAND;
        if display_on {
            bits |= Self::DISPLAY_ON;
        }
        if cursor_on {
            bits |= Self::CURSOR_ON;
        }
        if blink_on {
            bits |= Self::BLINK_ON;
        }
        DisplayControl(bits)
    }

    pub fn display_on(&self) -> bool {
        self.0 & Self::DISPLAY_ON != 0
    }

    pub fn cursor_on(&self) -> bool {
        self.0 & Self::CURSOR_ON != 0
    }

    pub fn blink_on(&self) -> bool {
        self.0 & Self::BLINK_ON != 0
    }

    pub fn with_display_on(self, on: bool) -> Self {
        DisplayControl(with_flag(self.0, Self::DISPLAY_ON, on))
    }

    pub fn with_cursor_on(self, on: bool) -> Self {
        DisplayControl(with_flag(self.0, Self::CURSOR_ON, on))
    }

    pub fn with_blink_on(self, on: bool) -> Self {
        DisplayControl(with_flag(self.0, Self::BLINK_ON, on))
    }

    /// Gets the full command byte.
    pub fn to_command(&self) -> u8 {
        self.0
    }
}

/// Display on, cursor off, blinking off (`0x0C`).
impl Default for DisplayControl {
    fn default() -> Self {
        DisplayControl::new(true, false, false)
    }
}

/// Shadow copy of the entry mode register.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct EntryMode(u8);

impl EntryMode {
    const COMMAND: u8 = 0b00000100;
    const INCREMENT: u8 = 0b00000010;
    const SHIFT: u8 = 0b00000001;

    pub const fn new(cursor_direction: CursorDirection, shift: bool) -> Self {
        let mut bits = Self::COMMAND;
        if let CursorDirection::Right = cursor_direction {
            bits |= Self::INCREMENT;
        }
        if shift {
            bits |= Self::SHIFT;
        }
        EntryMode(bits)
    }

    pub fn cursor_direction(&self) -> CursorDirection {
        if self.0 & Self::INCREMENT != 0 {
            CursorDirection::Right
        } else {
            CursorDirection::Left
        }
    }

    pub fn shift(&self) -> bool {
        self.0 & Self::SHIFT != 0
    }

    pub fn with_cursor_direction(self, cursor_direction: CursorDirection) -> Self {
        EntryMode(with_flag(
            self.0,
            Self::INCREMENT,
            cursor_direction == CursorDirection::Right,
        ))
    }

    pub fn with_shift(self, shift: bool) -> Self {
        EntryMode(with_flag(self.0, Self::SHIFT, shift))
    }

    /// Gets the full command byte.
    pub fn to_command(&self) -> u8 {
        self.0
    }
}

/// Increment, no display shift (`0x06`).
impl Default for EntryMode {
    fn default() -> Self {
        EntryMode::new(CursorDirection::Right, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registers_match_power_on_configuration() {
        assert_eq!(DisplayControl::default().to_command(), 0x0C);
        assert_eq!(EntryMode::default().to_command(), 0x06);
    }

    #[test]
    fn display_control_flags() {
        let control = DisplayControl::default()
            .with_cursor_on(true)
            .with_blink_on(true);
        assert_eq!(control.to_command(), 0x0F);

        let control = control.with_display_on(false);
        assert_eq!(control.to_command(), 0x0B);
        assert!(!control.display_on());
        assert!(control.cursor_on());
        assert!(control.blink_on());
    }

    #[test]
    fn entry_mode_flags() {
        let mode = EntryMode::default().with_shift(true);
        assert_eq!(mode.to_command(), 0x07);

        let mode = mode.with_cursor_direction(CursorDirection::Left);
        assert_eq!(mode.to_command(), 0x05);
        assert_eq!(mode.cursor_direction(), CursorDirection::Left);
        assert!(mode.shift());
    }

    #[test]
    fn transfer_mode_selects_rs_level() {
        assert!(!TransferMode::Command.rs());
        assert!(TransferMode::Data.rs());
    }
}
