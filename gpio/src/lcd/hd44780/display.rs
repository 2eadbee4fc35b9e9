use crate::lcd::hd44780::driver::{CursorDirection, HD44780Driver};
use crate::lcd::hd44780::format;
use crate::{GpioError, GpioResult};
use log::warn;

/// Gets the DDRAM address of the given 1-based position, or `None` if the row doesn't exist.
///
/// 4-line modules are a 2-line controller with each line split in half, so row 3 continues row 1
/// and row 4 continues row 2, 20 columns further. Columns aren't checked and the result wraps,
/// which means `(1, 21)` is the same address as `(3, 1)`.
///
/// The returned value already has the DDRAM command bit set.
pub fn ddram_address(row: u8, column: u8) -> Option<u8> {
    let base: u8 = match row {
        1 => 0x80 - 1,
        2 => 0xC0 - 1,
        3 => 0x80 + 19,
        4 => 0xC0 + 19,
        _ => return None,
    };
    Some(base.wrapping_add(column))
}

fn to_lcd_byte(c: char) -> u8 {
    if c.is_ascii() {
        c as u8
    } else {
        warn!("Non-ASCII character: {}", c);
        b'?'
    }
}

/// Text output and configuration on top of an [HD44780Driver], for 2x16 up to 4x20 modules.
///
/// Rows and columns are 1-based.
pub trait CharacterDisplay {
    /// Moves the cursor to the given position.
    ///
    /// Returns [GpioError::InvalidArgument] if `row` isn't between 1 and 4. `column` is not
    /// checked; see [ddram_address].
    fn set_cursor(&mut self, row: u8, column: u8) -> GpioResult<()>;
    /// Moves the cursor one position to the right.
    fn cursor_increment(&mut self) -> GpioResult<()>;
    /// Moves the cursor one position to the left.
    fn cursor_decrement(&mut self) -> GpioResult<()>;

    /// Shows or hides the characters. The contents are kept and can still be written to.
    fn set_display_on(&mut self, on: bool) -> GpioResult<()>;
    /// Shows or hides the underline at the cursor position.
    fn set_cursor_underline(&mut self, on: bool) -> GpioResult<()>;
    /// Turns blinking of the character at the cursor position on or off.
    fn set_cursor_blink(&mut self, on: bool) -> GpioResult<()>;

    /// Clears the whole screen and moves the cursor to `(1, 1)`.
    fn clear(&mut self) -> GpioResult<()>;
    /// Undoes the screen shift and moves the cursor to `(1, 1)`.
    fn reset_shift(&mut self) -> GpioResult<()>;
    /// Shifts the whole screen left by one, cursor included.
    ///
    /// Characters shifted off screen show up on a different line.
    fn shift_left(&mut self) -> GpioResult<()>;
    /// Shifts the whole screen right by one, cursor included.
    fn shift_right(&mut self) -> GpioResult<()>;

    /// Whether the cursor moves right (`true`) or left (`false`) after every write.
    fn set_entry_increment(&mut self, increment: bool) -> GpioResult<()>;
    /// Whether the screen shifts after every write, in the opposite direction of the cursor.
    fn set_entry_shift(&mut self, shift: bool) -> GpioResult<()>;

    /// Uploads a 5x8 custom character into one of the 8 CGRAM slots, and moves the cursor to
    /// `(1, 1)`.
    ///
    /// Each pattern byte is one row, top to bottom, with the pixels in bits 4–0. The character
    /// can then be written with [CharacterDisplay::write_byte] using the slot number.
    ///
    /// Returns [GpioError::InvalidArgument] if `slot` is over 7.
    fn add_character(&mut self, pattern: &[u8; 8], slot: u8) -> GpioResult<()>;

    /// Writes the string at the cursor position. Non-ASCII characters are written as `?`.
    fn write_string(&mut self, s: &str) -> GpioResult<()>;
    /// Writes the character at the cursor position. Non-ASCII characters are written as `?`.
    fn write_char(&mut self, c: char) -> GpioResult<()>;
    /// Writes the raw character code at the cursor position.
    fn write_byte(&mut self, b: u8) -> GpioResult<()>;
    /// Writes the integer at the cursor position, ignoring the sign. See [format::integer].
    fn write_integer(&mut self, value: i32, left_offset: u8) -> GpioResult<()>;
    /// Writes the float at the cursor position, ignoring the sign. See [format::float].
    fn write_float(&mut self, value: f32, left_offset: u8, fraction_digits: u8) -> GpioResult<()>;
}

impl<T: ?Sized + HD44780Driver> CharacterDisplay for T {
    fn set_cursor(&mut self, row: u8, column: u8) -> GpioResult<()> {
        let address = ddram_address(row, column).ok_or(GpioError::InvalidArgument)?;
        self.set_ddram_address(address & 0b01111111)
    }

    fn cursor_increment(&mut self) -> GpioResult<()> {
        self.cursor_shift(false, CursorDirection::Right)
    }

    fn cursor_decrement(&mut self) -> GpioResult<()> {
        self.cursor_shift(false, CursorDirection::Left)
    }

    fn set_display_on(&mut self, on: bool) -> GpioResult<()> {
        let control = self.display_control().with_display_on(on);
        self.set_display_control(control)
    }

    fn set_cursor_underline(&mut self, on: bool) -> GpioResult<()> {
        let control = self.display_control().with_cursor_on(on);
        self.set_display_control(control)
    }

    fn set_cursor_blink(&mut self, on: bool) -> GpioResult<()> {
        let control = self.display_control().with_blink_on(on);
        self.set_display_control(control)
    }

    fn clear(&mut self) -> GpioResult<()> {
        self.clear_display()
    }

    fn reset_shift(&mut self) -> GpioResult<()> {
        self.return_home()
    }

    fn shift_left(&mut self) -> GpioResult<()> {
        self.cursor_shift(true, CursorDirection::Left)
    }

    fn shift_right(&mut self) -> GpioResult<()> {
        self.cursor_shift(true, CursorDirection::Right)
    }

    fn set_entry_increment(&mut self, increment: bool) -> GpioResult<()> {
        let direction = if increment {
            CursorDirection::Right
        } else {
            CursorDirection::Left
        };
        let mode = self.entry_mode().with_cursor_direction(direction);
        self.set_entry_mode(mode)
    }

    fn set_entry_shift(&mut self, shift: bool) -> GpioResult<()> {
        let mode = self.entry_mode().with_shift(shift);
        self.set_entry_mode(mode)
    }

    fn add_character(&mut self, pattern: &[u8; 8], slot: u8) -> GpioResult<()> {
        if slot > 7 {
            return Err(GpioError::InvalidArgument);
        }
        self.set_cgram_address(slot << 3)?;
        for &row in pattern {
            self.send_data(row)?;
        }
        // CGRAM and DDRAM share the address counter, point it back to DDRAM
        self.set_cursor(1, 1)
    }

    fn write_string(&mut self, s: &str) -> GpioResult<()> {
        for c in s.chars() {
            self.send_data(to_lcd_byte(c))?;
        }
        Ok(())
    }

    fn write_char(&mut self, c: char) -> GpioResult<()> {
        self.send_data(to_lcd_byte(c))
    }

    fn write_byte(&mut self, b: u8) -> GpioResult<()> {
        self.send_data(b)
    }

    fn write_integer(&mut self, value: i32, left_offset: u8) -> GpioResult<()> {
        for b in format::integer(value, left_offset) {
            self.send_data(b)?;
        }
        Ok(())
    }

    fn write_float(&mut self, value: f32, left_offset: u8, fraction_digits: u8) -> GpioResult<()> {
        for b in format::float(value, left_offset, fraction_digits) {
            self.send_data(b)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GpioDriver;
    use crate::lcd::hd44780::driver::{
        DisplayControl, GpioHD44780Driver, TransferMode, TransferMode::Command,
        TransferMode::Data,
    };
    use crate::trace::{TraceGpioDriver, decode_transfers};

    const PIN_E: usize = 0;
    const PIN_RS: usize = 1;
    const PINS_DATA: [usize; 4] = [2, 3, 4, 5];

    /// Initializes a display on the trace backend, runs `f`, and returns everything `f` sent.
    fn transfers(
        f: impl FnOnce(&mut GpioHD44780Driver<'_>) -> GpioResult<()>,
    ) -> Vec<(TransferMode, u8)> {
        let gpio = TraceGpioDriver::new(6);
        let mut e_pin = gpio.get_pin(PIN_E).unwrap();
        let e_out = e_pin.as_output().unwrap();
        let mut rs_pin = gpio.get_pin(PIN_RS).unwrap();
        let rs_out = rs_pin.as_output().unwrap();
        let mut data_bus = gpio.get_pin_bus(PINS_DATA).unwrap();
        let data_out = data_bus.as_output().unwrap();
        let mut delay = gpio.delay();

        let mut lcd = GpioHD44780Driver::new_4bit(&*e_out, &*rs_out, &*data_out, &mut delay);
        lcd.init().unwrap();
        gpio.clear_events();

        f(&mut lcd).unwrap();

        let samples = gpio
            .sample_on_falling_edge(PIN_E, &[2, 3, 4, 5, PIN_RS])
            .unwrap();
        decode_transfers(&samples)
    }

    fn data(s: &str) -> Vec<(TransferMode, u8)> {
        s.bytes().map(|b| (Data, b)).collect()
    }

    #[test]
    fn row_base_addresses() {
        assert_eq!(ddram_address(1, 1), Some(0x80));
        assert_eq!(ddram_address(2, 1), Some(0xC0));
        assert_eq!(ddram_address(3, 1), Some(0x94));
        assert_eq!(ddram_address(4, 1), Some(0xD4));
        assert_eq!(ddram_address(4, 20), Some(0xE7));
        assert_eq!(ddram_address(1, 21), ddram_address(3, 1));
        assert_eq!(ddram_address(0, 1), None);
        assert_eq!(ddram_address(5, 1), None);
    }

    #[test]
    fn set_cursor_sends_ddram_address() {
        let sent = transfers(|lcd| {
            lcd.set_cursor(1, 1)?;
            lcd.set_cursor(2, 16)?;
            lcd.set_cursor(3, 1)?;
            lcd.set_cursor(4, 20)
        });
        assert_eq!(
            sent,
            vec![(Command, 0x80), (Command, 0xCF), (Command, 0x94), (Command, 0xE7)]
        );
    }

    #[test]
    fn set_cursor_rejects_unknown_row() {
        let sent = transfers(|lcd| {
            assert_eq!(lcd.set_cursor(5, 1), Err(GpioError::InvalidArgument));
            Ok(())
        });
        assert!(sent.is_empty());
    }

    #[test]
    fn writes_integer_and_float() {
        let sent = transfers(|lcd| {
            lcd.write_integer(-42, 5)?;
            lcd.write_float(3.14, 6, 2)
        });
        assert_eq!(sent, data("   42  3.14"));
    }

    #[test]
    fn writes_strings_as_ascii() {
        let sent = transfers(|lcd| {
            lcd.write_string("Zażółć")?;
            lcd.write_char('!')?;
            lcd.write_byte(0x03)
        });
        let mut expected = data("Za????!");
        expected.push((Data, 0x03));
        assert_eq!(sent, expected);
    }

    #[test]
    fn add_character_returns_to_ddram() {
        let pattern = [
            0b00000, 0b01010, 0b11111, 0b11111, 0b01110, 0b00100, 0b00000, 0b00000,
        ];
        let sent = transfers(|lcd| {
            lcd.add_character(&pattern, 1)?;
            lcd.write_byte(1)
        });

        assert_eq!(sent[0], (Command, 0x48));
        assert_eq!(
            &sent[1..9],
            pattern.map(|row| (Data, row)).as_slice()
        );
        assert_eq!(sent[9], (Command, 0x80));
        assert_eq!(sent[10], (Data, 1));
        assert_eq!(sent.len(), 11);
    }

    #[test]
    fn add_character_rejects_unknown_slot() {
        let sent = transfers(|lcd| {
            assert_eq!(
                lcd.add_character(&[0; 8], 8),
                Err(GpioError::InvalidArgument)
            );
            Ok(())
        });
        assert!(sent.is_empty());
    }

    #[test]
    fn clear_keeps_entry_mode() {
        let sent = transfers(|lcd| {
            lcd.set_entry_increment(false)?;
            lcd.clear()
        });
        assert_eq!(sent, vec![(Command, 0x04), (Command, 0x01), (Command, 0x04)]);
    }

    #[test]
    fn display_toggle_round_trip() {
        let mut before = None;
        let mut after = None;
        let sent = transfers(|lcd| {
            before = Some(lcd.display_control());
            lcd.set_display_on(false)?;
            lcd.set_display_on(true)?;
            after = Some(lcd.display_control());
            Ok(())
        });
        assert_eq!(before, Some(DisplayControl::default()));
        assert_eq!(before, after);
        assert_eq!(sent, vec![(Command, 0x08), (Command, 0x0C)]);
    }

    #[test]
    fn cursor_toggles_accumulate() {
        let sent = transfers(|lcd| {
            lcd.set_cursor_underline(true)?;
            lcd.set_cursor_blink(true)?;
            lcd.set_cursor_underline(false)
        });
        assert_eq!(sent, vec![(Command, 0x0E), (Command, 0x0F), (Command, 0x0D)]);
    }

    #[test]
    fn entry_shift_toggles() {
        let sent = transfers(|lcd| {
            lcd.set_entry_shift(true)?;
            lcd.set_entry_increment(false)?;
            lcd.set_entry_shift(false)
        });
        assert_eq!(sent, vec![(Command, 0x07), (Command, 0x05), (Command, 0x04)]);
    }

    #[test]
    fn stateless_movement_commands() {
        let sent = transfers(|lcd| {
            lcd.shift_left()?;
            lcd.shift_right()?;
            lcd.cursor_increment()?;
            lcd.cursor_decrement()?;
            lcd.reset_shift()
        });
        assert_eq!(
            sent,
            vec![
                (Command, 0x18),
                (Command, 0x1C),
                (Command, 0x14),
                (Command, 0x10),
                (Command, 0x02),
            ]
        );
    }

    #[test]
    fn movement_leaves_shadow_registers_alone() {
        transfers(|lcd| {
            let control = lcd.display_control();
            let mode = lcd.entry_mode();
            lcd.cursor_increment()?;
            lcd.shift_left()?;
            lcd.reset_shift()?;
            assert_eq!(lcd.display_control(), control);
            assert_eq!(lcd.entry_mode(), mode);
            Ok(())
        });
    }
}
