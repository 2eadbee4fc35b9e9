//! Number formatting for character displays.
//!
//! Both formatters discard the sign and produce plain ASCII, right-aligned by padding with spaces
//! on the left, so a value keeps its last digit in the same column as it changes.

use std::iter::repeat_n;

/// Counts the decimal digits of `magnitude`. Zero has one digit.
pub fn digit_count(mut magnitude: u32) -> u8 {
    let mut digits = 1;
    while magnitude >= 10 {
        magnitude /= 10;
        digits += 1;
    }
    digits
}

/// Formats the magnitude of `value` in base 10.
///
/// If `left_offset` is larger than the digit count, the difference is prepended as spaces, so
/// the number ends `left_offset` columns from where it started.
pub fn integer(value: i32, left_offset: u8) -> Vec<u8> {
    let magnitude = value.unsigned_abs();
    let digits = digit_count(magnitude);
    let padding = left_offset.saturating_sub(digits) as usize;

    let mut out = Vec::with_capacity(padding + digits as usize);
    out.extend(repeat_n(b' ', padding));
    for position in (0..digits as u32).rev() {
        let digit = magnitude / 10u32.pow(position) % 10;
        out.push(b'0' + digit as u8);
    }
    out
}

/// Formats the magnitude of `value` with exactly `fraction_digits` digits after the point.
///
/// `left_offset` covers the whole number, including the point and the fraction digits. The
/// integer part is formatted with [integer], using whatever is left of the offset.
///
/// The fraction digits are truncated, not rounded. They're produced by repeatedly multiplying the
/// fractional part by 10, so past the precision of `f32` (about 7 significant digits) they're
/// meaningless.
pub fn float(value: f32, left_offset: u8, fraction_digits: u8) -> Vec<u8> {
    // One column for the point
    let left_offset = if left_offset as u16 >= fraction_digits as u16 + 1 {
        left_offset - fraction_digits - 1
    } else {
        0
    };

    let magnitude = value.abs();
    let mut fractional = magnitude.fract();

    let mut out = integer(magnitude.trunc() as i32, left_offset);
    out.push(b'.');
    for _ in 0..fraction_digits {
        fractional *= 10.0;
        out.push(b'0' + (fractional as i32 % 10) as u8);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integer_str(value: i32, left_offset: u8) -> String {
        String::from_utf8(integer(value, left_offset)).unwrap()
    }

    fn float_str(value: f32, left_offset: u8, fraction_digits: u8) -> String {
        String::from_utf8(float(value, left_offset, fraction_digits)).unwrap()
    }

    #[test]
    fn counts_digits() {
        assert_eq!(digit_count(0), 1);
        assert_eq!(digit_count(9), 1);
        assert_eq!(digit_count(10), 2);
        assert_eq!(digit_count(99_999), 5);
        assert_eq!(digit_count(u32::MAX), 10);
    }

    #[test]
    fn integer_is_right_aligned() {
        assert_eq!(integer_str(-42, 5), "   42");
        assert_eq!(integer_str(100, 4), " 100");
        assert_eq!(integer_str(7, 1), "7");
    }

    #[test]
    fn integer_without_room_for_padding() {
        assert_eq!(integer_str(0, 0), "0");
        assert_eq!(integer_str(12345, 3), "12345");
    }

    #[test]
    fn integer_discards_sign() {
        assert_eq!(integer_str(-7, 0), "7");
        assert_eq!(integer_str(i32::MIN, 0), "2147483648");
        assert_eq!(integer_str(i32::MAX, 12), "  2147483647");
    }

    #[test]
    fn float_reserves_columns_for_point_and_fraction() {
        assert_eq!(float_str(3.14, 6, 2), "  3.14");
        assert_eq!(float_str(-7.5, 5, 1), "  7.5");
        assert_eq!(float_str(12.75, 0, 3), "12.750");
    }

    #[test]
    fn float_offset_below_fraction_width_collapses() {
        assert_eq!(float_str(5.0, 1, 3), "5.000");
        assert_eq!(float_str(5.0, 4, 3), "5.000");
        assert_eq!(float_str(5.0, 5, 3), "5.000");
        assert_eq!(float_str(5.0, 6, 3), " 5.000");

        // fraction_digits + 1 doesn't fit in a u8
        let max = float(1.0, 255, 255);
        assert_eq!(&max[..2], b"1.");
        assert_eq!(max.len(), 2 + 255);
    }

    #[test]
    fn float_truncates_fraction() {
        assert_eq!(float_str(0.875, 0, 2), "0.87");
        assert_eq!(float_str(2.5, 0, 0), "2.");
    }
}
