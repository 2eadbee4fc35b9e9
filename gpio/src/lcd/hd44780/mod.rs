//! HD44780U LCD module.
//!
//! [driver] contains the low-level command set and its 4-bit GPIO implementation, [display] the
//! higher-level text and numeric output built on top of any [driver::HD44780Driver], and [format]
//! the number formatting used by it.

pub mod display;
pub mod driver;
pub mod format;

pub use display::CharacterDisplay;
