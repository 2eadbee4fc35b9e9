//! Character LCD driving over plain GPIO lines.
//!
//! The lines come from a [GpioDriver] backend: [gpiod::GpiodDriver] for real hardware, or
//! [trace::TraceGpioDriver] to record the bus activity instead. A pin or a bus of pins is claimed
//! from the backend first, and only then turned into an output, which is what the
//! [lcd::hd44780] driver borrows.

pub mod delay;
pub mod gpiod;
pub mod lcd;
pub mod trace;

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("pin already claimed")]
    AlreadyInUse,
    #[error("argument out of range")]
    InvalidArgument,
    #[error("GPIO I/O error: {0}")]
    Io(std::io::ErrorKind),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

pub trait GpioDriver: Debug {
    /// Number of lines the backend has.
    fn count(&self) -> GpioResult<usize>;

    /// Claims a single line. It stays claimed until the returned pin is dropped.
    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>>;

    /// Claims `N` lines at once, in the given order. Either all of them are claimed or none.
    fn get_pin_bus<const N: usize>(
        &self,
        indices: [usize; N],
    ) -> GpioResult<Box<dyn GpioBus<N> + '_>>;
}

pub trait GpioPin: Debug {
    /// Configures the line as an output.
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>>;
}

pub trait GpioOutput: Debug {
    /// Drives the line high (`true`) or low (`false`).
    fn write(&self, value: bool) -> GpioResult<()>;
}

pub trait GpioBus<const N: usize>: Debug {
    /// Configures every line of the bus as an output.
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>>;
}

pub trait GpioBusOutput<const N: usize>: Debug {
    /// Drives every line of the bus, `values[i]` going to the `i`-th line.
    fn write(&self, values: &[bool; N]) -> GpioResult<()>;
}

impl dyn GpioBusOutput<4> + '_ {
    /// Drives the 4 lines with the bits of `value`, bit 0 going to the first line.
    ///
    /// Returns [GpioError::InvalidArgument] if `value` doesn't fit in 4 bits.
    pub fn write_nibble(&self, value: u8) -> GpioResult<()> {
        if value > 0x0F {
            return Err(GpioError::InvalidArgument);
        }

        self.write(&std::array::from_fn(|bit| value >> bit & 1 != 0))
    }
}
