//! Output-only backend for the Linux GPIO character device (`/dev/gpiochipN`), using the gpiod
//! library.
//!
//! Any board exposing its lines through the kernel works, a Raspberry Pi included. Lines are
//! requested from the kernel only when [GpioPin::as_output] or [GpioBus::as_output] is called, and
//! are released together with the returned output.
use crate::{GpioBus, GpioBusOutput, GpioDriver, GpioError, GpioOutput, GpioPin, GpioResult};
use bitvec::vec::BitVec;
use gpiod::{Chip, Lines, Options, Output};
use log::debug;
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::sync::atomic::AtomicU8;

/// Name the lines are requested under, visible in `gpioinfo`.
const CONSUMER: &str = env!("CARGO_PKG_NAME");

pub struct GpiodDriver {
    chip: Chip,
    used_pins: BitVec<AtomicU8>,
}

impl GpiodDriver {
    pub fn new(chip: Chip) -> Self {
        let line_count = chip.num_lines() as usize;
        Self {
            chip,
            used_pins: BitVec::repeat(false, line_count),
        }
    }

    /// Opens the GPIO chip at the given path, e.g. `/dev/gpiochip0`.
    pub fn open(path: impl AsRef<Path>) -> GpioResult<Self> {
        let chip = Chip::new(path.as_ref())?;
        Ok(Self::new(chip))
    }

    /// Marks all of `indices` as used, or none of them if any is out of range or already taken.
    fn claim(&self, indices: &[usize]) -> GpioResult<()> {
        if indices.iter().any(|&index| index >= self.used_pins.len()) {
            return Err(GpioError::InvalidArgument);
        }
        if indices.iter().any(|&index| self.used_pins[index]) {
            return Err(GpioError::AlreadyInUse);
        }

        for &index in indices {
            self.used_pins.set_aliased(index, true);
        }
        Ok(())
    }

    fn release(&self, indices: &[usize]) {
        for &index in indices {
            self.used_pins.set_aliased(index, false);
        }
    }

    fn request_outputs(&self, indices: &[usize]) -> GpioResult<Lines<Output>> {
        let offsets: Vec<u32> = indices.iter().map(|&index| index as u32).collect();
        debug!("Requesting lines {:?} of {:?} as outputs", offsets, self);

        let lines = self
            .chip
            .request_lines(Options::output(offsets).consumer(CONSUMER))?;
        Ok(lines)
    }
}

impl Debug for GpiodDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpiodDriver({})", self.chip.name())
    }
}

impl GpioDriver for GpiodDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(self.chip.num_lines() as usize)
    }

    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>> {
        self.claim(&[index])?;

        Ok(Box::new(GpiodLines {
            driver: self,
            indices: [index],
        }))
    }

    fn get_pin_bus<const N: usize>(
        &self,
        indices: [usize; N],
    ) -> GpioResult<Box<dyn GpioBus<N> + '_>> {
        self.claim(&indices)?;

        Ok(Box::new(GpiodLines {
            driver: self,
            indices,
        }))
    }
}

/// One or more claimed lines, not yet requested from the kernel. A single pin is a bus of one.
struct GpiodLines<'a, const N: usize> {
    driver: &'a GpiodDriver,
    indices: [usize; N],
}

impl<const N: usize> Debug for GpiodLines<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}{:?}", self.driver, self.indices)
    }
}

impl GpioPin for GpiodLines<'_, 1> {
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>> {
        let lines = self.driver.request_outputs(&self.indices)?;
        Ok(Box::new(GpiodOutput {
            claimed: self,
            lines,
        }))
    }
}

impl<const N: usize> GpioBus<N> for GpiodLines<'_, N> {
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>> {
        let lines = self.driver.request_outputs(&self.indices)?;
        Ok(Box::new(GpiodOutput {
            claimed: self,
            lines,
        }))
    }
}

impl<const N: usize> Drop for GpiodLines<'_, N> {
    fn drop(&mut self) {
        self.driver.release(&self.indices);
    }
}

struct GpiodOutput<'a, const N: usize> {
    claimed: &'a GpiodLines<'a, N>,
    lines: Lines<Output>,
}

impl<const N: usize> Debug for GpiodOutput<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[output]", self.claimed)
    }
}

impl GpioOutput for GpiodOutput<'_, 1> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.lines.set_values([value])?;
        Ok(())
    }
}

impl<const N: usize> GpioBusOutput<N> for GpiodOutput<'_, N> {
    fn write(&self, values: &[bool; N]) -> GpioResult<()> {
        self.lines.set_values(*values)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_missing_chip_is_io_error() {
        let result = GpiodDriver::open("/dev/charlcd-no-such-gpiochip");
        assert!(matches!(result, Err(GpioError::Io(_))));
    }
}
