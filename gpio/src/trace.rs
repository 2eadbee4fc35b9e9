//! In-memory GPIO backend that records every line transition and delay instead of driving hardware.
//!
//! Every write is logged at the `trace` level and appended to an event log, which can later be
//! inspected directly with [TraceGpioDriver::events], or decoded like a logic analyzer would with
//! [TraceGpioDriver::sample_on_falling_edge]. This makes it possible to run the LCD drivers
//! without a display attached, and to check the exact bus activity they produce.
use crate::delay::Delay;
use crate::lcd::hd44780::driver::TransferMode;
use crate::{GpioBus, GpioBusOutput, GpioDriver, GpioError, GpioOutput, GpioPin, GpioResult};
use bitvec::vec::BitVec;
use log::trace;
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::AtomicU8;

/// A single recorded event.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TraceEvent {
    /// A pin was driven to the given level.
    Level { pin: usize, high: bool },
    /// The driver blocked for the given amount of microseconds.
    Delay { us: u64 },
}

pub struct TraceGpioDriver {
    pin_count: usize,
    used_pins: BitVec<AtomicU8>,
    events: RefCell<Vec<TraceEvent>>,
}

impl TraceGpioDriver {
    /// Creates a new recording driver with `pin_count` pins, all of them initially low.
    pub fn new(pin_count: usize) -> Self {
        Self {
            pin_count,
            used_pins: BitVec::repeat(false, pin_count),
            events: RefCell::new(Vec::new()),
        }
    }

    /// Gets a [Delay] that records into the event log of this driver instead of sleeping.
    pub fn delay(&self) -> TraceDelay<'_> {
        TraceDelay { driver: self }
    }

    /// Gets a copy of all the events recorded so far.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.borrow().clone()
    }

    /// Forgets all the events recorded so far.
    ///
    /// Sampling replays the log from scratch, so lines are assumed low again from this point.
    pub fn clear_events(&self) {
        self.events.borrow_mut().clear();
    }

    /// Sum of all the recorded delays, in microseconds.
    pub fn total_delay_us(&self) -> u64 {
        self.events
            .borrow()
            .iter()
            .map(|event| match event {
                TraceEvent::Delay { us } => *us,
                TraceEvent::Level { .. } => 0,
            })
            .sum()
    }

    /// Replays the event log and samples the given `lines` every time the `clock` pin goes from
    /// high to low.
    ///
    /// Each sample is returned as a bit mask, where bit `i` is the level of `lines[i]`. Returns
    /// [GpioError::InvalidArgument] if `clock` or any of `lines` isn't a pin of this driver.
    pub fn sample_on_falling_edge(&self, clock: usize, lines: &[usize]) -> GpioResult<Vec<u32>> {
        if clock >= self.pin_count || lines.iter().any(|&line| line >= self.pin_count) {
            return Err(GpioError::InvalidArgument);
        }

        let mut levels = vec![false; self.pin_count];
        let mut samples = Vec::new();

        for event in self.events.borrow().iter() {
            let TraceEvent::Level { pin, high } = *event else {
                continue;
            };

            if pin == clock && levels[clock] && !high {
                let sample = lines
                    .iter()
                    .enumerate()
                    .filter(|&(_, &line)| levels[line])
                    .fold(0u32, |acc, (i, _)| acc | 1 << i);
                samples.push(sample);
            }

            levels[pin] = high;
        }

        Ok(samples)
    }

    fn record(&self, event: TraceEvent) {
        trace!("{:?}", event);
        self.events.borrow_mut().push(event);
    }
}

impl Debug for TraceGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "TraceGpioDriver({})", self.pin_count)
    }
}

impl GpioDriver for TraceGpioDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(self.pin_count)
    }

    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>> {
        if index >= self.pin_count {
            return Err(GpioError::InvalidArgument);
        }

        if self.used_pins[index] {
            return Err(GpioError::AlreadyInUse);
        }

        self.used_pins.set_aliased(index, true);

        Ok(Box::new(TracePin {
            driver: self,
            pin_index: index,
        }))
    }

    fn get_pin_bus<const N: usize>(
        &self,
        indices: [usize; N],
    ) -> GpioResult<Box<dyn GpioBus<N> + '_>> {
        if indices.iter().any(|&index| index >= self.pin_count) {
            return Err(GpioError::InvalidArgument);
        }

        if indices.iter().any(|&index| self.used_pins[index]) {
            return Err(GpioError::AlreadyInUse);
        }

        for index in indices {
            self.used_pins.set_aliased(index, true);
        }

        Ok(Box::new(TraceBus {
            driver: self,
            pin_indices: indices,
        }))
    }
}

struct TracePin<'a> {
    driver: &'a TraceGpioDriver,
    pin_index: usize,
}

impl Debug for TracePin<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}]", self.driver, self.pin_index)
    }
}

impl GpioPin for TracePin<'_> {
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>> {
        Ok(Box::new(TraceOutput {
            driver: self.driver,
            pin_index: self.pin_index,
        }))
    }
}

impl Drop for TracePin<'_> {
    fn drop(&mut self) {
        self.driver.used_pins.set_aliased(self.pin_index, false);
    }
}

struct TraceOutput<'a> {
    driver: &'a TraceGpioDriver,
    pin_index: usize,
}

impl Debug for TraceOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}][output]", self.driver, self.pin_index)
    }
}

impl GpioOutput for TraceOutput<'_> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.driver.record(TraceEvent::Level {
            pin: self.pin_index,
            high: value,
        });
        Ok(())
    }
}

struct TraceBus<'a, const N: usize> {
    driver: &'a TraceGpioDriver,
    pin_indices: [usize; N],
}

impl<const N: usize> Debug for TraceBus<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}{:?}", self.driver, self.pin_indices)
    }
}

impl<const N: usize> GpioBus<N> for TraceBus<'_, N> {
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>> {
        Ok(Box::new(TraceBusOutput {
            driver: self.driver,
            pin_indices: self.pin_indices,
        }))
    }
}

impl<const N: usize> Drop for TraceBus<'_, N> {
    fn drop(&mut self) {
        for &index in &self.pin_indices {
            self.driver.used_pins.set_aliased(index, false);
        }
    }
}

struct TraceBusOutput<'a, const N: usize> {
    driver: &'a TraceGpioDriver,
    pin_indices: [usize; N],
}

impl<const N: usize> Debug for TraceBusOutput<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}{:?}[output]", self.driver, self.pin_indices)
    }
}

impl<const N: usize> GpioBusOutput<N> for TraceBusOutput<'_, N> {
    fn write(&self, values: &[bool; N]) -> GpioResult<()> {
        for (&pin, &high) in self.pin_indices.iter().zip(values) {
            self.driver.record(TraceEvent::Level { pin, high });
        }
        Ok(())
    }
}

/// Pairs up HD44780 nibbles sampled on the falling edges of E back into the bytes they were sent
/// as.
///
/// Every sample has D4–D7 in bits 0–3 and RS in bit 4, which is what
/// [TraceGpioDriver::sample_on_falling_edge] returns for the lines `[D4, D5, D6, D7, RS]`. A
/// trailing unpaired nibble is ignored. The four reset nibbles latched during initialization
/// aren't bytes, so they have to be skipped first.
pub fn decode_transfers(samples: &[u32]) -> Vec<(TransferMode, u8)> {
    samples
        .chunks_exact(2)
        .map(|pair| {
            let mode = if pair[0] & 0b10000 != 0 {
                TransferMode::Data
            } else {
                TransferMode::Command
            };
            let byte = ((pair[0] & 0x0F) << 4 | (pair[1] & 0x0F)) as u8;
            (mode, byte)
        })
        .collect()
}

/// [Delay] that records into a [TraceGpioDriver] event log.
pub struct TraceDelay<'a> {
    driver: &'a TraceGpioDriver,
}

impl Debug for TraceDelay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[delay]", self.driver)
    }
}

impl Delay for TraceDelay<'_> {
    fn delay_us(&mut self, us: u32) {
        self.driver.record(TraceEvent::Delay { us: us as u64 });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pins_cannot_be_requested_twice() {
        let gpio = TraceGpioDriver::new(8);
        let _pin = gpio.get_pin(3).unwrap();

        assert_eq!(gpio.get_pin(3).unwrap_err(), GpioError::AlreadyInUse);
        assert_eq!(gpio.get_pin_bus([1, 2, 3]).unwrap_err(), GpioError::AlreadyInUse);
        assert_eq!(gpio.get_pin(8).unwrap_err(), GpioError::InvalidArgument);
    }

    #[test]
    fn dropped_pins_are_released() {
        let gpio = TraceGpioDriver::new(8);
        drop(gpio.get_pin_bus([0, 1, 2, 3]).unwrap());

        assert!(gpio.get_pin(2).is_ok());
    }

    #[test]
    fn nibbles_are_written_lsb_first() {
        let gpio = TraceGpioDriver::new(8);
        let mut bus = gpio.get_pin_bus([4, 5, 6, 7]).unwrap();
        let bus = bus.as_output().unwrap();

        bus.write_nibble(0b0010).unwrap();

        assert_eq!(
            gpio.events(),
            vec![
                TraceEvent::Level { pin: 4, high: false },
                TraceEvent::Level { pin: 5, high: true },
                TraceEvent::Level { pin: 6, high: false },
                TraceEvent::Level { pin: 7, high: false },
            ]
        );
        assert_eq!(bus.write_nibble(0b10000), Err(GpioError::InvalidArgument));
    }

    #[test]
    fn samples_lines_on_falling_edge_only() {
        let gpio = TraceGpioDriver::new(4);
        let mut clock = gpio.get_pin(0).unwrap();
        let clock = clock.as_output().unwrap();
        let mut data = gpio.get_pin(1).unwrap();
        let data = data.as_output().unwrap();

        data.write(true).unwrap();
        clock.write(true).unwrap();
        data.write(false).unwrap();
        clock.write(false).unwrap();
        // Already low, not an edge
        clock.write(false).unwrap();
        data.write(true).unwrap();
        clock.write(true).unwrap();
        clock.write(false).unwrap();

        assert_eq!(gpio.sample_on_falling_edge(0, &[1]), Ok(vec![0, 1]));
    }

    #[test]
    fn sampling_unknown_pins_is_rejected() {
        let gpio = TraceGpioDriver::new(4);

        assert_eq!(
            gpio.sample_on_falling_edge(4, &[1]),
            Err(GpioError::InvalidArgument)
        );
        assert_eq!(
            gpio.sample_on_falling_edge(0, &[1, 9]),
            Err(GpioError::InvalidArgument)
        );
    }

    #[test]
    fn decodes_nibble_pairs_into_bytes() {
        let transfers = decode_transfers(&[0b00010, 0b01000, 0b10100, 0b10001, 0b0010]);
        assert_eq!(
            transfers,
            vec![(TransferMode::Command, 0x28), (TransferMode::Data, b'A')]
        );
    }

    #[test]
    fn delays_are_recorded() {
        let gpio = TraceGpioDriver::new(1);
        let mut delay = gpio.delay();

        delay.delay_us(150);
        delay.delay_ms(6);

        assert_eq!(
            gpio.events(),
            vec![TraceEvent::Delay { us: 150 }, TraceEvent::Delay { us: 6000 }]
        );
        assert_eq!(gpio.total_delay_us(), 6150);
    }
}
