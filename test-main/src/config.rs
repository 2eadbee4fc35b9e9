use charlcd_gpio::lcd::hd44780::driver::Timing;
use dotenv::var;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::num::ParseIntError;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid pin number: {0}")]
    InvalidPin(#[from] ParseIntError),
    #[error("invalid number of data pins")]
    DataPinCount,
    #[error("pin {0} is assigned more than once")]
    DuplicatePin(usize),
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Linux GPIO character device.
    Gpiod,
    /// No hardware, bus activity is recorded and dumped to the log.
    Trace,
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone)]
pub struct PinConfig {
    pub e: usize,
    pub rs: usize,
    /// D4, D5, D6, D7
    pub data: [usize; 4],
}

impl PinConfig {
    fn all(&self) -> impl Iterator<Item = usize> + '_ {
        [self.e, self.rs].into_iter().chain(self.data)
    }

    /// Highest pin number in use.
    pub fn max(&self) -> usize {
        self.all().max().unwrap_or_default()
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimingPreset {
    #[default]
    Conservative,
    Fast,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct TimingConfig {
    pub preset: TimingPreset,
    pub busy_delay_us: Option<u32>,
    pub extended_delay_us: Option<u32>,
}

impl TimingConfig {
    pub fn to_timing(&self) -> Timing {
        let preset = match self.preset {
            TimingPreset::Conservative => Timing::CONSERVATIVE,
            TimingPreset::Fast => Timing::FAST,
        };
        Timing {
            busy_delay_us: self.busy_delay_us.unwrap_or(preset.busy_delay_us),
            extended_delay_us: self.extended_delay_us.unwrap_or(preset.extended_delay_us),
            ..preset
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct Config {
    pub backend: Backend,
    pub chip: String,
    pub pins: PinConfig,
    pub timing: TimingConfig,
    /// How many times the status screen is redrawn. Forever if not set, except for the trace
    /// backend, which draws it once.
    pub frames: Option<u32>,
}

impl Config {
    /// Path of the config file, `$CONFIG_FILE` or `config.json`.
    pub fn path() -> PathBuf {
        var("CONFIG_FILE")
            .unwrap_or_else(|_| "config.json".to_string())
            .into()
    }

    /// Loads the config file. `Ok(None)` means there is no file yet; a file that exists but
    /// can't be read or parsed is an error.
    pub fn try_load() -> Result<Option<Self>, ConfigError> {
        Self::load_from(&Self::path())
    }

    fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let reader = BufReader::new(File::open(path)?);
        Ok(Some(serde_json::from_reader(reader)?))
    }

    pub fn save(&self) -> std::io::Result<()> {
        self.save_to(&Self::path())
    }

    fn save_to(&self, path: &Path) -> std::io::Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Overrides the pins with `CHARLCD_PIN_E`, `CHARLCD_PIN_RS` and `CHARLCD_PINS_DATA`, if set.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(pin) = var("CHARLCD_PIN_E") {
            self.pins.e = pin.trim().parse()?;
        }
        if let Ok(pin) = var("CHARLCD_PIN_RS") {
            self.pins.rs = pin.trim().parse()?;
        }
        if let Ok(pins) = var("CHARLCD_PINS_DATA") {
            self.pins.data = parse_pin_bus(&pins)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = Vec::new();
        for pin in self.pins.all() {
            if seen.contains(&pin) {
                return Err(ConfigError::DuplicatePin(pin));
            }
            seen.push(pin);
        }
        Ok(())
    }

    /// Number of frames to draw, `None` meaning forever.
    pub fn frame_limit(&self) -> Option<u32> {
        match self.backend {
            Backend::Gpiod => self.frames,
            Backend::Trace => Some(self.frames.unwrap_or(1)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend: Backend::Gpiod,
            chip: "/dev/gpiochip0".to_string(),
            pins: PinConfig {
                e: 17,
                rs: 22,
                data: [26, 16, 20, 21],
            },
            timing: TimingConfig::default(),
            frames: None,
        }
    }
}

fn parse_pin_bus(pin_str: &str) -> Result<[usize; 4], ConfigError> {
    pin_str
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse())
        .collect::<Result<Vec<_>, _>>()?
        .try_into()
        .map_err(|_| ConfigError::DataPinCount)
}
