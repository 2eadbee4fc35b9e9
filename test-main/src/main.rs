mod config;

use crate::config::{Backend, Config};
use charlcd_gpio::GpioDriver;
use charlcd_gpio::delay::{Delay, ThreadSleep};
use charlcd_gpio::gpiod::GpiodDriver;
use charlcd_gpio::lcd::hd44780::CharacterDisplay;
use charlcd_gpio::lcd::hd44780::driver::{GpioHD44780Driver, HD44780Driver, TransferMode};
use charlcd_gpio::trace::{TraceGpioDriver, decode_transfers};
use dotenv::dotenv;
use log::{debug, info};
use std::thread::sleep;
use std::time::Duration;
use sysinfo::System;
use time::OffsetDateTime;

const TITLE: &str = concat!("charlcd v", env!("CARGO_PKG_VERSION"));

/// A small bell, uploaded into CGRAM slot 0.
const BELL: [u8; 8] = [
    0b00100, 0b01110, 0b01110, 0b01110, 0b11111, 0b00000, 0b00100, 0b00000,
];

fn main() -> eyre::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();

    const UNKNOWN_STR: &str = "???";

    info!(
        "Hello, {}!",
        System::name().as_deref().unwrap_or(UNKNOWN_STR)
    );
    info!(
        "System ver {} kernel ver {}",
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
    );
    info!(
        "Hostname {}",
        System::host_name().as_deref().unwrap_or(UNKNOWN_STR)
    );
    info!("Architecture {}", System::cpu_arch());

    debug!("Trying to load config...");
    let mut config = match Config::try_load()? {
        Some(config) => {
            info!("Config loaded.");
            config
        }
        None => {
            info!("Config not found. Using default");
            let config = Config::default();
            config.save()?;
            info!("Default config saved to {}.", Config::path().display());
            config
        }
    };
    config.apply_env()?;
    config.validate()?;

    info!(
        "LCD @ E: {}, RS: {}, Data: {:?}, backend: {:?}",
        config.pins.e, config.pins.rs, config.pins.data, config.backend
    );

    match config.backend {
        Backend::Gpiod => {
            debug!("Initializing GPIO driver...");
            let gpio = GpiodDriver::open(&config.chip)?;
            debug!("{:?} initialized.", gpio);

            run(&gpio, &mut ThreadSleep, &config)?;
        }
        Backend::Trace => {
            let gpio = TraceGpioDriver::new(config.pins.max() + 1);
            debug!("{:?} initialized.", gpio);

            run(&gpio, &mut gpio.delay(), &config)?;
            dump_transfers(&gpio, &config)?;
        }
    }

    Ok(())
}

fn run<G: GpioDriver, D: Delay>(gpio: &G, delay: &mut D, config: &Config) -> eyre::Result<()> {
    debug!("Initializing LCD driver...");
    let mut lcd_e_pin = gpio.get_pin(config.pins.e)?;
    let lcd_e_out = lcd_e_pin.as_output()?;
    let mut lcd_rs_pin = gpio.get_pin(config.pins.rs)?;
    let lcd_rs_out = lcd_rs_pin.as_output()?;
    let mut lcd_data_bus = gpio.get_pin_bus(config.pins.data)?;
    let lcd_data_out = lcd_data_bus.as_output()?;

    let mut lcd = GpioHD44780Driver::new_4bit(&*lcd_e_out, &*lcd_rs_out, &*lcd_data_out, delay)
        .with_timing(config.timing.to_timing());

    lcd.init()?;
    lcd.add_character(&BELL, 0)?;

    lcd.write_string(TITLE)?;
    lcd.set_cursor(1, 20)?;
    lcd.write_byte(0)?;

    debug!("{:?} initialized.", lcd);

    let frame_limit = config.frame_limit();
    let mut frame = 0u32;

    info!("Starting main loop...");
    loop {
        draw_status(&mut lcd, frame)?;
        frame += 1;

        if frame_limit.is_some_and(|limit| frame >= limit) {
            break;
        }

        sleep(Duration::from_secs(1));
    }

    Ok(())
}

fn draw_status(lcd: &mut dyn HD44780Driver, frame: u32) -> eyre::Result<()> {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());

    lcd.set_cursor(2, 1)?;
    lcd.write_string("Time")?;
    lcd.set_cursor(2, 13)?;
    write_two_digits(lcd, now.hour())?;
    lcd.write_char(':')?;
    write_two_digits(lcd, now.minute())?;
    lcd.write_char(':')?;
    write_two_digits(lcd, now.second())?;

    lcd.set_cursor(3, 1)?;
    lcd.write_string("Load")?;
    lcd.write_float(System::load_average().one as f32, 16, 2)?;

    lcd.set_cursor(4, 1)?;
    lcd.write_string("Frame")?;
    lcd.write_integer(frame.min(i32::MAX as u32) as i32, 15)?;

    Ok(())
}

fn write_two_digits(lcd: &mut dyn HD44780Driver, value: u8) -> eyre::Result<()> {
    if value < 10 {
        lcd.write_char('0')?;
    }
    lcd.write_integer(value as i32, 0)?;
    Ok(())
}

/// Logs every byte the trace backend saw, after the four reset nibbles.
fn dump_transfers(gpio: &TraceGpioDriver, config: &Config) -> eyre::Result<()> {
    let mut lines = config.pins.data.to_vec();
    lines.push(config.pins.rs);

    let samples = gpio.sample_on_falling_edge(config.pins.e, &lines)?;
    let transfers = decode_transfers(samples.get(4..).unwrap_or_default());

    info!(
        "{} bytes sent, {} µs spent waiting",
        transfers.len(),
        gpio.total_delay_us()
    );
    for (mode, byte) in transfers {
        match mode {
            TransferMode::Command => info!("CMD  {:08b}", byte),
            TransferMode::Data if byte.is_ascii_graphic() || byte == b' ' => {
                info!("DATA {:08b} '{}'", byte, byte as char)
            }
            TransferMode::Data => info!("DATA {:08b}", byte),
        }
    }

    Ok(())
}
