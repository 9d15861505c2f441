/// MCP3008 Module
///
/// Reads the MCP3004/3008 10-bit ADC over the Pi's hardware SPI. Channels are
/// sampled single-ended.
use crate::capabilities::AnalogInput;
use crate::config::{AdcConfig, ADC_CHANNELS};
use crate::error::{Error, Result};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};

pub struct Mcp3008 {
    spi: Spi,
}

impl Mcp3008 {
    pub fn new(config: &AdcConfig) -> Result<Self> {
        let spi = Spi::new(
            bus(config.spi_bus)?,
            slave_select(config.slave_select)?,
            config.clock_hz,
            Mode::Mode0,
        )
        .map_err(|err| Error::Init(format!("SPI{}: {}", config.spi_bus, err)))?;
        Ok(Self { spi })
    }
}

impl AnalogInput for Mcp3008 {
    fn read(&mut self, channel: u8) -> Result<u16> {
        let request = request_frame(channel)?;
        let mut response = [0u8; 3];
        self.spi
            .transfer(&mut response, &request)
            .map_err(|err| Error::Read(format!("channel {}: {}", channel, err)))?;
        Ok(decode_frame(&response))
    }
}

/// Start bit, then single-ended mode and the channel in the high nibble.
pub fn request_frame(channel: u8) -> Result<[u8; 3]> {
    if channel >= ADC_CHANNELS {
        return Err(Error::Read(format!("no ADC channel {}", channel)));
    }
    Ok([0x01, (0x08 | channel) << 4, 0x00])
}

pub fn decode_frame(response: &[u8; 3]) -> u16 {
    (((response[1] & 0x03) as u16) << 8) | response[2] as u16
}

fn bus(index: u8) -> Result<Bus> {
    Ok(match index {
        0 => Bus::Spi0,
        1 => Bus::Spi1,
        2 => Bus::Spi2,
        3 => Bus::Spi3,
        4 => Bus::Spi4,
        5 => Bus::Spi5,
        6 => Bus::Spi6,
        _ => return Err(Error::Config(format!("no SPI bus {}", index))),
    })
}

fn slave_select(index: u8) -> Result<SlaveSelect> {
    Ok(match index {
        0 => SlaveSelect::Ss0,
        1 => SlaveSelect::Ss1,
        2 => SlaveSelect::Ss2,
        _ => return Err(Error::Config(format!("no SPI slave select {}", index))),
    })
}
