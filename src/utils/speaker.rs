/// Speaker Module
///
/// Drives the speaker (or piezo) attached to a GPIO output pin.
use crate::capabilities::DigitalOutput;
use crate::error::{Error, Result};
use rppal::gpio::{Gpio, OutputPin};

pub struct GpioSpeaker {
    pin: OutputPin,
}

impl GpioSpeaker {
    pub fn new(pin: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(|err| Error::Init(format!("GPIO: {}", err)))?;
        let mut pin = gpio
            .get(pin)
            .map_err(|err| Error::Init(format!("GPIO{}: {}", pin, err)))?
            .into_output();
        pin.set_low();
        Ok(Self { pin })
    }
}

impl DigitalOutput for GpioSpeaker {
    fn set_high(&mut self) -> Result<()> {
        self.pin.set_high();
        Ok(())
    }

    fn set_low(&mut self) -> Result<()> {
        self.pin.set_low();
        Ok(())
    }
}
