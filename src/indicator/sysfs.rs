use std::fs;
use std::io;
use std::path::PathBuf;

use super::{LedBackend, LedConfig};

/// LED exposed through `/sys/class/leds/<name>`.
pub struct SysfsLed {
    base: PathBuf,
    default_trigger: String,
    on_value: String,
    off_value: String,
}

impl SysfsLed {
    pub fn new(config: &LedConfig) -> Self {
        Self {
            base: config.path.clone(),
            default_trigger: config.default_trigger.clone(),
            on_value: "1".to_string(),
            off_value: "0".to_string(),
        }
    }

    fn write_attr(&self, name: &str, value: &str) -> io::Result<()> {
        fs::write(self.base.join(name), format!("{}\n", value))
    }
}

impl LedBackend for SysfsLed {
    /// The "on" brightness differs between boards, so it comes from
    /// `max_brightness`.
    fn take_control(&mut self) -> io::Result<()> {
        let raw = fs::read_to_string(self.base.join("max_brightness"))?;
        let max: u32 = raw.trim().parse().map_err(|e| {
            let msg = format!("max_brightness {:?}: {}", raw.trim(), e);
            io::Error::new(io::ErrorKind::InvalidData, msg)
        })?;
        self.on_value = max.to_string();
        self.off_value = if max == 0 { "1" } else { "0" }.to_string();
        self.write_attr("trigger", "none")
    }

    fn set(&mut self, on: bool) -> io::Result<()> {
        let value = if on { &self.on_value } else { &self.off_value };
        self.write_attr("brightness", value)
    }

    fn release(&mut self) -> io::Result<()> {
        self.write_attr("trigger", &self.default_trigger)
    }
}
