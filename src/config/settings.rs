use std::fmt;
use std::str::FromStr;

use super::{ConfigError, Result};

pub const DEFAULT_BAUD_RATE: u32 = 4800;
pub const DEFAULT_BYTE_SIZE: u8 = 8;

/// Parity modes accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
    /// Parity bit always set (termios CMSPAR + PARODD)
    Mark,
    /// Parity bit always clear (termios CMSPAR)
    Space,
}

impl Parity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Parity::None => "none",
            Parity::Even => "even",
            Parity::Odd => "odd",
            Parity::Mark => "mark",
            Parity::Space => "space",
        }
    }

    /// Mark and space parity are not expressible through `serialport` and need
    /// a termios fixup after the port is open.
    pub fn is_sticky(&self) -> bool {
        matches!(self, Parity::Mark | Parity::Space)
    }
}

impl FromStr for Parity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Parity::None),
            "even" => Ok(Parity::Even),
            "odd" => Ok(Parity::Odd),
            "mark" => Ok(Parity::Mark),
            "space" => Ok(Parity::Space),
            other => Err(ConfigError::InvalidParity(other.to_string())),
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopBits {
    #[default]
    One,
    OnePointFive,
    Two,
}

impl StopBits {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopBits::One => "1",
            StopBits::OnePointFive => "1.5",
            StopBits::Two => "2",
        }
    }
}

impl FromStr for StopBits {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1" => Ok(StopBits::One),
            "1.5" => Ok(StopBits::OnePointFive),
            "2" => Ok(StopBits::Two),
            other => Err(ConfigError::InvalidStopBits(other.to_string())),
        }
    }
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flow control modes. Only one may be active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowControl {
    #[default]
    None,
    XonXoff,
    RtsCts,
    DsrDtr,
}

impl FlowControl {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowControl::None => "none",
            FlowControl::XonXoff => "xonxoff",
            FlowControl::RtsCts => "rtscts",
            FlowControl::DsrDtr => "dsrdtr",
        }
    }
}

impl FromStr for FlowControl {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" => Ok(FlowControl::None),
            "xonxoff" => Ok(FlowControl::XonXoff),
            "rtscts" => Ok(FlowControl::RtsCts),
            "dsrdtr" => Ok(FlowControl::DsrDtr),
            other => Err(ConfigError::InvalidFlowControl(other.to_string())),
        }
    }
}

impl fmt::Display for FlowControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serial line parameters, validated once and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialSettings {
    baud_rate: u32,
    byte_size: u8,
    parity: Parity,
    stop_bits: StopBits,
    flow_control: FlowControl,
}

impl SerialSettings {
    pub fn new(
        baud_rate: u32,
        byte_size: u8,
        parity: Parity,
        stop_bits: StopBits,
        flow_control: FlowControl,
    ) -> Result<Self> {
        if baud_rate == 0 {
            return Err(ConfigError::InvalidBaudRate(baud_rate));
        }
        if !(5..=8).contains(&byte_size) {
            return Err(ConfigError::InvalidByteSize(byte_size));
        }
        Ok(Self {
            baud_rate,
            byte_size,
            parity,
            stop_bits,
            flow_control,
        })
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn byte_size(&self) -> u8 {
        self.byte_size
    }

    pub fn parity(&self) -> Parity {
        self.parity
    }

    pub fn stop_bits(&self) -> StopBits {
        self.stop_bits
    }

    pub fn flow_control(&self) -> FlowControl {
        self.flow_control
    }

    pub fn data_bits_setting(&self) -> serialport::DataBits {
        match self.byte_size {
            5 => serialport::DataBits::Five,
            6 => serialport::DataBits::Six,
            7 => serialport::DataBits::Seven,
            _ => serialport::DataBits::Eight,
        }
    }

    /// Parity as understood by `serialport`. Mark/space open with the parity
    /// bit disabled and are switched on by the termios fixup.
    pub fn parity_setting(&self) -> serialport::Parity {
        match self.parity {
            Parity::Even => serialport::Parity::Even,
            Parity::Odd => serialport::Parity::Odd,
            Parity::None | Parity::Mark | Parity::Space => serialport::Parity::None,
        }
    }

    /// POSIX has no 1.5 stop bit encoding; CSTOPB (two) is the closest.
    pub fn stop_bits_setting(&self) -> serialport::StopBits {
        match self.stop_bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::OnePointFive | StopBits::Two => serialport::StopBits::Two,
        }
    }

    pub fn flow_control_setting(&self) -> serialport::FlowControl {
        match self.flow_control {
            FlowControl::XonXoff => serialport::FlowControl::Software,
            FlowControl::RtsCts => serialport::FlowControl::Hardware,
            FlowControl::None | FlowControl::DsrDtr => serialport::FlowControl::None,
        }
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            byte_size: DEFAULT_BYTE_SIZE,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
        }
    }
}

impl fmt::Display for SerialSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} baud, {} bits, parity {}, {} stop, flow {}",
            self.baud_rate, self.byte_size, self.parity, self.stop_bits, self.flow_control
        )
    }
}
