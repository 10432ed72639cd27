//! One-time adapter setup: make the local adapter discoverable and pairable
//! without user interaction.

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{Result, WirelessError};

const BLUETOOTHCTL_SCRIPT: &str = "\
power on
discoverable on
agent NoInputNoOutput
default-agent
agent off
pairable on
";

/// (argv, stdin) for each setup step, in order
pub fn init_commands() -> Vec<(Vec<&'static str>, Option<&'static str>)> {
    vec![
        (vec!["/usr/bin/sdptool", "add", "SP"], None),
        (vec!["/usr/bin/hciconfig", "hci0", "piscan"], None),
        (vec!["/usr/bin/bluetoothctl"], Some(BLUETOOTHCTL_SCRIPT)),
        // io-cap 3 is NoInputNoOutput; btmgmt misbehaves unless stdin is given
        (vec!["/usr/bin/btmgmt", "io-cap", "3"], Some("")),
    ]
}

pub async fn initialize_adapter() -> Result<()> {
    for (argv, stdin) in init_commands() {
        run_command(&argv, stdin).await?;
    }
    Ok(())
}

async fn run_command(argv: &[&str], stdin: Option<&str>) -> Result<()> {
    let command = argv.join(" ");
    match stdin {
        Some(input) => log::debug!("+ {} <<EOF\n{}EOF", command, input),
        None => log::debug!("+ {}", command),
    }

    let (program, args) = argv.split_first().ok_or_else(|| {
        WirelessError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"))
    })?;
    let mut cmd = Command::new(program);
    cmd.args(args);
    if stdin.is_some() {
        cmd.stdin(Stdio::piped());
    }

    let mut child = cmd.spawn()?;
    if let Some(input) = stdin {
        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(input.as_bytes()).await?;
            // closing stdin ends the interactive tool
            drop(pipe);
        }
    }

    let status = child.wait().await?;
    if !status.success() {
        return Err(WirelessError::AdapterInit { command, status });
    }
    Ok(())
}
