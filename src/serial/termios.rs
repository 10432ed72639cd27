use std::io;
use std::os::unix::io::RawFd;

use crate::config::Parity;

/// Switch an open port to mark or space parity. `serialport` only knows
/// none/odd/even, so this patches CMSPAR into the line settings it applied.
pub(crate) fn apply_sticky_parity(fd: RawFd, parity: Parity) -> io::Result<()> {
    // SAFETY: termios is plain old data and fully written by tcgetattr.
    let mut tio: libc::termios = unsafe { std::mem::zeroed() };
    if unsafe { libc::tcgetattr(fd, &mut tio) } != 0 {
        return Err(io::Error::last_os_error());
    }

    tio.c_cflag |= libc::PARENB | libc::CMSPAR;
    match parity {
        Parity::Mark => tio.c_cflag |= libc::PARODD,
        _ => tio.c_cflag &= !libc::PARODD,
    }

    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tio) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
