use station_types::Firmware;

use crate::cmd::run_capture;
use crate::{Result, SysError};

/// Read the boot method the kernel was started with
pub fn detect_firmware() -> Result<Firmware> {
    let output = run_capture("sysctl", &["-n", "machdep.bootmethod"])?;
    let value = output.lines().next().unwrap_or_default();
    Firmware::parse(value).ok_or_else(|| {
        SysError::OperationFailed(format!("unknown boot method: {}", value.trim()))
    })
}
