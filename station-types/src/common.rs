//! Common constants and formatting shared across the model

use num_format::{Locale, ToFormattedString};

/// Canonical ZFS dataset layout used as the "mount point" of ZFS regions.
///
/// ZFS regions do not mount at a single path; the installer creates this
/// dataset hierarchy on the pool instead.
pub const ZFS_DATASETS: &str = "/,\
/home(mountpoint=/home),\
/tmp(mountpoint=/tmp|exec=on|setuid=off),\
/usr(mountpoint=/usr|canmount=off),\
/usr/ports(setuid=off),\
/usr/src,\
/var(mountpoint=/var|canmount=off),\
/var/audit(exec=off|setuid=off),\
/var/crash(exec=off|setuid=off),\
/var/log(exec=off|setuid=off),\
/var/mail(atime=on),\
/var/tmp(setuid=off)";

/// Convert megabytes to a human-readable string (e.g., "1.50 GB")
pub fn mb_to_pretty(mb: u64, add_mb: bool) -> String {
    let mut steps = 0;
    let mut val: f64 = mb as f64;

    while val > 1024. && steps < 4 {
        val /= 1024.;
        steps += 1;
    }

    let unit = match steps {
        0 => "MB",
        1 => "GB",
        2 => "TB",
        3 => "PB",
        _ => "EB",
    };

    if add_mb {
        let mb_str = mb.to_formatted_string(&Locale::en);
        format!("{:.2} {} ({} MB)", val, unit, mb_str)
    } else {
        format!("{:.2} {}", val, unit)
    }
}
