use std::path::Path;
use sysinfo::{DiskExt, System, SystemExt};

/// Render an I/O error the way strerror would, without the
/// "(os error N)" suffix `std` appends.
pub fn strerror(err: &std::io::Error) -> String {
    let text = err.to_string();
    match text.find(" (os error") {
        Some(pos) => text[..pos].to_string(),
        None => text,
    }
}

/// Free space on the disk holding `path`, in bytes.
pub fn get_site_free_space(path: &Path) -> Result<u64, String> {
    let mut sys = System::new_all();
    sys.refresh_disks();

    // Pick the longest mount point that contains the path
    let mut best: Option<(usize, u64)> = None;
    for disk in sys.disks() {
        if path.starts_with(disk.mount_point()) {
            let depth = disk.mount_point().as_os_str().len();
            if best.map_or(true, |(d, _)| depth > d) {
                best = Some((depth, disk.available_space()));
            }
        }
    }

    match best {
        Some((_, space)) => Ok(space),
        None => Err(format!("No disk found containing the path: {:?}", path)),
    }
}

pub fn format_free_space(size_in_bytes: u64) -> String {
    let size_in_mb = size_in_bytes as f64 / 1_048_576.0;
    if size_in_mb >= 1_048_576.0 {
        format!("{:.2} TB", size_in_mb / 1_048_576.0)
    } else if size_in_mb >= 1_024.0 {
        format!("{:.2} GB", size_in_mb / 1_024.0)
    } else {
        format!("{:.2} MB", size_in_mb)
    }
}

/// Log-friendly rendering of a command line, with the USER/PASS argument
/// masked out.
pub fn redact_command(line: &str) -> String {
    let upper = line.as_bytes();
    let redact = ["USER ", "PASS "]
        .iter()
        .any(|prefix| upper.len() >= 5 && prefix.as_bytes().eq_ignore_ascii_case(&upper[..5]));

    if redact {
        format!("{} ******", &line[..4])
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strerror_strips_os_error_suffix() {
        let err = std::io::Error::from_raw_os_error(2);
        let text = strerror(&err);
        assert!(!text.contains("os error"), "{text}");
    }

    #[test]
    fn test_redact_command() {
        assert_eq!(redact_command("USER carol"), "USER ******");
        assert_eq!(redact_command("pass hunter2"), "pass ******");
        assert_eq!(redact_command("NOOP"), "NOOP");
        assert_eq!(redact_command("PASSA"), "PASSA");
    }

    #[test]
    fn test_format_free_space() {
        assert_eq!(format_free_space(512 * 1024 * 1024), "512.00 MB");
        assert_eq!(format_free_space(4 * 1024 * 1024 * 1024), "4.00 GB");
    }
}
