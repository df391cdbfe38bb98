//! Board health readout logged every cycle in debug mode.

use std::fs;
use std::path::PathBuf;

const MEMINFO_PATH: &str = "/proc/meminfo";
const CPU_TEMP_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthReading {
    pub mem_available_kib: Option<u64>,
    pub cpu_temp_c: Option<f64>,
}

/// Reads available memory and SoC temperature from procfs/sysfs. Missing files just
/// leave the field empty.
#[derive(Debug, Clone)]
pub struct SysfsHealth {
    meminfo: PathBuf,
    cpu_temp: PathBuf,
}

impl Default for SysfsHealth {
    fn default() -> Self {
        Self {
            meminfo: PathBuf::from(MEMINFO_PATH),
            cpu_temp: PathBuf::from(CPU_TEMP_PATH),
        }
    }
}

impl SysfsHealth {
    pub fn with_paths(meminfo: PathBuf, cpu_temp: PathBuf) -> Self {
        Self { meminfo, cpu_temp }
    }

    pub fn read(&self) -> HealthReading {
        HealthReading {
            mem_available_kib: fs::read_to_string(&self.meminfo)
                .ok()
                .and_then(|text| parse_mem_available(&text)),
            cpu_temp_c: fs::read_to_string(&self.cpu_temp)
                .ok()
                .and_then(|text| parse_millidegrees(&text)),
        }
    }
}

fn parse_mem_available(meminfo: &str) -> Option<u64> {
    meminfo.lines().find_map(|line| {
        line.strip_prefix("MemAvailable:")?
            .split_whitespace()
            .next()?
            .parse()
            .ok()
    })
}

fn parse_millidegrees(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().map(|milli| milli / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_available_memory_and_temperature() {
        let dir = tempfile::tempdir().unwrap();
        let meminfo = dir.path().join("meminfo");
        let temp = dir.path().join("temp");
        fs::write(
            &meminfo,
            "MemTotal:         948304 kB\nMemFree:          402112 kB\nMemAvailable:     611020 kB\n",
        )
        .unwrap();
        fs::write(&temp, "48312\n").unwrap();

        let reading = SysfsHealth::with_paths(meminfo, temp).read();
        assert_eq!(reading.mem_available_kib, Some(611_020));
        assert_eq!(reading.cpu_temp_c, Some(48.312));
    }

    #[test]
    fn missing_sources_leave_fields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let reading =
            SysfsHealth::with_paths(dir.path().join("nope"), dir.path().join("nope")).read();
        assert_eq!(
            reading,
            HealthReading {
                mem_available_kib: None,
                cpu_temp_c: None,
            }
        );
        assert_eq!(parse_mem_available("MemTotal: 1 kB\n"), None);
        assert_eq!(parse_millidegrees("hot"), None);
    }
}
