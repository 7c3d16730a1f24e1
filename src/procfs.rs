use crate::error::*;
use libc::pid_t;
use std::fs;

// Everything this crate needs from /proc: liveness, tracer detection, and the mapped-region
// lookup the closest-instruction search clamps against. Per-thread stat parsing, etc. belongs
// to the debugged process's own debugger and stays out of scope here.

pub fn is_process_valid(pid: pid_t) -> bool {
    fs::metadata(format!("/proc/{}", pid)).is_ok()
}

// Returns the [start, end) bounds of the mapped region containing `address`, by scanning
// /proc/<pid>/maps. None if the address falls in no mapped region (or the process is gone).
pub fn region_bounds(pid: pid_t, address: u64) -> Result<Option<(u64, u64)>> {
    let maps = fs::read_to_string(format!("/proc/{}/maps", pid))?;
    Ok(parse_region_bounds(&maps, address))
}

fn parse_region_bounds(maps: &str, address: u64) -> Option<(u64, u64)> {
    for line in maps.lines() {
        let bounds = (|| {
            let range = line.split_whitespace().next()?;
            let (start_s, end_s) = range.split_once('-')?;
            let start = u64::from_str_radix(start_s, 16).ok()?;
            let end = u64::from_str_radix(end_s, 16).ok()?;
            Some((start, end))
        })();
        if let Some((start, end)) = bounds {
            if address >= start && address < end {
                return Some((start, end));
            }
        }
    }
    None
}

// Returns the tracer's pid and, if resolvable, its command name, by reading `TracerPid:` out of
// /proc/<pid>/status. TracerPid is 0 when nothing is attached.
pub fn tracer_of(pid: pid_t) -> Result<Option<(pid_t, Option<String>)>> {
    let status = fs::read_to_string(format!("/proc/{}/status", pid))?;
    let tracer_pid = parse_tracer_pid(&status).ok_or_else(|| Error::new(ErrorKind::Environment, "TracerPid not found in status".to_string()))?;
    if tracer_pid == 0 {
        return Ok(None);
    }
    let name = fs::read_to_string(format!("/proc/{}/comm", tracer_pid)).ok().map(|s| s.trim().to_string());
    Ok(Some((tracer_pid, name)))
}

fn parse_tracer_pid(status: &str) -> Option<pid_t> {
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("TracerPid:") {
            return rest.trim().parse::<pid_t>().ok();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tracer_pid_line() {
        let status = "Name:\tbash\nState:\tS (sleeping)\nTracerPid:\t1234\nUid:\t1000\t1000\t1000\t1000\n";
        assert_eq!(parse_tracer_pid(status), Some(1234));
    }

    #[test]
    fn zero_tracer_pid_means_untraced() {
        let status = "Name:\tbash\nTracerPid:\t0\n";
        assert_eq!(parse_tracer_pid(status), Some(0));
    }

    #[test]
    fn missing_field_is_none() {
        assert_eq!(parse_tracer_pid("Name:\tbash\n"), None);
    }

    #[test]
    fn region_bounds_finds_the_containing_range() {
        let maps = "00400000-00401000 r-xp 00000000 00:00 0\n\
                     00601000-00602000 rw-p 00000000 00:00 0\n";
        assert_eq!(parse_region_bounds(maps, 0x400500), Some((0x400000, 0x401000)));
        assert_eq!(parse_region_bounds(maps, 0x601fff), Some((0x601000, 0x602000)));
    }

    #[test]
    fn region_bounds_none_outside_any_mapping() {
        let maps = "00400000-00401000 r-xp 00000000 00:00 0\n";
        assert_eq!(parse_region_bounds(maps, 0x500000), None);
    }
}
