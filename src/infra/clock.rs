use time::OffsetDateTime;

/// Local wall-clock `HH:MM:SS` for a timestamp, falling back to UTC when the
/// local zone cannot be resolved.
pub fn local_time_of_day(at: OffsetDateTime) -> String {
    let (hour, minute, second) = local_clock(at).unwrap_or((at.hour(), at.minute(), at.second()));
    format!("{hour:02}:{minute:02}:{second:02}")
}

#[cfg(unix)]
fn local_clock(at: OffsetDateTime) -> Option<(u8, u8, u8)> {
    use std::mem::MaybeUninit;

    let seconds = libc::time_t::try_from(at.unix_timestamp()).ok()?;
    let mut tm = MaybeUninit::<libc::tm>::uninit();
    let tm_ptr = unsafe { libc::localtime_r(&seconds, tm.as_mut_ptr()) };
    if tm_ptr.is_null() {
        return None;
    }
    let tm = unsafe { tm.assume_init() };

    Some((
        tm.tm_hour.try_into().ok()?,
        tm.tm_min.try_into().ok()?,
        tm.tm_sec.try_into().ok()?,
    ))
}

#[cfg(not(unix))]
fn local_clock(_at: OffsetDateTime) -> Option<(u8, u8, u8)> {
    None
}
