use std::time::Duration;

/// Renders a monotonic elapsed time as a tiered human-readable string,
/// e.g. `"3.50000ms"`, `"1sec 0.00000ms"`, `"1hr1min1sec0.00000ms"`.
///
/// The sub-minute tier keeps a space between the seconds and milliseconds
/// components while the higher tiers concatenate without one; that
/// inconsistency is part of the established line format and is kept as is.
pub fn format_duration(secs: u64, nanos: u32) -> String {
    let millis = format_millis(nanos);

    if secs < 1 {
        format!("{}ms", millis)
    } else if secs < 60 {
        format!("{}sec {}ms", secs, millis)
    } else if secs < 3600 {
        format!("{}min{}sec{}ms", secs / 60, secs % 60, millis)
    } else {
        format!(
            "{}hr{}min{}sec{}ms",
            secs / 3600,
            (secs % 3600) / 60,
            secs % 60,
            millis
        )
    }
}

pub fn format_elapsed(elapsed: &Duration) -> String {
    format_duration(elapsed.as_secs(), elapsed.subsec_nanos())
}

/// Millisecond component rendered with six significant digits.
fn format_millis(nanos: u32) -> String {
    let millis = (nanos as f64) / 1_000_000.0;

    let decimals = if millis > 0.0 {
        (5 - millis.log10().floor() as i64) as usize
    } else {
        5
    };

    format!("{:.*}", decimals, millis)
}
