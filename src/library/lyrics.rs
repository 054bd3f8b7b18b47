//! Parser for `.lrc` lyric sidecar files.
//!
//! Each line carries one or more `[mm:ss.xx]` timestamps followed by text.
//! Metadata tags such as `[ar:Artist]` or `[offset:+200]` are skipped, except
//! `offset`, which shifts every timestamp by the given milliseconds.

use std::time::Duration;

use super::model::LyricLine;

/// Parse LRC text into time-sorted lines.
pub fn parse_lrc(text: &str) -> Vec<LyricLine> {
    let mut offset_ms: i64 = 0;
    let mut stamped: Vec<(i64, String)> = Vec::new();

    for raw in text.lines() {
        let mut rest = raw.trim();
        let mut stamps: Vec<i64> = Vec::new();

        while let Some(stripped) = rest.strip_prefix('[') {
            let Some(end) = stripped.find(']') else {
                break;
            };
            let tag = &stripped[..end];
            rest = &stripped[end + 1..];

            if let Some(ms) = parse_timestamp(tag) {
                stamps.push(ms);
            } else if let Some(v) = tag.strip_prefix("offset:") {
                offset_ms = v.trim().parse().unwrap_or(0);
            }
        }

        let text = rest.trim();
        stamped.extend(stamps.into_iter().map(|ms| (ms, text.to_string())));
    }

    // The offset applies to the whole file wherever the tag appears.
    // LRC offsets are positive when lyrics should appear earlier.
    let mut lines: Vec<LyricLine> = stamped
        .into_iter()
        .map(|(ms, text)| LyricLine {
            at: Duration::from_millis(ms.saturating_sub(offset_ms).max(0) as u64),
            text,
        })
        .collect();
    lines.sort_by_key(|l| l.at);
    lines
}

/// `mm:ss`, `mm:ss.xx` or `mm:ss.xxx` to milliseconds.
fn parse_timestamp(tag: &str) -> Option<i64> {
    let (min, sec) = tag.split_once(':')?;
    let min: i64 = min.trim().parse().ok()?;
    let (whole, frac) = match sec.split_once('.') {
        Some((w, f)) => (w, f),
        None => (sec, ""),
    };
    let whole: i64 = whole.trim().parse().ok()?;
    if !(0..60).contains(&whole) {
        return None;
    }

    let frac_ms = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().ok()? * 100,
        2 => frac.parse::<i64>().ok()? * 10,
        _ => frac.get(..3)?.parse::<i64>().ok()?,
    };

    min.checked_mul(60_000)?.checked_add(whole * 1000 + frac_ms)
}
