//! Minimal 5-field cron ("MIN HOUR DOM MON DOW") for the daily wall-clock
//! slot. Minute and hour fields support `*`, `*/N`, single values and
//! comma lists; the calendar fields accept only `*`.

use chrono::{DateTime, Duration, Timelike, Utc};

/// A parsed cron expression.
#[derive(Debug, Clone)]
pub struct CronSpec {
    minutes: Vec<u32>,
    hours: Vec<u32>,
}

impl CronSpec {
    /// Parse an expression like `"0 8 * * *"` (every day at 08:00).
    pub fn parse(expression: &str) -> Option<Self> {
        let parts: Vec<&str> = expression.split_whitespace().collect();
        if parts.len() != 5 {
            tracing::warn!(
                "Invalid cron expression '{expression}' (need 5 fields: MIN HOUR DOM MON DOW)"
            );
            return None;
        }
        if parts[2..].iter().any(|p| *p != "*") {
            tracing::warn!("Cron calendar fields must be '*' in '{expression}'");
            return None;
        }
        Some(Self {
            minutes: parse_field(parts[0], 0, 59)?,
            hours: parse_field(parts[1], 0, 23)?,
        })
    }

    /// The next matching instant strictly after `after`. Scans minute by
    /// minute up to 48 hours out, which always covers a daily slot.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut candidate = (after + Duration::minutes(1))
            .with_second(0)
            .unwrap_or(after)
            .with_nanosecond(0)
            .unwrap_or(after);

        for _ in 0..(48 * 60) {
            if self.minutes.contains(&candidate.minute()) && self.hours.contains(&candidate.hour())
            {
                return Some(candidate);
            }
            candidate += Duration::minutes(1);
        }
        None
    }
}

/// Expand one field into its matching values within [min, max].
fn parse_field(field: &str, min: u32, max: u32) -> Option<Vec<u32>> {
    if field == "*" {
        return Some((min..=max).collect());
    }
    if let Some(step) = field.strip_prefix("*/") {
        let n: u32 = step.parse().ok().filter(|n| *n > 0)?;
        return Some((min..=max).step_by(n as usize).collect());
    }
    if field.contains(',') {
        let values: Option<Vec<u32>> = field.split(',').map(|s| s.trim().parse().ok()).collect();
        return values.map(|v| v.into_iter().filter(|x| (min..=max).contains(x)).collect());
    }
    field
        .parse()
        .ok()
        .filter(|n| (min..=max).contains(n))
        .map(|n| vec![n])
}
