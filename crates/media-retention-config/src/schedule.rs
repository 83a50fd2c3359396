//! Standard five-field cron as understood by the scheduler.
//!
//! The scheduler wants a leading seconds field and numbers weekdays 1-7
//! starting at Sunday, while standard cron uses 0-7 with both 0 and 7 for
//! Sunday. Weekdays are therefore rewritten as day names.

use anyhow::{anyhow, Result};
use std::str::FromStr;

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Convert `minute hour day month weekday` to the scheduler's six-field form.
pub fn scheduler_cron(expr: &str) -> Result<String> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(anyhow!(
            "cron must have 5 fields (minute hour day month weekday), got '{}'",
            expr.trim()
        ));
    }
    let weekdays = convert_weekdays(fields[4])
        .map_err(|e| anyhow!("invalid weekday field '{}': {}", fields[4], e))?;

    Ok(format!(
        "0 {} {} {} {} {}",
        fields[0], fields[1], fields[2], fields[3], weekdays
    ))
}

/// Convert and parse with the scheduler's own cron parser.
pub fn parse_schedule(expr: &str) -> Result<cron::Schedule> {
    let converted = scheduler_cron(expr)?;
    cron::Schedule::from_str(&converted)
        .map_err(|e| anyhow!("invalid cron expression '{}': {}", expr.trim(), e))
}

fn convert_weekdays(field: &str) -> Result<String> {
    if field == "*" || field == "?" {
        return Ok(field.to_string());
    }

    let mut days = [false; 7];
    for term in field.split(',') {
        let (range, step) = match term.split_once('/') {
            Some((range, step)) => {
                let step: usize = step
                    .parse()
                    .map_err(|_| anyhow!("step '{}' is not a number", step))?;
                if step == 0 {
                    return Err(anyhow!("step cannot be zero"));
                }
                (range, step)
            }
            None => (term, 1),
        };

        let (start, end) = if range == "*" {
            (0, 6)
        } else if let Some((from, to)) = range.split_once('-') {
            (weekday_number(from)?, weekday_number(to)?)
        } else {
            let day = weekday_number(range)?;
            // "1/2" steps from Monday to the end of the week
            (day, if step > 1 { 6 } else { day })
        };
        if start > end {
            return Err(anyhow!("range '{}' runs backwards", range));
        }

        for day in (start..=end).step_by(step) {
            days[day % 7] = true;
        }
    }

    Ok(DAY_NAMES
        .iter()
        .zip(days)
        .filter(|(_, selected)| *selected)
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(","))
}

fn weekday_number(value: &str) -> Result<usize> {
    if let Ok(day) = value.parse::<usize>() {
        if day > 7 {
            return Err(anyhow!("weekday {} is outside 0-7", day));
        }
        return Ok(day);
    }
    DAY_NAMES
        .iter()
        .position(|name| name.eq_ignore_ascii_case(value))
        .ok_or_else(|| anyhow!("unknown weekday '{}'", value))
}
