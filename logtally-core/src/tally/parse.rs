use crate::tally::types::{BucketKey, FormatError, LogEvent};

const REQUIRED_FIELDS: usize = 4;

/// Split a line into its positional fields: date, time, service, level, rest.
///
/// Fields are separated by any run of whitespace. Lines with fewer than four
/// fields are rejected.
pub fn parse_event(line: &str) -> Result<LogEvent<'_>, FormatError> {
    let mut fields = [""; REQUIRED_FIELDS];
    let mut rest = line;

    for (found, slot) in fields.iter_mut().enumerate() {
        let Some((field, tail)) = next_field(rest) else {
            return Err(FormatError {
                line: line.to_string(),
                fields: found,
            });
        };
        *slot = field;
        rest = tail;
    }

    let [date, time, service, level] = fields;
    Ok(LogEvent {
        date,
        time,
        service,
        level,
        remainder: rest.trim(),
    })
}

/// Map a raw line to the counter it belongs to.
///
/// Service and level are taken as-is; whether anyone reports on them is the
/// aggregator's business.
pub fn classify(line: &str) -> Result<BucketKey, FormatError> {
    let event = parse_event(line)?;
    Ok(BucketKey::new(
        event.date,
        truncate_to_minute(event.time),
        event.service,
        event.level,
    ))
}

/// `HH:MM:SS[.fff]` -> `HH:MM`. Values without a seconds part come back unchanged.
pub fn truncate_to_minute(time: &str) -> &str {
    match time.match_indices(':').nth(1) {
        Some((idx, _)) => &time[..idx],
        None => time,
    }
}

fn next_field(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }

    match input.find(char::is_whitespace) {
        Some(end) => Some((&input[..end], &input[end..])),
        None => Some((input, "")),
    }
}
