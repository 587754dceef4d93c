//! ICS file parsing using the icalendar crate's parser.

use crate::error::{CalvergeError, CalvergeResult};
use crate::event::{Event, EventTime, Recurrence, Reminder};
use icalendar::{
    DatePerhapsTime,
    parser::{Component, Property, read_calendar, unfold},
};

/// Parse ICS content into an Event struct
pub fn parse_event(content: &str) -> CalvergeResult<Event> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).map_err(|e| CalvergeError::IcsParse(e.to_string()))?;
    let vevent = calendar
        .components
        .iter()
        .find(|c| c.name == "VEVENT")
        .ok_or_else(|| CalvergeError::IcsParse("no VEVENT component".into()))?;

    // Required fields
    let uid = vevent
        .find_prop("UID")
        .ok_or_else(|| CalvergeError::IcsParse("missing UID".into()))?
        .val
        .to_string();
    let start = time_prop(vevent, "DTSTART")?
        .ok_or_else(|| CalvergeError::IcsParse(format!("missing DTSTART in {uid}")))?;
    let end = match time_prop(vevent, "DTEND")? {
        Some(end) => end,
        None => end_without_dtend(vevent, &start),
    };

    let summary = text_prop(vevent.find_prop("SUMMARY"));
    let description = text_prop(vevent.find_prop("DESCRIPTION"));
    let location = text_prop(vevent.find_prop("LOCATION"));

    // Recurrence (RRULE, EXDATE)
    let rrule = vevent.find_prop("RRULE").map(|p| p.val.to_string());
    let exdates: Vec<EventTime> = vevent
        .properties
        .iter()
        .filter(|p| p.name == "EXDATE")
        .flat_map(parse_exdate_property)
        .collect();
    let recurrence = rrule.map(|rrule| Recurrence { rrule, exdates });

    // Reminders from VALARM components
    let reminders: Vec<Reminder> = vevent
        .components
        .iter()
        .filter(|c| c.name == "VALARM")
        .filter_map(|alarm| {
            let trigger = alarm.find_prop("TRIGGER")?.val.as_ref();
            let minutes = parse_trigger_minutes(trigger)?;
            Some(Reminder { minutes })
        })
        .collect();

    Ok(Event {
        uid,
        summary,
        description,
        location,
        start,
        end,
        recurrence,
        reminders,
    })
}

fn time_prop(vevent: &Component, name: &str) -> CalvergeResult<Option<EventTime>> {
    let Some(prop) = vevent.find_prop(name) else {
        return Ok(None);
    };

    DatePerhapsTime::try_from(prop)
        .map(|dpt| Some(to_event_time(dpt)))
        .map_err(|_| CalvergeError::IcsParse(format!("invalid {name} '{}'", prop.val.as_ref())))
}

/// RFC 5545: DURATION if present, otherwise one day for dates and zero
/// length for date-times.
fn end_without_dtend(vevent: &Component, start: &EventTime) -> EventTime {
    let duration = vevent
        .find_prop("DURATION")
        .and_then(|p| parse_duration(p.val.as_ref()));

    match (start, duration) {
        (EventTime::Date(d), duration) => {
            let days = duration.map_or(1, |dur| dur.num_days().max(1));
            EventTime::Date(*d + chrono::Duration::days(days))
        }
        (start, None) => start.clone(),
        (EventTime::DateTimeUtc(dt), Some(d)) => EventTime::DateTimeUtc(*dt + d),
        (EventTime::DateTimeFloating(dt), Some(d)) => EventTime::DateTimeFloating(*dt + d),
        (EventTime::DateTimeZoned { datetime, tzid }, Some(d)) => EventTime::DateTimeZoned {
            datetime: *datetime + d,
            tzid: tzid.clone(),
        },
    }
}

fn parse_duration(value: &str) -> Option<chrono::Duration> {
    let duration = iso8601::duration(value.trim_start_matches('+')).ok()?;
    let std_duration: std::time::Duration = duration.into();
    chrono::Duration::from_std(std_duration).ok()
}

fn text_prop(prop: Option<&Property>) -> Option<String> {
    prop.map(|p| unescape_text(p.val.as_ref()))
}

/// Undo RFC 5545 TEXT escaping (`\n`, `\,`, `\;`, `\\`)
fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}

/// Convert icalendar's DatePerhapsTime to our EventTime, preserving timezone info
fn to_event_time(dpt: DatePerhapsTime) -> EventTime {
    match dpt {
        DatePerhapsTime::Date(d) => EventTime::Date(d),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            icalendar::CalendarDateTime::Utc(dt) => EventTime::DateTimeUtc(dt),
            icalendar::CalendarDateTime::Floating(naive) => EventTime::DateTimeFloating(naive),
            icalendar::CalendarDateTime::WithTimezone { date_time, tzid } => {
                EventTime::DateTimeZoned {
                    datetime: date_time,
                    tzid,
                }
            }
        },
    }
}

/// Parse an EXDATE property into a list of EventTime values.
///
/// Handles TZID and VALUE=DATE parameters, UTC and floating values, and
/// comma-separated lists.
fn parse_exdate_property(prop: &Property) -> Vec<EventTime> {
    let tzid = prop
        .params
        .iter()
        .find(|p| p.key == "TZID")
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()));

    let is_date = prop
        .params
        .iter()
        .any(|p| p.key == "VALUE" && p.val.as_ref().map(|v| v.as_ref()) == Some("DATE"));

    prop.val
        .as_ref()
        .split(',')
        .filter_map(|s| {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if is_date {
                chrono::NaiveDate::parse_from_str(s, "%Y%m%d")
                    .ok()
                    .map(EventTime::Date)
            } else if let Some(ref tz) = tzid {
                chrono::NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| EventTime::DateTimeZoned {
                        datetime: dt,
                        tzid: tz.clone(),
                    })
            } else if let Some(utc) = s.strip_suffix('Z') {
                chrono::NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| EventTime::DateTimeUtc(dt.and_utc()))
            } else {
                chrono::NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(EventTime::DateTimeFloating)
            }
        })
        .collect()
}

/// Parse TRIGGER value to minutes before event (-PT30M, -P1D, etc.)
fn parse_trigger_minutes(value: &str) -> Option<i64> {
    let is_before = value.starts_with('-');
    let minutes = parse_duration(value.trim_start_matches('-'))?.num_minutes();

    Some(if is_before { minutes } else { -minutes })
}
