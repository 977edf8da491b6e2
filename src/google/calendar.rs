//! Calendar operations on the primary calendar

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, SecondsFormat, TimeZone, Utc, Weekday,
};
use serde_json::{json, Value};

use crate::error::{Result, ValidationError, WorkspaceMcpError};
use crate::google::client::GoogleClient;
use crate::google::types::*;
use crate::google::utils::truncate_chars;

/// Descriptions in event listings are cut to this many characters
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// Events considered by the free-slot search
const FREE_SLOT_EVENT_LIMIT: u32 = 250;

const DEFAULT_LOOKAHEAD_DAYS: i64 = 7;

/// Fields of an event to create or patch
#[derive(Debug, Clone, Default)]
pub struct EventChanges {
    pub summary: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
}

/// Working-day window, in whole hours of the search offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingHours {
    pub start: u32,
    pub end: u32,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self { start: 9, end: 17 }
    }
}

/// A timed event occupying the calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

pub struct CalendarApi<'a> {
    client: &'a GoogleClient,
    time_zone: &'a str,
}

impl<'a> CalendarApi<'a> {
    /// `time_zone` is attached to every created or patched start and end
    pub fn new(client: &'a GoogleClient, time_zone: &'a str) -> Self {
        Self { client, time_zone }
    }

    fn events_url(&self) -> String {
        format!("{}/events", self.client.endpoints().calendar)
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url(), urlencoding::encode(event_id))
    }

    async fn list(&self, time_min: &str, time_max: &str, max_results: u32) -> Result<Vec<Event>> {
        let list: EventList = self
            .client
            .get_json(
                &self.events_url(),
                &[
                    ("timeMin", time_min.to_string()),
                    ("timeMax", time_max.to_string()),
                    ("maxResults", max_results.to_string()),
                    ("singleEvents", "true".to_string()),
                    ("orderBy", "startTime".to_string()),
                ],
            )
            .await?;
        Ok(list.items)
    }

    /// Events in a window, by default the coming week
    pub async fn get_events(
        &self,
        time_min: Option<&str>,
        time_max: Option<&str>,
        max_results: u32,
    ) -> Result<Vec<EventSummary>> {
        let now = DateTime::from_timestamp_millis(self.client.now_millis()).unwrap_or_default();
        let default_min = iso_millis(now);
        let default_max = iso_millis(now + Duration::days(DEFAULT_LOOKAHEAD_DAYS));

        let events = self
            .list(
                time_min.unwrap_or(&default_min),
                time_max.unwrap_or(&default_max),
                max_results,
            )
            .await?;

        Ok(events
            .into_iter()
            .map(|event| EventSummary {
                description: event
                    .description
                    .as_deref()
                    .map(|d| truncate_chars(d, MAX_DESCRIPTION_CHARS)),
                start: event.start.as_ref().and_then(EventDateTime::display),
                end: event.end.as_ref().and_then(EventDateTime::display),
                id: event.id,
                summary: event.summary,
                location: event.location,
                attendees: event.attendees,
                html_link: event.html_link,
            })
            .collect())
    }

    /// Create a timed event; attendees are notified when present
    pub async fn create_event(
        &self,
        summary: &str,
        start_time: &str,
        end_time: &str,
        description: Option<&str>,
        location: Option<&str>,
        attendees: &[String],
    ) -> Result<Value> {
        let event = Event {
            summary: Some(summary.to_string()),
            description: description.filter(|d| !d.is_empty()).map(str::to_string),
            location: location.filter(|l| !l.is_empty()).map(str::to_string),
            start: Some(EventDateTime::timed(start_time, self.time_zone)),
            end: Some(EventDateTime::timed(end_time, self.time_zone)),
            attendees: (!attendees.is_empty()).then(|| {
                attendees
                    .iter()
                    .map(|email| Attendee {
                        email: email.clone(),
                        response_status: None,
                    })
                    .collect()
            }),
            ..Default::default()
        };
        let send_updates = if attendees.is_empty() { "none" } else { "all" };

        let created: Event = self
            .client
            .post_json(&self.events_url(), &[("sendUpdates", send_updates.to_string())], &event)
            .await?;

        tracing::info!(email = %self.client.email(), event_id = ?created.id, "created event");
        Ok(event_result(&created))
    }

    /// Patch only the provided fields of an existing event
    pub async fn update_event(&self, event_id: &str, changes: &EventChanges) -> Result<Value> {
        let _: Event = self.client.get_json(&self.event_url(event_id), &[]).await?;

        let patch = Event {
            summary: changes.summary.clone().filter(|s| !s.is_empty()),
            description: changes.description.clone(),
            location: changes.location.clone(),
            start: changes
                .start_time
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(|s| EventDateTime::timed(s, self.time_zone)),
            end: changes
                .end_time
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(|s| EventDateTime::timed(s, self.time_zone)),
            ..Default::default()
        };

        let updated: Event = self
            .client
            .patch_json(&self.event_url(event_id), &[], &patch)
            .await?;

        let mut result = event_result(&updated);
        result["updated"] = json!(true);
        Ok(result)
    }

    pub async fn delete_event(&self, event_id: &str) -> Result<Value> {
        self.client.delete(&self.event_url(event_id), &[]).await?;
        tracing::info!(email = %self.client.email(), event_id = %event_id, "deleted event");
        Ok(json!({ "success": true, "eventId": event_id, "deleted": true }))
    }

    /// Free working-hour slots between two RFC 3339 instants
    pub async fn find_free_slots(
        &self,
        date_min: &str,
        date_max: &str,
        duration_minutes: i64,
        hours: WorkingHours,
    ) -> Result<FreeSlotsResult> {
        let range_start = parse_instant("dateMin", date_min)?;
        let range_end = parse_instant("dateMax", date_max)?;

        let events = self.list(date_min, date_max, FREE_SLOT_EVENT_LIMIT).await?;
        let busy: Vec<BusyInterval> = events.iter().filter_map(busy_interval).collect();

        let free_slots = compute_free_slots(&busy, range_start, range_end, duration_minutes, hours);
        Ok(FreeSlotsResult {
            total_slots: free_slots.len(),
            free_slots,
            search_range: SearchRange {
                from: date_min.to_string(),
                to: date_max.to_string(),
            },
            working_hours: format!("{}:00 - {}:00", hours.start, hours.end),
            minimum_duration: format!("{} minutes", duration_minutes),
        })
    }
}

fn event_result(event: &Event) -> Value {
    json!({
        "id": event.id,
        "summary": event.summary,
        "start": event.start.as_ref().and_then(EventDateTime::display),
        "end": event.end.as_ref().and_then(EventDateTime::display),
        "htmlLink": event.html_link,
    })
}

fn parse_instant(name: &str, value: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).map_err(|e| {
        WorkspaceMcpError::Validation(ValidationError::InvalidParameter {
            name: name.to_string(),
            message: format!("expected an RFC 3339 timestamp: {}", e),
        })
    })
}

/// Timed events only; all-day events do not block slots
fn busy_interval(event: &Event) -> Option<BusyInterval> {
    let start = event.start.as_ref()?.date_time.as_deref()?;
    let end = event.end.as_ref()?.date_time.as_deref()?;
    Some(BusyInterval {
        start: DateTime::parse_from_rfc3339(start).ok()?.with_timezone(&Utc),
        end: DateTime::parse_from_rfc3339(end).ok()?.with_timezone(&Utc),
    })
}

fn iso_millis(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `hour` o'clock on `date` in `offset`; hour 24 is the next midnight
fn at_hour(date: NaiveDate, hour: u32, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let local = if hour >= 24 {
        date.succ_opt()?.and_hms_opt(0, 0, 0)?
    } else {
        date.and_hms_opt(hour, 0, 0)?
    };
    Some(offset.from_local_datetime(&local).single()?.with_timezone(&Utc))
}

/// Gaps of at least `min_minutes` between busy intervals, per weekday.
///
/// Days are walked in the offset of `range_start`. Each day's window is
/// `hours.start..hours.end`; intervals overlapping it are visited in start
/// order and every sufficiently long gap before them and after the last one
/// becomes a slot.
pub fn compute_free_slots(
    busy: &[BusyInterval],
    range_start: DateTime<FixedOffset>,
    range_end: DateTime<FixedOffset>,
    min_minutes: i64,
    hours: WorkingHours,
) -> Vec<FreeSlot> {
    let offset = *range_start.offset();
    let range_end = range_end.with_timezone(&Utc);

    let mut sorted = busy.to_vec();
    sorted.sort_by_key(|interval| interval.start);

    let mut slots = Vec::new();
    let mut current = range_start.with_timezone(&Utc);
    while current < range_end {
        let date = current.with_timezone(&offset).date_naive();

        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            if let (Some(day_start), Some(day_end)) =
                (at_hour(date, hours.start, offset), at_hour(date, hours.end, offset))
            {
                day_gaps(&sorted, day_start, day_end, min_minutes, &mut slots);
            }
        }

        current = match date.succ_opt().and_then(|next| at_hour(next, 0, offset)) {
            Some(next) => next,
            None => break,
        };
    }

    slots
}

fn day_gaps(
    sorted: &[BusyInterval],
    day_start: DateTime<Utc>,
    day_end: DateTime<Utc>,
    min_minutes: i64,
    slots: &mut Vec<FreeSlot>,
) {
    let mut pointer = day_start;
    for interval in sorted
        .iter()
        .filter(|i| i.start < day_end && i.end > day_start)
    {
        push_gap(pointer.max(day_start), interval.start.min(day_end), min_minutes, slots);
        if interval.end > pointer {
            pointer = interval.end;
        }
    }
    push_gap(pointer.max(day_start), day_end, min_minutes, slots);
}

fn push_gap(start: DateTime<Utc>, end: DateTime<Utc>, min_minutes: i64, slots: &mut Vec<FreeSlot>) {
    if start >= end {
        return;
    }
    let millis = (end - start).num_milliseconds();
    if millis >= min_minutes * 60_000 {
        slots.push(FreeSlot {
            start: iso_millis(start),
            end: iso_millis(end),
            duration_minutes: (millis + 30_000) / 60_000,
        });
    }
}
