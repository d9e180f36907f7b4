//! Availability and booking-conflict detection for spaces.
//!
//! All intervals are half-open: `[starts_at, ends_at)`. A booking that ends at
//! 14:00 does not conflict with one starting at 14:00 unless the space has a
//! turnover buffer, in which case each existing booking is widened by the
//! buffer on both sides. Blackouts are never widened.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::Postgres;
use uuid::Uuid;

use crate::error::AppError;

/// Order statuses that hold a slot.
pub const BLOCKING_STATUSES: &[&str] = &["confirmed", "completed"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BusyKind {
    Booking,
    Blackout,
}

/// A period during which a space cannot be booked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusyInterval {
    pub source_id: Uuid,
    pub kind: BusyKind,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct BusyRow {
    source_id: Uuid,
    kind: String,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
}

/// Half-open interval overlap.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

impl BusyInterval {
    /// The span this interval actually blocks, after applying the turnover buffer.
    pub fn blocked(&self, buffer: Duration) -> TimeRange {
        match self.kind {
            BusyKind::Booking => TimeRange {
                starts_at: self.starts_at - buffer,
                ends_at: self.ends_at + buffer,
            },
            BusyKind::Blackout => TimeRange {
                starts_at: self.starts_at,
                ends_at: self.ends_at,
            },
        }
    }
}

/// Every busy interval that conflicts with the requested slot.
pub fn find_conflicts<'a>(
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    busy: &'a [BusyInterval],
    buffer: Duration,
) -> Vec<&'a BusyInterval> {
    busy.iter()
        .filter(|interval| {
            let blocked = interval.blocked(buffer);
            overlaps(starts_at, ends_at, blocked.starts_at, blocked.ends_at)
        })
        .collect()
}

/// Free ranges inside `window` that are at least `minimum` long.
///
/// Busy intervals are widened by the buffer, clipped to the window and merged
/// before the gaps between them are taken.
pub fn free_slots(
    window: TimeRange,
    busy: &[BusyInterval],
    buffer: Duration,
    minimum: Duration,
) -> Vec<TimeRange> {
    let mut blocked: Vec<TimeRange> = busy
        .iter()
        .map(|b| b.blocked(buffer))
        .filter(|r| overlaps(r.starts_at, r.ends_at, window.starts_at, window.ends_at))
        .map(|r| TimeRange {
            starts_at: r.starts_at.max(window.starts_at),
            ends_at: r.ends_at.min(window.ends_at),
        })
        .collect();
    blocked.sort_by_key(|r| r.starts_at);

    let mut merged: Vec<TimeRange> = Vec::with_capacity(blocked.len());
    for range in blocked {
        match merged.last_mut() {
            Some(last) if range.starts_at <= last.ends_at => {
                last.ends_at = last.ends_at.max(range.ends_at);
            }
            _ => merged.push(range),
        }
    }

    let mut free = Vec::new();
    let mut cursor = window.starts_at;
    for range in merged {
        if range.starts_at > cursor {
            free.push(TimeRange {
                starts_at: cursor,
                ends_at: range.starts_at,
            });
        }
        cursor = cursor.max(range.ends_at);
    }
    if cursor < window.ends_at {
        free.push(TimeRange {
            starts_at: cursor,
            ends_at: window.ends_at,
        });
    }

    free.retain(|r| r.ends_at - r.starts_at >= minimum);
    free
}

/// Load slot-holding bookings and blackouts that could block `[from, to)`.
///
/// The query window is widened by `buffer` so bookings just outside the slot
/// but within turnover distance are returned. `exclude_order` skips the order
/// being confirmed so it does not conflict with itself.
pub async fn load_busy<'e, E>(
    executor: E,
    space_id: Uuid,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    buffer: Duration,
    exclude_order: Option<Uuid>,
) -> Result<Vec<BusyInterval>, AppError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let rows = sqlx::query_as::<_, BusyRow>(
        r#"
        SELECT id AS source_id, 'booking' AS kind, starts_at, ends_at
        FROM orders
        WHERE space_id = $1
          AND kind = 'booking'
          AND status = ANY($5)
          AND starts_at < $3
          AND ends_at > $2
          AND ($4::uuid IS NULL OR id <> $4)
        UNION ALL
        SELECT id AS source_id, 'blackout' AS kind, starts_at, ends_at
        FROM blackouts
        WHERE space_id = $1
          AND starts_at < $3
          AND ends_at > $2
        ORDER BY starts_at
        "#,
    )
    .bind(space_id)
    .bind(from - buffer)
    .bind(to + buffer)
    .bind(exclude_order)
    .bind(BLOCKING_STATUSES)
    .fetch_all(executor)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| BusyInterval {
            source_id: row.source_id,
            kind: if row.kind == "blackout" {
                BusyKind::Blackout
            } else {
                BusyKind::Booking
            },
            starts_at: row.starts_at,
            ends_at: row.ends_at,
        })
        .collect())
}

/// Fail with 409 when the slot conflicts with anything in `busy`.
pub fn ensure_available(
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    busy: &[BusyInterval],
    buffer: Duration,
) -> Result<(), AppError> {
    let conflicts = find_conflicts(starts_at, ends_at, busy, buffer);
    match conflicts.first() {
        None => Ok(()),
        Some(first) => {
            let reason = match first.kind {
                BusyKind::Booking => "an existing booking",
                BusyKind::Blackout => "a blackout period",
            };
            Err(AppError::conflict(format!(
                "Requested slot conflicts with {reason} ({} to {})",
                first.starts_at.to_rfc3339(),
                first.ends_at.to_rfc3339()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, hour, minute, 0).unwrap()
    }

    fn booking(start: DateTime<Utc>, end: DateTime<Utc>) -> BusyInterval {
        BusyInterval {
            source_id: Uuid::new_v4(),
            kind: BusyKind::Booking,
            starts_at: start,
            ends_at: end,
        }
    }

    fn blackout(start: DateTime<Utc>, end: DateTime<Utc>) -> BusyInterval {
        BusyInterval {
            kind: BusyKind::Blackout,
            ..booking(start, end)
        }
    }

    #[test]
    fn touching_intervals_do_not_overlap() {
        assert!(!overlaps(at(10, 0), at(12, 0), at(12, 0), at(14, 0)));
        assert!(!overlaps(at(12, 0), at(14, 0), at(10, 0), at(12, 0)));
        assert!(overlaps(at(10, 0), at(12, 15), at(12, 0), at(14, 0)));
        assert!(overlaps(at(9, 0), at(15, 0), at(12, 0), at(13, 0)));
    }

    #[test]
    fn buffer_widens_bookings() {
        let busy = vec![booking(at(12, 0), at(14, 0))];

        assert!(find_conflicts(at(14, 0), at(16, 0), &busy, Duration::zero()).is_empty());
        assert_eq!(
            find_conflicts(at(14, 0), at(16, 0), &busy, Duration::minutes(30)).len(),
            1
        );
        assert!(find_conflicts(at(14, 30), at(16, 0), &busy, Duration::minutes(30)).is_empty());
        assert_eq!(
            find_conflicts(at(10, 0), at(11, 45), &busy, Duration::minutes(30)).len(),
            1
        );
    }

    #[test]
    fn blackouts_ignore_buffer() {
        let busy = vec![blackout(at(12, 0), at(14, 0))];
        assert!(find_conflicts(at(14, 0), at(16, 0), &busy, Duration::hours(1)).is_empty());
        assert_eq!(
            find_conflicts(at(13, 0), at(16, 0), &busy, Duration::hours(1)).len(),
            1
        );
    }

    #[test]
    fn ensure_available_reports_conflict_kind() {
        let busy = vec![blackout(at(12, 0), at(14, 0))];
        match ensure_available(at(13, 0), at(15, 0), &busy, Duration::zero()) {
            Err(AppError::Conflict(msg)) => assert!(msg.contains("blackout")),
            other => panic!("expected conflict, got {other:?}"),
        }
        assert!(ensure_available(at(14, 0), at(15, 0), &busy, Duration::zero()).is_ok());
    }

    #[test]
    fn free_slots_are_gaps_between_merged_busy_ranges() {
        let window = TimeRange {
            starts_at: at(8, 0),
            ends_at: at(20, 0),
        };
        let busy = vec![
            booking(at(10, 0), at(12, 0)),
            booking(at(11, 0), at(13, 0)),
            blackout(at(16, 0), at(17, 0)),
        ];

        let free = free_slots(window, &busy, Duration::zero(), Duration::zero());
        assert_eq!(
            free,
            vec![
                TimeRange {
                    starts_at: at(8, 0),
                    ends_at: at(10, 0)
                },
                TimeRange {
                    starts_at: at(13, 0),
                    ends_at: at(16, 0)
                },
                TimeRange {
                    starts_at: at(17, 0),
                    ends_at: at(20, 0)
                },
            ]
        );

        for slot in &free {
            assert!(find_conflicts(slot.starts_at, slot.ends_at, &busy, Duration::zero()).is_empty());
        }
    }

    #[test]
    fn free_slots_apply_buffer_and_minimum() {
        let window = TimeRange {
            starts_at: at(8, 0),
            ends_at: at(20, 0),
        };
        let busy = vec![booking(at(10, 0), at(12, 0)), booking(at(14, 0), at(19, 0))];

        let free = free_slots(window, &busy, Duration::minutes(30), Duration::hours(2));
        // 8:00-9:30 (1.5h) and 19:30-20:00 are too short; 12:30-13:30 is too short.
        assert!(free.is_empty());

        let free = free_slots(window, &busy, Duration::minutes(30), Duration::hours(1));
        assert_eq!(
            free,
            vec![
                TimeRange {
                    starts_at: at(8, 0),
                    ends_at: at(9, 30)
                },
                TimeRange {
                    starts_at: at(12, 30),
                    ends_at: at(13, 30)
                },
            ]
        );
    }

    #[test]
    fn empty_schedule_is_fully_free() {
        let window = TimeRange {
            starts_at: at(8, 0),
            ends_at: at(9, 0),
        };
        assert_eq!(
            free_slots(window, &[], Duration::zero(), Duration::zero()),
            vec![window]
        );
    }
}
