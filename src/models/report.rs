//! Summary report models.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// `?from=...&to=...`; defaults to the 30 days ending now.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl ReportQuery {
    /// Resolve the reporting window against `now`.
    pub fn window(&self, now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
        let to = self.to.unwrap_or(now);
        let from = self.from.unwrap_or(to - Duration::days(30));
        if to <= from {
            return Err(AppError::invalid("'to' must be after 'from'"));
        }
        if to - from > Duration::days(366) {
            return Err(AppError::invalid("Report window cannot exceed 366 days"));
        }
        Ok((from, to))
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

/// Booked hours per space over the window.
#[derive(Debug, Clone, Serialize)]
pub struct SpaceUtilisation {
    pub space_id: Uuid,
    pub name: String,
    pub bookings: i64,
    pub booked_hours: f64,
    /// Booked hours as a share of the window's hours, 0..=1
    pub utilisation: f64,
}

#[derive(Debug, Serialize)]
pub struct SummaryReport {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub orders_by_status: Vec<StatusCount>,
    pub booked_hours: f64,
    /// Sum of order totals for confirmed and completed orders
    pub gross_booking_value_cents: i64,
    pub payments_collected_cents: i64,
    pub refunds_cents: i64,
    pub net_revenue_cents: i64,
    pub review_count: i64,
    pub average_rating: Option<f64>,
    pub spaces: Vec<SpaceUtilisation>,
}

/// Share of `window_hours` covered by `booked_hours`, rounded to four decimals.
pub fn utilisation(booked_hours: f64, window_hours: f64) -> f64 {
    if window_hours <= 0.0 {
        return 0.0;
    }
    ((booked_hours / window_hours).min(1.0) * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn default_window_is_thirty_days() {
        let now = Utc.with_ymd_and_hms(2025, 3, 31, 12, 0, 0).unwrap();
        let (from, to) = ReportQuery::default().window(now).unwrap();
        assert_eq!(to, now);
        assert_eq!(to - from, Duration::days(30));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let now = Utc::now();
        let query = ReportQuery {
            from: Some(now),
            to: Some(now - Duration::hours(1)),
        };
        assert!(query.window(now).is_err());
    }

    #[test]
    fn utilisation_is_capped() {
        assert_eq!(utilisation(12.0, 48.0), 0.25);
        assert_eq!(utilisation(100.0, 48.0), 1.0);
        assert_eq!(utilisation(1.0, 0.0), 0.0);
    }
}
