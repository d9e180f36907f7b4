//! Quote calculation for space bookings.
//!
//! A quote is a pure function of the space's pricing fields, its pricing
//! rules and the requested slot. No I/O happens here; the same inputs always
//! produce the same quote.
//!
//! # Arithmetic
//!
//! Time-based charges are accumulated exactly as `rate × (10000 + bps) × minutes`
//! in `i128` and divided once at the end, so splitting a booking into hourly
//! segments never accumulates rounding error. Rounding is half away from zero.
//! Every amount that leaves the engine is checked back into `i64` and against
//! [`MAX_AMOUNT_CENTS`]; a price that does not fit is a `QuoteError`, never a
//! wrapped or panicking sum.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Offset, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::{MAX_AMOUNT_CENTS, validate_amount},
};

/// Booking start and end must sit on this grid.
pub const SLOT_GRANULARITY_MINUTES: i64 = 15;

/// Longest bookable span.
pub const MAX_BOOKING_DAYS: i64 = 30;

const BPS_SCALE: i128 = 10_000;

/// A pricing rule attached to a space.
///
/// Stored as JSONB, tagged by `type`:
///
/// ```json
/// { "type": "time_window", "days": ["Fri", "Sat"], "start_hour": 18, "end_hour": 24, "adjustment_bps": 2500 }
/// { "type": "duration_discount", "min_hours": 8, "discount_bps": 1500 }
/// { "type": "guest_surcharge", "above_guests": 50, "per_guest_cents": 500 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PricingRule {
    /// Adjust the hourly rate inside a weekly local-time window.
    ///
    /// `start_hour > end_hour` wraps past midnight (e.g. 22 → 2).
    TimeWindow {
        days: Vec<Weekday>,
        start_hour: u32,
        end_hour: u32,
        adjustment_bps: i32,
    },
    /// Percentage off the time-based charge for long bookings.
    DurationDiscount { min_hours: u32, discount_bps: u32 },
    /// Flat charge per guest above a threshold.
    GuestSurcharge {
        above_guests: u32,
        per_guest_cents: i64,
    },
}

/// A rule with its precedence. Higher priority wins among overlapping windows.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedRule {
    pub priority: i32,
    pub rule: PricingRule,
}

/// Pricing-relevant fields of a space.
#[derive(Debug, Clone)]
pub struct SpacePricing {
    pub hourly_rate_cents: i64,
    pub minimum_hours: i32,
    pub capacity: i32,
    pub cleaning_fee_cents: i64,
    pub tax_rate_bps: i32,
    pub utc_offset_minutes: i32,
    pub currency: String,
}

/// The slot being priced.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteRequest {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub guests: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub label: String,
    pub amount_cents: i64,
}

/// Itemised price for a slot. `line_items` always sum to `total_cents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub currency: String,
    pub duration_minutes: i64,
    pub base_cents: i64,
    pub time_adjustment_cents: i64,
    pub discount_cents: i64,
    pub guest_surcharge_cents: i64,
    pub cleaning_fee_cents: i64,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub line_items: Vec<LineItem>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuoteError {
    #[error("ends_at must be after starts_at")]
    EmptyRange,

    #[error("Bookings must start and end on 15-minute boundaries")]
    OffGrid,

    #[error("Bookings must be at least {0} hour(s)")]
    BelowMinimum(i32),

    #[error("Bookings cannot exceed 30 days")]
    TooLong,

    #[error("Guest count must be between 1 and {0}")]
    Guests(i32),

    #[error("Quoted amount exceeds the maximum of {MAX_AMOUNT_CENTS} cents")]
    AmountTooLarge,
}

impl From<QuoteError> for AppError {
    fn from(error: QuoteError) -> Self {
        AppError::InvalidRequest(error.to_string())
    }
}

/// Validate a rule before it is stored.
pub fn validate_rule(rule: &PricingRule) -> Result<(), AppError> {
    match rule {
        PricingRule::TimeWindow {
            days,
            start_hour,
            end_hour,
            adjustment_bps,
        } => {
            if days.is_empty() {
                return Err(AppError::invalid("time_window needs at least one day"));
            }
            if *start_hour > 23 || *end_hour > 24 || start_hour == end_hour {
                return Err(AppError::invalid(
                    "time_window hours must satisfy 0 <= start_hour <= 23, end_hour <= 24, start != end",
                ));
            }
            if !(-10_000..=100_000).contains(adjustment_bps) {
                return Err(AppError::invalid(
                    "adjustment_bps must be between -10000 and 100000",
                ));
            }
        }
        PricingRule::DurationDiscount {
            min_hours,
            discount_bps,
        } => {
            if *min_hours == 0 || !(1..=10_000).contains(discount_bps) {
                return Err(AppError::invalid(
                    "duration_discount needs min_hours >= 1 and 1 <= discount_bps <= 10000",
                ));
            }
        }
        PricingRule::GuestSurcharge {
            per_guest_cents, ..
        } => {
            validate_amount("per_guest_cents", *per_guest_cents)?;
        }
    }
    Ok(())
}

/// Check that a requested slot is well-formed for this space.
fn validate_slot(space: &SpacePricing, request: &QuoteRequest) -> Result<i64, QuoteError> {
    if request.ends_at <= request.starts_at {
        return Err(QuoteError::EmptyRange);
    }

    let grid = SLOT_GRANULARITY_MINUTES * 60;
    let on_grid = |t: &DateTime<Utc>| t.timestamp() % grid == 0 && t.timestamp_subsec_nanos() == 0;
    if !on_grid(&request.starts_at) || !on_grid(&request.ends_at) {
        return Err(QuoteError::OffGrid);
    }

    let duration = request.ends_at - request.starts_at;
    if duration > Duration::days(MAX_BOOKING_DAYS) {
        return Err(QuoteError::TooLong);
    }

    let minutes = duration.num_minutes();
    if minutes < i64::from(space.minimum_hours) * 60 {
        return Err(QuoteError::BelowMinimum(space.minimum_hours));
    }

    if request.guests < 1 || request.guests > space.capacity {
        return Err(QuoteError::Guests(space.capacity));
    }

    Ok(minutes)
}

/// Price a slot.
pub fn quote(
    space: &SpacePricing,
    rules: &[RankedRule],
    request: &QuoteRequest,
) -> Result<Quote, QuoteError> {
    let duration_minutes = validate_slot(space, request)?;

    let offset = FixedOffset::east_opt(space.utc_offset_minutes * 60).unwrap_or(Utc.fix());
    let end = request.ends_at.with_timezone(&offset);
    let mut cursor = request.starts_at.with_timezone(&offset);

    let rate = i128::from(space.hourly_rate_cents);
    let mut base_acc: i128 = 0;
    let mut adjusted_acc: i128 = 0;

    // Walk the slot in segments split at local hour boundaries.
    while cursor < end {
        let hour_start = cursor
            .with_minute(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(cursor);
        let segment_end = (hour_start + Duration::hours(1)).min(end);
        let minutes = i128::from((segment_end - cursor).num_minutes());

        let adjustment = window_adjustment(rules, cursor.weekday(), cursor.hour());
        base_acc += rate * BPS_SCALE * minutes;
        adjusted_acc += rate * (BPS_SCALE + i128::from(adjustment)) * minutes;

        cursor = segment_end;
    }

    let base = div_round(base_acc, BPS_SCALE * 60);
    let time_total = div_round(adjusted_acc, BPS_SCALE * 60);

    let discount_bps = best_duration_discount(rules, duration_minutes);
    let discount = div_round(time_total * i128::from(discount_bps), BPS_SCALE);

    let mut guest_surcharge: i128 = 0;
    for ranked in rules {
        if let PricingRule::GuestSurcharge {
            above_guests,
            per_guest_cents,
        } = ranked.rule
        {
            let extra = i128::from(request.guests) - i128::from(above_guests);
            if extra > 0 {
                guest_surcharge += extra * i128::from(per_guest_cents);
            }
        }
    }

    let base_cents = to_cents(base)?;
    let time_adjustment_cents = to_cents(time_total - base)?;
    let discount_cents = to_cents(discount)?;
    let guest_surcharge_cents = to_cents(guest_surcharge)?;

    let subtotal_cents = to_cents(
        time_total - discount + guest_surcharge + i128::from(space.cleaning_fee_cents),
    )?;
    let tax_cents = to_cents(div_round(
        i128::from(subtotal_cents) * i128::from(space.tax_rate_bps),
        BPS_SCALE,
    ))?;
    let total_cents = subtotal_cents
        .checked_add(tax_cents)
        .filter(|total| *total <= MAX_AMOUNT_CENTS)
        .ok_or(QuoteError::AmountTooLarge)?;

    let mut line_items = vec![LineItem {
        label: format!(
            "{} at {} per hour",
            format_duration(duration_minutes),
            format_cents(space.hourly_rate_cents, &space.currency)
        ),
        amount_cents: base_cents,
    }];
    if time_adjustment_cents != 0 {
        line_items.push(LineItem {
            label: "Time-of-week adjustment".to_string(),
            amount_cents: time_adjustment_cents,
        });
    }
    if discount_cents != 0 {
        line_items.push(LineItem {
            label: format!("Duration discount ({})", format_bps(discount_bps)),
            amount_cents: -discount_cents,
        });
    }
    if guest_surcharge_cents != 0 {
        line_items.push(LineItem {
            label: "Additional guests".to_string(),
            amount_cents: guest_surcharge_cents,
        });
    }
    if space.cleaning_fee_cents != 0 {
        line_items.push(LineItem {
            label: "Cleaning fee".to_string(),
            amount_cents: space.cleaning_fee_cents,
        });
    }
    if tax_cents != 0 {
        line_items.push(LineItem {
            label: format!("Tax ({})", format_bps(space.tax_rate_bps.unsigned_abs())),
            amount_cents: tax_cents,
        });
    }

    Ok(Quote {
        currency: space.currency.clone(),
        duration_minutes,
        base_cents,
        time_adjustment_cents,
        discount_cents,
        guest_surcharge_cents,
        cleaning_fee_cents: space.cleaning_fee_cents,
        subtotal_cents,
        tax_cents,
        total_cents,
        line_items,
    })
}

/// Adjustment of the highest-priority window covering this local hour.
fn window_adjustment(rules: &[RankedRule], day: Weekday, hour: u32) -> i32 {
    let mut best: Option<(i32, i32)> = None;

    for ranked in rules {
        if let PricingRule::TimeWindow {
            days,
            start_hour,
            end_hour,
            adjustment_bps,
        } = &ranked.rule
        {
            if !window_covers(days, *start_hour, *end_hour, day, hour) {
                continue;
            }
            // Strictly greater keeps the first rule on ties.
            if best.is_none_or(|(priority, _)| ranked.priority > priority) {
                best = Some((ranked.priority, *adjustment_bps));
            }
        }
    }

    best.map_or(0, |(_, bps)| bps)
}

fn window_covers(days: &[Weekday], start: u32, end: u32, day: Weekday, hour: u32) -> bool {
    if start < end {
        days.contains(&day) && hour >= start && hour < end
    } else if hour >= start {
        // Evening part of a window that wraps past midnight.
        days.contains(&day)
    } else if hour < end {
        // Early-morning part belongs to the window that opened the previous day.
        days.contains(&day.pred())
    } else {
        false
    }
}

fn best_duration_discount(rules: &[RankedRule], duration_minutes: i64) -> u32 {
    rules
        .iter()
        .filter_map(|r| match r.rule {
            PricingRule::DurationDiscount {
                min_hours,
                discount_bps,
            } if i64::from(min_hours) * 60 <= duration_minutes => Some((min_hours, discount_bps)),
            _ => None,
        })
        .max_by_key(|(min_hours, _)| *min_hours)
        .map_or(0, |(_, bps)| bps)
}

/// Integer division rounding half away from zero. `d` must be positive.
fn div_round(n: i128, d: i128) -> i128 {
    if n >= 0 {
        (n + d / 2) / d
    } else {
        -((-n + d / 2) / d)
    }
}

/// Narrow an intermediate amount, rejecting anything beyond the money cap.
fn to_cents(value: i128) -> Result<i64, QuoteError> {
    if value.abs() > i128::from(MAX_AMOUNT_CENTS) {
        return Err(QuoteError::AmountTooLarge);
    }
    i64::try_from(value).map_err(|_| QuoteError::AmountTooLarge)
}

fn format_duration(minutes: i64) -> String {
    match (minutes / 60, minutes % 60) {
        (h, 0) => format!("{h}h"),
        (0, m) => format!("{m}m"),
        (h, m) => format!("{h}h {m}m"),
    }
}

fn format_cents(cents: i64, currency: &str) -> String {
    format!("{}.{:02} {currency}", cents / 100, (cents % 100).abs())
}

fn format_bps(bps: u32) -> String {
    if bps % 100 == 0 {
        format!("{}%", bps / 100)
    } else {
        format!("{}.{:02}%", bps / 100, bps % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn space() -> SpacePricing {
        SpacePricing {
            hourly_rate_cents: 10_000,
            minimum_hours: 2,
            capacity: 40,
            cleaning_fee_cents: 7_500,
            tax_rate_bps: 825,
            utc_offset_minutes: 0,
            currency: "USD".to_string(),
        }
    }

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        // January 2025: the 3rd is a Friday.
        Utc.with_ymd_and_hms(2025, 1, day, hour, minute, 0).unwrap()
    }

    fn request(start: DateTime<Utc>, end: DateTime<Utc>, guests: i32) -> QuoteRequest {
        QuoteRequest {
            starts_at: start,
            ends_at: end,
            guests,
        }
    }

    fn friday_peak() -> RankedRule {
        RankedRule {
            priority: 0,
            rule: PricingRule::TimeWindow {
                days: vec![Weekday::Fri, Weekday::Sat],
                start_hour: 18,
                end_hour: 24,
                adjustment_bps: 5_000,
            },
        }
    }

    fn full_rules() -> Vec<RankedRule> {
        vec![
            friday_peak(),
            RankedRule {
                priority: 0,
                rule: PricingRule::DurationDiscount {
                    min_hours: 3,
                    discount_bps: 500,
                },
            },
            RankedRule {
                priority: 0,
                rule: PricingRule::DurationDiscount {
                    min_hours: 4,
                    discount_bps: 1_000,
                },
            },
            RankedRule {
                priority: 0,
                rule: PricingRule::GuestSurcharge {
                    above_guests: 20,
                    per_guest_cents: 500,
                },
            },
        ]
    }

    #[test]
    fn full_quote_breakdown() {
        let quote = quote(&space(), &full_rules(), &request(at(3, 16, 0), at(3, 20, 0), 30)).unwrap();

        assert_eq!(quote.duration_minutes, 240);
        assert_eq!(quote.base_cents, 40_000);
        assert_eq!(quote.time_adjustment_cents, 10_000);
        // 4h tier beats the 3h tier.
        assert_eq!(quote.discount_cents, 5_000);
        assert_eq!(quote.guest_surcharge_cents, 5_000);
        assert_eq!(quote.subtotal_cents, 57_500);
        // 57500 * 8.25% = 4743.75
        assert_eq!(quote.tax_cents, 4_744);
        assert_eq!(quote.total_cents, 62_244);
    }

    #[test]
    fn line_items_sum_to_total() {
        let quote = quote(&space(), &full_rules(), &request(at(3, 16, 0), at(3, 20, 0), 30)).unwrap();
        let sum: i64 = quote.line_items.iter().map(|i| i.amount_cents).sum();
        assert_eq!(sum, quote.total_cents);
        assert_eq!(quote.line_items[0].label, "4h at 100.00 USD per hour");
    }

    #[test]
    fn quote_is_deterministic() {
        let req = request(at(3, 16, 0), at(3, 20, 0), 30);
        assert_eq!(
            quote(&space(), &full_rules(), &req).unwrap(),
            quote(&space(), &full_rules(), &req).unwrap()
        );
    }

    #[test]
    fn windows_use_local_time() {
        let mut space = space();
        space.utc_offset_minutes = -300;
        space.cleaning_fee_cents = 0;
        space.tax_rate_bps = 0;

        // 23:00Z Friday = 18:00 local Friday.
        let quote = quote(
            &space,
            &[friday_peak()],
            &request(at(3, 23, 0), at(4, 1, 0), 10),
        )
        .unwrap();
        assert_eq!(quote.base_cents, 20_000);
        assert_eq!(quote.time_adjustment_cents, 10_000);
    }

    #[test]
    fn overnight_window_wraps_into_next_day() {
        let mut space = space();
        space.cleaning_fee_cents = 0;
        space.tax_rate_bps = 0;
        let late_night = RankedRule {
            priority: 0,
            rule: PricingRule::TimeWindow {
                days: vec![Weekday::Fri],
                start_hour: 22,
                end_hour: 2,
                adjustment_bps: 10_000,
            },
        };

        // Fri 21:00 -> Sat 03:00: 22,23 (Fri) and 00,01 (Sat, window opened Friday) are doubled.
        let quote = quote(&space, &[late_night], &request(at(3, 21, 0), at(4, 3, 0), 5)).unwrap();
        assert_eq!(quote.base_cents, 60_000);
        assert_eq!(quote.time_adjustment_cents, 40_000);
    }

    #[test]
    fn highest_priority_window_wins() {
        let mut space = space();
        space.cleaning_fee_cents = 0;
        space.tax_rate_bps = 0;
        let rules = vec![
            friday_peak(),
            RankedRule {
                priority: 10,
                rule: PricingRule::TimeWindow {
                    days: vec![Weekday::Fri],
                    start_hour: 18,
                    end_hour: 20,
                    adjustment_bps: -2_000,
                },
            },
        ];

        let quote = quote(&space, &rules, &request(at(3, 18, 0), at(3, 20, 0), 5)).unwrap();
        assert_eq!(quote.time_adjustment_cents, -4_000);
    }

    #[test]
    fn partial_hours_round_once() {
        let space = SpacePricing {
            hourly_rate_cents: 1_999,
            minimum_hours: 0,
            capacity: 10,
            cleaning_fee_cents: 0,
            tax_rate_bps: 0,
            utc_offset_minutes: 0,
            currency: "EUR".to_string(),
        };

        // 1999 * 0.25 = 499.75
        let quote = quote(&space, &[], &request(at(6, 9, 0), at(6, 9, 15), 1)).unwrap();
        assert_eq!(quote.total_cents, 500);

        // 1999 * 1.75 = 3498.25, computed across two segments.
        let quote = super::quote(&space, &[], &request(at(6, 9, 30), at(6, 11, 15), 1)).unwrap();
        assert_eq!(quote.total_cents, 3_498);
    }

    #[test]
    fn rejects_invalid_slots() {
        let space = space();
        assert_eq!(
            quote(&space, &[], &request(at(3, 12, 0), at(3, 12, 0), 1)),
            Err(QuoteError::EmptyRange)
        );
        assert_eq!(
            quote(&space, &[], &request(at(3, 12, 10), at(3, 15, 0), 1)),
            Err(QuoteError::OffGrid)
        );
        assert_eq!(
            quote(&space, &[], &request(at(3, 12, 0), at(3, 13, 0), 1)),
            Err(QuoteError::BelowMinimum(2))
        );
        assert_eq!(
            quote(&space, &[], &request(at(3, 12, 0), at(3, 15, 0), 0)),
            Err(QuoteError::Guests(40))
        );
        assert_eq!(
            quote(&space, &[], &request(at(3, 12, 0), at(3, 15, 0), 41)),
            Err(QuoteError::Guests(40))
        );
        assert_eq!(
            quote(
                &space,
                &[],
                &request(at(1, 0, 0), at(1, 0, 0) + Duration::days(31), 1)
            ),
            Err(QuoteError::TooLong)
        );
    }

    #[test]
    fn rule_validation() {
        assert!(validate_rule(&friday_peak().rule).is_ok());
        assert!(
            validate_rule(&PricingRule::TimeWindow {
                days: vec![],
                start_hour: 1,
                end_hour: 2,
                adjustment_bps: 0
            })
            .is_err()
        );
        assert!(
            validate_rule(&PricingRule::TimeWindow {
                days: vec![Weekday::Mon],
                start_hour: 5,
                end_hour: 5,
                adjustment_bps: 0
            })
            .is_err()
        );
        assert!(
            validate_rule(&PricingRule::DurationDiscount {
                min_hours: 4,
                discount_bps: 20_000
            })
            .is_err()
        );
        assert!(
            validate_rule(&PricingRule::GuestSurcharge {
                above_guests: 10,
                per_guest_cents: -1
            })
            .is_err()
        );
        assert!(
            validate_rule(&PricingRule::GuestSurcharge {
                above_guests: 0,
                per_guest_cents: i64::MAX / 2
            })
            .is_err()
        );
    }

    #[test]
    fn oversized_amounts_are_rejected_not_overflowed() {
        let surcharge = RankedRule {
            priority: 0,
            rule: PricingRule::GuestSurcharge {
                above_guests: 0,
                per_guest_cents: i64::MAX / 2,
            },
        };
        assert_eq!(
            quote(&space(), &[surcharge], &request(at(3, 12, 0), at(3, 15, 0), 3)),
            Err(QuoteError::AmountTooLarge)
        );

        let mut space = space();
        space.hourly_rate_cents = i64::MAX / 4;
        space.cleaning_fee_cents = i64::MAX / 2;
        assert_eq!(
            quote(&space, &[], &request(at(3, 12, 0), at(3, 15, 0), 3)),
            Err(QuoteError::AmountTooLarge)
        );

        // The largest storable rate for the longest booking still prices.
        let space = SpacePricing {
            hourly_rate_cents: MAX_AMOUNT_CENTS / (24 * MAX_BOOKING_DAYS),
            minimum_hours: 0,
            capacity: 10,
            cleaning_fee_cents: 0,
            tax_rate_bps: 0,
            utc_offset_minutes: 0,
            currency: "USD".to_string(),
        };
        let long = request(at(1, 0, 0), at(1, 0, 0) + Duration::days(MAX_BOOKING_DAYS), 1);
        assert!(quote(&space, &[], &long).unwrap().total_cents <= MAX_AMOUNT_CENTS);
    }

    #[test]
    fn amount_too_large_is_a_bad_request() {
        assert!(matches!(
            AppError::from(QuoteError::AmountTooLarge),
            AppError::InvalidRequest(_)
        ));
    }

    #[test]
    fn rules_deserialize_from_tagged_json() {
        let rule: PricingRule = serde_json::from_str(
            r#"{"type":"time_window","days":["Fri","Sat"],"start_hour":18,"end_hour":24,"adjustment_bps":2500}"#,
        )
        .unwrap();
        assert!(matches!(rule, PricingRule::TimeWindow { adjustment_bps: 2500, .. }));
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(div_round(5, 10), 1);
        assert_eq!(div_round(4, 10), 0);
        assert_eq!(div_round(-5, 10), -1);
        assert_eq!(div_round(-4, 10), 0);
    }
}
