//! Data models representing database entities and API payloads.
//!
//! Status columns are stored as TEXT with CHECK constraints; the Rust side
//! uses the enums declared with [`string_enum!`] to interpret them.

/// Declare a fieldless enum that round-trips through a fixed lowercase string,
/// both in JSON (serde) and in TEXT columns (`as_str` / `FromStr`).
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $($(#[$vmeta])* #[serde(rename = $text)] $variant),+
        }

        impl $name {
            #[allow(dead_code)]
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::error::AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(crate::error::AppError::invalid(format!(
                        "Unknown {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

/// API key authentication model
pub mod api_key;
/// Business (tenant) model
pub mod business;
/// Connected event-platform publication records
pub mod event_sync;
/// Quantity-based offerings
pub mod listing;
/// Bookings and purchases
pub mod order;
/// Charges and refunds recorded against orders
pub mod payment;
/// Summary reports
pub mod report;
/// Customer reviews
pub mod review;
/// Connected OAuth accounts
pub mod social_account;
/// Bookable spaces, pricing rules and blackouts
pub mod space;
/// Webhook endpoints and deliveries
pub mod webhook;

/// Largest money amount accepted anywhere: one billion in major units.
///
/// Every stored price, fee, surcharge and payment stays at or below this, so
/// sums across a booking or an order's payments fit comfortably in `i64`.
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000;

/// Check a money field is within `0..=MAX_AMOUNT_CENTS`.
pub fn validate_amount(field: &str, cents: i64) -> Result<(), crate::error::AppError> {
    if cents < 0 {
        return Err(crate::error::AppError::invalid(format!(
            "{field} cannot be negative"
        )));
    }
    if cents > MAX_AMOUNT_CENTS {
        return Err(crate::error::AppError::invalid(format!(
            "{field} cannot exceed {MAX_AMOUNT_CENTS}"
        )));
    }
    Ok(())
}

/// Trim a required text field and reject it when empty.
pub fn require_text(field: &str, value: &str) -> Result<String, crate::error::AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(crate::error::AppError::invalid(format!(
            "{field} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// Validate a URL slug: lowercase ASCII letters, digits and single hyphens.
pub fn validate_slug(slug: &str) -> Result<(), crate::error::AppError> {
    let valid = !slug.is_empty()
        && slug.len() <= 80
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

    if valid {
        Ok(())
    } else {
        Err(crate::error::AppError::invalid(format!(
            "Invalid slug '{slug}': use lowercase letters, digits and hyphens"
        )))
    }
}

/// Validate an ISO 4217 style currency code and normalise it to uppercase.
pub fn normalize_currency(code: &str) -> Result<String, crate::error::AppError> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(code)
    } else {
        Err(crate::error::AppError::invalid(format!(
            "Invalid currency code '{code}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    string_enum! {
        enum Colour {
            Red => "red",
            DarkBlue => "dark_blue",
        }
    }

    #[test]
    fn string_enum_round_trips_text() {
        assert_eq!(Colour::DarkBlue.as_str(), "dark_blue");
        assert_eq!("red".parse::<Colour>().unwrap(), Colour::Red);
        assert!("green".parse::<Colour>().is_err());
        assert_eq!(
            serde_json::to_string(&Colour::DarkBlue).unwrap(),
            "\"dark_blue\""
        );
        assert_eq!(Colour::ALL.len(), 2);
    }

    #[test]
    fn slugs() {
        assert!(validate_slug("rooftop-loft-2").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("Rooftop").is_err());
        assert!(validate_slug("-loft").is_err());
        assert!(validate_slug("loft--a").is_err());
        assert!(validate_slug("loft space").is_err());
    }

    #[test]
    fn currencies() {
        assert_eq!(normalize_currency(" usd ").unwrap(), "USD");
        assert!(normalize_currency("US").is_err());
        assert!(normalize_currency("U$D").is_err());
    }

    #[test]
    fn amounts_are_bounded() {
        assert!(validate_amount("price_cents", 0).is_ok());
        assert!(validate_amount("price_cents", MAX_AMOUNT_CENTS).is_ok());
        assert!(validate_amount("price_cents", -1).is_err());
        assert!(validate_amount("price_cents", MAX_AMOUNT_CENTS + 1).is_err());
        assert!(validate_amount("price_cents", i64::MAX).is_err());
    }

    #[test]
    fn required_text_is_trimmed() {
        assert_eq!(require_text("name", "  Loft ").unwrap(), "Loft");
        assert!(require_text("name", "   ").is_err());
    }
}
