//! Time-window predicates.
//!
//! Instants are RFC 3339 timestamps or epoch milliseconds.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{predicate_fn, RoutePredicateFactory, SharedPredicate};
use crate::error::{GatewayError, GatewayResult};
use crate::factory::{ArgValue, ArgumentBundle, ArgumentHints, Factory};

const DATETIME_KEY: &str = "datetime";
const DATETIME1_KEY: &str = "datetime1";
const DATETIME2_KEY: &str = "datetime2";

fn instant(args: &ArgumentBundle, name: &str) -> GatewayResult<DateTime<Utc>> {
    let invalid = |reason: &str| GatewayError::invalid_argument(name, reason);

    match args.require(name)? {
        ArgValue::Int(millis) => {
            DateTime::from_timestamp_millis(*millis).ok_or_else(|| invalid("timestamp out of range"))
        }
        ArgValue::Str(text) => {
            if let Ok(millis) = text.parse::<i64>() {
                return DateTime::from_timestamp_millis(millis)
                    .ok_or_else(|| invalid("timestamp out of range"));
            }
            DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| GatewayError::invalid_argument(name, e))
        }
        other => Err(GatewayError::invalid_argument(
            name,
            format!("expected a date-time, got {}", other.type_name()),
        )),
    }
}

/// `After=2017-01-20T17:42:47.789-07:00`
#[derive(Debug, Default)]
pub struct AfterRoutePredicateFactory;

impl ArgumentHints for AfterRoutePredicateFactory {
    fn arg_names(&self) -> &[&'static str] {
        &[DATETIME_KEY]
    }
}

impl Factory for AfterRoutePredicateFactory {
    fn name(&self) -> &str {
        "After"
    }
}

impl RoutePredicateFactory for AfterRoutePredicateFactory {
    fn apply(&self, args: &ArgumentBundle) -> GatewayResult<SharedPredicate> {
        let after = instant(args, DATETIME_KEY)?;
        Ok(predicate_fn(format!("After({})", after), move |_| Utc::now() > after))
    }
}

/// `Before=2017-01-20T17:42:47.789-07:00`
#[derive(Debug, Default)]
pub struct BeforeRoutePredicateFactory;

impl ArgumentHints for BeforeRoutePredicateFactory {
    fn arg_names(&self) -> &[&'static str] {
        &[DATETIME_KEY]
    }
}

impl Factory for BeforeRoutePredicateFactory {
    fn name(&self) -> &str {
        "Before"
    }
}

impl RoutePredicateFactory for BeforeRoutePredicateFactory {
    fn apply(&self, args: &ArgumentBundle) -> GatewayResult<SharedPredicate> {
        let before = instant(args, DATETIME_KEY)?;
        Ok(predicate_fn(format!("Before({})", before), move |_| Utc::now() < before))
    }
}

/// `Between=<start>, <end>`
#[derive(Debug, Default)]
pub struct BetweenRoutePredicateFactory;

impl ArgumentHints for BetweenRoutePredicateFactory {
    fn arg_names(&self) -> &[&'static str] {
        &[DATETIME1_KEY, DATETIME2_KEY]
    }
}

impl Factory for BetweenRoutePredicateFactory {
    fn name(&self) -> &str {
        "Between"
    }
}

impl RoutePredicateFactory for BetweenRoutePredicateFactory {
    fn apply(&self, args: &ArgumentBundle) -> GatewayResult<SharedPredicate> {
        let start = instant(args, DATETIME1_KEY)?;
        let end = instant(args, DATETIME2_KEY)?;
        if start >= end {
            return Err(GatewayError::invalid_argument(
                DATETIME2_KEY,
                format!("{} must be after {}", end, start),
            ));
        }
        Ok(predicate_fn(format!("Between({}, {})", start, end), move |_| {
            let now = Utc::now();
            now > start && now < end
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;
    use chrono::Duration;

    use crate::http::ServerExchange;

    fn exchange() -> ServerExchange {
        ServerExchange::from_parts(Method::GET, "/").unwrap()
    }

    fn rfc3339(dt: DateTime<Utc>) -> String {
        dt.to_rfc3339()
    }

    #[test]
    fn after_and_before() {
        let past = rfc3339(Utc::now() - Duration::hours(1));
        let future = rfc3339(Utc::now() + Duration::hours(1));

        let after_past: ArgumentBundle = [(DATETIME_KEY, past.clone())].into_iter().collect();
        let after_future: ArgumentBundle = [(DATETIME_KEY, future.clone())].into_iter().collect();
        assert!(AfterRoutePredicateFactory.apply(&after_past).unwrap().test(&exchange()));
        assert!(!AfterRoutePredicateFactory.apply(&after_future).unwrap().test(&exchange()));
        assert!(BeforeRoutePredicateFactory.apply(&after_future).unwrap().test(&exchange()));
        assert!(!BeforeRoutePredicateFactory.apply(&after_past).unwrap().test(&exchange()));
    }

    #[test]
    fn between_accepts_epoch_millis() {
        let start = (Utc::now() - Duration::hours(1)).timestamp_millis();
        let end = (Utc::now() + Duration::hours(1)).timestamp_millis();
        let args: ArgumentBundle = [
            (DATETIME1_KEY, ArgValue::from(start.to_string())),
            (DATETIME2_KEY, ArgValue::Int(end)),
        ]
        .into_iter()
        .collect();
        assert!(BetweenRoutePredicateFactory.apply(&args).unwrap().test(&exchange()));
    }

    #[test]
    fn between_rejects_inverted_window() {
        let args: ArgumentBundle = [
            (DATETIME1_KEY, "2017-01-21T17:42:47Z"),
            (DATETIME2_KEY, "2017-01-20T17:42:47Z"),
        ]
        .into_iter()
        .collect();
        assert!(BetweenRoutePredicateFactory.apply(&args).is_err());
    }

    #[test]
    fn rejects_garbage() {
        let args: ArgumentBundle = [(DATETIME_KEY, "yesterday")].into_iter().collect();
        assert!(matches!(
            AfterRoutePredicateFactory.apply(&args),
            Err(GatewayError::InvalidArgument { .. })
        ));
    }
}
