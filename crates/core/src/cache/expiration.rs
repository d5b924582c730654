//! Expiration rules: human-readable TTL expressions bound to query ids.
//!
//! An expression is a positive integer followed by a unit token, e.g.
//! `100ms`, `30sec`, `5min`, `2h`. Tokens resolve through a [`UnitTable`]
//! which callers may extend.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use regex::Regex;

use crate::Error;

static EXPRESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([A-Za-z]+)$").expect("expression pattern is valid"));

/// Granularity of a TTL amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
}

impl TimeUnit {
    /// Duration of `amount` units, or `None` on overflow.
    pub fn of(self, amount: i64) -> Option<Duration> {
        match self {
            TimeUnit::Millisecond => Duration::try_milliseconds(amount),
            TimeUnit::Second => Duration::try_seconds(amount),
            TimeUnit::Minute => Duration::try_minutes(amount),
            TimeUnit::Hour => Duration::try_hours(amount),
            TimeUnit::Day => Duration::try_days(amount),
        }
    }

    /// Resolve a unit by its name as written in configuration.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "millisecond" | "milliseconds" => Some(TimeUnit::Millisecond),
            "second" | "seconds" => Some(TimeUnit::Second),
            "minute" | "minutes" => Some(TimeUnit::Minute),
            "hour" | "hours" => Some(TimeUnit::Hour),
            "day" | "days" => Some(TimeUnit::Day),
            _ => None,
        }
    }
}

/// Mapping from unit tokens to [`TimeUnit`]s.
///
/// The default table knows `ms`, `sec`, `min` and `h`. [`TimeUnit::Day`]
/// has no default token and must be mapped explicitly.
#[derive(Debug, Clone)]
pub struct UnitTable {
    tokens: HashMap<String, TimeUnit>,
}

impl Default for UnitTable {
    fn default() -> Self {
        let tokens = [
            ("ms", TimeUnit::Millisecond),
            ("sec", TimeUnit::Second),
            ("min", TimeUnit::Minute),
            ("h", TimeUnit::Hour),
        ]
        .into_iter()
        .map(|(token, unit)| (token.to_string(), unit))
        .collect();
        Self { tokens }
    }
}

impl UnitTable {
    /// Map an additional token (or remap an existing one).
    pub fn with_token(mut self, token: impl Into<String>, unit: TimeUnit) -> Self {
        self.tokens.insert(token.into(), unit);
        self
    }

    pub fn resolve(&self, token: &str) -> Option<TimeUnit> {
        self.tokens.get(token).copied()
    }

    /// Parse `<amount><unit>` into a [`Ttl`].
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedExpression` when the text does not match the
    /// grammar, the amount is zero or too large, or the unit token is unknown.
    pub fn parse(&self, expression: &str) -> Result<Ttl, Error> {
        let caps = EXPRESSION.captures(expression).ok_or_else(|| {
            Error::MalformedExpression(format!("'{expression}' does not match <amount><unit>"))
        })?;

        let amount: i64 = caps[1]
            .parse()
            .map_err(|_| Error::MalformedExpression(format!("'{expression}': amount out of range")))?;
        if amount == 0 {
            return Err(Error::MalformedExpression(format!("'{expression}': amount must be positive")));
        }

        let token = &caps[2];
        let unit = self
            .resolve(token)
            .ok_or_else(|| Error::MalformedExpression(format!("'{expression}': unknown unit '{token}'")))?;

        let duration = unit
            .of(amount)
            .ok_or_else(|| Error::MalformedExpression(format!("'{expression}': duration out of range")))?;

        Ok(Ttl { amount, unit, duration })
    }
}

/// A parsed TTL expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ttl {
    pub amount: i64,
    pub unit: TimeUnit,
    duration: Duration,
}

impl Ttl {
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Absolute expiry relative to `now`, saturating at the maximum instant.
    pub fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.duration).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.amount, self.unit)
    }
}

#[derive(Debug, Clone)]
struct Rule {
    expression: String,
    ttl: Ttl,
}

/// Registry of expiration rules keyed by query id.
///
/// Loading replaces the whole rule set. Lookups take a read lock only.
#[derive(Debug, Default)]
pub struct ExpirationRules {
    units: UnitTable,
    rules: RwLock<HashMap<String, Rule>>,
}

impl ExpirationRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_units(units: UnitTable) -> Self {
        Self { units, rules: RwLock::new(HashMap::new()) }
    }

    pub fn units(&self) -> &UnitTable {
        &self.units
    }

    /// Replace the current rule set with `rules`.
    ///
    /// Every expression is parsed before anything is replaced, so a bad
    /// expression leaves the previous set in effect.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedExpression` naming the first bad rule.
    pub fn load<I, K, E>(&self, rules: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = (K, E)>,
        K: Into<String>,
        E: Into<String>,
    {
        let mut parsed = HashMap::new();
        for (id, expression) in rules {
            let id = id.into();
            let expression = expression.into();
            let ttl = self.units.parse(&expression).map_err(|e| match e {
                Error::MalformedExpression(msg) => Error::MalformedExpression(format!("rule '{id}': {msg}")),
                other => other,
            })?;
            parsed.insert(id, Rule { expression, ttl });
        }

        tracing::info!(rule_count = parsed.len(), "Loaded expiration rules");
        *self.rules.write() = parsed;
        Ok(())
    }

    pub fn is_enabled(&self, id: &str) -> bool {
        self.rules.read().contains_key(id)
    }

    /// Expiry instant for `id` evaluated against `now`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if no rule is registered for `id`.
    pub fn expiry_for(&self, id: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, Error> {
        self.ttl_for(id).map(|ttl| ttl.expiry_from(now))
    }

    /// Parsed TTL registered for `id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if no rule is registered for `id`.
    pub fn ttl_for(&self, id: &str) -> Result<Ttl, Error> {
        self.rules
            .read()
            .get(id)
            .map(|rule| rule.ttl)
            .ok_or_else(|| Error::Configuration(format!("no expiration rule registered for '{id}'")))
    }

    /// The expression text a rule was loaded from.
    pub fn expression_for(&self, id: &str) -> Option<String> {
        self.rules.read().get(id).map(|rule| rule.expression.clone())
    }

    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH
    }

    #[test]
    fn test_parse_default_units() {
        let units = UnitTable::default();
        assert_eq!(units.parse("100ms").unwrap().duration(), Duration::milliseconds(100));
        assert_eq!(units.parse("30sec").unwrap().duration(), Duration::seconds(30));
        assert_eq!(units.parse("5min").unwrap().duration(), Duration::minutes(5));
        assert_eq!(units.parse("2h").unwrap().duration(), Duration::hours(2));
    }

    #[test]
    fn test_parse_rejects_surrounding_whitespace() {
        let units = UnitTable::default();
        for expression in ["  15sec ", " 15sec", "15sec ", "15 sec"] {
            assert!(
                matches!(units.parse(expression), Err(Error::MalformedExpression(_))),
                "{expression:?} should be rejected"
            );
        }
        assert_eq!(units.parse("15sec").unwrap().unit, TimeUnit::Second);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        let units = UnitTable::default();
        for expr in ["", "ms", "100", "10 ms", "-5sec", "1.5h", "sec10", "10ms5"] {
            assert!(
                matches!(units.parse(expr), Err(Error::MalformedExpression(_))),
                "expression {expr:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_parse_rejects_unknown_unit() {
        let err = UnitTable::default().parse("10parsecs").unwrap_err();
        assert!(matches!(err, Error::MalformedExpression(ref msg) if msg.contains("parsecs")));
    }

    #[test]
    fn test_parse_rejects_zero_amount() {
        assert!(matches!(UnitTable::default().parse("0ms"), Err(Error::MalformedExpression(_))));
    }

    #[test]
    fn test_parse_rejects_overflow() {
        assert!(UnitTable::default().parse("99999999999999999999ms").is_err());
        assert!(UnitTable::default().parse("9223372036854775807h").is_err());
    }

    #[test]
    fn test_day_has_no_default_token() {
        let units = UnitTable::default();
        assert!(units.parse("1day").is_err());
        assert!(units.parse("1d").is_err());

        let extended = units.with_token("day", TimeUnit::Day);
        assert_eq!(extended.parse("2day").unwrap().duration(), Duration::days(2));
    }

    #[test]
    fn test_expiry_for_exact_duration() {
        let rules = ExpirationRules::new();
        rules.load([("Q1", "100ms"), ("Q2", "30sec")]).unwrap();

        let now = epoch();
        assert_eq!(rules.expiry_for("Q1", now).unwrap() - now, Duration::milliseconds(100));
        assert_eq!(rules.expiry_for("Q2", now).unwrap() - now, Duration::seconds(30));
    }

    #[test]
    fn test_expiry_for_unregistered_id() {
        let rules = ExpirationRules::new();
        let err = rules.expiry_for("missing", epoch()).unwrap_err();
        assert!(matches!(err, Error::Configuration(ref msg) if msg.contains("missing")));
    }

    #[test]
    fn test_load_replaces_previous_set() {
        let rules = ExpirationRules::new();
        rules.load([("Q1", "100ms")]).unwrap();
        rules.load([("Q2", "1min")]).unwrap();

        assert!(!rules.is_enabled("Q1"));
        assert!(rules.is_enabled("Q2"));
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn test_failed_load_keeps_previous_set() {
        let rules = ExpirationRules::new();
        rules.load([("Q1", "100ms")]).unwrap();

        let err = rules.load([("Q2", "1min"), ("Q3", "soon")]).unwrap_err();
        assert!(matches!(err, Error::MalformedExpression(ref msg) if msg.contains("Q3")));
        assert!(rules.is_enabled("Q1"));
        assert!(!rules.is_enabled("Q2"));
    }

    #[test]
    fn test_expression_for() {
        let rules = ExpirationRules::new();
        rules.load([("Q1", "100ms")]).unwrap();
        assert_eq!(rules.expression_for("Q1").as_deref(), Some("100ms"));
        assert_eq!(rules.expression_for("Q9"), None);
    }

    #[test]
    fn test_expiry_saturates_at_max() {
        let ttl = UnitTable::default().parse("1h").unwrap();
        assert_eq!(ttl.expiry_from(DateTime::<Utc>::MAX_UTC), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_unit_from_name() {
        assert_eq!(TimeUnit::from_name("Day"), Some(TimeUnit::Day));
        assert_eq!(TimeUnit::from_name("seconds"), Some(TimeUnit::Second));
        assert_eq!(TimeUnit::from_name("fortnight"), None);
    }
}
