//! Argument values and resolution against factory hints.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;

use super::expression;
use super::{ArgumentHints, ComponentRegistry};
use crate::error::{GatewayError, GatewayResult};
use crate::ratelimit::{KeyResolver, RateLimiter};
use crate::route::definition::{Args, GENERATED_NAME_PREFIX};

/// A resolved argument: a literal, an expression result or a shared component.
#[derive(Clone)]
pub enum ArgValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Duration(Duration),
    KeyResolver(Arc<dyn KeyResolver>),
    RateLimiter(Arc<dyn RateLimiter>),
}

impl ArgValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ArgValue::Str(_) => "string",
            ArgValue::Int(_) => "integer",
            ArgValue::Float(_) => "float",
            ArgValue::Bool(_) => "boolean",
            ArgValue::Duration(_) => "duration",
            ArgValue::KeyResolver(_) => "key resolver",
            ArgValue::RateLimiter(_) => "rate limiter",
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Str(s) => write!(f, "{}", s),
            ArgValue::Int(i) => write!(f, "{}", i),
            ArgValue::Float(v) => write!(f, "{}", v),
            ArgValue::Bool(b) => write!(f, "{}", b),
            ArgValue::Duration(d) => write!(f, "{}", humantime::format_duration(*d)),
            ArgValue::KeyResolver(r) => write!(f, "{:?}", r),
            ArgValue::RateLimiter(r) => write!(f, "{:?}", r),
        }
    }
}

impl fmt::Debug for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Str(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

impl PartialEq for ArgValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ArgValue::Str(a), ArgValue::Str(b)) => a == b,
            (ArgValue::Int(a), ArgValue::Int(b)) => a == b,
            (ArgValue::Float(a), ArgValue::Float(b)) => a == b,
            (ArgValue::Bool(a), ArgValue::Bool(b)) => a == b,
            (ArgValue::Duration(a), ArgValue::Duration(b)) => a == b,
            (ArgValue::KeyResolver(a), ArgValue::KeyResolver(b)) => Arc::ptr_eq(a, b),
            (ArgValue::RateLimiter(a), ArgValue::RateLimiter(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        ArgValue::Str(s.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        ArgValue::Str(s)
    }
}

impl From<i64> for ArgValue {
    fn from(i: i64) -> Self {
        ArgValue::Int(i)
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        ArgValue::Float(v)
    }
}

impl From<bool> for ArgValue {
    fn from(b: bool) -> Self {
        ArgValue::Bool(b)
    }
}

impl From<Duration> for ArgValue {
    fn from(d: Duration) -> Self {
        ArgValue::Duration(d)
    }
}

impl From<Arc<dyn KeyResolver>> for ArgValue {
    fn from(r: Arc<dyn KeyResolver>) -> Self {
        ArgValue::KeyResolver(r)
    }
}

impl From<Arc<dyn RateLimiter>> for ArgValue {
    fn from(r: Arc<dyn RateLimiter>) -> Self {
        ArgValue::RateLimiter(r)
    }
}

/// Named, typed arguments handed to a factory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentBundle {
    values: IndexMap<String, ArgValue>,
}

impl ArgumentBundle {
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in declaration order.
    pub fn values(&self) -> impl Iterator<Item = &ArgValue> {
        self.values.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn require(&self, name: &str) -> GatewayResult<&ArgValue> {
        self.get(name)
            .ok_or_else(|| GatewayError::missing_argument(name))
    }

    /// Fail unless at least `min` arguments were supplied.
    pub fn validate_min(&self, min: usize, factory: &str) -> GatewayResult<()> {
        if self.len() < min {
            return Err(GatewayError::invalid_argument(
                factory,
                format!("requires at least {} arguments, found {}", min, self.len()),
            ));
        }
        Ok(())
    }

    /// Textual form of a scalar argument.
    pub fn string(&self, name: &str) -> GatewayResult<String> {
        match self.require(name)? {
            v @ (ArgValue::KeyResolver(_) | ArgValue::RateLimiter(_)) => Err(
                GatewayError::invalid_argument(name, format!("expected text, got {}", v.type_name())),
            ),
            v => Ok(v.to_string()),
        }
    }

    pub fn opt_string(&self, name: &str) -> GatewayResult<Option<String>> {
        if self.contains(name) {
            self.string(name).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Parse a scalar argument with `FromStr`.
    pub fn parse<T>(&self, name: &str) -> GatewayResult<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let text = self.string(name)?;
        text.trim()
            .parse()
            .map_err(|e: T::Err| GatewayError::invalid_argument(name, e))
    }

    pub fn f64(&self, name: &str) -> GatewayResult<f64> {
        match self.require(name)? {
            ArgValue::Int(i) => Ok(*i as f64),
            ArgValue::Float(v) => Ok(*v),
            _ => self.parse(name),
        }
    }

    /// Durations accept humantime text (`1s`, `250ms`) or integer milliseconds.
    pub fn duration(&self, name: &str) -> GatewayResult<Duration> {
        match self.require(name)? {
            ArgValue::Duration(d) => Ok(*d),
            ArgValue::Int(ms) if *ms >= 0 => Ok(Duration::from_millis(*ms as u64)),
            ArgValue::Str(s) => match s.parse::<u64>() {
                Ok(ms) => Ok(Duration::from_millis(ms)),
                Err(_) => humantime::parse_duration(s)
                    .map_err(|e| GatewayError::invalid_argument(name, e)),
            },
            other => Err(GatewayError::invalid_argument(
                name,
                format!("expected duration, got {}", other.type_name()),
            )),
        }
    }

    pub fn key_resolver(&self, name: &str) -> GatewayResult<Option<Arc<dyn KeyResolver>>> {
        match self.get(name) {
            None => Ok(None),
            Some(ArgValue::KeyResolver(r)) => Ok(Some(r.clone())),
            Some(other) => Err(GatewayError::invalid_argument(
                name,
                format!("expected key resolver, got {}", other.type_name()),
            )),
        }
    }

    pub fn rate_limiter(&self, name: &str) -> GatewayResult<Option<Arc<dyn RateLimiter>>> {
        match self.get(name) {
            None => Ok(None),
            Some(ArgValue::RateLimiter(r)) => Ok(Some(r.clone())),
            Some(other) => Err(GatewayError::invalid_argument(
                name,
                format!("expected rate limiter, got {}", other.type_name()),
            )),
        }
    }
}

impl<K: Into<String>, V: Into<ArgValue>> FromIterator<(K, V)> for ArgumentBundle {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Binds raw definition arguments to a factory's declared names.
#[derive(Debug, Clone)]
pub struct ArgumentResolver {
    components: Arc<ComponentRegistry>,
}

impl ArgumentResolver {
    pub fn new(components: Arc<ComponentRegistry>) -> Self {
        Self { components }
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    /// Produce the bundle for one definition.
    ///
    /// Positional keys at index `i` take the `i`-th declared name. Values are
    /// trimmed; `#{...}` values are evaluated as expressions.
    pub fn resolve<H>(&self, hints: &H, args: &Args) -> GatewayResult<ArgumentBundle>
    where
        H: ArgumentHints + ?Sized,
    {
        let arg_names = hints.arg_names();
        let validate = hints.validate_args();

        if validate && !arg_names.is_empty() && args.len() != arg_names.len() {
            return Err(GatewayError::ArgumentCountMismatch {
                expected: arg_names.iter().map(|n| n.to_string()).collect(),
                found: args.len(),
            });
        }

        let mut values = IndexMap::with_capacity(args.len());
        for (idx, (key, raw)) in args.iter().enumerate() {
            let key = match arg_names.get(idx) {
                Some(declared) if key.starts_with(GENERATED_NAME_PREFIX) => declared.to_string(),
                _ => key.clone(),
            };
            let value = self.resolve_value(raw)?;
            values.insert(key, value);
        }

        if validate {
            if let Some(missing) = arg_names.iter().find(|n| !values.contains_key(**n)) {
                return Err(GatewayError::missing_argument(*missing));
            }
        }

        Ok(ArgumentBundle { values })
    }

    fn resolve_value(&self, raw: &str) -> GatewayResult<ArgValue> {
        let trimmed = raw.trim();
        match trimmed
            .strip_prefix("#{")
            .and_then(|rest| rest.strip_suffix('}'))
        {
            Some(expr) => expression::evaluate(expr, &self.components),
            None => Ok(ArgValue::Str(trimmed.to_string())),
        }
    }
}
