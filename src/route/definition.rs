//! Declarative route definitions.
//!
//! # Responsibilities
//! - Plain, serializable description of predicates, filters, target and order
//! - Textual shorthand parsing (`Name=arg0,arg1` and `id=uri,Pred=..,Pred=..`)
//! - Structural validation before a definition is accepted
//!
//! # Design Decisions
//! - Positional arguments get generated keys (`_genkey_0`, ...) that the
//!   argument resolver later rewrites to the factory's declared names
//! - Argument maps keep insertion order; positional rewriting depends on it
//! - Predicates and filters deserialize from either `{name, args}` objects or
//!   shorthand strings, so config files and the admin API accept both

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{GatewayError, GatewayResult};

/// Prefix for keys of positionally supplied arguments.
pub const GENERATED_NAME_PREFIX: &str = "_genkey_";

/// Ordered raw argument map of a predicate or filter definition.
pub type Args = IndexMap<String, String>;

/// Generated key for the positional argument at `index`.
pub fn generate_name(index: usize) -> String {
    format!("{}{}", GENERATED_NAME_PREFIX, index)
}

/// Split on commas, trimming tokens and dropping empty ones.
fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(',').map(str::trim).filter(|t| !t.is_empty())
}

fn parse_name_args(kind: &'static str, text: &str) -> GatewayResult<(String, Args)> {
    let eq_idx = match text.find('=') {
        Some(idx) if idx > 0 => idx,
        _ => {
            return Err(GatewayError::Parse {
                kind,
                text: text.to_string(),
            })
        }
    };

    let name = text[..eq_idx].trim().to_string();
    let args = tokenize(&text[eq_idx + 1..])
        .enumerate()
        .map(|(i, arg)| (generate_name(i), arg.to_string()))
        .collect();
    Ok((name, args))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DefinitionRepr {
    Text(String),
    Full {
        name: String,
        #[serde(default)]
        args: Args,
    },
}

macro_rules! named_definition {
    ($(#[$meta:meta])* $ty:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(try_from = "DefinitionRepr")]
        pub struct $ty {
            /// Factory name this definition resolves against.
            pub name: String,
            /// Raw arguments, either named or positional.
            #[serde(default)]
            pub args: Args,
        }

        impl $ty {
            pub fn new(name: impl Into<String>) -> Self {
                Self {
                    name: name.into(),
                    args: Args::new(),
                }
            }

            /// Builder-style named argument.
            pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
                self.add_arg(key, value);
                self
            }

            pub fn add_arg(&mut self, key: impl Into<String>, value: impl Into<String>) {
                self.args.insert(key.into(), value.into());
            }
        }

        impl FromStr for $ty {
            type Err = GatewayError;

            fn from_str(text: &str) -> Result<Self, Self::Err> {
                let (name, args) = parse_name_args($kind, text)?;
                Ok(Self { name, args })
            }
        }

        impl TryFrom<DefinitionRepr> for $ty {
            type Error = GatewayError;

            fn try_from(repr: DefinitionRepr) -> Result<Self, Self::Error> {
                match repr {
                    DefinitionRepr::Text(text) => text.parse(),
                    DefinitionRepr::Full { name, args } => Ok(Self { name, args }),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}=", self.name)?;
                for (i, value) in self.args.values().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", value)?;
                }
                Ok(())
            }
        }
    };
}

named_definition!(
    /// A route predicate before compilation, e.g. `Path=/get`.
    PredicateDefinition,
    "PredicateDefinition"
);

named_definition!(
    /// A route filter before compilation, e.g. `AddRequestHeader=X-Foo, bar`.
    FilterDefinition,
    "FilterDefinition"
);

fn generate_route_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Declarative description of a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDefinition {
    #[serde(default = "generate_route_id")]
    pub id: String,

    /// AND-combined, evaluated in declaration order. At least one is required.
    #[serde(default)]
    pub predicates: Vec<PredicateDefinition>,

    #[serde(default)]
    pub filters: Vec<FilterDefinition>,

    /// Absolute target URI; `lb://<service>` resolves through the load balancer.
    pub uri: Url,

    /// Lower sorts first when several routes match.
    #[serde(default)]
    pub order: i32,

    /// Compile without the configured `default_filters`.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skip_default_filters: bool,
}

impl RouteDefinition {
    pub fn new(id: impl Into<String>, uri: Url) -> Self {
        Self {
            id: id.into(),
            predicates: Vec::new(),
            filters: Vec::new(),
            uri,
            order: 0,
            skip_default_filters: false,
        }
    }

    pub fn predicate(mut self, predicate: PredicateDefinition) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn filter(mut self, filter: FilterDefinition) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn without_default_filters(mut self) -> Self {
        self.skip_default_filters = true;
        self
    }

    /// Check the structural invariants a stored definition must satisfy.
    pub fn validate(&self) -> GatewayResult<()> {
        let invalid = |reason: &str| GatewayError::InvalidRoute {
            id: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id must not be empty"));
        }
        if self.predicates.is_empty() {
            return Err(invalid("at least one predicate is required"));
        }
        if self.uri.cannot_be_a_base() || self.uri.host_str().is_none() {
            return Err(invalid("uri must be absolute with a host"));
        }
        if let Some(p) = self.predicates.iter().find(|p| p.name.trim().is_empty()) {
            return Err(invalid(&format!("predicate '{}' has no name", p)));
        }
        if let Some(f) = self.filters.iter().find(|f| f.name.trim().is_empty()) {
            return Err(invalid(&format!("filter '{}' has no name", f)));
        }
        Ok(())
    }
}

impl FromStr for RouteDefinition {
    type Err = GatewayError;

    /// Parse `id=uri,Name=arg0,arg1,Name2=arg0`.
    ///
    /// A segment without `=` continues the argument list of the preceding
    /// predicate; before any predicate it is a parse error.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let parse_error = || GatewayError::Parse {
            kind: "RouteDefinition",
            text: text.to_string(),
        };

        let eq_idx = match text.find('=') {
            Some(idx) if idx > 0 => idx,
            _ => return Err(parse_error()),
        };
        if text[..eq_idx].contains(',') {
            return Err(parse_error());
        }

        let id = text[..eq_idx].trim().to_string();
        let mut tokens = tokenize(&text[eq_idx + 1..]);
        let uri = tokens
            .next()
            .ok_or_else(parse_error)?
            .parse::<Url>()
            .map_err(|_| parse_error())?;

        let mut predicates: Vec<PredicateDefinition> = Vec::new();
        for token in tokens {
            if token.contains('=') {
                predicates.push(token.parse()?);
            } else {
                let last = predicates.last_mut().ok_or_else(|| GatewayError::Parse {
                    kind: "PredicateDefinition",
                    text: token.to_string(),
                })?;
                let next = generate_name(last.args.len());
                last.args.insert(next, token.to_string());
            }
        }

        Ok(Self {
            id,
            predicates,
            filters: Vec::new(),
            uri,
            order: 0,
            skip_default_filters: false,
        })
    }
}
