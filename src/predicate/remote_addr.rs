//! Client address predicate over CIDR ranges.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;

use super::{RoutePredicate, RoutePredicateFactory, SharedPredicate};
use crate::error::{GatewayError, GatewayResult};
use crate::factory::{ArgumentBundle, ArgumentHints, Factory};
use crate::http::ServerExchange;

/// An address range such as `192.168.0.0/16`. A bare address is a single host.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct IpNetwork {
    addr: IpAddr,
    prefix: u8,
}

impl IpNetwork {
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.addr, ip.to_canonical()) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                prefix_eq(u32::from(net) as u128, u32::from(ip) as u128, self.prefix, 32)
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                prefix_eq(u128::from(net), u128::from(ip), self.prefix, 128)
            }
            _ => false,
        }
    }
}

fn prefix_eq(a: u128, b: u128, prefix: u8, bits: u8) -> bool {
    if prefix == 0 {
        return true;
    }
    let shift = u32::from(bits - prefix);
    (a >> shift) == (b >> shift)
}

impl FromStr for IpNetwork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = match s.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (s, None),
        };
        let addr: IpAddr = addr
            .trim()
            .parse()
            .map_err(|_| format!("invalid address '{}'", addr))?;
        let max = if addr.is_ipv4() { 32 } else { 128 };
        let prefix = match prefix {
            Some(p) => p
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|p| *p <= max)
                .ok_or_else(|| format!("invalid prefix length '{}'", p))?,
            None => max,
        };
        Ok(Self { addr, prefix })
    }
}

impl fmt::Debug for IpNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

#[derive(Debug)]
struct RemoteAddrPredicate {
    sources: Vec<IpNetwork>,
}

impl RoutePredicate for RemoteAddrPredicate {
    fn test(&self, exchange: &ServerExchange) -> bool {
        exchange
            .request
            .remote_addr
            .is_some_and(|addr| self.sources.iter().any(|net| net.contains(addr.ip())))
    }
}

/// `RemoteAddr=192.168.1.1/24, 10.0.0.1`
///
/// Every argument is a source range; names are ignored.
#[derive(Debug, Default)]
pub struct RemoteAddrRoutePredicateFactory;

impl ArgumentHints for RemoteAddrRoutePredicateFactory {
    fn validate_args(&self) -> bool {
        false
    }
}

impl Factory for RemoteAddrRoutePredicateFactory {
    fn name(&self) -> &str {
        "RemoteAddr"
    }
}

impl RoutePredicateFactory for RemoteAddrRoutePredicateFactory {
    fn apply(&self, args: &ArgumentBundle) -> GatewayResult<SharedPredicate> {
        args.validate_min(1, self.name())?;
        let sources = args
            .iter()
            .map(|(name, value)| {
                value
                    .to_string()
                    .parse::<IpNetwork>()
                    .map_err(|reason| GatewayError::invalid_argument(name, reason))
            })
            .collect::<GatewayResult<Vec<_>>>()?;
        Ok(Arc::new(RemoteAddrPredicate { sources }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;
    use crate::route::definition::generate_name;

    fn net(s: &str) -> IpNetwork {
        s.parse().unwrap()
    }

    #[test]
    fn cidr_containment() {
        assert!(net("192.168.0.0/16").contains("192.168.44.2".parse().unwrap()));
        assert!(!net("192.168.0.0/16").contains("192.169.0.1".parse().unwrap()));
        assert!(net("10.0.0.1").contains("10.0.0.1".parse().unwrap()));
        assert!(!net("10.0.0.1").contains("10.0.0.2".parse().unwrap()));
        assert!(net("0.0.0.0/0").contains("8.8.8.8".parse().unwrap()));
        assert!(net("fd00::/8").contains("fd12::1".parse().unwrap()));
        assert!(net("127.0.0.0/8").contains("::ffff:127.0.0.1".parse().unwrap()));
        assert!(!net("fd00::/8").contains("10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn rejects_bad_ranges() {
        assert!("10.0.0.0/33".parse::<IpNetwork>().is_err());
        assert!("nope/8".parse::<IpNetwork>().is_err());
    }

    #[test]
    fn predicate_checks_client_address() {
        let args: ArgumentBundle = [(generate_name(0), "10.0.0.0/8"), (generate_name(1), "192.168.1.10")]
            .into_iter()
            .collect();
        let predicate = RemoteAddrRoutePredicateFactory.apply(&args).unwrap();

        let mut ex = ServerExchange::from_parts(Method::GET, "/").unwrap();
        assert!(!predicate.test(&ex));

        ex.request.remote_addr = Some("10.20.30.40:5000".parse().unwrap());
        assert!(predicate.test(&ex));

        ex.request.remote_addr = Some("192.168.1.11:5000".parse().unwrap());
        assert!(!predicate.test(&ex));
    }
}
