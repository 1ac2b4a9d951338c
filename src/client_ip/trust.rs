//! Trusted proxy networks.

use std::net::IpAddr;

use ipnet::IpNet;

/// The operator's own proxy infrastructure, as CIDR prefixes.
///
/// Built once from configuration and then only read. Prefixes are
/// normalized (host bits cleared), sorted, and overlapping ranges merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustedPrefixSet {
    prefixes: Vec<IpNet>,
}

impl TrustedPrefixSet {
    pub fn new(prefixes: &[IpNet]) -> Self {
        let truncated: Vec<IpNet> = prefixes.iter().map(IpNet::trunc).collect();
        Self {
            prefixes: IpNet::aggregate(&truncated),
        }
    }

    /// Parse CIDR strings such as `"10.0.0.0/8"` or `"fd00::/8"`.
    pub fn parse<I, S>(prefixes: I) -> Result<Self, ipnet::AddrParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed = prefixes
            .into_iter()
            .map(|p| p.as_ref().trim().parse::<IpNet>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(&parsed))
    }

    /// True if any trusted prefix contains `addr`.
    ///
    /// IPv4-mapped IPv6 addresses are checked as their IPv4 form.
    pub fn contains(&self, addr: &IpAddr) -> bool {
        let addr = addr.to_canonical();
        self.prefixes.iter().any(|prefix| prefix.contains(&addr))
    }

    /// Drop every trusted candidate, keeping the order of the rest.
    pub fn filter_untrusted(&self, candidates: Vec<IpAddr>) -> Vec<IpAddr> {
        candidates
            .into_iter()
            .filter(|addr| !self.contains(addr))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    pub fn prefixes(&self) -> &[IpNet] {
        &self.prefixes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_contains() {
        let set = TrustedPrefixSet::parse(["10.0.0.0/8", "fd00::/8"]).unwrap();
        assert!(set.contains(&ip("10.1.2.3")));
        assert!(set.contains(&ip("fd12::1")));
        assert!(!set.contains(&ip("11.0.0.1")));
        assert!(!set.contains(&ip("2001:db8::1")));
    }

    #[test]
    fn test_ipv4_mapped_matches_v4_prefix() {
        let set = TrustedPrefixSet::parse(["192.168.0.0/16"]).unwrap();
        assert!(set.contains(&ip("::ffff:192.168.4.4")));
    }

    #[test]
    fn test_host_bits_and_overlap_normalized() {
        let set = TrustedPrefixSet::parse(["10.1.2.3/8", "10.20.0.0/16"]).unwrap();
        assert_eq!(set.prefixes(), &["10.0.0.0/8".parse::<IpNet>().unwrap()]);
    }

    #[test]
    fn test_filter_preserves_order() {
        let set = TrustedPrefixSet::parse(["9.10.11.0/24"]).unwrap();
        let filtered = set.filter_untrusted(vec![
            ip("9.10.11.1"),
            ip("1.2.3.4"),
            ip("9.10.11.12"),
            ip("5.6.7.8"),
            ip("9.10.11.200"),
        ]);
        assert_eq!(filtered, vec![ip("1.2.3.4"), ip("5.6.7.8")]);
    }

    #[test]
    fn test_empty_set_trusts_nothing() {
        let set = TrustedPrefixSet::default();
        assert!(set.is_empty());
        assert!(!set.contains(&ip("127.0.0.1")));
    }

    #[test]
    fn test_parse_rejects_bad_cidr() {
        assert!(TrustedPrefixSet::parse(["10.0.0.0/33"]).is_err());
        assert!(TrustedPrefixSet::parse(["not-a-network"]).is_err());
    }
}
