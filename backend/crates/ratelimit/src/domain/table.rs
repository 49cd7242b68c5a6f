//! Rate Limit Table
//!
//! Four-level counter tree persisted per protocol:
//!
//! ```text
//! address -> { hits, fails, protocols:
//!   proto -> { hits, fails, users:
//!     identity -> { hits, fails, secrets:
//!       secret -> { timestamp, hits } } } }
//! ```
//!
//! `hits` counts distinct secrets, `fails` counts raw failed attempts. Every
//! aggregate equals the sum over its children once an update has finished:
//! `user.hits == secrets.len()`, `user.fails == Σ secret.hits`, and the proto
//! and address totals are sums over their children.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Counts after an attempt was recorded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttemptHits {
    pub address_hits: u64,
    pub proto_hits: u64,
    pub user_hits: u64,
    pub secret_hits: u64,
}

/// One distinct secret tried by an identity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecretEntry {
    /// Last failure, seconds since the epoch
    pub timestamp: f64,
    pub hits: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserEntry {
    pub hits: u64,
    pub fails: u64,
    #[serde(default)]
    pub secrets: BTreeMap<String, SecretEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtoEntry {
    pub hits: u64,
    pub fails: u64,
    #[serde(default)]
    pub users: BTreeMap<String, UserEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressEntry {
    pub hits: u64,
    pub fails: u64,
    #[serde(default)]
    pub protocols: BTreeMap<String, ProtoEntry>,
}

/// Counter table of one protocol file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateLimitTable {
    addresses: BTreeMap<String, AddressEntry>,
}

impl RateLimitTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn addresses(&self) -> impl Iterator<Item = (&str, &AddressEntry)> {
        self.addresses.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn address(&self, address: &str) -> Option<&AddressEntry> {
        self.addresses.get(address)
    }

    pub fn proto(&self, address: &str, proto: &str) -> Option<&ProtoEntry> {
        self.address(address)?.protocols.get(proto)
    }

    pub fn user(&self, address: &str, proto: &str, identity: &str) -> Option<&UserEntry> {
        self.proto(address, proto)?.users.get(identity)
    }

    /// Distinct failing secrets of an identity; 0 when absent
    pub fn user_hits(&self, address: &str, proto: &str, identity: &str) -> u64 {
        self.user(address, proto, identity).map_or(0, |u| u.hits)
    }

    /// Count a failed attempt with `secret` at `now`
    ///
    /// A secret seen before only adds a fail; a new one also adds a hit on
    /// every level.
    pub fn register_failure(
        &mut self,
        address: &str,
        proto: &str,
        identity: &str,
        secret: &str,
        now: f64,
    ) -> AttemptHits {
        let addr = self.addresses.entry(address.to_string()).or_default();
        let proto_entry = addr.protocols.entry(proto.to_string()).or_default();
        let user = proto_entry.users.entry(identity.to_string()).or_default();
        let secret_entry = user.secrets.entry(secret.to_string()).or_default();

        let new_hit = u64::from(secret_entry.hits == 0);
        secret_entry.hits += 1;
        secret_entry.timestamp = now;
        let secret_hits = secret_entry.hits;

        user.hits += new_hit;
        user.fails += 1;
        let user_hits = user.hits;

        proto_entry.hits += new_hit;
        proto_entry.fails += 1;
        addr.hits += new_hit;
        addr.fails += 1;

        AttemptHits {
            address_hits: addr.hits,
            proto_hits: proto_entry.hits,
            user_hits,
            secret_hits,
        }
    }

    /// Forget an identity after a successful login
    ///
    /// The whole identity entry goes, whatever its counts; ancestors lose
    /// exactly its totals. Nothing is created for an unknown identity.
    pub fn register_success(&mut self, address: &str, proto: &str, identity: &str) -> AttemptHits {
        let Some(addr) = self.addresses.get_mut(address) else {
            return AttemptHits::default();
        };
        let Some(proto_entry) = addr.protocols.get_mut(proto) else {
            return AttemptHits {
                address_hits: addr.hits,
                ..AttemptHits::default()
            };
        };

        if let Some(user) = proto_entry.users.remove(identity) {
            proto_entry.hits = proto_entry.hits.saturating_sub(user.hits);
            proto_entry.fails = proto_entry.fails.saturating_sub(user.fails);
            addr.hits = addr.hits.saturating_sub(user.hits);
            addr.fails = addr.fails.saturating_sub(user.fails);
        }

        let hits = AttemptHits {
            address_hits: addr.hits,
            proto_hits: proto_entry.hits,
            user_hits: 0,
            secret_hits: 0,
        };

        if proto_entry.users.is_empty() {
            addr.protocols.remove(proto);
        }
        if addr.protocols.is_empty() {
            self.addresses.remove(address);
        }
        hits
    }

    /// Drop secrets of `proto` last seen more than `window` seconds before `now`
    ///
    /// Each dropped secret takes one hit and its own fail count off every
    /// ancestor. Identities and protocols left without fails are pruned, as
    /// are addresses left without protocols. Returns the number of secrets
    /// dropped.
    pub fn expire_older_than(&mut self, proto: &str, window: f64, now: f64) -> u64 {
        let mut expired = 0;

        for addr in self.addresses.values_mut() {
            let Some(proto_entry) = addr.protocols.get_mut(proto) else {
                continue;
            };

            for user in proto_entry.users.values_mut() {
                let (mut hits, mut fails) = (0u64, 0u64);
                user.secrets.retain(|_, secret| {
                    if secret.timestamp + window < now {
                        hits += 1;
                        fails += secret.hits;
                        false
                    } else {
                        true
                    }
                });

                user.hits = user.hits.saturating_sub(hits);
                user.fails = user.fails.saturating_sub(fails);
                proto_entry.hits = proto_entry.hits.saturating_sub(hits);
                proto_entry.fails = proto_entry.fails.saturating_sub(fails);
                addr.hits = addr.hits.saturating_sub(hits);
                addr.fails = addr.fails.saturating_sub(fails);
                expired += hits;
            }

            proto_entry.users.retain(|_, user| user.fails > 0);
            if proto_entry.fails == 0 {
                addr.protocols.remove(proto);
            }
        }

        self.addresses.retain(|_, addr| !addr.protocols.is_empty());
        expired
    }

    /// Whether every aggregate equals the sum over its children
    pub fn totals_consistent(&self) -> bool {
        self.addresses.values().all(|addr| {
            let protos_ok = addr.protocols.values().all(|proto| {
                let users_ok = proto.users.values().all(|user| {
                    user.hits == user.secrets.len() as u64
                        && user.fails == user.secrets.values().map(|s| s.hits).sum::<u64>()
                });
                users_ok
                    && proto.hits == proto.users.values().map(|u| u.hits).sum::<u64>()
                    && proto.fails == proto.users.values().map(|u| u.fails).sum::<u64>()
            });
            protos_ok
                && addr.hits == addr.protocols.values().map(|p| p.hits).sum::<u64>()
                && addr.fails == addr.protocols.values().map(|p| p.fails).sum::<u64>()
        })
    }
}
