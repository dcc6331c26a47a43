use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh64::Xxh64;

const POOL_NAME_PREFIX: &str = "DBPool_";
const NO_PRINCIPAL: &str = "anonymous";
/// Principal segment of a pool name when the key has no principal. A real
/// principal `~` is escaped, so this marker is unambiguous.
const NO_PRINCIPAL_SEGMENT: &str = "~";

/// Where a relational store lives and how its driver is configured.
///
/// The registry only cares about [`short_id`](Self::short_id), which becomes
/// part of the pool key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasourceSpec {
    /// Driver family, e.g. `postgres` or `snowflake`.
    pub driver: String,
    /// Host name or address.
    pub host: String,
    /// Listening port.
    pub port: u16,
    /// Database or catalog name.
    pub database: String,
    /// Driver-specific properties.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl DatasourceSpec {
    /// Creates a descriptor without driver properties.
    pub fn new(
        driver: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
    ) -> Self {
        Self {
            driver: driver.into(),
            host: host.into(),
            port,
            database: database.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Adds a driver property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Stable identifier of this descriptor.
    ///
    /// Descriptors that differ only in driver properties get distinct ids via
    /// an xxh64 digest of the sorted properties.
    pub fn short_id(&self) -> String {
        let base = format!(
            "{}_{}_{}_{}",
            self.driver, self.host, self.port, self.database
        );
        if self.properties.is_empty() {
            return base;
        }
        let mut hasher = Xxh64::new(0);
        for (key, value) in &self.properties {
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
            hasher.update(b";");
        }
        format!("{base}_{:016x}", hasher.digest())
    }
}

/// Identifies one physical pool: datasource, authentication strategy and acting principal.
///
/// Equality and hashing are structural over all three fields. Distinct
/// principals never share a key, and therefore never share a pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionKey {
    datasource_id: String,
    auth_strategy_id: String,
    acting_principal: Option<String>,
}

impl ConnectionKey {
    /// Creates a key.
    pub fn new(
        datasource_id: impl Into<String>,
        auth_strategy_id: impl Into<String>,
        acting_principal: Option<String>,
    ) -> Self {
        Self {
            datasource_id: datasource_id.into(),
            auth_strategy_id: auth_strategy_id.into(),
            acting_principal,
        }
    }

    /// Descriptor id the key was derived from.
    pub fn datasource_id(&self) -> &str {
        &self.datasource_id
    }

    /// Authentication strategy id.
    pub fn auth_strategy_id(&self) -> &str {
        &self.auth_strategy_id
    }

    /// Principal the pool connects as, if the strategy acts on behalf of one.
    pub fn acting_principal(&self) -> Option<&str> {
        self.acting_principal.as_deref()
    }

    /// Deterministic pool name: `DBPool_<datasource>_<principal>_<strategy>`.
    ///
    /// `%`, `_` and `~` inside the principal and strategy are percent-escaped
    /// and a missing principal is written as `~`, so the last two segments
    /// always split back into the principal and strategy. Distinct keys get
    /// distinct names.
    pub fn pool_name(&self) -> String {
        let principal = match self.acting_principal.as_deref() {
            Some(principal) => escape_segment(principal),
            None => Cow::Borrowed(NO_PRINCIPAL_SEGMENT),
        };
        format!(
            "{POOL_NAME_PREFIX}{}_{}_{}",
            self.datasource_id,
            principal,
            escape_segment(&self.auth_strategy_id)
        )
    }
}

fn escape_segment(part: &str) -> Cow<'_, str> {
    if !part.contains(['%', '_', '~']) {
        return Cow::Borrowed(part);
    }
    let mut escaped = String::with_capacity(part.len() + 8);
    for ch in part.chars() {
        match ch {
            '%' => escaped.push_str("%25"),
            '_' => escaped.push_str("%5F"),
            '~' => escaped.push_str("%7E"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.datasource_id,
            self.auth_strategy_id,
            self.acting_principal.as_deref().unwrap_or(NO_PRINCIPAL)
        )
    }
}
