// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Object locators of the form `scheme://bucket.endpoint/object/path`.

use std::fmt;
use std::str::FromStr;

use crate::RemoteError;

/// Parsed address of one remote object.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectLocator {
    /// URL scheme (`oss`, `https`, ...).
    pub scheme: String,
    /// Bucket name: the first label of the host.
    pub bucket: String,
    /// Remaining host labels.
    pub endpoint: String,
    /// Object key, without the leading slash.
    pub object: String,
}

impl ObjectLocator {
    /// Parse `scheme://bucket.endpoint/object`.
    pub fn parse(input: &str) -> Result<Self, RemoteError> {
        let bad = |reason| RemoteError::InvalidLocator {
            locator: input.to_owned(),
            reason,
        };
        let (scheme, rest) = input.split_once("://").ok_or_else(|| bad("missing `//`"))?;
        if scheme.is_empty() {
            return Err(bad("empty scheme"));
        }
        let (host, object) = rest.split_once('/').ok_or_else(|| bad("missing object path"))?;
        let (bucket, endpoint) = host
            .split_once('.')
            .ok_or_else(|| bad("host has no bucket prefix"))?;
        if bucket.is_empty() || endpoint.is_empty() {
            return Err(bad("empty bucket or endpoint"));
        }
        if object.is_empty() {
            return Err(bad("missing object path"));
        }
        Ok(Self {
            scheme: scheme.to_owned(),
            bucket: bucket.to_owned(),
            endpoint: endpoint.to_owned(),
            object: object.to_owned(),
        })
    }

    /// Same bucket, object key extended by `suffix` (e.g. `".data"`).
    pub fn with_suffix(&self, suffix: &str) -> Self {
        Self {
            object: format!("{}{suffix}", self.object),
            ..self.clone()
        }
    }
}

impl FromStr for ObjectLocator {
    type Err = RemoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ObjectLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}.{}/{}",
            self.scheme, self.bucket, self.endpoint, self.object
        )
    }
}
