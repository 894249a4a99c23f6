use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};

/// Sync object name of the form `<networkId>/<name>`, as used by `IrcUser`
/// and `IrcChannel` objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectId {
    pub network_id: i32,
    /// Nickname or channel name; may itself contain `/`.
    pub name: String,
}

impl ObjectId {
    pub fn new(network_id: i32, name: impl Into<String>) -> Self {
        Self {
            network_id,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid object name '{0}', expected <networkId>/<name>")]
pub struct ParseObjectIdError(pub String);

impl FromStr for ObjectId {
    type Err = ParseObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (network, name) = s
            .split_once('/')
            .ok_or_else(|| ParseObjectIdError(s.to_string()))?;
        let network_id = network
            .parse()
            .map_err(|_| ParseObjectIdError(s.to_string()))?;
        Ok(Self::new(network_id, name))
    }
}

/// Serialized as a `[networkId, name]` pair.
impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.network_id)?;
        tuple.serialize_element(&self.name)?;
        tuple.end()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network_id, self.name)
    }
}
