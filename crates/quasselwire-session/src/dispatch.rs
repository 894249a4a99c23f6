//! Name-keyed handler tables.

use std::collections::HashMap;

use quasselwire_types::SemanticValue;

use crate::error::DispatchError;
use crate::identifier::ObjectId;

pub type Handler<T> = fn(&Args<'_>) -> Result<T, DispatchError>;

/// Handlers for one command family, looked up by exact key. A miss falls
/// back to the `unknown` handler when one is registered, else it is
/// [`DispatchError::Unhandled`].
pub struct DispatchTable<T> {
    namespace: &'static str,
    handlers: HashMap<&'static str, Handler<T>>,
    unknown: Option<Handler<T>>,
}

impl<T> DispatchTable<T> {
    pub fn new(namespace: &'static str) -> Self {
        Self {
            namespace,
            handlers: HashMap::new(),
            unknown: None,
        }
    }

    pub fn on(mut self, key: &'static str, handler: Handler<T>) -> Self {
        self.handlers.insert(key, handler);
        self
    }

    /// Fallback for keys with no handler; it sees the original key in
    /// [`Args::key`].
    pub fn on_unknown(mut self, handler: Handler<T>) -> Self {
        self.unknown = Some(handler);
        self
    }

    pub fn dispatch(&self, key: &str, items: &[SemanticValue]) -> Result<T, DispatchError> {
        let args = Args { key, items };
        match self.handlers.get(key).or(self.unknown.as_ref()) {
            Some(handler) => handler(&args),
            None => Err(DispatchError::Unhandled {
                namespace: self.namespace,
                key: key.to_string(),
            }),
        }
    }
}

impl<T> std::fmt::Debug for DispatchTable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.handlers.keys().collect();
        keys.sort_unstable();
        f.debug_struct("DispatchTable")
            .field("namespace", &self.namespace)
            .field("handlers", &keys)
            .field("unknown", &self.unknown.is_some())
            .finish()
    }
}

/// Positional handler arguments with typed accessors.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    pub key: &'a str,
    pub items: &'a [SemanticValue],
}

impl<'a> Args<'a> {
    pub fn get(&self, index: usize) -> Result<&'a SemanticValue, DispatchError> {
        self.items
            .get(index)
            .ok_or_else(|| self.bad(format!("missing argument {index}")))
    }

    pub fn text(&self, index: usize) -> Result<String, DispatchError> {
        let value = self.get(index)?;
        value
            .as_text()
            .ok_or_else(|| self.bad(format!("argument {index} is a {}, not text", value.kind())))
    }

    pub fn int(&self, index: usize) -> Result<i64, DispatchError> {
        let value = self.get(index)?;
        value.as_i64().ok_or_else(|| {
            self.bad(format!("argument {index} is a {}, not an integer", value.kind()))
        })
    }

    pub fn bool(&self, index: usize) -> Result<bool, DispatchError> {
        match self.get(index)? {
            SemanticValue::Bool(v) => Ok(*v),
            other => Err(self.bad(format!("argument {index} is a {}, not a bool", other.kind()))),
        }
    }

    /// A text argument holding a decimal id, like the object name of a
    /// `Network` or `BufferViewConfig`.
    pub fn numeric_name(&self, index: usize) -> Result<i32, DispatchError> {
        let text = self.text(index)?;
        text.trim()
            .parse()
            .map_err(|_| self.bad(format!("argument {index} '{text}' is not numeric")))
    }

    pub fn object_id(&self, index: usize) -> Result<ObjectId, DispatchError> {
        let text = self.text(index)?;
        text.parse().map_err(|err| self.bad(format!("{err}")))
    }

    pub fn list(&self, index: usize) -> Result<&'a [SemanticValue], DispatchError> {
        let value = self.get(index)?;
        match value {
            SemanticValue::List(items) => Ok(items),
            other => Err(self.bad(format!("argument {index} is a {}, not a list", other.kind()))),
        }
    }

    /// Strings from either a string list or a list of text values.
    pub fn strings(&self, index: usize) -> Result<Vec<String>, DispatchError> {
        match self.get(index)? {
            SemanticValue::StringList(items) => Ok(items.clone()),
            SemanticValue::List(items) => items
                .iter()
                .map(|item| {
                    item.as_text()
                        .ok_or_else(|| self.bad(format!("argument {index} holds a non-text item")))
                })
                .collect(),
            other => Err(self.bad(format!("argument {index} is a {}, not a list", other.kind()))),
        }
    }

    pub fn bad(&self, reason: impl Into<String>) -> DispatchError {
        DispatchError::BadArguments {
            key: self.key.to_string(),
            reason: reason.into(),
        }
    }
}
