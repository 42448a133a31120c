//! Compound primary-key encoding
//!
//! A row's primary-key values are rendered, escaped and concatenated into one
//! string. Each field is terminated by [`KEY_SEPARATOR`]; occurrences of
//! [`KEY_ESCAPE`] and of the separator inside a field are prefixed with the
//! escape character. The trailing separator means a table with a primary key
//! never produces the empty key, which is reserved for "nothing to match".

use std::fmt;

use crate::error::Result;
use crate::table::{Row, RowState, Table};

pub const KEY_SEPARATOR: char = '|';
pub const KEY_ESCAPE: char = '/';

/// Encoded primary-key identity of a row
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CompoundKey(String);

impl CompoundKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode back into the unescaped field values
    pub fn fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        let mut current = String::new();
        let mut chars = self.0.chars();
        while let Some(c) = chars.next() {
            match c {
                KEY_ESCAPE => {
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                }
                KEY_SEPARATOR => fields.push(std::mem::take(&mut current)),
                other => current.push(other),
            }
        }
        fields
    }
}

impl fmt::Display for CompoundKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Escape and terminate each field, concatenating the results
pub fn encode_fields<'a, I>(fields: I) -> CompoundKey
where
    I: IntoIterator<Item = &'a str>,
{
    let mut key = String::new();
    for field in fields {
        for c in field.chars() {
            if c == KEY_ESCAPE || c == KEY_SEPARATOR {
                key.push(KEY_ESCAPE);
            }
            key.push(c);
        }
        key.push(KEY_SEPARATOR);
    }
    CompoundKey(key)
}

/// Key encoder bound to a table's key column ordinals
#[derive(Debug, Clone)]
pub struct KeyCodec {
    ordinals: Vec<usize>,
}

impl KeyCodec {
    /// Codec over the table's declared primary key. A table without one
    /// yields a codec that produces only empty keys.
    pub fn for_table(table: &Table) -> Self {
        let ordinals = table
            .primary_key()
            .iter()
            .filter_map(|name| table.ordinal(name))
            .collect();
        Self { ordinals }
    }

    /// Codec over an explicit list of key columns, resolved in `table`
    pub fn with_columns<S: AsRef<str>>(table: &Table, columns: &[S]) -> Result<Self> {
        let ordinals = columns
            .iter()
            .map(|name| table.require_ordinal(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { ordinals })
    }

    pub fn has_key(&self) -> bool {
        !self.ordinals.is_empty()
    }

    /// Encode a row. Deleted rows use their committed values; detached rows
    /// and key-less codecs produce the empty key.
    pub fn encode(&self, row: &Row) -> CompoundKey {
        if !self.has_key() || matches!(row.state(), RowState::Detached) {
            return CompoundKey::default();
        }
        let rendered: Vec<String> = self
            .ordinals
            .iter()
            .map(|&ordinal| row.value_at(ordinal).to_string())
            .collect();
        encode_fields(rendered.iter().map(String::as_str))
    }
}
