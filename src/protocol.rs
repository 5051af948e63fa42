//! Typed encoding of keys and values on top of raw records.
//!
//! Computations pick a [`Protocol`] for the types they work with. The engine
//! never calls these itself.

use std::fmt::Display;
use std::str::{self, FromStr};

use anyhow::{anyhow, Result};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::KeyValue;

/// Converts between typed key/value data and raw records.
pub trait Protocol<K, V> {
    /// Encodes one typed pair into a record.
    fn marshal(&self, key: &K, value: &V) -> Result<KeyValue>;

    /// Decodes a record key.
    fn unmarshal_key(&self, key: &[u8]) -> Result<K>;

    /// Decodes a run of values. Values that do not decode are skipped.
    fn unmarshal_values(&self, values: &[Bytes]) -> Vec<V>;
}

/// Keys and values are JSON documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonProtocol;

impl<K, V> Protocol<K, V> for JsonProtocol
where
    K: Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
{
    fn marshal(&self, key: &K, value: &V) -> Result<KeyValue> {
        Ok(KeyValue::new(serde_json::to_vec(key)?, serde_json::to_vec(value)?))
    }

    fn unmarshal_key(&self, key: &[u8]) -> Result<K> {
        Ok(serde_json::from_slice(key)?)
    }

    fn unmarshal_values(&self, values: &[Bytes]) -> Vec<V> {
        values
            .iter()
            .filter_map(|v| serde_json::from_slice(v).ok())
            .collect()
    }
}

/// A value that can be spread over tab-separated fields.
pub trait TsvRecord: Sized {
    fn to_fields(&self) -> Vec<String>;

    fn from_fields(fields: &[&str]) -> Option<Self>;
}

macro_rules! scalar_tsv_record {
    ($($t:ty),*) => {
        $(
            impl TsvRecord for $t {
                fn to_fields(&self) -> Vec<String> {
                    vec![self.to_string()]
                }

                fn from_fields(fields: &[&str]) -> Option<Self> {
                    match fields {
                        [field] => field.trim().parse().ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

scalar_tsv_record!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, f32, f64);

impl TsvRecord for bool {
    fn to_fields(&self) -> Vec<String> {
        vec![if *self { "1" } else { "0" }.to_string()]
    }

    fn from_fields(fields: &[&str]) -> Option<Self> {
        match fields {
            [field] => match field.trim() {
                "1" | "true" => Some(true),
                "0" | "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl TsvRecord for String {
    fn to_fields(&self) -> Vec<String> {
        vec![self.clone()]
    }

    fn from_fields(fields: &[&str]) -> Option<Self> {
        match fields {
            [field] => Some(field.to_string()),
            _ => None,
        }
    }
}

/// One field per element.
impl<T: TsvRecord> TsvRecord for Vec<T> {
    fn to_fields(&self) -> Vec<String> {
        self.iter().flat_map(T::to_fields).collect()
    }

    fn from_fields(fields: &[&str]) -> Option<Self> {
        fields.iter().map(|f| T::from_fields(&[*f])).collect()
    }
}

/// One field per member.
impl<A: TsvRecord, B: TsvRecord> TsvRecord for (A, B) {
    fn to_fields(&self) -> Vec<String> {
        let mut fields = self.0.to_fields();
        fields.extend(self.1.to_fields());
        fields
    }

    fn from_fields(fields: &[&str]) -> Option<Self> {
        match fields {
            [a, b] => Some((A::from_fields(&[*a])?, B::from_fields(&[*b])?)),
            _ => None,
        }
    }
}

/// Keys are their `Display` form, values are tab-separated fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TsvProtocol;

impl<K, V> Protocol<K, V> for TsvProtocol
where
    K: Display + FromStr,
    K::Err: Display,
    V: TsvRecord,
{
    fn marshal(&self, key: &K, value: &V) -> Result<KeyValue> {
        Ok(KeyValue::new(key.to_string(), value.to_fields().join("\t")))
    }

    fn unmarshal_key(&self, key: &[u8]) -> Result<K> {
        str::from_utf8(key)?
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid key: {}", e))
    }

    fn unmarshal_values(&self, values: &[Bytes]) -> Vec<V> {
        values
            .iter()
            .filter_map(|v| {
                let s = str::from_utf8(v).ok()?;
                let fields: Vec<&str> = s.split('\t').collect();
                V::from_fields(&fields)
            })
            .collect()
    }
}
