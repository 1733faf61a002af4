//! Column value conversions between record fields and SQLite storage.
//!
//! Scalar fields go through `rusqlite::ToSql`/`FromSql`. Structured fields
//! (maps, nested documents) are stored as JSON text through [`Json`].

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Value, ValueRef};
use rusqlite::ToSql;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode column value: {0}")]
    Encode(String),
    #[error("failed to decode column value: {0}")]
    Decode(String),
    #[error("column value kind is not supported by the statement binder")]
    Unsupported,
}

/// Converts any `ToSql` field into an owned bind value.
pub fn to_value<T>(field: &T) -> Result<Value, CodecError>
where
    T: ToSql + ?Sized,
{
    let output = field
        .to_sql()
        .map_err(|err| CodecError::Encode(err.to_string()))?;
    match output {
        ToSqlOutput::Borrowed(value_ref) => Ok(Value::from(value_ref)),
        ToSqlOutput::Owned(value) => Ok(value),
        _ => Err(CodecError::Unsupported),
    }
}

/// Text encoding of a structured column.
pub trait StoredText: Sized {
    fn encode_text(&self) -> Result<String, CodecError>;
    fn decode_text(text: &str) -> Result<Self, CodecError>;
}

/// Wrapper storing `T` as a JSON document in a TEXT column.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Json<T>(pub T);

/// String-keyed map stored as a JSON object.
pub type JsonMap = Json<BTreeMap<String, serde_json::Value>>;

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> StoredText for Json<T>
where
    T: Serialize + DeserializeOwned,
{
    fn encode_text(&self) -> Result<String, CodecError> {
        serde_json::to_string(&self.0).map_err(|err| CodecError::Encode(err.to_string()))
    }

    fn decode_text(text: &str) -> Result<Self, CodecError> {
        serde_json::from_str(text)
            .map(Json)
            .map_err(|err| CodecError::Decode(err.to_string()))
    }
}

impl<T> ToSql for Json<T>
where
    T: Serialize + DeserializeOwned,
{
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let text = self
            .encode_text()
            .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))?;
        Ok(ToSqlOutput::Owned(Value::Text(text)))
    }
}

/// A SQL `NULL` reads as `T::default()`, so a nullable map column
/// yields an empty map and a `Json<Option<_>>` yields `None`.
impl<T> FromSql for Json<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = match value {
            ValueRef::Null => return Ok(Json(T::default())),
            ValueRef::Text(bytes) => {
                std::str::from_utf8(bytes).map_err(|err| FromSqlError::Other(Box::new(err)))?
            }
            _ => return Err(FromSqlError::InvalidType),
        };
        Self::decode_text(text).map_err(|err| FromSqlError::Other(Box::new(err)))
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T> From<T> for Json<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}
