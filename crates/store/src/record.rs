//! Records, key paths, and record keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// An open set of named fields describing one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
	/// Creates an empty record.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the value of `field`.
	pub fn get(&self, field: &str) -> Option<&Value> {
		self.0.get(field)
	}

	/// Returns `field` as a string slice, if it holds a string.
	pub fn get_str(&self, field: &str) -> Option<&str> {
		self.0.get(field).and_then(Value::as_str)
	}

	/// Returns `field` as an unsigned integer, if it holds one.
	pub fn get_u64(&self, field: &str) -> Option<u64> {
		self.0.get(field).and_then(Value::as_u64)
	}

	/// Sets `field`, returning the previous value.
	pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
		self.0.insert(field.into(), value.into())
	}

	/// Builder form of [`Record::insert`].
	#[must_use]
	pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
		self.insert(field, value);
		self
	}

	/// Removes `field`, returning its value.
	pub fn remove(&mut self, field: &str) -> Option<Value> {
		self.0.remove(field)
	}

	/// Returns true if `field` is present.
	pub fn contains(&self, field: &str) -> bool {
		self.0.contains_key(field)
	}

	/// Iterates over all fields.
	pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
		self.0.iter()
	}

	/// Number of fields.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if the record has no fields.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Borrows the underlying map.
	pub fn as_map(&self) -> &Map<String, Value> {
		&self.0
	}

	/// Converts the record into a JSON object value.
	pub fn into_value(self) -> Value {
		Value::Object(self.0)
	}

	/// Converts any serializable type whose JSON form is an object.
	pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, crate::StoreError> {
		Ok(Self::try_from(serde_json::to_value(value)?)?)
	}

	/// Deserializes the record into a typed view.
	pub fn to_typed<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
		T::deserialize(Value::Object(self.0.clone()))
	}
}

impl From<Map<String, Value>> for Record {
	fn from(map: Map<String, Value>) -> Self {
		Self(map)
	}
}

impl TryFrom<Value> for Record {
	type Error = ValidationError;

	fn try_from(value: Value) -> Result<Self, Self::Error> {
		match value {
			Value::Object(map) => Ok(Self(map)),
			other => Err(ValidationError::NotAnObject(other.to_string())),
		}
	}
}

/// Location of a record's identity inside its fields.
///
/// Serializes as a bare field name or an array of field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyPath {
	/// Identity is a single field.
	Field(String),
	/// Identity is the ordered tuple of several fields.
	Compound(Vec<String>),
}

impl KeyPath {
	/// Single-field key path.
	pub fn field(name: impl Into<String>) -> Self {
		Self::Field(name.into())
	}

	/// Compound key path over `names`, in order.
	pub fn compound<I, S>(names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self::Compound(names.into_iter().map(Into::into).collect())
	}

	/// Field names making up the path.
	pub fn fields(&self) -> &[String] {
		match self {
			Self::Field(name) => std::slice::from_ref(name),
			Self::Compound(names) => names,
		}
	}

	/// Reads the key out of `record`. Returns `None` if any component is absent or null.
	pub fn extract(&self, record: &Record) -> Option<RecordKey> {
		match self {
			Self::Field(name) => record.get(name).filter(|v| !v.is_null()).cloned().map(RecordKey),
			Self::Compound(names) => names
				.iter()
				.map(|name| record.get(name).filter(|v| !v.is_null()).cloned())
				.collect::<Option<Vec<_>>>()
				.map(|parts| RecordKey(Value::Array(parts))),
		}
	}
}

impl std::fmt::Display for KeyPath {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Field(name) => f.write_str(name),
			Self::Compound(names) => write!(f, "[{}]", names.join(", ")),
		}
	}
}

/// The identity (or index) value of a record.
///
/// Valid keys are strings, numbers, or arrays of those. `"42"` and `42` are
/// different keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(pub Value);

impl RecordKey {
	/// Compound key from its components, in key-path order.
	pub fn compound<I, V>(parts: I) -> Self
	where
		I: IntoIterator<Item = V>,
		V: Into<Value>,
	{
		Self(Value::Array(parts.into_iter().map(Into::into).collect()))
	}

	/// Returns true for strings, numbers, and non-empty arrays of those.
	pub fn is_valid(&self) -> bool {
		fn scalar(v: &Value) -> bool {
			matches!(v, Value::String(_) | Value::Number(_))
		}
		match &self.0 {
			Value::Array(parts) => !parts.is_empty() && parts.iter().all(scalar),
			other => scalar(other),
		}
	}

	/// Canonical text form used as the stored primary key.
	pub fn encode(&self) -> String {
		self.0.to_string()
	}

	/// Integer form, for auto-increment collections.
	pub fn as_i64(&self) -> Option<i64> {
		self.0.as_i64()
	}

	/// Components of the key, one per key-path field.
	pub fn parts(&self) -> &[Value] {
		match &self.0 {
			Value::Array(parts) => parts,
			other => std::slice::from_ref(other),
		}
	}
}

impl std::fmt::Display for RecordKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<&str> for RecordKey {
	fn from(s: &str) -> Self {
		Self(Value::String(s.to_string()))
	}
}

impl From<String> for RecordKey {
	fn from(s: String) -> Self {
		Self(Value::String(s))
	}
}

impl From<i64> for RecordKey {
	fn from(n: i64) -> Self {
		Self(Value::from(n))
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn field_key_extracts_value() {
		let rec = Record::new().with("name", "Apple").with("id", "12");
		assert_eq!(KeyPath::field("name").extract(&rec), Some(RecordKey::from("Apple")));
	}

	#[test]
	fn compound_key_requires_every_part() {
		let path = KeyPath::compound(["type", "name"]);
		let partial = Record::new().with("type", "explore");
		assert_eq!(path.extract(&partial), None);

		let full = partial.with("name", "Forest");
		assert_eq!(path.extract(&full), Some(RecordKey::compound(["explore", "Forest"])));
	}

	#[test]
	fn null_key_counts_as_missing() {
		let rec = Record::new().with("name", Value::Null);
		assert_eq!(KeyPath::field("name").extract(&rec), None);
	}

	#[test]
	fn key_validity() {
		assert!(RecordKey::from("a").is_valid());
		assert!(RecordKey::from(3).is_valid());
		assert!(RecordKey::compound(["a", "b"]).is_valid());
		assert!(!RecordKey(json!(true)).is_valid());
		assert!(!RecordKey(json!({"a": 1})).is_valid());
		assert!(!RecordKey(json!([])).is_valid());
	}

	#[test]
	fn key_path_serializes_like_indexeddb() {
		assert_eq!(serde_json::to_value(KeyPath::field("id")).unwrap(), json!("id"));
		assert_eq!(
			serde_json::to_value(KeyPath::compound(["type", "id"])).unwrap(),
			json!(["type", "id"])
		);
		let parsed: KeyPath = serde_json::from_value(json!(["type", "name"])).unwrap();
		assert_eq!(parsed, KeyPath::compound(["type", "name"]));
	}

	#[test]
	fn non_object_is_rejected() {
		assert!(matches!(Record::try_from(json!([1])), Err(ValidationError::NotAnObject(_))));
	}
}
