//! Request parameter codec.
//!
//! Gateway requests are flat key/value sets. Inside the crate every key is a
//! [`FieldKey`] and every value a typed [`FieldValue`]; strings exist only at the
//! transport boundary, produced by [`encode`] and consumed by [`decode`].
//!
//! # Examples
//!
//! ```
//! use billing_gateway::params::{FieldKey, RequestParameters, decode, encode};
//!
//! let params = RequestParameters::new()
//!     .with(FieldKey::CC, "4111111111111111")
//!     .with(FieldKey::EXP, "0412")
//!     .with(FieldKey::AMOUNT, 1200)
//!     .with(FieldKey::CYCLE, "1m")
//!     .with("avs", true);
//!
//! let wire = encode(&params);
//! assert_eq!(wire["amount"], "1200");
//! assert_eq!(wire["avs"], "y");
//!
//! let fields = decode(wire);
//! assert_eq!(fields[&FieldKey::AMOUNT], "1200");
//! ```

use std::{borrow::Cow, collections::BTreeMap, fmt};

/// Wire representation of a request or native-channel response.
///
/// String keys, string values, one value per key.
pub type WireFields = BTreeMap<String, String>;

/// Decoded response fields keyed by canonical field key.
pub type ResponseFields = BTreeMap<FieldKey, String>;

/// Canonical gateway field name.
///
/// Keys are trimmed and lowercased on construction, so `"BillingID"`,
/// `" billingid"` and [`FieldKey::BILLING_ID`] are the same key.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldKey(Cow<'static, str>);

impl FieldKey {
    /// Merchant customer id.
    pub const CUSTID: Self = Self::from_static("custid");
    /// Operating or vault password, depending on route.
    pub const PASSWORD: Self = Self::from_static("password");
    /// Request kind (`store`, `unstore`, `sale`, `credit`).
    pub const ACTION: Self = Self::from_static("action");
    /// Test-mode flag.
    pub const DEMO: Self = Self::from_static("demo");
    /// Six-character billing identifier.
    pub const BILLING_ID: Self = Self::from_static("billingid");
    /// Gateway transaction id.
    pub const TRANS_ID: Self = Self::from_static("transid");
    /// Response status token.
    pub const STATUS: Self = Self::from_static("status");
    /// Query kind for vault queries.
    pub const QUERY_TYPE: Self = Self::from_static("querytype");
    /// Amount in minor units.
    pub const AMOUNT: Self = Self::from_static("amount");
    /// Card number.
    pub const CC: Self = Self::from_static("cc");
    /// Card expiry, `MMYY`.
    pub const EXP: Self = Self::from_static("exp");
    /// Card verification value.
    pub const CVV: Self = Self::from_static("cvv");
    /// Cardholder name.
    pub const NAME: Self = Self::from_static("name");
    /// Billing cycle, e.g. `1m`.
    pub const CYCLE: Self = Self::from_static("cycle");
    /// Error field on `error` and `baddata` responses.
    pub const ERROR: Self = Self::from_static("error");
    /// Decline reason on `decline` responses.
    pub const DECLINE_TYPE: Self = Self::from_static("declinetype");
    /// Offending field names on `baddata` responses.
    pub const OFFENDERS: Self = Self::from_static("offenders");

    const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Creates a key from any field name, normalizing it.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Cow::Owned(name.as_ref().trim().to_ascii_lowercase()))
    }

    /// Returns the wire form of the key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for fields whose values must never be logged.
    #[must_use]
    pub fn is_sensitive(&self) -> bool {
        matches!(self.as_str(), "password" | "cc" | "cvv" | "account" | "routing")
    }
}

impl fmt::Debug for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for FieldKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for FieldKey {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Scalar request value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Text, sent verbatim.
    Text(String),
    /// Integer, sent in decimal.
    Int(i64),
    /// Boolean flag, sent as the gateway's `y` / `n`.
    Flag(bool),
    /// Absent value, sent as an empty string.
    Null,
}

impl FieldValue {
    /// Renders the value in wire form.
    #[must_use]
    pub fn to_wire(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Int(n) => n.to_string(),
            Self::Flag(true) => "y".to_owned(),
            Self::Flag(false) => "n".to_owned(),
            Self::Null => String::new(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for FieldValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Flat set of request parameters.
///
/// Inserting a key that is already present replaces its value.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RequestParameters {
    fields: BTreeMap<FieldKey, FieldValue>,
}

impl RequestParameters {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<FieldKey>, value: impl Into<FieldValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a value, returning the previous one.
    pub fn insert(
        &mut self,
        key: impl Into<FieldKey>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.fields.insert(key.into(), value.into())
    }

    /// Returns the value for a key.
    #[must_use]
    pub fn get(&self, key: &FieldKey) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Removes a key.
    pub fn remove(&mut self, key: &FieldKey) -> Option<FieldValue> {
        self.fields.remove(key)
    }

    /// Returns true if the key is present.
    #[must_use]
    pub fn contains(&self, key: &FieldKey) -> bool {
        self.fields.contains_key(key)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true when no fields are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, &FieldValue)> {
        self.fields.iter()
    }

    /// Merges `other` into `self`; values from `other` win.
    #[must_use]
    pub fn merged(mut self, other: Self) -> Self {
        self.fields.extend(other.fields);
        self
    }
}

impl fmt::Debug for RequestParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.fields {
            if key.is_sensitive() {
                map.entry(key, &"[REDACTED]");
            } else {
                map.entry(key, value);
            }
        }
        map.finish()
    }
}

impl<K: Into<FieldKey>, V: Into<FieldValue>> FromIterator<(K, V)> for RequestParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

/// Converts parameters into their wire form.
#[must_use]
pub fn encode(params: &RequestParameters) -> WireFields {
    params.iter().map(|(key, value)| (key.as_str().to_owned(), value.to_wire())).collect()
}

/// Converts wire pairs into canonical response fields.
///
/// Pairs are applied in order; when two pairs normalize to the same key the
/// later value wins.
pub fn decode<I, K, V>(pairs: I) -> ResponseFields
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let mut fields = ResponseFields::new();
    for (key, value) in pairs {
        fields.insert(FieldKey::new(key), value.into());
    }
    fields
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_field_key_normalization() {
        assert_eq!(FieldKey::new(" BillingID "), FieldKey::BILLING_ID);
        assert_eq!(FieldKey::from("TransID"), FieldKey::TRANS_ID);
        assert_eq!(FieldKey::BILLING_ID.as_str(), "billingid");
    }

    #[test]
    fn test_encode_stringifies_values() {
        let params = RequestParameters::new()
            .with("a", "1")
            .with("b", 2)
            .with("demo", true)
            .with("avs", false)
            .with("note", None::<String>);

        let wire = encode(&params);
        assert_eq!(wire["a"], "1");
        assert_eq!(wire["b"], "2");
        assert_eq!(wire["demo"], "y");
        assert_eq!(wire["avs"], "n");
        assert_eq!(wire["note"], "");
    }

    #[test]
    fn test_insert_same_key_last_wins() {
        let params = RequestParameters::new().with("a", 1).with("A", 2);
        assert_eq!(params.len(), 1);
        assert_eq!(encode(&params)["a"], "2");
    }

    #[test]
    fn test_decode_duplicate_keys_last_wins() {
        let fields = decode([("a", "1"), ("b", "2"), ("A", "3")]);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[&FieldKey::new("a")], "3");
        assert_eq!(fields[&FieldKey::new("b")], "2");
    }

    #[test]
    fn test_merged_other_wins() {
        let base = RequestParameters::new().with(FieldKey::ACTION, "sale").with("amount", 100);
        let merged = base.merged(RequestParameters::new().with(FieldKey::ACTION, "store"));
        assert_eq!(merged.get(&FieldKey::ACTION), Some(&FieldValue::from("store")));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_debug_redacts_sensitive_fields() {
        let params = RequestParameters::new()
            .with(FieldKey::CC, "4111111111111111")
            .with(FieldKey::PASSWORD, "topsecret")
            .with(FieldKey::NAME, "Jennifer Smith");

        let debug = format!("{params:?}");
        assert!(!debug.contains("4111111111111111"));
        assert!(!debug.contains("topsecret"));
        assert!(debug.contains("Jennifer Smith"));
        assert!(debug.contains("[REDACTED]"));
    }

    fn scalar() -> impl Strategy<Value = FieldValue> {
        prop_oneof![
            "[ -~]{0,24}".prop_map(FieldValue::Text),
            any::<i64>().prop_map(FieldValue::Int),
            any::<bool>().prop_map(FieldValue::Flag),
            Just(FieldValue::Null),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn test_encode_decode_preserves_keys_and_values(
            entries in prop::collection::vec(("[a-z_]{1,12}", scalar()), 0..16),
        ) {
            let params: RequestParameters = entries.into_iter().collect();
            let decoded = decode(encode(&params));

            prop_assert_eq!(decoded.len(), params.len());
            for (key, value) in params.iter() {
                prop_assert_eq!(decoded.get(key), Some(&value.to_wire()));
            }
        }
    }
}
