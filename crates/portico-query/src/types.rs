use crate::error::{DataError, Result};
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Comparison operators understood by the query grammar
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Operator {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `~=`, right side is a regular expression
    Matches,
    /// `~!=`, right side is a regular expression
    NotMatches,
}

impl Operator {
    /// Query-text form of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Matches => "~=",
            Operator::NotMatches => "~!=",
        }
    }

    /// Compare a stored value (`left`) against a query literal (`right`).
    ///
    /// Both sides are compared as numbers when both parse as `f64`,
    /// otherwise as strings. Regex operators search `left` for `right`.
    pub fn apply(&self, left: &str, right: &str) -> Result<bool> {
        match self {
            Operator::Matches | Operator::NotMatches => {
                let re = Regex::new(right).map_err(|e| {
                    DataError::invalid_query(format!("invalid pattern '{}': {}", right, e))
                })?;
                Ok(re.is_match(left) == (*self == Operator::Matches))
            }
            _ => {
                let ordering = match (left.parse::<f64>(), right.parse::<f64>()) {
                    (Ok(l), Ok(r)) => l.partial_cmp(&r),
                    _ => Some(left.cmp(right)),
                };

                Ok(match self {
                    Operator::Eq => ordering == Some(Ordering::Equal),
                    Operator::Ne => ordering != Some(Ordering::Equal),
                    Operator::Lt => ordering == Some(Ordering::Less),
                    Operator::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                    Operator::Gt => ordering == Some(Ordering::Greater),
                    Operator::Ge => {
                        matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
                    }
                    Operator::Matches | Operator::NotMatches => unreachable!(),
                })
            }
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        crate::grammar::OPERATORS
            .iter()
            .find(|op| op.as_str() == s)
            .copied()
            .ok_or_else(|| DataError::invalid_query(format!("unknown operator '{}'", s)))
    }
}

/// One filter term parsed from a query string.
///
/// `property` and `operator` are both `None` for a positional literal.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Condition {
    pub property: Option<String>,
    pub operator: Option<Operator>,
    pub value: String,
}

impl Condition {
    pub fn new(property: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            property: Some(property.into()),
            operator: Some(operator),
            value: value.into(),
        }
    }

    /// A positional literal with no property or operator
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            property: None,
            operator: None,
            value: value.into(),
        }
    }

    pub fn is_positional(&self) -> bool {
        self.property.is_none()
    }

    /// Evaluate against an item. Positional conditions must be bound first;
    /// a property the item does not have never matches.
    pub fn matches(&self, item: &Item) -> Result<bool> {
        let (Some(property), Some(operator)) = (&self.property, self.operator) else {
            return Err(DataError::invalid_query(format!(
                "unbound positional condition '{}'",
                self.value
            )));
        };

        match item.text(property) {
            Some(text) => operator.apply(&text, &self.value),
            None => Ok(false),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.property, self.operator) {
            (Some(property), Some(operator)) => {
                write!(f, "{}{}{}", property, operator, self.value)
            }
            _ => f.write_str(&self.value),
        }
    }
}

/// Turn positional literals into equality conditions on `keys`, in order.
///
/// The n-th positional condition binds to the n-th key. Named conditions
/// pass through untouched and relative order is kept.
pub fn bind_positional(conditions: Vec<Condition>, keys: &[String]) -> Result<Vec<Condition>> {
    let mut position = 0;

    conditions
        .into_iter()
        .map(|condition| {
            if !condition.is_positional() {
                return Ok(condition);
            }

            let key = keys.get(position).ok_or_else(|| {
                DataError::invalid_query(format!(
                    "positional value '{}' has no key to bind to ({} keys)",
                    condition.value,
                    keys.len()
                ))
            })?;
            position += 1;

            Ok(Condition::new(key.clone(), Operator::Eq, condition.value))
        })
        .collect()
}

/// A record body as property/value pairs
pub type DataRow = BTreeMap<String, serde_json::Value>;

/// Render a property value the way query literals are written
pub fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A record handed out by an access point.
///
/// The item remembers the name of the access point it belongs to, not the
/// backend itself, so it can outlive the site that produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Item {
    #[serde(skip)]
    access_point: Option<String>,
    #[serde(flatten)]
    properties: DataRow,
}

impl Item {
    pub fn new(properties: DataRow) -> Self {
        Self {
            access_point: None,
            properties,
        }
    }

    /// Build an item from `(property, value)` pairs
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Name of the owning access point, if the item has been bound
    pub fn access_point(&self) -> Option<&str> {
        self.access_point.as_deref()
    }

    pub fn bound_to(mut self, access_point: impl Into<String>) -> Self {
        self.access_point = Some(access_point.into());
        self
    }

    pub fn get(&self, property: &str) -> Option<&serde_json::Value> {
        self.properties.get(property)
    }

    /// Property value in query-literal form
    pub fn text(&self, property: &str) -> Option<String> {
        self.properties.get(property).map(value_text)
    }

    pub fn set(&mut self, property: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.properties.insert(property.into(), value.into());
    }

    pub fn properties(&self) -> &DataRow {
        &self.properties
    }

    pub fn into_properties(self) -> DataRow {
        self.properties
    }
}

/// Everything needed to build one access point: its name, the backend kind
/// and the backend's parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessPointDescriptor {
    /// Access point name (configuration section)
    pub name: String,
    /// Backend kind identifier (memory, filesystem, etc.)
    pub kind: String,
    /// Backend-specific parameters
    pub parameters: BTreeMap<String, String>,
    /// Directory relative paths are resolved against
    pub base_dir: PathBuf,
}

impl AccessPointDescriptor {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            parameters: BTreeMap::new(),
            base_dir: PathBuf::from("."),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    /// Get a parameter the backend cannot do without
    pub fn require(&self, key: &str) -> Result<&str> {
        self.parameter(key).ok_or_else(|| {
            DataError::invalid_configuration(format!(
                "access point '{}' ({}) requires parameter '{}'",
                self.name, self.kind, key
            ))
        })
    }

    /// Comma-separated parameter as a list; empty entries are dropped
    pub fn list(&self, key: &str) -> Option<Vec<String>> {
        self.parameter(key).map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
    }

    /// Path parameter, joined onto `base_dir` when relative
    pub fn resolve_path(&self, key: &str) -> Result<PathBuf> {
        let raw = Path::new(self.require(key)?);
        if raw.is_absolute() {
            Ok(raw.to_path_buf())
        } else {
            Ok(self.base_dir.join(raw))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operator_numeric_and_string_comparison() {
        assert!(Operator::Eq.apply("42", "42.0").unwrap());
        assert!(Operator::Lt.apply("9", "10").unwrap());
        // Lexicographic once either side is not a number
        assert!(!Operator::Lt.apply("b9", "b10").unwrap());
        assert!(Operator::Ge.apply("abc", "abc").unwrap());
        assert!(Operator::Ne.apply("Ada", "Grace").unwrap());
    }

    #[test]
    fn test_operator_regex() {
        assert!(Operator::Matches.apply("Ada Lovelace", "^Ada").unwrap());
        assert!(Operator::NotMatches.apply("Grace", "^Ada").unwrap());

        let err = Operator::Matches.apply("x", "(").unwrap_err();
        assert!(matches!(err, DataError::InvalidQuery(_)));
    }

    #[test]
    fn test_operator_from_str() {
        assert_eq!("<=".parse::<Operator>().unwrap(), Operator::Le);
        assert_eq!("~!=".parse::<Operator>().unwrap(), Operator::NotMatches);
        assert!("==".parse::<Operator>().is_err());
    }

    #[test]
    fn test_condition_matches_item() {
        let item = Item::from_pairs([("name", json!("Ada")), ("born", json!(1815))]);

        assert!(Condition::new("name", Operator::Eq, "Ada").matches(&item).unwrap());
        assert!(Condition::new("born", Operator::Lt, "1900").matches(&item).unwrap());
        assert!(!Condition::new("died", Operator::Ne, "x").matches(&item).unwrap());
        assert!(Condition::literal("Ada").matches(&item).is_err());
    }

    #[test]
    fn test_condition_display() {
        assert_eq!(Condition::new("c", Operator::Ge, "3").to_string(), "c>=3");
        assert_eq!(Condition::literal("1").to_string(), "1");
    }

    #[test]
    fn test_bind_positional() {
        let keys = vec!["genre".to_string(), "artist".to_string()];
        let bound = bind_positional(
            vec![
                Condition::literal("jazz"),
                Condition::new("year", Operator::Gt, "1960"),
                Condition::literal("Monk"),
            ],
            &keys,
        )
        .unwrap();

        assert_eq!(
            bound,
            vec![
                Condition::new("genre", Operator::Eq, "jazz"),
                Condition::new("year", Operator::Gt, "1960"),
                Condition::new("artist", Operator::Eq, "Monk"),
            ]
        );

        let err = bind_positional(vec![Condition::literal("a"); 3], &keys).unwrap_err();
        assert!(matches!(err, DataError::InvalidQuery(_)));
    }

    #[test]
    fn test_item_binding_and_serialization() {
        let item = Item::from_pairs([("id", json!(1)), ("name", json!("Ada"))]);
        assert_eq!(item.access_point(), None);

        let item = item.bound_to("people");
        assert_eq!(item.access_point(), Some("people"));
        assert_eq!(item.text("id"), Some("1".to_string()));

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json, json!({"id": 1, "name": "Ada"}));
    }

    #[test]
    fn test_descriptor_helpers() {
        let descriptor = AccessPointDescriptor::new("music", "filesystem")
            .with_base_dir("/srv/site")
            .with_parameter("root", "data/music")
            .with_parameter("keys", " genre, ,artist ");

        assert_eq!(
            descriptor.resolve_path("root").unwrap(),
            PathBuf::from("/srv/site/data/music")
        );
        assert_eq!(
            descriptor.list("keys").unwrap(),
            vec!["genre".to_string(), "artist".to_string()]
        );
        assert!(matches!(
            descriptor.require("missing"),
            Err(DataError::InvalidConfiguration(_))
        ));

        let absolute = descriptor.with_parameter("root", "/abs/music");
        assert_eq!(
            absolute.resolve_path("root").unwrap(),
            PathBuf::from("/abs/music")
        );
    }
}
