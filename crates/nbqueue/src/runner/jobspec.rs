use std::fmt::{Display, Formatter};

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

/// Parameters of a single notebook execution.
///
/// Entries keep their insertion order, because both the notebook invocation and the name of the
/// output notebook are derived from the parameters in this order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSpec {
    params: Vec<(String, String)>,
}

impl JobSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of `key`. An existing key keeps its original position.
    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        let key = key.into();
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.params.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for JobSpec {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut spec = JobSpec::new();
        for (key, value) in iter {
            spec.insert(key, value);
        }
        spec
    }
}

impl Display for JobSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("{")?;
        for (index, (key, value)) in self.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        f.write_str("}")
    }
}

/// Value of a notebook parameter as written in a run definition.
#[derive(Deserialize)]
#[serde(untagged)]
enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ParameterValue {
    /// Renders the value in the form expected by the notebook execution tool, which parses
    /// parameters as Python literals.
    fn render(self) -> String {
        match self {
            ParameterValue::Bool(true) => "True".to_string(),
            ParameterValue::Bool(false) => "False".to_string(),
            ParameterValue::Int(value) => value.to_string(),
            // Debug output always keeps the decimal point (`1.0` instead of `1`)
            ParameterValue::Float(value) => format!("{value:?}"),
            ParameterValue::String(value) => value,
        }
    }
}

impl<'de> Deserialize<'de> for JobSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct JobSpecVisitor;

        impl<'de> Visitor<'de> for JobSpecVisitor {
            type Value = JobSpec;

            fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
                write!(
                    formatter,
                    "a table of notebook parameters with string, integer, float or boolean values"
                )
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut spec = JobSpec::new();
                while let Some((key, value)) = map.next_entry::<String, ParameterValue>()? {
                    if spec.get(&key).is_some() {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate parameter `{key}`"
                        )));
                    }
                    spec.insert(key, value.render());
                }
                Ok(spec)
            }
        }

        deserializer.deserialize_map(JobSpecVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::JobSpec;

    #[test]
    fn insert_keeps_order() {
        let mut spec = JobSpec::new();
        spec.insert("b", "1");
        spec.insert("a", "2");
        spec.insert("c", "3");
        let keys: Vec<_> = spec.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn insert_replaces_value_in_place() {
        let mut spec: JobSpec = [("a", "1"), ("b", "2")].into_iter().collect();
        spec.insert("a", "3");
        assert_eq!(spec.iter().collect::<Vec<_>>(), vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn display_spec() {
        let spec: JobSpec = [("epochs", "10"), ("lr", "0.1")].into_iter().collect();
        assert_eq!(spec.to_string(), "{epochs=10, lr=0.1}");
    }

    #[test]
    fn deserialize_values_as_python_literals() {
        let spec: JobSpec = serde_json::from_str(
            r#"{"model": "resnet", "epochs": 10, "lr": 1.0, "augment": true}"#,
        )
        .unwrap();
        assert_eq!(
            spec.iter().collect::<Vec<_>>(),
            vec![
                ("model", "resnet"),
                ("epochs", "10"),
                ("lr", "1.0"),
                ("augment", "True")
            ]
        );
    }

    #[test]
    fn deserialize_rejects_nested_values() {
        assert!(serde_json::from_str::<JobSpec>(r#"{"a": [1, 2]}"#).is_err());
    }
}
