use std::collections::BTreeMap;

use crate::Filterable;

#[derive(Debug, Default)]
pub struct TestSample {
    labels: BTreeMap<String, String>,
    value: f64,
}

impl TestSample {
    pub fn new(value: f64) -> Self {
        Self {
            labels: BTreeMap::new(),
            value,
        }
    }

    pub fn label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Filterable for TestSample {
    fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    fn value(&self) -> f64 {
        self.value
    }
}
