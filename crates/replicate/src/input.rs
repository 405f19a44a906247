//! Model input preparation.
//!
//! Inputs are JSON values, except for in-memory files which the API can
//! only receive inline. [`ModelInput::prepare`] converts every file into
//! a data URI and leaves everything else as-is.

use std::collections::BTreeMap;

use amp_core::media::FileInput;
use serde_json::{Map, Value};

/// A single model input parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    Json(Value),
    File(FileInput),
}

impl InputValue {
    /// Wire form: files become `data:` URIs; JSON (including URL and
    /// data-URI strings) passes through unchanged.
    pub fn prepare(&self) -> Value {
        match self {
            Self::Json(value) => value.clone(),
            Self::File(file) => Value::String(file.to_data_uri()),
        }
    }
}

impl From<Value> for InputValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<FileInput> for InputValue {
    fn from(file: FileInput) -> Self {
        Self::File(file)
    }
}

macro_rules! json_input_from {
    ($($t:ty),+ $(,)?) => {
        $(
            impl From<$t> for InputValue {
                fn from(value: $t) -> Self {
                    Self::Json(Value::from(value))
                }
            }
        )+
    };
}

json_input_from!(&str, String, bool, i32, i64, u32, u64, f32, f64);

/// Named input parameters for one prediction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelInput {
    fields: BTreeMap<String, InputValue>,
}

impl ModelInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<InputValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert only when `value` is `Some`.
    pub fn with_opt<V: Into<InputValue>>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with(key, v),
            None => self,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<InputValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&InputValue> {
        self.fields.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Render the JSON object sent as `input`.
    pub fn prepare(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), v.prepare()))
            .collect()
    }
}
