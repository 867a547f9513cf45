//! API documentation model.
//!
//! The on-disk format is JSON: a list of classes with their constants,
//! properties, theme items, methods and signals. Only the fields needed to
//! build the native symbol catalog are modeled; unknown fields are ignored.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiDocs {
    #[serde(default)]
    pub classes: Vec<ClassDoc>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassDoc {
    pub name: String,
    #[serde(default)]
    pub inherits: Option<String>,
    #[serde(default)]
    pub brief_description: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub constants: Vec<ConstantDoc>,
    /// Properties.
    #[serde(default)]
    pub members: Vec<PropertyDoc>,
    #[serde(default)]
    pub theme_items: Vec<PropertyDoc>,
    #[serde(default)]
    pub methods: Vec<MethodDoc>,
    #[serde(default)]
    pub signals: Vec<MethodDoc>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstantDoc {
    pub name: String,
    #[serde(default)]
    pub value: String,
    /// Owning enum, if the constant is an enum value.
    #[serde(default)]
    pub enumeration: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyDoc {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_name: String,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodDoc {
    pub name: String,
    #[serde(default)]
    pub return_type: Option<String>,
    #[serde(default)]
    pub arguments: Vec<ArgumentDoc>,
    /// Space separated, e.g. `"const vararg"`.
    #[serde(default)]
    pub qualifiers: String,
    #[serde(default)]
    pub description: String,
}

impl MethodDoc {
    pub fn is_vararg(&self) -> bool {
        self.qualifiers.split_whitespace().any(|q| q == "vararg")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ArgumentDoc {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_name: String,
    #[serde(default)]
    pub default_value: Option<String>,
}

impl ApiDocs {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
