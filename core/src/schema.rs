use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// The JSON type tags a tool parameter can advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    String,
    Integer,
    Number,
    Boolean,
}

/// A declared type hint on a parameter. Anything outside the four
/// primitives is carried as `Other` and degrades to a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeHint {
    Str,
    Int,
    Float,
    Bool,
    Other(String),
}

impl TypeHint {
    pub fn json_type(&self) -> JsonType {
        match self {
            TypeHint::Str => JsonType::String,
            TypeHint::Int => JsonType::Integer,
            TypeHint::Float => JsonType::Number,
            TypeHint::Bool => JsonType::Boolean,
            TypeHint::Other(_) => JsonType::String,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Named,
    /// Catch-all positional (`*args`-style).
    VariadicPositional,
    /// Catch-all keyword (`**kwargs`-style).
    VariadicKeyword,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
    pub hint: Option<TypeHint>,
    pub has_default: bool,
}

/// An ordered parameter list, declared explicitly at registration time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    params: Vec<Param>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: &str, hint: TypeHint) -> Self {
        self.params.push(Param {
            name: name.to_string(),
            kind: ParamKind::Named,
            hint: Some(hint),
            has_default: false,
        });
        self
    }

    pub fn optional(mut self, name: &str, hint: TypeHint) -> Self {
        self.params.push(Param {
            name: name.to_string(),
            kind: ParamKind::Named,
            hint: Some(hint),
            has_default: true,
        });
        self
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub json_type: JsonType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: BTreeMap<String, PropertySchema>,
    pub required: Vec<String>,
}

impl ParameterSchema {
    /// Attaches a description to an existing property. Unknown names are ignored.
    pub fn describe(mut self, name: &str, description: &str) -> Self {
        if let Some(property) = self.properties.get_mut(name) {
            property.description = Some(description.to_string());
        }
        self
    }

    /// Restricts an existing property to a fixed set of values.
    pub fn restrict(mut self, name: &str, allowed: &[&str]) -> Self {
        if let Some(property) = self.properties.get_mut(name) {
            property.allowed = Some(allowed.iter().map(|v| v.to_string()).collect());
        }
        self
    }

    /// True when every required name is also a declared property.
    pub fn is_consistent(&self) -> bool {
        self.required.iter().all(|name| self.properties.contains_key(name))
    }
}

/// Derives `{type: "object", properties, required}` from a signature.
/// Variadic parameters are dropped; a parameter is required iff it has no default.
/// A repeated name keeps its first declaration.
pub fn infer_parameters(signature: &Signature) -> ParameterSchema {
    let mut properties = BTreeMap::new();
    let mut required = Vec::new();

    for param in signature.params() {
        if param.kind != ParamKind::Named || properties.contains_key(&param.name) {
            continue;
        }

        let json_type = param
            .hint
            .as_ref()
            .map(TypeHint::json_type)
            .unwrap_or(JsonType::String);

        properties.insert(
            param.name.clone(),
            PropertySchema {
                json_type,
                description: None,
                allowed: None,
            },
        );

        if !param.has_default {
            required.push(param.name.clone());
        }
    }

    ParameterSchema {
        schema_type: "object".to_string(),
        properties,
        required,
    }
}
