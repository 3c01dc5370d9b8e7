//! Schema validation for path and query parameters.
//!
//! Every route declares the parameters it accepts. Raw strings taken from the
//! matched path and from the query string are coerced and checked here, before
//! any authorization logic sees them. Validation never stops at the first
//! problem: the caller gets every violated field at once.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use regex::Regex;
use serde::Serialize;
use validator::{ValidateLength, ValidateRange};

use crate::errors::RegistrationError;

/// Where a parameter came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamLocation {
    Path,
    Query,
}

impl fmt::Display for ParamLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamLocation::Path => write!(f, "path"),
            ParamLocation::Query => write!(f, "query"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Str,
    Int,
    Bool,
}

/// A coerced parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl Value {
    fn field_type(&self) -> FieldType {
        match self {
            Value::Str(_) => FieldType::Str,
            Value::Int(_) => FieldType::Int,
            Value::Bool(_) => FieldType::Bool,
        }
    }
}

/// Literal tokens accepted for boolean fields.
pub const BOOL_TRUE: &str = "true";
pub const BOOL_FALSE: &str = "false";

#[derive(Debug, Clone)]
pub enum Constraint {
    Matches(Regex),
    MaxLength(u64),
    ExactLength(u64),
    AtLeast(i64),
    AtMost(i64),
}

impl Constraint {
    fn applies_to(&self) -> FieldType {
        match self {
            Constraint::Matches(_) | Constraint::MaxLength(_) | Constraint::ExactLength(_) => {
                FieldType::Str
            }
            Constraint::AtLeast(_) | Constraint::AtMost(_) => FieldType::Int,
        }
    }

    fn check(&self, value: &Value) -> Option<Violation> {
        match (self, value) {
            (Constraint::Matches(regex), Value::Str(s)) if !regex.is_match(s) => {
                Some(Violation::PatternMismatch {
                    pattern: regex.as_str().to_string(),
                })
            }
            (Constraint::MaxLength(max), Value::Str(s))
                if !s.as_str().validate_length(None, Some(*max), None) =>
            {
                Some(Violation::TooLong { max: *max })
            }
            (Constraint::ExactLength(expected), Value::Str(s))
                if !s.as_str().validate_length(None, None, Some(*expected)) =>
            {
                Some(Violation::WrongLength {
                    expected: *expected,
                })
            }
            (Constraint::AtLeast(min), Value::Int(i))
                if !i.validate_range(Some(*min), None, None, None) =>
            {
                Some(Violation::BelowMinimum { min: *min })
            }
            (Constraint::AtMost(max), Value::Int(i))
                if !i.validate_range(None, Some(*max), None, None) =>
            {
                Some(Violation::AboveMaximum { max: *max })
            }
            _ => None,
        }
    }
}

/// Declaration of one accepted parameter.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    name: String,
    ty: FieldType,
    constraints: Vec<Constraint>,
    optional: bool,
    default: Option<Value>,
}

impl FieldSchema {
    fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            constraints: Vec::new(),
            optional: false,
            default: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Str)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Int)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Bool)
    }

    pub fn matching(mut self, regex: Regex) -> Self {
        self.constraints.push(Constraint::Matches(regex));
        self
    }

    pub fn max_length(mut self, max: u64) -> Self {
        self.constraints.push(Constraint::MaxLength(max));
        self
    }

    pub fn exact_length(mut self, len: u64) -> Self {
        self.constraints.push(Constraint::ExactLength(len));
        self
    }

    pub fn at_least(mut self, min: i64) -> Self {
        self.constraints.push(Constraint::AtLeast(min));
        self
    }

    pub fn at_most(mut self, max: i64) -> Self {
        self.constraints.push(Constraint::AtMost(max));
        self
    }

    /// Query fields only: absence is not an error.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Query fields only: value used when the parameter is absent.
    pub fn with_default(mut self, value: Value) -> Self {
        self.optional = true;
        self.default = Some(value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.ty
    }

    fn coerce(&self, raw: &str) -> Result<Value, Violation> {
        match self.ty {
            FieldType::Str => Ok(Value::Str(raw.to_string())),
            FieldType::Int => raw
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| Violation::NotAnInteger),
            FieldType::Bool => match raw {
                BOOL_TRUE => Ok(Value::Bool(true)),
                BOOL_FALSE => Ok(Value::Bool(false)),
                _ => Err(Violation::NotABoolean),
            },
        }
    }

    /// Coerce then apply every constraint, reporting all that fail.
    fn validate(&self, raw: &str) -> Result<Value, Vec<Violation>> {
        let value = self.coerce(raw).map_err(|v| vec![v])?;
        let violations: Vec<Violation> = self
            .constraints
            .iter()
            .filter_map(|c| c.check(&value))
            .collect();

        if violations.is_empty() {
            Ok(value)
        } else {
            Err(violations)
        }
    }

    fn check_declaration(
        &self,
        route: &str,
        location: ParamLocation,
    ) -> Result<(), RegistrationError> {
        if let Some(constraint) = self
            .constraints
            .iter()
            .find(|c| c.applies_to() != self.ty)
        {
            return Err(RegistrationError::ConstraintTypeMismatch {
                route: route.to_string(),
                field: self.name.clone(),
                constraint: format!("{:?}", constraint),
            });
        }

        if location == ParamLocation::Path && (self.optional || self.default.is_some()) {
            return Err(RegistrationError::OptionalPathField {
                route: route.to_string(),
                field: self.name.clone(),
            });
        }

        if let Some(default) = &self.default
            && default.field_type() != self.ty
        {
            return Err(RegistrationError::DefaultTypeMismatch {
                route: route.to_string(),
                field: self.name.clone(),
            });
        }

        Ok(())
    }
}

/// What was wrong with a single parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum Violation {
    Missing,
    Unknown,
    Repeated,
    NotAnInteger,
    NotABoolean,
    PatternMismatch { pattern: String },
    TooLong { max: u64 },
    WrongLength { expected: u64 },
    BelowMinimum { min: i64 },
    AboveMaximum { max: i64 },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Missing => write!(f, "is required"),
            Violation::Unknown => write!(f, "is not an accepted parameter"),
            Violation::Repeated => write!(f, "was given more than once"),
            Violation::NotAnInteger => write!(f, "must be an integer"),
            Violation::NotABoolean => {
                write!(f, "must be '{}' or '{}'", BOOL_TRUE, BOOL_FALSE)
            }
            Violation::PatternMismatch { pattern } => {
                write!(f, "must match the pattern {}", pattern)
            }
            Violation::TooLong { max } => write!(f, "must be at most {} characters", max),
            Violation::WrongLength { expected } => {
                write!(f, "must be exactly {} characters", expected)
            }
            Violation::BelowMinimum { min } => write!(f, "must be at least {}", min),
            Violation::AboveMaximum { max } => write!(f, "must be at most {}", max),
        }
    }
}

/// A violation attributed to a named parameter. Safe to show to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub location: ParamLocation,
    #[serde(flatten)]
    pub violation: Violation,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} parameter '{}' {}", self.location, self.field, self.violation)
    }
}

/// Unvalidated parameters as they arrived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawParams {
    pub path: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
}

impl RawParams {
    pub fn new(path: Vec<(String, String)>, query: Vec<(String, String)>) -> Self {
        Self { path, query }
    }
}

/// Typed, schema-checked parameters. Only [`Schema::validate`] builds one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedParams {
    path: BTreeMap<String, Value>,
    query: BTreeMap<String, Value>,
}

impl ValidatedParams {
    pub fn path(&self, name: &str) -> Option<&Value> {
        self.path.get(name)
    }

    pub fn path_str(&self, name: &str) -> Option<&str> {
        match self.path.get(name) {
            Some(Value::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn query(&self, name: &str) -> Option<&Value> {
        self.query.get(name)
    }

    pub fn query_str(&self, name: &str) -> Option<&str> {
        match self.query.get(name) {
            Some(Value::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn query_int(&self, name: &str) -> Option<i64> {
        match self.query.get(name) {
            Some(Value::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn query_bool(&self, name: &str) -> Option<bool> {
        match self.query.get(name) {
            Some(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn has_query(&self, name: &str) -> bool {
        self.query.contains_key(name)
    }
}

/// Declared parameters of a route.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    path: Vec<FieldSchema>,
    query: Vec<FieldSchema>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path_field(mut self, field: FieldSchema) -> Self {
        self.path.push(field);
        self
    }

    pub fn query_field(mut self, field: FieldSchema) -> Self {
        self.query.push(field);
        self
    }

    pub fn path_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.path.iter()
    }

    pub fn query_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.query.iter()
    }

    pub fn declares(&self, location: ParamLocation, name: &str) -> bool {
        let fields = match location {
            ParamLocation::Path => &self.path,
            ParamLocation::Query => &self.query,
        };
        fields.iter().any(|f| f.name == name)
    }

    pub fn field(&self, location: ParamLocation, name: &str) -> Option<&FieldSchema> {
        let fields = match location {
            ParamLocation::Path => &self.path,
            ParamLocation::Query => &self.query,
        };
        fields.iter().find(|f| f.name == name)
    }

    /// Checks the declaration itself; run once when the route is built.
    pub(crate) fn check_declaration(&self, route: &str) -> Result<(), RegistrationError> {
        for (location, fields) in [
            (ParamLocation::Path, &self.path),
            (ParamLocation::Query, &self.query),
        ] {
            let mut seen = HashSet::new();
            for field in fields {
                if !seen.insert(field.name.as_str()) {
                    return Err(RegistrationError::DuplicateField {
                        route: route.to_string(),
                        field: field.name.clone(),
                    });
                }
                field.check_declaration(route, location)?;
            }
        }
        Ok(())
    }

    /// Coerce and check raw parameters against this schema.
    ///
    /// Path fields are always required. Query fields may be optional or carry
    /// a default. Parameters the schema does not declare are rejected.
    pub fn validate(&self, raw: &RawParams) -> Result<ValidatedParams, Vec<FieldViolation>> {
        let mut violations = Vec::new();
        let path = Self::validate_location(
            &self.path,
            &raw.path,
            ParamLocation::Path,
            &mut violations,
        );
        let query = Self::validate_location(
            &self.query,
            &raw.query,
            ParamLocation::Query,
            &mut violations,
        );

        if violations.is_empty() {
            Ok(ValidatedParams { path, query })
        } else {
            Err(violations)
        }
    }

    fn validate_location(
        fields: &[FieldSchema],
        raw: &[(String, String)],
        location: ParamLocation,
        violations: &mut Vec<FieldViolation>,
    ) -> BTreeMap<String, Value> {
        let mut validated = BTreeMap::new();
        let report = |field: &str, violation: Violation| FieldViolation {
            field: field.to_string(),
            location,
            violation,
        };

        let mut reported = HashSet::new();
        for (name, _) in raw {
            let occurrences = raw.iter().filter(|(n, _)| n == name).count();
            if !fields.iter().any(|f| &f.name == name) {
                if reported.insert(name.as_str()) {
                    violations.push(report(name, Violation::Unknown));
                }
            } else if occurrences > 1 && reported.insert(name.as_str()) {
                violations.push(report(name, Violation::Repeated));
            }
        }

        for field in fields {
            if reported.contains(field.name.as_str()) {
                continue;
            }
            match raw.iter().find(|(n, _)| n == &field.name) {
                Some((_, value)) => match field.validate(value) {
                    Ok(value) => {
                        validated.insert(field.name.clone(), value);
                    }
                    Err(errs) => {
                        violations.extend(errs.into_iter().map(|e| report(&field.name, e)))
                    }
                },
                None if field.optional => {
                    if let Some(default) = &field.default {
                        validated.insert(field.name.clone(), default.clone());
                    }
                }
                None => violations.push(report(&field.name, Violation::Missing)),
            }
        }

        validated
    }
}
