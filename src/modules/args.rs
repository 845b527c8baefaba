//! Typed accessors over loosely-typed module arguments
//!
//! Playbooks hand values over as YAML scalars, so booleans may arrive as
//! `"yes"`/`"no"` and integers as strings. The accessors here accept those
//! forms and report anything else as a [`ValidationError`].

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::modules::{error::ValidationError, interface::ModuleArgs};

fn invalid(arg: &str, value: &Value, reason: &str) -> ValidationError {
    ValidationError::InvalidArgValue {
        arg: arg.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

impl ModuleArgs {
    pub fn contains(&self, name: &str) -> bool {
        self.args.get(name).is_some_and(|v| !v.is_null())
    }

    pub fn get_str(&self, name: &str) -> Result<Option<String>, ValidationError> {
        match self.args.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(other) => Err(invalid(name, other, "expected a string")),
        }
    }

    pub fn required_str(&self, name: &str) -> Result<String, ValidationError> {
        self.get_str(name)?
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ValidationError::MissingRequiredArg {
                arg: name.to_string(),
            })
    }

    pub fn get_bool(&self, name: &str, default: bool) -> Result<bool, ValidationError> {
        match self.args.get(name) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::Number(n)) => Ok(n.as_i64().unwrap_or(0) != 0),
            Some(v @ Value::String(s)) => match s.to_ascii_lowercase().as_str() {
                "yes" | "true" | "on" | "1" | "y" => Ok(true),
                "no" | "false" | "off" | "0" | "n" => Ok(false),
                _ => Err(invalid(name, v, "expected a boolean")),
            },
            Some(other) => Err(invalid(name, other, "expected a boolean")),
        }
    }

    pub fn get_u64(&self, name: &str) -> Result<Option<u64>, ValidationError> {
        match self.args.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(v @ Value::Number(n)) => n
                .as_u64()
                .map(Some)
                .ok_or_else(|| invalid(name, v, "expected a non-negative integer")),
            Some(v @ Value::String(s)) => s
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| invalid(name, v, "expected a non-negative integer")),
            Some(other) => Err(invalid(name, other, "expected a non-negative integer")),
        }
    }

    pub fn get_f64(&self, name: &str) -> Result<Option<f64>, ValidationError> {
        match self.args.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(v @ Value::Number(n)) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| invalid(name, v, "expected a number")),
            Some(v @ Value::String(s)) => match s.trim().parse::<f64>() {
                Ok(parsed) if parsed.is_finite() => Ok(Some(parsed)),
                _ => Err(invalid(name, v, "expected a number")),
            },
            Some(other) => Err(invalid(name, other, "expected a number")),
        }
    }

    /// String argument restricted to `choices`, falling back to `default`
    pub fn get_choice(
        &self,
        name: &str,
        choices: &[&str],
        default: Option<&str>,
    ) -> Result<Option<String>, ValidationError> {
        let value = match self.get_str(name)? {
            Some(value) => value,
            None => return Ok(default.map(String::from)),
        };
        if choices.contains(&value.as_str()) {
            Ok(Some(value))
        } else {
            Err(ValidationError::InvalidChoice {
                arg: name.to_string(),
                value,
                choices: choices.iter().map(|c| c.to_string()).collect(),
            })
        }
    }

    /// Argument that must be one of `choices`, with a default that always applies
    pub fn choice(
        &self,
        name: &str,
        choices: &[&str],
        default: &str,
    ) -> Result<String, ValidationError> {
        Ok(self
            .get_choice(name, choices, Some(default))?
            .unwrap_or_else(|| default.to_string()))
    }

    /// List of strings; a single comma-separated string is split
    pub fn get_str_list(&self, name: &str) -> Result<Vec<String>, ValidationError> {
        match self.args.get(name) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    Value::Number(n) => Ok(n.to_string()),
                    other => Err(invalid(name, other, "expected a list of strings")),
                })
                .collect(),
            Some(Value::String(s)) => Ok(s
                .split(',')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect()),
            Some(other) => Err(invalid(name, other, "expected a list of strings")),
        }
    }

    pub fn get_u64_list(&self, name: &str) -> Result<Vec<u64>, ValidationError> {
        match self.args.get(name) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::Number(n) => n
                        .as_u64()
                        .ok_or_else(|| invalid(name, item, "expected a list of integers")),
                    Value::String(s) => s
                        .trim()
                        .parse()
                        .map_err(|_| invalid(name, item, "expected a list of integers")),
                    other => Err(invalid(name, other, "expected a list of integers")),
                })
                .collect(),
            Some(other) => Err(invalid(name, other, "expected a list of integers")),
        }
    }

    /// Deserialize a structured argument (lists of dicts, nested mappings)
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ValidationError> {
        match self.args.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| invalid(name, value, &e.to_string())),
        }
    }

    /// Fail when more than one of `names` is set
    pub fn mutually_exclusive(&self, names: &[&str]) -> Result<(), ValidationError> {
        let present: Vec<String> = names
            .iter()
            .filter(|n| self.contains(n))
            .map(|n| n.to_string())
            .collect();
        if present.len() > 1 {
            return Err(ValidationError::MutuallyExclusive { args: present });
        }
        Ok(())
    }
}
