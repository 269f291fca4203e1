//! Request enumerations accepted by the transformation endpoint.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// Which capability of the transformation engine a request invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    #[default]
    Unshort,
    Clear,
}

impl Operation {
    pub const ALL: [Operation; 2] = [Operation::Clear, Operation::Unshort];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Unshort => "unshort",
            Operation::Clear => "clear",
        }
    }

    /// Resolve an optional query value; absent or empty means [`Operation::Unshort`].
    pub fn resolve(raw: Option<&str>) -> Result<Self, ValidationError> {
        match raw.filter(|value| !value.is_empty()) {
            Some(value) => value.parse(),
            None => Ok(Self::default()),
        }
    }

    pub(crate) fn supported() -> String {
        join_names(Self::ALL.iter().map(|op| op.as_str()))
    }
}

impl FromStr for Operation {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == value)
            .ok_or_else(|| ValidationError::operation(value))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire format of a response produced by the transformation endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Html,
    Json,
    Jsonp,
    Xml,
    Yaml,
    Toml,
    Text,
    Redirect,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 8] = [
        OutputFormat::Json,
        OutputFormat::Jsonp,
        OutputFormat::Xml,
        OutputFormat::Yaml,
        OutputFormat::Toml,
        OutputFormat::Text,
        OutputFormat::Html,
        OutputFormat::Redirect,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Json => "json",
            OutputFormat::Jsonp => "jsonp",
            OutputFormat::Xml => "xml",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Toml => "toml",
            OutputFormat::Text => "text",
            OutputFormat::Redirect => "redirect",
        }
    }

    /// Resolve an optional query value; absent or empty means [`OutputFormat::Html`].
    pub fn resolve(raw: Option<&str>) -> Result<Self, ValidationError> {
        match raw.filter(|value| !value.is_empty()) {
            Some(value) => value.parse(),
            None => Ok(Self::default()),
        }
    }

    pub(crate) fn supported() -> String {
        join_names(Self::ALL.iter().map(|format| format.as_str()))
    }
}

impl FromStr for OutputFormat {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.as_str() == value)
            .ok_or_else(|| ValidationError::output(value))
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(" or ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_values_fall_back_to_defaults() {
        assert_eq!(Operation::resolve(None), Ok(Operation::Unshort));
        assert_eq!(Operation::resolve(Some("")), Ok(Operation::Unshort));
        assert_eq!(OutputFormat::resolve(None), Ok(OutputFormat::Html));
        assert_eq!(OutputFormat::resolve(Some("")), Ok(OutputFormat::Html));
    }

    #[test]
    fn every_variant_parses_from_its_name() {
        for op in Operation::ALL {
            assert_eq!(op.as_str().parse::<Operation>(), Ok(op));
        }
        for format in OutputFormat::ALL {
            assert_eq!(format.as_str().parse::<OutputFormat>(), Ok(format));
        }
    }

    #[test]
    fn unknown_values_are_rejected_not_coerced() {
        let err = Operation::resolve(Some("banana")).expect_err("banana is not an operation");
        assert_eq!(err, ValidationError::operation("banana"));
        assert_eq!(
            err.to_string(),
            "invalid method type, the supported method types are clear or unshort."
        );

        let err = OutputFormat::resolve(Some("JSON")).expect_err("names are case-sensitive");
        assert_eq!(err.value(), "JSON");
        assert_eq!(
            err.to_string(),
            "invalid output type, the supported output types are json or jsonp or xml or yaml or toml or text or html or redirect."
        );
    }
}
