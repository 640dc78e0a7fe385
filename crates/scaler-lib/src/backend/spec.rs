//! Node group spec parsing
//!
//! A spec has the form `identifier:minSize:maxSize[:payload]`. The payload is
//! opaque to the parser and may contain further colons.

use crate::error::{Result, ScalerError};
use std::collections::HashSet;

/// A validated node group spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSpec {
    pub name: String,
    pub min_size: usize,
    pub max_size: usize,
    pub payload: String,
}

/// Parses node group specs for one backend
#[derive(Debug, Clone, Copy)]
pub struct SpecParser {
    scale_to_zero: bool,
}

impl Default for SpecParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SpecParser {
    /// Parser accepting groups that may scale down to zero instances
    pub fn new() -> Self {
        Self {
            scale_to_zero: true,
        }
    }

    /// Whether a minimum size of zero is allowed
    pub fn scale_to_zero(mut self, supported: bool) -> Self {
        self.scale_to_zero = supported;
        self
    }

    /// Parse a single spec
    pub fn parse(&self, value: &str) -> Result<PoolSpec> {
        let mut fields = value.splitn(4, ':');
        let name = fields.next().unwrap_or_default().trim();
        let (Some(min), Some(max)) = (fields.next(), fields.next()) else {
            return Err(ScalerError::config(
                value,
                "expected identifier:minSize:maxSize[:payload]",
            ));
        };
        let payload = fields.next().unwrap_or_default();

        if name.is_empty() {
            return Err(ScalerError::config(value, "identifier must not be empty"));
        }

        let min = parse_size(value, "minSize", min)?;
        let max = parse_size(value, "maxSize", max)?;

        if min < 0 {
            return Err(ScalerError::config(value, "minSize must be >= 0"));
        }
        if !self.scale_to_zero && min < 1 {
            return Err(ScalerError::config(
                value,
                "minSize must be >= 1, this backend cannot scale to zero",
            ));
        }
        if max < min {
            return Err(ScalerError::config(
                value,
                format!("maxSize {max} is smaller than minSize {min}"),
            ));
        }

        Ok(PoolSpec {
            name: name.to_string(),
            min_size: min as usize,
            max_size: max as usize,
            payload: payload.to_string(),
        })
    }

    /// Parse every spec, failing on the first invalid one or on a repeated
    /// identifier. Nothing is returned unless the whole list is valid.
    pub fn parse_all<S: AsRef<str>>(&self, values: &[S]) -> Result<Vec<PoolSpec>> {
        let mut seen = HashSet::new();
        let mut specs = Vec::with_capacity(values.len());

        for value in values {
            let value = value.as_ref();
            let spec = self.parse(value)?;
            if !seen.insert(spec.name.clone()) {
                return Err(ScalerError::config(
                    value,
                    format!("duplicate node group identifier {}", spec.name),
                ));
            }
            specs.push(spec);
        }

        Ok(specs)
    }
}

fn parse_size(spec: &str, field: &str, raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|e| ScalerError::config(spec, format!("invalid {field} {raw:?}: {e}")))
}
