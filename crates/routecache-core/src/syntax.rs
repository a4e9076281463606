//! Route address syntax: delimiter, parameter prefix and glob character.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RouteError};
use crate::matcher;

/// The characters that give structure to route addresses.
///
/// An address is *concrete* when it names a single resource (`/users/123`)
/// and *generic* when it names a group (`/users/:id`, `/users/*`, `*`).
///
/// # Examples
///
/// ```
/// use routecache_core::RouteSyntax;
///
/// let syntax = RouteSyntax::default();
/// assert!(syntax.is_concrete("/users/123"));
/// assert!(syntax.is_generic("/users/:id"));
/// assert!(syntax.is_generic("*"));
/// assert_eq!(syntax.normalize("/users/"), "/users");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteSyntax {
    /// Segment separator (default `/`).
    pub delimiter: char,
    /// Marks a named parameter segment (default `:`).
    pub param_prefix: char,
    /// Wildcard character (default `*`).
    pub glob: char,
}

impl Default for RouteSyntax {
    fn default() -> Self {
        Self {
            delimiter: '/',
            param_prefix: ':',
            glob: '*',
        }
    }
}

impl RouteSyntax {
    /// Creates a validated syntax.
    pub fn new(delimiter: char, param_prefix: char, glob: char) -> Result<Self> {
        let syntax = Self {
            delimiter,
            param_prefix,
            glob,
        };
        syntax.validate()?;
        Ok(syntax)
    }

    /// Checks that the three characters can be told apart.
    pub fn validate(&self) -> Result<()> {
        if self.param_prefix == self.glob {
            return Err(RouteError::invalid_syntax(format!(
                "the glob character '{}' cannot be used as a parameter prefix",
                self.glob
            )));
        }
        if self.delimiter == self.param_prefix || self.delimiter == self.glob {
            return Err(RouteError::invalid_syntax(format!(
                "the delimiter '{}' must differ from the parameter prefix and the glob character",
                self.delimiter
            )));
        }
        Ok(())
    }

    /// Returns true if the address names a group of resources.
    pub fn is_generic(&self, address: &str) -> bool {
        let param_marker: String = [self.delimiter, self.param_prefix].iter().collect();
        let glob_marker: String = [self.delimiter, self.glob].iter().collect();

        address.contains(&param_marker)
            || address.contains(&glob_marker)
            || self.is_catch_all(address)
    }

    /// Returns true if the address names a single resource.
    pub fn is_concrete(&self, address: &str) -> bool {
        !self.is_generic(address)
    }

    /// Returns true if the address is the bare glob.
    pub fn is_catch_all(&self, address: &str) -> bool {
        let mut chars = address.chars();
        chars.next() == Some(self.glob) && chars.next().is_none()
    }

    /// The bare glob as an owned address.
    pub fn catch_all(&self) -> String {
        self.glob.to_string()
    }

    /// Returns true if the pattern carries both a parameter and a glob.
    pub fn is_mixed(&self, pattern: &str) -> bool {
        pattern.contains(self.param_prefix) && pattern.contains(self.glob)
    }

    /// Rejects group patterns that mix parameters and globs.
    pub fn check_group_pattern(&self, pattern: &str) -> Result<()> {
        if self.is_mixed(pattern) {
            return Err(RouteError::MixedPattern {
                pattern: pattern.to_string(),
                param_prefix: self.param_prefix,
                glob: self.glob,
            });
        }
        Ok(())
    }

    /// Drops one trailing delimiter, leaving single-character addresses alone.
    pub fn normalize<'a>(&self, address: &'a str) -> &'a str {
        if address.chars().nth(1).is_none() {
            return address;
        }
        address.strip_suffix(self.delimiter).unwrap_or(address)
    }

    /// Matches an address against a pattern with parameter segments enabled.
    pub fn matches(&self, address: &str, pattern: &str) -> bool {
        matcher::matches(
            address,
            pattern,
            self.delimiter,
            Some(self.param_prefix),
            self.glob,
        )
    }
}
