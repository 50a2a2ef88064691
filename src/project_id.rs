use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Represents a project ID.
///
/// This is a thin wrapper around IDs supported by the Sentry
/// server.  The ID is the last path component of a DSN and is
/// also the `project` attribute of every transmitted event.
#[derive(Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct ProjectId {
    // for now the only supported format is indeed an u64
    val: u64,
}

/// Raised if a project ID cannot be parsed from a string.
#[derive(Debug, Error, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProjectIdParseError {
    /// Raised if the value is not an integer in the supported range.
    #[error("invalid value for project id")]
    InvalidValue,
    /// Raised if an empty value is parsed.
    #[error("empty or missing project id")]
    EmptyValue,
}

impl ProjectId {
    /// Returns the numeric value of this project ID.
    pub fn value(self) -> u64 {
        self.val
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.val)
    }
}

impl fmt::Debug for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

macro_rules! impl_from {
    ($ty:ty) => {
        impl From<$ty> for ProjectId {
            fn from(val: $ty) -> ProjectId {
                ProjectId { val: val as u64 }
            }
        }
    };
}

impl_from!(u8);
impl_from!(u16);
impl_from!(u32);
impl_from!(u64);

impl FromStr for ProjectId {
    type Err = ProjectIdParseError;

    fn from_str(s: &str) -> Result<ProjectId, ProjectIdParseError> {
        if s.is_empty() {
            return Err(ProjectIdParseError::EmptyValue);
        }
        match s.parse::<u64>() {
            Ok(val) => Ok(ProjectId { val }),
            Err(_) => Err(ProjectIdParseError::InvalidValue),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_basic_api() {
        let id: ProjectId = "42".parse().unwrap();
        assert_eq!(id, ProjectId::from(42u32));
        assert_eq!(id.value(), 42);
        assert_eq!(
            "42xxx".parse::<ProjectId>(),
            Err(ProjectIdParseError::InvalidValue)
        );
        assert_eq!(
            "".parse::<ProjectId>(),
            Err(ProjectIdParseError::EmptyValue)
        );
        assert_eq!(ProjectId::from(42u32).to_string(), "42");
    }
}
