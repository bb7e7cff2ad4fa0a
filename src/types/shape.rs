use std::str::FromStr;

use super::Error;

/// The execution form requested by a call.
///
/// The shape is fixed by the facade surface the call was made on, never by the
/// operation name: calling anything on the scalar surface always dispatches as
/// [`Shape::Scalar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Single tabular result
    Table,
    /// Collection of tabular results
    Set,
    /// Forward-only row cursor
    Reader,
    /// First column of the first row
    Scalar,
    /// No result, only side effects
    NonQuery,
}

impl Shape {
    pub const ALL: [Shape; 5] = [
        Shape::Table,
        Shape::Set,
        Shape::Reader,
        Shape::Scalar,
        Shape::NonQuery,
    ];

    /// Returns true if the database returns rows for this shape.
    pub fn returns_rows(&self) -> bool {
        matches!(self, Self::Table | Self::Set | Self::Reader)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Set => "set",
            Self::Reader => "reader",
            Self::Scalar => "scalar",
            Self::NonQuery => "query",
        }
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Shape {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "table" => Ok(Self::Table),
            "set" => Ok(Self::Set),
            "reader" => Ok(Self::Reader),
            "scalar" => Ok(Self::Scalar),
            "query" => Ok(Self::NonQuery),
            _ => Err(Error::UnknownShape(value.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str() {
        for shape in Shape::ALL {
            assert_eq!(Shape::from_str(shape.as_str()).unwrap(), shape);
        }

        assert!(Shape::from_str("nonquery").is_err());
    }

    #[test]
    fn to_str() {
        assert_eq!("table", Shape::Table.to_string());
        assert_eq!("query", Shape::NonQuery.to_string());
    }

    #[test]
    fn returns_rows() {
        assert!(Shape::Reader.returns_rows());
        assert!(!Shape::Scalar.returns_rows());
        assert!(!Shape::NonQuery.returns_rows());
    }
}
