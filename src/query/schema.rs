//! Series schema validation
//!
//! CREATE TIMESERIES names a data type and an on-disk encoding; both come
//! from closed sets and not every pairing is legal. The compatibility
//! matrix lives here as a pure function of the two names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::{PlanError, PlanResult};

/// Value type of a time series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Int32,
    Int64,
    Float,
    Double,
    Enums,
    Text,
}

impl FromStr for DataType {
    type Err = PlanError;

    fn from_str(s: &str) -> PlanResult<Self> {
        match s {
            "BOOLEAN" => Ok(DataType::Boolean),
            "INT32" => Ok(DataType::Int32),
            "INT64" => Ok(DataType::Int64),
            "FLOAT" => Ok(DataType::Float),
            "DOUBLE" => Ok(DataType::Double),
            "ENUMS" => Ok(DataType::Enums),
            "TEXT" => Ok(DataType::Text),
            other => Err(PlanError::semantic(format!(
                "data type {} is not supported",
                other
            ))),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Boolean => "BOOLEAN",
            DataType::Int32 => "INT32",
            DataType::Int64 => "INT64",
            DataType::Float => "FLOAT",
            DataType::Double => "DOUBLE",
            DataType::Enums => "ENUMS",
            DataType::Text => "TEXT",
        };
        write!(f, "{}", name)
    }
}

/// On-disk value compression scheme for a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    Plain,
    Rle,
    Ts2Diff,
    Bitmap,
    Gorilla,
}

impl FromStr for Encoding {
    type Err = PlanError;

    fn from_str(s: &str) -> PlanResult<Self> {
        match s {
            "PLAIN" => Ok(Encoding::Plain),
            "RLE" => Ok(Encoding::Rle),
            "TS_2DIFF" => Ok(Encoding::Ts2Diff),
            "BITMAP" => Ok(Encoding::Bitmap),
            "GORILLA" => Ok(Encoding::Gorilla),
            other => Err(PlanError::semantic(format!(
                "encoding {} is not supported",
                other
            ))),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Encoding::Plain => "PLAIN",
            Encoding::Rle => "RLE",
            Encoding::Ts2Diff => "TS_2DIFF",
            Encoding::Bitmap => "BITMAP",
            Encoding::Gorilla => "GORILLA",
        };
        write!(f, "{}", name)
    }
}

/// Encodings each data type accepts
fn supported_encodings(data_type: DataType) -> &'static [Encoding] {
    match data_type {
        DataType::Boolean => &[Encoding::Plain],
        DataType::Int32 => &[Encoding::Plain, Encoding::Rle, Encoding::Ts2Diff],
        DataType::Int64 => &[Encoding::Plain, Encoding::Rle, Encoding::Ts2Diff],
        DataType::Float => &[
            Encoding::Plain,
            Encoding::Rle,
            Encoding::Ts2Diff,
            Encoding::Gorilla,
        ],
        DataType::Double => &[
            Encoding::Plain,
            Encoding::Rle,
            Encoding::Ts2Diff,
            Encoding::Gorilla,
        ],
        DataType::Enums => &[Encoding::Plain, Encoding::Bitmap],
        DataType::Text => &[Encoding::Plain],
    }
}

/// Validate a CREATE TIMESERIES (data type, encoding) pair by name.
///
/// Unknown names are rejected first; known-but-incompatible pairs are
/// rejected naming both sides.
pub fn check_series_args(data_type: &str, encoding: &str) -> PlanResult<(DataType, Encoding)> {
    let parsed_type: DataType = data_type.parse()?;
    let parsed_encoding: Encoding = encoding.parse()?;
    if !supported_encodings(parsed_type).contains(&parsed_encoding) {
        return Err(PlanError::semantic(format!(
            "encoding {} does not support data type {}",
            parsed_encoding, parsed_type
        )));
    }
    Ok((parsed_type, parsed_encoding))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_TYPES: [DataType; 7] = [
        DataType::Boolean,
        DataType::Int32,
        DataType::Int64,
        DataType::Float,
        DataType::Double,
        DataType::Enums,
        DataType::Text,
    ];

    const ALL_ENCODINGS: [Encoding; 5] = [
        Encoding::Plain,
        Encoding::Rle,
        Encoding::Ts2Diff,
        Encoding::Bitmap,
        Encoding::Gorilla,
    ];

    fn expected(data_type: DataType, encoding: Encoding) -> bool {
        use DataType::*;
        use Encoding::*;
        match (data_type, encoding) {
            (Boolean, Plain) => true,
            (Int32 | Int64, Plain | Rle | Ts2Diff) => true,
            (Float | Double, Plain | Rle | Ts2Diff | Gorilla) => true,
            (Enums, Plain | Bitmap) => true,
            (Text, Plain) => true,
            _ => false,
        }
    }

    #[test]
    fn test_full_compatibility_grid() {
        for data_type in ALL_TYPES {
            for encoding in ALL_ENCODINGS {
                let result =
                    check_series_args(&data_type.to_string(), &encoding.to_string());
                assert_eq!(
                    result.is_ok(),
                    expected(data_type, encoding),
                    "unexpected verdict for ({}, {})",
                    data_type,
                    encoding
                );
            }
        }
    }

    #[test]
    fn test_known_pairs() {
        assert!(check_series_args("BOOLEAN", "PLAIN").is_ok());
        assert!(check_series_args("FLOAT", "GORILLA").is_ok());
        assert!(matches!(
            check_series_args("BOOLEAN", "RLE"),
            Err(PlanError::Semantic(_))
        ));
        assert!(matches!(
            check_series_args("TEXT", "GORILLA"),
            Err(PlanError::Semantic(_))
        ));
    }

    #[test]
    fn test_unknown_names_rejected() {
        let err = check_series_args("STRING", "PLAIN").unwrap_err();
        assert!(err.to_string().contains("STRING"));
        let err = check_series_args("INT32", "SNAPPY").unwrap_err();
        assert!(err.to_string().contains("SNAPPY"));
    }

    #[test]
    fn test_names_are_case_sensitive() {
        assert!(check_series_args("int32", "PLAIN").is_err());
        assert!(check_series_args("INT32", "plain").is_err());
    }
}
