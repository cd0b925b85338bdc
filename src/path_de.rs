use serde::de::DeserializeOwned;

/// A deserialization failure together with the JSON path it happened at.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("at JSON path {path} → {message}")]
pub struct PathError {
    pub path: String,
    pub message: String,
}

/// Deserialize with JSON-path context in error messages.
pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, PathError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    let value = match serde_path_to_error::deserialize::<_, T>(&mut *de) {
        Ok(v) => v,
        Err(err) => {
            let path = err.path().to_string();
            return Err(PathError { path, message: err.into_inner().to_string() });
        }
    };
    // trailing garbage after the document
    de.end().map_err(|err| PathError { path: ".".to_string(), message: err.to_string() })?;
    Ok(value)
}

/// Same as [`from_slice_with_path`], starting from an already parsed value.
pub fn from_value_with_path<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, PathError> {
    match serde_path_to_error::deserialize::<_, T>(value) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(PathError { path, message: err.into_inner().to_string() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Circle {
        center: [i64; 2],
        radius: i64,
    }

    #[test]
    fn error_names_the_offending_path() {
        let err = from_slice_with_path::<Circle>(br#"{"center": [1, "x"], "radius": 2}"#).unwrap_err();
        assert_eq!(err.path, "center[1]");
    }

    #[test]
    fn trailing_characters_are_rejected() {
        let err = from_slice_with_path::<Circle>(br#"{"center": [1, 2], "radius": 2} ]"#).unwrap_err();
        assert!(err.message.contains("trailing"), "{err}");
    }

    #[test]
    fn values_carry_paths_too() {
        let value = serde_json::json!({"center": [1, 2], "radius": "big"});
        let err = from_value_with_path::<Circle>(value).unwrap_err();
        assert_eq!(err.path, "radius");
    }
}
