pub type SerdePathError = serde_path_to_error::Error<serde_json::Error>;

/// Deserialise with the JSON path of the failing field kept in the error.
pub trait SerdeResponseParse {
    fn serde_parse_custom<T>(self) -> Result<T, SerdePathError>
    where
        T: serde::de::DeserializeOwned;
}

impl SerdeResponseParse for &str {
    fn serde_parse_custom<T>(self) -> Result<T, SerdePathError>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_path_to_error::deserialize(&mut serde_json::Deserializer::from_str(self))
    }
}
