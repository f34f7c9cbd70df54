use std::fmt;
use std::str::FromStr;

/// Which backend a [`TodoStorageFactory`](super::TodoStorageFactory) should provide.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum StorageType {
    /// Local SQLite database (the `indexedDB` storage of the browser build).
    #[default]
    Embedded,
    /// Remote todo service over HTTP.
    Api,
}

impl StorageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageType::Embedded => "indexedDB",
            StorageType::Api => "api",
        }
    }

    /// The other backend, used by callers that fall back after a failed initialization.
    pub fn alternate(self) -> Self {
        match self {
            StorageType::Embedded => StorageType::Api,
            StorageType::Api => StorageType::Embedded,
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown storage type: {0:?} (expected \"indexedDB\" or \"api\")")]
pub struct UnknownStorageType(pub String);

impl FromStr for StorageType {
    type Err = UnknownStorageType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "indexeddb" | "embedded" | "sqlite" | "local" => Ok(StorageType::Embedded),
            "api" | "remote" | "http" => Ok(StorageType::Api),
            _ => Err(UnknownStorageType(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_embedded() {
        assert_eq!(StorageType::default(), StorageType::Embedded);
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for t in [StorageType::Embedded, StorageType::Api] {
            assert_eq!(t.to_string().parse::<StorageType>().unwrap(), t);
        }
    }

    #[test]
    fn parse_accepts_aliases_case_insensitively() {
        assert_eq!("IndexedDB".parse::<StorageType>().unwrap(), StorageType::Embedded);
        assert_eq!(" sqlite ".parse::<StorageType>().unwrap(), StorageType::Embedded);
        assert_eq!("REMOTE".parse::<StorageType>().unwrap(), StorageType::Api);
        assert_eq!(
            "floppy".parse::<StorageType>().unwrap_err(),
            UnknownStorageType("floppy".into())
        );
    }

    #[test]
    fn alternate_swaps_backends() {
        assert_eq!(StorageType::Embedded.alternate(), StorageType::Api);
        assert_eq!(StorageType::Api.alternate(), StorageType::Embedded);
    }
}
