//! Identifier types.
//!
//! The horde hands out UUIDs for generations, workers, images and teams.
//! Each gets its own newtype so they cannot be mixed up; all of them
//! serialize as plain strings and compare equal to their string form.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_identifier {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Uuid);

        impl $name {
            /// Parses an identifier, rejecting anything that is not a UUID.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Uuid::parse_str(s).map(Self)
            }

            /// Returns the identifier as a [`Uuid`].
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.hyphenated())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                Uuid::parse_str(other).is_ok_and(|other| other == self.0)
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self == *other
            }
        }

        impl PartialEq<Uuid> for $name {
            fn eq(&self, other: &Uuid) -> bool {
                self.0 == *other
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(&self.0.hyphenated())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Self::parse(&raw)
                    .map_err(|e| serde::de::Error::custom(format!("Invalid UUID {}: {}", raw, e)))
            }
        }
    };
}

uuid_identifier!(
    /// The id of a generation job.
    GenerationId
);
uuid_identifier!(
    /// The id of a worker.
    WorkerId
);
uuid_identifier!(
    /// The id of a generated image.
    ImageId
);
uuid_identifier!(
    /// The id of a team.
    TeamId
);

impl GenerationId {
    /// A fresh random id. Useful for tests and dry runs.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "6ad2c2b4-d5b5-4c2e-a2e6-4c1b0c7e3b1f";

    #[test]
    fn test_compares_with_strings() {
        let id = GenerationId::parse(ID).unwrap();
        assert_eq!(id, ID);
        assert_eq!(id, ID.to_uppercase().as_str());
        assert_eq!(id.to_string(), ID);
    }

    #[test]
    fn test_serde_as_string() {
        let id: WorkerId = serde_json::from_str(&format!("\"{}\"", ID)).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), format!("\"{}\"", ID));
    }

    #[test]
    fn test_rejects_non_uuid() {
        let err = serde_json::from_str::<ImageId>("\"not-a-uuid\"").unwrap_err();
        assert!(err.to_string().contains("Invalid UUID not-a-uuid"));
        assert!("nope".parse::<TeamId>().is_err());
    }

    #[test]
    fn test_new_v4_is_unique() {
        assert_ne!(GenerationId::new_v4(), GenerationId::new_v4());
    }
}
