use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

snowflake_id!(
    /// Platform user identifier.
    UserId
);
snowflake_id!(
    /// Platform channel identifier (guild text channel or DM channel).
    ChannelId
);
snowflake_id!(
    /// Platform guild (server) identifier.
    GuildId
);
snowflake_id!(MessageId);

/// Who the bot is on the platform. Known only once the gateway reports ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub user_id: UserId,
    /// Platform username of the bot account.
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_as_raw_number() {
        assert_eq!(UserId(42).to_string(), "42");
        assert_eq!(ChannelId::from(7).get(), 7);
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&MessageId(123456789012345678)).unwrap();
        assert_eq!(json, "123456789012345678");
    }
}
