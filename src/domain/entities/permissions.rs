use std::ops::BitOr;

/// Guild permission bits, using the gateway's bit positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Permissions(u64);

impl Permissions {
    pub const ADD_REACTIONS: Permissions = Permissions(1 << 6);
    pub const ADMINISTRATOR: Permissions = Permissions(1 << 3);
    pub const MANAGE_GUILD: Permissions = Permissions(1 << 5);
    pub const READ_MESSAGES: Permissions = Permissions(1 << 10);
    pub const SEND_MESSAGES: Permissions = Permissions(1 << 11);
    pub const EMBED_LINKS: Permissions = Permissions(1 << 14);
    pub const ATTACH_FILES: Permissions = Permissions(1 << 15);
    pub const EXTERNAL_EMOJIS: Permissions = Permissions(1 << 18);

    pub const fn none() -> Self {
        Permissions(0)
    }

    pub const fn from_bits(bits: u64) -> Self {
        Permissions(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Whether every bit of `other` is granted. Administrators hold everything.
    pub fn contains(self, other: Permissions) -> bool {
        if self.0 & Self::ADMINISTRATOR.0 != 0 {
            return true;
        }
        self.0 & other.0 == other.0
    }

    /// The set requested in invite links
    pub fn invite_set() -> Self {
        Self::READ_MESSAGES
            | Self::EXTERNAL_EMOJIS
            | Self::SEND_MESSAGES
            | Self::EMBED_LINKS
            | Self::ATTACH_FILES
            | Self::ADD_REACTIONS
    }
}

impl BitOr for Permissions {
    type Output = Permissions;

    fn bitor(self, rhs: Self) -> Self::Output {
        Permissions(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invite_set_bits() {
        assert_eq!(Permissions::invite_set().bits(), 314_432);
    }

    #[test]
    fn test_administrator_implies_all() {
        let admin = Permissions::ADMINISTRATOR;
        assert!(admin.contains(Permissions::MANAGE_GUILD));
        assert!(!Permissions::SEND_MESSAGES.contains(Permissions::MANAGE_GUILD));
    }
}
