pub type EventPriority = i16;
pub type SubscriptionId = u64;
pub type AuthorityId = u16;

/// Authority id an [`crate::EventBus`] starts with before the host is
/// assigned a real one by the (out of scope) connection handshake.
pub const AUTHORITY_ID_UNSET: AuthorityId = 0;
