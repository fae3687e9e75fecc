use ulid::Ulid;

/// `<prefix>_<ulid>`, e.g. `conn_01J9Z3...`.
///
/// ```
/// let id = board_common::id::prefixed_ulid("conn");
/// assert!(id.starts_with("conn_"));
/// ```
pub fn prefixed_ulid(prefix: &str) -> String {
    format!("{prefix}_{}", Ulid::new())
}

/// Split a prefixed id into its prefix and ULID. `None` if the suffix is not
/// a valid ULID.
pub fn split_prefixed(id: &str) -> Option<(&str, Ulid)> {
    let (prefix, raw) = id.rsplit_once('_')?;
    Some((prefix, Ulid::from_string(raw).ok()?))
}

/// Identifier types minted as `<PREFIX>_<ulid>`.
pub trait PrefixedId {
    const PREFIX: &'static str;

    fn generate() -> String {
        prefixed_ulid(Self::PREFIX)
    }
}

pub mod prefix {
    /// Gateway transport sessions.
    pub const CONNECTION: &str = "conn";
}
