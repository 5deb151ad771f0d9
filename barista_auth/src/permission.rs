use std::{collections::btree_set, convert::Infallible, iter::FromIterator, str::FromStr};

use aliri_braid::braid;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An invalid permission
#[derive(Debug, Error)]
pub enum InvalidPermission {
    /// The permission was the empty string
    #[error("permission cannot be empty")]
    EmptyString,
    /// The permission contained an invalid byte
    #[error("invalid permission byte at position {position}: 0x{value:02x}")]
    InvalidByte {
        /// The index in the permission where the invalid byte was found
        position: usize,
        /// The invalid byte value
        value: u8,
    },
}

impl From<Infallible> for InvalidPermission {
    fn from(x: Infallible) -> Self {
        match x {}
    }
}

/// A permission granted to the bearer of a token, such as `delete:drinks`
///
/// A permission must be composed of printable ASCII characters excluding
/// ` ` (space), `"` (double quote), and `\` (backslash).
#[braid(serde, validator, ref_doc = "A borrowed reference to a [`Permission`]")]
pub struct Permission;

impl aliri_braid::Validator for Permission {
    type Error = InvalidPermission;

    fn validate(s: &str) -> Result<(), Self::Error> {
        if s.is_empty() {
            Err(InvalidPermission::EmptyString)
        } else if let Some((position, &value)) = s
            .as_bytes()
            .iter()
            .enumerate()
            .find(|(_, &b)| b <= 0x20 || b == 0x22 || b == 0x5C || 0x7F <= b)
        {
            Err(InvalidPermission::InvalidByte { position, value })
        } else {
            Ok(())
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum PermissionsDto {
    String(String),
    Array(Vec<String>),
}

impl From<PermissionsDto> for Permissions {
    fn from(dto: PermissionsDto) -> Self {
        match dto {
            PermissionsDto::String(s) => Self::from_granted(s.split_whitespace()),
            PermissionsDto::Array(arr) => Self::from_granted(arr.iter().map(String::as_str)),
        }
    }
}

impl From<Permissions> for PermissionsDto {
    fn from(p: Permissions) -> Self {
        Self::Array(p.0.into_iter().map(String::from).collect())
    }
}

/// The set of permissions granted by a token
///
/// Deserializes from either a JSON array of permissions or a single
/// space-delimited string. Granted entries that are not usable permissions
/// are skipped with a warning; they can never match a required permission.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "PermissionsDto", into = "PermissionsDto")]
pub struct Permissions(btree_set::BTreeSet<Permission>);

impl Permissions {
    fn from_granted<'a>(granted: impl Iterator<Item = &'a str>) -> Self {
        granted
            .filter_map(|raw| match Permission::try_from(raw) {
                Ok(permission) => Some(permission),
                Err(err) => {
                    let error: &dyn std::error::Error = &err;
                    tracing::warn!(
                        error,
                        permission = raw,
                        "ignoring unusable granted permission"
                    );
                    None
                }
            })
            .collect()
    }

    /// Produces an empty permission set
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self(btree_set::BTreeSet::new())
    }

    /// Constructs a permission set holding a single permission
    #[inline]
    #[must_use]
    pub fn single(permission: Permission) -> Self {
        let mut p = Self::empty();
        p.insert(permission);
        p
    }

    /// Adds an additional permission
    #[inline]
    #[must_use]
    pub fn and(self, permission: Permission) -> Self {
        let mut p = self;
        p.insert(permission);
        p
    }

    /// Adds a permission to the set
    #[inline]
    pub fn insert(&mut self, permission: Permission) {
        self.0.insert(permission);
    }

    /// Indicates whether the set holds no permissions
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks whether `permission` is in the set
    #[inline]
    #[must_use]
    pub fn contains(&self, permission: &PermissionRef) -> bool {
        self.0.contains(permission)
    }

    /// Checks to see whether this set contains all of the permissions in
    /// `subset`
    #[inline]
    #[must_use]
    pub fn contains_all(&self, subset: &Permissions) -> bool {
        self.0.is_superset(&subset.0)
    }

    /// Produces an iterator of the permissions in this set, in order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &PermissionRef> {
        self.0.iter().map(AsRef::as_ref)
    }
}

impl IntoIterator for Permissions {
    type Item = Permission;
    type IntoIter = btree_set::IntoIter<Permission>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<P> Extend<P> for Permissions
where
    P: Into<Permission>,
{
    #[inline]
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = P>,
    {
        self.0.extend(iter.into_iter().map(Into::into))
    }
}

impl<P> FromIterator<P> for Permissions
where
    P: Into<Permission>,
{
    #[inline]
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = P>,
    {
        let mut set = Self::empty();
        set.extend(iter);
        set
    }
}

impl TryFrom<&'_ str> for Permissions {
    type Error = InvalidPermission;

    #[inline]
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.split_whitespace().map(Permission::try_from).collect()
    }
}

impl TryFrom<String> for Permissions {
    type Error = InvalidPermission;

    #[inline]
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::try_from(s.as_str())
    }
}

impl FromStr for Permissions {
    type Err = InvalidPermission;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;
    use tracing_test::traced_test;

    use super::*;

    #[test]
    fn owned_handles_valid() {
        let x = Permission::try_from("get:drinks-detail").unwrap();
        assert_eq!(x.as_str(), "get:drinks-detail");
    }

    #[test]
    fn owned_rejects_empty() {
        let x = Permission::try_from("");
        assert!(matches!(x, Err(InvalidPermission::EmptyString)));
    }

    #[test]
    fn owned_rejects_space() {
        let x = Permission::try_from("delete: drinks");
        assert!(matches!(
            x,
            Err(InvalidPermission::InvalidByte {
                position: 7,
                value: 0x20
            })
        ));
    }

    #[test]
    fn owned_rejects_invalid_quote() {
        let x = Permission::try_from("\"post:drinks\"");
        assert!(matches!(x, Err(InvalidPermission::InvalidByte { .. })));
    }

    #[test]
    fn owned_rejects_invalid_backslash() {
        let x = Permission::try_from("patch:\\drinks");
        assert!(matches!(x, Err(InvalidPermission::InvalidByte { .. })));
    }

    #[test]
    fn owned_rejects_invalid_non_ascii() {
        let x = Permission::try_from("get:drinks-détail");
        assert!(matches!(x, Err(InvalidPermission::InvalidByte { .. })));
    }

    #[test]
    fn ref_rejects_invalid_control() {
        let x = PermissionRef::from_str("get:\tdrinks");
        assert!(matches!(x, Err(InvalidPermission::InvalidByte { .. })));
    }

    #[test]
    fn deserializes_from_array() -> Result<()> {
        let p: Permissions = serde_json::from_str(r#"["get:drinks-detail", "post:drinks"]"#)?;

        assert!(p.contains(PermissionRef::from_static("get:drinks-detail")));
        assert!(p.contains(PermissionRef::from_static("post:drinks")));
        assert!(!p.contains(PermissionRef::from_static("delete:drinks")));
        Ok(())
    }

    #[test]
    fn deserializes_from_space_delimited_string() -> Result<()> {
        let p: Permissions = serde_json::from_str(r#""get:drinks-detail  post:drinks""#)?;

        assert_eq!(
            p.iter().map(PermissionRef::as_str).collect::<Vec<_>>(),
            ["get:drinks-detail", "post:drinks"]
        );
        Ok(())
    }

    #[test]
    #[traced_test]
    fn skips_unusable_granted_entries() -> Result<()> {
        let p: Permissions = serde_json::from_str(
            r#"["get:drinks-detail", "read drinks", "", "café:drinks", "say:\"hi\""]"#,
        )?;

        assert_eq!(
            p.iter().map(PermissionRef::as_str).collect::<Vec<_>>(),
            ["get:drinks-detail"]
        );
        assert!(logs_contain("ignoring unusable granted permission"));
        Ok(())
    }

    #[test]
    fn parsing_stays_strict() {
        assert!("get:drinks café".parse::<Permissions>().is_err());
    }

    #[test]
    fn serializes_as_sorted_array() -> Result<()> {
        let p: Permissions = "post:drinks delete:drinks".parse()?;
        assert_eq!(
            serde_json::to_string(&p)?,
            r#"["delete:drinks","post:drinks"]"#
        );
        Ok(())
    }

    #[test]
    fn contains_all_is_subset_check() -> Result<()> {
        let held: Permissions = "get:drinks-detail post:drinks patch:drinks".parse()?;

        assert!(held.contains_all(&"post:drinks patch:drinks".parse()?));
        assert!(held.contains_all(&Permissions::empty()));
        assert!(!held.contains_all(&"post:drinks delete:drinks".parse()?));
        Ok(())
    }
}
