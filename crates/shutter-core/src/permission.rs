//! Per-resource access control.
//!
//! Each `(subject, resource)` pair owns at most one authorization row made of
//! four boolean flags. A missing row means the empty permission set.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
  Read,
  Update,
  Delete,
  UpdatePermissions,
}

impl Permission {
  pub const ALL: [Permission; 4] = [
    Permission::Read,
    Permission::Update,
    Permission::Delete,
    Permission::UpdatePermissions,
  ];
}

/// The permissions one subject holds on one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectPermissions {
  pub subject_id:  Uuid,
  pub permissions: BTreeSet<Permission>,
}

impl SubjectPermissions {
  pub fn new(
    subject_id: Uuid,
    permissions: impl IntoIterator<Item = Permission>,
  ) -> Self {
    Self { subject_id, permissions: permissions.into_iter().collect() }
  }

  /// Every permission; granted to the owner of a new resource.
  pub fn all(subject_id: Uuid) -> Self { Self::new(subject_id, Permission::ALL) }
}

/// The four authorization columns, in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PermissionFlags {
  pub read:               bool,
  pub update:             bool,
  pub delete:             bool,
  pub update_permissions: bool,
}

impl PermissionFlags {
  pub fn is_empty(&self) -> bool {
    !(self.read || self.update || self.delete || self.update_permissions)
  }

  pub fn to_set(self) -> BTreeSet<Permission> {
    let mut set = BTreeSet::new();
    if self.read {
      set.insert(Permission::Read);
    }
    if self.update {
      set.insert(Permission::Update);
    }
    if self.delete {
      set.insert(Permission::Delete);
    }
    if self.update_permissions {
      set.insert(Permission::UpdatePermissions);
    }
    set
  }
}

impl<'a> FromIterator<&'a Permission> for PermissionFlags {
  fn from_iter<I: IntoIterator<Item = &'a Permission>>(iter: I) -> Self {
    let mut flags = Self::default();
    for permission in iter {
      match permission {
        Permission::Read => flags.read = true,
        Permission::Update => flags.update = true,
        Permission::Delete => flags.delete = true,
        Permission::UpdatePermissions => flags.update_permissions = true,
      }
    }
    flags
  }
}

/// An ACL for one resource, keyed by subject.
pub type Acl = BTreeMap<Uuid, BTreeSet<Permission>>;

/// Apply a permissions update to `acl`: additions first, then removals.
/// Subjects never hold an empty set: empty additions are ignored and
/// subjects left with no permission are dropped.
pub fn apply_update(
  acl: &mut Acl,
  to_add: &[SubjectPermissions],
  to_remove: &[SubjectPermissions],
) {
  for sp in to_add.iter().filter(|sp| !sp.permissions.is_empty()) {
    acl
      .entry(sp.subject_id)
      .or_default()
      .extend(sp.permissions.iter().copied());
  }
  for sp in to_remove {
    if let Some(current) = acl.get_mut(&sp.subject_id) {
      current.retain(|p| !sp.permissions.contains(p));
      if current.is_empty() {
        acl.remove(&sp.subject_id);
      }
    }
  }
}

/// Flatten an ACL into the list form used on the wire.
pub fn to_subject_permissions(acl: &Acl) -> Vec<SubjectPermissions> {
  acl
    .iter()
    .map(|(subject_id, permissions)| SubjectPermissions {
      subject_id:  *subject_id,
      permissions: permissions.clone(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flags_roundtrip_through_set() {
    let set: BTreeSet<_> = [Permission::Read, Permission::UpdatePermissions]
      .into_iter()
      .collect();
    let flags: PermissionFlags = set.iter().collect();
    assert!(flags.read && flags.update_permissions);
    assert!(!flags.update && !flags.delete);
    assert_eq!(flags.to_set(), set);
  }

  #[test]
  fn empty_flags_are_empty() {
    assert!(PermissionFlags::default().is_empty());
    assert!(PermissionFlags::default().to_set().is_empty());
  }

  #[test]
  fn update_adds_before_removing() {
    let alice = Uuid::new_v4();
    let mut acl = Acl::new();
    apply_update(
      &mut acl,
      &[SubjectPermissions::new(alice, [Permission::Read, Permission::Update])],
      &[SubjectPermissions::new(alice, [Permission::Update])],
    );
    assert_eq!(acl[&alice], BTreeSet::from([Permission::Read]));
  }

  #[test]
  fn removing_everything_drops_the_subject() {
    let bob = Uuid::new_v4();
    let mut acl = Acl::new();
    apply_update(&mut acl, &[SubjectPermissions::new(bob, [Permission::Read])], &[]);
    apply_update(&mut acl, &[], &[SubjectPermissions::all(bob)]);
    assert!(acl.is_empty());
  }

  #[test]
  fn empty_grant_adds_no_subject() {
    let carol = Uuid::new_v4();
    let mut acl = Acl::new();
    apply_update(&mut acl, &[SubjectPermissions::new(carol, [])], &[]);
    assert!(acl.is_empty());
  }

  #[test]
  fn removing_from_unknown_subject_is_a_no_op() {
    let mut acl = Acl::new();
    apply_update(&mut acl, &[], &[SubjectPermissions::all(Uuid::new_v4())]);
    assert!(acl.is_empty());
  }
}
