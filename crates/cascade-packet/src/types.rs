use std::fmt;

use serde::{Deserialize, Serialize};

/// The concrete type of a data packet.
///
/// Each type declares a set of filename roles and an optional parent in the
/// subtype lattice. An input declared for a base type accepts packets of that
/// type or any descendant; a descendant adds roles on top of its parent's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketType {
  TextFile,
  Image,
  Lightprobe,
  Pointcloud,
  Lightfield,
  BoundingBox,
  Colorspace,
}

impl PacketType {
  pub const ALL: [PacketType; 7] = [
    PacketType::TextFile,
    PacketType::Image,
    PacketType::Lightprobe,
    PacketType::Pointcloud,
    PacketType::Lightfield,
    PacketType::BoundingBox,
    PacketType::Colorspace,
  ];

  /// The filename roles this packet type carries.
  pub fn roles(&self) -> &'static [&'static str] {
    match self {
      PacketType::TextFile => &["filename"],
      PacketType::Image => &["filename"],
      PacketType::Lightprobe => &["filename", "transform"],
      PacketType::Pointcloud => &["filename", "transform"],
      PacketType::Lightfield => &["filename", "boundingBox", "transform"],
      PacketType::BoundingBox => &["filename", "transform"],
      PacketType::Colorspace => &["filename"],
    }
  }

  /// The declared supertype, if any.
  pub fn parent(&self) -> Option<PacketType> {
    match self {
      PacketType::Lightprobe => Some(PacketType::Image),
      _ => None,
    }
  }

  /// Reflexive, transitive subtype check.
  pub fn is_subtype_of(&self, base: PacketType) -> bool {
    let mut current = Some(*self);
    while let Some(ty) = current {
      if ty == base {
        return true;
      }
      current = ty.parent();
    }
    false
  }

  /// Every strict descendant of this type.
  pub fn descendants(&self) -> Vec<PacketType> {
    PacketType::ALL
      .iter()
      .copied()
      .filter(|ty| ty != self && ty.is_subtype_of(*self))
      .collect()
  }

  pub fn has_descendants(&self) -> bool {
    !self.descendants().is_empty()
  }

  /// This type plus every descendant — the acceptance set of an input
  /// declared for this base type.
  pub fn accepted_set(&self) -> Vec<PacketType> {
    let mut set = vec![*self];
    set.extend(self.descendants());
    set
  }

  /// Stable string tag, used by snapshots and display.
  pub fn name(&self) -> &'static str {
    match self {
      PacketType::TextFile => "TextFile",
      PacketType::Image => "Image",
      PacketType::Lightprobe => "Lightprobe",
      PacketType::Pointcloud => "Pointcloud",
      PacketType::Lightfield => "Lightfield",
      PacketType::BoundingBox => "BoundingBox",
      PacketType::Colorspace => "Colorspace",
    }
  }

  pub fn parse(tag: &str) -> Option<PacketType> {
    PacketType::ALL.iter().copied().find(|ty| ty.name() == tag)
  }
}

impl fmt::Display for PacketType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_lightprobe_is_an_image() {
    assert!(PacketType::Lightprobe.is_subtype_of(PacketType::Image));
    assert!(PacketType::Image.is_subtype_of(PacketType::Image));
    assert!(!PacketType::Pointcloud.is_subtype_of(PacketType::Image));
    assert!(!PacketType::Image.is_subtype_of(PacketType::Lightprobe));
  }

  #[test]
  fn test_image_descendants() {
    assert_eq!(PacketType::Image.descendants(), vec![PacketType::Lightprobe]);
    assert!(PacketType::Image.has_descendants());
    assert!(!PacketType::Pointcloud.has_descendants());
  }

  #[test]
  fn test_lightprobe_extends_image_roles() {
    assert_eq!(PacketType::Image.roles(), &["filename"]);
    assert_eq!(PacketType::Lightprobe.roles(), &["filename", "transform"]);
  }

  #[test]
  fn test_tag_round_trip() {
    for ty in PacketType::ALL {
      assert_eq!(PacketType::parse(ty.name()), Some(ty));
    }
    assert_eq!(PacketType::parse("Volume"), None);
  }
}
