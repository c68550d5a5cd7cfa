use std::collections::BTreeMap;
use std::path::Path;

use uuid::Uuid;

use crate::error::PacketError;
use crate::framespec;
use crate::range::SeqRange;
use crate::types::PacketType;

/// The (node, output) that produced a packet.
///
/// A plain identifier pair, never an owning reference — packets are transient
/// per-evaluation values and must not create cycles with the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketSource {
  pub node_id: Uuid,
  pub output: String,
}

impl PacketSource {
  pub fn new(node_id: Uuid, output: impl Into<String>) -> Self {
    Self {
      node_id,
      output: output.into(),
    }
  }
}

/// A typed descriptor of the artifact(s) one node output stands for.
///
/// Carries one path per filename role of its type, plus one sequence range
/// shared by all roles. Paths are stored post-substitution; callers resolve
/// variables when materializing packets from node outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPacket {
  packet_type: PacketType,
  source: PacketSource,
  filenames: BTreeMap<String, String>,
  seq_range: Option<SeqRange>,
}

impl DataPacket {
  /// Create an empty packet of the given type; every role starts blank.
  pub fn new(packet_type: PacketType, source: PacketSource) -> Self {
    let filenames = packet_type
      .roles()
      .iter()
      .map(|role| (role.to_string(), String::new()))
      .collect();
    Self {
      packet_type,
      source,
      filenames,
      seq_range: None,
    }
  }

  pub fn packet_type(&self) -> PacketType {
    self.packet_type
  }

  pub fn source(&self) -> &PacketSource {
    &self.source
  }

  pub fn filename(&self, role: &str) -> Option<&str> {
    self.filenames.get(role).map(|s| s.as_str())
  }

  pub fn filenames(&self) -> &BTreeMap<String, String> {
    &self.filenames
  }

  pub fn set_filename(&mut self, role: &str, path: impl Into<String>) -> Result<(), PacketError> {
    match self.filenames.get_mut(role) {
      Some(slot) => {
        *slot = path.into();
        Ok(())
      }
      None => Err(PacketError::UnknownRole {
        packet_type: self.packet_type,
        role: role.to_string(),
      }),
    }
  }

  pub fn seq_range(&self) -> Option<&SeqRange> {
    self.seq_range.as_ref()
  }

  pub fn set_seq_range(&mut self, range: Option<SeqRange>) {
    self.seq_range = range;
  }

  /// Whether the data this packet describes is already on disk.
  ///
  /// Every non-empty role path must exist; a path with frame symbols is
  /// expanded over the sequence range and every frame must exist. A packet
  /// with no paths filled in reports false.
  pub fn data_present(&self) -> bool {
    let mut any_path = false;
    for path in self.filenames.values() {
      if path.is_empty() {
        continue;
      }
      any_path = true;
      if framespec::has_frame_symbols(path) {
        let Some((start, end)) = self.seq_range.as_ref().and_then(|r| r.numeric_raw()) else {
          return false;
        };
        for frame in start..=end {
          if !Path::new(&framespec::expand(path, frame)).exists() {
            return false;
          }
        }
      } else if !Path::new(path).exists() {
        return false;
      }
    }
    any_path
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn source() -> PacketSource {
    PacketSource::new(Uuid::new_v4(), "Out")
  }

  #[test]
  fn test_roles_initialized_from_type() {
    let packet = DataPacket::new(PacketType::Lightprobe, source());
    assert_eq!(packet.filename("filename"), Some(""));
    assert_eq!(packet.filename("transform"), Some(""));
    assert_eq!(packet.filename("boundingBox"), None);
  }

  #[test]
  fn test_set_unknown_role_rejected() {
    let mut packet = DataPacket::new(PacketType::Image, source());
    assert!(matches!(
      packet.set_filename("transform", "/tmp/t.xform"),
      Err(PacketError::UnknownRole { .. })
    ));
  }

  #[test]
  fn test_empty_packet_not_present() {
    let packet = DataPacket::new(PacketType::Image, source());
    assert!(!packet.data_present());
  }

  #[test]
  fn test_data_present_checks_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan.txt");
    std::fs::write(&path, "x").unwrap();

    let mut packet = DataPacket::new(PacketType::TextFile, source());
    packet
      .set_filename("filename", path.to_string_lossy())
      .unwrap();
    assert!(packet.data_present());

    packet
      .set_filename("filename", dir.path().join("gone.txt").to_string_lossy())
      .unwrap();
    assert!(!packet.data_present());
  }

  #[test]
  fn test_data_present_expands_frame_specs() {
    let dir = tempfile::tempdir().unwrap();
    for frame in 1..=3 {
      std::fs::write(dir.path().join(format!("plate.{:04}.exr", frame)), "x").unwrap();
    }

    let mut packet = DataPacket::new(PacketType::Image, source());
    packet
      .set_filename(
        "filename",
        dir.path().join("plate.####.exr").to_string_lossy(),
      )
      .unwrap();
    packet.set_seq_range(Some(SeqRange::new("1", "3")));
    assert!(packet.data_present());

    packet.set_seq_range(Some(SeqRange::new("1", "4")));
    assert!(!packet.data_present());
  }
}
