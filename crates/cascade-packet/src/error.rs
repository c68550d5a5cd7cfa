use thiserror::Error;

use crate::types::PacketType;

#[derive(Debug, Error)]
pub enum PacketError {
  #[error("packet type '{packet_type}' has no filename role '{role}'")]
  UnknownRole {
    packet_type: PacketType,
    role: String,
  },
}
