//! Cascade Packet
//!
//! Typed descriptors of the artifacts a node output represents. A
//! [`DataPacket`] carries one file path per filename role of its
//! [`PacketType`], an optional sequence range, and a non-owning back
//! reference to the (node, output) that produced it. Packet types form a
//! small subtype lattice used for input acceptance checks.

mod error;
pub mod framespec;
mod packet;
mod range;
mod types;

pub use error::PacketError;
pub use packet::{DataPacket, PacketSource};
pub use range::SeqRange;
pub use types::PacketType;
