pub mod bus;
pub mod frames;
pub mod hdlc;
pub mod link;

pub use bus::FieldBus;
pub use frames::{DecodedFrame, DeviceAddress, FrameType, InputStateFrame, OutputStateFrame};
pub use hdlc::{HdlcError, crc16, decode, encode, unescape};
pub use link::{BusLink, Loopback, SerialLink};
