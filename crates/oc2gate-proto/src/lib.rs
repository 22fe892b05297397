pub mod codec;
pub mod conversion;
pub mod protocol;


pub use codec::*;
pub use protocol::*;
