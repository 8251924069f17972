//! Host side of the bridge: the wire contract, the typed call surface and
//! the transports that carry it (in-process channel, stdio, child process).

pub mod api;
pub mod channel;
pub mod contract;
pub mod process;
pub mod push;
pub mod stdio;
