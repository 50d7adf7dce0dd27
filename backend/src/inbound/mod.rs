//! Inbound adapters that translate external requests into domain service
//! calls while keeping framework details at the edge.
//!
//! REST handlers live under [`http`]; the live room channel lives under
//! [`ws`]. Both depend only on driving ports.

pub mod http;
pub mod ws;
