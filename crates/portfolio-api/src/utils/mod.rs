//! 공용 유틸리티.

pub mod client_ip;

pub use client_ip::{client_ip, ClientAddr, ProxyPolicy};
