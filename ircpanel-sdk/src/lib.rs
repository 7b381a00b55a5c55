//! Client SDK for plain IRC servers.
//!
//! Consumers call [`client::establish_connection`], hand the result to
//! [`client::connect_with_stream`], then drive the session through the
//! returned [`client::ClientHandle`] while draining [`event::Event`]s.

pub mod client;
pub mod event;
pub mod irc;
