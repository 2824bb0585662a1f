//! WebDAV remote store for davdrop.
//!
//! Defines the `RemoteStore` trait the relay core talks to and a
//! `reqwest`-backed WebDAV implementation (PROPFIND, MKCOL, PUT).

pub mod client;
pub mod error;
pub mod store;

pub use {
    client::WebDavClient,
    error::{Error, Result},
    store::{RemoteEntry, RemoteStore, SharedRemoteStore},
};
