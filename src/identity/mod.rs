//! Identity query service.
//!
//! Lets services that do not own user accounts turn a session id into a user
//! id without touching the session store or the account schema. The account
//! service hosts [`router`]; peers hold one [`IdentityClient`] for the life of
//! the process.

mod client;
mod server;
pub mod types;

pub use client::{
    DEFAULT_RPC_CONNECT_TIMEOUT, DEFAULT_RPC_TIMEOUT, IdentityClient, IdentityClientConfig,
    IdentityError,
};
pub use server::{IdentityState, RpcError, router};
