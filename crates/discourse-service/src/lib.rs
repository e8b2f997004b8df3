//! # discourse-service
//!
//! Application layer: the presence client state machine, session lifecycle,
//! group directory, and the home-screen flow that ties them together for
//! the view layer.

pub mod services;

pub use services::{
    ConnectionState, DisconnectKind, GroupDirectory, GroupFetchState, HomeFlow, PresenceClient,
    ServiceContext, ServiceContextBuilder, ServiceError, ServiceResult, SessionController,
    SessionHandle,
};
