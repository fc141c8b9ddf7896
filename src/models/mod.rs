//! Data models shared by the persistence layer and the transfer flow.
//!
//! `User` maps to the `users` table via `sqlx::FromRow`; `ObjectIdentity`
//! is the opaque (bucket, object name) pair handed to object storage.

pub mod object;
pub mod user;
