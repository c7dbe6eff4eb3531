//! HTTP surface of the `intake` server.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response bodies that are not library types
//!
//! # Routes
//!
//! - `GET /healthz`: liveness
//! - `POST /files`: store every file of a multipart form
//! - `POST /files/one`: store a single file
//! - `GET /files/{name}`: download a stored file as an attachment
//! - `POST /slugs`: turn text into a URL slug

pub mod handlers;
pub mod models;
