//! Request building

mod builder;

pub use builder::{BuildError, CONTENT_TYPE, DEFAULT_CONTENT_TYPE, QueryEncoder, Request, RequestBuilder};
