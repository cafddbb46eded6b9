//! Actions and the request descriptors they carry

mod descriptor;
mod types;

pub use descriptor::{
    ChainLink, OutcomeCallback, RequestDescriptor, RequestHooks, RequestOptions, RequestSpec, ResolvePolicy,
    ResponseTransform, ResponseType,
};
pub use types::Action;
