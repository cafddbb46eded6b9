//! querystring - qs-style query string encoding
//!
//! Encodes an arbitrary JSON value into an `application/x-www-form-urlencoded`
//! style query string the way the JavaScript `qs` library does: nested objects
//! become bracketed keys, arrays follow a selectable [`ArrayFormat`], and every
//! key and value is percent-encoded per RFC 3986.
//!
//! # Example
//!
//! ```
//! use querystring::{ArrayFormat, EncodeOptions, stringify};
//! use serde_json::json;
//!
//! let data = json!({"bar_ids": [21, 31], "page": 2});
//!
//! let query = stringify(&data, &EncodeOptions::default());
//! assert_eq!(query, "bar_ids%5B0%5D=21&bar_ids%5B1%5D=31&page=2");
//!
//! let query = stringify(&data, &EncodeOptions::new(ArrayFormat::Repeat));
//! assert_eq!(query, "bar_ids=21&bar_ids=31&page=2");
//! ```

mod encode;

pub use encode::{ArrayFormat, EncodeOptions, encode_component, stringify};

/// Separator placed between encoded pairs
pub const DELIMITER: char = '&';
