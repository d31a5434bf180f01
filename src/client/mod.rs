//! HTTPリクエストの送信

mod request;

pub use request::{RawResponse, RequestBody, RequestClient};
pub use reqwest::Method;
