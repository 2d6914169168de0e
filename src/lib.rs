#![deny(
    clippy::mutable_key_type,
    clippy::map_entry,
    clippy::boxed_local,
    clippy::let_unit_value,
    clippy::redundant_allocation,
    clippy::bool_comparison,
    clippy::bind_instead_of_map,
    clippy::vec_box,
    clippy::while_let_loop,
    clippy::useless_asref,
    clippy::repeat_once,
    clippy::deref_addrof,
    clippy::suspicious_map,
    clippy::single_char_pattern,
    clippy::let_and_return,
    clippy::iter_nth,
    clippy::iter_cloned_collect,
    clippy::cmp_owned,
    clippy::op_ref
)]

pub mod boundary;
pub mod chunking;
pub mod config;
pub mod dead_letter;
pub mod extract;
pub mod models;
pub mod pipeline;
pub mod storage;
pub mod transform;

use std::time::Duration;

pub fn make_reqwest_client() -> reqwest::Client {
    reqwest::ClientBuilder::new()
        .use_rustls_tls()
        .user_agent("Pedalpoint Loader")
        .connect_timeout(Duration::from_secs(20))
        .deflate(true)
        .gzip(true)
        .brotli(true)
        .build()
        .unwrap()
}

/// Given a URL, return the final path element.
///
/// e.g. `https://foo.com/bar.json` -> `bar.json`
pub fn resource_name(resource_url: &str) -> &str {
    resource_url.rsplit('/').next().unwrap_or(resource_url)
}
