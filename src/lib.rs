//! Fetch published webrevs and integrate their patches into a local git
//! repository.
//!
//! The pipeline is: [`webrev::sanitize`] the location, download the index
//! page and pull out its header table ([`webrev::header`]), interpret it as
//! [`webrev::WebrevMetadata`] ([`webrev::metadata`]), download the patch, pick
//! a base commit ([`resolve`]) and hand the result to the repository
//! ([`integrate`]).

pub mod config;
pub mod integrate;
pub mod repo;
pub mod report;
pub mod resolve;
pub mod webrev;
