//! Integration tests for the trawler
//!
//! `engine_tests` drive the coordinator through fake ports; `fetch_tests` and
//! `crawl_tests` use wiremock to serve real HTTP.

mod common;
mod crawl_tests;
mod fetch_tests;
