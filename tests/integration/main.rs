//! Integration tests for the charity crawler
//!
//! These tests use wiremock to serve a small three-tier site and run the
//! full crawl against it.

mod crawl_tests;
