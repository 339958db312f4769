//! Integration tests for Catalog-Harvester

mod crawl_tests;
