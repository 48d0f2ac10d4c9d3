mod common;
mod extraction_tests;
