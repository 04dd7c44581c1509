//! Unit tests - public parsing, binding and decoding APIs without a pool

mod binding_tests;
mod element_decoding_tests;
mod source_parser_tests;
