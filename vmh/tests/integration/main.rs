#[path = "../common/mod.rs"]
mod common;

mod command_tests;
mod import_tests;
mod routine_tests;
