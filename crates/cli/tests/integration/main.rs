mod common;

mod demo_tests;
mod file_tests;
mod recipe_tests;
