mod cli_tests;
mod fixture;
mod lifecycle_tests;
