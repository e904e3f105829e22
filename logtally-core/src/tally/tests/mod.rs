mod aggregate_tests;
mod support;
