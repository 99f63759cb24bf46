mod common;

mod schema;
