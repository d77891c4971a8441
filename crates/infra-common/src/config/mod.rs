/*!
Configuration Loading

Deserializes TOML configuration into any `serde` type. Component crates
own their configuration structs; this module only deals with getting text
off disk and into them.
*/

pub mod loader;

pub use loader::{load_toml_file, load_toml_str};
