//! Configuration access port trait.
//!
//! Lookups are by `[section] key`. Values come back as text; parsing and
//! validation belong to `domain::config_validation`.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
}
