pub mod time;

pub use self::time::*;

pub fn is_blank(name: &str) -> bool {
    name.trim().is_empty()
}
