//! Вспомогательные модули

pub mod probe;
pub mod temp;
