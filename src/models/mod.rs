//! Domain model module declarations.

pub mod assignment;
pub mod work_item;
