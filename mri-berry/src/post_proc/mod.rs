//! 后处理流程集合.

mod dilate;

pub use dilate::{dilate, disk};
