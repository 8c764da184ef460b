//! EduVillage: a role-based learning platform.
//!
//! Students enroll in courses and unlock lessons one at a time; finishing
//! every lesson issues a certificate that anyone can verify by its code or
//! QR image. Teachers author courses and administrators oversee the platform.

pub mod accounts;
pub mod certificates;
pub mod core;
pub mod dashboards;
pub mod learn;
pub mod main_module;
pub mod security;
pub mod web;

pub use crate::core::shared;
pub use crate::core::urls;
