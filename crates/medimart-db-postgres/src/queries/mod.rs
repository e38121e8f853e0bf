//! SQL for the `documents` table.

pub mod crud;
pub mod filter;
