//! Process exit codes
//!
//! Follows sysexits.h where a code applies.

/// General error
pub const ERROR: i32 = 1;

/// Request does not match the application schema (layers, parameters, flavor)
pub const VALIDATION_ERROR: i32 = 2;

/// Manifest rendering failed (chart, archive, overlay)
pub const RENDER_ERROR: i32 = 3;

/// Catalog or install spec could not be loaded
pub const CATALOG_ERROR: i32 = 4;

/// File not found, permission denied
pub const IO_ERROR: i32 = 5;

/// Invalid arguments
pub const USAGE_ERROR: i32 = 64;

/// Interrupted by the user
pub const CANCELLED: i32 = 130;
