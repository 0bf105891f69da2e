//! Unit tests for per-frame annotation storage.
//!
//! These tests verify the on-disk layout, the wire shape of annotation files
//! and the handling of missing or damaged files.
