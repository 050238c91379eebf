// src/io/mod.rs
//
// Device I/O layers.

pub mod serial;
