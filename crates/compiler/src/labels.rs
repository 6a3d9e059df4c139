//! Label minting
//!
//! Every label combines a node's unique tag integer with a fixed
//! discriminator, so label uniqueness across the whole program reduces
//! to tag uniqueness. This module is the single place that knows the
//! naming scheme; `codegen.rs` and `asserts.rs` only ever call through
//! it.

use fdl_core::Label;

pub fn branch_true(tag_id: u32) -> Label {
    Label(format!("branch_true_{tag_id}"))
}

pub fn branch_done(tag_id: u32) -> Label {
    Label(format!("branch_done_{tag_id}"))
}

pub fn lam_start(tag_id: u32) -> Label {
    Label(format!("lam_start_{tag_id}"))
}

pub fn lam_end(tag_id: u32) -> Label {
    Label(format!("lam_end_{tag_id}"))
}

pub fn def_start(name: &str, tag_id: u32) -> Label {
    Label(format!("def_start_{name}_{tag_id}"))
}

pub fn def_end(name: &str, tag_id: u32) -> Label {
    Label(format!("def_end_{name}_{tag_id}"))
}
