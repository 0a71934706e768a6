//! 256-bit unsigned integer backing the Wad / Ray / Rad scales.

// construct_uint! expands to code that trips these lints
#![allow(clippy::assign_op_pattern)]
#![allow(clippy::manual_range_contains)]
#![allow(clippy::ptr_offset_with_cast)]

use uint::construct_uint;

construct_uint! {
    pub struct U256(4);
}
