//! Fixed in-memory layouts of host runtime types.
//!
//! Game-specific field offsets are not here; they come from the external
//! offsets table (see [`crate::offset`]).

/// Host runtime string (`std::basic_string<char>` on the MSVC x64 ABI)
pub mod string {
    use bytemuck::{Pod, Zeroable};

    /// Capacity at or above which the data lives on the heap
    pub const INLINE_CAPACITY: u64 = 16;
    /// Longest inline string (one byte is reserved for the terminator)
    pub const MAX_INLINE_LEN: usize = 15;

    /// `data` is either the inline buffer or, for heap strings, a pointer
    /// in its first eight bytes.
    #[repr(C)]
    #[derive(Debug, Clone, Copy, Pod, Zeroable)]
    pub struct RawString {
        pub data: [u8; 16],
        pub length: u64,
        pub capacity: u64,
    }

    const _: () = assert!(std::mem::size_of::<RawString>() == 32);

    impl RawString {
        pub fn is_inline(&self) -> bool {
            self.capacity < INLINE_CAPACITY
        }

        pub fn heap_pointer(&self) -> u64 {
            bytemuck::pod_read_unaligned(&self.data[..8])
        }
    }
}

/// Pointer-sized slot width on the host
pub const POINTER_SIZE: u64 = 8;
