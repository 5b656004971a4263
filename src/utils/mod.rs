pub mod counter;
pub mod encoding;
pub mod files;
pub mod magic;
pub mod struct_pack;
pub mod xored_stream;
