pub mod ply;
mod record;

pub use ply::{write_ply, PlyWriter, DEFAULT_BUFFER_SIZE};
