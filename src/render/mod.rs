pub mod frame_loop;
pub mod mapping;
pub mod scene;
pub mod snapshot;
