pub mod session_cache;
