pub mod handle_pool;
