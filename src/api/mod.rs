pub mod completion_api;
