// Services module - Business logic

pub mod attendance;
pub mod backend;
pub mod export;
pub mod feedback;
pub mod lesson_bus;
pub mod qr_generator;
pub mod scanner;
pub mod session_selector;
pub mod table;
