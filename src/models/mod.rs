pub mod assignment;
pub mod claim;
pub mod driver;
pub mod notification;
pub mod order;
