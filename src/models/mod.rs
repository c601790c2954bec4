pub mod conversation;
pub mod message;
pub mod request;
pub mod shipment;
pub mod travel;
pub mod user;
