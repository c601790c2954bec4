pub mod contact;
pub mod locks;
pub mod matcher;
pub mod messaging;
pub mod policy;
pub mod shipment;
