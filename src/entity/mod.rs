pub mod customer;
pub mod invoice;
pub mod payment;
pub mod payment_method;
pub mod tariff;
pub mod usage;
pub mod user;

pub use invoice::InvoiceStatus;
pub use payment::Verification;
pub use user::StaffRole;
