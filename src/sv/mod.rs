pub mod auth;
pub mod billing;
pub mod customer;
pub mod export;
pub mod invoice;
pub mod paging;
pub mod payment;
pub mod payment_method;
pub mod policy;
pub mod report;
pub mod seed;
pub mod staff;
pub mod tariff;
#[cfg(test)]
pub mod test_utils;
pub mod usage;

pub use customer::Customer;
pub use export::Export;
pub use invoice::Invoice;
pub use payment::Payment;
pub use payment_method::PaymentMethod;
pub use report::Report;
pub use staff::Staff;
pub use tariff::Tariff;
pub use usage::Usage;
