pub mod checkout;
pub mod orders;
pub mod products;
pub mod promos;
