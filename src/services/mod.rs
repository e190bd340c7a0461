pub mod checkout_service;
pub mod order_service;
pub mod promo_service;
