pub mod age_gate;
pub mod cart;
pub mod storage;
pub mod submitter;
