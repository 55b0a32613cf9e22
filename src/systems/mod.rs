mod aging;
mod bookkeeping;
mod harvest;

pub use aging::AgingSystem;
pub use bookkeeping::BookkeepingSystem;
pub use harvest::HarvestSystem;
