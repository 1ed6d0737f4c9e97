//! Aggregates module
pub mod batch;
pub mod customer;
pub mod drop_shop;
pub mod job;

pub use batch::{Batch, BatchError, BatchLine, BatchStatus, PurchaseOrder, PurchaseOrderLine};
pub use customer::{Customer, Session};
pub use drop_shop::{DropShop, DropShopError, ThemeMode};
pub use job::{Job, JobError, JobItem, JobStatus};
