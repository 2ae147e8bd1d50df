pub mod company_repository;
pub mod snapshot_repository;

pub use company_repository::{MonitoredCompanies, MySqlCompanyRepository, StaticCompanyDirectory};
pub use snapshot_repository::{InMemorySnapshotStore, MySqlSnapshotRepository, SnapshotStore};
